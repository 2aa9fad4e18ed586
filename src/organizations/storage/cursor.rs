//! Keyset pagination cursor.

use super::Item;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque resume position: the key attributes of the last item returned.
///
/// Routes hand it to clients as a token via [`Cursor::encode`] and read it back
/// with [`Cursor::decode`]. A token that does not decode is treated the same as
/// no token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(BTreeMap<String, String>);

impl Cursor {
    /// Build a cursor from attribute/value pairs.
    pub fn from_attributes<K, V>(attributes: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Capture the named string attributes of an item.
    pub fn of_item(item: &Item, attributes: &[&str]) -> Self {
        Self(
            attributes
                .iter()
                .filter_map(|name| {
                    super::string_attribute(item, name).map(|v| (name.to_string(), v.to_string()))
                })
                .collect(),
        )
    }

    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.0.get(attribute).map(String::as_str)
    }

    /// True when every named attribute is present and non-empty.
    #[must_use]
    pub fn has_attributes(&self, attributes: &[&str]) -> bool {
        attributes
            .iter()
            .all(|name| self.get(name).is_some_and(|v| !v.is_empty()))
    }

    /// URL-safe token form.
    #[must_use]
    pub fn encode(&self) -> String {
        // A string map always serializes
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&self.0).unwrap_or_default())
    }

    /// Parse a token produced by [`Cursor::encode`].
    pub fn decode(token: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(token.trim()).ok()?;
        serde_json::from_slice(&bytes).ok().map(Self)
    }
}
