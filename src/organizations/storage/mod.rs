//! Storage capability for the single table.
//!
//! [`TableStore`] is the seam between the organization core and whatever
//! key-value backend holds the table. It exposes exactly the primitives the
//! core relies on: conditional put, point get, attribute-level conditional
//! update, delete, and prefix queries with keyset pagination over the primary
//! key or the `GSI1` secondary index.

mod cursor;
mod in_memory;

pub use cursor::Cursor;
pub use in_memory::InMemoryTable;

use super::keys::{GSI1PK, GSI1SK, IndexKey, PK, SK, TableKey};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// A stored item: attribute name to value.
pub type Item = serde_json::Map<String, Value>;

/// Errors surfaced by a [`TableStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// A conditional write's precondition did not hold.
    #[error("conditional check failed")]
    ConditionalCheckFailed,

    /// The backend failed.
    #[error("backend error: {0}")]
    Backend(String),

    /// An item could not be converted to or from a record.
    #[error("item codec error: {0}")]
    Codec(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    #[must_use]
    pub fn is_conditional_check_failed(&self) -> bool {
        matches!(self, Self::ConditionalCheckFailed)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec(err.to_string())
    }
}

/// Result type for table operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Precondition for [`TableStore::put_item`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PutCondition {
    /// Overwrite whatever is there.
    Always,
    /// Fail with `ConditionalCheckFailed` if the key is occupied.
    IfNotExists,
}

/// Precondition for [`TableStore::update_item`].
///
/// Updates never create items. A missing item fails every condition with
/// `ConditionalCheckFailed`.
#[derive(Clone, Debug, PartialEq)]
pub enum UpdateCondition {
    /// The item exists.
    ItemExists,
    /// The item exists and every check holds against its current attributes.
    All(Vec<AttributeCheck>),
}

impl UpdateCondition {
    /// Whether the condition holds for the stored `item`.
    pub fn holds(&self, item: &Item) -> bool {
        match self {
            Self::ItemExists => true,
            Self::All(checks) => checks.iter().all(|check| check.holds(item)),
        }
    }
}

/// Attribute-level check inside [`UpdateCondition::All`].
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeCheck {
    /// The attribute is missing or null.
    Absent(String),
    /// The attribute is present with exactly this value.
    Equals(String, Value),
}

impl AttributeCheck {
    pub fn absent(name: impl Into<String>) -> Self {
        Self::Absent(name.into())
    }

    pub fn equals(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals(name.into(), value.into())
    }

    pub fn holds(&self, item: &Item) -> bool {
        match self {
            Self::Absent(name) => item.get(name).is_none_or(Value::is_null),
            Self::Equals(name, value) => item.get(name) == Some(value),
        }
    }
}

/// One attribute-level change applied by [`TableStore::update_item`].
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeChange {
    Set(String, Value),
    Remove(String),
}

impl AttributeChange {
    pub fn set(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Set(name.into(), value.into())
    }

    pub fn remove(name: impl Into<String>) -> Self {
        Self::Remove(name.into())
    }

    /// Attribute this change touches.
    pub fn attribute(&self) -> &str {
        match self {
            Self::Set(name, _) | Self::Remove(name) => name,
        }
    }
}

/// Which key pair a query runs against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexName {
    /// `(PK, SK)`
    Primary,
    /// `(GSI1PK, GSI1SK)`
    Gsi1,
}

impl IndexName {
    /// Attributes a cursor must carry to resume a query on this index.
    pub fn cursor_attributes(&self) -> &'static [&'static str] {
        match self {
            Self::Primary => &[PK, SK],
            Self::Gsi1 => &[PK, SK, GSI1PK, GSI1SK],
        }
    }
}

/// A range query within one partition.
#[derive(Clone, Debug)]
pub struct Query {
    pub index: IndexName,
    pub partition: String,
    pub sort_prefix: Option<String>,
    pub limit: Option<usize>,
    /// Resume strictly after this position.
    pub start_after: Option<Cursor>,
}

impl Query {
    pub fn primary(partition: impl Into<String>) -> Self {
        Self {
            index: IndexName::Primary,
            partition: partition.into(),
            sort_prefix: None,
            limit: None,
            start_after: None,
        }
    }

    pub fn gsi1(partition: impl Into<String>) -> Self {
        Self {
            index: IndexName::Gsi1,
            ..Self::primary(partition)
        }
    }

    #[must_use]
    pub fn with_sort_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.sort_prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn starting_after(mut self, cursor: Option<Cursor>) -> Self {
        self.start_after = cursor;
        self
    }
}

/// One page of query results.
#[derive(Clone, Debug, Default)]
pub struct QueryPage {
    pub items: Vec<Item>,
    /// Position of the last returned item when more may follow.
    pub last_evaluated: Option<Cursor>,
}

/// Durable single-table key-value store.
///
/// Implement this trait for your backend. Implementations must apply each
/// call atomically to the single item it addresses and must report failed
/// preconditions as [`StoreError::ConditionalCheckFailed`].
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Write a whole item. The item carries its own key attributes.
    async fn put_item(&self, item: Item, condition: PutCondition) -> StoreResult<()>;

    /// Point lookup.
    async fn get_item(&self, key: &TableKey) -> StoreResult<Option<Item>>;

    /// Apply attribute changes and return the item as it is afterwards.
    async fn update_item(
        &self,
        key: &TableKey,
        changes: Vec<AttributeChange>,
        condition: UpdateCondition,
    ) -> StoreResult<Item>;

    /// Delete an item. Deleting a missing item succeeds.
    async fn delete_item(&self, key: &TableKey) -> StoreResult<()>;

    /// Range query within one partition, ordered by sort key.
    async fn query(&self, query: &Query) -> StoreResult<QueryPage>;
}

/// Serialize a record into an item carrying its key and index attributes.
pub fn encode_item<T: Serialize>(record: &T, key: &TableKey, index: &IndexKey) -> StoreResult<Item> {
    let mut item = match serde_json::to_value(record)? {
        Value::Object(map) => map,
        other => {
            return Err(StoreError::Codec(format!(
                "record must serialize to an object, got {other}"
            )));
        }
    };
    item.insert(PK.to_string(), Value::String(key.pk.clone()));
    item.insert(SK.to_string(), Value::String(key.sk.clone()));
    item.insert(GSI1PK.to_string(), Value::String(index.gsi1pk.clone()));
    item.insert(GSI1SK.to_string(), Value::String(index.gsi1sk.clone()));
    Ok(item)
}

/// Deserialize an item into a record; key attributes are ignored.
pub fn decode_item<T: DeserializeOwned>(item: Item) -> StoreResult<T> {
    Ok(serde_json::from_value(Value::Object(item))?)
}

/// String value of an attribute, if present.
pub fn string_attribute<'a>(item: &'a Item, name: &str) -> Option<&'a str> {
    item.get(name).and_then(Value::as_str)
}

/// Primary key of an item, if it carries one.
pub fn item_key(item: &Item) -> Option<TableKey> {
    Some(TableKey {
        pk: string_attribute(item, PK)?.to_string(),
        sk: string_attribute(item, SK)?.to_string(),
    })
}
