//! Background persistence of recovered logo keys.

use crate::organizations::keys::org_key;
use crate::organizations::storage::{
    AttributeChange, AttributeCheck, StoreError, TableStore, UpdateCondition,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// A recovered key that could not be written back.
#[derive(Debug, Error)]
#[error("failed to persist logo key {key:?} for organization {org_name}: {reason}")]
pub struct BackfillError {
    pub org_name: String,
    pub key: String,
    pub reason: String,
}

/// Result of one background write.
#[derive(Debug, PartialEq, Eq)]
enum Backfilled {
    Written,
    /// The record gained a key, changed its URL or disappeared after it was read.
    Superseded,
}

/// Writes recovered logo keys back onto organization records.
///
/// Each submission runs as a detached task. Callers never await it, and
/// failures only reach the log and the optional error channel. The write only
/// lands while the record still has no key and still carries the URL the key
/// was recovered from, so it never overwrites a newer logo.
pub struct KeyBackfill<T: TableStore> {
    table: Arc<T>,
    errors: Option<mpsc::UnboundedSender<BackfillError>>,
}

impl<T: TableStore> Clone for KeyBackfill<T> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            errors: self.errors.clone(),
        }
    }
}

impl<T: TableStore + 'static> KeyBackfill<T> {
    pub fn new(table: Arc<T>) -> Self {
        Self {
            table,
            errors: None,
        }
    }

    /// Report failures on `errors` in addition to logging them.
    #[must_use]
    pub fn with_error_channel(mut self, errors: mpsc::UnboundedSender<BackfillError>) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Persist `key`, recovered from `legacy_url`, as the logo key of
    /// `org_name` in the background.
    ///
    /// Must be called from within a Tokio runtime. The returned handle may be
    /// dropped.
    pub fn submit(&self, org_name: &str, key: &str, legacy_url: &str) -> JoinHandle<()> {
        let table = Arc::clone(&self.table);
        let errors = self.errors.clone();
        let org_name = org_name.to_string();
        let key = key.to_string();
        let legacy_url = legacy_url.to_string();

        tokio::spawn(async move {
            match persist(table.as_ref(), &org_name, &key, &legacy_url).await {
                Ok(Backfilled::Written) => {
                    info!(org = %org_name, key = %key, "Persisted recovered logo key")
                }
                Ok(Backfilled::Superseded) => {
                    debug!(org = %org_name, key = %key, "Logo changed since read, skipped recovered key")
                }
                Err(reason) => {
                    error!(org = %org_name, key = %key, error = %reason, "Failed to persist recovered logo key");
                    if let Some(errors) = errors {
                        // Receiver may be gone
                        let _ = errors.send(BackfillError {
                            org_name,
                            key,
                            reason,
                        });
                    }
                }
            }
        })
    }
}

async fn persist<T: TableStore>(
    table: &T,
    org_name: &str,
    key: &str,
    legacy_url: &str,
) -> Result<Backfilled, String> {
    let item_key = org_key(org_name).map_err(|e| e.to_string())?;
    let condition = UpdateCondition::All(vec![
        AttributeCheck::absent("logoS3Key"),
        AttributeCheck::equals("logoUrl", legacy_url),
    ]);
    match table
        .update_item(&item_key, vec![AttributeChange::set("logoS3Key", key)], condition)
        .await
    {
        Ok(_) => Ok(Backfilled::Written),
        Err(StoreError::ConditionalCheckFailed) => Ok(Backfilled::Superseded),
        Err(e) => Err(e.to_string()),
    }
}
