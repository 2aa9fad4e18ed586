//! In-memory table implementation.
//!
//! Suitable for development, tests and single-process deployments. Items are
//! kept ordered by primary key; index queries sort on demand.

use super::{
    AttributeChange, Cursor, IndexName, Item, PutCondition, Query, QueryPage, StoreError,
    StoreResult, TableStore, UpdateCondition, item_key, string_attribute,
};
use crate::organizations::keys::{GSI1PK, GSI1SK, PK, SK, TableKey};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory [`TableStore`].
///
/// Cloning shares the same underlying data.
#[derive(Clone, Default)]
pub struct InMemoryTable {
    items: Arc<RwLock<BTreeMap<TableKey, Item>>>,
}

/// Sort position of an item within a query's partition.
type Position = (String, String, String);

impl InMemoryTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items stored.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    fn position(index: IndexName, item: &Item) -> Option<Position> {
        let attr = |name| string_attribute(item, name).map(str::to_string);
        match index {
            IndexName::Primary => Some((attr(SK)?, String::new(), String::new())),
            IndexName::Gsi1 => Some((attr(GSI1SK)?, attr(PK)?, attr(SK)?)),
        }
    }

    fn cursor_position(index: IndexName, cursor: &Cursor) -> Option<Position> {
        if !cursor.has_attributes(index.cursor_attributes()) {
            return None;
        }
        let attr = |name| cursor.get(name).map(str::to_string);
        match index {
            IndexName::Primary => Some((attr(SK)?, String::new(), String::new())),
            IndexName::Gsi1 => Some((attr(GSI1SK)?, attr(PK)?, attr(SK)?)),
        }
    }
}

#[async_trait]
impl TableStore for InMemoryTable {
    async fn put_item(&self, item: Item, condition: PutCondition) -> StoreResult<()> {
        let key = item_key(&item)
            .ok_or_else(|| StoreError::backend("item is missing its PK/SK attributes"))?;

        let mut items = self.items.write().await;
        if condition == PutCondition::IfNotExists && items.contains_key(&key) {
            return Err(StoreError::ConditionalCheckFailed);
        }
        items.insert(key, item);
        Ok(())
    }

    async fn get_item(&self, key: &TableKey) -> StoreResult<Option<Item>> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn update_item(
        &self,
        key: &TableKey,
        changes: Vec<AttributeChange>,
        condition: UpdateCondition,
    ) -> StoreResult<Item> {
        if let Some(change) = changes
            .iter()
            .find(|c| matches!(c.attribute(), PK | SK))
        {
            return Err(StoreError::backend(format!(
                "cannot update key attribute {}",
                change.attribute()
            )));
        }

        let mut items = self.items.write().await;
        let Some(item) = items.get_mut(key) else {
            return Err(StoreError::ConditionalCheckFailed);
        };
        if !condition.holds(item) {
            return Err(StoreError::ConditionalCheckFailed);
        }

        for change in changes {
            match change {
                AttributeChange::Set(name, value) => {
                    item.insert(name, value);
                }
                AttributeChange::Remove(name) => {
                    item.remove(&name);
                }
            }
        }

        Ok(item.clone())
    }

    async fn delete_item(&self, key: &TableKey) -> StoreResult<()> {
        self.items.write().await.remove(key);
        Ok(())
    }

    async fn query(&self, query: &Query) -> StoreResult<QueryPage> {
        let partition_attr = match query.index {
            IndexName::Primary => PK,
            IndexName::Gsi1 => GSI1PK,
        };
        let sort_attr = match query.index {
            IndexName::Primary => SK,
            IndexName::Gsi1 => GSI1SK,
        };

        let items = self.items.read().await;
        let mut matching: Vec<(Position, &Item)> = items
            .values()
            .filter(|item| string_attribute(item, partition_attr) == Some(query.partition.as_str()))
            .filter(|item| match &query.sort_prefix {
                Some(prefix) => {
                    string_attribute(item, sort_attr).is_some_and(|sk| sk.starts_with(prefix.as_str()))
                }
                None => true,
            })
            .filter_map(|item| Self::position(query.index, item).map(|pos| (pos, item)))
            .collect();
        matching.sort_by(|a, b| a.0.cmp(&b.0));

        // Incomplete cursors restart from the top
        let start = query
            .start_after
            .as_ref()
            .and_then(|cursor| Self::cursor_position(query.index, cursor))
            .map(|after| matching.partition_point(|(pos, _)| *pos <= after))
            .unwrap_or(0);

        let remaining = &matching[start..];
        let take = query
            .limit
            .filter(|limit| *limit > 0)
            .unwrap_or(remaining.len())
            .min(remaining.len());

        let page: Vec<Item> = remaining[..take].iter().map(|(_, item)| (*item).clone()).collect();
        let last_evaluated = if take < remaining.len() {
            page.last()
                .map(|item| Cursor::of_item(item, query.index.cursor_attributes()))
        } else {
            None
        };

        Ok(QueryPage {
            items: page,
            last_evaluated,
        })
    }
}
