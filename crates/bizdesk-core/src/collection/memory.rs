//! In-memory [`Collection`] implementation for testing and offline use.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`, in insertion order.
//! Search uses [`Record::matches`]; paging slices the filtered list.
//! `create` assigns a UUID when the record arrives without an id.

use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::Record;

use super::{Collection, PageQuery};

/// Assigns an id to a record that has none. Implemented per record type
/// because the id field is not reachable through [`Record`].
pub trait WithId {
    fn with_id(self, id: String) -> Self;
}

macro_rules! impl_with_id {
    ($($ty:ty),*) => {
        $(impl WithId for $ty {
            fn with_id(mut self, id: String) -> Self {
                self.id = id;
                self
            }
        })*
    };
}

impl_with_id!(
    crate::models::Customer,
    crate::models::Product,
    crate::models::Service,
    crate::models::Order
);

/// In-memory collection for testing and offline environments.
pub struct InMemoryCollection<T> {
    records: RwLock<Vec<T>>,
}

impl<T: Record> InMemoryCollection<T> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn with_records(records: Vec<T>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Record> Default for InMemoryCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> anyhow::Error {
    anyhow::anyhow!("in-memory collection lock poisoned")
}

#[async_trait]
impl<T: Record + WithId> Collection<T> for InMemoryCollection<T> {
    async fn fetch(&self, query: &PageQuery) -> Result<Vec<T>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        let term = query.search.as_deref().unwrap_or("");
        let size = query.page_size.max(1) as usize;
        Ok(records
            .iter()
            .filter(|r| r.matches(term))
            .skip(query.page as usize * size)
            .take(size)
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<T>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.iter().find(|r| r.id() == id).cloned())
    }

    async fn create(&self, record: &T) -> Result<T> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let stored = if record.id().is_empty() {
            record.clone().with_id(uuid::Uuid::new_v4().to_string())
        } else {
            if records.iter().any(|r| r.id() == record.id()) {
                bail!("{} '{}' already exists", T::COLLECTION, record.id());
            }
            record.clone()
        };
        records.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, id: &str, record: &T) -> Result<T> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let Some(slot) = records.iter_mut().find(|r| r.id() == id) else {
            bail!("{} '{}' not found", T::COLLECTION, id);
        };
        let stored = record.clone().with_id(id.to_string());
        *slot = stored.clone();
        Ok(stored)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let before = records.len();
        records.retain(|r| r.id() != id);
        if records.len() == before {
            bail!("{} '{}' not found", T::COLLECTION, id);
        }
        Ok(())
    }
}
