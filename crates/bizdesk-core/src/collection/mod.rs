//! Remote collection abstraction.
//!
//! The [`Collection`] trait is the contract the list controllers and the
//! order builder consume: paged fetch with an optional search term, lookup
//! by id, and the three mutations. The backend behind it is a black box;
//! the application crate provides a REST implementation and this crate
//! provides [`memory::InMemoryCollection`] for tests and offline use.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::models::Record;

/// Parameters of a single page request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageQuery {
    /// Search term; `None` requests the unfiltered collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Zero-based page index.
    pub page: u32,
    /// Items per page.
    #[serde(rename = "limit")]
    pub page_size: u32,
}

impl PageQuery {
    /// Build a query, mapping a blank term to an unfiltered fetch.
    pub fn new(term: &str, page: u32, page_size: u32) -> Self {
        let term = term.trim();
        Self {
            search: (!term.is_empty()).then(|| term.to_string()),
            page,
            page_size,
        }
    }
}

/// Abstract backend for one record type.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`fetch`](Collection::fetch) | One page of records, optionally filtered |
/// | [`get`](Collection::get) | A single record by id |
/// | [`create`](Collection::create) | Store a new record, returning it with its id |
/// | [`update`](Collection::update) | Replace a record |
/// | [`delete`](Collection::delete) | Remove a record |
///
/// An empty or short page for `page > 0` signals the end of the collection.
#[async_trait]
pub trait Collection<T: Record>: Send + Sync {
    async fn fetch(&self, query: &PageQuery) -> Result<Vec<T>>;

    /// Returns `Ok(None)` when no record has this id.
    async fn get(&self, id: &str) -> Result<Option<T>>;

    async fn create(&self, record: &T) -> Result<T>;

    async fn update(&self, id: &str, record: &T) -> Result<T>;

    async fn delete(&self, id: &str) -> Result<()>;
}

#[async_trait]
impl<T, C> Collection<T> for std::sync::Arc<C>
where
    T: Record,
    C: Collection<T> + ?Sized,
{
    async fn fetch(&self, query: &PageQuery) -> Result<Vec<T>> {
        (**self).fetch(query).await
    }

    async fn get(&self, id: &str) -> Result<Option<T>> {
        (**self).get(id).await
    }

    async fn create(&self, record: &T) -> Result<T> {
        (**self).create(record).await
    }

    async fn update(&self, id: &str, record: &T) -> Result<T> {
        (**self).update(id, record).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        (**self).delete(id).await
    }
}
