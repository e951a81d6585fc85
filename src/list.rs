//! Async paginated list controller.
//!
//! [`ListController`] wraps a [`PagedList`] state machine together with the
//! [`Collection`] it pages through and the [`Notifier`] that hears about
//! failures. It is the piece every list screen (customers, products,
//! services, orders) instantiates once.
//!
//! The controller is a cheap handle (`Clone` shares state), so a debounced
//! search task can own a copy while the screen keeps another.
//!
//! # Failure semantics
//!
//! A failed fetch or mutation leaves the accumulated items, cursor, and
//! `has_more` untouched, clears the loading flag, emits one
//! [`Notice::Error`], and returns the error. Nothing is retried.
//!
//! # Staleness
//!
//! Requests are stamped with a generation by [`PagedList::begin`]. A
//! response for a superseded request comes back as [`PageLoad::Stale`] and
//! does not touch the list.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use serde::Serialize;

use bizdesk_core::collection::{Collection, PageQuery};
use bizdesk_core::models::Record;
use bizdesk_core::paging::{Merge, PageCursor, PagedList, PageTicket};

use crate::notify::{Notice, Notifier};

/// Result of one page load: the raw page as fetched, and whether it was
/// merged into the list.
#[derive(Debug, Clone, PartialEq)]
pub enum PageLoad<T> {
    Applied(Vec<T>),
    Stale(Vec<T>),
}

impl<T> PageLoad<T> {
    pub fn page(&self) -> &[T] {
        match self {
            PageLoad::Applied(p) | PageLoad::Stale(p) => p,
        }
    }

    pub fn into_page(self) -> Vec<T> {
        match self {
            PageLoad::Applied(p) | PageLoad::Stale(p) => p,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, PageLoad::Stale(_))
    }
}

/// Point-in-time copy of a list's visible state.
#[derive(Debug, Clone, Serialize)]
pub struct ListSnapshot<T> {
    pub items: Vec<T>,
    pub term: String,
    pub cursor: PageCursor,
    pub has_more: bool,
    pub loading: bool,
}

pub struct ListController<T, C> {
    state: Arc<Mutex<PagedList<T>>>,
    collection: Arc<C>,
    notifier: Arc<dyn Notifier>,
}

impl<T, C> Clone for ListController<T, C> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            collection: Arc::clone(&self.collection),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl<T, C> ListController<T, C>
where
    T: Record,
    C: Collection<T> + 'static,
{
    pub fn new(collection: Arc<C>, notifier: Arc<dyn Notifier>, page_size: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(PagedList::new(page_size))),
            collection,
            notifier,
        }
    }

    // Never held across an await.
    fn state(&self) -> MutexGuard<'_, PagedList<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn collection(&self) -> &Arc<C> {
        &self.collection
    }

    /// Fetch `page_index` for `term` and merge it.
    ///
    /// Page 0 replaces the list; later pages append records not already
    /// present. Returns the page exactly as the backend sent it.
    pub async fn load_page(&self, term: &str, page_index: u32) -> Result<PageLoad<T>> {
        let (ticket, page_size) = {
            let mut state = self.state();
            (state.begin(term, page_index), state.page_size())
        };
        self.run(ticket, page_size).await
    }

    /// Load the page after the last merged one, under the current term.
    ///
    /// Returns `Ok(None)` without fetching when the list is exhausted,
    /// already loading, or has not loaded its first page yet.
    pub async fn load_next(&self) -> Result<Option<PageLoad<T>>> {
        let (ticket, page_size) = {
            let mut state = self.state();
            let Some(next) = state.next_page_index() else {
                return Ok(None);
            };
            let term = state.term().to_string();
            (state.begin(&term, next), state.page_size())
        };
        self.run(ticket, page_size).await.map(Some)
    }

    /// Reload page 0 for the current term.
    pub async fn refresh(&self) -> Result<PageLoad<T>> {
        let term = self.state().term().to_string();
        self.load_page(&term, 0).await
    }

    async fn run(&self, ticket: PageTicket, page_size: u32) -> Result<PageLoad<T>> {
        let query = PageQuery::new(ticket.term(), ticket.page_index(), page_size);
        match self.collection.fetch(&query).await {
            Ok(page) => {
                let merge = self.state().complete(&ticket, &page);
                match merge {
                    Merge::Stale => {
                        tracing::debug!(
                            collection = T::COLLECTION,
                            generation = ticket.generation(),
                            term = ticket.term(),
                            page = ticket.page_index(),
                            "discarding stale page"
                        );
                        Ok(PageLoad::Stale(page))
                    }
                    Merge::Replaced { count } => {
                        tracing::debug!(collection = T::COLLECTION, count, "page 0 replaced list");
                        Ok(PageLoad::Applied(page))
                    }
                    Merge::Appended { added, skipped } => {
                        tracing::debug!(
                            collection = T::COLLECTION,
                            page = ticket.page_index(),
                            added,
                            skipped,
                            "page appended"
                        );
                        Ok(PageLoad::Applied(page))
                    }
                }
            }
            Err(err) => {
                let current = self.state().fail(&ticket);
                tracing::warn!(
                    collection = T::COLLECTION,
                    page = ticket.page_index(),
                    current,
                    "fetch failed: {:#}",
                    err
                );
                if current {
                    self.notifier
                        .notify(Notice::error(format!("load {}", T::COLLECTION), &err));
                }
                Err(err)
            }
        }
    }

    /// Create a record and put the stored version at the top of the list.
    pub async fn create(&self, record: &T) -> Result<T> {
        match self.collection.create(record).await {
            Ok(stored) => {
                self.state().prepend(stored.clone());
                Ok(stored)
            }
            Err(err) => Err(self.mutation_failed("create", err)),
        }
    }

    /// Update a record and replace it in place if it is loaded.
    pub async fn update(&self, id: &str, record: &T) -> Result<T> {
        match self.collection.update(id, record).await {
            Ok(stored) => {
                self.state().replace(id, stored.clone());
                Ok(stored)
            }
            Err(err) => Err(self.mutation_failed("update", err)),
        }
    }

    /// Delete a record and drop it from the list.
    pub async fn remove(&self, id: &str) -> Result<()> {
        match self.collection.delete(id).await {
            Ok(()) => {
                self.state().remove(id);
                Ok(())
            }
            Err(err) => Err(self.mutation_failed("delete", err)),
        }
    }

    fn mutation_failed(&self, verb: &str, err: anyhow::Error) -> anyhow::Error {
        tracing::warn!(collection = T::COLLECTION, "{} failed: {:#}", verb, err);
        self.notifier
            .notify(Notice::error(format!("{} {}", verb, T::COLLECTION), &err));
        err
    }

    pub fn snapshot(&self) -> ListSnapshot<T> {
        let state = self.state();
        ListSnapshot {
            items: state.items().to_vec(),
            term: state.term().to_string(),
            cursor: state.cursor(),
            has_more: state.has_more(),
            loading: state.is_loading(),
        }
    }

    pub fn items(&self) -> Vec<T> {
        self.state().items().to_vec()
    }

    pub fn has_more(&self) -> bool {
        self.state().has_more()
    }

    pub fn is_loading(&self) -> bool {
        self.state().is_loading()
    }
}
