//! Debounced search.
//!
//! [`SearchController`] turns per-keystroke input into at most one fetch
//! per quiet period:
//!
//! 1. The new term is stored immediately (for display).
//! 2. A page-0 load for that term is scheduled after the debounce window.
//! 3. Any load scheduled earlier that has not fired yet is cancelled.
//!
//! A blank term schedules an unfiltered page-0 load rather than nothing.
//!
//! A load that already fired is not aborted. If its response arrives after
//! a newer request was issued, the list's generation check discards it,
//! so only the most recently issued term can update the visible results.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use bizdesk_core::collection::Collection;
use bizdesk_core::models::Record;

use crate::list::{ListController, PageLoad};

/// Runs the latest scheduled action once input has been quiet for `window`.
pub struct Debouncer {
    window: Duration,
    seq: Arc<AtomicU64>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seq: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(None),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Schedule `action` to run after the window, superseding any action
    /// that has not started yet. Must be called inside a tokio runtime.
    pub fn schedule<F>(&self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let my_seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let seq = Arc::clone(&self.seq);
        let window = self.window;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if seq.load(Ordering::SeqCst) != my_seq {
                return;
            }
            action.await;
        });
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        *pending = Some(handle);
    }

    /// Cancel the pending action, if it has not started.
    pub fn cancel(&self) {
        self.seq.fetch_add(1, Ordering::SeqCst);
    }

    /// Wait for the most recently scheduled action to finish (or be
    /// superseded).
    pub async fn flush(&self) {
        let handle = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            pending.take()
        };
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!("debounced action did not complete: {}", e);
            }
        }
    }
}

/// Debounced search over a [`ListController`].
pub struct SearchController<T, C> {
    list: ListController<T, C>,
    debouncer: Debouncer,
    display_term: Mutex<String>,
}

impl<T, C> SearchController<T, C>
where
    T: Record,
    C: Collection<T> + 'static,
{
    pub fn new(list: ListController<T, C>, window: Duration) -> Self {
        Self {
            list,
            debouncer: Debouncer::new(window),
            display_term: Mutex::new(String::new()),
        }
    }

    pub fn list(&self) -> &ListController<T, C> {
        &self.list
    }

    /// The term as last typed, whether or not it has been searched yet.
    pub fn display_term(&self) -> String {
        self.display_term
            .lock()
            .map(|t| t.clone())
            .unwrap_or_default()
    }

    /// Record a keystroke.
    pub fn input(&self, term: &str) {
        if let Ok(mut t) = self.display_term.lock() {
            *t = term.to_string();
        }
        let list = self.list.clone();
        let term = term.to_string();
        self.debouncer.schedule(async move {
            // Failures were already notified by the list controller.
            match list.load_page(&term, 0).await {
                Ok(PageLoad::Stale(_)) => {
                    tracing::debug!(collection = T::COLLECTION, term = %term, "search superseded");
                }
                Ok(PageLoad::Applied(page)) => {
                    tracing::debug!(
                        collection = T::COLLECTION,
                        term = %term,
                        results = page.len(),
                        "search applied"
                    );
                }
                Err(_) => {}
            }
        });
    }

    /// Drop any search that has not fired yet.
    pub fn cancel(&self) {
        self.debouncer.cancel();
    }

    /// Wait until the latest scheduled search has completed.
    pub async fn settle(&self) {
        self.debouncer.flush().await;
    }

    /// Load the next page of the current results.
    pub async fn load_more(&self) -> anyhow::Result<Option<PageLoad<T>>> {
        self.list.load_next().await
    }
}
