//! Paginated list state machine.
//!
//! [`PagedList`] accumulates the pages of a server-side collection into a
//! single de-duplicated list. It performs no I/O: the caller registers a
//! request with [`begin`](PagedList::begin), performs the fetch however it
//! likes, and hands the result back to [`complete`](PagedList::complete)
//! or [`fail`](PagedList::fail).
//!
//! # Stale responses
//!
//! Every `begin` bumps a monotonic generation counter and stamps it on the
//! returned [`PageTicket`]. Only the ticket of the latest generation may
//! change the list; anything older is reported as [`Merge::Stale`] and
//! dropped. This covers a slow search response arriving after the user
//! typed a newer term, and a next-page response arriving after a reset.
//!
//! # Merge rules
//!
//! | Page | Effect |
//! |------|--------|
//! | `0` | Items replaced with the page; `has_more` reset to `true` |
//! | `> 0` | Items whose id is already present are dropped, the rest appended in fetch order |
//! | `> 0`, fewer than `page_size` items | As above, then `has_more = false` |

use std::collections::HashSet;

use serde::Serialize;

use crate::models::Record;

/// Position of the last successfully merged page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageCursor {
    pub page_index: u32,
    pub page_size: u32,
}

/// Handle for one in-flight page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTicket {
    generation: u64,
    term: String,
    page_index: u32,
}

impl PageTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }
}

/// What [`PagedList::complete`] did with a fetched page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    /// Page 0: the list now holds exactly these (deduplicated) items.
    Replaced { count: usize },
    /// Later page: `added` new items appended, `skipped` already present.
    Appended { added: usize, skipped: usize },
    /// The ticket was superseded; nothing changed.
    Stale,
}

/// Accumulated view of a paginated collection.
#[derive(Debug, Clone)]
pub struct PagedList<T> {
    items: Vec<T>,
    cursor: PageCursor,
    term: String,
    has_more: bool,
    loaded: bool,
    loading: bool,
    latest: u64,
}

impl<T: Record> PagedList<T> {
    /// Create an empty list. A `page_size` of zero is raised to one.
    pub fn new(page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            cursor: PageCursor {
                page_index: 0,
                page_size: page_size.max(1),
            },
            term: String::new(),
            has_more: true,
            loaded: false,
            loading: false,
            latest: 0,
        }
    }

    /// Register a request for `page_index` under `term`.
    ///
    /// Any earlier ticket becomes stale.
    pub fn begin(&mut self, term: &str, page_index: u32) -> PageTicket {
        self.latest += 1;
        self.loading = true;
        PageTicket {
            generation: self.latest,
            term: term.to_string(),
            page_index,
        }
    }

    /// True when `ticket` is the most recently issued request.
    pub fn is_current(&self, ticket: &PageTicket) -> bool {
        ticket.generation == self.latest
    }

    /// Merge a fetched page.
    pub fn complete(&mut self, ticket: &PageTicket, page: &[T]) -> Merge {
        if !self.is_current(ticket) {
            return Merge::Stale;
        }
        self.loading = false;
        self.loaded = true;

        let merge = if ticket.page_index == 0 {
            let mut seen = HashSet::with_capacity(page.len());
            self.items = page
                .iter()
                .filter(|item| seen.insert(item.id().to_string()))
                .cloned()
                .collect();
            self.term = ticket.term.clone();
            self.has_more = true;
            Merge::Replaced {
                count: self.items.len(),
            }
        } else {
            let mut seen: HashSet<String> =
                self.items.iter().map(|i| i.id().to_string()).collect();
            let before = self.items.len();
            for item in page {
                if seen.insert(item.id().to_string()) {
                    self.items.push(item.clone());
                }
            }
            let added = self.items.len() - before;
            if page.len() < self.cursor.page_size as usize {
                self.has_more = false;
            }
            Merge::Appended {
                added,
                skipped: page.len() - added,
            }
        };

        self.cursor.page_index = ticket.page_index;
        merge
    }

    /// Record a failed fetch. Returns `false` if the ticket was stale.
    ///
    /// Items, cursor, and `has_more` are left as they were.
    pub fn fail(&mut self, ticket: &PageTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.loading = false;
        true
    }

    /// Index of the next page to request, or `None` when the caller must
    /// not request one (nothing loaded yet, exhausted, or already loading).
    pub fn next_page_index(&self) -> Option<u32> {
        if !self.loaded || !self.has_more || self.loading {
            return None;
        }
        Some(self.cursor.page_index + 1)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn cursor(&self) -> PageCursor {
        self.cursor
    }

    /// Term of the last applied page-0 response.
    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn page_size(&self) -> u32 {
        self.cursor.page_size
    }

    /// Put a newly created record at the top of the list, replacing any
    /// entry with the same id.
    pub fn prepend(&mut self, item: T) {
        self.items.retain(|i| i.id() != item.id());
        self.items.insert(0, item);
    }

    /// Replace the entry with `id` in place. Returns `false` if absent.
    pub fn replace(&mut self, id: &str, item: T) -> bool {
        match self.items.iter().position(|i| i.id() == id) {
            Some(pos) => {
                self.items[pos] = item;
                true
            }
            None => false,
        }
    }

    /// Remove the entry with `id`. Returns `false` if absent.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.id() != id);
        self.items.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: String,
    }

    impl Record for Item {
        const COLLECTION: &'static str = "items";
        fn id(&self) -> &str {
            &self.id
        }
        fn matches(&self, _term: &str) -> bool {
            true
        }
    }

    fn items(ids: &[&str]) -> Vec<Item> {
        ids.iter()
            .map(|id| Item { id: id.to_string() })
            .collect()
    }

    fn ids(list: &PagedList<Item>) -> Vec<&str> {
        list.items().iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn test_first_page_replaces() {
        let mut list = PagedList::new(3);
        let t = list.begin("", 0);
        list.complete(&t, &items(&["a", "b", "c"]));

        let t = list.begin("x", 0);
        let merge = list.complete(&t, &items(&["d"]));
        assert_eq!(merge, Merge::Replaced { count: 1 });
        assert_eq!(ids(&list), vec!["d"]);
        assert_eq!(list.term(), "x");
        assert_eq!(list.cursor().page_index, 0);
    }

    #[test]
    fn test_append_filters_duplicates_and_keeps_order() {
        let mut list = PagedList::new(3);
        let t = list.begin("", 0);
        list.complete(&t, &items(&["a", "b", "c"]));
        let t = list.begin("", 1);
        let merge = list.complete(&t, &items(&["c", "d", "e"]));

        assert_eq!(merge, Merge::Appended { added: 2, skipped: 1 });
        assert_eq!(ids(&list), vec!["a", "b", "c", "d", "e"]);
        assert_eq!(list.cursor().page_index, 1);
        assert!(list.has_more());
    }

    #[test]
    fn test_duplicates_within_first_page_dropped() {
        let mut list = PagedList::new(5);
        let t = list.begin("", 0);
        assert_eq!(
            list.complete(&t, &items(&["a", "b", "a"])),
            Merge::Replaced { count: 2 }
        );
        assert_eq!(ids(&list), vec!["a", "b"]);
    }

    #[test]
    fn test_short_later_page_exhausts() {
        let mut list = PagedList::new(2);
        let t = list.begin("", 0);
        list.complete(&t, &items(&["a", "b"]));
        let t = list.begin("", 1);
        list.complete(&t, &items(&["c"]));
        assert!(!list.has_more());
        assert_eq!(list.next_page_index(), None);
    }

    #[test]
    fn test_empty_later_page_exhausts() {
        let mut list = PagedList::new(2);
        let t = list.begin("", 0);
        list.complete(&t, &items(&["a", "b"]));
        let t = list.begin("", 1);
        list.complete(&t, &[]);
        assert!(!list.has_more());
    }

    #[test]
    fn test_short_first_page_does_not_exhaust() {
        let mut list = PagedList::new(10);
        let t = list.begin("", 0);
        list.complete(&t, &items(&["a"]));
        assert!(list.has_more());
        assert_eq!(list.next_page_index(), Some(1));
    }

    #[test]
    fn test_new_search_resets_exhaustion() {
        let mut list = PagedList::new(2);
        let t = list.begin("", 0);
        list.complete(&t, &items(&["a", "b"]));
        let t = list.begin("", 1);
        list.complete(&t, &[]);
        assert!(!list.has_more());

        let t = list.begin("b", 0);
        list.complete(&t, &items(&["b"]));
        assert!(list.has_more());
        assert_eq!(list.cursor().page_index, 0);
    }

    #[test]
    fn test_stale_ticket_is_discarded() {
        let mut list = PagedList::new(5);
        let old = list.begin("ab", 0);
        let new = list.begin("abc", 0);

        list.complete(&new, &items(&["x"]));
        assert_eq!(list.complete(&old, &items(&["y", "z"])), Merge::Stale);
        assert_eq!(ids(&list), vec!["x"]);
        assert_eq!(list.term(), "abc");
    }

    #[test]
    fn test_failure_leaves_state() {
        let mut list = PagedList::new(2);
        let t = list.begin("", 0);
        list.complete(&t, &items(&["a", "b"]));
        let t = list.begin("", 1);
        assert!(list.is_loading());
        assert!(list.fail(&t));
        assert!(!list.is_loading());
        assert_eq!(ids(&list), vec!["a", "b"]);
        assert_eq!(list.cursor().page_index, 0);
        assert_eq!(list.next_page_index(), Some(1));
    }

    #[test]
    fn test_stale_failure_keeps_loading_flag() {
        let mut list = PagedList::<Item>::new(2);
        let old = list.begin("", 0);
        let _new = list.begin("q", 0);
        assert!(!list.fail(&old));
        assert!(list.is_loading());
    }

    #[test]
    fn test_no_next_page_before_first_load_or_while_loading() {
        let mut list = PagedList::<Item>::new(2);
        assert_eq!(list.next_page_index(), None);
        let t = list.begin("", 0);
        assert_eq!(list.next_page_index(), None);
        list.complete(&t, &items(&["a", "b"]));
        assert_eq!(list.next_page_index(), Some(1));
    }

    #[test]
    fn test_local_mutations() {
        let mut list = PagedList::new(5);
        let t = list.begin("", 0);
        list.complete(&t, &items(&["a", "b"]));

        list.prepend(Item { id: "c".into() });
        assert_eq!(ids(&list), vec!["c", "a", "b"]);
        list.prepend(Item { id: "a".into() });
        assert_eq!(ids(&list), vec!["a", "c", "b"]);
        assert!(list.replace("b", Item { id: "b".into() }));
        assert!(!list.replace("zz", Item { id: "zz".into() }));
        assert!(list.remove("c"));
        assert!(!list.remove("c"));
        assert_eq!(ids(&list), vec!["a", "b"]);
    }
}
