//! Integration tests for the list and search controllers.
//!
//! A scriptable in-process backend lets each test control response
//! latency per search term, inject failures, and inspect every query the
//! controllers issued. Timing-sensitive tests run on tokio's paused clock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use bizdesk::notify::{MemoryNotifier, Notice};
use bizdesk::{
    Collection, Customer, InMemoryCollection, ListController, PageLoad, PageQuery, Record,
    SearchController,
};

// ─── Test backend ───────────────────────────────────────────────────

struct FakeBackend {
    records: Mutex<Vec<Customer>>,
    delays: Mutex<HashMap<String, Duration>>,
    fail: AtomicBool,
    queries: Mutex<Vec<PageQuery>>,
}

impl FakeBackend {
    fn new(records: Vec<Customer>) -> Self {
        Self {
            records: Mutex::new(records),
            delays: Mutex::new(HashMap::new()),
            fail: AtomicBool::new(false),
            queries: Mutex::new(Vec::new()),
        }
    }

    fn delay(&self, term: &str, d: Duration) {
        self.delays.lock().unwrap().insert(term.to_string(), d);
    }

    fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn insert_front(&self, c: Customer) {
        self.records.lock().unwrap().insert(0, c);
    }

    fn queries(&self) -> Vec<PageQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Collection<Customer> for FakeBackend {
    async fn fetch(&self, query: &PageQuery) -> Result<Vec<Customer>> {
        self.queries.lock().unwrap().push(query.clone());
        let term = query.search.clone().unwrap_or_default();
        let delay = self.delays.lock().unwrap().get(&term).copied();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            bail!("503 Service Unavailable");
        }
        let size = query.page_size as usize;
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.matches(&term))
            .skip(query.page as usize * size)
            .take(size)
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Customer>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn create(&self, record: &Customer) -> Result<Customer> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("500 Internal Server Error");
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(record.clone())
    }

    async fn update(&self, id: &str, record: &Customer) -> Result<Customer> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("500 Internal Server Error");
        }
        let mut stored = record.clone();
        stored.id = id.to_string();
        Ok(stored)
    }

    async fn delete(&self, _id: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("500 Internal Server Error");
        }
        Ok(())
    }
}

fn customer(id: &str, name: &str) -> Customer {
    Customer {
        id: id.to_string(),
        name: name.to_string(),
        email: None,
        phone: None,
        document: None,
        address: None,
        notes: None,
    }
}

fn numbered(n: usize) -> Vec<Customer> {
    (0..n)
        .map(|i| customer(&format!("c{:02}", i), &format!("Cliente {:02}", i)))
        .collect()
}

fn ids<T: Record>(items: &[T]) -> Vec<String> {
    items.iter().map(|i| i.id().to_string()).collect()
}

fn controller(
    backend: &Arc<FakeBackend>,
    page_size: u32,
) -> (ListController<Customer, FakeBackend>, Arc<MemoryNotifier>) {
    let notifier = Arc::new(MemoryNotifier::new());
    let list = ListController::new(Arc::clone(backend), notifier.clone(), page_size);
    (list, notifier)
}

// ─── Paginated list ─────────────────────────────────────────────────

#[tokio::test]
async fn test_pages_accumulate_until_exhausted() {
    let backend = Arc::new(FakeBackend::new(numbered(25)));
    let (list, notifier) = controller(&backend, 10);

    let first = list.load_page("", 0).await.unwrap();
    assert_eq!(first.page().len(), 10);
    assert!(list.load_next().await.unwrap().is_some());
    let third = list.load_next().await.unwrap().unwrap();
    assert_eq!(third.page().len(), 5);

    assert!(!list.has_more());
    assert!(list.load_next().await.unwrap().is_none());

    let snap = list.snapshot();
    assert_eq!(snap.items.len(), 25);
    assert_eq!(snap.cursor.page_index, 2);
    assert_eq!(ids(&snap.items), ids(&numbered(25)));
    assert_eq!(backend.queries().len(), 3);
    assert!(notifier.notices().is_empty());
}

#[tokio::test]
async fn test_exact_multiple_exhausts_on_empty_page() {
    let backend = Arc::new(FakeBackend::new(numbered(20)));
    let (list, _) = controller(&backend, 10);

    list.load_page("", 0).await.unwrap();
    list.load_next().await.unwrap();
    assert!(list.has_more());
    let last = list.load_next().await.unwrap().unwrap();
    assert!(last.page().is_empty());
    assert!(!list.has_more());
    assert_eq!(list.items().len(), 20);
}

#[tokio::test]
async fn test_shifted_pages_do_not_duplicate() {
    let backend = Arc::new(FakeBackend::new(numbered(6)));
    let (list, _) = controller(&backend, 3);

    list.load_page("", 0).await.unwrap();
    // A record created elsewhere shifts the server-side pages by one.
    backend.insert_front(customer("new", "Novo"));
    let load = list.load_next().await.unwrap().unwrap();

    assert_eq!(ids(load.page()), vec!["c02", "c03", "c04"]);
    assert_eq!(
        ids(&list.items()),
        vec!["c00", "c01", "c02", "c03", "c04"]
    );
}

#[tokio::test]
async fn test_new_term_replaces_and_resets_cursor() {
    let mut records = numbered(12);
    records.push(customer("z1", "Zeca"));
    let backend = Arc::new(FakeBackend::new(records));
    let (list, _) = controller(&backend, 5);

    list.load_page("", 0).await.unwrap();
    list.load_next().await.unwrap();
    assert_eq!(list.snapshot().cursor.page_index, 1);

    list.load_page("zeca", 0).await.unwrap();
    let snap = list.snapshot();
    assert_eq!(ids(&snap.items), vec!["z1"]);
    assert_eq!(snap.term, "zeca");
    assert_eq!(snap.cursor.page_index, 0);
    assert!(snap.has_more);

    // Next page is requested under the committed term.
    list.load_next().await.unwrap();
    let last = backend.queries().pop().unwrap();
    assert_eq!(last.search.as_deref(), Some("zeca"));
    assert_eq!(last.page, 1);
}

#[tokio::test]
async fn test_failed_fetch_keeps_state_and_notifies_once() {
    let backend = Arc::new(FakeBackend::new(numbered(25)));
    let (list, notifier) = controller(&backend, 10);

    list.load_page("", 0).await.unwrap();
    backend.set_failing(true);
    let err = list.load_next().await.unwrap_err();
    assert!(err.to_string().contains("503"));

    let snap = list.snapshot();
    assert_eq!(snap.items.len(), 10);
    assert_eq!(snap.cursor.page_index, 0);
    assert!(snap.has_more);
    assert!(!snap.loading);
    assert_eq!(notifier.error_count(), 1);
    match &notifier.notices()[0] {
        Notice::Error { action, .. } => assert_eq!(action, "load customers"),
        other => panic!("unexpected notice {:?}", other),
    }

    // No automatic retry: exactly the two requests so far.
    assert_eq!(backend.queries().len(), 2);

    backend.set_failing(false);
    list.load_next().await.unwrap();
    assert_eq!(list.items().len(), 20);
}

#[tokio::test(start_paused = true)]
async fn test_stale_response_is_discarded() {
    let mut records = numbered(3);
    records.push(customer("ab1", "Abel"));
    records.push(customer("abc1", "Abcde"));
    let backend = Arc::new(FakeBackend::new(records));
    backend.delay("ab", Duration::from_millis(1000));
    let (list, notifier) = controller(&backend, 10);

    let slow = list.clone();
    let handle = tokio::spawn(async move { slow.load_page("ab", 0).await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let fresh = list.load_page("abc", 0).await.unwrap();
    assert!(!fresh.is_stale());

    let late = handle.await.unwrap().unwrap();
    assert!(late.is_stale());
    assert_eq!(late.page().len(), 2);

    assert_eq!(ids(&list.items()), vec!["abc1"]);
    assert_eq!(list.snapshot().term, "abc");
    assert!(!list.is_loading());
    assert!(notifier.notices().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stale_failure_is_not_notified() {
    let backend = Arc::new(FakeBackend::new(numbered(3)));
    backend.delay("slow", Duration::from_millis(1000));
    let (list, notifier) = controller(&backend, 10);

    let slow = list.clone();
    let handle = tokio::spawn(async move { slow.load_page("slow", 0).await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    list.load_page("", 0).await.unwrap();

    backend.set_failing(true);
    assert!(handle.await.unwrap().is_err());
    assert_eq!(notifier.error_count(), 0);
    assert_eq!(list.items().len(), 3);
}

#[tokio::test]
async fn test_mutations_patch_local_list() {
    let backend = Arc::new(FakeBackend::new(numbered(3)));
    let (list, notifier) = controller(&backend, 10);
    list.load_page("", 0).await.unwrap();

    list.create(&customer("n1", "Nova")).await.unwrap();
    assert_eq!(ids(&list.items())[0], "n1");

    list.update("c01", &customer("", "Renomeado")).await.unwrap();
    assert_eq!(list.items()[2].name, "Renomeado");

    list.remove("c00").await.unwrap();
    assert_eq!(ids(&list.items()), vec!["n1", "c01", "c02"]);

    backend.set_failing(true);
    assert!(list.remove("c01").await.is_err());
    assert!(list.create(&customer("n2", "Outra")).await.is_err());
    assert_eq!(ids(&list.items()), vec!["n1", "c01", "c02"]);
    assert_eq!(notifier.error_count(), 2);
}

#[tokio::test]
async fn test_works_with_in_memory_collection() {
    let col = Arc::new(InMemoryCollection::with_records(numbered(4)));
    let notifier = Arc::new(MemoryNotifier::new());
    let list = ListController::new(col, notifier, 3);

    assert!(matches!(
        list.load_page("", 0).await.unwrap(),
        PageLoad::Applied(_)
    ));
    list.load_next().await.unwrap();
    assert_eq!(list.items().len(), 4);
    assert!(!list.has_more());

    let created = list.create(&customer("", "Sem Id")).await.unwrap();
    assert!(!created.id.is_empty());
    assert_eq!(list.items()[0].id, created.id);
}

// ─── Debounced search ───────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_rapid_input_issues_one_fetch_with_last_term() {
    let mut records = numbered(5);
    records.push(customer("abc1", "Abcde"));
    let backend = Arc::new(FakeBackend::new(records));
    let (list, _) = controller(&backend, 10);
    let search = SearchController::new(list, Duration::from_millis(500));

    for term in ["a", "ab", "abc"] {
        search.input(term);
        assert_eq!(search.display_term(), term);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(backend.queries().is_empty());

    search.settle().await;

    let queries = backend.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].search.as_deref(), Some("abc"));
    assert_eq!(queries[0].page, 0);
    assert_eq!(ids(&search.list().items()), vec!["abc1"]);
}

#[tokio::test(start_paused = true)]
async fn test_empty_term_fetches_unfiltered_first_page() {
    let backend = Arc::new(FakeBackend::new(numbered(3)));
    let (list, _) = controller(&backend, 10);
    let search = SearchController::new(list, Duration::from_millis(500));

    search.input("zzz");
    search.settle().await;
    assert!(search.list().items().is_empty());

    search.input("");
    search.settle().await;

    let last = backend.queries().pop().unwrap();
    assert_eq!(last.search, None);
    assert_eq!(last.page, 0);
    assert_eq!(search.list().items().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_search_superseded_by_newer_term() {
    let mut records = numbered(2);
    records.push(customer("ab1", "Abel"));
    records.push(customer("abc1", "Abcde"));
    let backend = Arc::new(FakeBackend::new(records));
    backend.delay("ab", Duration::from_millis(2000));
    let (list, _) = controller(&backend, 10);
    let search = SearchController::new(list, Duration::from_millis(500));

    // "ab" fires and stays in flight for two seconds.
    search.input("ab");
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(backend.queries().len(), 1);

    // "abc" fires and answers immediately.
    search.input("abc");
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(ids(&search.list().items()), vec!["abc1"]);

    // The late "ab" response must not overwrite it.
    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert_eq!(backend.queries().len(), 2);
    assert_eq!(ids(&search.list().items()), vec!["abc1"]);
    assert_eq!(search.list().snapshot().term, "abc");
}

#[tokio::test(start_paused = true)]
async fn test_cancel_drops_pending_search() {
    let backend = Arc::new(FakeBackend::new(numbered(3)));
    let (list, _) = controller(&backend, 10);
    let search = SearchController::new(list, Duration::from_millis(500));

    search.input("c0");
    search.cancel();
    search.settle().await;
    assert!(backend.queries().is_empty());
    assert_eq!(search.display_term(), "c0");
}

#[tokio::test(start_paused = true)]
async fn test_load_more_after_search() {
    let backend = Arc::new(FakeBackend::new(numbered(15)));
    let (list, _) = controller(&backend, 10);
    let search = SearchController::new(list, Duration::from_millis(500));

    assert!(search.load_more().await.unwrap().is_none());

    search.input("cliente");
    search.settle().await;
    let more = search.load_more().await.unwrap().unwrap();
    assert_eq!(more.page().len(), 5);
    assert_eq!(search.list().items().len(), 15);
    assert!(search.load_more().await.unwrap().is_none());
}
