//! Debounced product search.
//!
//! Every keystroke cancels the pending timer and starts a new one; only the
//! trailing call after the quiet window reaches the backend, with the most
//! recent text. Requests already sent are never cancelled, so a slow response
//! can still land after (and overwrite) a faster, newer one.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use qkart_core::Product;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::api::CatalogApi;

/// A future that runs after a delay unless cancelled first.
///
/// Cancellation only stops the timer; once the delay has elapsed the future
/// runs to completion. Dropping the handle cancels it.
#[derive(Debug)]
pub struct ScheduledTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Spawn `task` to run after `delay` on the current Tokio runtime.
    pub fn schedule<F>(delay: Duration, task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep(delay) => task.await,
            }
        });
        Self { cancel, handle }
    }

    /// Stop the timer. No effect once the task has started.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the task has finished or was cancelled.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// The most recently received search results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    /// Query the results answer.
    pub query: String,
    /// Matching products; empty on error.
    pub products: Vec<Product>,
}

/// Trailing-edge debounced search.
pub struct SearchDebouncer<A> {
    api: A,
    delay: Duration,
    pending: Mutex<Option<ScheduledTask>>,
    results: Arc<watch::Sender<SearchResults>>,
}

impl<A> SearchDebouncer<A>
where
    A: CatalogApi + Clone + 'static,
{
    /// Create a debouncer with the given quiet window.
    #[must_use]
    pub fn new(api: A, delay: Duration) -> Self {
        let (results, _) = watch::channel(SearchResults::default());
        Self {
            api,
            delay,
            pending: Mutex::new(None),
            results: Arc::new(results),
        }
    }

    /// Quiet window.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Feed the current contents of the search box.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn on_input(&self, text: &str) {
        let api = self.api.clone();
        let results = Arc::clone(&self.results);
        let query = text.to_string();

        let task = ScheduledTask::schedule(self.delay, async move {
            let products = run_search(&api, &query).await;
            results.send_replace(SearchResults { query, products });
        });

        let previous = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            debug!("superseding pending search");
            previous.cancel();
        }
    }

    /// Drop any pending search without sending it.
    pub fn cancel(&self) {
        if let Some(task) = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.cancel();
        }
    }

    /// Search immediately, bypassing the timer, and publish the results.
    pub async fn search_now(&self, text: &str) -> Vec<Product> {
        self.cancel();
        let products = run_search(&self.api, text).await;
        self.results.send_replace(SearchResults {
            query: text.to_string(),
            products: products.clone(),
        });
        products
    }

    /// Most recently published results.
    #[must_use]
    pub fn latest(&self) -> SearchResults {
        self.results.borrow().clone()
    }

    /// Watch published results.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SearchResults> {
        self.results.subscribe()
    }
}

/// Run one search. A blank query lists the whole catalog; failures yield an
/// empty result set.
#[instrument(skip(api))]
async fn run_search<A: CatalogApi>(api: &A, query: &str) -> Vec<Product> {
    let result = if query.trim().is_empty() {
        api.products().await
    } else {
        api.search(query).await
    };

    result.unwrap_or_else(|e| {
        warn!(error = %e, "search failed, showing no results");
        Vec::new()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use qkart_core::{Price, ProductId, Rating};

    use super::*;
    use crate::api::ApiError;

    fn product(id: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: id.to_string(),
            category: "Test".to_string(),
            cost: Price::from_units(1),
            rating: Rating::default(),
            image_url: String::new(),
        }
    }

    /// Catalog whose search answers with one product named after the query.
    #[derive(Clone, Default)]
    struct FakeCatalog {
        inner: Arc<FakeCatalogInner>,
    }

    #[derive(Default)]
    struct FakeCatalogInner {
        listings: AtomicUsize,
        queries: Mutex<Vec<String>>,
    }

    impl FakeCatalog {
        fn queries(&self) -> Vec<String> {
            self.inner.queries.lock().unwrap().clone()
        }
    }

    impl CatalogApi for FakeCatalog {
        async fn products(&self) -> Result<Vec<Product>, ApiError> {
            self.inner.listings.fetch_add(1, Ordering::SeqCst);
            Ok(vec![product("all-1"), product("all-2")])
        }

        async fn search(&self, query: &str) -> Result<Vec<Product>, ApiError> {
            self.inner.queries.lock().unwrap().push(query.to_string());
            match query {
                "slow" => tokio::time::sleep(Duration::from_secs(2)).await,
                "fast" => tokio::time::sleep(Duration::from_millis(10)).await,
                "broken" => {
                    return Err(ApiError::Status {
                        status: 500,
                        message: None,
                    });
                }
                _ => {}
            }
            Ok(vec![product(query)])
        }
    }

    const WINDOW: Duration = Duration::from_millis(500);

    #[tokio::test(start_paused = true)]
    async fn test_keystrokes_within_window_send_one_request() {
        let api = FakeCatalog::default();
        let debouncer = SearchDebouncer::new(api.clone(), WINDOW);
        let mut results = debouncer.subscribe();

        for text in ["l", "la", "lap", "lapt", "laptop"] {
            debouncer.on_input(text);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        results.changed().await.unwrap();

        assert_eq!(api.queries(), ["laptop"]);
        assert_eq!(debouncer.latest().query, "laptop");
        assert_eq!(debouncer.latest().products[0].id.as_str(), "laptop");
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_sent_before_quiet_window() {
        let api = FakeCatalog::default();
        let debouncer = SearchDebouncer::new(api.clone(), WINDOW);

        debouncer.on_input("lap");
        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(api.queries().is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(api.queries(), ["lap"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_windows_send_separate_requests() {
        let api = FakeCatalog::default();
        let debouncer = SearchDebouncer::new(api.clone(), WINDOW);

        debouncer.on_input("shoe");
        tokio::time::sleep(Duration::from_millis(600)).await;
        debouncer.on_input("shirt");
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(api.queries(), ["shoe", "shirt"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_stale_response_overwrites_newer_one() {
        let api = FakeCatalog::default();
        let debouncer = SearchDebouncer::new(api.clone(), WINDOW);

        debouncer.on_input("slow");
        tokio::time::sleep(Duration::from_millis(600)).await;
        debouncer.on_input("fast");
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(debouncer.latest().query, "fast");

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(api.queries(), ["slow", "fast"]);
        assert_eq!(debouncer.latest().query, "slow");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_search() {
        let api = FakeCatalog::default();
        let debouncer = SearchDebouncer::new(api.clone(), WINDOW);

        debouncer.on_input("lap");
        debouncer.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(api.queries().is_empty());
    }

    #[tokio::test]
    async fn test_blank_query_lists_catalog() {
        let api = FakeCatalog::default();
        let debouncer = SearchDebouncer::new(api.clone(), WINDOW);

        let products = debouncer.search_now("  ").await;

        assert_eq!(products.len(), 2);
        assert!(api.queries().is_empty());
        assert_eq!(api.inner.listings.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_search_is_empty() {
        let debouncer = SearchDebouncer::new(FakeCatalog::default(), WINDOW);
        assert!(debouncer.search_now("broken").await.is_empty());
        assert_eq!(debouncer.latest().query, "broken");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_task_never_runs() {
        let api = FakeCatalog::default();
        let task = {
            let api = api.clone();
            ScheduledTask::schedule(WINDOW, async move {
                let _ = api.search("late").await;
            })
        };
        drop(task);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(api.queries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_task_finishes_without_running() {
        let api = FakeCatalog::default();
        let task = {
            let api = api.clone();
            ScheduledTask::schedule(WINDOW, async move {
                let _ = api.search("late").await;
            })
        };
        assert!(!task.is_finished());

        task.cancel();
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(task.is_finished());
        assert!(api.queries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_finishes_after_delay() {
        let api = FakeCatalog::default();
        let task = {
            let api = api.clone();
            ScheduledTask::schedule(WINDOW, async move {
                let _ = api.search("lap").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(600)).await;

        assert!(task.is_finished());
        assert_eq!(api.queries(), ["lap"]);
    }
}
