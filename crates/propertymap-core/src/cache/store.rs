use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::{CachedData, FetchError};
use crate::api::ListingSource;
use crate::models::{PropertiesResponse, Property};

type RefreshResult = Result<PropertiesResponse, FetchError>;
type PendingRefresh = Shared<BoxFuture<'static, RefreshResult>>;

#[derive(Default)]
struct CacheState {
    snapshot: Option<CachedData<Arc<Vec<Property>>>>,
    /// At most one refresh is outstanding; later callers await this one
    in_flight: Option<PendingRefresh>,
}

struct Inner {
    source: Arc<dyn ListingSource>,
    page_size: usize,
    state: Mutex<CacheState>,
}

/// Process-wide property cache.
///
/// Create one per process at startup and hand clones to every request
/// handler; clones share the same snapshot and the same in-flight refresh.
#[derive(Clone)]
pub struct PropertyStore {
    inner: Arc<Inner>,
}

fn to_response(snapshot: &CachedData<Arc<Vec<Property>>>) -> PropertiesResponse {
    PropertiesResponse::new(snapshot.data.as_ref().clone(), snapshot.cached_at)
}

impl PropertyStore {
    pub fn new(source: Arc<dyn ListingSource>, page_size: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                page_size: page_size.max(1),
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    /// Current listings, from the cache when possible.
    ///
    /// A refresh happens when `force_refresh` is set or the cache holds no
    /// properties. If a refresh is already running, this waits for it instead
    /// of starting another. Fails only when the refresh could not fetch a
    /// single page; the previous snapshot is then left untouched.
    pub async fn fetch_properties(&self, force_refresh: bool) -> RefreshResult {
        let pending = {
            let mut state = self.inner.state.lock().await;

            if !force_refresh {
                if let Some(ref snapshot) = state.snapshot {
                    if !snapshot.data.is_empty() {
                        return Ok(to_response(snapshot));
                    }
                }
            }

            match state.in_flight.clone() {
                Some(pending) => {
                    debug!("Joining in-flight property refresh");
                    pending
                }
                None => {
                    let pending = self.start_refresh();
                    state.in_flight = Some(pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    /// Spawn the refresh so it completes even if every waiting caller goes away.
    fn start_refresh(&self) -> PendingRefresh {
        let task = tokio::spawn(Arc::clone(&self.inner).refresh());
        let inner = Arc::clone(&self.inner);

        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    error!(error = %e, "Property refresh task failed");
                    // The task never reached its own cleanup
                    inner.state.lock().await.in_flight = None;
                    Err(FetchError::RefreshAborted(e.to_string()))
                }
            }
        }
        .boxed()
        .shared()
    }

    /// The cached snapshot, without fetching.
    pub async fn cached(&self) -> Option<CachedData<Arc<Vec<Property>>>> {
        self.inner.state.lock().await.snapshot.clone()
    }

    pub async fn is_refreshing(&self) -> bool {
        self.inner.state.lock().await.in_flight.is_some()
    }
}

impl Inner {
    async fn refresh(self: Arc<Self>) -> RefreshResult {
        let result = self.fetch_all().await;

        let mut state = self.state.lock().await;
        state.in_flight = None;

        let properties = result?;
        let snapshot = CachedData::new(Arc::new(properties));
        let response = to_response(&snapshot);
        state.snapshot = Some(snapshot);
        Ok(response)
    }

    /// Walk every page in name order.
    ///
    /// Stops on a short page or once `total` raw records have been received,
    /// counting records later skipped for having no id. A failing page ends
    /// the walk; it is an error only if nothing was fetched yet.
    async fn fetch_all(&self) -> Result<Vec<Property>, FetchError> {
        let mut properties: Vec<Property> = Vec::new();
        let mut offset = 0;
        let mut received_total: u64 = 0;
        let mut skipped = 0;

        info!(page_size = self.page_size, "Refreshing properties from CRM");

        loop {
            let page = match self.source.fetch_page(offset, self.page_size).await {
                Ok(page) => page,
                Err(e) if !properties.is_empty() => {
                    warn!(
                        offset,
                        fetched = properties.len(),
                        error = %format!("{:#}", e),
                        "Listing page failed, keeping partial result"
                    );
                    break;
                }
                Err(e) => {
                    error!(offset, error = %format!("{:#}", e), "Listing fetch failed");
                    return Err(FetchError::upstream(offset, &e));
                }
            };

            let received = page.list.len();
            received_total += received as u64;
            for raw in page.list {
                match Property::from_raw(raw) {
                    Some(property) => properties.push(property),
                    None => skipped += 1,
                }
            }

            debug!(
                offset,
                received,
                fetched = properties.len(),
                total = page.total,
                "Fetched listing page"
            );

            if received < self.page_size || received_total >= page.total {
                break;
            }
            offset += self.page_size;
        }

        if skipped > 0 {
            warn!(skipped, "Skipped listing records without a usable id");
        }
        info!(count = properties.len(), "Property refresh complete");

        Ok(properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, ListingPage};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::time::Duration;

    /// Serves `records` in pages and fails at the configured offsets.
    struct MockSource {
        records: Vec<Value>,
        failing: std::sync::Mutex<Vec<usize>>,
        requested: std::sync::Mutex<Vec<usize>>,
        delay: Duration,
    }

    impl MockSource {
        fn new(count: usize) -> Self {
            let records = (0..count)
                .map(|i| json!({"id": format!("p{}", i), "name": format!("Unit {:02}", i)}))
                .collect();
            Self::with_records(records)
        }

        fn with_records(records: Vec<Value>) -> Self {
            Self {
                records,
                failing: std::sync::Mutex::new(Vec::new()),
                requested: std::sync::Mutex::new(Vec::new()),
                delay: Duration::ZERO,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn fail_at(&self, offset: usize) {
            self.failing.lock().unwrap().push(offset);
        }

        fn heal(&self) {
            self.failing.lock().unwrap().clear();
        }

        fn requested(&self) -> Vec<usize> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ListingSource for MockSource {
        async fn fetch_page(&self, offset: usize, max_size: usize) -> anyhow::Result<ListingPage> {
            self.requested.lock().unwrap().push(offset);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.failing.lock().unwrap().contains(&offset) {
                return Err(ApiError::ServerError {
                    status: 502,
                    body: "bad gateway".to_string(),
                }
                .into());
            }
            let start = offset.min(self.records.len());
            let end = (offset + max_size).min(self.records.len());
            Ok(ListingPage {
                list: self.records[start..end].to_vec(),
                total: self.records.len() as u64,
            })
        }
    }

    fn store(source: &Arc<MockSource>, page_size: usize) -> PropertyStore {
        PropertyStore::new(source.clone(), page_size)
    }

    fn ids(response: &PropertiesResponse) -> Vec<&str> {
        response.properties.iter().map(|p| p.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_pagination_walks_every_page_in_order() {
        let source = Arc::new(MockSource::new(5));
        let store = store(&source, 2);

        let response = store.fetch_properties(false).await.unwrap();

        assert_eq!(source.requested(), vec![0, 2, 4]);
        assert_eq!(ids(&response), vec!["p0", "p1", "p2", "p3", "p4"]);
        assert_eq!(response.total, 5);
    }

    #[tokio::test]
    async fn test_pagination_stops_when_total_reached() {
        let source = Arc::new(MockSource::new(4));
        let store = store(&source, 2);

        let response = store.fetch_properties(false).await.unwrap();

        // The second page is full, but the total is already reached
        assert_eq!(source.requested(), vec![0, 2]);
        assert_eq!(response.total, 4);
    }

    #[tokio::test]
    async fn test_cache_hit_makes_no_upstream_calls() {
        let source = Arc::new(MockSource::new(3));
        let store = store(&source, 2);

        let first = store.fetch_properties(false).await.unwrap();
        let calls = source.requested().len();

        for _ in 0..5 {
            let again = store.fetch_properties(false).await.unwrap();
            assert_eq!(again, first);
        }
        assert_eq!(source.requested().len(), calls);
    }

    #[tokio::test]
    async fn test_forced_refresh_refetches() {
        let source = Arc::new(MockSource::new(3));
        let store = store(&source, 2);

        store.fetch_properties(false).await.unwrap();
        store.fetch_properties(true).await.unwrap();

        assert_eq!(source.requested(), vec![0, 2, 0, 2]);
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_share_one_fetch() {
        let source = Arc::new(MockSource::new(5).with_delay(Duration::from_millis(20)));
        let store = store(&source, 2);

        let results =
            futures::future::join_all((0..10).map(|_| store.fetch_properties(true))).await;

        assert_eq!(source.requested(), vec![0, 2, 4]);
        let first = results[0].as_ref().unwrap();
        assert_eq!(first.total, 5);
        for result in &results {
            assert_eq!(result.as_ref().unwrap(), first);
        }
        assert!(!store.is_refreshing().await);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_a_failure() {
        let source = Arc::new(MockSource::new(5).with_delay(Duration::from_millis(10)));
        source.fail_at(0);
        let store = store(&source, 2);

        let results =
            futures::future::join_all((0..4).map(|_| store.fetch_properties(false))).await;

        assert_eq!(source.requested(), vec![0]);
        for result in results {
            assert!(matches!(
                result,
                Err(FetchError::UpstreamUnavailable { offset: 0, status: Some(502), .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_fetched_pages() {
        let source = Arc::new(MockSource::new(4));
        source.fail_at(2);
        let store = store(&source, 2);

        let response = store.fetch_properties(false).await.unwrap();
        assert_eq!(ids(&response), vec!["p0", "p1"]);

        let cached = store.cached().await.unwrap();
        assert_eq!(cached.data.len(), 2);

        // Served from cache, no further requests
        let again = store.fetch_properties(false).await.unwrap();
        assert_eq!(again, response);
        assert_eq!(source.requested(), vec![0, 2]);
    }

    #[tokio::test]
    async fn test_partial_refresh_replaces_a_larger_cache() {
        let source = Arc::new(MockSource::new(4));
        let store = store(&source, 2);

        assert_eq!(store.fetch_properties(false).await.unwrap().total, 4);

        source.fail_at(2);
        let response = store.fetch_properties(true).await.unwrap();
        assert_eq!(response.total, 2);
        assert_eq!(store.cached().await.unwrap().data.len(), 2);
    }

    #[tokio::test]
    async fn test_total_failure_with_empty_cache() {
        let source = Arc::new(MockSource::new(3));
        source.fail_at(0);
        let store = store(&source, 2);

        let err = store.fetch_properties(false).await.unwrap_err();
        assert_eq!(err.status(), Some(502));
        assert!(store.cached().await.is_none());
        assert!(!store.is_refreshing().await);

        // The failed refresh is not remembered; the next call tries again
        source.heal();
        let response = store.fetch_properties(false).await.unwrap();
        assert_eq!(response.total, 3);
    }

    #[tokio::test]
    async fn test_total_failure_leaves_cache_unchanged() {
        let source = Arc::new(MockSource::new(3));
        let store = store(&source, 2);

        let before = store.fetch_properties(false).await.unwrap();

        source.fail_at(0);
        assert!(store.fetch_properties(true).await.is_err());

        let after = store.fetch_properties(false).await.unwrap();
        assert_eq!(after, before);
        assert_eq!(after.last_fetched, before.last_fetched);
    }

    #[tokio::test]
    async fn test_empty_upstream_is_refetched_next_time() {
        let source = Arc::new(MockSource::new(0));
        let store = store(&source, 2);

        assert_eq!(store.fetch_properties(false).await.unwrap().total, 0);
        assert_eq!(store.fetch_properties(false).await.unwrap().total, 0);

        // An empty cache never counts as a hit
        assert_eq!(source.requested(), vec![0, 0]);
    }

    #[tokio::test]
    async fn test_unusable_records_are_skipped() {
        let source = Arc::new(MockSource::with_records(vec![
            json!({"id": "a"}),
            json!("not a record"),
            json!({"name": "no id"}),
            json!({"id": "b"}),
        ]));
        let store = store(&source, 10);

        let response = store.fetch_properties(false).await.unwrap();
        assert_eq!(ids(&response), vec!["a", "b"]);
        assert_eq!(response.total, 2);
    }

    #[tokio::test]
    async fn test_skipped_records_count_towards_total() {
        let source = Arc::new(MockSource::with_records(vec![
            json!({"id": "a"}),
            json!({"name": "no id"}),
            json!({"id": "c"}),
            json!({"id": "d"}),
        ]));
        let store = store(&source, 2);

        let response = store.fetch_properties(false).await.unwrap();

        // Four records received out of four, so no third page
        assert_eq!(source.requested(), vec![0, 2]);
        assert_eq!(ids(&response), vec!["a", "c", "d"]);
    }

    #[tokio::test]
    async fn test_zero_page_size_is_clamped() {
        let source = Arc::new(MockSource::new(2));
        let store = store(&source, 0);

        let response = store.fetch_properties(false).await.unwrap();
        assert_eq!(response.total, 2);
        assert_eq!(source.requested(), vec![0, 1]);
    }
}
