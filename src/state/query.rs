// Cached read state machine.
// Idle -> Loading -> Success | Failed, re-entered on endpoint change or refetch.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::Method;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::{ApiClient, RequestConfig};
use crate::cache::{ApiCache, DEFAULT_TTL};
use crate::error::{Error, Result, SharedError};

use super::request::{ErrorCallback, RequestState, SuccessCallback};

/// Options for a [`Query`].
pub struct QueryOptions<T> {
    /// Load on [`Query::mount`].
    pub auto_fetch: bool,
    /// TTL of the cache entry written after each successful fetch.
    pub cache_time: Duration,
    /// Per-call request overrides.
    pub request: RequestConfig,
    on_success: Option<SuccessCallback<T>>,
    on_error: Option<ErrorCallback>,
}

impl<T> Default for QueryOptions<T> {
    fn default() -> Self {
        Self {
            auto_fetch: true,
            cache_time: DEFAULT_TTL,
            request: RequestConfig::default(),
            on_success: None,
            on_error: None,
        }
    }
}

impl<T> QueryOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto_fetch(mut self, enabled: bool) -> Self {
        self.auto_fetch = enabled;
        self
    }

    pub fn cache_time(mut self, ttl: Duration) -> Self {
        self.cache_time = ttl;
        self
    }

    pub fn request(mut self, config: RequestConfig) -> Self {
        self.request = config;
        self
    }

    pub fn on_success(mut self, callback: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl Fn(&Arc<Error>) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }
}

/// Ownership of the query's single fetch slot.
///
/// `seq` moves on every load, endpoint change and unmount. A result is only
/// published while holding this lock and only if its `seq` is still current.
struct Flight {
    seq: u64,
    endpoint: String,
    cancel: Option<CancellationToken>,
}

impl Flight {
    /// Supersede whatever is running.
    fn bump(&mut self) {
        self.seq += 1;
        if let Some(previous) = self.cancel.take() {
            previous.cancel();
        }
    }
}

enum Outcome<T> {
    Success(T),
    Failure(SharedError),
}

/// Read access to one endpoint, backed by the shared response cache.
///
/// At most one fetch is in flight: starting another, changing the endpoint or
/// unmounting cancels it, and a completion whose sequence number is no
/// longer current is discarded without touching state or callbacks.
pub struct Query<T> {
    client: Arc<ApiClient>,
    cache: Arc<ApiCache>,
    options: QueryOptions<T>,
    state: watch::Sender<RequestState<T>>,
    flight: Mutex<Flight>,
}

impl<T> Query<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(
        client: Arc<ApiClient>,
        cache: Arc<ApiCache>,
        endpoint: impl Into<String>,
        options: QueryOptions<T>,
    ) -> Self {
        let (state, _) = watch::channel(RequestState::Idle);
        Self {
            client,
            cache,
            options,
            state,
            flight: Mutex::new(Flight {
                seq: 0,
                endpoint: endpoint.into(),
                cancel: None,
            }),
        }
    }

    /// Initial load: served from cache when a live entry exists.
    pub async fn mount(&self) {
        if self.options.auto_fetch {
            self.load(true).await;
        }
    }

    /// Fetch from the network regardless of the cache, then overwrite the entry.
    pub async fn refetch(&self) {
        self.load(false).await;
    }

    /// Point at a new endpoint, cancelling any fetch for the old one.
    pub async fn set_endpoint(&self, endpoint: impl Into<String>) {
        {
            let mut flight = self.flight.lock();
            flight.bump();
            flight.endpoint = endpoint.into();
        }
        if self.options.auto_fetch {
            self.load(true).await;
        }
    }

    /// Drop cache entries for this endpoint and refetch.
    pub async fn invalidate(&self) {
        self.cache.clear(Some(&self.endpoint()));
        self.refetch().await;
    }

    /// Cancel the in-flight fetch; its completion will not update state.
    pub fn unmount(&self) {
        self.flight.lock().bump();
    }

    pub fn endpoint(&self) -> String {
        self.flight.lock().endpoint.clone()
    }

    pub fn state(&self) -> RequestState<T> {
        self.state.borrow().clone()
    }

    /// Receive every state transition.
    pub fn subscribe(&self) -> watch::Receiver<RequestState<T>> {
        self.state.subscribe()
    }

    async fn load(&self, use_cache: bool) {
        let (seq, endpoint, cancel) = {
            let mut flight = self.flight.lock();
            flight.bump();
            let cancel = flight.cancel.insert(CancellationToken::new()).clone();
            (flight.seq, flight.endpoint.clone(), cancel)
        };

        if use_cache {
            if let Some(cached) = self.cache.get(&endpoint) {
                match serde_json::from_value::<T>(cached) {
                    Ok(data) => {
                        debug!(endpoint = %endpoint, "serving query from cache");
                        self.publish(seq, Outcome::Success(data), true, || {});
                        return;
                    }
                    Err(err) => {
                        debug!(endpoint = %endpoint, error = %err, "cached value has another shape, fetching");
                    }
                }
            }
        }

        {
            let flight = self.flight.lock();
            if flight.seq != seq {
                return;
            }
            self.state.send_replace(RequestState::Loading);
        }

        let result = self
            .client
            .request(
                Method::GET,
                &endpoint,
                None,
                self.options.request.clone(),
                &cancel,
            )
            .await;

        let mut fresh = None;
        let outcome: Result<T> = result.and_then(|response| {
            let data = serde_json::from_value(response.data.clone())?;
            fresh = Some(response.data);
            Ok(data)
        });
        let outcome = match outcome {
            Ok(data) => Outcome::Success(data),
            Err(err) => Outcome::Failure(Arc::new(err)),
        };

        let cache_time = self.options.cache_time;
        let published = self.publish(seq, outcome, false, || {
            if let Some(fresh) = fresh {
                self.cache.set(&endpoint, fresh, cache_time);
            }
        });
        if !published {
            debug!(endpoint = %endpoint, seq, "discarding superseded query result");
        }
    }

    /// Publish `outcome` if `seq` is still current, then run the callbacks.
    ///
    /// The sequence check, `write` and the state update happen under the
    /// flight lock; callbacks run after it is released.
    fn publish(&self, seq: u64, outcome: Outcome<T>, cached: bool, write: impl FnOnce()) -> bool {
        {
            let mut flight = self.flight.lock();
            if flight.seq != seq {
                return false;
            }
            flight.cancel = None;
            write();
            let next = match &outcome {
                Outcome::Success(data) => RequestState::Success {
                    data: data.clone(),
                    cached,
                },
                Outcome::Failure(err) => RequestState::Failed(err.clone()),
            };
            self.state.send_replace(next);
        }

        match outcome {
            Outcome::Success(data) => {
                if let Some(callback) = &self.options.on_success {
                    callback(&data);
                }
            }
            Outcome::Failure(err) => {
                if let Some(callback) = &self.options.on_error {
                    callback(&err);
                }
            }
        }
        true
    }
}

impl<T> Drop for Query<T> {
    fn drop(&mut self) {
        self.flight.get_mut().bump();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RetryPolicy;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Clone, Deserialize, PartialEq)]
    struct Package {
        id: u32,
        title: String,
    }

    fn client(server: &MockServer) -> Arc<ApiClient> {
        Arc::new(
            ApiClient::builder(server.uri())
                .retry(RetryPolicy::none())
                .build()
                .unwrap(),
        )
    }

    async fn mount_packages(server: &MockServer, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/packages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": 1, "title": "Kashmir Bliss"}]
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    fn kashmir() -> Vec<Package> {
        vec![Package {
            id: 1,
            title: "Kashmir Bliss".to_string(),
        }]
    }

    #[tokio::test]
    async fn test_second_mount_is_served_from_cache() {
        let server = MockServer::start().await;
        mount_packages(&server, 1).await;

        let client = client(&server);
        let cache = Arc::new(ApiCache::new());
        let options = || QueryOptions::new().cache_time(Duration::from_secs(60));

        let first = Query::<Vec<Package>>::new(client.clone(), cache.clone(), "/packages", options());
        first.mount().await;
        assert_eq!(first.state().data(), Some(&kashmir()));
        assert!(!first.state().is_cached());

        let second = Query::<Vec<Package>>::new(client, cache, "/packages", options());
        second.mount().await;
        assert!(second.state().is_cached());
        assert_eq!(second.state().data(), Some(&kashmir()));

        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_refetch_bypasses_and_overwrites_cache() {
        let server = MockServer::start().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        Mock::given(method("GET"))
            .and(path("/faqs"))
            .respond_with(move |_: &wiremock::Request| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                ResponseTemplate::new(200).set_body_json(json!({ "data": [n] }))
            })
            .mount(&server)
            .await;

        let cache = Arc::new(ApiCache::new());
        cache.set_default("/faqs", json!([99]));

        let query = Query::<Vec<usize>>::new(client(&server), cache.clone(), "/faqs", QueryOptions::new());
        query.mount().await;
        assert_eq!(query.state().data(), Some(&vec![99]));

        query.refetch().await;
        assert_eq!(query.state().data(), Some(&vec![0]));
        assert!(!query.state().is_cached());
        assert_eq!(cache.get("/faqs"), Some(json!([0])));

        query.refetch().await;
        assert_eq!(cache.get("/faqs"), Some(json!([1])));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_auto_fetch_disabled_stays_idle() {
        let server = MockServer::start().await;
        mount_packages(&server, 0).await;

        let query = Query::<Vec<Package>>::new(
            client(&server),
            Arc::new(ApiCache::new()),
            "/packages",
            QueryOptions::new().auto_fetch(false),
        );
        query.mount().await;

        assert!(query.state().is_idle());
    }

    #[tokio::test]
    async fn test_failure_invokes_on_error_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let errors = Arc::new(AtomicUsize::new(0));
        let successes = Arc::new(AtomicUsize::new(0));
        let (e, s) = (errors.clone(), successes.clone());
        let query = Query::<Vec<Package>>::new(
            client(&server),
            Arc::new(ApiCache::new()),
            "/missing",
            QueryOptions::new()
                .on_error(move |_| {
                    e.fetch_add(1, Ordering::SeqCst);
                })
                .on_success(move |_| {
                    s.fetch_add(1, Ordering::SeqCst);
                }),
        );
        query.mount().await;

        let state = query.state();
        assert_eq!(state.error().and_then(|e| e.status()), Some(404));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(successes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_endpoint_change_discards_slow_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": ["slow"]}))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": ["fast"]})))
            .mount(&server)
            .await;

        let successes = Arc::new(AtomicUsize::new(0));
        let s = successes.clone();
        let query = Arc::new(Query::<Vec<String>>::new(
            client(&server),
            Arc::new(ApiCache::new()),
            "/slow",
            QueryOptions::new().on_success(move |_| {
                s.fetch_add(1, Ordering::SeqCst);
            }),
        ));

        let background = query.clone();
        let slow = tokio::spawn(async move { background.mount().await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        query.set_endpoint("/fast").await;
        slow.await.unwrap();

        assert_eq!(query.state().data(), Some(&vec!["fast".to_string()]));
        assert_eq!(successes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unmount_suppresses_state_update() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": []}))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;

        let cache = Arc::new(ApiCache::new());
        let query = Arc::new(Query::<Vec<Package>>::new(
            client(&server),
            cache.clone(),
            "/packages",
            QueryOptions::new(),
        ));
        let mut updates = query.subscribe();

        let background = query.clone();
        let task = tokio::spawn(async move { background.mount().await });
        updates.changed().await.unwrap();
        assert!(updates.borrow_and_update().is_loading());

        query.unmount();
        task.await.unwrap();

        assert!(query.state().is_loading());
        assert!(!cache.contains("/packages"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_slow_callback_cannot_overwrite_newer_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": ["old"]})))
            .mount(&server)
            .await;

        let cache = Arc::new(ApiCache::new());
        cache.set_default("/new", json!(["new"]));

        let reached = Arc::new(tokio::sync::Notify::new());
        let blocked = Arc::new(AtomicBool::new(false));
        let (notify, first) = (reached.clone(), blocked.clone());
        let query = Arc::new(Query::<Vec<String>>::new(
            client(&server),
            cache,
            "/old",
            QueryOptions::new().on_success(move |_| {
                if !first.swap(true, Ordering::SeqCst) {
                    notify.notify_one();
                    std::thread::sleep(Duration::from_millis(300));
                }
            }),
        ));

        let background = query.clone();
        let old = tokio::spawn(async move { background.refetch().await });
        reached.notified().await;

        query.set_endpoint("/new").await;
        old.await.unwrap();

        assert_eq!(query.endpoint(), "/new");
        let state = query.state();
        assert!(state.is_cached());
        assert_eq!(state.data(), Some(&vec!["new".to_string()]));
    }

    #[tokio::test]
    async fn test_cache_hit_supersedes_running_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/faqs"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": [1]}))
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;

        let cache = Arc::new(ApiCache::new());
        let query = Arc::new(Query::<Vec<u32>>::new(
            client(&server),
            cache.clone(),
            "/faqs",
            QueryOptions::new(),
        ));

        let background = query.clone();
        let slow = tokio::spawn(async move { background.refetch().await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        cache.set_default("/faqs", json!([2]));
        query.mount().await;
        slow.await.unwrap();

        assert_eq!(query.state().data(), Some(&vec![2]));
        assert!(query.state().is_cached());
    }

    #[tokio::test]
    async fn test_invalidate_refetches() {
        let server = MockServer::start().await;
        mount_packages(&server, 2).await;

        let cache = Arc::new(ApiCache::new());
        let query = Query::<Vec<Package>>::new(client(&server), cache.clone(), "/packages", QueryOptions::new());
        query.mount().await;
        query.invalidate().await;

        assert!(!query.state().is_cached());
        assert!(cache.contains("/packages"));
    }
}
