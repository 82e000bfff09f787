//! Request building, execution and outcome classification for the price API.
//!
//! # Design
//! `PriceClient` is an explicit value: a validated base URL, a timeout and an
//! injected `Transport`. It carries no mutable state between calls. Each
//! call is split the same way every time:
//!
//! 1. `build_request` turns an endpoint, parameters and optional JSON body
//!    into an `HttpRequest` (pure, no I/O).
//! 2. The transport runs exactly once, inside a per-call
//!    `tokio::time::timeout`. Expiry drops the transport future, which
//!    cancels the in-flight request and releases the timer with it.
//! 3. `classify` maps the `HttpResponse` to an `Outcome`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::ACCEPT;
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::params::QueryParams;
use crate::transport::{json_content_type, ReqwestTransport, Transport};
use crate::types::{
    decode, Comparison, Health, IntelligentSearch, IntelligentSearchRequest,
    RecommendationRequest, Recommendations, SearchResults, StoreDirectory, WatchlistReceipt,
    WatchlistRequest,
};

/// Classified result of one API call.
pub type Outcome<T = Value> = Result<T, ApiError>;

pub const SEARCH: &str = "/search";
pub const STORES: &str = "/stores";
pub const COMPARE: &str = "/compare";
pub const HEALTH: &str = "/health";
pub const INTELLIGENT_SEARCH: &str = "/intelligent-search";
pub const ADD_TO_WATCHLIST: &str = "/add-to-watchlist";
pub const SMART_RECOMMENDATIONS: &str = "/smart-recommendations";

pub const DEFAULT_SORT: &str = "price";
pub const DEFAULT_LIMIT: u32 = 20;
pub const DEFAULT_MIN_RATING: f64 = 0.0;

/// Method and optional JSON body for `PriceClient::request`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub method: Option<HttpMethod>,
    pub body: Option<Value>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: Value) -> Self {
        Self {
            method: Some(HttpMethod::Post),
            body: Some(body),
        }
    }
}

/// Optional knobs for `/search`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Store keys to restrict to. Empty means all stores.
    pub stores: Vec<String>,
    pub sort: String,
    pub min_rating: f64,
    pub limit: u32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            stores: Vec::new(),
            sort: DEFAULT_SORT.to_string(),
            min_rating: DEFAULT_MIN_RATING,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl SearchOptions {
    /// `/search` parameters in wire order: `q, stores, sort, min_rating, limit`.
    /// A blank sort, a NaN rating or a zero limit falls back to its default.
    pub fn to_params(&self, query: &str) -> QueryParams {
        let sort = if self.sort.is_empty() {
            DEFAULT_SORT
        } else {
            self.sort.as_str()
        };
        let min_rating = if self.min_rating.is_nan() {
            DEFAULT_MIN_RATING
        } else {
            self.min_rating
        };
        let limit = if self.limit == 0 {
            DEFAULT_LIMIT
        } else {
            self.limit
        };
        QueryParams::new()
            .with("q", query)
            .with("stores", self.stores.join(","))
            .with("sort", sort)
            .with("min_rating", min_rating)
            .with("limit", limit)
    }
}

/// Client for the price-comparison service.
#[derive(Clone)]
pub struct PriceClient {
    base_url: Url,
    timeout: Duration,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for PriceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl PriceClient {
    /// Client that talks to the network through `reqwest`.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: config.base_url().clone(),
            timeout: config.timeout(),
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build the request for `endpoint` without sending it.
    ///
    /// Surviving `params` become the query string. A `body` is encoded as
    /// JSON and adds a `content-type: application/json` header.
    pub fn build_request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        params: &QueryParams,
        body: Option<&Value>,
    ) -> Result<HttpRequest, ApiError> {
        let mut url = self.base_url.clone();
        let base_path = url.path().trim_end_matches('/').to_string();
        let endpoint = endpoint.trim_start_matches('/');
        url.set_path(&format!("{base_path}/{endpoint}"));
        url.set_query(None);

        let pairs: Vec<(&str, String)> = params.pairs().collect();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }

        let mut headers = vec![(ACCEPT.as_str().to_string(), "application/json".to_string())];
        let body = match body {
            Some(value) => {
                headers.push(json_content_type());
                Some(
                    serde_json::to_string(value)
                        .map_err(|e| ApiError::Serialization(e.to_string()))?,
                )
            }
            None => None,
        };

        Ok(HttpRequest {
            method,
            url: url.into(),
            headers,
            body,
        })
    }

    /// Send one request and classify the result.
    ///
    /// The method defaults to GET, or POST when a body is given. The call
    /// makes a single attempt; every failure comes back as an `ApiError`.
    pub async fn request(
        &self,
        endpoint: &str,
        params: &QueryParams,
        options: RequestOptions,
    ) -> Outcome<Value> {
        let method = options.method.unwrap_or(if options.body.is_some() {
            HttpMethod::Post
        } else {
            HttpMethod::Get
        });
        let request = self.build_request(method, endpoint, params, options.body.as_ref())?;
        self.execute(request).await
    }

    /// Run an already-built request through the transport under the timeout.
    pub async fn execute(&self, request: HttpRequest) -> Outcome<Value> {
        let method = request.method.as_str();
        let url = request.url.clone();
        let started = Instant::now();
        debug!(method, url = %url, "sending request");

        let response = match tokio::time::timeout(self.timeout, self.transport.send(request)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                warn!(method, url = %url, error = %err, "transport failed");
                return Err(err.into());
            }
            Err(_) => {
                warn!(
                    method,
                    url = %url,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "request timed out"
                );
                return Err(ApiError::Timeout);
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        debug!(method, url = %url, status = response.status, elapsed_ms, "request finished");
        classify(response)
    }

    async fn post_json<B: Serialize>(&self, endpoint: &str, body: &B) -> Outcome<Value> {
        let body = serde_json::to_value(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        self.request(endpoint, &QueryParams::new(), RequestOptions::post(body))
            .await
    }

    pub async fn search_products(&self, query: &str, options: &SearchOptions) -> Outcome<SearchResults> {
        let payload = self
            .request(SEARCH, &options.to_params(query), RequestOptions::get())
            .await?;
        decode(payload)
    }

    pub async fn get_stores(&self) -> Outcome<StoreDirectory> {
        let payload = self
            .request(STORES, &QueryParams::new(), RequestOptions::get())
            .await?;
        decode(payload)
    }

    pub async fn compare_products(&self, query: &str) -> Outcome<Comparison> {
        let params = QueryParams::new().with("q", query);
        let payload = self.request(COMPARE, &params, RequestOptions::get()).await?;
        decode(payload)
    }

    pub async fn get_health(&self) -> Outcome<Health> {
        let payload = self
            .request(HEALTH, &QueryParams::new(), RequestOptions::get())
            .await?;
        decode(payload)
    }

    pub async fn intelligent_search(
        &self,
        body: &IntelligentSearchRequest,
    ) -> Outcome<IntelligentSearch> {
        decode(self.post_json(INTELLIGENT_SEARCH, body).await?)
    }

    pub async fn add_to_watchlist(&self, body: &WatchlistRequest) -> Outcome<WatchlistReceipt> {
        decode(self.post_json(ADD_TO_WATCHLIST, body).await?)
    }

    pub async fn smart_recommendations(
        &self,
        body: &RecommendationRequest,
    ) -> Outcome<Recommendations> {
        decode(self.post_json(SMART_RECOMMENDATIONS, body).await?)
    }
}

/// Map a response to an `Outcome`.
///
/// 2xx with a JSON body is a success. Any other status is an `HttpError`.
/// A 2xx body that is not JSON counts as a malformed response.
pub fn classify(response: HttpResponse) -> Outcome<Value> {
    if !response.is_success() {
        warn!(status = response.status, "service returned an error status");
        return Err(ApiError::HttpError {
            status: response.status,
            body: response.body,
        });
    }
    serde_json::from_str(&response.body).map_err(|e| {
        warn!(error = %e, "response body is not valid JSON");
        ApiError::NetworkError(format!("malformed response body: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::error::{TransportError, TIMEOUT_MESSAGE};

    fn config() -> ClientConfig {
        ClientConfig::new("http://localhost:5000").unwrap()
    }

    fn ok(body: &str) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: body.to_string(),
        })
    }

    /// Replays canned results in order and records every request it sees.
    #[derive(Default)]
    struct Scripted {
        replies: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<HttpResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }

        fn last(&self) -> HttpRequest {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Other("script exhausted".into())))
        }
    }

    /// Sleeps before answering and flags when it got to finish.
    struct Slow {
        delay: Duration,
        finished: AtomicBool,
        started: AtomicUsize,
    }

    #[async_trait]
    impl Transport for Slow {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.finished.store(true, Ordering::SeqCst);
            ok("{}")
        }
    }

    /// Never answers.
    struct Hung;

    #[async_trait]
    impl Transport for Hung {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            std::future::pending().await
        }
    }

    /// Delay chosen by path: `/slow` hangs long, everything else answers fast.
    struct ByPath;

    #[async_trait]
    impl Transport for ByPath {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let delay = if request.url.contains("/slow") {
                Duration::from_secs(5)
            } else {
                Duration::from_millis(20)
            };
            tokio::time::sleep(delay).await;
            ok(r#"{"path":"fast"}"#)
        }
    }

    // --- building ---

    #[test]
    fn search_example_query_string() {
        let client = PriceClient::with_transport(config(), Scripted::new(vec![]));
        let params = QueryParams::new()
            .with("q", "laptop")
            .with("stores", "")
            .with("sort", "price")
            .with("min_rating", 0)
            .with("limit", 20);
        let req = client
            .build_request(HttpMethod::Get, SEARCH, &params, None)
            .unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(
            req.url,
            "http://localhost:5000/search?q=laptop&sort=price&min_rating=0&limit=20"
        );
        assert_eq!(req.query(), Some("q=laptop&sort=price&min_rating=0&limit=20"));
        assert!(req.body.is_none());
    }

    #[test]
    fn no_surviving_params_means_no_question_mark() {
        let client = PriceClient::with_transport(config(), Scripted::new(vec![]));
        let params = QueryParams::new().with("stores", "");
        let req = client
            .build_request(HttpMethod::Get, STORES, &params, None)
            .unwrap();
        assert_eq!(req.url, "http://localhost:5000/stores");
        assert_eq!(req.query(), None);
    }

    #[test]
    fn base_path_is_kept() {
        let config = ClientConfig::new("https://api.example.com/v1/").unwrap();
        let client = PriceClient::with_transport(config, Scripted::new(vec![]));
        let req = client
            .build_request(HttpMethod::Get, "health", &QueryParams::new(), None)
            .unwrap();
        assert_eq!(req.url, "https://api.example.com/v1/health");
    }

    #[test]
    fn query_values_are_url_encoded() {
        let client = PriceClient::with_transport(config(), Scripted::new(vec![]));
        let params = QueryParams::new().with("q", "usb c & hdmi");
        let req = client
            .build_request(HttpMethod::Get, COMPARE, &params, None)
            .unwrap();
        assert_eq!(req.query(), Some("q=usb+c+%26+hdmi"));
    }

    #[test]
    fn post_carries_json_body_and_content_type() {
        let client = PriceClient::with_transport(config(), Scripted::new(vec![]));
        let body = json!({"query": "tv", "target_price": 25000.0});
        let req = client
            .build_request(HttpMethod::Post, ADD_TO_WATCHLIST, &QueryParams::new(), Some(&body))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:5000/add-to-watchlist");
        assert!(req
            .headers
            .contains(&("content-type".to_string(), "application/json".to_string())));
        let sent: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(sent, body);
    }

    #[test]
    fn search_options_defaults() {
        let params = SearchOptions::default().to_params("phone");
        let pairs: Vec<_> = params.pairs().collect();
        assert_eq!(
            pairs,
            vec![
                ("q", "phone".to_string()),
                ("sort", "price".to_string()),
                ("min_rating", "0".to_string()),
                ("limit", "20".to_string()),
            ]
        );
    }

    #[test]
    fn search_options_join_stores_and_default_blank_sort() {
        let options = SearchOptions {
            stores: vec!["amazon".into(), "flipkart".into()],
            sort: String::new(),
            min_rating: 3.5,
            limit: 50,
        };
        let params = options.to_params("tv");
        let pairs: Vec<_> = params.pairs().collect();
        assert_eq!(pairs[1], ("stores", "amazon,flipkart".to_string()));
        assert_eq!(pairs[2], ("sort", "price".to_string()));
        assert_eq!(pairs[3], ("min_rating", "3.5".to_string()));
    }

    #[test]
    fn search_options_zero_limit_and_nan_rating_use_defaults() {
        let options = SearchOptions {
            min_rating: f64::NAN,
            limit: 0,
            ..SearchOptions::default()
        };
        let params = options.to_params("tv");
        let pairs: Vec<_> = params.pairs().collect();
        assert_eq!(
            pairs,
            vec![
                ("q", "tv".to_string()),
                ("sort", "price".to_string()),
                ("min_rating", "0".to_string()),
                ("limit", "20".to_string()),
            ]
        );
    }

    // --- classification ---

    #[test]
    fn classify_success() {
        let payload = classify(HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: r#"{"status":"healthy"}"#.to_string(),
        })
        .unwrap();
        assert_eq!(payload["status"], "healthy");
    }

    #[test]
    fn classify_not_found() {
        let err = classify(HttpResponse {
            status: 404,
            headers: Vec::new(),
            body: r#"{"error":"Endpoint not found"}"#.to_string(),
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 404, .. }));
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn classify_bad_json_is_network_error() {
        let err = classify(HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: "<html>".to_string(),
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::NetworkError(_)));
    }

    // --- lifecycle ---

    #[tokio::test]
    async fn success_returns_payload() {
        let transport = Scripted::new(vec![ok(r#"{"results":[],"total_results":0}"#)]);
        let client = PriceClient::with_transport(config(), transport.clone());
        let payload = client
            .request(SEARCH, &QueryParams::new().with("q", "x"), RequestOptions::get())
            .await
            .unwrap();
        assert_eq!(payload["total_results"], 0);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn server_error_is_not_retried() {
        let transport = Scripted::new(vec![
            Ok(HttpResponse {
                status: 500,
                headers: Vec::new(),
                body: "boom".into(),
            }),
            ok("{}"),
        ]);
        let client = PriceClient::with_transport(config(), transport.clone());
        let err = client.get_health().await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn connection_failure_is_network_error() {
        let transport = Scripted::new(vec![Err(TransportError::Connect(
            "tcp connect error: Connection refused (os error 111)".into(),
        ))]);
        let client = PriceClient::with_transport(config(), transport.clone());
        let err = client.get_stores().await.unwrap_err();
        match &err {
            ApiError::NetworkError(msg) => assert!(msg.contains("Connection refused")),
            other => panic!("expected NetworkError, got {other:?}"),
        }
        assert!(!err.is_timeout());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn hung_transport_times_out() {
        let client = PriceClient::with_transport(
            config().with_timeout(Duration::from_millis(1)),
            Arc::new(Hung),
        );
        let started = Instant::now();
        let err = client.get_health().await.unwrap_err();
        assert_eq!(err, ApiError::Timeout);
        assert_eq!(err.to_string(), TIMEOUT_MESSAGE);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn timed_out_request_is_cancelled() {
        let slow = Arc::new(Slow {
            delay: Duration::from_millis(200),
            finished: AtomicBool::new(false),
            started: AtomicUsize::new(0),
        });
        let client = PriceClient::with_transport(
            config().with_timeout(Duration::from_millis(10)),
            slow.clone(),
        );
        let err = client.get_health().await.unwrap_err();
        assert!(err.is_timeout());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(slow.started.load(Ordering::SeqCst), 1);
        assert!(!slow.finished.load(Ordering::SeqCst), "transport kept running");
    }

    #[tokio::test]
    async fn late_response_is_still_a_timeout() {
        let slow = Arc::new(Slow {
            delay: Duration::from_millis(100),
            finished: AtomicBool::new(false),
            started: AtomicUsize::new(0),
        });
        let client = PriceClient::with_transport(
            config().with_timeout(Duration::from_millis(20)),
            slow,
        );
        let outcome = client
            .request(HEALTH, &QueryParams::new(), RequestOptions::get())
            .await;
        assert_eq!(outcome, Err(ApiError::Timeout));
    }

    #[tokio::test]
    async fn timeouts_are_scoped_per_call() {
        let client = PriceClient::with_transport(
            config().with_timeout(Duration::from_millis(200)),
            Arc::new(ByPath),
        );
        let params = QueryParams::new();
        let (slow, fast) = tokio::join!(
            client.request("/slow", &params, RequestOptions::get()),
            client.request("/fast", &params, RequestOptions::get()),
        );
        assert_eq!(slow, Err(ApiError::Timeout));
        assert_eq!(fast.unwrap()["path"], "fast");
    }

    #[tokio::test]
    async fn body_switches_default_method_to_post() {
        let transport = Scripted::new(vec![ok(r#"{"message":"ok"}"#)]);
        let client = PriceClient::with_transport(config(), transport.clone());
        client
            .add_to_watchlist(&WatchlistRequest {
                user_id: "u1".into(),
                query: "iphone".into(),
                target_price: 50000.0,
            })
            .await
            .unwrap();
        let sent = transport.last();
        assert_eq!(sent.method, HttpMethod::Post);
        assert_eq!(sent.url, "http://localhost:5000/add-to-watchlist");
        let body: Value = serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["user_id"], "u1");
        assert_eq!(body["target_price"], 50000.0);
    }

    #[tokio::test]
    async fn typed_search_decodes_results() {
        let transport = Scripted::new(vec![ok(
            r#"{"query":"laptop","total_results":1,"results":[{"name":"X","price":100.0,"rating":4.5,"store":"Amazon","url":"https://a"}]}"#,
        )]);
        let client = PriceClient::with_transport(config(), transport.clone());
        let results = client
            .search_products("laptop", &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(results.results[0].rating, Some(4.5));
        assert_eq!(
            transport.last().query(),
            Some("q=laptop&sort=price&min_rating=0&limit=20")
        );
    }
}
