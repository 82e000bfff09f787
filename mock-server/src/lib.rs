use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub price: f64,
    pub rating: f64,
    pub store: String,
    pub url: String,
}

/// Shared handler state. `delay` is slept before every answer so clients can
/// exercise their timeouts against a real socket.
#[derive(Clone, Debug)]
pub struct MockState {
    pub catalog: Vec<Product>,
    pub delay: Duration,
}

pub const STORES: [(&str, &str); 3] = [
    ("amazon", "Amazon"),
    ("flipkart", "Flipkart"),
    ("snapdeal", "Snapdeal"),
];

pub fn catalog() -> Vec<Product> {
    let item = |name: &str, price: f64, rating: f64, store: &str| Product {
        name: name.to_string(),
        price,
        rating,
        store: store.to_string(),
        url: format!(
            "https://www.{}.com/p/{}",
            store.to_lowercase(),
            name.to_lowercase().replace(' ', "-")
        ),
    };
    vec![
        item("Laptop Pro 14", 74990.0, 4.5, "Amazon"),
        item("Laptop Pro 14", 72990.0, 4.4, "Flipkart"),
        item("Laptop Air 13", 54990.0, 4.2, "Snapdeal"),
        item("Laptop Air 13", 54990.0, 4.3, "Amazon"),
        item("Gaming Laptop 16", 119990.0, 4.7, "Flipkart"),
        item("Phone Max", 39999.0, 4.1, "Amazon"),
        item("Phone Max", 38499.0, 3.9, "Snapdeal"),
        item("Wireless Earbuds", 2999.0, 3.6, "Flipkart"),
    ]
}

pub fn app() -> Router {
    app_with_delay(Duration::ZERO)
}

pub fn app_with_delay(delay: Duration) -> Router {
    let state = MockState {
        catalog: catalog(),
        delay,
    };
    Router::new()
        .route("/search", get(search))
        .route("/stores", get(stores))
        .route("/compare", get(compare))
        .route("/health", get(health))
        .route("/intelligent-search", post(intelligent_search))
        .route("/add-to-watchlist", post(add_to_watchlist))
        .route("/smart-recommendations", post(smart_recommendations))
        .fallback(not_found)
        .with_state(state)
}

pub async fn run(listener: TcpListener, delay: Duration) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_delay(delay)).await
}

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn bad_request(message: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

async fn pause(state: &MockState) {
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
}

fn matching<'a>(catalog: &'a [Product], query: &str) -> Vec<&'a Product> {
    let needle = query.to_lowercase();
    catalog
        .iter()
        .filter(|p| needle.split_whitespace().all(|w| p.name.to_lowercase().contains(w)))
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub stores: String,
    #[serde(default = "default_sort")]
    pub sort: String,
    #[serde(default)]
    pub min_rating: f64,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_sort() -> String {
    "price".to_string()
}

fn default_limit() -> usize {
    20
}

async fn search(State(state): State<MockState>, Query(params): Query<SearchParams>) -> ApiResult {
    pause(&state).await;
    let query = params.q.trim();
    if query.is_empty() {
        return Err(bad_request("Query parameter \"q\" is required"));
    }

    let store_filter: Vec<String> = params
        .stores
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    if let Some(unknown) = store_filter
        .iter()
        .find(|s| !STORES.iter().any(|(key, _)| *key == s.as_str()))
    {
        return Err(bad_request(&format!("Invalid stores: {unknown}")));
    }

    let mut results: Vec<Product> = matching(&state.catalog, query)
        .into_iter()
        .filter(|p| store_filter.is_empty() || store_filter.contains(&p.store.to_lowercase()))
        .filter(|p| p.rating >= params.min_rating)
        .cloned()
        .collect();
    match params.sort.as_str() {
        "rating" => results.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
        "name" => results.sort_by_key(|p| p.name.to_lowercase()),
        _ => results.sort_by(|a, b| a.price.total_cmp(&b.price)),
    }
    results.truncate(params.limit);

    let stores = if store_filter.is_empty() {
        json!("all")
    } else {
        json!(store_filter)
    };
    Ok(Json(json!({
        "query": query,
        "total_results": results.len(),
        "search_time": "2024-01-01T12:00:00",
        "filters": {
            "stores": stores,
            "min_rating": params.min_rating,
            "sort_by": params.sort,
        },
        "results": results,
    })))
}

async fn stores(State(state): State<MockState>) -> Json<Value> {
    pause(&state).await;
    let stores: BTreeMap<&str, Value> = STORES
        .iter()
        .map(|(key, name)| (*key, json!({ "name": name, "status": "active" })))
        .collect();
    Json(json!({ "stores": stores, "total": stores.len() }))
}

#[derive(Debug, Deserialize)]
pub struct CompareParams {
    #[serde(default)]
    pub q: String,
}

async fn compare(State(state): State<MockState>, Query(params): Query<CompareParams>) -> ApiResult {
    pause(&state).await;
    let query = params.q.trim();
    if query.is_empty() {
        return Err(bad_request("Query parameter required"));
    }

    let results = matching(&state.catalog, query);
    let mut comparison: BTreeMap<String, Vec<&Product>> = BTreeMap::new();
    for product in &results {
        comparison
            .entry(product.store.to_lowercase())
            .or_default()
            .push(*product);
    }
    let best_price = results
        .iter()
        .map(|p| p.price)
        .filter(|price| *price > 0.0)
        .reduce(f64::min)
        .unwrap_or(0.0);
    let best_deals: Vec<&Product> = results
        .iter()
        .copied()
        .filter(|p| p.price == best_price)
        .collect();

    Ok(Json(json!({
        "query": query,
        "comparison": comparison,
        "best_price": best_price,
        "best_deals": best_deals,
        "total_products": results.len(),
    })))
}

async fn health(State(state): State<MockState>) -> Json<Value> {
    pause(&state).await;
    Json(json!({
        "status": "healthy",
        "timestamp": "2024-01-01T12:00:00",
        "scrapers": STORES.len(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct IntelligentSearchBody {
    pub query: String,
    #[serde(default)]
    pub preferences: Value,
    #[serde(default)]
    pub conversation_history: Vec<Value>,
}

async fn intelligent_search(
    State(state): State<MockState>,
    Json(body): Json<IntelligentSearchBody>,
) -> ApiResult {
    pause(&state).await;
    if body.query.trim().is_empty() {
        return Err(bad_request("query required"));
    }
    let search_query = body
        .query
        .split_whitespace()
        .filter(|w| !matches!(w.to_lowercase().as_str(), "cheap" | "best" | "a" | "good"))
        .collect::<Vec<_>>()
        .join(" ");
    let results: Vec<&Product> = matching(&state.catalog, &search_query);

    Ok(Json(json!({
        "intent_analysis": {
            "analysis": format!("You are looking for {search_query}."),
            "search_query": search_query,
            "turns_seen": body.conversation_history.len(),
        },
        "results": results,
        "ai_analysis": { "analysis": format!("{} offers compared.", results.len()) },
        "personalized_advice": "Compare ratings before buying.\nPrices dip during sales.",
        "total_results": results.len(),
        "preferences_seen": body.preferences,
    })))
}

#[derive(Debug, Deserialize)]
pub struct WatchlistBody {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub target_price: f64,
}

async fn add_to_watchlist(
    State(state): State<MockState>,
    Json(body): Json<WatchlistBody>,
) -> ApiResult {
    pause(&state).await;
    if body.query.is_empty() || body.target_price <= 0.0 {
        return Err(bad_request("Query and target price required"));
    }
    let user_id = body.user_id.unwrap_or_else(|| "anonymous".to_string());
    Ok(Json(json!({
        "message": format!("Watching '{}' for {} at or below {}", body.query, user_id, body.target_price),
        "watchlist_id": Uuid::new_v4(),
        "monitoring_active": true,
    })))
}

#[derive(Debug, Deserialize)]
pub struct RecommendationBody {
    #[serde(default)]
    pub user_behavior: Value,
    #[serde(default)]
    pub query: Option<String>,
}

async fn smart_recommendations(
    State(state): State<MockState>,
    Json(body): Json<RecommendationBody>,
) -> Json<Value> {
    pause(&state).await;
    let seed = body.query.unwrap_or_else(|| "laptop".to_string());
    let recommendations: Vec<&Product> = state
        .catalog
        .iter()
        .filter(|p| !p.name.to_lowercase().contains(&seed.to_lowercase()))
        .take(3)
        .collect();
    let history = body.user_behavior["search_history"]
        .as_array()
        .map_or(0, Vec::len);
    Json(json!({
        "recommendations": recommendations,
        "reasoning": format!("Alternatives to {seed}, based on {history} past searches."),
    }))
}

async fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Endpoint not found" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_serializes_to_json() {
        let product = &catalog()[0];
        let json = serde_json::to_value(product).unwrap();
        assert_eq!(json["name"], "Laptop Pro 14");
        assert_eq!(json["store"], "Amazon");
        assert_eq!(json["url"], "https://www.amazon.com/p/laptop-pro-14");
    }

    #[test]
    fn matching_requires_every_word() {
        let catalog = catalog();
        assert_eq!(matching(&catalog, "laptop").len(), 5);
        assert_eq!(matching(&catalog, "laptop air").len(), 2);
        assert!(matching(&catalog, "toaster").is_empty());
    }

    #[test]
    fn search_params_fill_defaults() {
        let params: SearchParams = serde_json::from_str(r#"{"q":"tv"}"#).unwrap();
        assert_eq!(params.sort, "price");
        assert_eq!(params.limit, 20);
        assert_eq!(params.min_rating, 0.0);
        assert!(params.stores.is_empty());
    }

    #[test]
    fn watchlist_body_requires_nothing_up_front() {
        let body: WatchlistBody = serde_json::from_str(r#"{"query":"tv"}"#).unwrap();
        assert_eq!(body.target_price, 0.0);
        assert!(body.user_id.is_none());
    }
}
