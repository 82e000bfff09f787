//! Typed views over the service's JSON payloads.
//!
//! # Design
//! The service owns these schemas. Every field the display layer does not
//! strictly need is optional or defaulted, so a payload with extra or
//! missing fields still decodes. Request bodies for the assistant endpoints
//! are defined here too, since the client serializes them.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// Decode an opaque payload into one of the views below.
///
/// A payload that does not fit the view is reported as a malformed body.
pub fn decode<T: DeserializeOwned>(payload: Value) -> Result<T, ApiError> {
    serde_json::from_value(payload)
        .map_err(|e| ApiError::NetworkError(format!("unexpected response shape: {e}")))
}

/// One listing from one store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Product {
    pub name: String,
    pub price: f64,
    pub rating: Option<f64>,
    pub store: String,
    pub url: String,
}

/// Filters echoed back by `/search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SearchFilters {
    /// Either a list of store keys or the string `"all"`.
    pub stores: Value,
    pub min_rating: Option<f64>,
    pub sort_by: Option<String>,
}

/// Body of `/search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SearchResults {
    pub query: String,
    pub total_results: usize,
    pub search_time: Option<String>,
    pub filters: Option<SearchFilters>,
    pub results: Vec<Product>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StoreInfo {
    pub name: String,
    pub status: String,
}

/// Body of `/stores`, keyed by store id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StoreDirectory {
    pub stores: BTreeMap<String, StoreInfo>,
    pub total: usize,
}

/// Body of `/compare`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Comparison {
    pub query: String,
    pub comparison: BTreeMap<String, Vec<Product>>,
    pub best_price: f64,
    pub best_deals: Vec<Product>,
    pub total_products: usize,
}

/// Body of `/health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Health {
    pub status: String,
    pub timestamp: Option<String>,
    pub scrapers: Option<u32>,
}

/// Text blocks produced by the assistant endpoints. Only `analysis` is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Analysis {
    pub analysis: Option<String>,
    pub search_query: Option<String>,
}

/// Body of `/intelligent-search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IntelligentSearch {
    pub intent_analysis: Analysis,
    pub results: Vec<Product>,
    pub ai_analysis: Analysis,
    pub personalized_advice: String,
    pub total_results: usize,
}

/// Body of `/add-to-watchlist`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WatchlistReceipt {
    pub message: String,
    pub watchlist_id: Option<String>,
    pub monitoring_active: bool,
}

/// Body of `/smart-recommendations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Recommendations {
    pub recommendations: Vec<Product>,
    pub reasoning: String,
}

/// One exchange kept by the assistant and sent back as context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub query: String,
    pub summary: String,
}

/// Request body for `/intelligent-search`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntelligentSearchRequest {
    pub query: String,
    pub preferences: Value,
    pub conversation_history: Vec<ConversationTurn>,
}

/// Request body for `/add-to-watchlist`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchlistRequest {
    pub user_id: String,
    pub query: String,
    pub target_price: f64,
}

/// Locally tracked watchlist entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub query: String,
    pub target_price: f64,
}

/// What the recommendation endpoint learns about the user.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct UserBehavior {
    pub search_history: Vec<String>,
    pub preferences: Value,
    pub watchlist: Vec<WatchlistEntry>,
}

/// Request body for `/smart-recommendations`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationRequest {
    pub user_behavior: UserBehavior,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}
