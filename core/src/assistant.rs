//! Shopping assistant session over the AI endpoints.
//!
//! # Design
//! The assistant keeps the conversation and watchlist for one session and
//! persists the user id, preferences and search history in a
//! `KeyValueStore`. The store is an opaque string map; values are JSON
//! text so any browser-style storage or file can back it.

use std::collections::HashMap;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::PriceClient;
use crate::error::ApiError;
use crate::types::{
    ConversationTurn, IntelligentSearch, IntelligentSearchRequest, RecommendationRequest,
    Recommendations, UserBehavior, WatchlistEntry, WatchlistReceipt, WatchlistRequest,
};

pub const USER_ID_KEY: &str = "userId";
pub const PREFERENCES_KEY: &str = "userPreferences";
pub const SEARCH_HISTORY_KEY: &str = "searchHistory";
pub const WATCHLIST_KEY: &str = "watchlist";

/// Oldest entries are dropped past this many saved searches.
pub const MAX_SEARCH_HISTORY: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("local store: {0}")]
pub struct StoreError(pub String);

/// String-keyed persistent map, in the spirit of browser local storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;
}

/// Volatile store, used when nothing should outlive the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("target price must be a positive amount, got {0}")]
    InvalidTargetPrice(f64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Assistant<S> {
    client: PriceClient,
    store: S,
    conversation: Vec<ConversationTurn>,
    watchlist: Vec<WatchlistEntry>,
    current_query: Option<String>,
}

impl<S: KeyValueStore> Assistant<S> {
    /// Session over `store`. A watchlist saved by an earlier session is
    /// picked up again.
    pub fn new(client: PriceClient, store: S) -> Self {
        let watchlist = store
            .get(WATCHLIST_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        Self {
            client,
            store,
            conversation: Vec::new(),
            watchlist,
            current_query: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn conversation(&self) -> &[ConversationTurn] {
        &self.conversation
    }

    pub fn watchlist(&self) -> &[WatchlistEntry] {
        &self.watchlist
    }

    pub fn current_query(&self) -> Option<&str> {
        self.current_query.as_deref()
    }

    pub fn set_current_query(&mut self, query: Option<String>) {
        self.current_query = query.filter(|q| !q.trim().is_empty());
    }

    /// Stored user id, minting and saving an anonymous one on first use.
    pub fn user_id(&mut self) -> Result<String, StoreError> {
        if let Some(id) = self.store.get(USER_ID_KEY).filter(|id| !id.is_empty()) {
            return Ok(id);
        }
        let id = format!("anonymous_{}", Uuid::new_v4().simple());
        self.store.set(USER_ID_KEY, id.clone())?;
        info!(user_id = %id, "created anonymous user id");
        Ok(id)
    }

    /// Saved preferences. Missing or unreadable entries read as `{}`.
    pub fn preferences(&self) -> Value {
        self.store
            .get(PREFERENCES_KEY)
            .and_then(|raw| serde_json::from_str::<Value>(&raw).ok())
            .filter(Value::is_object)
            .unwrap_or_else(|| json!({}))
    }

    pub fn set_preferences(&mut self, preferences: &Value) -> Result<(), StoreError> {
        self.store.set(PREFERENCES_KEY, preferences.to_string())
    }

    pub fn search_history(&self) -> Vec<String> {
        self.store
            .get(SEARCH_HISTORY_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    pub fn record_search(&mut self, query: &str) -> Result<(), StoreError> {
        let mut history = self.search_history();
        history.push(query.to_string());
        if history.len() > MAX_SEARCH_HISTORY {
            let excess = history.len() - MAX_SEARCH_HISTORY;
            history.drain(..excess);
        }
        let raw = serde_json::to_string(&history).map_err(|e| StoreError(e.to_string()))?;
        self.store.set(SEARCH_HISTORY_KEY, raw)
    }

    pub fn user_behavior(&self) -> UserBehavior {
        UserBehavior {
            search_history: self.search_history(),
            preferences: self.preferences(),
            watchlist: self.watchlist.clone(),
        }
    }

    /// Natural-language search. On success the query joins the saved history
    /// and the exchange joins the conversation sent with later searches.
    pub async fn intelligent_search(
        &mut self,
        query: &str,
    ) -> Result<IntelligentSearch, AssistantError> {
        let request = IntelligentSearchRequest {
            query: query.to_string(),
            preferences: self.preferences(),
            conversation_history: self.conversation.clone(),
        };
        let response = self.client.intelligent_search(&request).await?;

        self.record_search(query)?;
        self.current_query = Some(
            response
                .intent_analysis
                .search_query
                .clone()
                .filter(|q| !q.is_empty())
                .unwrap_or_else(|| query.to_string()),
        );
        self.conversation.push(ConversationTurn {
            query: query.to_string(),
            summary: response.intent_analysis.analysis.clone().unwrap_or_default(),
        });
        debug!(turns = self.conversation.len(), "conversation updated");
        Ok(response)
    }

    /// Ask the service to watch `query` until it drops to `target_price`.
    ///
    /// Once the service has accepted the entry the receipt is returned even
    /// if saving the local copy fails; that failure is only logged.
    pub async fn add_to_watchlist(
        &mut self,
        query: &str,
        target_price: f64,
    ) -> Result<WatchlistReceipt, AssistantError> {
        if !target_price.is_finite() || target_price <= 0.0 {
            return Err(AssistantError::InvalidTargetPrice(target_price));
        }
        let request = WatchlistRequest {
            user_id: self.user_id()?,
            query: query.to_string(),
            target_price,
        };
        let receipt = self.client.add_to_watchlist(&request).await?;
        self.watchlist.push(WatchlistEntry {
            query: query.to_string(),
            target_price,
        });
        if let Err(e) = self.save_watchlist() {
            warn!(query, error = %e, "watchlist accepted by service but not saved locally");
        }
        info!(query, target_price, "added to watchlist");
        Ok(receipt)
    }

    fn save_watchlist(&mut self) -> Result<(), StoreError> {
        let raw = serde_json::to_string(&self.watchlist).map_err(|e| StoreError(e.to_string()))?;
        self.store.set(WATCHLIST_KEY, raw)
    }

    pub async fn smart_recommendations(&self) -> Result<Recommendations, AssistantError> {
        let request = RecommendationRequest {
            user_behavior: self.user_behavior(),
            query: self.current_query.clone(),
        };
        Ok(self.client.smart_recommendations(&request).await?)
    }
}
