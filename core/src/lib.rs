//! Async client core for the price-comparison service.
//!
//! # Overview
//! Builds requests against the service's REST endpoints, runs each one
//! through a `Transport` under a per-call timeout, and classifies the result
//! into an `Outcome`: a decoded payload, or one of `HttpError`, `Timeout`,
//! `NetworkError`.
//!
//! # Design
//! - `PriceClient` is a constructed value with injected configuration and
//!   transport. There is no process-wide instance.
//! - Request building (`build_request`) and response classification
//!   (`classify`) are pure, so both are testable without I/O.
//! - One attempt per call. The client never retries.
//! - Payload views in `types` decode leniently; the service owns the schema.

pub mod assistant;
pub mod client;
pub mod config;
pub mod deals;
pub mod error;
pub mod http;
pub mod params;
pub mod transport;
pub mod types;

pub use assistant::{Assistant, AssistantError, KeyValueStore, MemoryStore, StoreError};
pub use client::{classify, Outcome, PriceClient, RequestOptions, SearchOptions};
pub use config::ClientConfig;
pub use deals::{best_deals, best_price, Pager};
pub use error::{ApiError, ConfigError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use params::{ParamValue, QueryParams};
pub use transport::{ReqwestTransport, Transport};
pub use types::{Comparison, Health, Product, SearchResults, StoreDirectory};
