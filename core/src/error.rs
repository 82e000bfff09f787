//! Error types for the price-comparison client.
//!
//! # Design
//! `ApiError` is the failure half of an `Outcome`. Three variants classify a
//! request that was actually attempted (`HttpError`, `Timeout`,
//! `NetworkError`); `Serialization` can only happen while building a POST
//! body, before anything touches the network.

use thiserror::Error;

/// Message carried by `ApiError::Timeout`. Shown to users as-is.
pub const TIMEOUT_MESSAGE: &str = "Request timeout - please try again";

/// Classified failure of one API call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The service answered with a status outside 200..300.
    #[error("HTTP error! status: {status}")]
    HttpError { status: u16, body: String },

    /// The configured timeout elapsed; the in-flight request was dropped.
    #[error("Request timeout - please try again")]
    Timeout,

    /// Connection, DNS or body-decoding failure.
    #[error("API Error: {0}")]
    NetworkError(String),

    /// The request body could not be encoded as JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout)
    }
}

/// Failure reported by a `Transport` before any response was produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("{0}")]
    Other(String),
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        ApiError::NetworkError(err.to_string())
    }
}

/// Invalid client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid timeout {0:?}: expected a positive number of milliseconds")]
    InvalidTimeout(String),
}
