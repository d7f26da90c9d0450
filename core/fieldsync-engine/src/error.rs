//! Error types for the reconciliation engine and its gateway.

use fieldsync_types::{ConfigurationDifference, OptionsError, TableRef};
use std::time::Duration;
use thiserror::Error;

/// Result type for remote gateway calls.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Result type for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Transport-classified failures of the remote field API.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Connection, DNS or timeout failure before a response arrived.
    #[error("network error: {0}")]
    Network(String),

    /// 5xx-equivalent server failure.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("rate limited: retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The service refused the payload.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Non-zero envelope code on an otherwise successful HTTP response.
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("operation cancelled")]
    Cancelled,
}

impl GatewayError {
    /// Network failures, server errors and rate limits are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Network(_)
            | GatewayError::Server { .. }
            | GatewayError::RateLimited { .. } => true,
            GatewayError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.status()
                        .is_some_and(|s| s.is_server_error() || s.as_u16() == 429)
            }
            _ => false,
        }
    }

    /// Returns true if this error represents a 429 rate-limit response.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            GatewayError::RateLimited { .. } => true,
            GatewayError::Http(e) => e.status().is_some_and(|s| s.as_u16() == 429),
            _ => false,
        }
    }

    /// Returns the server-provided retry delay, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            GatewayError::RateLimited {
                retry_after_secs: Some(secs),
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }
}

/// Errors surfaced by `ensure_field_configuration` and friends.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// `update_only` targeted a field that does not exist.
    #[error("field '{field}' not found in table {table}")]
    FieldNotFound {
        field: String,
        table: TableRef,
        retries: u32,
    },

    /// `throw_error` conflict resolution hit a mismatch.
    #[error("field '{field}' does not match the desired configuration ({} difference(s))", .differences.len())]
    ConfigurationMismatch {
        field: String,
        differences: Vec<ConfigurationDifference>,
        retries: u32,
    },

    /// Gateway failure surviving retries, or strategy misuse.
    #[error("{operation} failed: {message}")]
    Operation {
        message: String,
        operation: &'static str,
        field: Option<String>,
        retries: u32,
        #[source]
        source: Option<GatewayError>,
    },

    #[error("invalid options: {0}")]
    InvalidOptions(#[from] OptionsError),

    #[error("operation cancelled")]
    Cancelled,
}

impl ReconcileError {
    /// Wraps a gateway failure that survived the retry executor.
    pub(crate) fn gateway(
        operation: &'static str,
        field: &str,
        retries: u32,
        source: GatewayError,
    ) -> Self {
        if matches!(source, GatewayError::Cancelled) {
            return ReconcileError::Cancelled;
        }
        ReconcileError::Operation {
            message: source.to_string(),
            operation,
            field: Some(field.to_string()),
            retries,
            source: Some(source),
        }
    }

    /// Retries consumed before the failure surfaced, including those of
    /// the lookup that led to a policy rejection.
    pub fn retry_count(&self) -> u32 {
        match self {
            ReconcileError::FieldNotFound { retries, .. }
            | ReconcileError::ConfigurationMismatch { retries, .. }
            | ReconcileError::Operation { retries, .. } => *retries,
            _ => 0,
        }
    }

    /// Differences carried by a mismatch, empty otherwise.
    pub fn differences(&self) -> &[ConfigurationDifference] {
        match self {
            ReconcileError::ConfigurationMismatch { differences, .. } => differences,
            _ => &[],
        }
    }
}
