//! Error taxonomy shared by every layer.

use thiserror::Error;

/// Top-level application error
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Service unavailable: {0}")]
    Transport(#[from] TransportError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Missing deployment configuration. Never retryable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not configured")]
    Missing(String),
}

/// An external service answered, but with a logical failure or an
/// unrecognised payload.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{service} returned an error: {message}")]
    Api { service: String, message: String },

    #[error("unexpected response from {service}: {message}")]
    UnexpectedShape { service: String, message: String },
}

impl UpstreamError {
    pub fn api(service: &str, message: impl Into<String>) -> Self {
        Self::Api {
            service: service.to_string(),
            message: message.into(),
        }
    }

    pub fn unexpected(service: &str, message: impl Into<String>) -> Self {
        Self::UnexpectedShape {
            service: service.to_string(),
            message: message.into(),
        }
    }
}

/// Network-level failure talking to an external service.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            Self::HttpStatus {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            Self::Connection(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("migration failed: {0}")]
    Migration(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("row not found".to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Connection(err.to_string())
            }
            other => Self::Query(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{0}")]
    Multiple(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
