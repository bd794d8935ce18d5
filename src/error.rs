//! Errors for the upstream API clients

use thiserror::Error;

/// Errors from the Notion, Strava and MangaDex clients
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by upstream api")]
    RateLimited,

    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
