//! Smoke test error types.

use std::path::PathBuf;

use thiserror::Error;

pub type SmokeResult<T> = Result<T, SmokeError>;

#[derive(Debug, Error)]
pub enum SmokeError {
    #[error("missing api key file: {}", .0.display())]
    ApiKeyMissing(PathBuf),

    #[error("could not read api key file {}: {source}", .path.display())]
    ApiKeyUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request failed: {0}")]
    Client(#[from] fleet_health::ClientError),

    #[error("HTTP {status} for {method} {url}\n{detail}")]
    Server {
        method: String,
        url: String,
        status: u16,
        detail: String,
    },

    #[error("error parsing json: {0}")]
    Json(String),

    #[error("{0}")]
    Assertion(String),
}
