//! Error types shared by the fleet tooling.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for fleet operations.
pub type FleetResult<T> = Result<T, FleetError>;

/// Every way a rollout or setup run can fail.
///
/// All variants are fatal to the current run; nothing is retried across
/// hosts and nothing is rolled back.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("nodes configuration file[{}] not found", .0.display())]
    HostListMissing(PathBuf),

    #[error("nodes configuration file[{}] is empty", .0.display())]
    HostListEmpty(PathBuf),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("input error: {0}")]
    Input(String),

    #[error(
        "deploy to {host} failed: `{command}` exited with status {}",
        .code.map_or_else(|| String::from("unknown"), |c| c.to_string())
    )]
    Deployment {
        host: String,
        command: String,
        code: Option<i32>,
    },

    #[error(
        "timeout exceeded[{} seconds] waiting for healthcheck on {host}: {url}",
        .timeout.as_secs()
    )]
    HealthcheckTimeout {
        host: String,
        url: String,
        timeout: Duration,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl FleetError {
    /// Broad category, used for the operator-facing diagnostic.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FleetError::HostListMissing(_) | FleetError::HostListEmpty(_) | FleetError::Config(_) => {
                ErrorKind::Config
            }
            FleetError::Input(_) => ErrorKind::Input,
            FleetError::Deployment { .. } => ErrorKind::Deployment,
            FleetError::HealthcheckTimeout { .. } => ErrorKind::HealthcheckTimeout,
            FleetError::Io(_) => ErrorKind::Config,
        }
    }

    /// Host the failure happened on, if it is tied to one.
    pub fn host(&self) -> Option<&str> {
        match self {
            FleetError::Deployment { host, .. } | FleetError::HealthcheckTimeout { host, .. } => {
                Some(host)
            }
            _ => None,
        }
    }
}

/// Error taxonomy as seen by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Input,
    Deployment,
    HealthcheckTimeout,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ErrorKind::Config => "config",
            ErrorKind::Input => "input",
            ErrorKind::Deployment => "deploy",
            ErrorKind::HealthcheckTimeout => "healthcheck",
        })
    }
}
