//! fleet-smoke — smoke tests against a running proxy.
//!
//! # Components
//!
//! - **`request`** — `SmokeClient` and its request builder (api key, headers, request log)
//! - **`response`** — buffered responses, envelope and JSONP unwrapping
//! - **`assert`** — status, generic error, envelope and JSONP assertions
//! - **`scenario`** — the end-to-end check sequence and cleanup

pub mod assert;
pub mod error;
pub mod request;
pub mod response;
pub mod scenario;

pub use error::{SmokeError, SmokeResult};
pub use request::{DEFAULT_LOG_FILE, RequestBuilder, SmokeClient};
pub use response::Response;
pub use scenario::{ScenarioOptions, ScenarioReport, cleanup, run};
