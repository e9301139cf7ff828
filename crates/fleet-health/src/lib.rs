//! fleet-health — health checks for proxy nodes.
//!
//! A node is healthy once `GET http://<host>:<port>/_internal_/healthcheck`
//! returns a body containing the marker (`healthy` by default). The
//! rollout polls the probe at a fixed interval until it succeeds or the
//! per-host budget runs out.
//!
//! # Components
//!
//! - **`client`** — one-shot HTTP/1.1 requests over hyper
//! - **`checker`** — `HealthProbe` trait, HTTP probe, marker matching
//! - **`retry`** — `wait_until`, fixed-interval polling with a deadline

pub mod checker;
pub mod client;
pub mod retry;

pub use checker::{HealthProbe, HttpHealthProbe, ProbeResult, body_has_marker};
pub use client::{ClientError, ClientRequest, ClientResponse};
pub use retry::{PollPolicy, WaitOutcome, wait_until};
