//! Health check probe logic.
//!
//! A host is healthy when its health endpoint answers and the response
//! body contains the configured marker. Transport errors, timeouts and
//! bodies without the marker all mean "not yet healthy".

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use fleet_core::{FleetResult, HealthSettings};

use crate::client;

/// Result of a single health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// The body contained the marker.
    Healthy,
    /// The endpoint answered without the marker.
    Unhealthy,
    /// The probe could not be executed (connection error, timeout).
    Failed,
}

impl ProbeResult {
    pub fn is_healthy(self) -> bool {
        self == ProbeResult::Healthy
    }
}

/// Something that can ask a host whether it is healthy.
pub trait HealthProbe {
    /// URL or other description of what is probed, for diagnostics.
    fn target(&self, host: &str) -> String;

    fn probe(&self, host: &str) -> impl Future<Output = ProbeResult>;
}

/// Probes `http://<host>:<port><path>` and looks for a marker in the body.
#[derive(Debug, Clone)]
pub struct HttpHealthProbe {
    port: u16,
    path: String,
    marker: String,
    strict: bool,
    request_timeout: Duration,
}

impl HttpHealthProbe {
    pub fn from_settings(settings: &HealthSettings) -> FleetResult<Self> {
        Ok(Self {
            port: settings.port,
            path: settings.path.clone(),
            marker: settings.marker.clone(),
            strict: settings.strict_marker,
            request_timeout: settings.request_timeout()?,
        })
    }
}

impl HealthProbe for HttpHealthProbe {
    fn target(&self, host: &str) -> String {
        format!("http://{host}:{}{}", self.port, self.path)
    }

    async fn probe(&self, host: &str) -> ProbeResult {
        let url = self.target(host);
        match client::get(&url, self.request_timeout).await {
            Ok(resp) => {
                if body_has_marker(&resp.body, &self.marker, self.strict) {
                    ProbeResult::Healthy
                } else {
                    debug!(status = resp.status, %url, "health body missing marker");
                    ProbeResult::Unhealthy
                }
            }
            Err(e) => {
                debug!(error = %e, %url, "health probe failed");
                ProbeResult::Failed
            }
        }
    }
}

/// Whether a health body carries the marker.
///
/// Loose matching is a plain substring search on the trimmed body, so
/// "unhealthy" contains "healthy". Strict matching requires the marker to
/// stand alone, bounded by non-alphanumeric characters or the ends of the
/// body.
pub fn body_has_marker(body: &str, marker: &str, strict: bool) -> bool {
    let body = body.trim();
    if !strict {
        return body.contains(marker);
    }
    let is_word = |c: char| c.is_alphanumeric() || c == '_' || c == '-';
    body.match_indices(marker).any(|(start, m)| {
        let before = body[..start].chars().next_back();
        let after = body[start + m.len()..].chars().next();
        !before.is_some_and(is_word) && !after.is_some_and(is_word)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing;

    fn probe_on(port: u16, strict: bool) -> HttpHealthProbe {
        HttpHealthProbe {
            port,
            path: "/_internal_/healthcheck".to_string(),
            marker: "healthy".to_string(),
            strict,
            request_timeout: Duration::from_secs(2),
        }
    }

    fn split(addr: &str) -> (String, u16) {
        let (host, port) = addr.rsplit_once(':').unwrap();
        (host.to_string(), port.parse().unwrap())
    }

    #[test]
    fn exact_body_is_healthy() {
        assert!(body_has_marker("healthy", "healthy", false));
        assert!(body_has_marker("healthy", "healthy", true));
        assert!(body_has_marker("  healthy\n", "healthy", true));
    }

    #[test]
    fn loose_match_accepts_unhealthy() {
        // Plain substring search: "unhealthy" contains the marker.
        assert!(body_has_marker("unhealthy", "healthy", false));
    }

    #[test]
    fn strict_match_rejects_unhealthy() {
        assert!(!body_has_marker("unhealthy", "healthy", true));
        assert!(!body_has_marker("not_healthy", "healthy", true));
        assert!(body_has_marker("{\"status\":\"healthy\"}", "healthy", true));
        assert!(body_has_marker("unhealthy then healthy", "healthy", true));
    }

    #[test]
    fn marker_is_case_sensitive() {
        assert!(!body_has_marker("HEALTHY", "healthy", false));
    }

    #[test]
    fn target_builds_health_url() {
        let probe = HttpHealthProbe::from_settings(&HealthSettings::default()).unwrap();
        assert_eq!(
            probe.target("10.0.0.7"),
            "http://10.0.0.7:7000/_internal_/healthcheck"
        );
    }

    #[tokio::test]
    async fn probe_healthy_body() {
        let addr = testing::serve(vec![(200, "healthy")]).await;
        let (host, port) = split(&addr);
        assert_eq!(probe_on(port, false).probe(&host).await, ProbeResult::Healthy);
    }

    #[tokio::test]
    async fn probe_other_body_is_unhealthy() {
        let addr = testing::serve(vec![(200, "starting")]).await;
        let (host, port) = split(&addr);
        assert_eq!(probe_on(port, false).probe(&host).await, ProbeResult::Unhealthy);
    }

    #[tokio::test]
    async fn probe_unhealthy_body_depends_on_strictness() {
        let addr = testing::serve(vec![(200, "unhealthy"), (200, "unhealthy")]).await;
        let (host, port) = split(&addr);
        assert_eq!(probe_on(port, false).probe(&host).await, ProbeResult::Healthy);
        assert_eq!(probe_on(port, true).probe(&host).await, ProbeResult::Unhealthy);
    }

    #[tokio::test]
    async fn probe_closed_port_is_failed() {
        assert_eq!(probe_on(1, false).probe("127.0.0.1").await, ProbeResult::Failed);
    }
}
