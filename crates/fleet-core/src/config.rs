//! fleet.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{FleetError, FleetResult};

/// Default port the proxy serves its health check on.
pub const DEFAULT_HEALTH_PORT: u16 = 7000;
/// Default health check path.
pub const DEFAULT_HEALTH_PATH: &str = "/_internal_/healthcheck";
/// Default marker a healthy response body contains.
pub const DEFAULT_HEALTH_MARKER: &str = "healthy";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    pub health: HealthSettings,
    pub remote: RemoteSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthSettings {
    pub port: u16,
    pub path: String,
    pub marker: String,
    /// Overall budget per host, e.g. "30s".
    pub timeout: String,
    /// Pause between attempts, e.g. "1s".
    pub interval: String,
    /// Budget for a single HTTP request.
    pub request_timeout: String,
    /// Reject bodies where the marker is only part of a longer word
    /// (so "unhealthy" does not count as "healthy").
    pub strict_marker: bool,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_HEALTH_PORT,
            path: DEFAULT_HEALTH_PATH.to_string(),
            marker: DEFAULT_HEALTH_MARKER.to_string(),
            timeout: "30s".to_string(),
            interval: "1s".to_string(),
            request_timeout: "5s".to_string(),
            strict_marker: false,
        }
    }
}

impl HealthSettings {
    pub fn timeout(&self) -> FleetResult<Duration> {
        duration_field("health.timeout", &self.timeout)
    }

    pub fn interval(&self) -> FleetResult<Duration> {
        duration_field("health.interval", &self.interval)
    }

    pub fn request_timeout(&self) -> FleetResult<Duration> {
        duration_field("health.request_timeout", &self.request_timeout)
    }

    /// Health check URL for a host.
    pub fn url_for(&self, host: &str) -> String {
        format!("http://{host}:{}{}", self.port, self.path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// ssh binary.
    pub ssh: String,
    /// scp binary.
    pub scp: String,
    /// Deploy script as invoked on the remote host.
    pub script: String,
    /// Local copy of the deploy script pushed during setup.
    pub script_source: String,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            ssh: "ssh".to_string(),
            scp: "scp".to_string(),
            script: "./deploy-proxy.sh".to_string(),
            script_source: "deploy-proxy.sh".to_string(),
        }
    }
}

impl FleetConfig {
    pub fn from_file(path: &Path) -> FleetResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> FleetResult<Self> {
        let config: FleetConfig =
            toml::from_str(content).map_err(|e| FleetError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise `fleet.toml` if present, otherwise defaults.
    pub fn load_or_default(path: Option<&Path>) -> FleetResult<Self> {
        match path {
            Some(p) if !p.is_file() => Err(FleetError::Config(format!(
                "config file[{}] not found",
                p.display()
            ))),
            Some(p) => Self::from_file(p),
            None => {
                let default = Path::new("fleet.toml");
                if default.is_file() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn validate(&self) -> FleetResult<()> {
        self.health.timeout()?;
        self.health.interval()?;
        self.health.request_timeout()?;
        if self.health.marker.is_empty() {
            return Err(FleetError::Config("health.marker must not be empty".into()));
        }
        if !self.health.path.starts_with('/') {
            return Err(FleetError::Config(format!(
                "health.path must start with '/': {}",
                self.health.path
            )));
        }
        Ok(())
    }
}

/// Parse a duration string like "5s", "500ms", "1m".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

fn duration_field(name: &str, value: &str) -> FleetResult<Duration> {
    parse_duration(value)
        .ok_or_else(|| FleetError::Config(format!("invalid duration for {name}: {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_proxy_layout() {
        let config = FleetConfig::default();
        assert_eq!(
            config.health.url_for("10.0.0.1"),
            "http://10.0.0.1:7000/_internal_/healthcheck"
        );
        assert_eq!(config.health.timeout().unwrap(), Duration::from_secs(30));
        assert_eq!(config.health.interval().unwrap(), Duration::from_secs(1));
        assert_eq!(config.remote.script, "./deploy-proxy.sh");
        assert!(!config.health.strict_marker);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = FleetConfig::from_toml(
            r#"
[health]
timeout = "50s"
port = 9000
"#,
        )
        .unwrap();
        assert_eq!(config.health.timeout().unwrap(), Duration::from_secs(50));
        assert_eq!(config.health.port, 9000);
        assert_eq!(config.health.marker, "healthy");
        assert_eq!(config.remote.ssh, "ssh");
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let config = FleetConfig::from_toml("").unwrap();
        assert_eq!(config.health.port, DEFAULT_HEALTH_PORT);
    }

    #[test]
    fn bad_duration_is_rejected() {
        let err = FleetConfig::from_toml("[health]\ninterval = \"soon\"\n").unwrap_err();
        assert!(err.to_string().contains("health.interval"));
    }

    #[test]
    fn relative_path_is_rejected() {
        let err = FleetConfig::from_toml("[health]\npath = \"healthz\"\n").unwrap_err();
        assert!(matches!(err, FleetError::Config(_)));
    }

    #[test]
    fn missing_explicit_config_is_error() {
        let err = FleetConfig::load_or_default(Some(Path::new("/nonexistent/fleet.toml")))
            .unwrap_err();
        assert!(matches!(err, FleetError::Config(_)));
    }

    #[test]
    fn parse_duration_forms() {
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("10"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration("fast"), None);
        assert_eq!(parse_duration("400000000000000000m"), None);
    }
}
