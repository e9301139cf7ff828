use std::time::Duration;

use fleet_core::{FleetConfig, HostList};
use fleet_health::{HttpHealthProbe, PollPolicy, ProbeResult};
use fleet_rollout::{Rollout, RolloutEvent, SshExecutor};

use crate::prompt;

/// Command-line overrides for `[health]` settings.
#[derive(Debug, Default)]
pub struct Overrides {
    pub timeout: Option<String>,
    pub interval: Option<String>,
    pub port: Option<u16>,
    pub strict_marker: bool,
}

impl Overrides {
    pub fn apply(self, config: &mut FleetConfig) {
        if let Some(timeout) = self.timeout {
            config.health.timeout = timeout;
        }
        if let Some(interval) = self.interval {
            config.health.interval = interval;
        }
        if let Some(port) = self.port {
            config.health.port = port;
        }
        if self.strict_marker {
            config.health.strict_marker = true;
        }
    }
}

pub async fn deploy(
    mut config: FleetConfig,
    version: Option<&str>,
    nodes: Option<&str>,
    overrides: Overrides,
) -> anyhow::Result<()> {
    overrides.apply(&mut config);
    let policy = PollPolicy::from_settings(&config.health)?;
    let probe = HttpHealthProbe::from_settings(&config.health)?;

    let hosts = host_list(nodes)?;
    let version = resolve_version(version)?;

    let mut rollout = Rollout::new(
        SshExecutor::from_settings(&config.remote),
        probe,
        policy,
        config.remote.script.clone(),
    );

    let report = rollout.run(&version, &hosts, print_event).await?;

    println!(
        "Proxy version {} deployed successfully. Total duration: {} seconds",
        report.version,
        report.elapsed.as_secs()
    );
    Ok(())
}

fn resolve_version(arg: Option<&str>) -> anyhow::Result<String> {
    if let Some(v) = arg.map(str::trim).filter(|v| !v.is_empty()) {
        return Ok(v.to_string());
    }
    let default = prompt::latest_tag();
    prompt::prompt_version(&mut std::io::stdin().lock(), &mut std::io::stdout(), default.as_deref())
}

fn print_event(event: &RolloutEvent<'_>) {
    match event {
        RolloutEvent::HostStarted {
            host,
            version,
            index,
            ..
        } => {
            if *index > 0 {
                println!();
            }
            println!("{host}");
            println!("  - Deploying version {version}");
        }
        RolloutEvent::Deploying { command, .. } => println!("==> {command}"),
        RolloutEvent::Probed {
            url,
            result,
            policy,
            ..
        } => {
            println!("  - Checking health: {url}");
            if *result != ProbeResult::Healthy {
                println!("{}", waiting_line(policy));
            }
        }
        RolloutEvent::HostHealthy { .. } => println!("  - healthy"),
    }
}

fn waiting_line(policy: &PollPolicy) -> String {
    format!(
        "  - waiting for healthcheck to succeed. timeout[{} seconds]. sleeping for {} seconds",
        seconds(policy.timeout),
        seconds(policy.interval)
    )
}

/// Whole seconds print bare ("30"), sub-second parts as a fraction ("0.5").
fn seconds(d: Duration) -> String {
    d.as_secs_f64().to_string()
}

/// Host list path for commands that take an optional positional argument.
pub fn host_list(nodes: Option<&str>) -> anyhow::Result<HostList> {
    Ok(HostList::load(&HostList::resolve_path(nodes))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_file_values() {
        let mut config = FleetConfig::default();
        Overrides {
            timeout: Some("50s".to_string()),
            interval: None,
            port: Some(7100),
            strict_marker: true,
        }
        .apply(&mut config);

        assert_eq!(config.health.timeout().unwrap(), Duration::from_secs(50));
        assert_eq!(config.health.interval().unwrap(), Duration::from_secs(1));
        assert_eq!(config.health.port, 7100);
        assert!(config.health.strict_marker);
    }

    #[test]
    fn waiting_line_keeps_sub_second_intervals() {
        let policy = PollPolicy::new(Duration::from_millis(500), Duration::from_secs(30));
        assert_eq!(
            waiting_line(&policy),
            "  - waiting for healthcheck to succeed. timeout[30 seconds]. sleeping for 0.5 seconds"
        );
        assert_eq!(seconds(Duration::from_secs(1)), "1");
    }

    #[test]
    fn explicit_version_skips_prompt() {
        assert_eq!(resolve_version(Some(" 0.0.44 ")).unwrap(), "0.0.44");
    }

    #[tokio::test]
    async fn missing_host_list_fails_before_any_remote_call() {
        let dir = tempfile::TempDir::new().unwrap();
        let nodes = dir.path().join("nodes");
        let err = deploy(
            FleetConfig::default(),
            Some("1.0.0"),
            nodes.to_str(),
            Overrides::default(),
        )
        .await
        .unwrap_err();
        let fleet = err.downcast_ref::<fleet_core::FleetError>().unwrap();
        assert_eq!(fleet.kind(), fleet_core::ErrorKind::Config);
    }

    #[tokio::test]
    async fn bad_timeout_override_is_config_error() {
        let err = deploy(
            FleetConfig::default(),
            Some("1.0.0"),
            Some("nodes"),
            Overrides {
                timeout: Some("soon".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("health.timeout"));
    }
}
