//! One-time node preparation.
//!
//! `setup_nodes` pushes the deploy script to every node and logs the
//! node's Docker daemon into the registry. Unlike a rollout it keeps
//! going after a failed node and reports every failure at the end.

use std::path::Path;

use tracing::{info, warn};

use fleet_core::{FleetError, FleetResult, HostList};

use crate::executor::{RemoteCommand, RemoteExecutor};

/// Registry credentials, normally from `DOCKER_USERNAME` / `DOCKER_PASSWORD`.
#[derive(Clone)]
pub struct RegistryCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl RegistryCredentials {
    pub fn from_env() -> FleetResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable lookup; both values must be present and non-empty.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> FleetResult<Self> {
        let username = lookup("DOCKER_USERNAME").filter(|v| !v.is_empty());
        let password = lookup("DOCKER_PASSWORD").filter(|v| !v.is_empty());
        match (username, password) {
            (Some(username), Some(password)) => Ok(Self { username, password }),
            _ => Err(FleetError::Config(
                "DOCKER_USERNAME and DOCKER_PASSWORD must be valid environment variables"
                    .to_string(),
            )),
        }
    }
}

/// A node that failed setup, and at which stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupFailure {
    pub host: String,
    pub stage: &'static str,
    pub detail: String,
}

/// Result of a setup pass over all nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetupReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<SetupFailure>,
}

impl SetupReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Copy the deploy script to each node and run `docker login` there.
///
/// `on_step` receives each command as it is about to run.
pub async fn setup_nodes<E, F>(
    executor: &E,
    hosts: &HostList,
    script: &Path,
    creds: &RegistryCredentials,
    on_step: F,
) -> FleetResult<SetupReport>
where
    E: RemoteExecutor,
    F: Fn(&str),
{
    if hosts.is_empty() {
        return Err(FleetError::HostListEmpty(hosts.source().to_path_buf()));
    }

    let mut report = SetupReport::default();
    for host in hosts.iter() {
        on_step(&format!("scp {} {host}:~/.", script.display()));
        match executor.copy_to(host, script, "~/.").await {
            Ok(status) if status.success() => {}
            Ok(status) => {
                report.failed.push(failure(host, "copy", format!("exit {:?}", status.code)));
                continue;
            }
            Err(e) => {
                report.failed.push(failure(host, "copy", e.to_string()));
                continue;
            }
        }

        let login = docker_login(&creds.username).with_stdin(format!("{}\n", creds.password));
        on_step(&executor.describe(host, &login));
        match executor.execute(host, &login).await {
            Ok(status) if status.success() => {
                info!(host, "node ready");
                report.succeeded.push(host.to_string());
            }
            Ok(status) => {
                report.failed.push(failure(host, "docker login", format!("exit {:?}", status.code)));
            }
            Err(e) => {
                report.failed.push(failure(host, "docker login", e.to_string()));
            }
        }
    }
    Ok(report)
}

fn docker_login(username: &str) -> RemoteCommand {
    RemoteCommand::new(["docker", "login", "--username", username, "--password-stdin"])
}

fn failure(host: &str, stage: &'static str, detail: String) -> SetupFailure {
    warn!(host, stage, %detail, "node setup step failed");
    SetupFailure {
        host: host.to_string(),
        stage,
        detail,
    }
}

/// Manual one-time setup commands for every node.
pub fn install_instructions(hosts: &HostList, script: &str, user: &str) -> String {
    let mut out = String::from("To setup deploy scripts on each node in the proxy cluster:\n\n");
    for host in hosts.iter() {
        out.push_str(&format!("  scp {script} {host}:~/.\n"));
    }
    out.push_str("\nTo setup your user permissions:\n\n");
    for host in hosts.iter() {
        out.push_str(&format!("  ssh {host} sudo usermod -a -G docker {user}\n"));
    }
    out.push_str("\nOnce installed, run fleet deploy\n");
    out
}
