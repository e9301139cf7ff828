use std::path::Path;
use std::process::Command;

use anyhow::bail;

use fleet_core::{FleetConfig, FleetError};
use fleet_rollout::{RegistryCredentials, SshExecutor, install_instructions, setup_nodes};

use super::deploy::host_list;

pub async fn setup(config: &FleetConfig, nodes: Option<&str>) -> anyhow::Result<()> {
    let creds = RegistryCredentials::from_env()?;
    let hosts = host_list(nodes)?;

    let script = Path::new(&config.remote.script_source);
    if !script.is_file() {
        return Err(FleetError::Config(format!(
            "deploy script[{}] not found",
            script.display()
        ))
        .into());
    }

    let executor = SshExecutor::from_settings(&config.remote);
    let report = setup_nodes(&executor, &hosts, script, &creds, |step| println!("{step}")).await?;

    if !report.is_success() {
        for failure in &report.failed {
            eprintln!("ERROR: {} failed at {}: {}", failure.host, failure.stage, failure.detail);
        }
        bail!(
            "setup failed on {} of {} nodes",
            report.failed.len(),
            hosts.len()
        );
    }
    println!("{} nodes ready", report.succeeded.len());
    Ok(())
}

pub fn install_scripts(config: &FleetConfig, nodes: Option<&str>) -> anyhow::Result<()> {
    let hosts = host_list(nodes)?;
    let user = local_user().unwrap_or_else(|| "$USER".to_string());
    print!(
        "{}",
        install_instructions(&hosts, &config.remote.script_source, &user)
    );
    Ok(())
}

fn local_user() -> Option<String> {
    if let Ok(user) = std::env::var("USER") {
        if !user.is_empty() {
            return Some(user);
        }
    }
    let output = Command::new("whoami").output().ok()?;
    let user = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (output.status.success() && !user.is_empty()).then_some(user)
}
