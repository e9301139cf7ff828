use std::path::PathBuf;

use anyhow::Context;

use fleet_smoke::{ScenarioOptions, SmokeClient};

pub async fn smoke(
    base_url: &str,
    key_file: Option<PathBuf>,
    parent: &str,
    log_file: &str,
) -> anyhow::Result<()> {
    let key_file = match key_file {
        Some(path) => path,
        None => {
            let home = std::env::var_os("HOME").context("HOME is not set; pass --key-file")?;
            PathBuf::from(home).join(".flow").join(parent)
        }
    };
    let log = (log_file != "-").then(|| PathBuf::from(log_file));

    let client = SmokeClient::with_key_file(base_url, &key_file)?.log_to(log.clone());
    if let Some(log) = &log {
        println!("logging to {}\n", log.display());
    }

    let opts = ScenarioOptions {
        parent_organization: parent.to_string(),
        ..Default::default()
    };
    let report = fleet_smoke::run(&client, &opts).await?;

    println!(
        "All {} checks passed against {} (organization {})",
        report.checks,
        client.base_url(),
        report.organization_id
    );
    Ok(())
}
