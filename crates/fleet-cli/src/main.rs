use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use fleet_core::FleetError;

mod commands;
mod prompt;

#[derive(Parser)]
#[command(
    name = "fleet",
    about = "Proxy fleet operations — rolling deploys, node setup, smoke tests",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to fleet.toml (default: ./fleet.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a proxy version to every node, one at a time.
    ///
    /// Each node runs `./deploy-proxy.sh <version>` over ssh and must then
    /// report healthy before the next node is touched. The first failure
    /// stops the rollout; nothing is rolled back.
    Deploy {
        /// Version to deploy. Prompted for if omitted.
        #[arg(id = "proxy_version", value_name = "VERSION")]
        version: Option<String>,
        /// Host list file (default: ./nodes)
        nodes: Option<String>,
        /// Per-node health check budget, e.g. "50s"
        #[arg(long)]
        timeout: Option<String>,
        /// Pause between health check attempts, e.g. "1s"
        #[arg(long)]
        interval: Option<String>,
        /// Health check port
        #[arg(long)]
        port: Option<u16>,
        /// Only accept the health marker as a whole word ("unhealthy" fails)
        #[arg(long)]
        strict_marker: bool,
    },
    /// Copy the deploy script to every node and log it into the registry.
    ///
    /// Reads DOCKER_USERNAME and DOCKER_PASSWORD from the environment.
    Setup {
        /// Host list file (default: ./nodes)
        nodes: Option<String>,
    },
    /// Print the one-time manual setup commands for every node.
    InstallScripts {
        /// Host list file (default: ./nodes)
        nodes: Option<String>,
    },
    /// Run the API smoke scenario against a proxy.
    Smoke {
        /// Proxy base URL
        #[arg(default_value = "http://localhost:7000")]
        base_url: String,
        /// API key file (default: ~/.flow/<parent>)
        #[arg(long)]
        key_file: Option<PathBuf>,
        /// Parent organization for test organizations
        #[arg(long, default_value = "flow")]
        parent: String,
        /// Request log (use "-" to disable)
        #[arg(long, default_value = fleet_smoke::DEFAULT_LOG_FILE)]
        log_file: String,
    },
    /// Tag the repository and build the proxy docker image.
    ///
    /// Runs `<tool> tag`, then `<tool> build_docker_image`, stopping at the
    /// first failure.
    Release {
        /// Release tool to invoke
        #[arg(long, default_value = "dev")]
        tool: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", diagnostic(&err));
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new("warn"))?,
        )
        .init();

    let config = fleet_core::FleetConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Deploy {
            version,
            nodes,
            timeout,
            interval,
            port,
            strict_marker,
        } => {
            let overrides = commands::deploy::Overrides {
                timeout,
                interval,
                port,
                strict_marker,
            };
            commands::deploy::deploy(config, version.as_deref(), nodes.as_deref(), overrides).await
        }
        Commands::Setup { nodes } => commands::setup::setup(&config, nodes.as_deref()).await,
        Commands::InstallScripts { nodes } => {
            commands::setup::install_scripts(&config, nodes.as_deref())
        }
        Commands::Smoke {
            base_url,
            key_file,
            parent,
            log_file,
        } => commands::smoke::smoke(&base_url, key_file, &parent, &log_file).await,
        Commands::Release { tool } => commands::release::release(&tool).await,
    }
}

/// One-line `ERROR: ...` message; host-bound failures name the host and step.
fn diagnostic(err: &anyhow::Error) -> String {
    let fleet = err.downcast_ref::<FleetError>();
    match fleet.and_then(|e| e.host().map(|host| (e.kind(), host))) {
        Some((kind, host)) => format!("ERROR: {kind} step failed on {host}: {err:#}"),
        None => format!("ERROR: {err:#}"),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn deploy_takes_version_and_host_list() {
        let cli = Cli::try_parse_from(["fleet", "deploy", "0.0.44", "nodes.prod", "--interval", "500ms"])
            .unwrap();
        let Commands::Deploy {
            version,
            nodes,
            interval,
            ..
        } = cli.command
        else {
            panic!("expected deploy");
        };
        assert_eq!(version.as_deref(), Some("0.0.44"));
        assert_eq!(nodes.as_deref(), Some("nodes.prod"));
        assert_eq!(interval.as_deref(), Some("500ms"));
    }

    #[test]
    fn release_defaults_to_dev_tool() {
        let cli = Cli::try_parse_from(["fleet", "release"]).unwrap();
        assert!(matches!(cli.command, Commands::Release { tool } if tool == "dev"));
    }

    #[test]
    fn diagnostic_names_host_and_step() {
        let err = anyhow::Error::from(FleetError::HealthcheckTimeout {
            host: "10.0.0.2".to_string(),
            url: "http://10.0.0.2:7000/_internal_/healthcheck".to_string(),
            timeout: Duration::from_secs(30),
        });
        let line = diagnostic(&err);
        assert!(line.starts_with("ERROR: healthcheck step failed on 10.0.0.2: timeout exceeded[30 seconds]"));
        assert!(!line.contains("Stack backtrace"));
    }

    #[test]
    fn diagnostic_without_host_prints_the_chain() {
        let err = anyhow::Error::from(FleetError::Input("no version".to_string()))
            .context("deploy aborted");
        assert_eq!(diagnostic(&err), "ERROR: deploy aborted: input error: no version");
    }
}
