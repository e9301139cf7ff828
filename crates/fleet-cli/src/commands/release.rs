//! `fleet release`: tag the repository, then build its docker image.
//!
//! The tag produced here is what `sem-info tag latest` reports, so it
//! becomes the default version offered by `fleet deploy`.

use anyhow::{Context, bail};
use tokio::process::Command;
use tracing::debug;

/// Subcommands of the release tool, run in this order.
pub const RELEASE_STEPS: [&str; 2] = ["tag", "build_docker_image"];

pub async fn release(tool: &str) -> anyhow::Result<()> {
    let steps: Vec<Vec<String>> = RELEASE_STEPS
        .iter()
        .map(|step| vec![tool.to_string(), step.to_string()])
        .collect();
    run_steps(&steps).await?;
    println!("Release complete");
    Ok(())
}

/// Run each command line in order, stopping at the first failure.
pub async fn run_steps(steps: &[Vec<String>]) -> anyhow::Result<()> {
    for (index, argv) in steps.iter().enumerate() {
        let Some((program, args)) = argv.split_first() else {
            continue;
        };
        let line = argv.join(" ");
        println!("==> {line}");

        let mut cmd = Command::new(program);
        cmd.args(args);
        debug!("Running: {:?}", cmd);
        let status = cmd
            .status()
            .await
            .with_context(|| format!("failed to run `{line}`"))?;
        if !status.success() {
            bail!(
                "release step {} of {} failed: `{line}` exited with status {}",
                index + 1,
                steps.len(),
                status
                    .code()
                    .map_or_else(|| String::from("unknown"), |c| c.to_string())
            );
        }
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn steps_run_in_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("steps");
        let out = out.display();

        run_steps(&[sh(&format!("echo tag >> {out}")), sh(&format!("echo build >> {out}"))])
            .await
            .unwrap();

        let written = std::fs::read_to_string(dir.path().join("steps")).unwrap();
        assert_eq!(written, "tag\nbuild\n");
    }

    #[tokio::test]
    async fn failing_step_stops_the_release() {
        let dir = tempfile::TempDir::new().unwrap();
        let marker = dir.path().join("built");

        let err = run_steps(&[
            sh("exit 3"),
            sh(&format!("touch {}", marker.display())),
        ])
        .await
        .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("release step 1 of 2 failed"));
        assert!(msg.contains("exited with status 3"));
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn missing_tool_is_reported() {
        let err = release("/nonexistent/release-tool").await.unwrap_err();
        assert!(err.to_string().contains("failed to run `/nonexistent/release-tool tag`"));
    }
}
