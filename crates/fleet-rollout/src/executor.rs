//! Remote command execution.
//!
//! The rollout only needs "run this on that host and tell me the exit
//! status", so the transport sits behind [`RemoteExecutor`]. The default
//! implementation shells out to `ssh` and `scp`.

use std::future::Future;
use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use fleet_core::RemoteSettings;

/// A command line to run on a remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    argv: Vec<String>,
    stdin: Option<String>,
}

impl RemoteCommand {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            stdin: None,
        }
    }

    /// `<script> <version>`, the remote half of a deploy.
    pub fn deploy(script: &str, version: &str) -> Self {
        Self::new([script, version])
    }

    /// Feed `input` to the remote command's stdin.
    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn stdin(&self) -> Option<&str> {
        self.stdin.as_deref()
    }

    /// Command line as the remote shell will see it.
    pub fn to_shell(&self) -> String {
        self.argv
            .iter()
            .map(|a| shell_quote(a))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Exit status of a remote command. `None` means killed by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteStatus {
    pub code: Option<i32>,
}

impl RemoteStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for RemoteStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// Runs commands on, and copies files to, remote hosts.
pub trait RemoteExecutor {
    /// Human-readable form of what `execute` will run.
    fn describe(&self, host: &str, command: &RemoteCommand) -> String;

    fn execute(
        &self,
        host: &str,
        command: &RemoteCommand,
    ) -> impl Future<Output = std::io::Result<RemoteStatus>>;

    /// Copy `local` to `remote` (a path on `host`).
    fn copy_to(
        &self,
        host: &str,
        local: &Path,
        remote: &str,
    ) -> impl Future<Output = std::io::Result<RemoteStatus>>;
}

/// Executes through the local `ssh` / `scp` binaries.
///
/// Child processes inherit stdout and stderr so remote output streams
/// straight to the operator's terminal.
#[derive(Debug, Clone)]
pub struct SshExecutor {
    ssh: String,
    scp: String,
}

impl SshExecutor {
    pub fn new(ssh: impl Into<String>, scp: impl Into<String>) -> Self {
        Self {
            ssh: ssh.into(),
            scp: scp.into(),
        }
    }

    pub fn from_settings(settings: &RemoteSettings) -> Self {
        Self::new(settings.ssh.clone(), settings.scp.clone())
    }
}

impl Default for SshExecutor {
    fn default() -> Self {
        Self::new("ssh", "scp")
    }
}

impl RemoteExecutor for SshExecutor {
    fn describe(&self, host: &str, command: &RemoteCommand) -> String {
        format!("{} {host} {}", self.ssh, command.to_shell())
    }

    async fn execute(&self, host: &str, command: &RemoteCommand) -> std::io::Result<RemoteStatus> {
        let mut cmd = Command::new(&self.ssh);
        cmd.arg(host).arg(command.to_shell());
        cmd.stdin(if command.stdin().is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.kill_on_drop(true);

        debug!("Running: {:?}", cmd);
        let mut child = cmd.spawn()?;

        if let Some(input) = command.stdin() {
            if let Some(mut pipe) = child.stdin.take() {
                let written = pipe.write_all(input.as_bytes()).await;
                // Dropping the pipe closes the remote stdin.
                drop(pipe);
                if let Err(e) = written {
                    // Reap the child so no ssh process outlives the call.
                    let _ = child.wait().await;
                    return Err(e);
                }
            }
        }

        Ok(child.wait().await?.into())
    }

    async fn copy_to(&self, host: &str, local: &Path, remote: &str) -> std::io::Result<RemoteStatus> {
        let mut cmd = Command::new(&self.scp);
        cmd.arg(local).arg(format!("{host}:{remote}"));
        debug!("Running: {:?}", cmd);
        Ok(cmd.status().await?.into())
    }
}

/// Quote a word for a POSIX shell if it needs it.
pub fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,~".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deploy_command_renders_plainly() {
        let cmd = RemoteCommand::deploy("./deploy-proxy.sh", "0.0.44");
        assert_eq!(cmd.to_shell(), "./deploy-proxy.sh 0.0.44");
        let ssh = SshExecutor::default();
        assert_eq!(
            ssh.describe("10.0.0.1", &cmd),
            "ssh 10.0.0.1 ./deploy-proxy.sh 0.0.44"
        );
    }

    #[test]
    fn unsafe_words_are_quoted() {
        assert_eq!(shell_quote("0.1.0; rm -rf /"), "'0.1.0; rm -rf /'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("$USER"), "'$USER'");
    }

    #[test]
    fn stdin_is_not_rendered() {
        let cmd = RemoteCommand::new(["docker", "login", "--password-stdin"]).with_stdin("secret");
        assert!(!cmd.to_shell().contains("secret"));
        assert_eq!(cmd.stdin(), Some("secret"));
    }

    #[tokio::test]
    async fn ssh_executor_reports_spawn_failure() {
        let ssh = SshExecutor::new("/nonexistent/ssh-binary", "/nonexistent/scp-binary");
        let cmd = RemoteCommand::deploy("./deploy-proxy.sh", "1.0.0");
        assert!(ssh.execute("host", &cmd).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn ssh_executor_passes_exit_code_through() {
        // `false` ignores its arguments and exits 1.
        let ssh = SshExecutor::new("false", "true");
        let status = ssh
            .execute("host", &RemoteCommand::deploy("./deploy-proxy.sh", "1.0.0"))
            .await
            .unwrap();
        assert_eq!(status.code, Some(1));
        assert!(!status.success());

        let copied = ssh
            .copy_to("host", Path::new("deploy-proxy.sh"), "~/.")
            .await
            .unwrap();
        assert!(copied.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn ssh_executor_reaps_child_when_stdin_write_fails() {
        // `true` exits without reading, so a write larger than the pipe buffer breaks.
        let ssh = SshExecutor::new("true", "true");
        let cmd = RemoteCommand::new(["cat"]).with_stdin("x".repeat(1 << 20));
        let err = ssh.execute("host", &cmd).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }
}
