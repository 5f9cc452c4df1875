//! Remote shell transport — all ssh/scp process execution goes through
//! [`SshRunner`].
//!
//! The runner only builds argument vectors and spawns processes; it never
//! interprets remote output. `SSH_AUTH_SOCK` is injected per child process,
//! so concurrent children can safely share one resolved socket path.

use std::path::Path;
use std::process::{ExitStatus, Output, Stdio};

use anyhow::{Context, Result};
use tokio::process::{Child, Command};

use crate::config::Config;

/// Shared ssh/scp invocation policy.
pub struct SshRunner {
    ignore_host_keys: bool,
}

impl SshRunner {
    #[must_use]
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            // Fleet hosts are reimaged constantly; pinning host keys is an
            // explicit non-default opt-in.
            ignore_host_keys: cfg.settings.ignore_key_changes.unwrap_or(true),
        }
    }

    #[must_use]
    pub fn new(ignore_host_keys: bool) -> Self {
        Self { ignore_host_keys }
    }

    /// Options prepended to every ssh/scp invocation.
    fn base_args(&self) -> Vec<&'static str> {
        if self.ignore_host_keys {
            vec![
                "-o",
                "StrictHostKeyChecking=no",
                "-o",
                "UserKnownHostsFile=/dev/null",
            ]
        } else {
            Vec::new()
        }
    }

    /// Full argument vector for `ssh <host> [command]`.
    #[must_use]
    pub fn remote_args(&self, host: &str, command: Option<&str>) -> Vec<String> {
        let mut args: Vec<String> = self.base_args().into_iter().map(String::from).collect();
        args.push(host.to_string());
        if let Some(command) = command {
            args.push(command.to_string());
        }
        args
    }

    fn ssh_command(&self, host: &str, command: Option<&str>, agent_sock: Option<&str>) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.args(self.remote_args(host, command));
        if let Some(sock) = agent_sock {
            cmd.env("SSH_AUTH_SOCK", sock);
        }
        cmd
    }

    /// Run a remote command and capture its output.
    ///
    /// # Errors
    ///
    /// Returns an error if ssh cannot be spawned or waited on; a non-zero
    /// remote exit is reported through [`Output::status`], not as an error.
    pub async fn run_output(
        &self,
        host: &str,
        command: &str,
        agent_sock: Option<&str>,
    ) -> Result<Output> {
        self.ssh_command(host, Some(command), agent_sock)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("failed to execute ssh to {host}"))
    }

    /// Run a remote command (or an interactive login when `command` is
    /// `None`) with inherited stdio.
    ///
    /// # Errors
    ///
    /// Returns an error if ssh cannot be spawned or waited on.
    pub async fn run_passthrough(
        &self,
        host: &str,
        command: Option<&str>,
        agent_sock: Option<&str>,
    ) -> Result<ExitStatus> {
        self.ssh_command(host, command, agent_sock)
            .status()
            .await
            .with_context(|| format!("failed to execute ssh to {host}"))
    }

    /// Stream a local file into a remote command's stdin (`bash -s` style),
    /// with output passed through to the terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or ssh fails to run.
    pub async fn run_with_stdin_file(
        &self,
        host: &str,
        command: &str,
        agent_sock: Option<&str>,
        input: &Path,
    ) -> Result<ExitStatus> {
        let file = std::fs::File::open(input)
            .with_context(|| format!("failed to open {}", input.display()))?;
        self.ssh_command(host, Some(command), agent_sock)
            .stdin(Stdio::from(file))
            .status()
            .await
            .with_context(|| format!("failed to execute ssh to {host}"))
    }

    /// Spawn a long-running remote command with stdout redirected (a FIFO
    /// write end) and stderr left on the terminal so remote sudo prompts
    /// stay visible. `kill_on_drop` is a safety net; the capture session
    /// owns explicit termination.
    ///
    /// # Errors
    ///
    /// Returns an error if the process fails to spawn.
    pub fn spawn_streaming(
        &self,
        host: &str,
        command: &str,
        agent_sock: Option<&str>,
        stdout: Stdio,
    ) -> Result<Child> {
        self.ssh_command(host, Some(command), agent_sock)
            .stdin(Stdio::null())
            .stdout(stdout)
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start ssh stream to {host}"))
    }

    /// Copy a local file to `host:<remote_name>` via scp, stdio inherited.
    ///
    /// # Errors
    ///
    /// Returns an error if scp cannot be spawned or waited on.
    pub async fn scp(&self, local: &Path, host: &str, remote_name: &str) -> Result<ExitStatus> {
        let mut cmd = Command::new("scp");
        cmd.args(self.base_args());
        cmd.arg(local);
        cmd.arg(format!("{host}:{remote_name}"));
        cmd.status()
            .await
            .with_context(|| format!("failed to execute scp to {host}"))
    }
}
