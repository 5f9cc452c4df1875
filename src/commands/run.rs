//! `wssh run` — stream a local script to a remote host and execute it in
//! memory, no footprint on disk.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::agent::socket_for_host;
use crate::config::Config;
use crate::output::OutputContext;
use crate::ssh::SshRunner;

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Local script to stream
    pub script: PathBuf,
    /// Host alias to execute on
    pub host: String,
}

/// Run `wssh run <script> <host>`.
///
/// # Errors
///
/// Returns an error if the script is missing, ssh fails to run, or the
/// remote execution exits non-zero.
pub async fn run(ctx: &OutputContext, cfg: &Config, args: &RunArgs) -> Result<()> {
    anyhow::ensure!(
        args.script.exists(),
        "script file does not exist: {}",
        args.script.display()
    );

    ctx.info(&format!(
        "streaming {} to {}",
        args.script.display(),
        args.host
    ));

    let sock = socket_for_host(&args.host, &cfg.settings.ssh_agent_envs);
    let ssh = SshRunner::from_config(cfg);
    // `bash -s` reads the script from stdin on the remote side.
    let status = ssh
        .run_with_stdin_file(&args.host, "bash -s", sock, &args.script)
        .await?;
    anyhow::ensure!(status.success(), "script execution failed: {status}");

    ctx.success("execution complete");
    Ok(())
}
