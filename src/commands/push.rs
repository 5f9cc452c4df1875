//! `wssh push` — scp a configured payload archive to a host and extract it.

use anyhow::{Context, Result};
use clap::Args;

use crate::agent::expand_path;
use crate::config::Config;
use crate::history;
use crate::output::OutputContext;
use crate::ssh::SshRunner;

/// Arguments for the push command.
#[derive(Args)]
pub struct PushArgs {
    /// Payload alias from the `payloads:` config section
    pub payload: String,
    /// Host alias to push to
    pub host: String,
}

/// Run `wssh push <payload-alias> <host>`.
///
/// # Errors
///
/// Returns an error if the payload is unconfigured or missing, or if the
/// transfer or remote extraction fails.
pub async fn run(ctx: &OutputContext, cfg: &Config, args: &PushArgs) -> Result<()> {
    let configured = cfg.payloads.get(&args.payload).with_context(|| {
        format!(
            "payload alias '{}' not found in ~/.wssh.yaml under 'payloads'",
            args.payload
        )
    })?;

    let local = expand_path(configured);
    anyhow::ensure!(
        local.exists(),
        "payload file does not exist: {}",
        local.display()
    );

    let ssh = SshRunner::from_config(cfg);
    let remote_name = format!("{}.tgz", args.payload);
    ctx.info(&format!(
        "uploading {} to {} as {remote_name}",
        local.display(),
        args.host
    ));
    let status = ssh.scp(&local, &args.host, &remote_name).await?;
    anyhow::ensure!(status.success(), "scp failed: {status}");

    // The archive is left in place on the host after extraction.
    ctx.info(&format!("extracting {remote_name} on {}", args.host));
    let extract = format!("tar -xzf {remote_name} -C ~/");
    let status = ssh.run_passthrough(&args.host, Some(&extract), None).await?;
    anyhow::ensure!(status.success(), "remote extraction failed: {status}");

    match history::push_history_path() {
        Ok(path) => {
            if let Err(err) = history::log_push(&path, &args.host, &args.payload) {
                ctx.warn(&format!("failed to log push history: {err:#}"));
            }
        }
        Err(err) => ctx.warn(&format!("failed to log push history: {err:#}")),
    }

    ctx.success("push install complete");
    Ok(())
}
