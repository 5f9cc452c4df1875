//! Default action: `wssh <host>` opens an interactive SSH session.

use anyhow::Result;

use crate::agent::{check_key_expiration, socket_for_host};
use crate::config::Config;
use crate::history;
use crate::output::OutputContext;
use crate::ssh::SshRunner;

/// Connect to `alias` with the resolved agent socket and log the session.
///
/// # Errors
///
/// Returns an error if the configured key is expired or ssh cannot run.
pub async fn run(ctx: &OutputContext, cfg: &Config, alias: &str) -> Result<()> {
    check_key_expiration(&cfg.settings)?;

    let sock = socket_for_host(alias, &cfg.settings.ssh_agent_envs);
    ctx.info(&format!("connecting to {alias}"));

    let ssh = SshRunner::from_config(cfg);
    let status = ssh.run_passthrough(alias, None, sock).await?;

    if status.success() {
        match history::history_path() {
            Ok(path) => {
                if let Err(err) = history::log_connection(&path, alias) {
                    ctx.warn(&format!("failed to log connection: {err:#}"));
                }
            }
            Err(err) => ctx.warn(&format!("failed to log connection: {err:#}")),
        }
    }
    Ok(())
}
