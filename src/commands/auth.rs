//! `wssh auth` — key freshness check, then prime every configured agent.

use std::path::Path;
use std::process::Stdio;

use anyhow::Result;
use tokio::process::Command;

use crate::agent::{check_key_expiration, expand_path};
use crate::config::Config;
use crate::output::OutputContext;

/// Run `wssh auth`.
///
/// # Errors
///
/// Returns an error when no agent envs are configured or the checked key is
/// expired. Individual agent failures are warnings.
pub async fn run(ctx: &OutputContext, cfg: &Config) -> Result<()> {
    anyhow::ensure!(
        !cfg.settings.ssh_agent_envs.is_empty(),
        "no ssh_agent_envs found in ~/.wssh.yaml under settings"
    );

    check_key_expiration(&cfg.settings)?;
    ctx.success("keys are fresh");

    for (name, env) in &cfg.settings.ssh_agent_envs {
        ctx.header(&format!("Agent env: {name}"));
        let sock = expand_path(&env.sock);
        let key = expand_path(&env.key);

        if agent_alive(&sock).await {
            ctx.success(&format!("socket {} is alive", sock.display()));
        } else {
            ctx.warn(&format!(
                "socket {} missing or dead, starting a new agent",
                sock.display()
            ));
            let _ = std::fs::remove_file(&sock);
            let _ = Command::new("ssh-agent")
                .arg("-a")
                .arg(&sock)
                .stdout(Stdio::null())
                .status()
                .await;
        }

        // Flush stale identities before loading the current key.
        let _ = Command::new("ssh-add")
            .arg("-D")
            .env("SSH_AUTH_SOCK", &sock)
            .stderr(Stdio::null())
            .status()
            .await;

        if key.exists() {
            let added = Command::new("ssh-add")
                .arg(&key)
                .env("SSH_AUTH_SOCK", &sock)
                .status()
                .await
                .map(|s| s.success())
                .unwrap_or(false);
            if added {
                ctx.success(&format!("updated {name} agent with {}", key.display()));
            } else {
                ctx.warn(&format!("failed to add key to {name} agent"));
            }
        } else {
            ctx.warn(&format!("key file {} not found", key.display()));
        }
    }
    Ok(())
}

async fn agent_alive(sock: &Path) -> bool {
    Command::new("ssh-add")
        .arg("-l")
        .env("SSH_AUTH_SOCK", sock)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}
