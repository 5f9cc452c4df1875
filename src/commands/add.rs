//! `wssh add` — wizard that records a new host in `~/.wssh.yaml` and
//! appends a matching block to `~/.ssh/config`.

use std::io::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, Select};

use crate::config::{Config, Group, Host};
use crate::output::OutputContext;

/// Run `wssh add`.
///
/// # Errors
///
/// Returns an error if a prompt fails or either config file cannot be
/// written.
pub fn run(ctx: &OutputContext, cfg: &mut Config, config_path: &Path) -> Result<()> {
    ctx.header("Add New Host");

    let alias: String = Input::new()
        .with_prompt("Alias (e.g. dev-web-02)")
        .interact_text()
        .context("reading alias")?;
    let hostname: String = Input::new()
        .with_prompt("FQDN or IP address")
        .interact_text()
        .context("reading hostname")?;
    let tags_raw: String = Input::new()
        .with_prompt("Tags (comma separated, optional)")
        .allow_empty(true)
        .interact_text()
        .context("reading tags")?;
    let tags: Vec<String> = tags_raw
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect();

    let existing: Vec<String> = cfg.groups.iter().map(|g| g.name.clone()).collect();
    let prompt = if existing.is_empty() {
        "Group".to_string()
    } else {
        format!("Group (existing: {})", existing.join(", "))
    };
    let group_name: String = Input::new()
        .with_prompt(prompt)
        .interact_text()
        .context("reading group")?;

    let identity_file = select_identity(cfg)?;

    let host = Host {
        alias: alias.clone(),
        hostname: hostname.clone(),
        tags,
    };
    match cfg
        .groups
        .iter_mut()
        .find(|g| g.name.eq_ignore_ascii_case(&group_name))
    {
        Some(group) => group.hosts.push(host),
        None => cfg.groups.push(Group {
            name: group_name,
            tags: Vec::new(),
            hosts: vec![host],
        }),
    }

    cfg.save(config_path)?;
    ctx.success(&format!("added to {}", config_path.display()));

    append_ssh_config(&alias, &hostname, identity_file.as_deref())?;
    ctx.success("appended to ~/.ssh/config");
    Ok(())
}

/// Pick the agent env whose key becomes the `IdentityFile`; `None` for
/// password auth or when nothing is configured.
fn select_identity(cfg: &Config) -> Result<Option<String>> {
    if cfg.settings.ssh_agent_envs.is_empty() {
        return Ok(None);
    }
    let key_auth = Confirm::new()
        .with_prompt("Key-based auth?")
        .default(true)
        .interact()
        .context("reading auth type")?;
    if !key_auth {
        return Ok(None);
    }

    let names: Vec<&String> = cfg.settings.ssh_agent_envs.keys().collect();
    let chosen = Select::new()
        .with_prompt("Agent env for IdentityFile")
        .items(&names)
        .default(0)
        .interact()
        .context("reading agent env")?;
    Ok(cfg
        .settings
        .ssh_agent_envs
        .get(names[chosen].as_str())
        .map(|env| env.key.clone()))
}

fn append_ssh_config(alias: &str, hostname: &str, identity_file: Option<&str>) -> Result<()> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    let path = home.join(".ssh").join("config");
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(&path)
        .with_context(|| format!("cannot open {}", path.display()))?;

    let mut block = format!("\nHost {alias}\n    HostName {hostname}\n");
    if let Some(identity) = identity_file {
        block.push_str(&format!("    IdentityFile {identity}\n"));
    }
    file.write_all(block.as_bytes())
        .with_context(|| format!("cannot write {}", path.display()))?;
    set_permissions(&path, 0o600)
}

#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .with_context(|| format!("cannot set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
