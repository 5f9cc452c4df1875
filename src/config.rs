//! YAML configuration (`~/.wssh.yaml`) — schema and on-disk store.
//!
//! The configuration is loaded once in `cli::run` and passed by reference
//! into every component; nothing reads it ambiently.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default remote command used to discover the jumpbox FQDN and its node
/// table when `settings.capture_command` is unset.
pub const DEFAULT_DISCOVERY_COMMAND: &str = "hostname -f";

/// One SSH agent environment: a forwarding socket and the key it serves.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AgentEnv {
    /// Path of the agent socket (`SSH_AUTH_SOCK` value).
    pub sock: String,
    /// Path of the private key loaded into this agent.
    pub key: String,
}

/// `settings:` block.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Hours before the key is considered expired. `0` means the 23.5h default.
    pub agent_expiration_hours: f64,
    /// Which agent env's key mtime to check. Empty means `"default"`.
    pub auth_check_env: String,
    /// Disable strict host key checking. Unset means `true` — fleet hosts
    /// are rebuilt often enough that pinning is all noise.
    pub ignore_key_changes: Option<bool>,
    /// Agent environments keyed by name prefix. The reserved name
    /// `"default"` is the fallback when no prefix matches.
    pub ssh_agent_envs: BTreeMap<String, AgentEnv>,
    /// Remote command the node resolver runs on the jumpbox. Empty means
    /// [`DEFAULT_DISCOVERY_COMMAND`].
    pub capture_command: String,
}

impl Settings {
    /// Expiration window, applying the 23.5h default.
    #[must_use]
    pub fn expiration_hours(&self) -> f64 {
        if self.agent_expiration_hours == 0.0 {
            23.5
        } else {
            self.agent_expiration_hours
        }
    }

    /// Name of the agent env whose key is checked for expiration.
    #[must_use]
    pub fn check_env(&self) -> &str {
        if self.auth_check_env.is_empty() {
            "default"
        } else {
            &self.auth_check_env
        }
    }

    /// Discovery command for the node resolver.
    #[must_use]
    pub fn discovery_command(&self) -> &str {
        if self.capture_command.is_empty() {
            DEFAULT_DISCOVERY_COMMAND
        } else {
            &self.capture_command
        }
    }
}

/// A host entry inside a group.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Host {
    pub alias: String,
    pub hostname: String,
    pub tags: Vec<String>,
}

/// A named group of hosts sharing tags.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Group {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub hosts: Vec<Host>,
}

/// Top-level configuration stored in `~/.wssh.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub settings: Settings,
    /// Payload alias -> local archive path, for `wssh push`.
    pub payloads: BTreeMap<String, String>,
    pub groups: Vec<Group>,
}

impl Config {
    /// Resolve the config file path. `WSSH_CONFIG` overrides the default
    /// `~/.wssh.yaml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn path() -> Result<PathBuf> {
        if let Ok(val) = std::env::var("WSSH_CONFIG") {
            return Ok(PathBuf::from(val));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".wssh.yaml"))
    }

    /// Load and parse the config file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
    }

    /// Serialize the config back to `path` (used by `wssh add`).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("cannot serialize config")?;
        std::fs::write(path, content).with_context(|| format!("cannot write {}", path.display()))
    }

    /// Write a commented starter config for first runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_default(path: &Path) -> Result<()> {
        std::fs::write(path, DEFAULT_CONFIG)
            .with_context(|| format!("cannot write {}", path.display()))
    }
}

const DEFAULT_CONFIG: &str = "\
# wssh configuration
settings:
  # Hours before keys are considered stale (checked by `wssh auth`).
  agent_expiration_hours: 23.5
  # Which agent env's key mtime to check.
  auth_check_env: default
  # Skip strict host key checking for ephemeral fleet hosts.
  ignore_key_changes: true
  # Agent environments, matched by alias prefix (longest prefix wins).
  ssh_agent_envs:
    default:
      sock: ~/.ssh/agent-default.sock
      key: ~/.ssh/id_ed25519
  # Remote command run on the jumpbox by `wssh capture` for discovery.
  capture_command: \"\"

# Payloads available to `wssh push <alias> <host>`.
payloads: {}

groups:
  - name: example
    tags: [sandbox]
    hosts:
      - alias: dev-web-01
        hostname: web-01.dev.example.com
        tags: [web]
";
