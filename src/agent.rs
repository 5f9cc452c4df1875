//! SSH agent environments: socket resolution and key freshness.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::SystemTime;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::config::{AgentEnv, Settings};

/// Reserved env name used as the fallback when no prefix matches.
pub const DEFAULT_ENV: &str = "default";

/// Resolve the agent socket for a host alias.
///
/// Every configured env except `"default"` whose name is a prefix of the
/// alias is a candidate; the longest prefix wins so `"prodeu"` beats
/// `"prod"` for `prodeu-01`. Falls back to the `"default"` env, then to
/// `None`, which callers must treat as "no override — let ssh use the
/// ambient agent". Never fails.
#[must_use]
pub fn socket_for_host<'a>(alias: &str, envs: &'a BTreeMap<String, AgentEnv>) -> Option<&'a str> {
    envs.iter()
        .filter(|(name, _)| name.as_str() != DEFAULT_ENV && alias.starts_with(name.as_str()))
        .max_by_key(|(name, _)| name.len())
        .or_else(|| envs.get_key_value(DEFAULT_ENV))
        .map(|(_, env)| env.sock.as_str())
}

/// Expand `~/` and `$VAR` references in a configured path.
#[must_use]
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if let Some(rest) = path.strip_prefix("$HOME/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Whether a key last touched at `modified` is past the expiration window.
#[must_use]
pub fn is_expired(modified: SystemTime, hours: f64) -> bool {
    let Ok(age) = modified.elapsed() else {
        // Clock skew put the mtime in the future; treat as fresh.
        return false;
    };
    age.as_secs_f64() > hours * 3600.0
}

/// Check the configured auth-check key against the expiration window.
///
/// Skipped entirely when no agent envs are configured.
///
/// # Errors
///
/// Returns an error if the key file is missing or older than the window.
pub fn check_key_expiration(settings: &Settings) -> Result<()> {
    if settings.ssh_agent_envs.is_empty() {
        return Ok(());
    }

    let check_env = settings.check_env();
    let env = settings.ssh_agent_envs.get(check_env).with_context(|| {
        format!("auth_check_env '{check_env}' not found in settings.ssh_agent_envs")
    })?;

    let key_path = expand_path(&env.key);
    let modified = std::fs::metadata(&key_path)
        .and_then(|m| m.modified())
        .with_context(|| {
            format!(
                "could not find key {}. Have you run your 2FA utility?",
                key_path.display()
            )
        })?;

    if is_expired(modified, settings.expiration_hours()) {
        let stamp: DateTime<Local> = modified.into();
        anyhow::bail!(
            "keys were last updated at {}. Run your 2FA utility, then `wssh auth`",
            stamp.format("%d %b %y %H:%M")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use proptest::prelude::*;

    use super::*;

    fn envs(entries: &[(&str, &str)]) -> BTreeMap<String, AgentEnv> {
        entries
            .iter()
            .map(|(name, sock)| {
                (
                    (*name).to_string(),
                    AgentEnv {
                        sock: (*sock).to_string(),
                        key: String::new(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn prefix_match_wins_over_default() {
        let table = envs(&[("default", "/tmp/d.sock"), ("dev", "/tmp/dev.sock")]);
        assert_eq!(socket_for_host("dev-02", &table), Some("/tmp/dev.sock"));
    }

    #[test]
    fn longest_prefix_wins() {
        let table = envs(&[("prod", "/tmp/p.sock"), ("prodeu", "/tmp/pe.sock")]);
        assert_eq!(socket_for_host("prodeu-01", &table), Some("/tmp/pe.sock"));
    }

    #[test]
    fn falls_back_to_default_then_none() {
        let table = envs(&[("default", "/tmp/d.sock"), ("dev", "/tmp/dev.sock")]);
        assert_eq!(socket_for_host("staging-01", &table), Some("/tmp/d.sock"));

        let no_default = envs(&[("dev", "/tmp/dev.sock")]);
        assert_eq!(socket_for_host("staging-01", &no_default), None);
    }

    #[test]
    fn default_name_is_not_a_prefix_candidate() {
        // An alias literally starting with "default" must still go through
        // prefix matching of the other entries first.
        let table = envs(&[("default", "/tmp/d.sock"), ("def", "/tmp/def.sock")]);
        assert_eq!(socket_for_host("default-01", &table), Some("/tmp/def.sock"));
    }

    #[test]
    fn expiry_boundaries() {
        let now = SystemTime::now();
        assert!(!is_expired(now, 1.0));
        let old = now - Duration::from_secs(2 * 3600);
        assert!(is_expired(old, 1.0));
        assert!(!is_expired(old, 3.0));
    }

    proptest! {
        /// The resolver never panics and only ever returns a configured
        /// socket (or nothing).
        #[test]
        fn prop_resolver_returns_configured_socket(
            alias in "[a-z0-9-]{0,24}",
            names in proptest::collection::btree_map("[a-z]{1,8}", "/tmp/[a-z]{1,8}\\.sock", 0..6),
        ) {
            let table: BTreeMap<String, AgentEnv> = names
                .iter()
                .map(|(n, s)| (n.clone(), AgentEnv { sock: s.clone(), key: String::new() }))
                .collect();
            let resolved = socket_for_host(&alias, &table);
            if let Some(sock) = resolved {
                prop_assert!(table.values().any(|e| e.sock == sock));
            }
        }

        /// When a non-default entry matches, the result is the socket of the
        /// longest matching prefix, never the default fallback.
        #[test]
        fn prop_longest_prefix_semantics(
            alias in "[a-z]{4,12}",
            table in proptest::collection::btree_map("[a-z]{1,6}", "/s/[a-z]{1,6}", 1..6),
        ) {
            let envs: BTreeMap<String, AgentEnv> = table
                .iter()
                .map(|(n, s)| (n.clone(), AgentEnv { sock: s.clone(), key: String::new() }))
                .collect();
            let best = table
                .iter()
                .filter(|(n, _)| n.as_str() != DEFAULT_ENV && alias.starts_with(n.as_str()))
                .max_by_key(|(n, _)| n.len());
            if let Some((_, sock)) = best {
                prop_assert_eq!(socket_for_host(&alias, &envs), Some(sock.as_str()));
            }
        }
    }
}
