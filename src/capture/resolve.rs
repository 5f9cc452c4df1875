//! Node resolution through the jumpbox.
//!
//! Data nodes are easiest to reach through the jumpbox, and only the jumpbox
//! knows their current FQDNs. One discovery command returns the jumpbox's
//! own `hostname -f` on line 1 followed by a comma-separated node table;
//! everything here except [`resolve_nodes`] is pure parsing.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::agent::socket_for_host;
use crate::capture::error::CaptureError;
use crate::config::{AgentEnv, Settings};
use crate::output::OutputContext;
use crate::ssh::SshRunner;

/// A table row is skipped when it starts with this token (header row).
pub const HEADER_TOKEN: &str = "VSERVER ID";

/// Rows with fewer columns than this are malformed and skipped.
pub const MIN_COLUMNS: usize = 7;

/// Routing subdomain stripped from the jumpbox FQDN when deriving the
/// suffix appended to short node labels.
const ROUTING_PREFIX: &str = "service.vsr.";

/// One requested node mapped to its fully qualified name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNode {
    pub node_id: String,
    pub target_fqdn: String,
}

/// Outcome of parsing one discovery invocation. Immutable once built.
#[derive(Debug, Clone)]
pub struct NodeResolution {
    pub jumpbox_fqdn: String,
    pub domain_suffix: String,
    pub resolved: Vec<ResolvedNode>,
}

/// A parsed data row: first column is the node id, last is the short host
/// label.
#[derive(Debug, PartialEq, Eq)]
pub struct NodeRow<'a> {
    pub node_id: &'a str,
    pub host_label: &'a str,
}

/// Why a table line was not treated as a data row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Blank,
    Header,
    TooFewColumns,
}

/// Tagged result of classifying one table line, so skipped rows stay
/// observable instead of silently vanishing.
#[derive(Debug, PartialEq, Eq)]
pub enum RowOutcome<'a> {
    Row(NodeRow<'a>),
    Skipped(SkipReason),
}

/// Classify one line of the discovery table.
#[must_use]
pub fn classify_row(line: &str) -> RowOutcome<'_> {
    if line.trim().is_empty() {
        return RowOutcome::Skipped(SkipReason::Blank);
    }
    if line.starts_with(HEADER_TOKEN) {
        return RowOutcome::Skipped(SkipReason::Header);
    }
    let cols: Vec<&str> = line.split(',').collect();
    if cols.len() < MIN_COLUMNS {
        return RowOutcome::Skipped(SkipReason::TooFewColumns);
    }
    RowOutcome::Row(NodeRow {
        node_id: cols[0].trim(),
        host_label: cols[cols.len() - 1].trim(),
    })
}

/// Derive the domain suffix from the jumpbox's authoritative FQDN: drop the
/// first label, strip a leading routing subdomain, keep the leading dot.
///
/// `jb01.service.vsr.example.com` and `jb01.example.com` both yield
/// `.example.com`. A name with no dot yields an empty suffix.
#[must_use]
pub fn domain_suffix(fqdn: &str) -> String {
    match fqdn.split_once('.') {
        Some((_, rest)) => {
            let rest = rest.strip_prefix(ROUTING_PREFIX).unwrap_or(rest);
            format!(".{rest}")
        }
        None => String::new(),
    }
}

/// Parse raw discovery output against a comma-separated list of requested
/// node ids.
///
/// Matching is exact string equality after trimming, never substring. Rows
/// are walked in table order; a row contributes one target per requested id
/// it equals, so duplicated table rows produce duplicated targets.
///
/// # Errors
///
/// [`CaptureError::MalformedOutput`] when the output has fewer than two
/// lines, [`CaptureError::NoMatch`] when nothing matched.
pub fn parse_discovery(output: &str, node_list: &str) -> Result<NodeResolution, CaptureError> {
    let trimmed = output.trim();
    let lines: Vec<&str> = trimmed.split('\n').collect();
    if lines.len() < 2 {
        return Err(CaptureError::MalformedOutput(trimmed.to_string()));
    }

    let jumpbox_fqdn = lines[0].trim().to_string();
    let suffix = domain_suffix(&jumpbox_fqdn);
    let requested: Vec<&str> = node_list.split(',').map(str::trim).collect();

    let mut resolved = Vec::new();
    for line in &lines[1..] {
        let RowOutcome::Row(row) = classify_row(line) else {
            continue;
        };
        for req in &requested {
            if row.node_id == *req {
                resolved.push(ResolvedNode {
                    node_id: row.node_id.to_string(),
                    target_fqdn: format!("{}{suffix}", row.host_label),
                });
            }
        }
    }

    if resolved.is_empty() {
        return Err(CaptureError::NoMatch(node_list.to_string()));
    }

    Ok(NodeResolution {
        jumpbox_fqdn,
        domain_suffix: suffix,
        resolved,
    })
}

/// Resolve requested nodes to FQDNs via the jumpbox and return them together
/// with the agent socket that was used, so the capture stage reuses the same
/// authentication channel.
///
/// # Errors
///
/// [`CaptureError::Resolution`] when the jumpbox is unreachable or the
/// discovery command exits non-zero; parse errors per [`parse_discovery`].
pub async fn resolve_nodes(
    ssh: &SshRunner,
    jumpbox: &str,
    node_list: &str,
    settings: &Settings,
    ctx: &OutputContext,
) -> Result<(Vec<String>, Option<String>)> {
    ctx.info(&format!(
        "connecting to {jumpbox} to resolve FQDN and node mappings"
    ));

    let sock = resolve_socket(jumpbox, &settings.ssh_agent_envs);
    let output = ssh
        .run_output(jumpbox, settings.discovery_command(), sock.as_deref())
        .await
        .map_err(|err| CaptureError::Resolution {
            host: jumpbox.to_string(),
            detail: format!("{err:#}"),
        })?;

    if !output.status.success() {
        return Err(CaptureError::Resolution {
            host: jumpbox.to_string(),
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
        .into());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let resolution = parse_discovery(&stdout, node_list)?;

    ctx.info(&format!("jumpbox FQDN: {}", resolution.jumpbox_fqdn));
    for node in &resolution.resolved {
        ctx.success(&format!(
            "found node {} -> {}",
            node.node_id, node.target_fqdn
        ));
    }

    let targets = resolution
        .resolved
        .into_iter()
        .map(|n| n.target_fqdn)
        .collect();
    Ok((targets, sock))
}

fn resolve_socket(jumpbox: &str, envs: &BTreeMap<String, AgentEnv>) -> Option<String> {
    socket_for_host(jumpbox, envs).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn suffix_strips_routing_subdomain() {
        assert_eq!(domain_suffix("jb01.service.vsr.example.com"), ".example.com");
        assert_eq!(domain_suffix("jb01.example.com"), ".example.com");
        assert_eq!(domain_suffix("jb01"), "");
    }

    #[test]
    fn classifies_blank_header_and_short_rows() {
        assert_eq!(classify_row("   "), RowOutcome::Skipped(SkipReason::Blank));
        assert_eq!(
            classify_row("VSERVER ID,A,B,C,D,E,HOST"),
            RowOutcome::Skipped(SkipReason::Header)
        );
        assert_eq!(
            classify_row("3,a,b"),
            RowOutcome::Skipped(SkipReason::TooFewColumns)
        );
        assert_eq!(
            classify_row(" 3 ,a,b,c,d,e, node-c "),
            RowOutcome::Row(NodeRow {
                node_id: "3",
                host_label: "node-c",
            })
        );
    }

    #[test]
    fn end_to_end_discovery_parse() {
        let output = "jb01.service.vsr.example.com\n\
                      VSERVER ID,A,B,C,D,E,HOST\n\
                      3,a,b,c,d,e,node-c\n\
                      4,a,b,c,d,e,node-d\n";
        let res = parse_discovery(output, "3,4").expect("parses");
        assert_eq!(res.jumpbox_fqdn, "jb01.service.vsr.example.com");
        assert_eq!(res.domain_suffix, ".example.com");
        let targets: Vec<&str> = res.resolved.iter().map(|n| n.target_fqdn.as_str()).collect();
        assert_eq!(targets, vec!["node-c.example.com", "node-d.example.com"]);
    }

    #[test]
    fn matching_is_exact_not_substring() {
        let output = "jb01.example.com\n33,a,b,c,d,e,node-x\n3,a,b,c,d,e,node-c\n";
        let res = parse_discovery(output, "3").expect("parses");
        assert_eq!(res.resolved.len(), 1);
        assert_eq!(res.resolved[0].target_fqdn, "node-c.example.com");
    }

    #[test]
    fn duplicate_rows_are_preserved() {
        let output = "jb01.example.com\n3,a,b,c,d,e,node-c\n3,a,b,c,d,e,node-c2\n";
        let res = parse_discovery(output, "3").expect("parses");
        let targets: Vec<&str> = res.resolved.iter().map(|n| n.target_fqdn.as_str()).collect();
        assert_eq!(targets, vec!["node-c.example.com", "node-c2.example.com"]);
    }

    #[test]
    fn requested_ids_are_trimmed() {
        let output = "jb01.example.com\n3,a,b,c,d,e,node-c\n";
        let res = parse_discovery(output, " 3 , 9 ").expect("parses");
        assert_eq!(res.resolved[0].node_id, "3");
    }

    #[test]
    fn no_match_fails() {
        let output = "jb01.example.com\n3,a,b,c,d,e,node-c\n";
        let err = parse_discovery(output, "7").expect_err("no match");
        assert!(matches!(err, CaptureError::NoMatch(ref list) if list == "7"));
    }

    proptest! {
        /// Any output with fewer than two lines is malformed and never
        /// yields targets.
        #[test]
        fn prop_single_line_output_is_malformed(line in "[a-zA-Z0-9 .,-]{0,60}") {
            let result = parse_discovery(&line, "1,2,3");
            prop_assert!(matches!(result, Err(CaptureError::MalformedOutput(_))));
        }
    }
}
