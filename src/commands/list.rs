//! `wssh list` — search the host inventory.

use clap::Args;

use crate::config::Config;
use crate::hosts::{build_index, find_hosts};
use crate::output::OutputContext;

/// Arguments for the list command.
#[derive(Args)]
pub struct ListArgs {
    /// Search terms, ANDed together; regex metacharacters are honored
    pub terms: Vec<String>,
}

/// Run `wssh list [terms...]`.
pub fn run(ctx: &OutputContext, cfg: &Config, args: &ListArgs) {
    let index = build_index(cfg);
    let matches = find_hosts(&args.terms, &index);

    if matches.is_empty() {
        ctx.error(&format!(
            "no hosts found matching: {}",
            args.terms.join(" ")
        ));
        return;
    }

    ctx.header(&format!("Matching Hosts ({})", matches.len()));
    for host in &matches {
        println!("  {:<30} [Group: {}]", host.alias, host.group_name);
    }
}
