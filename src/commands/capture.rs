//! `wssh capture` — resolve nodes through the jumpbox and fan their live
//! captures into one local viewer.

use anyhow::Result;
use clap::Args;

use crate::capture::session::ProcessBackend;
use crate::capture::{resolve_nodes, run_session};
use crate::config::Config;
use crate::output::OutputContext;
use crate::ssh::SshRunner;

pub const USAGE: &str = "Usage: wssh capture <jb-alias> node <3,4> cap <port 443>";

/// Arguments for the capture command.
#[derive(Args)]
pub struct CaptureArgs {
    /// `<jb-alias> node <id,id,...> cap <filter...>`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

/// The capture invocation after syntax validation.
#[derive(Debug, PartialEq, Eq)]
pub struct CaptureRequest<'a> {
    pub jumpbox: &'a str,
    pub node_list: &'a str,
    pub filter: String,
}

/// Validate the literal-token syntax: `<jb-alias> node <list> cap [filter...]`.
/// Everything after `cap` is joined verbatim into the capture filter.
#[must_use]
pub fn parse_syntax(args: &[String]) -> Option<CaptureRequest<'_>> {
    if args.len() < 4 || args[1] != "node" || args[3] != "cap" {
        return None;
    }
    Some(CaptureRequest {
        jumpbox: &args[0],
        node_list: &args[2],
        filter: args[4..].join(" "),
    })
}

/// Run `wssh capture ...`.
///
/// # Errors
///
/// Returns an error on malformed syntax (after printing usage, before any
/// side effect), on node-resolution failure, or on fatal session-setup
/// failure.
pub async fn run(ctx: &OutputContext, cfg: &Config, args: &CaptureArgs) -> Result<()> {
    let Some(request) = parse_syntax(&args.args) else {
        ctx.error("invalid syntax");
        eprintln!("{USAGE}");
        anyhow::bail!("invalid capture syntax");
    };

    let ssh = SshRunner::from_config(cfg);
    let (targets, sock) = resolve_nodes(
        &ssh,
        request.jumpbox,
        request.node_list,
        &cfg.settings,
        ctx,
    )
    .await?;

    let backend = ProcessBackend::new(&ssh);
    run_session(&backend, &targets, &request.filter, sock.as_deref(), ctx).await
}
