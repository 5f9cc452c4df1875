//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;
use crate::config::Config;
use crate::output::OutputContext;

/// SSH fleet helper
#[derive(Parser)]
#[command(
    name = "wssh",
    version,
    propagate_version = true,
    args_conflicts_with_subcommands = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output [env: NO_COLOR=]
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Host alias to connect to
    pub host: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve nodes on a jumpbox and stream their captures into one viewer
    Capture(commands::capture::CaptureArgs),

    /// List hosts, filtered by search terms (AND logic)
    List(commands::list::ListArgs),

    /// Stream and execute a local script on a remote host
    Run(commands::run::RunArgs),

    /// Push a configured payload to a host and extract it
    Push(commands::push::PushArgs),

    /// View recently connected hosts
    History,

    /// Check key expiration and prime SSH agents
    Auth,

    /// Interactively add a new host to the config and ~/.ssh/config
    Add,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if config loading or the command fails.
    pub async fn run(self) -> Result<()> {
        // Read NO_COLOR directly: binding it to the clap arg via `env` makes
        // the env var count as a present argument, defeating
        // `arg_required_else_help`.
        let no_color =
            self.no_color || std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        let ctx = OutputContext::new(no_color, self.quiet);

        let config_path = Config::path()?;
        if !config_path.exists() {
            Config::write_default(&config_path)?;
            ctx.info(&format!(
                "created a default configuration file at {}",
                config_path.display()
            ));
            return Ok(());
        }
        let mut cfg = Config::load(&config_path)?;

        match self.command {
            Some(Command::Capture(args)) => commands::capture::run(&ctx, &cfg, &args).await,
            Some(Command::List(args)) => {
                commands::list::run(&ctx, &cfg, &args);
                Ok(())
            }
            Some(Command::Run(args)) => commands::run::run(&ctx, &cfg, &args).await,
            Some(Command::Push(args)) => commands::push::run(&ctx, &cfg, &args).await,
            Some(Command::History) => commands::history::run(&ctx),
            Some(Command::Auth) => commands::auth::run(&ctx, &cfg).await,
            Some(Command::Add) => commands::add::run(&ctx, &mut cfg, &config_path),
            None => match self.host {
                Some(host) => commands::connect::run(&ctx, &cfg, &host).await,
                None => anyhow::bail!("no host or command given; see `wssh --help`"),
            },
        }
    }
}
