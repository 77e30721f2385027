//! rbac-sync CLI
//!
//! Diff, preview and apply RBAC reconciliation between a console store and a
//! broker store described by a config file.

mod cli;
mod commands;
mod context;
mod error;

use std::io;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands};
use commands::ApplyArgs;
use context::Context;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing if verbose
    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .with_writer(io::stderr)
            .finish();
        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            tracing::debug!("Verbose mode enabled");
        }
    }

    let Some(command) = cli.command else {
        println!("{} RBAC reconciler", "rbac-sync".green().bold());
        println!();
        println!("Run {} for available commands.", "rbac-sync --help".cyan());
        return Ok(());
    };

    if let Commands::Completions { shell } = command {
        clap_complete::generate(shell, &mut Cli::command(), "rbac-sync", &mut io::stdout());
        return Ok(());
    }

    let ctx = Context::load(cli.config.as_deref())?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(execute_command(&ctx, command))
}

async fn execute_command(ctx: &Context, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Diff { scope, json } => commands::run_diff(ctx, &scope, json).await,
        Commands::Preview {
            scope,
            direction,
            json,
        } => commands::run_preview(ctx, &scope, direction, json).await,
        Commands::Apply {
            scope,
            direction,
            dry_run,
            yes,
            expect_fingerprint,
            json,
        } => {
            let args = ApplyArgs {
                scope,
                direction,
                dry_run,
                yes,
                expect_fingerprint,
                json,
            };
            commands::run_apply(ctx, args).await
        }
        Commands::Completions { .. } => Ok(()),
    }
}
