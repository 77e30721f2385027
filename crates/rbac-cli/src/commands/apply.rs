//! `rbac-sync apply`

use colored::Colorize;
use dialoguer::Confirm;
use rbac_core::{SyncOptions, SyncResult};
use rbac_model::{Scope, SyncDirection};

use super::preview::print_plan;
use crate::context::Context;
use crate::error::{CliError, Result};

/// Arguments of the apply command
#[derive(Debug, Clone)]
pub struct ApplyArgs {
    pub scope: Scope,
    pub direction: Option<SyncDirection>,
    pub dry_run: bool,
    pub yes: bool,
    pub expect_fingerprint: Option<String>,
    pub json: bool,
}

impl ApplyArgs {
    /// `--json` output must stay machine-readable, so it cannot share stdout
    /// with the interactive confirmation.
    pub fn validate(&self) -> Result<()> {
        if self.json && !self.yes && !self.dry_run {
            return Err(CliError::user(
                "--json requires --yes or --dry-run; preview the plan with `rbac-sync preview --json` first",
            ));
        }
        Ok(())
    }
}

/// Run the apply command
///
/// Without `--yes` the current plan is shown and confirmed first; the
/// confirmed plan's fingerprint then guards the write.
pub async fn run_apply(ctx: &Context, args: ApplyArgs) -> Result<()> {
    args.validate()?;
    let engine = ctx.engine()?;
    let direction = engine.resolve_direction(args.direction)?;
    let mut expected = args.expect_fingerprint.clone();

    if !args.dry_run && !args.yes {
        let plan = engine.get_sync_preview(&args.scope, direction).await?;
        print_plan(&plan);
        if !plan.has_changes() {
            return Ok(());
        }
        println!();

        let proceed = Confirm::new()
            .with_prompt(format!(
                "Apply {} changes to {}?",
                plan.len(),
                direction.destination()
            ))
            .default(false)
            .interact()?;
        if !proceed {
            return Err(CliError::user("Sync cancelled by user."));
        }
        expected.get_or_insert_with(|| plan.fingerprint());
    }

    let options = SyncOptions {
        dry_run: args.dry_run,
        expected_fingerprint: expected,
    };
    let result = engine.apply_sync(&args.scope, direction, options).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    if result.success() {
        Ok(())
    } else {
        Err(CliError::user(format!(
            "{} of {} changes failed",
            result.changes_failed(),
            result.changes_applied() + result.changes_failed()
        )))
    }
}

fn print_result(result: &SyncResult) {
    let header = if result.is_dry_run() {
        "DRY RUN".cyan().bold()
    } else if result.success() {
        "SYNCED".green().bold()
    } else {
        "PARTIAL".red().bold()
    };
    println!(
        "{} {} {}",
        header,
        result.scope().to_string().cyan(),
        result.direction()
    );

    for line in result.details() {
        println!("   {} {}", "-".dimmed(), line);
    }
    for error in result.errors() {
        println!("   {} {}", "!".red(), error);
    }

    if !result.is_dry_run() {
        println!(
            "{} applied, {} failed",
            result.changes_applied().to_string().green(),
            result.changes_failed().to_string().red()
        );
    }
}
