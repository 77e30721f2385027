//! `rbac-sync preview`

use colored::Colorize;
use rbac_core::{ChangeOperation, SyncPlan};
use rbac_model::{Scope, SyncDirection};
use serde_json::json;

use crate::context::Context;
use crate::error::Result;

pub async fn run_preview(
    ctx: &Context,
    scope: &Scope,
    direction: Option<SyncDirection>,
    json: bool,
) -> Result<()> {
    let engine = ctx.engine()?;
    let direction = engine.resolve_direction(direction)?;
    let plan = engine.get_sync_preview(scope, direction).await?;

    if json {
        let out = json!({
            "fingerprint": plan.fingerprint(),
            "plan": plan,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    print_plan(&plan);
    if plan.has_changes() {
        println!();
        println!(
            "Apply exactly this plan with {}",
            format!(
                "rbac-sync apply {} -d {} --expect-fingerprint {}",
                plan.scope,
                plan.direction,
                plan.fingerprint()
            )
            .cyan()
        );
    }
    Ok(())
}

pub(crate) fn print_plan(plan: &SyncPlan) {
    println!(
        "{} {} {} ({})",
        "=>".blue().bold(),
        plan.scope.to_string().cyan(),
        plan.direction,
        plan.strategy
    );

    if !plan.has_changes() {
        println!("{} No changes needed.", "OK".green().bold());
    }
    for op in &plan.operations {
        let marker = match op {
            ChangeOperation::Add { .. } => "+".green(),
            ChangeOperation::Remove { .. } => "-".red(),
            ChangeOperation::Update { .. } => "~".yellow(),
        };
        println!("   {} {}", marker, op);
    }
    for warning in &plan.warnings {
        println!("   {} {}", "warning:".yellow().bold(), warning);
    }
}
