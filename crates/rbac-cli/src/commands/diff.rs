//! `rbac-sync diff`

use colored::Colorize;
use rbac_core::PermissionDiff;
use rbac_model::Scope;

use crate::context::Context;
use crate::error::Result;

pub async fn run_diff(ctx: &Context, scope: &Scope, json: bool) -> Result<()> {
    let engine = ctx.engine()?;
    let diff = engine.get_diff(scope).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&diff)?);
        return Ok(());
    }

    print_diff(&diff);
    Ok(())
}

pub(crate) fn print_diff(diff: &PermissionDiff) {
    println!(
        "{} {} (console: {} roles, pulsar: {} roles)",
        "=>".blue().bold(),
        diff.scope.to_string().cyan(),
        diff.total_console,
        diff.total_pulsar
    );

    if diff.is_in_sync() {
        println!("{} Console and Pulsar are in sync.", "OK".green().bold());
        return;
    }

    for (role, actions) in &diff.only_in_console {
        println!("   {} {} {} (console only)", "+".green(), role.bold(), actions);
    }
    for (role, actions) in &diff.only_in_pulsar {
        println!("   {} {} {} (pulsar only)", "-".red(), role.bold(), actions);
    }
    for (role, delta) in &diff.different {
        println!(
            "   {} {} console {} / pulsar {}",
            "~".yellow(),
            role.bold(),
            delta.console,
            delta.pulsar
        );
    }
    if !diff.same.is_empty() {
        println!("   {} {} roles identical", "=".dimmed(), diff.same.len());
    }
}
