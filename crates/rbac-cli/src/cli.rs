//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use rbac_model::{Scope, SyncDirection};

/// rbac-sync - Reconcile console RBAC with broker namespace ACLs
#[derive(Parser, Debug)]
#[command(name = "rbac-sync")]
#[command(author, version, about = "Reconcile console RBAC with broker namespace ACLs", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, env = "RBAC_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Show how the two sides of a namespace differ
    Diff {
        /// Namespace as tenant/namespace
        scope: Scope,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Show the operations a sync would perform, without writing
    Preview {
        /// Namespace as tenant/namespace
        scope: Scope,

        /// console_to_pulsar or pulsar_to_console; defaults to the sync mode's direction
        #[arg(short, long, value_parser = parse_direction)]
        direction: Option<SyncDirection>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Synchronize one namespace
    ///
    /// Examples:
    ///   rbac-sync apply public/default --dry-run
    ///   rbac-sync apply public/default -d console_to_pulsar --yes
    ///   rbac-sync apply public/default --expect-fingerprint sha256:...
    Apply {
        /// Namespace as tenant/namespace
        scope: Scope,

        /// console_to_pulsar or pulsar_to_console; defaults to the sync mode's direction
        #[arg(short, long, value_parser = parse_direction)]
        direction: Option<SyncDirection>,

        /// Preview changes without applying them
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Refuse to apply unless the plan still has this fingerprint
        #[arg(long)]
        expect_fingerprint: Option<String>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

fn parse_direction(value: &str) -> Result<SyncDirection, String> {
    value.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_about_describes_the_tool() {
        let about = Cli::command().get_about().map(|a| a.to_string()).unwrap_or_default();
        assert!(about.contains("Reconcile console RBAC"));
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from([
            "rbac-sync",
            "apply",
            "public/default",
            "--direction",
            "pulsar_to_console",
            "--dry-run",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Apply {
                scope,
                direction,
                dry_run,
                yes,
                ..
            }) => {
                assert_eq!(scope.key(), "public/default");
                assert_eq!(direction, Some(SyncDirection::PulsarToConsole));
                assert!(dry_run);
                assert!(!yes);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_bad_scope() {
        assert!(Cli::try_parse_from(["rbac-sync", "diff", "no-slash"]).is_err());
    }

    #[test]
    fn test_rejects_bad_direction() {
        let parsed = Cli::try_parse_from(["rbac-sync", "preview", "public/default", "-d", "sideways"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["rbac-sync", "diff", "a/b", "--config", "/tmp/x.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/x.toml")));
    }
}
