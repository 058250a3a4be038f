use crate::commands::Command;
use crate::logging::LogLevel;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "stale")]
#[command(about = "Inspect and maintain incremental build invalidation records")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Working directory holding invalidation records")]
    pub workdir: Option<PathBuf>,

    #[arg(long, global = true, help = "Override the global schema version")]
    pub schema_version: Option<String>,

    #[arg(
        long,
        global = true,
        help = "Invalidator scope, e.g. a task name (global if omitted)"
    )]
    pub scope: Option<String>,

    #[arg(
        short = 'l',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    #[arg(long, global = true, help = "Print results and logs as JSON")]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Check whether a fingerprint is still the valid one for an id")]
    Status { id: String, fingerprint: String },
    #[command(about = "Show the fingerprint recorded for an id")]
    Show { id: String },
    #[command(about = "Record a fingerprint as the valid one for an id")]
    Mark { id: String, fingerprint: String },
    #[command(about = "Forget the recorded fingerprint of an id, or of every id with --all")]
    Invalidate {
        #[arg(required_unless_present = "all")]
        id: Option<String>,
        #[arg(long, conflicts_with = "id", help = "Invalidate every record in scope")]
        all: bool,
    },
    #[command(about = "List every record in scope")]
    List,
    #[command(about = "Print the cache key generated for a target fingerprint")]
    Key {
        id: String,
        fingerprint: String,
        #[arg(long = "base-input", help = "Generator base input (repeatable)")]
        base_inputs: Vec<String>,
        #[arg(long, help = "Generate an uncacheable key")]
        uncacheable: bool,
    },
}

impl From<Commands> for Command {
    fn from(cmd: Commands) -> Self {
        match cmd {
            Commands::Status { id, fingerprint } => Self::Status { id, fingerprint },
            Commands::Show { id } => Self::Show { id },
            Commands::Mark { id, fingerprint } => Self::Mark { id, fingerprint },
            Commands::Invalidate { id, all } => match id {
                Some(id) if !all => Self::Invalidate { id },
                _ => Self::InvalidateAll,
            },
            Commands::List => Self::List,
            Commands::Key {
                id,
                fingerprint,
                base_inputs,
                uncacheable,
            } => Self::Key {
                id,
                fingerprint,
                base_inputs,
                uncacheable,
            },
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::try_parse_from(["stale", "list"]).unwrap();

        assert_eq!(cli.level, LogLevel::Warn);
        assert!(!cli.json);
        assert!(cli.scope.is_none());
        assert!(cli.workdir.is_none());
        assert!(matches!(cli.command, Commands::List));
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "stale",
            "show",
            "src/app:bin",
            "--scope",
            "compile",
            "--schema-version",
            "8",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.scope.as_deref(), Some("compile"));
        assert_eq!(cli.schema_version.as_deref(), Some("8"));
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Show { ref id } if id == "src/app:bin"));
    }

    #[test]
    fn test_invalidate_requires_id_or_all() {
        assert!(Cli::try_parse_from(["stale", "invalidate"]).is_err());
        assert!(Cli::try_parse_from(["stale", "invalidate", "app", "--all"]).is_err());

        let cli = Cli::try_parse_from(["stale", "invalidate", "--all"]).unwrap();
        assert!(matches!(Command::from(cli.command), Command::InvalidateAll));

        let cli = Cli::try_parse_from(["stale", "invalidate", "app"]).unwrap();
        assert!(matches!(Command::from(cli.command), Command::Invalidate { ref id } if id == "app"));
    }

    #[test]
    fn test_key_collects_base_inputs() {
        let cli = Cli::try_parse_from([
            "stale",
            "key",
            "T1",
            "h1",
            "--base-input",
            "v1",
            "--base-input",
            "opt",
        ])
        .unwrap();

        match Command::from(cli.command) {
            Command::Key {
                base_inputs,
                uncacheable,
                ..
            } => {
                assert_eq!(base_inputs, vec!["v1".to_string(), "opt".to_string()]);
                assert!(!uncacheable);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
