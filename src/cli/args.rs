use crate::model::Batch;
use crate::restart::Operation;
use crate::storage::RetryPolicy;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use super::run::{Command, Request};

#[derive(Parser, Debug)]
#[command(name = "restart-workflow")]
#[command(about = "Repair batch event logs so the pipeline re-processes a batch", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a step as successfully completed
    Add {
        #[command(flatten)]
        target: TargetArgs,
        /// Event name to add
        event: String,
        #[command(flatten)]
        options: WriteOptions,
    },
    /// Remove every occurrence of an event
    Remove {
        #[command(flatten)]
        target: TargetArgs,
        /// Event name to remove
        event: String,
        #[command(flatten)]
        options: WriteOptions,
    },
    /// Cut the log from the first failure, or from the first occurrence of EVENT
    Restart {
        #[command(flatten)]
        target: TargetArgs,
        /// Restart from this event instead of the first failure
        event: Option<String>,
        #[command(flatten)]
        options: WriteOptions,
    },
    /// Replace the batch's priority marker (1 lowest, 9 highest)
    Prioritize {
        #[command(flatten)]
        target: TargetArgs,
        /// Priority level, 1-9
        level: u8,
        #[command(flatten)]
        options: WriteOptions,
    },
    /// Print the batch's event log
    Show {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        retry: RetryOverrides,
    },
    /// Configuration helpers
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a starter config file
    Init {
        /// Print to stdout instead of writing the file
        #[arg(long)]
        stdout: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Path to the config file
    pub config: PathBuf,
    /// Batch id
    pub batch_id: String,
    /// Round trip number
    pub round_trip: u32,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RetryOverrides {
    /// Override retry.max_attempts from the config
    #[arg(long)]
    pub max_attempts: Option<u32>,
    /// Override retry.delay from the config, e.g. 500ms or 2s
    #[arg(long, value_parser = humantime::parse_duration)]
    pub delay: Option<Duration>,
}

impl RetryOverrides {
    pub fn apply(&self, policy: RetryPolicy) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.unwrap_or(policy.max_attempts),
            delay: self.delay.unwrap_or(policy.delay),
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct WriteOptions {
    /// Show what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,
    #[command(flatten)]
    pub retry: RetryOverrides,
}

/// A parsed batch command, ready for the dispatcher.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub config: PathBuf,
    pub request: Request,
    pub retry: RetryOverrides,
}

impl Commands {
    /// Splits a batch command into its parts. `None` for `config` subcommands.
    pub fn into_invocation(self) -> Option<Invocation> {
        let (target, command, options) = match self {
            Commands::Add { target, event, options } => {
                (target, Command::Apply(Operation::Add { event }), options)
            }
            Commands::Remove { target, event, options } => {
                (target, Command::Apply(Operation::Remove { event }), options)
            }
            Commands::Restart { target, event, options } => {
                (target, Command::Apply(Operation::Restart { from: event }), options)
            }
            Commands::Prioritize { target, level, options } => {
                (target, Command::Apply(Operation::Prioritize { level }), options)
            }
            Commands::Show { target, retry } => (
                target,
                Command::Show,
                WriteOptions {
                    dry_run: false,
                    retry,
                },
            ),
            Commands::Config { .. } => return None,
        };

        Some(Invocation {
            config: target.config,
            request: Request {
                batch: Batch::new(target.batch_id, target.round_trip),
                command,
                dry_run: options.dry_run,
            },
            retry: options.retry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("restart-workflow").chain(args.iter().copied()))
    }

    fn invocation(args: &[&str]) -> Invocation {
        parse(args).unwrap().command.into_invocation().unwrap()
    }

    #[test]
    fn test_restart_without_event() {
        let inv = invocation(&["restart", "conf.yml", "400022028241", "1"]);
        assert_eq!(inv.config, PathBuf::from("conf.yml"));
        assert_eq!(inv.request.batch, Batch::new("400022028241", 1));
        assert_eq!(inv.request.command, Command::Apply(Operation::Restart { from: None }));
        assert!(!inv.request.dry_run);
    }

    #[test]
    fn test_restart_from_event_with_overrides() {
        let inv = invocation(&[
            "restart",
            "conf.yml",
            "400022028241",
            "3",
            "Metadata_Archived",
            "--dry-run",
            "--max-attempts",
            "4",
            "--delay",
            "250ms",
        ]);
        assert_eq!(
            inv.request.command,
            Command::Apply(Operation::Restart {
                from: Some("Metadata_Archived".to_string())
            })
        );
        assert!(inv.request.dry_run);
        let policy = inv.retry.apply(RetryPolicy::default());
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.delay, Duration::from_millis(250));
    }

    #[test]
    fn test_keywords_map_to_operations() {
        let add = invocation(&["add", "c.yml", "b", "1", "Manually_stopped"]);
        assert_eq!(
            add.request.command,
            Command::Apply(Operation::Add { event: "Manually_stopped".to_string() })
        );

        let remove = invocation(&["remove", "c.yml", "b", "1", "Prioritized"]);
        assert_eq!(
            remove.request.command,
            Command::Apply(Operation::Remove { event: "Prioritized".to_string() })
        );

        let prioritize = invocation(&["prioritize", "c.yml", "b", "1", "7"]);
        assert_eq!(prioritize.request.command, Command::Apply(Operation::Prioritize { level: 7 }));

        let show = invocation(&["show", "c.yml", "b", "1"]);
        assert_eq!(show.request.command, Command::Show);
    }

    #[test]
    fn test_out_of_range_priority_reaches_coordinator() {
        // range checking is the coordinator's job, so 0 and 10 parse fine here
        let inv = invocation(&["prioritize", "c.yml", "b", "1", "10"]);
        assert_eq!(inv.request.command, Command::Apply(Operation::Prioritize { level: 10 }));
    }

    #[test]
    fn test_argument_errors() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["frobnicate", "c.yml", "b", "1"]).is_err());
        assert!(parse(&["restart", "c.yml", "b", "one"]).is_err());
        assert!(parse(&["restart", "c.yml", "b", "-1"]).is_err());
        assert!(parse(&["add", "c.yml", "b", "1"]).is_err());
        assert!(parse(&["prioritize", "c.yml", "b", "1", "high"]).is_err());
        assert!(parse(&["restart", "c.yml", "b", "1", "e1", "extra"]).is_err());
    }

    #[test]
    fn test_help_is_not_an_argument_error() {
        let err = parse(&["--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_config_init_has_no_invocation() {
        let cli = parse(&["config", "init", "--stdout"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config { action: ConfigAction::Init { stdout: true } }
        ));
        assert!(cli.command.into_invocation().is_none());
    }
}
