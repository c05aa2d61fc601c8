use clap::error::ErrorKind;
use clap::Parser;
use restart_workflow::cli::{exit_code, Cli, Commands, ConfigAction};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries only the outcome
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "restart_workflow=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(exit_code::ARGUMENTS),
            };
        }
    };

    let invocation = match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Init { stdout } => {
                return match restart_workflow::cli::config::init(stdout) {
                    Ok(()) => ExitCode::SUCCESS,
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        ExitCode::from(exit_code::CONFIG)
                    }
                };
            }
        },
        command => match command.into_invocation() {
            Some(invocation) => invocation,
            None => return ExitCode::from(exit_code::ARGUMENTS),
        },
    };

    match restart_workflow::cli::run(&invocation.config, &invocation.request, &invocation.retry).await {
        Ok(outcome) => {
            println!("{}", outcome.to_string().trim_end());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
