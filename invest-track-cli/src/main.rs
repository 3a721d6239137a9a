//! Invest Track CLI - investments and forecasts in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{demo, entry, forecast, investment, logs, status};
use invest_track_core::{Error, LogEvent};

/// Invest Track - track investments and project their growth
#[derive(Parser)]
#[command(name = "invest", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show portfolio summary
    Status {
        /// Only investments that are still open
        #[arg(long)]
        active: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage investments
    Investment {
        #[command(subcommand)]
        command: investment::InvestmentCommands,
    },

    /// Manage investment entries
    Entry {
        #[command(subcommand)]
        command: entry::EntryCommands,
    },

    /// Manage and project forecasts
    Forecast {
        #[command(subcommand)]
        command: forecast::ForecastCommands,
    },

    /// Manage demo mode
    Demo {
        #[command(subcommand)]
        command: Option<demo::DemoCommands>,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    /// Command name as recorded in the event log
    fn name(&self) -> &'static str {
        match self {
            Commands::Status { .. } => "status",
            Commands::Investment { command } => command.name(),
            Commands::Entry { command } => command.name(),
            Commands::Forecast { command } => command.name(),
            Commands::Demo { .. } => "demo",
            Commands::Logs { .. } => "logs",
        }
    }
}

fn main() -> ExitCode {
    commands::init_tracing();
    let cli = Cli::parse();

    let command_name = cli.command.name();
    let logger = commands::get_logger();
    commands::log_event(&logger, LogEvent::new("command_executed").with_command(command_name));

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let kind = e.downcast_ref::<Error>().map(Error::kind).unwrap_or("error");
            commands::log_event(
                &logger,
                LogEvent::new("command_failed")
                    .with_command(command_name)
                    .with_error(kind),
            );
            output::error(&format!("Error: {:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Status { active, json } => status::run(active, json),
        Commands::Investment { command } => investment::run(command),
        Commands::Entry { command } => entry::run(command),
        Commands::Forecast { command } => forecast::run(command),
        Commands::Demo { command } => demo::run(command),
        Commands::Logs { command } => logs::run(command),
    }
}
