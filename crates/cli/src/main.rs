// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! magent - admin client for magentd, the Machine Agent daemon

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod color;
mod commands;
mod exit_error;
mod output;

use anyhow::Result;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "magent", version, about = "Admin client for the Machine Agent daemon")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Health check / version handshake
    Ping,
    /// Cross-project status overview
    Status,
    /// List runtime sessions tracked by the Runtime Registry
    Runtimes {
        /// Restrict to a single project
        #[arg(long)]
        project: Option<String>,
    },
    /// List active document bridges for a project
    Bridges {
        /// Project name
        project: String,
    },
    /// Ask the daemon to shut down gracefully
    Stop,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let code = e.downcast_ref::<exit_error::ExitError>().map_or(1, |c| c.code);
        eprintln!("magent: {e}");
        std::process::exit(code);
    }
}

fn cli_command() -> clap::Command {
    Cli::command().styles(color::styles())
}

async fn run() -> Result<()> {
    let matches = cli_command().get_matches();
    let cli = Cli::from_arg_matches(&matches)?;
    let format = cli.output;

    match cli.command {
        Commands::Ping => commands::ping::ping(format).await,
        Commands::Status => commands::status::status(format).await,
        Commands::Runtimes { project } => commands::runtimes::runtimes(project, format).await,
        Commands::Bridges { project } => commands::bridges::bridges(project, format).await,
        Commands::Stop => commands::stop::stop().await,
    }
}
