//! Siobridge CLI
//!
//! Load runner for Socket.IO servers: drives blocking virtual users through
//! the reference scenario, or sends one-off events.

mod commands;
mod config;
mod display;

use std::io;
use std::time::Duration;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::EnvFilter;

use commands::run::RunOptions;
use config::CliConfig;

#[derive(Parser)]
#[command(name = "siobridge")]
#[command(version, about = "Blocking Socket.IO load runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Socket.IO server URL
    #[arg(
        long,
        global = true,
        env = "SIOBRIDGE_URL",
        default_value = "ws://localhost:4000"
    )]
    url: String,

    /// Connect timeout in milliseconds
    #[arg(long, global = true)]
    connect_timeout_ms: Option<u64>,

    /// Ack timeout in milliseconds
    #[arg(long, global = true)]
    ack_timeout_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reference scenario with concurrent virtual users
    Run {
        /// Number of virtual users
        #[arg(long, default_value = "1")]
        vus: u32,

        /// Iterations per virtual user
        #[arg(long, default_value = "1")]
        iterations: u32,

        /// Pause between loop emits in milliseconds
        #[arg(long, default_value = "50")]
        pause_ms: u64,
    },

    /// Emit one event
    Emit {
        /// Event name
        event: String,

        /// Payload (JSON, or taken as a string)
        data: Option<String>,
    },

    /// Emit one event and print its acknowledgement
    Ack {
        /// Event name
        event: String,

        /// Payload (JSON, or taken as a string)
        data: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("siobridge=info".parse()?))
        .with_writer(io::stderr)
        .init();

    let config = CliConfig {
        url: cli.url,
        connect_timeout_ms: cli.connect_timeout_ms,
        ack_timeout_ms: cli.ack_timeout_ms,
    };

    match cli.command {
        Commands::Run {
            vus,
            iterations,
            pause_ms,
        } => {
            let options = RunOptions {
                vus,
                iterations,
                pause: Duration::from_millis(pause_ms),
            };
            commands::run::run(&config, &options)?;
        }
        Commands::Emit { event, data } => {
            commands::emit::emit(&config, &event, data.as_deref())?;
        }
        Commands::Ack { event, data } => {
            commands::emit::ack(&config, &event, data.as_deref())?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "siobridge", &mut io::stdout());
        }
    }

    Ok(())
}
