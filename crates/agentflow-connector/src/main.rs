//! `agentflow` - terminal front end for the multi-agent workflow backend.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use agentflow_connector::console::{self, ConsoleInput};
use agentflow_connector::replay::replay_lines;
use agentflow_connector::{spawn_session, Command, ConnectorConfig, DataSource};
use agentflow_state::Topology;

#[derive(Parser, Debug)]
#[command(name = "agentflow", version, about = "Live view of a multi-agent workflow backend")]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Connect and run the interactive console.
    Run {
        /// Backend WebSocket endpoint.
        #[arg(long)]
        endpoint: Option<String>,

        /// Use the scripted backend instead of a live connection.
        #[arg(long)]
        simulate: bool,
    },
    /// Reduce a JSON-lines event capture and print the final snapshot.
    Replay { file: PathBuf },
}

fn init_logging(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ConnectorConfig::load(cli.config.as_deref()).context("failed to load config")?;
    config.apply_env();
    init_logging(&config.log_filter);

    match cli.command {
        Mode::Run { endpoint, simulate } => {
            if let Some(endpoint) = endpoint {
                config.endpoint = endpoint;
            }
            if simulate {
                config.source = DataSource::Simulated;
            }
            run(config).await
        }
        Mode::Replay { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let report = replay_lines(Topology::construction_agency(), &text);
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

async fn run(config: ConnectorConfig) -> anyhow::Result<()> {
    let handle = spawn_session(&config)?;
    if config.source == DataSource::Live {
        handle.send(Command::Connect)?;
    }

    let mut snapshots = handle.subscribe();
    let mut shown = snapshots.borrow_and_update().clone();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    for line in console::HELP {
        println!("{line}");
    }

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let next = snapshots.borrow_and_update().clone();
                for line in console::describe_changes(&shown, &next) {
                    println!("{line}");
                }
                shown = next;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match console::parse_line(&line) {
                    ConsoleInput::Command(command) => handle.send(command)?,
                    ConsoleInput::Status => {
                        for line in console::describe_status(&handle.snapshot()) {
                            println!("{line}");
                        }
                    }
                    ConsoleInput::Help => {
                        for line in console::HELP {
                            println!("{line}");
                        }
                    }
                    ConsoleInput::Unknown(command) => {
                        println!("Unknown command: {command} (try /help)");
                    }
                    ConsoleInput::Quit => break,
                    ConsoleInput::Empty => {}
                }
            }
        }
    }

    handle.shutdown().await
}
