use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

use querystream_cli::{build_state, commands, config::Config, init_tracing};

#[derive(Parser)]
#[command(name = "querystream")]
#[command(about = "Record streamed query responses and rebuild stored messages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an NDJSON capture of provider events into the store
    Record {
        /// Message id to record under (UUID v7 when omitted)
        #[arg(long)]
        message_id: Option<String>,
        /// File with one provider event per line
        events: PathBuf,
    },
    /// Print a reconstructed message
    Show { message_id: String },
    /// Print fragment metadata of a message
    Summary { message_id: String },
    /// Reconstruct every stored message
    History,
    /// List stored message ids
    List,
    /// Delete every fragment of a message
    Purge { message_id: String },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(config.log_format);
    let state = build_state(&config).await?;

    match cli.command {
        Commands::Record { message_id, events } => {
            let message_id = message_id.unwrap_or_else(|| uuid::Uuid::now_v7().to_string());
            let events = commands::read_events(&events)?;
            let report = commands::record(&state, &message_id, events).await?;
            if report.is_degraded() {
                tracing::warn!("Message {} is degraded", message_id);
            }
            print_json(&report)?;
        }
        Commands::Show { message_id } => print_json(&commands::show(&state, &message_id)?)?,
        Commands::Summary { message_id } => {
            print_json(&commands::summary(&state, &message_id)?)?
        }
        Commands::History => print_json(&commands::history(&state)?)?,
        Commands::List => {
            for message_id in commands::list(&state)? {
                println!("{}", message_id);
            }
        }
        Commands::Purge { message_id } => {
            let deleted = commands::purge(&state, &message_id).await?;
            println!("Deleted {} fragment(s) of message {}", deleted, message_id);
        }
    }

    Ok(())
}
