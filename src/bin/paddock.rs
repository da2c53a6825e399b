//! paddock: load a session from OpenF1 and summarise it.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use paddock::{Config, DatasetSlot, ScopeKey, SessionRecordSet};
use serde_json::json;

/// Paddock CLI
#[derive(Parser)]
#[command(name = "paddock")]
#[command(version)]
#[command(about = "Load and summarise OpenF1 session data")]
struct Args {
    /// Config file (default: ~/.paddock/config.toml, then /etc/paddock/config.toml)
    #[arg(short, long, env = "PADDOCK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load every dataset of a session
    Load {
        /// Session key (e.g. 9158)
        #[arg(long)]
        session: u32,
        /// Meeting key (e.g. 1219)
        #[arg(long)]
        meeting: u32,
        /// Drop cached entries for this session and meeting first
        #[arg(long)]
        refresh: bool,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: paddock=info; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("paddock=info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    let gateway = config.builder()?.build()?;

    match args.command {
        Command::Load {
            session,
            meeting,
            refresh,
            json,
        } => {
            if refresh {
                gateway.cache().invalidate_scope(ScopeKey::Session(session));
                gateway.cache().invalidate_scope(ScopeKey::Meeting(meeting));
            }
            let records = gateway.load(session, meeting).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary_json(&records))?);
            } else {
                print_summary(&records);
            }
        }
    }

    Ok(())
}

fn print_summary(records: &SessionRecordSet) {
    println!(
        "session {} (meeting {})",
        records.session_key(),
        records.meeting_key()
    );
    for (kind, slot) in records.datasets() {
        match slot {
            DatasetSlot::Loaded(dataset) => println!("  {kind:<16} {:>6} records", dataset.len()),
            DatasetSlot::Missing(failure) => println!("  {kind:<16} missing: {}", failure.error),
        }
    }

    let mut drivers: Vec<_> = records.driver_acronym().iter().collect();
    drivers.sort_by_key(|(number, _)| number.parse::<u32>().unwrap_or(u32::MAX));
    if !drivers.is_empty() {
        println!("drivers:");
        for (number, acronym) in drivers {
            let colour = records
                .driver_team_color()
                .get(number)
                .map(String::as_str)
                .unwrap_or("-");
            println!("  {number:>3} {acronym} #{colour}");
        }
    }
}

fn summary_json(records: &SessionRecordSet) -> serde_json::Value {
    let datasets: serde_json::Map<String, serde_json::Value> = records
        .datasets()
        .iter()
        .map(|(kind, slot)| {
            let value = match slot {
                DatasetSlot::Loaded(dataset) => json!({ "records": dataset.len() }),
                DatasetSlot::Missing(failure) => json!({ "error": failure.error }),
            };
            (kind.to_string(), value)
        })
        .collect();
    json!({
        "session_key": records.session_key(),
        "meeting_key": records.meeting_key(),
        "datasets": datasets,
        "driver_acronym": records.driver_acronym(),
        "driver_team_color": records.driver_team_color(),
    })
}
