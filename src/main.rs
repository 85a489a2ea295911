use chrono::Utc;
use clap::Parser;
use firewx_service::config;
use firewx_service::ingest::{Fetcher, HttpFetcher};
use firewx_service::logging;
use firewx_service::pipeline;
use firewx_service::replay::{RecordingFetcher, ReplayFetcher};
use firewx_service::report::{self, HistoryRow, OutputRecord};
use firewx_service::verify;
use std::error::Error;
use std::path::PathBuf;

/// Judge the dryness / wind alert level from JMA tables and warnings.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Configuration file (default: $FIREWX_CONFIG, ./monitor.toml, built-in)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serve documents from a snapshot directory instead of the network
    #[arg(long, conflicts_with = "record")]
    replay: Option<PathBuf>,

    /// Save every fetched document into this directory
    #[arg(long)]
    record: Option<PathBuf>,

    /// Check the configured sources and print a report instead of judging
    #[arg(long)]
    verify: bool,

    /// Print the record instead of writing output files
    #[arg(long)]
    dry_run: bool,

    /// Append log records to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_file.as_deref())?;

    let config = config::resolve_config(cli.config.as_deref())?;

    let fetcher: Box<dyn Fetcher> = match (&cli.replay, &cli.record) {
        (Some(dir), _) => Box::new(ReplayFetcher::from_dir(dir)),
        (None, Some(dir)) => {
            let recorder = RecordingFetcher::new(HttpFetcher::new()?, dir)?;
            tracing::info!(dir = %recorder.directory().display(), "recording fetched documents");
            Box::new(recorder)
        }
        (None, None) => Box::new(HttpFetcher::new()?),
    };

    let now = pipeline::station_now(Utc::now(), &config.station);
    let today = now.date_naive();

    if cli.verify {
        let report = verify::verify_sources(&fetcher, &config, today);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let result = pipeline::run(&fetcher, &config, today);
    println!("{}", result.level);

    let record = OutputRecord::from_judgment(&result, now);
    if cli.dry_run {
        println!("{}", record.to_json()?);
        return Ok(());
    }

    report::write_record(&record, &config.output.data_file)?;
    report::append_history(&HistoryRow::from_record(&record, now), &config.output.history_file)?;
    report::export_history_json(&config.output.history_file, &config.output.history_json)?;
    Ok(())
}
