mod batch;
mod output;

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use station_driver::{
    classify, run_batch, JsonlRecorder, NoopRecorder, TransactionRecorder, VendOptions,
    WatchdogConfig,
};
use vendo_core::{BinRequest, GroupKey, VendMode};

#[derive(Parser)]
#[command(
    name = "vendo",
    about = "Drive vending and stocking stations through a batch of bin requests",
    version,
    propagate_version = true
)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Vend or stock a batch of bins against their stations
    Run {
        /// Batch file: a YAML list of bin requests
        #[arg(long, env = "VENDO_BATCH")]
        batch: PathBuf,

        /// Vend mode: issue, return, stocking, physical, open_door
        #[arg(long, default_value = "issue")]
        mode: String,

        /// Group bins by station "name" or "id"
        #[arg(long, default_value = "name")]
        group_by: String,

        /// Watchdog interval override, in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Kicks before a silent station gives up
        #[arg(long)]
        max_kicks: Option<u32>,

        /// Directory for transaction/failure records (omit to record nothing)
        #[arg(long)]
        records: Option<PathBuf>,
    },

    /// Show which transport class a connection descriptor selects
    Resolve { address: String },

    /// Print a sample batch file
    Template,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Run {
            batch,
            mode,
            group_by,
            timeout_secs,
            max_kicks,
            records,
        } => cmd_run(
            &batch,
            &mode,
            &group_by,
            timeout_secs,
            max_kicks,
            records,
            cli.json,
        ),
        Commands::Resolve { address } => cmd_resolve(&address, cli.json),
        Commands::Template => {
            print!("{}", batch::TEMPLATE);
            Ok(())
        }
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn cmd_run(
    batch_path: &std::path::Path,
    mode: &str,
    group_by: &str,
    timeout_secs: Option<u64>,
    max_kicks: Option<u32>,
    records: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let mode = VendMode::from_str(mode)?;
    let group_by = GroupKey::from_str(group_by)?;
    let mut bins = batch::load(batch_path)?;

    let watchdog = if timeout_secs.is_some() || max_kicks.is_some() {
        let mut cfg = WatchdogConfig::default();
        if let Some(secs) = timeout_secs {
            cfg.interval = std::time::Duration::from_secs(secs);
        }
        if let Some(kicks) = max_kicks {
            cfg.max_kicks = kicks;
        }
        Some(cfg)
    } else {
        None
    };
    let recorder: Arc<dyn TransactionRecorder> = match records {
        Some(dir) => Arc::new(JsonlRecorder::new(dir)),
        None => Arc::new(NoopRecorder),
    };
    let options = VendOptions {
        group_by,
        watchdog,
        recorder,
    };

    let runtime = tokio::runtime::Runtime::new().context("could not start async runtime")?;
    let summary = runtime.block_on(run_batch(&mut bins, mode, &options))?;

    if json {
        output::print_json(&serde_json::json!({
            "summary": summary,
            "bins": bins,
        }))?;
    } else {
        print_bin_table(&bins);
        println!(
            "\n{} group(s): {} succeeded, {} failed",
            summary.groups, summary.succeeded, summary.failed
        );
    }
    Ok(())
}

fn print_bin_table(bins: &[BinRequest]) {
    let rows = bins
        .iter()
        .map(|b| {
            vec![
                b.id.to_string(),
                b.station_name.clone(),
                b.physical_code.clone(),
                b.quantity.to_string(),
                b.state.to_string(),
            ]
        })
        .collect();
    output::print_table(&["ID", "STATION", "PHYSICAL", "QTY", "STATE"], rows);
}

fn cmd_resolve(address: &str, json: bool) -> anyhow::Result<()> {
    let kind = classify(address)?;
    if json {
        output::print_json(&serde_json::json!({
            "address": address,
            "transport": kind.to_string(),
        }))?;
    } else {
        println!("{address} -> {kind}");
    }
    Ok(())
}
