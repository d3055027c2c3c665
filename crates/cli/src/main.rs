//! CLI for the Cosign multi-owner wallet engine.
//!
//! Pipeline: load wallet file -> build wallet + EVM -> replay script -> report.

mod script;

use alloy_primitives::Address;
use clap::{Parser, Subcommand};
use cosign_runtime::sink::json_stream::JsonStreamSink;
use cosign_runtime::sink::TransactionRow;
use cosign_runtime::Report;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "cosign", version, about = "Multi-owner quorum wallet engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check an owner list and threshold without creating a wallet.
    Validate {
        /// Owner address; repeat for each owner, in order.
        #[arg(short, long = "owner", required = true)]
        owners: Vec<Address>,

        #[arg(short, long, env = "COSIGN_THRESHOLD")]
        threshold: u32,
    },

    /// Replay an operation script against a fresh wallet in a local EVM.
    Run {
        /// Wallet file: owners, threshold, account, balance, contracts.
        #[arg(short, long, env = "COSIGN_CONFIG")]
        config: PathBuf,

        /// JSON array of steps (`submit`, `confirm`, `revoke`, `execute`, `fund`).
        #[arg(short, long)]
        script: PathBuf,

        #[arg(long, default_value_t = false)]
        json: bool,

        /// Sink output: "ndjson" writes NDJSON to stdout,
        /// "ndjson:/path/to/file" writes to file.
        #[arg(long)]
        sink: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { owners, threshold } => {
            match cosign_core::validate_config(&owners, threshold) {
                Ok(()) => println!("ok: {} of {} owners", threshold, owners.len()),
                Err(e) => {
                    tracing::warn!(error = %e, "invalid configuration");
                    return Err(e.into());
                }
            }
        }
        Commands::Run {
            config,
            script: script_path,
            json,
            sink,
        } => {
            let t0 = Instant::now();

            // 1. Load inputs.
            let file = script::load_wallet_file(&config)?;
            let steps = script::load_script(&script_path)?;
            tracing::info!(config = %config.display(), steps = steps.len(), "loaded");

            // 2. Build wallet and environment.
            let svc = script::build_service(&file)?;

            // 3. Replay.
            let stats = script::replay(&svc, &steps).await;
            tracing::info!(
                steps = stats.steps,
                failed = stats.failed,
                elapsed_ms = t0.elapsed().as_millis(),
                "replay complete"
            );

            // 4. Build report from a consistent snapshot.
            let (wallet, balance, receipts) = svc
                .inspect(|wallet, evm| {
                    (
                        wallet.clone(),
                        evm.balance(&evm.account()),
                        evm.receipts().to_vec(),
                    )
                })
                .await;
            let report = Report::build(&wallet, Some(balance));
            let rows = TransactionRow::from_wallet(&wallet);

            // 5. Sink output.
            if let Some(ref sink_spec) = sink {
                if sink_spec == "ndjson" {
                    let mut s = JsonStreamSink::stdout();
                    s.write_events(wallet.events())?;
                    s.write_transactions(&rows)?;
                    s.write_receipts(&receipts)?;
                    let n = s.finish()?;
                    tracing::info!(rows = n, "ndjson sink: wrote to stdout");
                } else if let Some(path) = sink_spec.strip_prefix("ndjson:") {
                    let file = std::fs::File::create(path)?;
                    let mut s = JsonStreamSink::new(file);
                    s.write_events(wallet.events())?;
                    s.write_transactions(&rows)?;
                    s.write_receipts(&receipts)?;
                    let n = s.finish()?;
                    tracing::info!(rows = n, path, "ndjson sink: wrote to file");
                } else {
                    eprintln!(
                        "Unknown sink: {}. Use 'ndjson' or 'ndjson:/path'",
                        sink_spec
                    );
                }

                // Still print report to stderr so it's visible.
                eprint!("{}", report.render());
            } else if json {
                let out = serde_json::json!({
                    "owners": wallet.owners(),
                    "required": wallet.required(),
                    "balance": balance,
                    "transactions": rows,
                    "events": wallet.events(),
                    "receipts": receipts,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                print!("{}", report.render());
            }
        }
    }

    Ok(())
}
