//! Operator CLI for the order and transaction trackers.
//!
//! Replays recorded event streams (one JSON `Action` per line) into a
//! persisted store and prints what the trackers hold afterwards.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracker_core::{
    Action, AppState, ChainId, OrderAction, OrderBucket, Outcome, Store, TransactionAction,
};
use tracing::{info, warn};

use crate::config::CliConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults to ./tracker.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured state file
    #[arg(short, long)]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a JSON-lines file of events in order
    Replay {
        events: PathBuf,
    },
    /// Print a summary of the tracked state
    Show {
        #[arg(long)]
        chain: Option<u64>,
    },
    /// Drop all orders and transactions of a chain
    Clear {
        #[arg(long)]
        chain: u64,
    },
}

#[derive(Debug, Default, Serialize)]
struct ReplayTally {
    applied: usize,
    ignored: usize,
    rejected: usize,
}

impl ReplayTally {
    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Applied => self.applied += 1,
            Outcome::Ignored => self.ignored += 1,
            Outcome::Rejected(_) => self.rejected += 1,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChainSummary {
    chain_id: ChainId,
    name: Option<&'static str>,
    last_checked_block: u64,
    pending: usize,
    presignature_pending: usize,
    fulfilled: usize,
    expired: usize,
    cancelled: usize,
    transactions: usize,
    pending_transactions: usize,
}

fn summarize(state: &AppState, chain_id: ChainId) -> ChainSummary {
    let count = |bucket| state.orders.bucket(chain_id, bucket).map_or(0, |orders| orders.len());
    ChainSummary {
        chain_id,
        name: chain_id.supported().map(|chain| chain.name()),
        last_checked_block: state.orders.last_checked_block(chain_id),
        pending: count(OrderBucket::Pending),
        presignature_pending: count(OrderBucket::PresignaturePending),
        fulfilled: count(OrderBucket::Fulfilled),
        expired: count(OrderBucket::Expired),
        cancelled: count(OrderBucket::Cancelled),
        transactions: state
            .transactions
            .for_chain(chain_id)
            .map_or(0, |txs| txs.len()),
        pending_transactions: state.transactions.pending(chain_id).len(),
    }
}

async fn replay(store: &Store, events: &Path) -> Result<ReplayTally> {
    let file = tokio::fs::File::open(events)
        .await
        .with_context(|| format!("failed to open {}", events.display()))?;
    let mut lines = BufReader::new(file).lines();
    let mut tally = ReplayTally::default();
    let mut line_number = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        let action: Action = serde_json::from_str(&line)
            .with_context(|| format!("invalid event on line {}", line_number))?;
        let outcome = store.dispatch(action).await?;
        if let Outcome::Rejected(diagnostic) = &outcome {
            warn!("Line {}: {}", line_number, diagnostic);
        }
        tally.record(&outcome);
    }

    Ok(tally)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let mut config = CliConfig::load(args.config.as_deref())?;
    if let Some(state) = args.state {
        config.store.state_path = Some(state);
    }

    use tracing_subscriber::{fmt, EnvFilter};
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));
    fmt().with_env_filter(env_filter).with_target(true).init();

    let store = Store::from_config(&config.store)
        .await
        .context("failed to open store")?;

    match args.command {
        Command::Replay { events } => {
            let tally = replay(&store, &events).await?;
            store.persist().await?;
            info!(
                "Replayed {} events ({} applied, {} ignored, {} rejected)",
                tally.applied + tally.ignored + tally.rejected,
                tally.applied,
                tally.ignored,
                tally.rejected
            );
            println!("{}", serde_json::to_string_pretty(&tally)?);
        }
        Command::Show { chain } => {
            let state = store.snapshot().await;
            let mut chains: Vec<ChainId> = match chain {
                Some(chain) => vec![ChainId(chain)],
                None => state
                    .orders
                    .chain_ids()
                    .chain(state.transactions.chain_ids())
                    .collect(),
            };
            chains.sort();
            chains.dedup();
            let summaries: Vec<_> = chains
                .into_iter()
                .map(|chain_id| summarize(&state, chain_id))
                .collect();
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        Command::Clear { chain } => {
            let chain_id = ChainId(chain);
            store
                .dispatch_all([
                    Action::from(OrderAction::Clear { chain_id }),
                    Action::from(TransactionAction::ClearAll { chain_id }),
                ])
                .await?;
            store.persist().await?;
            info!("Cleared chain {}", chain_id);
        }
    }

    Ok(())
}
