//! pagerelay - monitoring event forwarding agent
//!
//! Captures monitoring pager events from the environment (`--queue`) and
//! drains the persistent queue to the remote incident API (`--send`). Both
//! actions run inside the queue's cross-process exclusive region, so the
//! scheduler may invoke them concurrently against the same queue path.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser;
use tracing::{debug, error, info};

use pagerelay_agent::config::Config;
use pagerelay_agent::delivery::IncidentClient;
use pagerelay_agent::drain::{self, DrainStatus};
use pagerelay_agent::enqueue::{self, EnqueueStatus};
use pagerelay_agent::logging;
use pagerelay_agent::queue::{with_exclusive, QueueLockGuard, QueueStore};

#[derive(Parser, Debug)]
#[command(name = "pagerelay")]
#[command(about = "Durable forwarding agent for monitoring pager events")]
#[command(version)]
struct Args {
    /// Capture an event from the environment and append it to the queue
    #[arg(long = "queue")]
    queue: bool,

    /// Send queued events to the incident API
    #[arg(long = "send")]
    send: bool,

    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE")]
    config_file: Option<PathBuf>,

    /// Log level override
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error"])]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match Config::load(args.config_file.as_deref()).context("loading configuration")
    {
        Ok(config) => config,
        Err(e) => {
            eprintln!("pagerelay: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    logging::init(&config);

    let store = QueueStore::new(config.queue_file.clone());
    let mut ok = true;

    if args.queue {
        ok &= run_enqueue(&config, &store);
    }
    if args.send {
        ok &= run_drain(&config, &store).await;
    }

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run_enqueue(config: &Config, store: &QueueStore) -> bool {
    match with_exclusive(&config.queue_file, || enqueue::enqueue_from_env(store)) {
        Ok(Ok(EnqueueStatus::Queued)) => true,
        Ok(Ok(EnqueueStatus::NoEvent)) => {
            debug!("no monitoring variables in environment");
            true
        }
        // Already logged at error level by the extractor.
        Ok(Ok(EnqueueStatus::Discarded)) => false,
        Ok(Err(e)) => {
            error!("queueing event failed: {e}");
            false
        }
        Err(e) => {
            error!("could not enter queue exclusive region: {e}");
            false
        }
    }
}

async fn run_drain(config: &Config, store: &QueueStore) -> bool {
    let client = match IncidentClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            error!("building incident API client failed: {e}");
            return false;
        }
    };
    debug!("posting queued events to {}", client.endpoint());

    let guard = match QueueLockGuard::acquire(&config.queue_file) {
        Ok(guard) => guard,
        Err(e) => {
            error!("could not enter queue exclusive region: {e}");
            return false;
        }
    };
    let result = drain::drain(store, &client).await;
    guard.release();

    match result {
        Ok(DrainStatus::Completed {
            delivered,
            rejected,
        }) => {
            info!(delivered, rejected, "queue drained");
            true
        }
        Ok(DrainStatus::Deferred { pending }) => {
            info!(pending, "drain deferred");
            false
        }
        Err(e) => {
            error!("drain failed: {e}");
            false
        }
    }
}
