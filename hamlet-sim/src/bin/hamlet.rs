//! Headless hamlet runner.
//!
//! Usage: `hamlet [config.toml]`
//!
//! Loads the configuration (defaults when no path is given), opens the
//! persistence backend, restores or spawns the villagers and runs until
//! Ctrl-C. Every world snapshot is written to stdout as one JSON line; logs
//! go to stderr.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use hamlet_core::memory::MemoryLimits;
use hamlet_core::persistence::open_store;
use hamlet_core::rng::sim_rng;
use hamlet_core::{HamletConfig, World};
use hamlet_sim::{LlmGenerator, Scheduler, SimEvent};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => HamletConfig::from_file(&path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => HamletConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let store = open_store(&config.persistence).context("opening persistence store")?;
    let generator = LlmGenerator::from_config(&config.llm).context("configuring LLM")?;
    if !generator.is_available() {
        warn!("No LLM backend configured, conversations will use the fallback");
    }

    let world = World::generate(&config.world, &mut sim_rng(config.general.seed));
    let scheduler = Scheduler::new(&config, world, generator, Arc::from(store));
    let ids = scheduler
        .populate(MemoryLimits::from(&config.memory))
        .context("placing characters")?;
    info!(
        characters = ids.len(),
        backend = %config.persistence.backend,
        provider = %config.llm.provider,
        "hamlet starting"
    );

    let mut events = scheduler.subscribe();
    let printer = tokio::spawn(async move {
        let stdout = std::io::stdout();
        loop {
            match events.recv().await {
                Ok(SimEvent::WorldUpdate(snapshot)) => match serde_json::to_string(&snapshot) {
                    Ok(line) => {
                        let mut out = stdout.lock();
                        if writeln!(out, "{line}").is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to encode snapshot"),
                },
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Snapshot printer lagging"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    scheduler
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
            }
        })
        .await;

    printer.abort();
    info!("hamlet stopped");
    Ok(())
}
