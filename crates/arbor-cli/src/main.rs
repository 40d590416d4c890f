//! # arbor
//!
//! Command-line harness: loads settings and a node tree, runs one turn
//! against the tree and prints the streamed answer.

#![deny(unsafe_code)]

mod printer;
mod process_runner;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use arbor_core::store::NodeStore;
use arbor_llm::DefaultProviderFactory;
use arbor_runtime::{Orchestrator, RunnerSet, Session, TurnInput};

use crate::printer::Printer;
use crate::process_runner::ProcessRunner;

/// Run one conversation turn against a node tree.
#[derive(Parser, Debug)]
#[command(name = "arbor", about = "Run one turn against an arbor node tree")]
struct Cli {
    /// Prompt text.
    prompt: String,

    /// Node tree JSON (`{"nodes": [...]}`).
    #[arg(long)]
    tree: PathBuf,

    /// Settings file (defaults to `~/.arbor/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Run Python tools with `python3 -c`.
    #[arg(long)]
    python: bool,

    /// Per-tool timeout in seconds.
    #[arg(long, default_value = "30")]
    tool_timeout: u64,

    /// Write the tree back after the turn.
    #[arg(long)]
    save: Option<PathBuf>,
}

fn read_tree(path: &Path) -> Result<NodeStore> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read node tree: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid node tree: {}", path.display()))
}

fn write_tree(path: &Path, store: &NodeStore) -> Result<()> {
    let json = serde_json::to_string_pretty(store).context("Failed to serialize node tree")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write node tree: {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings_path = args.settings.clone().unwrap_or_else(arbor_settings::settings_path);
    let settings = arbor_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("Failed to load settings: {}", settings_path.display()))?;
    arbor_core::logging::init_subscriber(&settings.logging.level);

    let store = read_tree(&args.tree)?;
    tracing::info!(nodes = store.len(), root = %store.root_id(), "node tree loaded");

    let process = Arc::new(ProcessRunner::new(Duration::from_secs(args.tool_timeout)));
    let mut runners = RunnerSet::new(process.clone());
    if args.python {
        runners = runners.with_python(process);
    }

    let factory = Arc::new(DefaultProviderFactory::new(settings.providers.clone()));
    let orchestrator = Orchestrator::new(factory, runners, &settings.agent);
    let mut session = Session::new(store);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let _ = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling turn");
            on_interrupt.cancel();
        }
    });

    let mut printer = Printer::stdio();
    let outcome = orchestrator
        .run_turn(&mut session, TurnInput::text(args.prompt), &mut printer, &cancel)
        .await;

    if session.simulation_active() {
        tracing::warn!("turn ended with an uncommitted simulation; staged changes are discarded");
    }
    if let Some(path) = &args.save {
        write_tree(path, session.live_store())?;
    }

    let summary = outcome.context("Turn failed")?;
    tracing::debug!(rounds = summary.rounds, tool_calls = summary.tool_calls, "done");
    Ok(())
}
