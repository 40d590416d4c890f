//! Copy-on-write simulation of node-tree changes.
//!
//! At most one fork exists at a time. While it exists, every node read and
//! write made on behalf of the turn goes to the fork; the live store is only
//! touched by [`SimulationManager::commit`]. All operations are synchronous.

use std::fmt;

use tracing::info;

use arbor_core::store::NodeStore;

/// Result of a simulation operation, reported to the model verbatim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimulationOutcome {
    /// A fork was created.
    Started,
    /// `start` while a fork already exists; nothing changed.
    AlreadyActive,
    /// The fork replaced the live store.
    Committed,
    /// The fork was discarded.
    Aborted,
    /// `commit`/`abort` without a fork; nothing changed.
    NotActive,
}

impl fmt::Display for SimulationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Started => "Simulation started: node changes now apply to a sandbox copy",
            Self::AlreadyActive => "Simulation already active",
            Self::Committed => "Simulation committed: sandbox changes applied to the live tree",
            Self::Aborted => "Simulation aborted: sandbox changes discarded",
            Self::NotActive => "No simulation is active",
        })
    }
}

/// Holds the fork, if any.
#[derive(Clone, Debug, Default)]
pub struct SimulationManager {
    fork: Option<NodeStore>,
}

impl SimulationManager {
    /// Manager with no fork.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a fork exists.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.fork.is_some()
    }

    /// The fork, if any.
    #[must_use]
    pub fn fork(&self) -> Option<&NodeStore> {
        self.fork.as_ref()
    }

    /// Mutable fork, if any.
    pub fn fork_mut(&mut self) -> Option<&mut NodeStore> {
        self.fork.as_mut()
    }

    /// Deep-copy `live` into a new fork.
    pub fn start(&mut self, live: &NodeStore) -> SimulationOutcome {
        if self.fork.is_some() {
            return SimulationOutcome::AlreadyActive;
        }
        self.fork = Some(live.clone());
        info!(nodes = live.len(), "simulation started");
        SimulationOutcome::Started
    }

    /// Replace `live` with the fork and clear it.
    pub fn commit(&mut self, live: &mut NodeStore) -> SimulationOutcome {
        let Some(fork) = self.fork.take() else {
            return SimulationOutcome::NotActive;
        };
        info!(before = live.len(), after = fork.len(), "simulation committed");
        *live = fork;
        SimulationOutcome::Committed
    }

    /// Discard the fork.
    pub fn abort(&mut self) -> SimulationOutcome {
        if self.fork.take().is_none() {
            return SimulationOutcome::NotActive;
        }
        info!("simulation aborted");
        SimulationOutcome::Aborted
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
