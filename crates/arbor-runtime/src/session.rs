//! Per-conversation state: the live tree, the simulation fork, the active
//! set and the message history.

use arbor_core::messages::ChatMessage;
use arbor_core::store::NodeStore;

use crate::active_set::ActiveSet;
use crate::admin::SimulationAction;
use crate::simulation::{SimulationManager, SimulationOutcome};

/// One conversation.
///
/// A turn borrows the session mutably for its whole duration, so two turns
/// can never run against the same session at once.
#[derive(Clone, Debug)]
pub struct Session {
    live: NodeStore,
    simulation: SimulationManager,
    active: ActiveSet,
    /// Active set as it was when the fork was taken; restored on abort.
    active_at_fork: Option<ActiveSet>,
    history: Vec<ChatMessage>,
}

impl Session {
    /// Session over `store` with every node visible.
    #[must_use]
    pub fn new(store: NodeStore) -> Self {
        Self {
            live: store,
            simulation: SimulationManager::new(),
            active: ActiveSet::All,
            active_at_fork: None,
            history: Vec::new(),
        }
    }

    /// Replace the active set.
    #[must_use]
    pub fn with_active_set(mut self, active: ActiveSet) -> Self {
        self.active = active;
        self
    }

    /// The live tree, ignoring any fork.
    #[must_use]
    pub fn live_store(&self) -> &NodeStore {
        &self.live
    }

    /// The tree the turn works on: the fork while a simulation is active.
    #[must_use]
    pub fn store(&self) -> &NodeStore {
        self.simulation.fork().unwrap_or(&self.live)
    }

    /// Mutable working tree and active set.
    pub fn store_and_active_mut(&mut self) -> (&mut NodeStore, &mut ActiveSet) {
        let store = match self.simulation.fork_mut() {
            Some(fork) => fork,
            None => &mut self.live,
        };
        (store, &mut self.active)
    }

    /// Whether a simulation fork is active.
    #[must_use]
    pub fn simulation_active(&self) -> bool {
        self.simulation.is_active()
    }

    /// Run a simulation action and prune the active set against the
    /// resulting working tree.
    ///
    /// Visibility changes made inside a fork follow the fork: commit keeps
    /// them, abort restores the set captured at start.
    pub fn apply_simulation(&mut self, action: SimulationAction) -> SimulationOutcome {
        let outcome = match action {
            SimulationAction::Start => self.simulation.start(&self.live),
            SimulationAction::Commit => self.simulation.commit(&mut self.live),
            SimulationAction::Abort => self.simulation.abort(),
        };
        match outcome {
            SimulationOutcome::Started => self.active_at_fork = Some(self.active.clone()),
            SimulationOutcome::Committed => self.active_at_fork = None,
            SimulationOutcome::Aborted => {
                if let Some(active) = self.active_at_fork.take() {
                    self.active = active;
                }
            }
            SimulationOutcome::AlreadyActive | SimulationOutcome::NotActive => {}
        }
        let store = self.simulation.fork().unwrap_or(&self.live);
        self.active.retain_existing(store);
        outcome
    }

    /// Visible node ids.
    #[must_use]
    pub fn active_set(&self) -> &ActiveSet {
        &self.active
    }

    /// Mutable active set, for front ends toggling visibility.
    pub fn active_set_mut(&mut self) -> &mut ActiveSet {
        &mut self.active
    }

    /// Conversation so far.
    #[must_use]
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub(crate) fn history_mut(&mut self) -> &mut Vec<ChatMessage> {
        &mut self.history
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::ids::NodeId;
    use arbor_core::nodes::{Node, NodeKind};

    fn session() -> Session {
        let store = NodeStore::new(Node::with_id("root", "Root", None, NodeKind::System)).unwrap();
        Session::new(store).with_active_set(ActiveSet::only([]))
    }

    fn add(session: &mut Session, id: &str) {
        let (store, active) = session.store_and_active_mut();
        let _ = store
            .insert(Node::with_id(id, id, Some("root".into()), NodeKind::System))
            .unwrap();
        active.insert(NodeId::from(id));
    }

    #[test]
    fn writes_route_to_fork_while_active() {
        let mut s = session();
        assert_eq!(s.apply_simulation(SimulationAction::Start), SimulationOutcome::Started);
        add(&mut s, "staged");
        assert!(s.store().contains("staged"));
        assert!(!s.live_store().contains("staged"));

        let _ = s.apply_simulation(SimulationAction::Commit);
        assert!(s.live_store().contains("staged"));
        assert!(!s.simulation_active());
    }

    #[test]
    fn abort_prunes_active_set() {
        let mut s = session();
        let _ = s.apply_simulation(SimulationAction::Start);
        add(&mut s, "staged");
        assert_eq!(s.active_set(), &ActiveSet::only([NodeId::from("staged")]));
        let _ = s.apply_simulation(SimulationAction::Abort);
        assert_eq!(s.active_set(), &ActiveSet::only([]));
        assert!(!s.store().contains("staged"));
    }

    #[test]
    fn abort_restores_visibility_of_deleted_node() {
        let mut s = session();
        add(&mut s, "m");
        let _ = s.apply_simulation(SimulationAction::Start);
        {
            let (store, active) = s.store_and_active_mut();
            let removed = store.remove("m").unwrap();
            active.remove_all(&removed);
        }
        assert_eq!(s.active_set(), &ActiveSet::only([]));

        let _ = s.apply_simulation(SimulationAction::Abort);
        let m = s.store().get("m").unwrap();
        assert!(s.active_set().contains(m));
    }

    #[test]
    fn commit_keeps_fork_visibility() {
        let mut s = session();
        add(&mut s, "m");
        let _ = s.apply_simulation(SimulationAction::Start);
        {
            let (store, active) = s.store_and_active_mut();
            let removed = store.remove("m").unwrap();
            active.remove_all(&removed);
        }
        add(&mut s, "n");
        let _ = s.apply_simulation(SimulationAction::Commit);
        assert_eq!(s.active_set(), &ActiveSet::only([NodeId::from("n")]));

        // a later abort has no snapshot to restore
        assert_eq!(s.apply_simulation(SimulationAction::Abort), SimulationOutcome::NotActive);
        assert_eq!(s.active_set(), &ActiveSet::only([NodeId::from("n")]));
    }

    #[test]
    fn without_fork_writes_go_live() {
        let mut s = session();
        add(&mut s, "direct");
        assert!(s.live_store().contains("direct"));
        assert!(s.history().is_empty());
    }
}
