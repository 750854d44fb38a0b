//! A single state in a hierarchical state machine.

use super::id::{ContainerId, StateId};
use super::observer::ObserverSet;
use super::transition::{EdgeId, EdgePhase, TransitionEdge};

/// One state in the machine's tree.
///
/// States may nest: entering a state enables it and every ancestor up
/// to the machine root, and nothing else (the active-path invariant).
/// A node owns its outgoing edges; targets are referenced by id only.
#[derive(Clone)]
pub struct StateNode {
    pub id: StateId,
    pub name: String,
    pub parent: Option<StateId>,
    pub children: Vec<StateId>,
    /// The object this state lives on. Several states may share one
    /// container; the cascade only disables a container once no
    /// leaving or entering state still needs it.
    pub container: ContainerId,
    pub edges: Vec<TransitionEdge>,
    /// Self-describing timeout: transition to `default_next` once
    /// `default_duration` seconds have passed in this state.
    pub default_next: Option<StateId>,
    pub default_duration: f32,
    pub on_enter: ObserverSet,
    pub on_update: ObserverSet,
    pub on_leave: ObserverSet,
    pub(crate) enabled: bool,
    pub(crate) entered_at: f32,
    /// The edge whose selection caused the pending transition, if any.
    /// Its action runs when this state leaves.
    pub(crate) chosen: Option<EdgeId>,
}

impl StateNode {
    pub fn new(name: impl Into<String>, container: ContainerId) -> Self {
        Self {
            id: StateId::new(),
            name: name.into(),
            parent: None,
            children: Vec::new(),
            container,
            edges: Vec::new(),
            default_next: None,
            default_duration: 0.0,
            on_enter: ObserverSet::new(),
            on_update: ObserverSet::new(),
            on_leave: ObserverSet::new(),
            enabled: false,
            entered_at: 0.0,
            chosen: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Seconds spent in this state, zero while inactive.
    pub fn time_in_state(&self, now: f32) -> f32 {
        if self.enabled {
            (now - self.entered_at).max(0.0)
        } else {
            0.0
        }
    }

    pub fn edge(&self, id: EdgeId) -> Option<&TransitionEdge> {
        self.edges.iter().find(|edge| edge.id == id)
    }

    pub(crate) fn set_phase(&mut self, id: EdgeId, phase: EdgePhase) {
        if let Some(edge) = self.edges.iter_mut().find(|edge| edge.id == id) {
            edge.phase = phase;
        }
    }

    /// Return every edge to `Dormant` for a fresh activation.
    pub(crate) fn reset_edges(&mut self) {
        for edge in &mut self.edges {
            edge.phase = EdgePhase::Dormant;
        }
    }
}
