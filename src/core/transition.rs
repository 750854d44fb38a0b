//! Directed transition edges between states.

use super::id::StateId;
use std::any::{Any, TypeId};
use std::sync::Arc;
use uuid::Uuid;

/// Predicate deciding whether an immediate transition may fire.
pub type Condition = Arc<dyn Fn() -> bool + Send + Sync>;

/// Predicate over an observed event payload.
pub type EventCondition = Arc<dyn Fn(&dyn Any) -> bool + Send + Sync>;

/// Side effect run when the transition that caused an exit is applied.
pub type EdgeAction = Arc<dyn Fn() + Send + Sync>;

/// Stable identity of an edge within its source state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EdgeId(Uuid);

impl EdgeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Enablement lifecycle of an edge within one activation of its source.
///
/// Edges are `Dormant` while the source state is inactive, become
/// `Eligible` when their condition holds during an evaluation, and
/// `Fired` once selected. `Fired` is terminal for the activation; the
/// edge resets to `Dormant` the next time the source state is entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgePhase {
    Dormant,
    Eligible,
    Fired,
}

/// What makes a transition eligible.
///
/// The default-timer transition is not an edge variant: it is carried
/// on the `StateNode` itself as `default_next`/`default_duration`, and
/// "no transition" is simply the absence of edges.
#[derive(Clone)]
pub enum TransitionKind {
    /// Fires as soon as its condition holds during an evaluation.
    /// Competes with other immediate edges by priority, then by
    /// weighted random selection within the winning priority tier.
    Immediate {
        condition: Option<Condition>,
        priority: i32,
        weight: f32,
    },
    /// Fires when an event of the tagged type is observed while the
    /// source state is active and the condition accepts the payload.
    EventTriggered {
        event: TypeId,
        condition: Option<EventCondition>,
    },
}

/// A directed edge out of a state.
///
/// The source state owns the edge; the target is held by id only, so
/// destroying the target invalidates the edge without touching the
/// source. Evaluation skips edges whose target no longer exists.
#[derive(Clone)]
pub struct TransitionEdge {
    pub id: EdgeId,
    pub target: StateId,
    pub kind: TransitionKind,
    /// Seconds between this edge being chosen and the transition being
    /// applied. Zero applies at the end of the current tick.
    pub delay: f32,
    /// Optional side effect run while the source state leaves.
    pub action: Option<EdgeAction>,
    pub(crate) phase: EdgePhase,
}

impl TransitionEdge {
    pub fn new(target: StateId, kind: TransitionKind) -> Self {
        Self {
            id: EdgeId::new(),
            target,
            kind,
            delay: 0.0,
            action: None,
            phase: EdgePhase::Dormant,
        }
    }

    pub fn phase(&self) -> EdgePhase {
        self.phase
    }

    /// Whether this edge's immediate condition currently holds.
    /// Event-triggered edges are never satisfied by polling.
    pub fn is_satisfied(&self) -> bool {
        match &self.kind {
            TransitionKind::Immediate { condition, .. } => {
                condition.as_ref().map_or(true, |check| check())
            }
            TransitionKind::EventTriggered { .. } => false,
        }
    }

    /// Whether this edge fires on events of the given type.
    pub fn matches_event(&self, event_type: TypeId, payload: &dyn Any) -> bool {
        match &self.kind {
            TransitionKind::EventTriggered { event, condition } => {
                *event == event_type && condition.as_ref().map_or(true, |check| check(payload))
            }
            TransitionKind::Immediate { .. } => false,
        }
    }
}
