//! Typed event dispatch with constraint-ordered handlers.
//!
//! Events are plain types tagged with the [`Event`] marker trait.
//! Participants subscribe per event type, scoped to a container
//! subtree; the router orders them with the constraint solver using
//! declared [`OrderingRule`]s and dispatches synchronously.

mod registry;
mod router;

pub use registry::{constraints_for, HandlerRegistry, OrderingRule};
pub use router::EventRouter;

use crate::core::StateId;

/// Marker for event payload types.
///
/// Mirrors the capability style of the state machine's own events:
/// define a payload struct, implement `Event`, subscribe handlers by
/// type.
pub trait Event: std::any::Any + Send + Sync {}

/// Raised on the state's container when a state is entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnterStateEvent {
    pub state: StateId,
}

impl Event for EnterStateEvent {}

/// Raised on the machine root every tick while a state is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpdateStateEvent {
    pub state: StateId,
}

impl Event for UpdateStateEvent {}

/// Raised on the state's container when a state is exited.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeaveStateEvent {
    pub state: StateId,
}

impl Event for LeaveStateEvent {}
