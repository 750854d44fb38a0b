//! Core state machine types.
//!
//! This module contains the building blocks the runtime is assembled
//! from:
//! - Stable identities for states and their owning containers
//! - `StateNode`, a single (possibly nested) state
//! - `TransitionEdge`, a directed edge out of a state
//! - Observer sets for enter/update/leave notifications

mod id;
mod node;
mod observer;
mod transition;

pub use id::{ContainerId, StateId};
pub use node::StateNode;
pub use observer::{Observer, ObserverId, ObserverSet};
pub use transition::{
    Condition, EdgeAction, EdgeId, EdgePhase, EventCondition, TransitionEdge, TransitionKind,
};
