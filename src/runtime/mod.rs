//! The tick-driven state machine runtime.
//!
//! [`Machine`] owns a [`StateGraph`] of nested states, resolves pending
//! transitions once per tick, applies enter/leave cascades across the
//! nesting hierarchy, and mediates authority/replica consistency: the
//! authority decides transitions, replicas replay them by id.

mod error;
mod graph;
mod machine;

pub use error::RuntimeError;
pub use graph::StateGraph;
pub use machine::{Machine, Role, MAX_INSTANT_TRANSITIONS};
