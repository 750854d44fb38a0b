//! Runtime errors.

use crate::core::StateId;
use thiserror::Error;

/// Errors surfaced by [`super::Machine`] operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuntimeError {
    /// An authoritative operation was attempted on a replica. This is
    /// a programming error; the operation mutates nothing.
    #[error("operation requires the authority role")]
    NotAuthority,

    /// A replicated change was applied to the authority.
    #[error("replicated state changes only apply to replicas")]
    NotReplica,

    /// An explicitly requested state does not exist in the graph.
    #[error("unknown state {0}")]
    UnknownState(StateId),

    /// A single tick produced more consecutive instant transitions
    /// than [`super::MAX_INSTANT_TRANSITIONS`] allows. The machine
    /// holds its current state rather than looping forever.
    #[error("exceeded the instant transition limit in a single tick")]
    InstantTransitionLimit,
}
