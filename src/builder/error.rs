//! Build errors for machine and transition builders.

use crate::core::StateId;
use thiserror::Error;

/// Errors that can occur when building machines and transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("Transition source state not specified. Call .from(state)")]
    MissingSource,

    #[error("Transition target state not specified. Call .to(state)")]
    MissingTarget,

    #[error("Transition mixes an immediate condition with an event trigger")]
    ConflictingKinds,

    #[error("State {0} is not part of this machine")]
    UnknownState(StateId),

    #[error("Initial state {0} is not part of this machine")]
    UnknownInitialState(StateId),
}
