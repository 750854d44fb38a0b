//! Builder API for ergonomic machine construction.
//!
//! This module provides fluent builders for declaring states and
//! transitions with minimal boilerplate while validating every state
//! reference at build time.

pub mod error;
pub mod machine;
pub mod transition;

pub use error::BuildError;
pub use machine::MachineBuilder;
pub use transition::TransitionBuilder;

use crate::core::StateId;

/// Start an unconditional immediate transition between two states.
///
/// # Example
///
/// ```
/// use cascade::builder::immediate;
/// use cascade::MachineBuilder;
///
/// let mut builder = MachineBuilder::new();
/// let start = builder.state("start");
/// let end = builder.state("end");
///
/// let machine = builder
///     .transition(immediate(start, end))
///     .unwrap()
///     .initial(start)
///     .build()
///     .unwrap();
/// # let _ = machine;
/// ```
pub fn immediate(from: StateId, to: StateId) -> TransitionBuilder {
    TransitionBuilder::new().from(from).to(to)
}

/// Start an immediate transition gated on a predicate.
///
/// # Example
///
/// ```
/// use cascade::builder::guarded;
/// use cascade::MachineBuilder;
///
/// let mut builder = MachineBuilder::new();
/// let idle = builder.state("idle");
/// let done = builder.state("done");
///
/// let builder = builder
///     .transition(guarded(idle, done, || false))
///     .unwrap();
/// # let _ = builder;
/// ```
pub fn guarded<F>(from: StateId, to: StateId, condition: F) -> TransitionBuilder
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    TransitionBuilder::new().from(from).to(to).when(condition)
}
