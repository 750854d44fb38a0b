//! Cascade: a hierarchical state machine runtime for tick-driven
//! simulations.
//!
//! States form a tree: entering a state enables it together with every
//! ancestor, and nothing else. Once per fixed tick the runtime updates
//! the current state, resolves pending transitions (immediate,
//! event-triggered, or default-timer), and applies the enter/leave
//! cascade across the hierarchy. In networked use a single authority
//! decides transitions; replicas replay the replicated current-state
//! id without evaluating any condition.
//!
//! The event layer dispatches typed payloads to subscribed handlers in
//! an order solved from declarative constraints (`RunFirst`, `RunLast`,
//! `Before`, `After`); the underlying [`ordering`] solver is usable on
//! its own.
//!
//! # Core Concepts
//!
//! - **Machine**: owns the state graph, the current state, and the tick
//!   loop
//! - **Cascade**: the ordered leave/enter sequence applied when the
//!   active path changes; deepest states leave first, shallowest enter
//!   first
//! - **Authority / Replica**: who decides transitions versus who
//!   replays them
//!
//! # Example
//!
//! ```rust
//! use cascade::{MachineBuilder, TransitionBuilder};
//!
//! let mut builder = MachineBuilder::new().tick_delta(1.0);
//! let patrol = builder.state("patrol");
//! let alert = builder.state("alert");
//! // Fall back to patrolling after five seconds on alert.
//! builder.default_transition(alert, patrol, 5.0);
//!
//! let builder = builder
//!     .transition(TransitionBuilder::new().from(patrol).to(alert).when(|| false))
//!     .unwrap();
//!
//! let mut machine = builder.initial(patrol).build().unwrap();
//! machine.start().unwrap();
//! assert_eq!(machine.current_state(), Some(patrol));
//! ```

pub mod builder;
pub mod core;
pub mod events;
pub mod ordering;
pub mod runtime;

// Re-export commonly used types
pub use builder::{BuildError, MachineBuilder, TransitionBuilder};
pub use core::{ContainerId, EdgePhase, ObserverId, StateId, TransitionEdge, TransitionKind};
pub use events::{
    EnterStateEvent, Event, EventRouter, HandlerRegistry, LeaveStateEvent, OrderingRule,
    UpdateStateEvent,
};
pub use ordering::{solve, Constraint, OrderingConflict};
pub use runtime::{Machine, Role, RuntimeError, StateGraph, MAX_INSTANT_TRANSITIONS};
