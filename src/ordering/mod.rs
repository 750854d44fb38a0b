//! Constraint-based ordering solver.
//!
//! Given a set of items and partial ordering constraints, the solver
//! produces a deterministic total order or reports the pair of items
//! whose constraints conflict. Used by the event router to order
//! handlers, but usable standalone for any pipeline that needs a
//! stable order from declarative `First`/`Last`/`Before`/`After` rules.

mod solver;

pub use solver::{solve, Constraint, OrderingConflict};
