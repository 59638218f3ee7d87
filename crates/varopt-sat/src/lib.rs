//! Exhaustive model enumeration for CNF clause sets.
//!
//! This crate implements the satisfiability layer used by `varopt`: clauses over
//! signed integer literals, a two-watched-literal propagator and a DPLL-style
//! enumerator that reports every satisfying assignment exactly once.
//!
//! # Architecture
//!
//! - [`Clause`] / [`ClauseSet`]: the formula, deduplicated by literal content
//! - [`Decisions`]: assignment trail with decision levels and reasons
//! - [`WatchGraph`] / [`Propagator`]: unit propagation
//! - [`ModelEnumerator`]: the search loop, with optional deadline and cancellation
//!
//! # Example
//!
//! ```
//! use varopt_sat::{ClauseSet, ModelEnumerator};
//!
//! // feature 1 is mandatory, feature 2 requires feature 1
//! let clauses = ClauseSet::from_literals([vec![1], vec![1, -2]]);
//! let (models, _stats) = ModelEnumerator::new(2, clauses).collect().unwrap();
//! assert_eq!(models.len(), 2);
//! ```

mod clause;
mod clause_set;
mod decisions;
mod enumerator;
mod error;
mod watch_graph;

pub use clause::{variable, Clause, Literal, Variable};
pub use clause_set::{ClauseSet, ClauseSetStats};
pub use decisions::Decisions;
pub use enumerator::{EnumerationStats, ModelEnumerator};
pub use error::EnumerationError;
pub use watch_graph::{PropagateResult, Propagator, WatchGraph};
