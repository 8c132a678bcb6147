//! The two schedulers (streams, abstracts) that own a grid, a weight
//! vector and the full/partial evaluators the search loop drives.
//!
//! Both schedulers share the shape described by [`Scheduler`] — `score`,
//! `detailed_score`, `violations`, grid access — but each exposes its own
//! concrete `neighbourhood(..)` constructor rather than going through the
//! trait, since the two neighbourhood types differ in more than their
//! associated type (the abstracts one borrows the `Instance`).

pub mod abstracts_scheduler;
pub mod streams_scheduler;

pub use abstracts_scheduler::AbstractsScheduler;
pub use streams_scheduler::StreamsScheduler;

use crate::grid::Grid;
use crate::penalties::Weights;

/// Shared contract between `StreamsScheduler` and `AbstractsScheduler`: hold
/// a grid, score it against a weight vector.
pub trait Scheduler {
    type Penalties;
    type Violations;

    fn weights(&self) -> &Weights;
    fn grid(&self) -> &Grid;
    fn set_grid(&mut self, grid: Grid);

    fn score(&self) -> f64;
    fn detailed_score(&self) -> Self::Penalties;
    fn violations(&self) -> Self::Violations;
}
