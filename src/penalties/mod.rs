//! Penalty functions: the scalarised objective both schedulers optimise,
//! split into the streams-grid terms and the abstracts-grid terms, plus the
//! weight vector that turns either breakdown into a single `f64` score.

pub mod abstracts;
pub mod streams;
pub mod weights;

pub use weights::{Weights, UNSCHEDULED_STREAMS_WEIGHT, WeightsError};

use streams::StreamsPenalties;
use abstracts::AbstractsPenalties;

impl StreamsPenalties {
    /// Weighted sum using slots 0–6 and 11 of `weights`, plus the fixed
    /// internal unscheduled-streams weight (see SPEC_FULL.md §9).
    pub fn weighted_score(&self, weights: &Weights) -> f64 {
        weights.parallel_streams * self.parallel
            + weights.rooms_per_stream * self.rooms_without_surrogate
            + weights.rooms_per_stream_surrogate * 0.0
            + weights.streams_sessions * self.streams_sessions
            + weights.streams_rooms * self.streams_rooms
            + weights.sessions_rooms * self.sessions_rooms
            + weights.streams_streams * self.streams_streams
            + UNSCHEDULED_STREAMS_WEIGHT * self.unscheduled
            + weights.consecutive_sessions * self.consecutive
    }
}

impl AbstractsPenalties {
    /// Weighted sum using slots 7–10 of `weights`.
    pub fn weighted_score(&self, weights: &Weights) -> f64 {
        weights.unscheduled_abstracts * self.scheduled
            + weights.misordered_abstracts * self.order
            + weights.abstracts_sessions * self.sessions
            + weights.abstracts_abstracts * self.conflicts
    }
}
