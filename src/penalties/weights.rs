//! The 12-slot penalty weight vector shared by both schedulers.
//!
//! The CLI exposes exactly 12 weights (see the `-w` flag), but the two
//! schedulers' scalarised scores draw on *non-contiguous* subsets of them:
//! the streams scheduler uses slots 0–6 and 11, the abstracts scheduler uses
//! slots 7–10. `Weights` captures that mapping once so neither scheduler has
//! to re-derive it, and so a test can pin the slot order down for good.

/// Positional weight for each of the twelve scalarised penalty terms, in CLI
/// order. See [`Weights::from_cli_vector`] for the authoritative slot layout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Weights {
    pub parallel_streams: f64,
    pub rooms_per_stream: f64,
    pub rooms_per_stream_surrogate: f64,
    pub streams_sessions: f64,
    pub streams_rooms: f64,
    pub sessions_rooms: f64,
    pub streams_streams: f64,
    pub unscheduled_abstracts: f64,
    pub misordered_abstracts: f64,
    pub abstracts_sessions: f64,
    pub abstracts_abstracts: f64,
    pub consecutive_sessions: f64,
}

/// Weight applied to the unscheduled-*streams* penalty. It has no slot of its
/// own on the CLI (see SPEC_FULL.md §9); it is always a fixed tiebreaker
/// weight rather than a user-tunable one.
pub const UNSCHEDULED_STREAMS_WEIGHT: f64 = 1.0;

impl Default for Weights {
    fn default() -> Self {
        Weights::from_cli_vector(&[1.0, 10.0, 1.0, 100.0, 1.0, 10.0, 1.0, 10000.0, 1000.0, 100.0, 10.0, 1.0])
            .expect("default weight vector has the correct length")
    }
}

impl Weights {
    pub fn from_cli_vector(w: &[f64]) -> Result<Self, WeightsError> {
        if w.len() != 12 {
            return Err(WeightsError::WrongLength(w.len()));
        }
        Ok(Weights {
            parallel_streams: w[0],
            rooms_per_stream: w[1],
            rooms_per_stream_surrogate: w[2],
            streams_sessions: w[3],
            streams_rooms: w[4],
            sessions_rooms: w[5],
            streams_streams: w[6],
            unscheduled_abstracts: w[7],
            misordered_abstracts: w[8],
            abstracts_sessions: w[9],
            abstracts_abstracts: w[10],
            consecutive_sessions: w[11],
        })
    }

    pub fn to_cli_vector(self) -> [f64; 12] {
        [
            self.parallel_streams,
            self.rooms_per_stream,
            self.rooms_per_stream_surrogate,
            self.streams_sessions,
            self.streams_rooms,
            self.sessions_rooms,
            self.streams_streams,
            self.unscheduled_abstracts,
            self.misordered_abstracts,
            self.abstracts_sessions,
            self.abstracts_abstracts,
            self.consecutive_sessions,
        ]
    }
}

#[derive(thiserror::Error, Debug)]
pub enum WeightsError {
    #[error("expected 12 weights, got {0}")]
    WrongLength(usize),
}
