//! Stage 1: assigns streams to `(timeblock, room)` cells.

use rand::rngs::StdRng;
use rand::Rng;

use crate::error::{Error, Result};
use crate::grid::{Grid, EMPTY};
use crate::ids::StreamID;
use crate::instance::Instance;
use crate::neighbourhood::StreamsNeighbourhood;
use crate::penalties::streams::{self, StreamsPenalties, StreamsViolations};
use crate::penalties::Weights;
use crate::scheduler::Scheduler;

pub struct StreamsScheduler<'a> {
    instance: &'a Instance,
    weights: Weights,
    grid: Grid,
}

impl<'a> StreamsScheduler<'a> {
    /// An empty grid is a valid start (§4.3).
    pub fn new(instance: &'a Instance, weights: Weights) -> Self {
        let grid = Grid::new(instance.num_timeblocks(), instance.num_rooms());
        StreamsScheduler { instance, weights, grid }
    }

    /// Adopt a previously produced grid (a resume file), checked against the
    /// instance's current dimensions.
    pub fn from_resume(instance: &'a Instance, weights: Weights, grid: Grid) -> Result<Self> {
        let expected = (instance.num_timeblocks(), instance.num_rooms());
        if grid.shape() != expected {
            let (rows, cols) = grid.shape();
            return Err(Error::IncompatibleDimensions {
                sheet: "streams_solution".to_string(),
                rows,
                cols,
                expected_rows: expected.0,
                expected_cols: expected.1,
            });
        }
        Ok(StreamsScheduler { instance, weights, grid })
    }

    /// A uniformly-random grid, used to seed the genetic wrapper's initial
    /// population (§4.7).
    pub fn random(instance: &'a Instance, weights: Weights, rng: &mut StdRng) -> Self {
        let mut grid = Grid::new(instance.num_timeblocks(), instance.num_rooms());
        let num_streams = instance.num_streams();
        if num_streams > 0 {
            for b in 0..grid.rows() {
                for r in 0..grid.cols() {
                    let value = if rng.gen_bool(0.3) { EMPTY } else { rng.gen_range(0..num_streams) as i32 };
                    grid.set(b, r, value);
                }
            }
        }
        StreamsScheduler { instance, weights, grid }
    }

    pub fn instance(&self) -> &Instance {
        self.instance
    }

    pub fn neighbourhood(&self, rng: StdRng) -> StreamsNeighbourhood {
        StreamsNeighbourhood::new(rng, self.instance.num_timeblocks(), self.instance.num_rooms(), self.instance.num_streams())
    }

    pub fn delta(&self, mv: &crate::grid::Move) -> StreamsPenalties {
        streams::delta(&self.grid, mv, self.instance)
    }

    pub fn all_streams(&self) -> impl Iterator<Item = StreamID> + '_ {
        (0..self.instance.num_streams()).map(StreamID::from)
    }
}

impl<'a> Scheduler for StreamsScheduler<'a> {
    type Penalties = StreamsPenalties;
    type Violations = StreamsViolations;

    fn weights(&self) -> &Weights {
        &self.weights
    }

    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn set_grid(&mut self, grid: Grid) {
        self.grid = grid;
    }

    fn score(&self) -> f64 {
        self.detailed_score().weighted_score(&self.weights)
    }

    fn detailed_score(&self) -> StreamsPenalties {
        streams::evaluate(&self.grid, self.instance)
    }

    fn violations(&self) -> StreamsViolations {
        streams::violations(&self.grid, self.instance)
    }
}
