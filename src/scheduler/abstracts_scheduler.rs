//! Stage 2: assigns abstracts to `(timeslot, room)` cells, conditioned on a
//! fixed streams grid.

use rand::rngs::StdRng;

use crate::error::{Error, Result};
use crate::grid::{Grid, EMPTY};
use crate::instance::Instance;
use crate::neighbourhood::AbstractsNeighbourhood;
use crate::penalties::abstracts::{self, AbstractsPenalties, AbstractsViolations};
use crate::penalties::Weights;
use crate::scheduler::Scheduler;

pub struct AbstractsScheduler<'a> {
    instance: &'a Instance,
    weights: Weights,
    streams_grid: Grid,
    grid: Grid,
}

impl<'a> AbstractsScheduler<'a> {
    pub fn new(instance: &'a Instance, weights: Weights, streams_grid: Grid) -> Self {
        let grid = Grid::new(instance.num_timeslots(), instance.num_rooms());
        AbstractsScheduler {
            instance,
            weights,
            streams_grid,
            grid,
        }
    }

    pub fn from_resume(instance: &'a Instance, weights: Weights, streams_grid: Grid, grid: Grid) -> Result<Self> {
        let expected = (instance.num_timeslots(), instance.num_rooms());
        if grid.shape() != expected {
            let (rows, cols) = grid.shape();
            return Err(Error::IncompatibleDimensions {
                sheet: "abstracts_solution".to_string(),
                rows,
                cols,
                expected_rows: expected.0,
                expected_cols: expected.1,
            });
        }
        Ok(AbstractsScheduler {
            instance,
            weights,
            streams_grid,
            grid,
        })
    }

    pub fn streams_grid(&self) -> &Grid {
        &self.streams_grid
    }

    /// The first unoccupied timeslot in `[start, end)` of `room`, if any.
    fn first_empty_slot(grid: &Grid, start: usize, end: usize, room: usize) -> Option<usize> {
        (start..end).find(|&t| grid.get(t, room) == EMPTY)
    }

    /// Greedy constructive initialization (§4.3): visit streams in id order,
    /// and within each stream visit its abstracts sorted by `(order, id)`,
    /// missing order sorted last. For each abstract, try a whole-timeblock
    /// fit, then a partial leading-slots fit, else leave it unscheduled.
    pub fn initialize(&mut self) {
        let mut grid = Grid::new(self.instance.num_timeslots(), self.instance.num_rooms());

        for (stream_id, _) in self.instance.streams().iter_enumerated() {
            let stream_value = i32::from(stream_id);
            let mut cells: Vec<(usize, usize)> = Vec::new();
            for timeblock in 0..self.streams_grid.rows() {
                for room in 0..self.streams_grid.cols() {
                    if self.streams_grid.get(timeblock, room) == stream_value {
                        cells.push((timeblock, room));
                    }
                }
            }
            cells.sort_unstable();

            let mut stream_abstracts: Vec<_> = self.instance.abstracts_by_stream(stream_id).collect();
            stream_abstracts.sort_by_key(|a| (self.instance.abstract_(*a).order.unwrap_or(u32::MAX), usize::from(*a)));

            for abstract_id in stream_abstracts {
                let k = self.instance.abstract_(abstract_id).timeslots;
                let value = i32::from(abstract_id);

                let whole_fit = cells.iter().find(|&&(timeblock, room)| {
                    let (start, end) = self.instance.timeslot_range_of_timeblock(timeblock.into());
                    end - start == k && (start..end).all(|t| grid.get(t, room) == EMPTY)
                });
                if let Some(&(timeblock, room)) = whole_fit {
                    let (start, end) = self.instance.timeslot_range_of_timeblock(timeblock.into());
                    for t in start..end {
                        grid.set(t, room, value);
                    }
                    continue;
                }

                let partial_fit = cells.iter().find_map(|&(timeblock, room)| {
                    let (start, end) = self.instance.timeslot_range_of_timeblock(timeblock.into());
                    if end - start <= k {
                        return None;
                    }
                    let slot = Self::first_empty_slot(&grid, start, end, room)?;
                    (slot + k <= end && (slot..slot + k).all(|t| grid.get(t, room) == EMPTY)).then_some((room, slot))
                });
                if let Some((room, slot)) = partial_fit {
                    for t in slot..slot + k {
                        grid.set(t, room, value);
                    }
                }
                // else: no cell fits, leave unscheduled (rule 3).
            }
        }

        self.grid = grid;
    }

    pub fn neighbourhood(&self, rng: StdRng) -> AbstractsNeighbourhood<'a> {
        AbstractsNeighbourhood::new(rng, self.instance)
    }

    pub fn delta(&self, mv: &crate::grid::Move) -> AbstractsPenalties {
        abstracts::delta(&self.grid, mv, &self.streams_grid, self.instance)
    }
}

impl<'a> Scheduler for AbstractsScheduler<'a> {
    type Penalties = AbstractsPenalties;
    type Violations = AbstractsViolations;

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

    fn detailed_score(&self) -> AbstractsPenalties {
        abstracts::evaluate(&self.streams_grid, &self.grid, self.instance)
    }

    fn violations(&self) -> AbstractsViolations {
        abstracts::violations(&self.streams_grid, &self.grid, self.instance)
    }
}
