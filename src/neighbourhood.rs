//! Lazy, randomised move generators for the two grids. Both hold their own
//! `StdRng` handle (never process-global randomness) so a seeded search run
//! is reproducible end to end.

use rand::rngs::StdRng;
use rand::Rng;

use crate::grid::{Grid, Move, EMPTY};
use crate::ids::AbstractID;
use crate::instance::Instance;

/// Something that can sample up to `n` syntactically-valid moves against the
/// current grid. Implementations need not return exactly `n` moves — the
/// local search loop tolerates a smaller batch.
pub trait Neighbourhood {
    fn sample(&mut self, grid: &Grid, n: usize) -> Vec<Move>;
}

/// Single-cell-set and cell-swap moves over the streams grid.
pub struct StreamsNeighbourhood {
    rng: StdRng,
    num_timeblocks: usize,
    num_rooms: usize,
    num_streams: usize,
}

impl StreamsNeighbourhood {
    pub fn new(rng: StdRng, num_timeblocks: usize, num_rooms: usize, num_streams: usize) -> Self {
        StreamsNeighbourhood {
            rng,
            num_timeblocks,
            num_rooms,
            num_streams,
        }
    }

    fn random_cell(&mut self) -> (usize, usize) {
        (self.rng.gen_range(0..self.num_timeblocks), self.rng.gen_range(0..self.num_rooms))
    }

    fn next_move(&mut self, grid: &Grid) -> Option<Move> {
        if self.num_timeblocks == 0 || self.num_rooms == 0 {
            return None;
        }
        if self.rng.gen_bool(0.5) {
            let (b, r) = self.random_cell();
            let value = if self.num_streams == 0 || self.rng.gen_bool(0.15) {
                EMPTY
            } else {
                self.rng.gen_range(0..self.num_streams) as i32
            };
            Some(Move::schedule(value, b, r))
        } else {
            let (b1, r1) = self.random_cell();
            let mut b2_r2 = self.random_cell();
            for _ in 0..4 {
                if b2_r2 != (b1, r1) {
                    break;
                }
                b2_r2 = self.random_cell();
            }
            let (b2, r2) = b2_r2;
            Some(Move::swap(b1, r1, b2, r2, grid))
        }
    }
}

impl Neighbourhood for StreamsNeighbourhood {
    fn sample(&mut self, grid: &Grid, n: usize) -> Vec<Move> {
        (0..n).filter_map(|_| self.next_move(grid)).collect()
    }
}

/// Place/move, swap and unschedule moves over the abstracts grid, respecting
/// the constraint that every abstract occupies `k` consecutive slots inside
/// one timeblock in one room column.
pub struct AbstractsNeighbourhood<'a> {
    rng: StdRng,
    instance: &'a Instance,
}

impl<'a> AbstractsNeighbourhood<'a> {
    pub fn new(rng: StdRng, instance: &'a Instance) -> Self {
        AbstractsNeighbourhood { rng, instance }
    }

    fn scheduled_abstracts(&self, grid: &Grid) -> Vec<AbstractID> {
        let mut seen: Vec<i32> = grid.values().iter().copied().filter(|&v| v != EMPTY).collect();
        seen.sort_unstable();
        seen.dedup();
        seen.into_iter().map(|v| AbstractID(v as u32)).collect()
    }

    fn cells_of(&self, grid: &Grid, abstract_id: AbstractID) -> Vec<(usize, usize)> {
        let id = i32::from(abstract_id);
        grid.iter_occupied().filter(|&(_, _, v)| v == id).map(|(r, c, _)| (r, c)).collect()
    }

    fn place_or_move(&mut self, grid: &Grid) -> Option<Move> {
        let scheduled = self.scheduled_abstracts(grid);
        if scheduled.is_empty() || self.instance.num_timeblocks() == 0 || self.instance.num_rooms() == 0 {
            return None;
        }
        let abstract_id = scheduled[self.rng.gen_range(0..scheduled.len())];
        let k = self.instance.abstract_(abstract_id).timeslots;

        let timeblock = self.rng.gen_range(0..self.instance.num_timeblocks()).into();
        let (start, end) = self.instance.timeslot_range_of_timeblock(timeblock);
        if end - start < k {
            return None;
        }
        let offset = self.rng.gen_range(0..=(end - start - k));
        let dest_start = start + offset;
        let room = self.rng.gen_range(0..self.instance.num_rooms());

        let mut clear_cells = self.cells_of(grid, abstract_id);
        let mut seen_bumped = std::collections::HashSet::new();
        for t in dest_start..dest_start + k {
            let occupant = grid.get(t, room);
            if occupant != EMPTY && occupant != i32::from(abstract_id) && seen_bumped.insert(occupant) {
                clear_cells.extend(self.cells_of(grid, AbstractID(occupant as u32)));
            }
        }

        let mut mv = Move::unschedule_many(clear_cells.iter().map(|(r, _)| *r).collect(), clear_cells.iter().map(|(_, c)| *c).collect());
        mv.extend(Move::schedule_many(
            i32::from(abstract_id),
            (dest_start..dest_start + k).collect(),
            vec![room; k],
        ));
        Some(mv)
    }

    fn swap_same_length(&mut self, grid: &Grid) -> Option<Move> {
        let scheduled = self.scheduled_abstracts(grid);
        if scheduled.len() < 2 {
            return None;
        }
        let a = scheduled[self.rng.gen_range(0..scheduled.len())];
        let candidates: Vec<AbstractID> = scheduled
            .iter()
            .copied()
            .filter(|&b| b != a && self.instance.abstract_(b).timeslots == self.instance.abstract_(a).timeslots)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let b = candidates[self.rng.gen_range(0..candidates.len())];

        let cells_a = self.cells_of(grid, a);
        let cells_b = self.cells_of(grid, b);
        let mut mv = Move::empty();
        mv.extend(Move::schedule_many(i32::from(b), cells_a.iter().map(|(r, _)| *r).collect(), cells_a.iter().map(|(_, c)| *c).collect()));
        mv.extend(Move::schedule_many(i32::from(a), cells_b.iter().map(|(r, _)| *r).collect(), cells_b.iter().map(|(_, c)| *c).collect()));
        Some(mv)
    }

    fn unschedule(&mut self, grid: &Grid) -> Option<Move> {
        let scheduled = self.scheduled_abstracts(grid);
        if scheduled.is_empty() {
            return None;
        }
        let a = scheduled[self.rng.gen_range(0..scheduled.len())];
        let cells = self.cells_of(grid, a);
        Some(Move::unschedule_many(cells.iter().map(|(r, _)| *r).collect(), cells.iter().map(|(_, c)| *c).collect()))
    }

    fn next_move(&mut self, grid: &Grid) -> Option<Move> {
        match self.rng.gen_range(0..3) {
            0 => self.place_or_move(grid),
            1 => self.swap_same_length(grid),
            _ => self.unschedule(grid),
        }
    }
}

impl<'a> Neighbourhood for AbstractsNeighbourhood<'a> {
    fn sample(&mut self, grid: &Grid, n: usize) -> Vec<Move> {
        (0..n).filter_map(|_| self.next_move(grid)).collect()
    }
}
