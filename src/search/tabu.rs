//! Tabu-search acceptance strategies: a FIFO window of recently-touched
//! items/positions (§4.6-3), and a FIFO window of whole recent solutions,
//! which is exact but expensive (§4.6-4).

use std::collections::{HashSet, VecDeque};

use crate::grid::{apply_out_of_place, Grid, Move, EMPTY};
use crate::search::AcceptanceCondition;

pub struct SlotTabuList {
    last_delta: f64,
    capacity: usize,
    items_window: VecDeque<i32>,
    positions_window: VecDeque<(usize, usize)>,
}

impl SlotTabuList {
    pub fn new(capacity: usize) -> Self {
        SlotTabuList {
            last_delta: 0.0,
            capacity,
            items_window: VecDeque::new(),
            positions_window: VecDeque::new(),
        }
    }

    /// The cells' values before and after the move, each filtered of
    /// `EMPTY` but not deduplicated — a move touching the same item twice
    /// must consume two slots of the window, not one.
    fn old_and_new_items(grid: &Grid, mv: &Move) -> (Vec<i32>, Vec<i32>) {
        let old_items = mv.rows.iter().zip(mv.cols.iter()).map(|(&r, &c)| grid.get(r, c)).filter(|&v| v != EMPTY).collect();
        let new_items = mv.items.iter().copied().filter(|&v| v != EMPTY).collect();
        (old_items, new_items)
    }

    fn push_capped<T: Eq>(window: &mut VecDeque<T>, capacity: usize, value: T) {
        window.push_back(value);
        while window.len() > capacity {
            window.pop_front();
        }
    }
}

impl AcceptanceCondition for SlotTabuList {
    fn acceptable(&mut self, grid: &Grid, mv: &Move, delta: f64) -> bool {
        if delta < self.last_delta {
            return true;
        }
        let (old_items, new_items) = Self::old_and_new_items(grid, mv);
        let items: HashSet<i32> = old_items.into_iter().chain(new_items).collect();
        let positions = mv.cells_touched();
        items.iter().all(|i| !self.items_window.contains(i)) && positions.iter().all(|p| !self.positions_window.contains(p))
    }

    fn accept(&mut self, grid: &Grid, mv: &Move, delta: f64) {
        self.last_delta = delta;
        let (old_items, new_items) = Self::old_and_new_items(grid, mv);
        for item in new_items {
            Self::push_capped(&mut self.items_window, self.capacity, item);
        }
        for item in old_items {
            Self::push_capped(&mut self.items_window, self.capacity, item);
        }
        for position in mv.cells_touched() {
            Self::push_capped(&mut self.positions_window, self.capacity, position);
        }
    }

    fn reject(&mut self) {}
}

pub struct FullTabuList {
    last_delta: f64,
    capacity: usize,
    window: VecDeque<Grid>,
}

impl FullTabuList {
    pub fn new(capacity: usize) -> Self {
        FullTabuList {
            last_delta: 0.0,
            capacity,
            window: VecDeque::new(),
        }
    }
}

impl AcceptanceCondition for FullTabuList {
    fn acceptable(&mut self, grid: &Grid, mv: &Move, delta: f64) -> bool {
        if delta < self.last_delta {
            return true;
        }
        let candidate = apply_out_of_place(grid, mv);
        !self.window.contains(&candidate)
    }

    fn accept(&mut self, grid: &Grid, mv: &Move, delta: f64) {
        self.last_delta = delta;
        let candidate = apply_out_of_place(grid, mv);
        self.window.push_back(candidate);
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }
    }

    fn reject(&mut self) {}
}
