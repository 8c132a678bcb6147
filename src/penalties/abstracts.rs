//! Penalty terms that depend on the abstracts grid, conditioned on a fixed
//! streams grid (terms 8–11 of SPEC_FULL.md §4.2.2).

use std::collections::HashSet;

use crate::grid::{apply_out_of_place, Grid, Move, EMPTY};
use crate::ids::AbstractID;
use crate::instance::Instance;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AbstractsPenalties {
    pub scheduled: f64,
    pub order: f64,
    pub sessions: f64,
    pub conflicts: f64,
}

#[derive(Clone, Debug, Default)]
pub struct AbstractsViolations {
    pub scheduled: Vec<AbstractID>,
    pub order: Vec<(AbstractID, f64)>,
    pub sessions: Vec<(AbstractID, usize, f64)>,
    pub conflicts: Vec<(AbstractID, AbstractID, usize)>,
}

fn touched_abstracts(old: &Grid, new: &Grid, mv: &Move) -> HashSet<AbstractID> {
    let mut abstracts = HashSet::new();
    for (row, col) in mv.cells_touched() {
        let before = old.get(row, col);
        let after = new.get(row, col);
        if before != EMPTY {
            abstracts.insert(AbstractID(before as u32));
        }
        if after != EMPTY {
            abstracts.insert(AbstractID(after as u32));
        }
    }
    abstracts
}

/// Count of abstracts that appear zero times in the grid.
pub fn evaluate_unscheduled(grid: &Grid, abstracts: impl IntoIterator<Item = AbstractID>) -> f64 {
    let present: HashSet<i32> = grid.values().iter().copied().filter(|&v| v != EMPTY).collect();
    abstracts.into_iter().filter(|a| !present.contains(&i32::from(*a))).count() as f64
}

pub fn unscheduled_violations(grid: &Grid, abstracts: impl IntoIterator<Item = AbstractID>) -> Vec<AbstractID> {
    let present: HashSet<i32> = grid.values().iter().copied().filter(|&v| v != EMPTY).collect();
    abstracts.into_iter().filter(|a| !present.contains(&i32::from(*a))).collect()
}

pub fn delta_unscheduled(old: &Grid, new: &Grid, mv: &Move) -> f64 {
    let touched = touched_abstracts(old, new, mv);
    evaluate_unscheduled(new, touched.iter().copied()) - evaluate_unscheduled(old, touched)
}

/// The presentation-order sequence for a single stream: the scheduled
/// `(abstract, order)` pairs visited in timeblock order, then room order,
/// then timeslot order, skipping abstracts with no order key.
fn presentation_sequence(
    streams_grid: &Grid,
    abstracts_grid: &Grid,
    instance: &Instance,
    stream: i32,
) -> Vec<(AbstractID, u32)> {
    let mut cells: Vec<(usize, usize)> = Vec::new();
    for b in 0..streams_grid.rows() {
        for r in 0..streams_grid.cols() {
            if streams_grid.get(b, r) == stream {
                cells.push((b, r));
            }
        }
    }
    cells.sort_unstable();

    let mut sequence = Vec::new();
    for (timeblock, room) in cells {
        let (start, end) = instance.timeslot_range_of_timeblock(timeblock.into());
        let mut slot = start;
        while slot < end {
            let value = abstracts_grid.get(slot, room);
            if value == EMPTY {
                slot += 1;
                continue;
            }
            let abstract_id = AbstractID(value as u32);
            // skip past the rest of this abstract's contiguous run
            let run_len = instance.abstract_(abstract_id).timeslots;
            if let Some(order) = instance.abstract_(abstract_id).order {
                sequence.push((abstract_id, order));
            }
            slot += run_len.max(1);
        }
    }
    sequence
}

pub fn evaluate_order(streams_grid: &Grid, abstracts_grid: &Grid, instance: &Instance, streams: impl IntoIterator<Item = i32>) -> f64 {
    order_impl(streams_grid, abstracts_grid, instance, streams, None)
}

pub fn order_violations(
    streams_grid: &Grid,
    abstracts_grid: &Grid,
    instance: &Instance,
    streams: impl IntoIterator<Item = i32>,
) -> Vec<(AbstractID, f64)> {
    let mut out = Vec::new();
    order_impl(streams_grid, abstracts_grid, instance, streams, Some(&mut out));
    out
}

fn order_impl(
    streams_grid: &Grid,
    abstracts_grid: &Grid,
    instance: &Instance,
    streams: impl IntoIterator<Item = i32>,
    mut violations: Option<&mut Vec<(AbstractID, f64)>>,
) -> f64 {
    let mut total = 0.0;
    for stream in streams {
        let sequence = presentation_sequence(streams_grid, abstracts_grid, instance, stream);
        for i in 0..sequence.len() {
            let (abstract_id, order) = sequence[i];
            let mut abstract_penalty = 0.0;
            for &(_, succ_order) in &sequence[i + 1..] {
                if order > succ_order {
                    abstract_penalty += 1.0;
                }
            }
            total += abstract_penalty;
            if abstract_penalty > 0.0 {
                if let Some(v) = violations.as_deref_mut() {
                    v.push((abstract_id, abstract_penalty));
                }
            }
        }
    }
    total
}

/// Streams whose assignment in `streams_grid` touches any of the rows/cols
/// in a move against `abstracts_grid` (rows there are timeslots, mapped back
/// to timeblocks before indexing into `streams_grid`).
fn changed_streams_from_abstracts_move(streams_grid: &Grid, instance: &Instance, mv: &Move) -> HashSet<i32> {
    mv.cells_touched()
        .into_iter()
        .map(|(timeslot, room)| {
            let timeblock = instance.timeblock_of_timeslot(timeslot);
            streams_grid.get(usize::from(timeblock), room)
        })
        .filter(|&s| s != EMPTY)
        .collect()
}

pub fn delta_order(old: &Grid, new: &Grid, mv: &Move, streams_grid: &Grid, instance: &Instance) -> f64 {
    let streams = changed_streams_from_abstracts_move(streams_grid, instance, mv);
    evaluate_order(streams_grid, new, instance, streams.iter().copied()) - evaluate_order(streams_grid, old, instance, streams)
}

/// Abstracts-vs-sessions: each distinct abstract is charged its
/// per-timeblock cost once per timeblock it appears in.
pub fn evaluate_sessions(grid: &Grid, instance: &Instance) -> f64 {
    sessions_impl(grid, instance, None)
}

pub fn sessions_violations(grid: &Grid, instance: &Instance) -> Vec<(AbstractID, usize, f64)> {
    let mut out = Vec::new();
    sessions_impl(grid, instance, Some(&mut out));
    out
}

fn sessions_impl(grid: &Grid, instance: &Instance, mut violations: Option<&mut Vec<(AbstractID, usize, f64)>>) -> f64 {
    let mut total = 0.0;
    for timeblock in 0..instance.num_timeblocks() {
        let (start, end) = instance.timeslot_range_of_timeblock(timeblock.into());
        let mut seen = HashSet::new();
        for slot in start..end {
            for room in 0..grid.cols() {
                let value = grid.get(slot, room);
                if value == EMPTY || !seen.insert(value) {
                    continue;
                }
                let abstract_id = AbstractID(value as u32);
                let cost = instance.abstract_(abstract_id).timeblock_cost(timeblock.into());
                total += cost;
                if cost != 0.0 {
                    if let Some(v) = violations.as_deref_mut() {
                        v.push((abstract_id, timeblock, cost));
                    }
                }
            }
        }
    }
    total
}

pub fn delta_sessions(old: &Grid, new: &Grid, mv: &Move, instance: &Instance) -> f64 {
    let mut delta = 0.0;
    let mut accounted_old: HashSet<(usize, i32)> = HashSet::new();
    let mut accounted_new: HashSet<(usize, i32)> = HashSet::new();
    for (timeslot, room) in mv.cells_touched() {
        let timeblock = usize::from(instance.timeblock_of_timeslot(timeslot));
        let old_value = old.get(timeslot, room);
        let new_value = new.get(timeslot, room);
        if old_value != EMPTY && accounted_old.insert((timeblock, old_value)) {
            delta -= instance.abstract_(AbstractID(old_value as u32)).timeblock_cost(timeblock.into());
        }
        if new_value != EMPTY && accounted_new.insert((timeblock, new_value)) {
            delta += instance.abstract_(AbstractID(new_value as u32)).timeblock_cost(timeblock.into());
        }
    }
    delta
}

fn find_timeblock_of_abstract(grid: &Grid, instance: &Instance, abstract_id: AbstractID) -> Option<usize> {
    let id = i32::from(abstract_id);
    for (row, _col, value) in grid.iter_occupied() {
        if value == id {
            return Some(usize::from(instance.timeblock_of_timeslot(row)));
        }
    }
    None
}

/// Clash + speaker-clash penalty: 1 point for each of an abstract's two
/// independent clash references that is scheduled in the same timeblock.
pub fn evaluate_conflicts(grid: &Grid, instance: &Instance, abstracts: impl IntoIterator<Item = AbstractID>) -> f64 {
    conflicts_impl(grid, instance, abstracts, None)
}

pub fn conflicts_violations(
    grid: &Grid,
    instance: &Instance,
    abstracts: impl IntoIterator<Item = AbstractID>,
) -> Vec<(AbstractID, AbstractID, usize)> {
    let mut out = Vec::new();
    conflicts_impl(grid, instance, abstracts, Some(&mut out));
    out
}

fn conflicts_impl(
    grid: &Grid,
    instance: &Instance,
    abstracts: impl IntoIterator<Item = AbstractID>,
    mut violations: Option<&mut Vec<(AbstractID, AbstractID, usize)>>,
) -> f64 {
    let mut total = 0.0;
    for abstract_id in abstracts {
        let Some(timeblock) = find_timeblock_of_abstract(grid, instance, abstract_id) else {
            continue;
        };
        for clash in [instance.abstract_(abstract_id).clash, instance.abstract_(abstract_id).speaker_clash] {
            let Some(clash_id) = clash else { continue };
            if find_timeblock_of_abstract(grid, instance, clash_id) == Some(timeblock) {
                total += 1.0;
                if let Some(v) = violations.as_deref_mut() {
                    v.push((abstract_id, clash_id, timeblock));
                }
            }
        }
    }
    total
}

pub fn delta_conflicts(old: &Grid, new: &Grid, mv: &Move, instance: &Instance) -> f64 {
    let touched = touched_abstracts(old, new, mv);
    evaluate_conflicts(new, instance, touched.iter().copied()) - evaluate_conflicts(old, instance, touched)
}

pub fn evaluate(streams_grid: &Grid, abstracts_grid: &Grid, instance: &Instance) -> AbstractsPenalties {
    let all_abstracts: Vec<AbstractID> = (0..instance.num_abstracts()).map(AbstractID::from).collect();
    let all_streams: Vec<i32> = (0..instance.num_streams() as i32).collect();
    AbstractsPenalties {
        scheduled: evaluate_unscheduled(abstracts_grid, all_abstracts.iter().copied()),
        order: evaluate_order(streams_grid, abstracts_grid, instance, all_streams),
        sessions: evaluate_sessions(abstracts_grid, instance),
        conflicts: evaluate_conflicts(abstracts_grid, instance, all_abstracts),
    }
}

pub fn violations(streams_grid: &Grid, abstracts_grid: &Grid, instance: &Instance) -> AbstractsViolations {
    let all_abstracts: Vec<AbstractID> = (0..instance.num_abstracts()).map(AbstractID::from).collect();
    let all_streams: Vec<i32> = (0..instance.num_streams() as i32).collect();
    AbstractsViolations {
        scheduled: unscheduled_violations(abstracts_grid, all_abstracts.iter().copied()),
        order: order_violations(streams_grid, abstracts_grid, instance, all_streams),
        sessions: sessions_violations(abstracts_grid, instance),
        conflicts: conflicts_violations(abstracts_grid, instance, all_abstracts),
    }
}

pub fn delta(old: &Grid, mv: &Move, streams_grid: &Grid, instance: &Instance) -> AbstractsPenalties {
    let new = apply_out_of_place(old, mv);
    AbstractsPenalties {
        scheduled: delta_unscheduled(old, &new, mv),
        order: delta_order(old, &new, mv, streams_grid, instance),
        sessions: delta_sessions(old, &new, mv, instance),
        conflicts: delta_conflicts(old, &new, mv, instance),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{AbstractTable, RoomTable, StreamTable, TimeblockTable};
    use crate::instance::{Abstract, Room, Stream, Timeblock};
    use std::collections::HashMap;

    fn ordering_instance() -> Instance {
        let mut streams = StreamTable::new();
        streams.push(Stream::new("S", HashMap::new(), HashMap::new(), HashMap::new()));
        let mut rooms = RoomTable::new();
        rooms.push(Room::new("R", HashMap::new(), HashMap::new()));
        let mut timeblocks = TimeblockTable::new();
        timeblocks.push(Timeblock::new("T", 0, 0, 3, HashMap::new(), HashMap::new()));
        let mut abstracts = AbstractTable::new();
        abstracts.push(Abstract::new("a0", StreamID::from(0), 1, HashMap::new(), Some(3), None, None));
        abstracts.push(Abstract::new("a1", StreamID::from(0), 1, HashMap::new(), Some(1), None, None));
        abstracts.push(Abstract::new("a2", StreamID::from(0), 1, HashMap::new(), Some(2), None, None));
        Instance::new(streams, rooms, timeblocks, abstracts)
    }

    use crate::ids::StreamID;

    #[test]
    fn order_penalty_is_zero_when_already_sorted() {
        let instance = ordering_instance();
        let mut streams_grid = Grid::new(1, 1);
        streams_grid.set(0, 0, 0);
        let mut abstracts_grid = Grid::new(3, 1);
        abstracts_grid.set(0, 0, 1); // order 1
        abstracts_grid.set(1, 0, 2); // order 2
        abstracts_grid.set(2, 0, 0); // order 3
        let penalty = evaluate_order(&streams_grid, &abstracts_grid, &instance, [0]);
        assert_eq!(penalty, 0.0);
    }

    #[test]
    fn order_penalty_counts_inversions() {
        let instance = ordering_instance();
        let mut streams_grid = Grid::new(1, 1);
        streams_grid.set(0, 0, 0);
        let mut abstracts_grid = Grid::new(3, 1);
        abstracts_grid.set(0, 0, 0); // order 3 first
        abstracts_grid.set(1, 0, 1); // order 1 second
        abstracts_grid.set(2, 0, 2); // order 2 third
        // pairs: (3,1) inversion, (3,2) inversion, (1,2) ok => 2
        let penalty = evaluate_order(&streams_grid, &abstracts_grid, &instance, [0]);
        assert_eq!(penalty, 2.0);
    }

    #[test]
    fn clash_penalty_counts_same_timeblock_pairs() {
        let mut streams = StreamTable::new();
        streams.push(Stream::new("S", HashMap::new(), HashMap::new(), HashMap::new()));
        let mut rooms = RoomTable::new();
        rooms.push(Room::new("R1", HashMap::new(), HashMap::new()));
        rooms.push(Room::new("R2", HashMap::new(), HashMap::new()));
        let mut timeblocks = TimeblockTable::new();
        timeblocks.push(Timeblock::new("T", 0, 0, 1, HashMap::new(), HashMap::new()));
        let mut abstracts = AbstractTable::new();
        abstracts.push(Abstract::new("a0", StreamID::from(0), 1, HashMap::new(), None, Some(AbstractID(1)), None));
        abstracts.push(Abstract::new("a1", StreamID::from(0), 1, HashMap::new(), None, Some(AbstractID(0)), None));
        let instance = Instance::new(streams, rooms, timeblocks, abstracts);

        let mut grid = Grid::new(1, 2);
        grid.set(0, 0, 0);
        grid.set(0, 1, 1);
        let penalty = evaluate_conflicts(&grid, &instance, [AbstractID(0), AbstractID(1)]);
        assert_eq!(penalty, 2.0); // both directions counted
    }
}
