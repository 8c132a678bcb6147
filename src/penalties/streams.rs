//! Penalty terms that depend only on the streams grid (terms 1, 2, 4–7 of
//! SPEC_FULL.md §4.2.1). Term 3 (rooms-per-stream-with-surrogate) lives here
//! too, as a constant zero until a surrogate-room cost model exists.
//!
//! Every `evaluate_*` has a matching `delta_*` that recomputes the term only
//! over the streams/timeblocks touched by a move — see
//! [`crate::grid::Move::cells_touched`] and [`touched_streams`] below. The
//! delta-correctness property tying the two together is checked in
//! `tests/delta_correctness.rs`.

use std::collections::HashSet;

use crate::grid::{apply_out_of_place, Grid, Move, EMPTY};
use crate::ids::StreamID;
use crate::instance::Instance;

/// The streams-grid penalty breakdown, one field per weight slot that a
/// streams-grid term occupies (see [`crate::penalties::weights::Weights`]).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StreamsPenalties {
    pub parallel: f64,
    pub rooms_without_surrogate: f64,
    pub streams_sessions: f64,
    pub streams_rooms: f64,
    pub sessions_rooms: f64,
    pub streams_streams: f64,
    pub unscheduled: f64,
    pub consecutive: f64,
}

#[derive(Clone, Debug, Default)]
pub struct StreamsViolations {
    pub parallel: Vec<(StreamID, f64)>,
    pub number_of_rooms: Vec<(StreamID, f64)>,
    pub streams_sessions: Vec<(StreamID, usize, f64)>,
    pub streams_rooms: Vec<(StreamID, usize, f64)>,
    pub sessions_rooms: Vec<(usize, usize, f64)>,
    pub streams_streams: Vec<(StreamID, StreamID, usize, f64)>,
    pub unscheduled: Vec<StreamID>,
    pub consecutive: Vec<(StreamID, usize, f64)>,
}

/// Every stream id appearing at a touched cell, on either the old or the new
/// grid, excluding [`EMPTY`].
pub fn touched_streams(old: &Grid, new: &Grid, mv: &Move) -> HashSet<StreamID> {
    let mut streams = HashSet::new();
    for (row, col) in mv.cells_touched() {
        let before = old.get(row, col);
        let after = new.get(row, col);
        if before != EMPTY {
            streams.insert(StreamID(before as u32));
        }
        if after != EMPTY {
            streams.insert(StreamID(after as u32));
        }
    }
    streams
}

/// The theoretical minimum of `Σ_b c_b·(c_b−1)/2` achievable by spreading
/// `required` occurrences as evenly as possible across `num_timeblocks` rows.
pub fn minimum_parallel_sessions(num_timeblocks: usize, required: usize) -> f64 {
    if num_timeblocks == 0 {
        return 0.0;
    }
    let d = (required / num_timeblocks) as f64;
    let e = (required % num_timeblocks) as f64;
    let diff = num_timeblocks as f64 - e;
    (diff * d * (d - 1.0) + e * (d + 1.0) * d) / 2.0
}

fn occurrences_per_timeblock(grid: &Grid, stream: StreamID) -> Vec<usize> {
    let id = i32::from(stream);
    (0..grid.rows())
        .map(|b| (0..grid.cols()).filter(|&r| grid.get(b, r) == id).count())
        .collect()
}

pub fn evaluate_parallel_streams(grid: &Grid, instance: &Instance, streams: impl IntoIterator<Item = StreamID>) -> f64 {
    parallel_streams_impl(grid, instance, streams, None)
}

pub fn parallel_streams_violations(grid: &Grid, instance: &Instance, streams: impl IntoIterator<Item = StreamID>) -> Vec<(StreamID, f64)> {
    let mut out = Vec::new();
    parallel_streams_impl(grid, instance, streams, Some(&mut out));
    out
}

fn parallel_streams_impl(
    grid: &Grid,
    instance: &Instance,
    streams: impl IntoIterator<Item = StreamID>,
    mut violations: Option<&mut Vec<(StreamID, f64)>>,
) -> f64 {
    let mut penalty = 0.0;
    for stream in streams {
        let counts = occurrences_per_timeblock(grid, stream);
        let raw: f64 = counts.iter().map(|&c| (c * c.saturating_sub(1)) as f64 / 2.0).sum();
        let min = minimum_parallel_sessions(grid.rows(), instance.required_sessions(stream));
        let stream_penalty = (raw - min).max(0.0);
        penalty += stream_penalty;
        if stream_penalty > 0.0 {
            if let Some(v) = violations.as_deref_mut() {
                v.push((stream, stream_penalty));
            }
        }
    }
    penalty
}

pub fn delta_parallel_streams(old: &Grid, new: &Grid, mv: &Move, instance: &Instance) -> f64 {
    let streams = touched_streams(old, new, mv);
    evaluate_parallel_streams(new, instance, streams.iter().copied()) - evaluate_parallel_streams(old, instance, streams)
}

fn stream_num_rooms(grid: &Grid, stream: StreamID) -> usize {
    let id = i32::from(stream);
    (0..grid.cols()).filter(|&r| (0..grid.rows()).any(|b| grid.get(b, r) == id)).count()
}

pub fn evaluate_rooms_per_stream(grid: &Grid, instance: &Instance, streams: impl IntoIterator<Item = StreamID>) -> f64 {
    rooms_per_stream_impl(grid, instance, streams, None)
}

pub fn rooms_per_stream_violations(grid: &Grid, instance: &Instance, streams: impl IntoIterator<Item = StreamID>) -> Vec<(StreamID, f64)> {
    let mut out = Vec::new();
    rooms_per_stream_impl(grid, instance, streams, Some(&mut out));
    out
}

fn rooms_per_stream_impl(
    grid: &Grid,
    instance: &Instance,
    streams: impl IntoIterator<Item = StreamID>,
    mut violations: Option<&mut Vec<(StreamID, f64)>>,
) -> f64 {
    let mut penalty = 0.0;
    if grid.rows() == 0 {
        return 0.0;
    }
    for stream in streams {
        let used = stream_num_rooms(grid, stream);
        let min_rooms = (instance.required_sessions(stream) as f64 / grid.rows() as f64).ceil() as usize;
        let stream_penalty = used.saturating_sub(min_rooms) as f64;
        penalty += stream_penalty;
        if stream_penalty > 0.0 {
            if let Some(v) = violations.as_deref_mut() {
                v.push((stream, stream_penalty));
            }
        }
    }
    penalty
}

pub fn delta_rooms_per_stream(old: &Grid, new: &Grid, mv: &Move, instance: &Instance) -> f64 {
    let streams = touched_streams(old, new, mv);
    evaluate_rooms_per_stream(new, instance, streams.iter().copied()) - evaluate_rooms_per_stream(old, instance, streams)
}

/// Reserved for a future surrogate-room cost model; always zero today (see
/// SPEC_FULL.md §4.2.1, term 3).
pub fn evaluate_rooms_per_stream_surrogate(_grid: &Grid, _instance: &Instance) -> f64 {
    0.0
}

pub fn delta_rooms_per_stream_surrogate(_old: &Grid, _new: &Grid, _mv: &Move, _instance: &Instance) -> f64 {
    0.0
}

/// The additive streams×sessions / streams×rooms / sessions×rooms lookups
/// (term 4), evaluated together since they share a single pass over the
/// grid.
pub fn evaluate_lookup_penalties(grid: &Grid, instance: &Instance) -> (f64, f64, f64) {
    lookup_penalties_impl(grid, instance, None)
}

#[derive(Default)]
pub struct LookupViolations {
    pub streams_sessions: Vec<(StreamID, usize, f64)>,
    pub streams_rooms: Vec<(StreamID, usize, f64)>,
    pub sessions_rooms: Vec<(usize, usize, f64)>,
}

pub fn lookup_penalties_violations(grid: &Grid, instance: &Instance) -> LookupViolations {
    let mut v = LookupViolations::default();
    lookup_penalties_impl(grid, instance, Some(&mut v));
    v
}

fn lookup_penalties_impl(grid: &Grid, instance: &Instance, mut violations: Option<&mut LookupViolations>) -> (f64, f64, f64) {
    let mut totals = (0.0, 0.0, 0.0);
    for b in 0..grid.rows() {
        let timeblock = b.into();
        for r in 0..grid.cols() {
            let value = grid.get(b, r);
            if value == EMPTY {
                continue;
            }
            let stream = StreamID(value as u32);
            let stream_session = instance.stream(stream).timeblock_cost(timeblock);
            let stream_room = instance.stream(stream).room_cost(r.into());
            let session_room = instance.timeblock(timeblock).room_cost(r.into());
            totals.0 += stream_session;
            totals.1 += stream_room;
            totals.2 += session_room;
            if let Some(v) = violations.as_deref_mut() {
                if stream_session != 0.0 {
                    v.streams_sessions.push((stream, b, stream_session));
                }
                if stream_room != 0.0 {
                    v.streams_rooms.push((stream, r, stream_room));
                }
                if session_room != 0.0 {
                    v.sessions_rooms.push((b, r, session_room));
                }
            }
        }
    }
    totals
}

pub fn delta_lookup_penalties(old: &Grid, new: &Grid, mv: &Move, instance: &Instance) -> (f64, f64, f64) {
    let mut deltas = (0.0, 0.0, 0.0);
    for (row, col) in mv.cells_touched() {
        let timeblock = row.into();
        let old_value = old.get(row, col);
        let new_value = new.get(row, col);
        if old_value != EMPTY {
            let stream = StreamID(old_value as u32);
            deltas.0 -= instance.stream(stream).timeblock_cost(timeblock);
            deltas.1 -= instance.stream(stream).room_cost(col.into());
            deltas.2 -= instance.timeblock(timeblock).room_cost(col.into());
        }
        if new_value != EMPTY {
            let stream = StreamID(new_value as u32);
            deltas.0 += instance.stream(stream).timeblock_cost(timeblock);
            deltas.1 += instance.stream(stream).room_cost(col.into());
            deltas.2 += instance.timeblock(timeblock).room_cost(col.into());
        }
    }
    deltas
}

/// Intra-timeblock stream-vs-stream conflict cost (term 5). Counted in both
/// directions for every ordered pair of distinct occupied columns, matching
/// the source semantics.
pub fn evaluate_streams_streams(grid: &Grid, instance: &Instance, timeblocks: impl IntoIterator<Item = usize>) -> f64 {
    streams_streams_impl(grid, instance, timeblocks, None)
}

pub fn streams_streams_violations(
    grid: &Grid,
    instance: &Instance,
    timeblocks: impl IntoIterator<Item = usize>,
) -> Vec<(StreamID, StreamID, usize, f64)> {
    let mut out = Vec::new();
    streams_streams_impl(grid, instance, timeblocks, Some(&mut out));
    out
}

fn streams_streams_impl(
    grid: &Grid,
    instance: &Instance,
    timeblocks: impl IntoIterator<Item = usize>,
    mut violations: Option<&mut Vec<(StreamID, StreamID, usize, f64)>>,
) -> f64 {
    let mut penalty = 0.0;
    for b in timeblocks {
        for r in 0..grid.cols() {
            let stream = grid.get(b, r);
            if stream == EMPTY {
                continue;
            }
            for r2 in 0..grid.cols() {
                if r == r2 {
                    continue;
                }
                let other = grid.get(b, r2);
                if other == EMPTY || other == stream {
                    continue;
                }
                let cost = instance.stream(StreamID(stream as u32)).conflict_cost(StreamID(other as u32));
                penalty += cost;
                if cost != 0.0 {
                    if let Some(v) = violations.as_deref_mut() {
                        v.push((StreamID(stream as u32), StreamID(other as u32), b, cost));
                    }
                }
            }
        }
    }
    penalty
}

pub fn delta_streams_streams(old: &Grid, new: &Grid, mv: &Move, instance: &Instance) -> f64 {
    let rows: HashSet<usize> = mv.rows.iter().copied().collect();
    evaluate_streams_streams(new, instance, rows.iter().copied()) - evaluate_streams_streams(old, instance, rows)
}

/// Count of streams that appear zero times anywhere in the grid.
pub fn evaluate_unscheduled_streams(grid: &Grid, streams: impl IntoIterator<Item = StreamID>) -> f64 {
    let present: HashSet<i32> = grid.values().iter().copied().filter(|&v| v != EMPTY).collect();
    streams.into_iter().filter(|s| !present.contains(&i32::from(*s))).count() as f64
}

pub fn unscheduled_streams_violations(grid: &Grid, streams: impl IntoIterator<Item = StreamID>) -> Vec<StreamID> {
    let present: HashSet<i32> = grid.values().iter().copied().filter(|&v| v != EMPTY).collect();
    streams.into_iter().filter(|s| !present.contains(&i32::from(*s))).collect()
}

pub fn delta_unscheduled_streams(old: &Grid, new: &Grid, mv: &Move) -> f64 {
    let streams = touched_streams(old, new, mv);
    evaluate_unscheduled_streams(new, streams.iter().copied()) - evaluate_unscheduled_streams(old, streams)
}

/// Number of "gaps" splitting a stream's occupancy of a room beyond the
/// first contiguous run (term 7).
pub fn evaluate_consecutive_sessions(grid: &Grid, streams: impl IntoIterator<Item = StreamID>) -> f64 {
    consecutive_sessions_impl(grid, streams, None)
}

pub fn consecutive_sessions_violations(grid: &Grid, streams: impl IntoIterator<Item = StreamID>) -> Vec<(StreamID, usize, f64)> {
    let mut out = Vec::new();
    consecutive_sessions_impl(grid, streams, Some(&mut out));
    out
}

fn consecutive_sessions_impl(
    grid: &Grid,
    streams: impl IntoIterator<Item = StreamID>,
    mut violations: Option<&mut Vec<(StreamID, usize, f64)>>,
) -> f64 {
    let mut total = 0.0;
    let num_timeblocks = grid.rows();
    for stream in streams {
        let id = i32::from(stream);
        for room in 0..grid.cols() {
            let mut count = 0usize;
            let mut adjacent = 0usize;
            for b in 0..num_timeblocks.saturating_sub(1) {
                if grid.get(b, room) == id {
                    count += 1;
                    if grid.get(b + 1, room) == id {
                        adjacent += 1;
                    }
                }
            }
            if num_timeblocks > 0 && grid.get(num_timeblocks - 1, room) == id {
                count += 1;
            }
            let penalty = count as isize - adjacent as isize - 1;
            if penalty > 0 {
                total += penalty as f64;
                if let Some(v) = violations.as_deref_mut() {
                    v.push((stream, room, penalty as f64));
                }
            }
        }
    }
    total
}

pub fn delta_consecutive_sessions(old: &Grid, new: &Grid, mv: &Move) -> f64 {
    let streams = touched_streams(old, new, mv);
    evaluate_consecutive_sessions(new, streams.iter().copied()) - evaluate_consecutive_sessions(old, streams)
}

/// Evaluate every streams-grid term against the full grid.
pub fn evaluate(grid: &Grid, instance: &Instance) -> StreamsPenalties {
    let all_streams: Vec<StreamID> = (0..instance.num_streams()).map(StreamID::from).collect();
    let (streams_sessions, streams_rooms, sessions_rooms) = evaluate_lookup_penalties(grid, instance);
    StreamsPenalties {
        parallel: evaluate_parallel_streams(grid, instance, all_streams.iter().copied()),
        rooms_without_surrogate: evaluate_rooms_per_stream(grid, instance, all_streams.iter().copied()),
        streams_sessions,
        streams_rooms,
        sessions_rooms,
        streams_streams: evaluate_streams_streams(grid, instance, 0..grid.rows()),
        unscheduled: evaluate_unscheduled_streams(grid, all_streams.iter().copied()),
        consecutive: evaluate_consecutive_sessions(grid, all_streams),
    }
}

pub fn violations(grid: &Grid, instance: &Instance) -> StreamsViolations {
    let all_streams: Vec<StreamID> = (0..instance.num_streams()).map(StreamID::from).collect();
    let lookup = lookup_penalties_violations(grid, instance);
    StreamsViolations {
        parallel: parallel_streams_violations(grid, instance, all_streams.iter().copied()),
        number_of_rooms: rooms_per_stream_violations(grid, instance, all_streams.iter().copied()),
        streams_sessions: lookup.streams_sessions,
        streams_rooms: lookup.streams_rooms,
        sessions_rooms: lookup.sessions_rooms,
        streams_streams: streams_streams_violations(grid, instance, 0..grid.rows()),
        unscheduled: unscheduled_streams_violations(grid, all_streams.iter().copied()),
        consecutive: consecutive_sessions_violations(grid, all_streams),
    }
}

/// Delta of the full weighted streams breakdown for a single move; this is
/// the hot-path function the search loop actually calls.
pub fn delta(old: &Grid, mv: &Move, instance: &Instance) -> StreamsPenalties {
    let new = apply_out_of_place(old, mv);
    let (d_ss, d_sr, d_tr) = delta_lookup_penalties(old, &new, mv, instance);
    StreamsPenalties {
        parallel: delta_parallel_streams(old, &new, mv, instance),
        rooms_without_surrogate: delta_rooms_per_stream(old, &new, mv, instance),
        streams_sessions: d_ss,
        streams_rooms: d_sr,
        sessions_rooms: d_tr,
        streams_streams: delta_streams_streams(old, &new, mv, instance),
        unscheduled: delta_unscheduled_streams(old, &new, mv),
        consecutive: delta_consecutive_sessions(old, &new, mv),
    }
}
