//! The immutable problem description: streams, rooms, timeblocks, abstracts,
//! and all of the penalty matrices that relate them to one another.
//!
//! An `Instance` is built once (by [`crate::io`]) and never mutated again.
//! Everything the search touches — penalty lookups, required-session counts,
//! timeslot/timeblock bookkeeping — is either stored directly on an entity or
//! precomputed once in [`Instance::new`] and exposed as a derived map.

use std::collections::HashMap;

use crate::ids::{AbstractID, AbstractTable, RoomID, RoomTable, StreamID, StreamTable, TimeblockID, TimeblockTable};

/// A thematic track: a cluster of abstracts that should end up close to one
/// another in the schedule, and whose talks must not be stolen by another
/// stream's timeblock.
#[derive(Clone, Debug)]
pub struct Stream {
    pub name: String,
    room_costs: HashMap<RoomID, f64>,
    timeblock_costs: HashMap<TimeblockID, f64>,
    conflict_costs: HashMap<StreamID, f64>,
}

impl Stream {
    pub fn new(
        name: impl Into<String>,
        room_costs: HashMap<RoomID, f64>,
        timeblock_costs: HashMap<TimeblockID, f64>,
        conflict_costs: HashMap<StreamID, f64>,
    ) -> Self {
        Stream {
            name: name.into(),
            room_costs,
            timeblock_costs,
            conflict_costs,
        }
    }

    pub fn room_cost(&self, room: RoomID) -> f64 {
        self.room_costs.get(&room).copied().unwrap_or(0.0)
    }

    pub fn timeblock_cost(&self, timeblock: TimeblockID) -> f64 {
        self.timeblock_costs.get(&timeblock).copied().unwrap_or(0.0)
    }

    pub fn conflict_cost(&self, other: StreamID) -> f64 {
        self.conflict_costs.get(&other).copied().unwrap_or(0.0)
    }
}

/// A physical room, with the per-stream and per-timeblock costs of using it.
#[derive(Clone, Debug)]
pub struct Room {
    pub name: String,
    stream_costs: HashMap<StreamID, f64>,
    timeblock_costs: HashMap<TimeblockID, f64>,
}

impl Room {
    pub fn new(
        name: impl Into<String>,
        stream_costs: HashMap<StreamID, f64>,
        timeblock_costs: HashMap<TimeblockID, f64>,
    ) -> Self {
        Room {
            name: name.into(),
            stream_costs,
            timeblock_costs,
        }
    }

    pub fn stream_cost(&self, stream: StreamID) -> f64 {
        self.stream_costs.get(&stream).copied().unwrap_or(0.0)
    }

    pub fn timeblock_cost(&self, timeblock: TimeblockID) -> f64 {
        self.timeblock_costs.get(&timeblock).copied().unwrap_or(0.0)
    }
}

/// A named, day-anchored container of `num_timeslots` equal-length talk slots.
///
/// Timeblocks form a contiguous, non-overlapping partition of `[0, T)`, where
/// `T` is the instance's total timeslot count; `start` is the prefix sum used
/// to map a global timeslot back to its owning timeblock.
#[derive(Clone, Debug)]
pub struct Timeblock {
    pub name: String,
    pub day: u32,
    pub start: usize,
    pub num_timeslots: usize,
    stream_costs: HashMap<StreamID, f64>,
    room_costs: HashMap<RoomID, f64>,
}

impl Timeblock {
    pub fn new(
        name: impl Into<String>,
        day: u32,
        start: usize,
        num_timeslots: usize,
        stream_costs: HashMap<StreamID, f64>,
        room_costs: HashMap<RoomID, f64>,
    ) -> Self {
        Timeblock {
            name: name.into(),
            day,
            start,
            num_timeslots,
            stream_costs,
            room_costs,
        }
    }

    pub fn end(&self) -> usize {
        self.start + self.num_timeslots
    }

    pub fn room_cost(&self, room: RoomID) -> f64 {
        self.room_costs.get(&room).copied().unwrap_or(0.0)
    }

    pub fn stream_cost(&self, stream: StreamID) -> f64 {
        self.stream_costs.get(&stream).copied().unwrap_or(0.0)
    }
}

/// A single talk: its duration in timeslots, the stream it belongs to, its
/// presentation order within that stream, and the other abstracts it clashes
/// with.
#[derive(Clone, Debug)]
pub struct Abstract {
    pub reference: String,
    pub stream: StreamID,
    pub timeslots: usize,
    timeblock_costs: HashMap<TimeblockID, f64>,
    pub order: Option<u32>,
    pub clash: Option<AbstractID>,
    pub speaker_clash: Option<AbstractID>,
}

impl Abstract {
    pub fn new(
        reference: impl Into<String>,
        stream: StreamID,
        timeslots: usize,
        timeblock_costs: HashMap<TimeblockID, f64>,
        order: Option<u32>,
        clash: Option<AbstractID>,
        speaker_clash: Option<AbstractID>,
    ) -> Self {
        assert!(timeslots >= 1, "an abstract must require at least one timeslot");
        Abstract {
            reference: reference.into(),
            stream,
            timeslots,
            timeblock_costs,
            order,
            clash,
            speaker_clash,
        }
    }

    pub fn timeblock_cost(&self, timeblock: TimeblockID) -> f64 {
        self.timeblock_costs.get(&timeblock).copied().unwrap_or(0.0)
    }
}

/// The immutable problem description, built once by [`crate::io`] and shared
/// read-only by both schedulers for the lifetime of a run.
#[derive(Clone, Debug)]
pub struct Instance {
    streams: StreamTable<Stream>,
    rooms: RoomTable<Room>,
    timeblocks: TimeblockTable<Timeblock>,
    abstracts: AbstractTable<Abstract>,

    streams_by_name: HashMap<String, StreamID>,
    abstracts_by_ref: HashMap<String, AbstractID>,

    timeblock_of_timeslot: Vec<TimeblockID>,
    required_sessions_per_stream: StreamTable<usize>,
}

impl Instance {
    pub fn new(
        streams: StreamTable<Stream>,
        rooms: RoomTable<Room>,
        timeblocks: TimeblockTable<Timeblock>,
        abstracts: AbstractTable<Abstract>,
    ) -> Self {
        let streams_by_name = streams
            .iter_enumerated()
            .map(|(id, s)| (s.name.clone(), id))
            .collect();
        let abstracts_by_ref = abstracts
            .iter_enumerated()
            .map(|(id, a)| (a.reference.clone(), id))
            .collect();

        let mut timeblock_of_timeslot = Vec::new();
        for (id, timeblock) in timeblocks.iter_enumerated() {
            for _ in 0..timeblock.num_timeslots {
                timeblock_of_timeslot.push(id);
            }
        }

        let avg_talks_per_session = if timeblocks.is_empty() {
            0.0
        } else {
            timeblocks.iter().map(|t| t.num_timeslots).sum::<usize>() as f64 / timeblocks.len() as f64
        };

        let required_sessions_per_stream = streams
            .iter_enumerated()
            .map(|(id, _)| {
                let total_timeslots: usize = abstracts
                    .iter()
                    .filter(|a| a.stream == id)
                    .map(|a| a.timeslots)
                    .sum();
                if avg_talks_per_session <= 0.0 {
                    0
                } else {
                    (total_timeslots as f64 / avg_talks_per_session).ceil() as usize
                }
            })
            .collect();

        Instance {
            streams,
            rooms,
            timeblocks,
            abstracts,
            streams_by_name,
            abstracts_by_ref,
            timeblock_of_timeslot,
            required_sessions_per_stream,
        }
    }

    pub fn streams(&self) -> &StreamTable<Stream> {
        &self.streams
    }

    pub fn rooms(&self) -> &RoomTable<Room> {
        &self.rooms
    }

    pub fn timeblocks(&self) -> &TimeblockTable<Timeblock> {
        &self.timeblocks
    }

    pub fn abstracts(&self) -> &AbstractTable<Abstract> {
        &self.abstracts
    }

    pub fn stream(&self, id: StreamID) -> &Stream {
        &self.streams[id]
    }

    pub fn room(&self, id: RoomID) -> &Room {
        &self.rooms[id]
    }

    pub fn timeblock(&self, id: TimeblockID) -> &Timeblock {
        &self.timeblocks[id]
    }

    pub fn abstract_(&self, id: AbstractID) -> &Abstract {
        &self.abstracts[id]
    }

    pub fn stream_by_name(&self, name: &str) -> Option<StreamID> {
        self.streams_by_name.get(name).copied()
    }

    pub fn abstract_by_ref(&self, reference: &str) -> Option<AbstractID> {
        self.abstracts_by_ref.get(reference).copied()
    }

    pub fn num_streams(&self) -> usize {
        self.streams.len()
    }

    pub fn num_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn num_timeblocks(&self) -> usize {
        self.timeblocks.len()
    }

    pub fn num_abstracts(&self) -> usize {
        self.abstracts.len()
    }

    pub fn num_timeslots(&self) -> usize {
        self.timeblock_of_timeslot.len()
    }

    pub fn timeblock_of_timeslot(&self, timeslot: usize) -> TimeblockID {
        self.timeblock_of_timeslot[timeslot]
    }

    pub fn timeslot_range_of_timeblock(&self, timeblock: TimeblockID) -> (usize, usize) {
        let tb = &self.timeblocks[timeblock];
        (tb.start, tb.end())
    }

    pub fn required_sessions(&self, stream: StreamID) -> usize {
        self.required_sessions_per_stream[stream]
    }

    pub fn abstracts_by_stream(&self, stream: StreamID) -> impl Iterator<Item = AbstractID> + '_ {
        self.abstracts
            .iter_enumerated()
            .filter(move |(_, a)| a.stream == stream)
            .map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_instance() -> Instance {
        Instance::new(StreamTable::new(), RoomTable::new(), TimeblockTable::new(), AbstractTable::new())
    }

    #[test]
    fn empty_instance_has_no_timeslots() {
        let instance = empty_instance();
        assert_eq!(instance.num_timeslots(), 0);
        assert_eq!(instance.num_streams(), 0);
    }

    #[test]
    fn timeblock_of_timeslot_respects_prefix_sums() {
        let mut timeblocks = TimeblockTable::new();
        timeblocks.push(Timeblock::new("A", 0, 0, 2, HashMap::new(), HashMap::new()));
        timeblocks.push(Timeblock::new("B", 0, 2, 3, HashMap::new(), HashMap::new()));
        let instance = Instance::new(StreamTable::new(), RoomTable::new(), timeblocks, AbstractTable::new());

        assert_eq!(instance.num_timeslots(), 5);
        assert_eq!(instance.timeblock_of_timeslot(0), TimeblockID(0));
        assert_eq!(instance.timeblock_of_timeslot(1), TimeblockID(0));
        assert_eq!(instance.timeblock_of_timeslot(2), TimeblockID(1));
        assert_eq!(instance.timeslot_range_of_timeblock(TimeblockID(1)), (2, 5));
    }

    #[test]
    fn required_sessions_uses_average_talks_per_session() {
        let mut timeblocks = TimeblockTable::new();
        timeblocks.push(Timeblock::new("A", 0, 0, 2, HashMap::new(), HashMap::new()));
        timeblocks.push(Timeblock::new("B", 0, 2, 2, HashMap::new(), HashMap::new()));

        let mut streams = StreamTable::new();
        streams.push(Stream::new("S", HashMap::new(), HashMap::new(), HashMap::new()));

        let mut abstracts = AbstractTable::new();
        abstracts.push(Abstract::new("A1", StreamID(0), 3, HashMap::new(), None, None, None));
        abstracts.push(Abstract::new("A2", StreamID(0), 2, HashMap::new(), None, None, None));

        let instance = Instance::new(streams, RoomTable::new(), timeblocks, abstracts);
        // total timeslots required = 5, avg talks per session = 2 -> ceil(5/2) = 3
        assert_eq!(instance.required_sessions(StreamID(0)), 3);
    }
}
