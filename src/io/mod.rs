//! Format-agnostic I/O boundary (§4.9): an in-memory `Sheets` shape that
//! both the xlsx codec and [`crate::checks`]/[`Instance::new`] agree on, so
//! only [`xlsx`] ever needs to know what a workbook actually is.

pub mod xlsx;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ids::{AbstractTable, RoomTable, StreamID, StreamTable, TimeblockID, TimeblockTable};
use crate::instance::{Abstract, Instance, Room, Stream, Timeblock};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StreamRow {
    pub name: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RoomRow {
    pub name: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionRow {
    pub name: String,
    pub day: u32,
    pub num_timeslots: usize,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AbstractRow {
    pub reference: String,
    pub stream: String,
    pub required_timeslots: usize,
    pub order: Option<u32>,
    pub clash: Option<String>,
    pub speaker_clash: Option<String>,
}

/// The four entity sheets plus four penalty lookups, independent of any
/// backing file format. This is what [`xlsx::read`] produces and what
/// [`Instance::from_sheets`] and [`crate::checks`] both consume.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Sheets {
    pub streams: Vec<StreamRow>,
    pub rooms: Vec<RoomRow>,
    pub sessions: Vec<SessionRow>,
    pub abstracts: Vec<AbstractRow>,

    /// `(stream name, session name) -> penalty`
    pub streams_sessions_penalty: HashMap<(String, String), f64>,
    /// `(stream name, room name) -> penalty`
    pub streams_rooms_penalty: HashMap<(String, String), f64>,
    /// `(session name, room name) -> penalty`
    pub sessions_rooms_penalty: HashMap<(String, String), f64>,
    /// `(stream name, stream name) -> penalty`
    pub streams_streams_penalty: HashMap<(String, String), f64>,
}

fn id_map<K: From<usize> + Copy>(names: impl Iterator<Item = String>) -> HashMap<String, K> {
    names.enumerate().map(|(i, name)| (name, K::from(i))).collect()
}

fn resolve<K: Copy>(sheet: &'static str, kind: &'static str, map: &HashMap<String, K>, name: &str) -> Result<K> {
    map.get(name).copied().ok_or_else(|| Error::UnknownReference {
        sheet: sheet.to_string(),
        kind,
        reference: name.to_string(),
    })
}

impl Instance {
    /// Resolve a format-agnostic [`Sheets`] value into a fully-indexed
    /// [`Instance`], failing fast on any dangling reference (§4.8).
    pub fn from_sheets(sheets: &Sheets) -> Result<Instance> {
        let streams_by_name: HashMap<String, StreamID> = id_map(sheets.streams.iter().map(|r| r.name.clone()));
        let rooms_by_name: HashMap<String, crate::ids::RoomID> = id_map(sheets.rooms.iter().map(|r| r.name.clone()));
        let timeblocks_by_name: HashMap<String, TimeblockID> = id_map(sheets.sessions.iter().map(|r| r.name.clone()));
        let abstracts_by_ref: HashMap<String, crate::ids::AbstractID> = id_map(sheets.abstracts.iter().map(|r| r.reference.clone()));

        let mut streams_room_costs: Vec<HashMap<crate::ids::RoomID, f64>> = vec![HashMap::new(); sheets.streams.len()];
        let mut rooms_stream_costs: Vec<HashMap<StreamID, f64>> = vec![HashMap::new(); sheets.rooms.len()];
        let mut streams_timeblock_costs: Vec<HashMap<TimeblockID, f64>> = vec![HashMap::new(); sheets.streams.len()];
        let mut streams_conflict_costs: Vec<HashMap<StreamID, f64>> = vec![HashMap::new(); sheets.streams.len()];
        let mut timeblocks_stream_costs: Vec<HashMap<StreamID, f64>> = vec![HashMap::new(); sheets.sessions.len()];
        for ((stream, room), &penalty) in &sheets.streams_rooms_penalty {
            let s = resolve("streams_rooms|penalty", "stream", &streams_by_name, stream)?;
            let r = resolve("streams_rooms|penalty", "room", &rooms_by_name, room)?;
            streams_room_costs[usize::from(s)].insert(r, penalty);
            rooms_stream_costs[usize::from(r)].insert(s, penalty);
        }
        for ((stream, session), &penalty) in &sheets.streams_sessions_penalty {
            let s = resolve("streams_sessions|penalty", "stream", &streams_by_name, stream)?;
            let b = resolve("streams_sessions|penalty", "session", &timeblocks_by_name, session)?;
            streams_timeblock_costs[usize::from(s)].insert(b, penalty);
            timeblocks_stream_costs[usize::from(b)].insert(s, penalty);
        }
        for ((a, b), &penalty) in &sheets.streams_streams_penalty {
            let sa = resolve("streams_streams|penalty", "stream", &streams_by_name, a)?;
            let sb = resolve("streams_streams|penalty", "stream", &streams_by_name, b)?;
            streams_conflict_costs[usize::from(sa)].insert(sb, penalty);
        }

        let mut rooms_timeblock_costs: Vec<HashMap<TimeblockID, f64>> = vec![HashMap::new(); sheets.rooms.len()];
        let mut timeblocks_room_costs: Vec<HashMap<crate::ids::RoomID, f64>> = vec![HashMap::new(); sheets.sessions.len()];
        for ((session, room), &penalty) in &sheets.sessions_rooms_penalty {
            let b = resolve("sessions_rooms|penalty", "session", &timeblocks_by_name, session)?;
            let r = resolve("sessions_rooms|penalty", "room", &rooms_by_name, room)?;
            rooms_timeblock_costs[usize::from(r)].insert(b, penalty);
            timeblocks_room_costs[usize::from(b)].insert(r, penalty);
        }

        let mut streams: StreamTable<Stream> = StreamTable::new();
        for (i, row) in sheets.streams.iter().enumerate() {
            streams.push(Stream::new(
                row.name.clone(),
                std::mem::take(&mut streams_room_costs[i]),
                std::mem::take(&mut streams_timeblock_costs[i]),
                std::mem::take(&mut streams_conflict_costs[i]),
            ));
        }

        let mut rooms: RoomTable<Room> = RoomTable::new();
        for (i, row) in sheets.rooms.iter().enumerate() {
            rooms.push(Room::new(
                row.name.clone(),
                std::mem::take(&mut rooms_stream_costs[i]),
                std::mem::take(&mut rooms_timeblock_costs[i]),
            ));
        }

        let mut timeblocks: TimeblockTable<Timeblock> = TimeblockTable::new();
        let mut cursor = 0usize;
        for (i, row) in sheets.sessions.iter().enumerate() {
            timeblocks.push(Timeblock::new(
                row.name.clone(),
                row.day,
                cursor,
                row.num_timeslots,
                std::mem::take(&mut timeblocks_stream_costs[i]),
                std::mem::take(&mut timeblocks_room_costs[i]),
            ));
            cursor += row.num_timeslots;
        }

        // An abstract has no row of its own in `streams_sessions|penalty`; it
        // inherits its stream's per-timeblock cost, since term 10 is the same
        // streams-vs-sessions matrix applied at talk granularity rather than
        // a separate sheet.
        let mut abstracts: AbstractTable<Abstract> = AbstractTable::new();
        for row in &sheets.abstracts {
            let stream = resolve("abstracts", "stream", &streams_by_name, &row.stream)?;
            let clash = row.clash.as_ref().map(|r| resolve("abstracts", "abstract", &abstracts_by_ref, r)).transpose()?;
            let speaker_clash = row
                .speaker_clash
                .as_ref()
                .map(|r| resolve("abstracts", "abstract", &abstracts_by_ref, r))
                .transpose()?;
            let timeblock_costs: HashMap<TimeblockID, f64> = timeblocks
                .iter_enumerated()
                .map(|(timeblock, _)| (timeblock, streams[stream].timeblock_cost(timeblock)))
                .filter(|(_, cost)| *cost != 0.0)
                .collect();
            abstracts.push(Abstract::new(
                row.reference.clone(),
                stream,
                row.required_timeslots,
                timeblock_costs,
                row.order,
                clash,
                speaker_clash,
            ));
        }

        Ok(Instance::new(streams, rooms, timeblocks, abstracts))
    }
}

/// Render a finished stream/abstract grid pair plus their violation reports
/// into output sheets (§4.9). Kept format-agnostic; [`xlsx::write`] is the
/// only place that turns this into actual worksheet cells.
pub struct ScheduleOutput {
    pub streams_solution: Vec<Vec<String>>,
    pub abstracts_solution: Vec<Vec<String>>,
    pub streams_violations: Vec<String>,
    pub abstracts_violations: Vec<String>,
}

pub fn write_schedule(
    instance: &Instance,
    streams_grid: &crate::grid::Grid,
    abstracts_grid: &crate::grid::Grid,
    streams_violations: &crate::penalties::streams::StreamsViolations,
    abstracts_violations: &crate::penalties::abstracts::AbstractsViolations,
) -> ScheduleOutput {
    let streams_solution = (0..streams_grid.rows())
        .map(|b| {
            (0..streams_grid.cols())
                .map(|r| {
                    let v = streams_grid.get(b, r);
                    if v == crate::grid::EMPTY {
                        String::new()
                    } else {
                        instance.stream(StreamID(v as u32)).name.clone()
                    }
                })
                .collect()
        })
        .collect();

    let abstracts_solution = (0..abstracts_grid.rows())
        .map(|t| {
            (0..abstracts_grid.cols())
                .map(|r| {
                    let v = abstracts_grid.get(t, r);
                    if v == crate::grid::EMPTY {
                        String::new()
                    } else {
                        instance.abstract_(crate::ids::AbstractID(v as u32)).reference.clone()
                    }
                })
                .collect()
        })
        .collect();

    let stream_name = |id: StreamID| instance.stream(id).name.clone();
    let abstract_ref = |id: crate::ids::AbstractID| instance.abstract_(id).reference.clone();
    let timeblock_name = |i: usize| instance.timeblock(TimeblockID(i as u32)).name.clone();
    let room_name = |i: usize| instance.room(crate::ids::RoomID(i as u32)).name.clone();

    let mut streams_lines = Vec::new();
    let total_streams: f64 = streams_violations.parallel.iter().map(|(_, p)| p).sum::<f64>()
        + streams_violations.number_of_rooms.iter().map(|(_, p)| p).sum::<f64>()
        + streams_violations.streams_sessions.iter().map(|(_, _, p)| p).sum::<f64>()
        + streams_violations.streams_rooms.iter().map(|(_, _, p)| p).sum::<f64>()
        + streams_violations.sessions_rooms.iter().map(|(_, _, p)| p).sum::<f64>()
        + streams_violations.streams_streams.iter().map(|(_, _, _, p)| p).sum::<f64>()
        + streams_violations.unscheduled.len() as f64
        + streams_violations.consecutive.iter().map(|(_, _, p)| p).sum::<f64>();
    for (stream, penalty) in &streams_violations.parallel {
        streams_lines.push(format!("Parallel: stream {} costs {penalty}", stream_name(*stream)));
    }
    for (stream, penalty) in &streams_violations.number_of_rooms {
        streams_lines.push(format!("Rooms per stream: stream {} costs {penalty}", stream_name(*stream)));
    }
    for (stream, timeblock, penalty) in &streams_violations.streams_sessions {
        streams_lines.push(format!(
            "Streams vs sessions: stream {} in session {} costs {penalty}",
            stream_name(*stream),
            timeblock_name(*timeblock)
        ));
    }
    for (stream, room, penalty) in &streams_violations.streams_rooms {
        streams_lines.push(format!("Streams vs rooms: stream {} in room {} costs {penalty}", stream_name(*stream), room_name(*room)));
    }
    for (timeblock, room, penalty) in &streams_violations.sessions_rooms {
        streams_lines.push(format!(
            "Sessions vs rooms: session {} in room {} costs {penalty}",
            timeblock_name(*timeblock),
            room_name(*room)
        ));
    }
    for (a, b, timeblock, penalty) in &streams_violations.streams_streams {
        streams_lines.push(format!(
            "Streams vs streams: {} clashes with {} in session {} costs {penalty}",
            stream_name(*a),
            stream_name(*b),
            timeblock_name(*timeblock)
        ));
    }
    for stream in &streams_violations.unscheduled {
        streams_lines.push(format!("Unscheduled: stream {}", stream_name(*stream)));
    }
    for (stream, room, penalty) in &streams_violations.consecutive {
        streams_lines.push(format!(
            "Consecutive sessions: stream {} in room {} costs {penalty}",
            stream_name(*stream),
            room_name(*room)
        ));
    }
    streams_lines.push(format!("Total = {total_streams}"));

    let mut abstracts_lines = Vec::new();
    let total_abstracts: f64 = abstracts_violations.scheduled.len() as f64
        + abstracts_violations.order.iter().map(|(_, p)| p).sum::<f64>()
        + abstracts_violations.sessions.iter().map(|(_, _, p)| p).sum::<f64>()
        + abstracts_violations.conflicts.len() as f64;
    for abstract_id in &abstracts_violations.scheduled {
        abstracts_lines.push(format!("Unscheduled: abstract {}", abstract_ref(*abstract_id)));
    }
    for (abstract_id, penalty) in &abstracts_violations.order {
        abstracts_lines.push(format!("Misordered: abstract {} costs {penalty}", abstract_ref(*abstract_id)));
    }
    for (abstract_id, timeblock, penalty) in &abstracts_violations.sessions {
        abstracts_lines.push(format!(
            "Abstracts vs sessions: abstract {} in session {} costs {penalty}",
            abstract_ref(*abstract_id),
            timeblock_name(*timeblock)
        ));
    }
    for (a, b, _) in &abstracts_violations.conflicts {
        abstracts_lines.push(format!("Clash: {} vs {}", abstract_ref(*a), abstract_ref(*b)));
    }
    abstracts_lines.push(format!("Total = {total_abstracts}"));

    ScheduleOutput {
        streams_solution,
        abstracts_solution,
        streams_violations: streams_lines,
        abstracts_violations: abstracts_lines,
    }
}
