//! Whole-pipeline scenarios: build a small instance (or raw `Sheets`), run
//! both search stages the way `main::run` does, and check the schedule that
//! comes out the other end rather than any one penalty term in isolation.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use conf_scheduler::checks;
use conf_scheduler::grid::{apply_out_of_place, Grid, Move};
use conf_scheduler::ids::{AbstractID, AbstractTable, RoomTable, StreamID, StreamTable, TimeblockTable};
use conf_scheduler::instance::{Abstract, Instance, Room, Stream, Timeblock};
use conf_scheduler::io::{AbstractRow, RoomRow, Sheets, SessionRow, StreamRow};
use conf_scheduler::penalties::{streams, Weights};
use conf_scheduler::scheduler::{AbstractsScheduler, Scheduler, StreamsScheduler};
use conf_scheduler::search::greedy::GreedyHillClimb;
use conf_scheduler::search::{local_search, SearchParams};

fn improve_streams(instance: &Instance, weights: Weights, seed: u64, max_iters: usize) -> Grid {
    let scheduler = StreamsScheduler::new(instance, weights);
    let mut neighbourhood = scheduler.neighbourhood(StdRng::seed_from_u64(seed));
    let mut condition = GreedyHillClimb::new();
    let grid = scheduler.grid().clone();
    let start_score = scheduler.score();
    let partial_eval = |g: &Grid, mv: &Move| streams::delta(g, mv, instance).weighted_score(&weights);
    let params = SearchParams { max_iters, ..SearchParams::default() };
    local_search(&grid, start_score, partial_eval, &mut neighbourhood, &mut condition, params)
}

fn improve_abstracts(instance: &Instance, weights: Weights, streams_grid: Grid, seed: u64, max_iters: usize) -> (Grid, Grid) {
    let mut scheduler = AbstractsScheduler::new(instance, weights, streams_grid);
    scheduler.initialize();
    let mut neighbourhood = scheduler.neighbourhood(StdRng::seed_from_u64(seed));
    let mut condition = GreedyHillClimb::new();
    let grid = scheduler.grid().clone();
    let start_score = scheduler.score();
    let streams_grid = scheduler.streams_grid().clone();
    let partial_eval = |g: &Grid, mv: &Move| conf_scheduler::penalties::abstracts::delta(g, mv, &streams_grid, instance).weighted_score(&weights);
    let params = SearchParams { max_iters, ..SearchParams::default() };
    let result = local_search(&grid, start_score, partial_eval, &mut neighbourhood, &mut condition, params);
    (streams_grid, result)
}

/// E1: an instance with nothing in it improves to the empty schedule with a
/// score of zero.
#[test]
fn e1_empty_instance_scores_zero() {
    let instance = Instance::new(StreamTable::new(), RoomTable::new(), TimeblockTable::new(), AbstractTable::new());
    let weights = Weights::default();

    let streams_grid = improve_streams(&instance, weights, 1, 200);
    assert!(streams_grid.values().is_empty());
    assert_eq!(streams::evaluate(&streams_grid, &instance).weighted_score(&weights), 0.0);

    let (_, abstracts_grid) = improve_abstracts(&instance, weights, streams_grid, 2, 200);
    assert!(abstracts_grid.values().is_empty());
}

/// E2: one stream, one abstract, one room, one single-slot timeblock, every
/// penalty matrix empty — the only grid that scores zero is both stages
/// placing their single entity in the single cell.
#[test]
fn e2_trivial_instance_is_scored_optimally() {
    let mut streams = StreamTable::new();
    streams.push(Stream::new("only-stream", HashMap::new(), HashMap::new(), HashMap::new()));
    let mut rooms = RoomTable::new();
    rooms.push(Room::new("only-room", HashMap::new(), HashMap::new()));
    let mut timeblocks = TimeblockTable::new();
    timeblocks.push(Timeblock::new("only-timeblock", 0, 0, 1, HashMap::new(), HashMap::new()));
    let mut abstracts = AbstractTable::new();
    abstracts.push(Abstract::new("only-abstract", StreamID(0), 1, HashMap::new(), None, None, None));
    let instance = Instance::new(streams, rooms, timeblocks, abstracts);
    let weights = Weights::default();

    let streams_grid = improve_streams(&instance, weights, 3, 500);
    assert_eq!(streams_grid.get(0, 0), 0);
    assert_eq!(streams::evaluate(&streams_grid, &instance).weighted_score(&weights), 0.0);

    let (streams_grid, abstracts_grid) = improve_abstracts(&instance, weights, streams_grid, 4, 500);
    assert_eq!(abstracts_grid.get(0, 0), 0);
    assert_eq!(
        conf_scheduler::penalties::abstracts::evaluate(&streams_grid, &abstracts_grid, &instance).weighted_score(&weights),
        0.0
    );
}

/// E3: two single-talk streams compete for the only room in the only
/// timeblock; exactly one of them must end up unscheduled.
#[test]
fn e3_forced_conflict_leaves_one_stream_unscheduled() {
    let mut streams = StreamTable::new();
    streams.push(Stream::new("a", HashMap::new(), HashMap::new(), HashMap::new()));
    streams.push(Stream::new("b", HashMap::new(), HashMap::new(), HashMap::new()));
    let mut rooms = RoomTable::new();
    rooms.push(Room::new("only-room", HashMap::new(), HashMap::new()));
    let mut timeblocks = TimeblockTable::new();
    timeblocks.push(Timeblock::new("only-timeblock", 0, 0, 1, HashMap::new(), HashMap::new()));
    let mut abstracts = AbstractTable::new();
    abstracts.push(Abstract::new("a1", StreamID(0), 1, HashMap::new(), None, None, None));
    abstracts.push(Abstract::new("b1", StreamID(1), 1, HashMap::new(), None, None, None));
    let instance = Instance::new(streams, rooms, timeblocks, abstracts);
    let weights = Weights::default();

    let streams_grid = improve_streams(&instance, weights, 5, 500);
    let unscheduled = streams::unscheduled_streams_violations(&streams_grid, [StreamID(0), StreamID(1)]);
    assert_eq!(unscheduled.len(), 1, "exactly one stream should be left out of the only cell: {unscheduled:?}");
}

/// E4: three single-slot abstracts in one stream's one timeblock, presented
/// out of order; optimising should sort them into order order.
#[test]
fn e4_ordering_sorts_abstracts_by_presentation_order() {
    let mut streams = StreamTable::new();
    streams.push(Stream::new("s", HashMap::new(), HashMap::new(), HashMap::new()));
    let mut rooms = RoomTable::new();
    rooms.push(Room::new("r", HashMap::new(), HashMap::new()));
    let mut timeblocks = TimeblockTable::new();
    timeblocks.push(Timeblock::new("t", 0, 0, 3, HashMap::new(), HashMap::new()));
    let mut abstracts = AbstractTable::new();
    abstracts.push(Abstract::new("third", StreamID(0), 1, HashMap::new(), Some(3), None, None));
    abstracts.push(Abstract::new("first", StreamID(0), 1, HashMap::new(), Some(1), None, None));
    abstracts.push(Abstract::new("second", StreamID(0), 1, HashMap::new(), Some(2), None, None));
    let instance = Instance::new(streams, rooms, timeblocks, abstracts);
    let weights = Weights::default();

    let mut streams_grid = Grid::new(1, 1);
    streams_grid.set(0, 0, 0);

    // The constructive initializer already packs same-length talks
    // sequentially into the one shared session in presentation order, so it
    // should need no help from local search here; run it for real rather
    // than seeding a pre-sorted grid, so this test actually exercises the
    // thing it claims to.
    let mut scheduler = AbstractsScheduler::new(&instance, weights, streams_grid.clone());
    scheduler.initialize();
    let mut neighbourhood = scheduler.neighbourhood(StdRng::seed_from_u64(7));
    let mut condition = GreedyHillClimb::new();
    let grid = scheduler.grid().clone();
    let start_score = scheduler.score();
    let partial_eval = |g: &Grid, mv: &Move| conf_scheduler::penalties::abstracts::delta(g, mv, &streams_grid, &instance).weighted_score(&weights);
    let params = SearchParams { max_iters: 5000, ..SearchParams::default() };
    let abstracts_grid = local_search(&grid, start_score, partial_eval, &mut neighbourhood, &mut condition, params);

    let order = conf_scheduler::penalties::abstracts::order_violations(&streams_grid, &abstracts_grid, &instance, [0]);
    assert!(order.is_empty(), "optimal schedule should have no order inversions left: {order:?}");
}

/// E5: two abstracts that clash, but with the default weights the
/// unscheduled-abstracts penalty (10000) dwarfs the clash penalty (10), so
/// both still get scheduled even though it costs a clash point.
#[test]
fn e5_clash_penalty_does_not_prevent_scheduling() {
    let mut streams = StreamTable::new();
    streams.push(Stream::new("s", HashMap::new(), HashMap::new(), HashMap::new()));
    let mut rooms = RoomTable::new();
    rooms.push(Room::new("r1", HashMap::new(), HashMap::new()));
    rooms.push(Room::new("r2", HashMap::new(), HashMap::new()));
    let mut timeblocks = TimeblockTable::new();
    timeblocks.push(Timeblock::new("t", 0, 0, 1, HashMap::new(), HashMap::new()));
    let mut abstracts = AbstractTable::new();
    abstracts.push(Abstract::new("x", StreamID(0), 1, HashMap::new(), None, Some(AbstractID(1)), None));
    abstracts.push(Abstract::new("y", StreamID(0), 1, HashMap::new(), None, Some(AbstractID(0)), None));
    let instance = Instance::new(streams, rooms, timeblocks, abstracts);
    let weights = Weights::default();

    // Both rooms need to carry the stream in this one timeblock for both
    // talks to have somewhere to go.
    let mut streams_grid = Grid::new(1, 2);
    streams_grid.set(0, 0, 0);
    streams_grid.set(0, 1, 0);

    let (_, abstracts_grid) = improve_abstracts(&instance, weights, streams_grid, 8, 500);
    let scheduled = conf_scheduler::penalties::abstracts::unscheduled_violations(&abstracts_grid, [AbstractID(0), AbstractID(1)]);
    assert!(scheduled.is_empty(), "both clashing abstracts should still be scheduled: {scheduled:?}");
    let conflicts = conf_scheduler::penalties::abstracts::conflicts_violations(&abstracts_grid, &instance, [AbstractID(0), AbstractID(1)]);
    assert_eq!(conflicts.len(), 2, "clash is counted from both sides: {conflicts:?}");
}

/// E6: delta regression across ten random instances and five hundred random
/// moves each, checked against the full weighted score rather than one term
/// at a time.
#[test]
fn e6_delta_matches_full_eval_across_random_instances() {
    let mut rng = StdRng::seed_from_u64(64);
    let weights = Weights::default();

    for instance_idx in 0u64..10 {
        let num_streams: usize = rng.gen_range(1..5);
        let num_rooms: usize = rng.gen_range(1..4);
        let num_timeblocks: usize = rng.gen_range(1..4);

        let mut streams = StreamTable::new();
        for s in 0..num_streams {
            let mut conflict_costs = HashMap::new();
            for other in 0..num_streams {
                if other != s {
                    conflict_costs.insert(StreamID::from(other), rng.gen_range(0.0..4.0));
                }
            }
            streams.push(Stream::new(format!("s{s}"), HashMap::new(), HashMap::new(), conflict_costs));
        }
        let mut rooms = RoomTable::new();
        for r in 0..num_rooms {
            rooms.push(Room::new(format!("r{r}"), HashMap::new(), HashMap::new()));
        }
        let mut timeblocks = TimeblockTable::new();
        let mut cursor = 0;
        for b in 0..num_timeblocks {
            timeblocks.push(Timeblock::new(format!("b{b}"), 0, cursor, 1, HashMap::new(), HashMap::new()));
            cursor += 1;
        }
        let instance = Instance::new(streams, rooms, timeblocks, AbstractTable::new());

        let mut grid = Grid::new(instance.num_timeblocks(), instance.num_rooms());
        let mut running_score = streams::evaluate(&grid, &instance).weighted_score(&weights);
        let mut neighbourhood =
            conf_scheduler::neighbourhood::StreamsNeighbourhood::new(StdRng::seed_from_u64(100 + instance_idx), num_timeblocks, num_rooms, num_streams);

        for _ in 0..500 {
            let candidates: Vec<Move> = conf_scheduler::neighbourhood::Neighbourhood::sample(&mut neighbourhood, &grid, 1);
            let Some(mv) = candidates.into_iter().next() else {
                continue;
            };
            let partial = streams::delta(&grid, &mv, &instance).weighted_score(&weights);
            running_score += partial;
            grid = apply_out_of_place(&grid, &mv);

            let full = streams::evaluate(&grid, &instance).weighted_score(&weights);
            assert!((full - running_score).abs() < 1e-9, "instance {instance_idx}: full={full} running={running_score}");
        }
    }
}

/// E7: a dangling reference in the abstracts sheet is reported as a fatal
/// validation finding and never reaches `Instance::from_sheets`.
#[test]
fn e7_dangling_abstract_reference_fails_validation() {
    let sheets = Sheets {
        streams: vec![StreamRow { name: "keynotes".to_string() }],
        rooms: vec![RoomRow { name: "hall".to_string() }],
        sessions: vec![SessionRow { name: "morning".to_string(), day: 0, num_timeslots: 1 }],
        abstracts: vec![AbstractRow {
            reference: "talk-1".to_string(),
            stream: "keynotes".to_string(),
            required_timeslots: 1,
            order: None,
            clash: Some("no-such-talk".to_string()),
            speaker_clash: None,
        }],
        ..Sheets::default()
    };

    let report = checks::validate(&sheets);
    assert!(report.is_fatal());
    let result = report.into_result();
    assert!(matches!(result, Err(conf_scheduler::error::Error::UnknownReference { kind, .. }) if kind == "abstract"));

    // a missing stream reference is the same kind of finding.
    let sheets_missing_stream = Sheets {
        streams: vec![],
        abstracts: vec![AbstractRow {
            reference: "talk-1".to_string(),
            stream: "ghost-stream".to_string(),
            required_timeslots: 1,
            order: None,
            clash: None,
            speaker_clash: None,
        }],
        ..Sheets::default()
    };
    assert!(Instance::from_sheets(&sheets_missing_stream).is_err());
}

/// Property 5: a search run seeded identically twice produces the identical
/// grid both times, across both stages.
#[test]
fn reproducible_runs_with_the_same_seed_produce_the_same_schedule() {
    let mut setup_rng = StdRng::seed_from_u64(999);
    let num_streams = 4;
    let num_rooms = 3;
    let num_timeblocks = 3;

    let mut streams = StreamTable::new();
    for s in 0..num_streams {
        let mut conflict_costs = HashMap::new();
        for other in 0..num_streams {
            if other != s {
                conflict_costs.insert(StreamID::from(other), setup_rng.gen_range(0.0..4.0));
            }
        }
        streams.push(Stream::new(format!("s{s}"), HashMap::new(), HashMap::new(), conflict_costs));
    }
    let mut rooms = RoomTable::new();
    for r in 0..num_rooms {
        rooms.push(Room::new(format!("r{r}"), HashMap::new(), HashMap::new()));
    }
    let mut timeblocks = TimeblockTable::new();
    for b in 0..num_timeblocks {
        timeblocks.push(Timeblock::new(format!("b{b}"), 0, b, 1, HashMap::new(), HashMap::new()));
    }
    let mut abstracts = AbstractTable::new();
    for a in 0..10 {
        abstracts.push(Abstract::new(format!("a{a}"), StreamID::from(a % num_streams), 1, HashMap::new(), None, None, None));
    }
    let instance = Instance::new(streams, rooms, timeblocks, abstracts);
    let weights = Weights::default();

    let first = improve_streams(&instance, weights, 42, 300);
    let second = improve_streams(&instance, weights, 42, 300);
    assert_eq!(first, second);

    let (_, first_abstracts) = improve_abstracts(&instance, weights, first.clone(), 43, 300);
    let (_, second_abstracts) = improve_abstracts(&instance, weights, second, 43, 300);
    assert_eq!(first_abstracts, second_abstracts);
}
