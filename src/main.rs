//! CLI entry point: load a workbook, run both scheduling stages, write the
//! result back out.

use std::path::PathBuf;
use std::process::exit;

use log::{error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use structopt::StructOpt;

use conf_scheduler::error::{self, Result};
use conf_scheduler::instance::Instance;
use conf_scheduler::penalties::{self, Weights};
use conf_scheduler::scheduler::{AbstractsScheduler, Scheduler, StreamsScheduler};
use conf_scheduler::search::greedy::GreedyHillClimb;
use conf_scheduler::search::{local_search, SearchParams};
use conf_scheduler::{checks, grid, io};

const DEFAULT_WEIGHTS: &str = "1 10 1 100 1 10 1 10000 1000 100 10 1";

#[derive(StructOpt)]
#[structopt(name = "conf-scheduler", about = "Schedules conference streams and abstracts onto rooms and timeslots.")]
struct Opt {
    /// Input workbook.
    #[structopt(short, long, parse(from_os_str), default_value = "./conference.xlsx")]
    input: PathBuf,

    /// Output workbook.
    #[structopt(short, long, parse(from_os_str), default_value = "./schedule.xlsx")]
    output: PathBuf,

    /// Resume from a previously produced output workbook instead of starting empty.
    #[structopt(short, long, parse(from_os_str))]
    saved: Option<PathBuf>,

    /// Maximum local-search iterations per stage.
    #[structopt(short = "m", long = "maxiters", default_value = "5000")]
    max_iters: usize,

    /// Early-stop once a stage's score drops to or below this value.
    #[structopt(short = "f", long = "minscore", default_value = "0")]
    min_score: f64,

    /// Twelve space-separated penalty weights, in the order documented by `--help`.
    #[structopt(short, long, default_value = DEFAULT_WEIGHTS)]
    weights: String,

    /// Raise log verbosity; repeatable (-v, -vv, -vvv).
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,
}

fn parse_weights(raw: &str) -> Result<Weights> {
    let values: std::result::Result<Vec<f64>, _> = raw.split_whitespace().map(|w| w.parse::<f64>()).collect();
    let values = values.map_err(|_| error::Error::MissingSheet("--weights: not all values are numbers".to_string()))?;
    Weights::from_cli_vector(&values).map_err(|e| error::Error::MissingSheet(format!("--weights: {e}")))
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", format!("conf_scheduler={level}"));
    }
    pretty_env_logger::init();
}

fn run(opt: Opt) -> Result<()> {
    let weights = parse_weights(&opt.weights)?;

    let sheets = io::xlsx::read(&opt.input)?;

    let report = checks::validate(&sheets);
    report.log();
    report.into_result()?;

    let instance = Instance::from_sheets(&sheets)?;

    let mut rng = StdRng::from_entropy();

    let mut streams_scheduler = match &opt.saved {
        Some(saved) => {
            let grid = io::xlsx::read_grid(saved, "streams_solution", instance.num_timeblocks(), instance.num_rooms(), |name| {
                instance.stream_by_name(name).map(i32::from)
            })?;
            StreamsScheduler::from_resume(&instance, weights, grid)?
        }
        None => StreamsScheduler::new(&instance, weights),
    };

    info!("stage 1: scheduling streams onto timeblocks and rooms");
    let streams_neighbourhood_rng = StdRng::from_rng(&mut rng).expect("StdRng reseeds infallibly");
    let mut streams_neighbourhood = streams_scheduler.neighbourhood(streams_neighbourhood_rng);
    let mut condition = GreedyHillClimb::new();
    let params = SearchParams {
        max_iters: opt.max_iters,
        min_score: Some(opt.min_score),
        ..SearchParams::default()
    };
    let grid = streams_scheduler.grid().clone();
    let start_score = streams_scheduler.score();
    let partial_eval = |g: &grid::Grid, mv: &grid::Move| penalties::streams::delta(g, mv, &instance).weighted_score(&weights);
    let result = local_search(&grid, start_score, partial_eval, &mut streams_neighbourhood, &mut condition, params);
    streams_scheduler.set_grid(result);
    info!("stage 1 done: score = {}", streams_scheduler.score());

    let streams_grid = streams_scheduler.grid().clone();
    let mut abstracts_scheduler = match &opt.saved {
        Some(saved) => {
            let grid = io::xlsx::read_grid(saved, "abstracts_solution", instance.num_timeslots(), instance.num_rooms(), |name| {
                instance.abstract_by_ref(name).map(i32::from)
            })?;
            AbstractsScheduler::from_resume(&instance, weights, streams_grid, grid)?
        }
        None => {
            let mut scheduler = AbstractsScheduler::new(&instance, weights, streams_grid);
            scheduler.initialize();
            scheduler
        }
    };

    info!("stage 2: scheduling abstracts onto timeslots and rooms");
    let abstracts_neighbourhood_rng = StdRng::from_rng(&mut rng).expect("StdRng reseeds infallibly");
    let mut abstracts_neighbourhood = abstracts_scheduler.neighbourhood(abstracts_neighbourhood_rng);
    let mut condition = GreedyHillClimb::new();
    let grid = abstracts_scheduler.grid().clone();
    let streams_grid_for_delta = abstracts_scheduler.streams_grid().clone();
    let partial_eval = |g: &grid::Grid, mv: &grid::Move| penalties::abstracts::delta(g, mv, &streams_grid_for_delta, &instance).weighted_score(&weights);
    let start_score = abstracts_scheduler.score();
    let params = SearchParams {
        max_iters: opt.max_iters,
        min_score: Some(opt.min_score),
        ..SearchParams::default()
    };
    let result = local_search(&grid, start_score, partial_eval, &mut abstracts_neighbourhood, &mut condition, params);
    abstracts_scheduler.set_grid(result);
    info!("stage 2 done: score = {}", abstracts_scheduler.score());

    let streams_violations = streams_scheduler.violations();
    let abstracts_violations = abstracts_scheduler.violations();
    let schedule = io::write_schedule(
        &instance,
        streams_scheduler.grid(),
        abstracts_scheduler.grid(),
        &streams_violations,
        &abstracts_violations,
    );
    io::xlsx::write(&opt.output, &schedule)?;
    info!("wrote {}", opt.output.display());

    Ok(())
}

fn main() {
    let opt = Opt::from_args();
    init_logging(opt.verbose);
    if let Err(e) = run(opt) {
        error!("{e}");
        exit(1);
    }
}
