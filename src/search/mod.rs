//! The generic local-search driver (§4.5) and the acceptance-condition
//! strategies that plug into it (§4.6).

pub mod annealing;
pub mod genetic;
pub mod greedy;
pub mod tabu;

use log::info;

use crate::grid::{apply, Grid, Move};
use crate::neighbourhood::Neighbourhood;

/// Uniform interface shared by every acceptance strategy: decide whether a
/// candidate move's delta is acceptable, react to an accepted move, and
/// react to an iteration where nothing was accepted.
pub trait AcceptanceCondition {
    fn acceptable(&mut self, grid: &Grid, mv: &Move, delta: f64) -> bool;
    fn accept(&mut self, grid: &Grid, mv: &Move, delta: f64);
    fn reject(&mut self);
}

#[derive(Clone, Copy, Debug)]
pub struct SearchParams {
    pub explore_size: usize,
    pub min_iters: usize,
    pub max_iters: usize,
    pub idle_threshold: f64,
    pub report_period: usize,
    /// Stop once the absolute score (`start_score + current_delta`) drops to
    /// or below this value. `None` disables the check.
    pub min_score: Option<f64>,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            explore_size: 1,
            min_iters: 0,
            max_iters: 5000,
            idle_threshold: 1.0,
            report_period: 500,
            min_score: None,
        }
    }
}

/// The driver shared by every acceptance strategy: repeatedly sample a batch
/// of candidate moves, keep the best acceptable one, apply it, and track the
/// best solution seen so far. `start_score` is the solution's absolute
/// weighted score before any move is applied, used only to test
/// `params.min_score` against the running `start_score + current_delta`.
pub fn local_search(
    solution: &Grid,
    start_score: f64,
    partial_eval: impl Fn(&Grid, &Move) -> f64,
    neighbourhood: &mut impl Neighbourhood,
    condition: &mut impl AcceptanceCondition,
    params: SearchParams,
) -> Grid {
    let mut current = solution.clone();
    let mut current_delta = 0.0_f64;
    let mut best = current.clone();
    let mut best_delta = 0.0_f64;
    let mut i = 0usize;
    let mut idle = 0usize;

    while !(i > params.min_iters && idle as f64 > params.idle_threshold * i as f64)
        && i < params.max_iters
        && params.min_score.map_or(true, |min| start_score + current_delta > min)
    {
        let candidates = neighbourhood.sample(&current, params.explore_size);
        let mut best_neigh: Option<(Move, f64)> = None;
        for mv in candidates {
            let delta = partial_eval(&current, &mv);
            if !condition.acceptable(&current, &mv, delta) {
                continue;
            }
            if best_neigh.as_ref().map_or(true, |(_, best_d)| delta < *best_d) {
                best_neigh = Some((mv, delta));
            }
        }

        match best_neigh {
            Some((mv, delta)) => {
                idle = if delta < 0.0 { 0 } else { idle + 1 };
                condition.accept(&current, &mv, delta);
                apply(&mut current, &mv);
                current_delta += delta;
                if current_delta < best_delta {
                    best = current.clone();
                    best_delta = current_delta;
                }
            }
            None => {
                idle += 1;
                condition.reject();
            }
        }

        i += 1;
        if params.report_period > 0 && i % params.report_period == 0 {
            info!("local_search: iteration {i}, current_delta={current_delta:.3}, best_delta={best_delta:.3}, idle={idle}");
        }
    }

    if let Some(min) = params.min_score {
        if start_score + current_delta <= min {
            info!("local_search: reached --minscore ({min}) at iteration {i}, stopping early");
        }
    }

    best
}
