//! Steady-state genetic wrapper (§4.7): refine an initial population with
//! short hill-climbs, then repeatedly crossover the two best individuals,
//! mutate the child, refine it, and replace the current worst.

use rand::rngs::StdRng;
use rand::Rng;

use crate::grid::{apply_out_of_place, Grid, Move};
use crate::neighbourhood::Neighbourhood;
use crate::search::greedy::GreedyHillClimb;
use crate::search::{local_search, SearchParams};

pub struct GeneticParams {
    pub min_iters: usize,
    pub max_iters: usize,
    pub crossover_prob: f64,
    pub mutation_prob: f64,
}

struct Individual {
    grid: Grid,
    score: f64,
}

fn refine(grid: &Grid, partial_eval: &impl Fn(&Grid, &Move) -> f64, neighbourhood: &mut impl Neighbourhood, min_iters: usize) -> Grid {
    let mut condition = GreedyHillClimb::new();
    let params = SearchParams {
        explore_size: 1,
        min_iters,
        max_iters: min_iters.max(1),
        idle_threshold: 1.0,
        report_period: 0,
        min_score: None,
    };
    local_search(grid, 0.0, partial_eval, neighbourhood, &mut condition, params)
}

fn crossover(a: &Grid, b: &Grid, crossover_prob: f64, rng: &mut StdRng) -> Move {
    let mut items = Vec::new();
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    for r in 0..a.rows() {
        for c in 0..a.cols() {
            if rng.gen::<f64>() < crossover_prob {
                continue;
            }
            let from_b = b.get(r, c);
            if from_b != a.get(r, c) {
                items.push(from_b);
                rows.push(r);
                cols.push(c);
            }
        }
    }
    Move { items, rows, cols }
}

/// `full_eval`/`partial_eval` score the grid exactly as the caller's
/// scheduler would (full weighted score and its move-local delta).
pub fn steady_state(
    seed_solution: &Grid,
    full_eval: impl Fn(&Grid) -> f64,
    partial_eval: impl Fn(&Grid, &Move) -> f64,
    random_individual: impl Fn(&mut StdRng) -> Grid,
    neighbourhood: &mut impl Neighbourhood,
    population_size: usize,
    params: GeneticParams,
    rng: &mut StdRng,
) -> Grid {
    let mut population: Vec<Individual> = (0..population_size.saturating_sub(1))
        .map(|_| random_individual(rng))
        .chain(std::iter::once(seed_solution.clone()))
        .map(|grid| {
            let refined = refine(&grid, &partial_eval, neighbourhood, params.min_iters);
            let score = full_eval(&refined);
            Individual { grid: refined, score }
        })
        .collect();

    for _ in 0..params.max_iters {
        population.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap());
        let (parent_a, parent_b) = (&population[0], &population[1]);

        let crossover_move = crossover(&parent_a.grid, &parent_b.grid, params.crossover_prob, rng);
        let mut child_grid = apply_out_of_place(&parent_a.grid, &crossover_move);
        let mut child_score = parent_a.score + partial_eval(&parent_a.grid, &crossover_move);

        if rng.gen::<f64>() < params.mutation_prob {
            let mutation = neighbourhood.sample(&child_grid, 1);
            if let Some(mv) = mutation.into_iter().next() {
                child_score += partial_eval(&child_grid, &mv);
                child_grid = apply_out_of_place(&child_grid, &mv);
            }
        }

        child_grid = refine(&child_grid, &partial_eval, neighbourhood, params.min_iters);
        child_score = full_eval(&child_grid);

        let worst_idx = population
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.score.partial_cmp(&b.score).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        population[worst_idx] = Individual { grid: child_grid, score: child_score };
    }

    population
        .into_iter()
        .min_by(|a, b| a.score.partial_cmp(&b.score).unwrap())
        .map(|i| i.grid)
        .unwrap_or_else(|| seed_solution.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::EMPTY;
    use crate::neighbourhood::StreamsNeighbourhood;
    use rand::SeedableRng;

    fn score(grid: &Grid) -> f64 {
        grid.values().iter().filter(|&&v| v != EMPTY).count() as f64
    }

    fn partial_eval(grid: &Grid, mv: &Move) -> f64 {
        let after = crate::grid::apply_out_of_place(grid, mv);
        score(&after) - score(grid)
    }

    #[test]
    fn steady_state_never_returns_worse_than_seed_after_refinement() {
        let mut grid = Grid::new(3, 3);
        grid.set(0, 0, 1);
        grid.set(1, 1, 2);
        grid.set(2, 2, 1);
        let seed_score = score(&grid);

        let mut rng = StdRng::seed_from_u64(11);
        let mut neighbourhood = StreamsNeighbourhood::new(StdRng::seed_from_u64(12), 3, 3, 3);
        let random_individual = |rng: &mut StdRng| {
            let mut g = Grid::new(3, 3);
            for r in 0..3 {
                for c in 0..3 {
                    if rng.gen_bool(0.5) {
                        g.set(r, c, rng.gen_range(0..3));
                    }
                }
            }
            g
        };
        let params = GeneticParams {
            min_iters: 5,
            max_iters: 5,
            crossover_prob: 0.5,
            mutation_prob: 0.2,
        };
        let result = steady_state(&grid, score, partial_eval, random_individual, &mut neighbourhood, 4, params, &mut rng);
        assert!(score(&result) <= seed_score);
    }
}
