//! Simulated annealing with Lundy-Mees cooling (§4.6-2): temperature cools
//! on every accept *and* reject, so the schedule only depends on iteration
//! count, not on how many moves happened to be accepted.

use rand::rngs::StdRng;
use rand::Rng;

use crate::grid::{Grid, Move};
use crate::search::AcceptanceCondition;

pub struct SimulatedAnnealing {
    last_delta: f64,
    temperature: f64,
    alpha: f64,
    rng: StdRng,
}

impl SimulatedAnnealing {
    pub fn new(min_delta: f64, max_delta: f64, max_iters: usize, init_prob: f64, sat_prob: f64, rng: StdRng) -> Self {
        let t0 = -max_delta / init_prob.ln();
        let t_f = -min_delta / sat_prob.ln();
        let alpha = 1.0 / (t_f * max_iters as f64);
        SimulatedAnnealing {
            last_delta: 0.0,
            temperature: t0,
            alpha,
            rng,
        }
    }

    fn cool(&mut self) {
        self.temperature /= 1.0 + self.alpha * self.temperature;
    }
}

impl AcceptanceCondition for SimulatedAnnealing {
    fn acceptable(&mut self, _grid: &Grid, _mv: &Move, delta: f64) -> bool {
        delta < self.last_delta || self.rng.gen::<f64>() < (-delta / self.temperature).exp()
    }

    fn accept(&mut self, _grid: &Grid, _mv: &Move, delta: f64) {
        self.last_delta = delta;
        self.cool();
    }

    fn reject(&mut self) {
        self.cool();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn temperature_cools_monotonically() {
        let rng = StdRng::seed_from_u64(7);
        let mut annealing = SimulatedAnnealing::new(1.0, 100.0, 1000, 0.95, 0.05, rng);
        let t_start = annealing.temperature;
        annealing.reject();
        assert!(annealing.temperature < t_start);
    }

    #[test]
    fn always_accepts_strictly_improving_moves() {
        let rng = StdRng::seed_from_u64(7);
        let mut annealing = SimulatedAnnealing::new(1.0, 100.0, 1000, 0.95, 0.05, rng);
        let grid = Grid::new(1, 1);
        let mv = Move::empty();
        assert!(annealing.acceptable(&grid, &mv, -5.0));
    }
}
