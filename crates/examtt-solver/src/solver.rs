// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use crate::config::SolverConfig;
use crate::err::ConfigError;
use crate::heuristics::ExamNeighbourSelection;
use crate::model::SolverModel;
use crate::neighbours::NeighbourSelection;
use crate::solution::Solution;
use crate::termination::{GeneralTerminationCondition, StopToken, TerminationCondition};
use rand::RngCore;
use rand_chacha::ChaCha8Rng;
use rand::SeedableRng;

/// The single-threaded solver: one iteration asks the phase controller for a
/// neighbour, applies it, and records the best. The controller overrides the
/// outer termination so the closing hill-climbing sweep still runs after the
/// outer condition first rejects.
pub struct Solver {
    selection: ExamNeighbourSelection,
    termination: GeneralTerminationCondition,
    save_best_unassigned: i64,
    seed: u64,
}

impl Solver {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let seed = match config.get("General.Seed") {
            Some(_) => config.get_u64("General.Seed", 0)?,
            None => rand::rng().next_u64(),
        };
        Ok(Self {
            selection: ExamNeighbourSelection::new(config)?,
            termination: GeneralTerminationCondition::new(config)?,
            save_best_unassigned: config.get_i64("General.SaveBestUnassigned", -1)?,
            seed,
        })
    }

    /// The master seed of this run; logged and reported for reproducibility.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Requesting a stop lets the current iteration finish, then best is
    /// restored.
    #[inline]
    pub fn stop_token(&self) -> StopToken {
        self.termination.stop_token()
    }

    #[inline]
    pub fn selection(&self) -> &ExamNeighbourSelection {
        &self.selection
    }

    /// Runs the search on `solution` until termination, then restores the
    /// best snapshot into the assignment.
    pub fn solve(&self, model: &SolverModel, solution: &mut Solution) {
        tracing::info!("solver started, seed {}", self.seed);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.run(model, solution, &mut rng);
        solution.restore_best(model);
        tracing::info!(
            "solver finished after {} iterations ({} failed), best total {:?}",
            solution.iteration(),
            solution.failed_iterations(),
            solution.best_total_value()
        );
    }

    pub(crate) fn run(&self, model: &SolverModel, solution: &mut Solution, rng: &mut ChaCha8Rng) {
        // Record the starting state so the shutdown path always has a best
        // to save, interrupted or not.
        solution.save_best_if_improved(model, self.save_best_unassigned);
        loop {
            if !self.termination.can_continue(solution)
                && !self.selection.is_final_phase(solution.assignment())
            {
                self.selection.request_final_phase(solution.assignment_mut());
            }
            if !self.selection.can_continue(solution.assignment()) {
                break;
            }
            match self.selection.select_neighbour(model, solution, rng) {
                Some(neighbour) => {
                    let iteration = solution.iteration() + 1;
                    neighbour.assign(model, solution.assignment_mut(), iteration);
                    solution.update(model);
                    solution.save_best_if_improved(model, self.save_best_unassigned);
                }
                None => solution.record_failed(),
            }
        }
    }
}

/// Convenience wrapper for the common run shape: build the assignment, apply
/// a warm start, solve, hand the solution back.
pub fn solve_with_warm_start(
    solver: &Solver,
    model: &SolverModel,
    warm_start: &[examtt_model::model::ExamPlacement],
) -> Solution {
    let mut assignment = crate::assignment::ExamAssignment::new(model);
    if !warm_start.is_empty() {
        let applied = model.apply_placements(&mut assignment, warm_start);
        tracing::info!("warm start: {applied} placements applied");
    }
    let mut solution = Solution::new(assignment);
    solver.solve(model, &mut solution);
    solution
}

#[cfg(test)]
mod tests {
    use super::*;
    use examtt_model::model::{ExamModel, PeriodOption, RoomOption};

    fn model(config: &SolverConfig, nr_exams: usize) -> SolverModel {
        let mut b = ExamModel::builder();
        let periods = [
            b.add_period(0, 480, 120, 0.0),
            b.add_period(0, 660, 120, 0.0),
            b.add_period(1, 480, 120, 0.0),
        ];
        let rooms = [b.add_room("A", 30, 30, None), b.add_room("B", 30, 30, None)];
        for i in 0..nr_exams {
            let e = b.add_exam(format!("E{i}"), 10, 120);
            for p in periods {
                b.exam_mut(e).add_period(PeriodOption::new(p, 0));
            }
            for r in rooms {
                b.exam_mut(e).add_room(RoomOption::new(r, 0));
            }
        }
        SolverModel::from_model(b.build().unwrap(), config).unwrap()
    }

    fn quick_config() -> SolverConfig {
        let mut config = SolverConfig::new();
        config.set("General.Seed", "1234");
        config.set("Termination.MaxIters", "5000");
        config.set("HillClimber.MaxIdle", "100");
        config
    }

    #[test]
    fn test_solver_finds_complete_solution_and_restores_best() {
        let config = quick_config();
        let m = model(&config, 6);
        let solver = Solver::new(&config).unwrap();
        let solution = solve_with_warm_start(&solver, &m, &[]);
        assert!(solution.best().is_some());
        assert_eq!(solution.best_unassigned(), Some(0));
        assert!(solution.assignment().is_complete());
        // restored assignment matches the snapshot
        assert_eq!(
            m.total_value(solution.assignment()),
            solution.best_total_value().unwrap()
        );
        assert!(solution.assignment().verify_consistency(&m).is_ok());
    }

    #[test]
    fn test_best_quality_is_monotone_over_listener_events() {
        use crate::solution::{SolutionInfo, SolutionListener};
        use std::sync::{Arc, Mutex};

        #[derive(Default)]
        struct BestTracker {
            bests: Arc<Mutex<Vec<(usize, f64)>>>,
        }
        impl SolutionListener for BestTracker {
            fn best_saved(&mut self, info: &SolutionInfo) {
                self.bests
                    .lock()
                    .unwrap()
                    .push((info.nr_unassigned, info.total_value));
            }
        }

        let config = quick_config();
        let m = model(&config, 6);
        let solver = Solver::new(&config).unwrap();
        let bests = Arc::new(Mutex::new(Vec::new()));
        let mut solution = Solution::new(crate::assignment::ExamAssignment::new(&m));
        solution.add_listener(Box::new(BestTracker { bests: bests.clone() }));
        solver.solve(&m, &mut solution);

        let bests = bests.lock().unwrap();
        assert!(!bests.is_empty());
        for pair in bests.windows(2) {
            let (u0, v0) = pair[0];
            let (u1, v1) = pair[1];
            assert!(
                u1 < u0 || (u1 == u0 && v1 < v0),
                "best quality regressed: {pair:?}"
            );
        }
    }

    #[test]
    fn test_stop_token_interrupts_and_saves_best() {
        let mut config = SolverConfig::new();
        config.set("General.Seed", "7");
        config.set("HillClimber.MaxIdle", "50");
        // No other budget: would run to the first complete solution.
        let m = model(&config, 4);
        let solver = Solver::new(&config).unwrap();
        solver.stop_token().request_stop();
        let solution = solve_with_warm_start(&solver, &m, &[]);
        // Interrupted immediately: the final sweep still ran and whatever
        // best existed was saved and restored.
        assert!(solution.best().is_some());
    }

    #[test]
    fn test_seed_reproducibility() {
        let config = quick_config();
        let m1 = model(&config, 5);
        let m2 = model(&config, 5);
        let s1 = solve_with_warm_start(&Solver::new(&config).unwrap(), &m1, &[]);
        let s2 = solve_with_warm_start(&Solver::new(&config).unwrap(), &m2, &[]);
        assert_eq!(s1.best_total_value(), s2.best_total_value());
        assert_eq!(s1.best_unassigned(), s2.best_unassigned());
    }
}
