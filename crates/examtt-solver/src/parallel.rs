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

use crate::assignment::ExamAssignment;
use crate::config::SolverConfig;
use crate::err::ConfigError;
use crate::heuristics::ExamNeighbourSelection;
use crate::model::SolverModel;
use crate::neighbours::NeighbourSelection;
use crate::solution::{BestSnapshot, Solution};
use crate::termination::{GeneralTerminationCondition, StopToken, TerminationCondition};
use parking_lot::Mutex;
use rand::RngCore;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// The shared best slot of the parallel solver: an atomics fast path for the
/// race-tolerant pre-check and a mutex for the definitive compare-and-install.
/// Quality is lexicographic, unassigned exams first, weighted total second.
pub(crate) struct SharedIncumbent {
    best: Mutex<Option<BestSnapshot>>,
    best_unassigned: AtomicUsize,
    best_value_bits: AtomicU64,
}

impl SharedIncumbent {
    pub fn new() -> Self {
        Self {
            best: Mutex::new(None),
            best_unassigned: AtomicUsize::new(usize::MAX),
            best_value_bits: AtomicU64::new(f64::INFINITY.to_bits()),
        }
    }

    /// Best-known quality without taking the lock.
    #[inline]
    pub fn peek(&self) -> (usize, f64) {
        (
            self.best_unassigned.load(Ordering::Acquire),
            f64::from_bits(self.best_value_bits.load(Ordering::Acquire)),
        )
    }

    /// Installs `candidate` if it strictly beats the shared best. The quick
    /// atomic pre-check keeps losing workers off the lock.
    pub fn try_update(&self, candidate: &BestSnapshot) -> bool {
        let (unassigned, value) = self.peek();
        if !candidate.is_better_than(unassigned, value) {
            return false;
        }

        let mut guard = self.best.lock();
        let better = match &*guard {
            None => true,
            Some(current) => {
                candidate.is_better_than(current.nr_unassigned, current.total_value)
            }
        };
        if !better {
            return false;
        }
        self.best_unassigned
            .store(candidate.nr_unassigned, Ordering::Release);
        self.best_value_bits
            .store(candidate.total_value.to_bits(), Ordering::Release);
        *guard = Some(candidate.clone());
        true
    }

    /// Cloned snapshot of the shared best; the shutdown path calls this
    /// after every worker has exited, making it the one canonical read.
    pub fn snapshot(&self) -> Option<BestSnapshot> {
        self.best.lock().clone()
    }
}

/// Runs `Parallel.NrSolvers` independent workers over the shared read-only
/// model. Each worker owns its assignment view, phase controller and RNG
/// (seeded `master + worker index`); a worker that improves on the shared
/// best promotes a snapshot under the incumbent lock. Shutdown is
/// cooperative: the stop flag lets every worker finish its iteration.
pub struct ParallelSolver {
    config: SolverConfig,
    nr_solvers: usize,
    save_best_unassigned: i64,
    seed: u64,
    stop: StopToken,
}

impl ParallelSolver {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        // Probe-construct the per-worker components once so every
        // configuration error surfaces here instead of inside a thread.
        let _ = ExamNeighbourSelection::new(config)?;
        let _ = GeneralTerminationCondition::new(config)?;
        let seed = match config.get("General.Seed") {
            Some(_) => config.get_u64("General.Seed", 0)?,
            None => rand::rng().next_u64(),
        };
        Ok(Self {
            config: config.clone(),
            nr_solvers: config.get_usize("Parallel.NrSolvers", 1)?.max(1),
            save_best_unassigned: config.get_i64("General.SaveBestUnassigned", -1)?,
            seed,
            stop: StopToken::new(),
        })
    }

    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[inline]
    pub fn nr_solvers(&self) -> usize {
        self.nr_solvers
    }

    #[inline]
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// Solves and returns a solution holding the canonical shared best.
    pub fn solve(&self, model: &SolverModel) -> Solution {
        tracing::info!(
            "parallel solver started, {} workers, master seed {}",
            self.nr_solvers,
            self.seed
        );
        let incumbent = SharedIncumbent::new();

        std::thread::scope(|scope| {
            for worker in 0..self.nr_solvers {
                let incumbent = &incumbent;
                let config = &self.config;
                let stop = self.stop.clone();
                let seed = self.seed.wrapping_add(worker as u64);
                let save_best_unassigned = self.save_best_unassigned;
                scope.spawn(move || {
                    run_worker(
                        worker,
                        config,
                        model,
                        incumbent,
                        stop,
                        seed,
                        save_best_unassigned,
                    );
                });
            }
        });

        // All workers joined; one canonical final read of the shared best.
        let mut solution = Solution::new(ExamAssignment::new(model));
        if let Some(best) = incumbent.snapshot() {
            solution.install_best(model, best);
            solution.restore_best(model);
        }
        tracing::info!(
            "parallel solver finished, best total {:?} ({:?} unassigned)",
            solution.best_total_value(),
            solution.best_unassigned()
        );
        solution
    }
}

fn run_worker(
    worker: usize,
    config: &SolverConfig,
    model: &SolverModel,
    incumbent: &SharedIncumbent,
    stop: StopToken,
    seed: u64,
    save_best_unassigned: i64,
) {
    let selection =
        ExamNeighbourSelection::new(config).expect("config was validated at construction");
    let termination = GeneralTerminationCondition::new(config)
        .expect("config was validated at construction")
        .with_stop_token(stop);

    let mut solution = Solution::new(ExamAssignment::new(model));
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    tracing::debug!("worker {worker} started with seed {seed}");

    if solution.save_best_if_improved(model, save_best_unassigned) {
        // Even an empty best keeps the shutdown path from writing nothing.
        if let Some(best) = solution.best() {
            incumbent.try_update(best);
        }
    }
    loop {
        if !termination.can_continue(&solution) && !selection.is_final_phase(solution.assignment())
        {
            selection.request_final_phase(solution.assignment_mut());
        }
        if !selection.can_continue(solution.assignment()) {
            break;
        }
        match selection.select_neighbour(model, &mut solution, &mut rng) {
            Some(neighbour) => {
                let iteration = solution.iteration() + 1;
                neighbour.assign(model, solution.assignment_mut(), iteration);
                solution.update(model);
                if solution.save_best_if_improved(model, save_best_unassigned) {
                    let best = solution.best().expect("best was just saved");
                    if incumbent.try_update(best) {
                        tracing::info!(
                            "worker {worker}: new incumbent, total {:.2}, {} unassigned",
                            best.total_value,
                            best.nr_unassigned
                        );
                    }
                }
            }
            None => solution.record_failed(),
        }
    }
    tracing::debug!(
        "worker {worker} finished after {} iterations",
        solution.iteration()
    );
}
