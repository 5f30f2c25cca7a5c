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

use crate::assignment::ComponentId;
use crate::config::SolverConfig;
use crate::err::ConfigError;
use crate::model::SolverModel;
use crate::neighbours::{ExamNeighbour, NeighbourSelection};
use crate::solution::Solution;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, VecDeque};

/// Conflict-based-statistics repair with a short tabu list. While exams are
/// unassigned, each call picks one of them and installs the placement with
/// the best `delta + beta * cbs` score, where the CBS table remembers how
/// often a (exam, period) choice evicted other exams before. Gives up after
/// a stretch of iterations without reducing the number of unassigned exams.
#[derive(Debug)]
pub struct TabuSearchRepair {
    component: ComponentId,
    tenure: usize,
    cbs_weight: f64,
    max_idle: u64,
}

#[derive(Debug, Default)]
struct TabuContext {
    iteration: u64,
    last_improvement: u64,
    best_unassigned: Option<usize>,
    tabu: VecDeque<(usize, usize)>,
    cbs: HashMap<(usize, usize), f64>,
}

impl TabuSearchRepair {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            component: ComponentId::next(),
            tenure: config.get_usize("TabuSearch.Tenure", 20)?,
            cbs_weight: config.get_f64("TabuSearch.CbsWeight", 25.0)?,
            max_idle: config.get_u64("TabuSearch.MaxIdle", 10_000)?,
        })
    }
}

impl NeighbourSelection for TabuSearchRepair {
    fn name(&self) -> &'static str {
        "TabuSearchRepair"
    }

    fn select_neighbour(
        &self,
        model: &SolverModel,
        solution: &mut Solution,
        rng: &mut ChaCha8Rng,
    ) -> Option<ExamNeighbour> {
        let assignment = solution.assignment_mut();
        let nr_unassigned = assignment.nr_unassigned_variables();
        if nr_unassigned == 0 {
            return None;
        }

        // Budget bookkeeping up front; the borrow must end before we read
        // placements.
        let exhausted = {
            let context = assignment
                .contexts_mut()
                .get_or_create::<TabuContext, _>(self.component, Default::default);
            context.iteration += 1;
            let improved = context
                .best_unassigned
                .is_none_or(|best| nr_unassigned < best);
            if improved {
                context.best_unassigned = Some(nr_unassigned);
                context.last_improvement = context.iteration;
            }
            context.iteration - context.last_improvement > self.max_idle
        };
        if exhausted {
            tracing::info!("tabu repair budget exhausted, {nr_unassigned} exams left");
            return None;
        }

        let unassigned: Vec<_> = assignment.unassigned_exams().collect();
        let exam_id = unassigned[rng.random_range(0..unassigned.len())];
        let exam = model.problem().exam(exam_id);

        let mut best: Option<(f64, ExamNeighbour)> = None;
        for placement in model.problem().ordered_placements(exam) {
            let period = placement.period();
            let neighbour = ExamNeighbour::new(model, assignment, placement);

            let key = (exam_id.get(), period.get());
            let (is_tabu, cbs) = {
                let context = assignment
                    .contexts()
                    .get::<TabuContext>(self.component)
                    .expect("tabu context created above");
                (
                    context.tabu.contains(&key),
                    context.cbs.get(&key).copied().unwrap_or(0.0),
                )
            };
            // Aspiration: a conflict-free improving placement overrides the
            // tabu status.
            if is_tabu && !(neighbour.conflicts().is_empty() && neighbour.value() < 0.0) {
                continue;
            }
            let score = neighbour.value() + self.cbs_weight * cbs;
            if best.as_ref().is_none_or(|(s, _)| score < *s) {
                best = Some((score, neighbour));
            }
        }

        let (_, neighbour) = best?;
        let key = (exam_id.get(), neighbour.placement().period().get());
        let evictions = neighbour.conflicts().len() as f64;
        let context = assignment
            .contexts_mut()
            .get_or_create::<TabuContext, _>(self.component, Default::default);
        context.tabu.push_back(key);
        while context.tabu.len() > self.tenure {
            context.tabu.pop_front();
        }
        if evictions > 0.0 {
            *context.cbs.entry(key).or_default() += evictions;
        }
        Some(neighbour)
    }
}
