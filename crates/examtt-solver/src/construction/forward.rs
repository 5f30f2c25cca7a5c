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

use crate::assignment::{ComponentId, ExamAssignment};
use crate::config::SolverConfig;
use crate::err::ConfigError;
use crate::model::SolverModel;
use crate::neighbours::{ExamNeighbour, NeighbourSelection};
use crate::solution::Solution;
use examtt_model::common::ExamId;
use examtt_model::model::ExamPlacement;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

/// Iterative forward construction: repeatedly selects the most constrained
/// unassigned exam and hands out its best placement. Conflict-free
/// placements win; otherwise the cheapest eviction is taken while the exam
/// still has retry budget. Exams whose budget runs dry are recorded as
/// infeasible and stay unassigned for the repair phase.
#[derive(Debug)]
pub struct ExamConstruction {
    component: ComponentId,
    max_attempts: u32,
}

#[derive(Debug, Default)]
struct ConstructionContext {
    attempts: HashMap<usize, u32>,
    infeasible: Vec<ExamId>,
}

impl ExamConstruction {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            component: ComponentId::next(),
            max_attempts: config.get_u64("Construction.MaxAttempts", 25)? as u32,
        })
    }

    /// Exams the construction gave up on under this assignment.
    pub fn infeasible_exams(&self, assignment: &ExamAssignment) -> Vec<ExamId> {
        assignment
            .contexts()
            .get::<ConstructionContext>(self.component)
            .map(|c| c.infeasible.clone())
            .unwrap_or_default()
    }
}

impl NeighbourSelection for ExamConstruction {
    fn name(&self) -> &'static str {
        "ExamConstruction"
    }

    fn select_neighbour(
        &self,
        model: &SolverModel,
        solution: &mut Solution,
        _rng: &mut ChaCha8Rng,
    ) -> Option<ExamNeighbour> {
        let assignment = solution.assignment_mut();
        if assignment.nr_unassigned_variables() == 0 {
            return None;
        }

        loop {
            // Most constrained first: smallest period domain, larger exams
            // breaking ties.
            let next = {
                let context = assignment
                    .contexts()
                    .get::<ConstructionContext>(self.component);
                assignment
                    .unassigned_exams()
                    .filter(|e| {
                        context
                            .map(|c| {
                                c.attempts.get(&e.get()).copied().unwrap_or(0) < self.max_attempts
                            })
                            .unwrap_or(true)
                    })
                    .min_by_key(|e| {
                        let exam = model.problem().exam(*e);
                        (exam.periods().len(), std::cmp::Reverse(exam.size()))
                    })
            };
            let Some(exam_id) = next else {
                return None;
            };

            let exam = model.problem().exam(exam_id);
            let mut best: Option<ExamNeighbour> = None;
            for option in model.problem().sorted_period_options(exam) {
                let period = option.period();
                // Free rooms first; only fall back to evicting occupants
                // when the period has no open seating left.
                let rooms = model
                    .problem()
                    .best_rooms_where(exam, period, &|r| {
                        assignment.exams_in(period, r).is_empty()
                    })
                    .or_else(|| model.problem().best_rooms(exam, period));
                let Some(rooms) = rooms else {
                    continue;
                };
                let placement = ExamPlacement::new(exam_id, period, rooms);
                let neighbour = ExamNeighbour::new(model, assignment, placement);
                if neighbour.conflicts().is_empty() {
                    // First conflict-free placement in domain order wins.
                    best = Some(neighbour);
                    break;
                }
                if best.as_ref().is_none_or(|b| neighbour.value() < b.value()) {
                    best = Some(neighbour);
                }
            }

            let context = assignment
                .contexts_mut()
                .get_or_create::<ConstructionContext, _>(self.component, Default::default);
            match best {
                Some(neighbour) => {
                    if !neighbour.conflicts().is_empty() {
                        *context.attempts.entry(exam_id.get()).or_default() += 1;
                    }
                    return Some(neighbour);
                }
                None => {
                    // No feasible placement at all; record and try the next
                    // exam.
                    *context.attempts.entry(exam_id.get()).or_default() = self.max_attempts;
                    if !context.infeasible.contains(&exam_id) {
                        context.infeasible.push(exam_id);
                        tracing::debug!("no feasible placement for {exam_id}");
                    }
                }
            }
        }
    }
}
