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
use crate::model::SolverModel;
use crate::neighbours::{ExamNeighbour, NeighbourGenerator, random_period};
use examtt_model::common::ExamId;
use examtt_model::model::ExamPlacement;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Moves an assigned exam to another allowed period, keeping the room set
/// when it is still open there and falling back to the cheapest free rooms
/// otherwise.
#[derive(Debug, Clone)]
pub struct ExamTimeMove {
    attempts: usize,
}

impl Default for ExamTimeMove {
    fn default() -> Self {
        Self { attempts: 10 }
    }
}

impl ExamTimeMove {
    pub fn new(attempts: usize) -> Self {
        Self {
            attempts: attempts.max(1),
        }
    }
}

impl NeighbourGenerator for ExamTimeMove {
    fn name(&self) -> &'static str {
        "ExamTimeMove"
    }

    fn generate(
        &self,
        model: &SolverModel,
        assignment: &ExamAssignment,
        rng: &mut ChaCha8Rng,
    ) -> Option<ExamNeighbour> {
        let nr_exams = model.problem().nr_exams();
        if nr_exams == 0 || assignment.nr_assigned_variables() == 0 {
            return None;
        }
        for _ in 0..self.attempts {
            let exam_id = ExamId::new(rng.random_range(0..nr_exams));
            let Some(current) = assignment.placement(exam_id) else {
                continue;
            };
            let exam = model.problem().exam(exam_id);
            let Some(period) = random_period(exam, rng) else {
                continue;
            };
            if period == current.period() {
                continue;
            }

            let rooms_still_open = current
                .rooms()
                .iter()
                .all(|r| model.problem().room(*r).is_available(period));
            let rooms = if rooms_still_open {
                current.rooms().iter().copied().collect()
            } else {
                match model.problem().best_rooms_where(exam, period, &|r| {
                    assignment.exams_in(period, r).is_empty()
                }) {
                    Some(rooms) => rooms,
                    None => continue,
                }
            };
            let placement = ExamPlacement::new(exam_id, period, rooms);
            return Some(ExamNeighbour::new(model, assignment, placement));
        }
        None
    }
}
