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
use crate::neighbours::{ExamNeighbour, NeighbourGenerator, random_rooms};
use examtt_model::common::ExamId;
use examtt_model::model::ExamPlacement;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Keeps an assigned exam's period and swaps its room set.
#[derive(Debug, Clone)]
pub struct ExamRoomMove {
    attempts: usize,
}

impl Default for ExamRoomMove {
    fn default() -> Self {
        Self { attempts: 10 }
    }
}

impl ExamRoomMove {
    pub fn new(attempts: usize) -> Self {
        Self {
            attempts: attempts.max(1),
        }
    }
}

impl NeighbourGenerator for ExamRoomMove {
    fn name(&self) -> &'static str {
        "ExamRoomMove"
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
            if exam.max_rooms() == 0 {
                continue;
            }
            let period = current.period();
            let Some(rooms) = random_rooms(model, assignment, exam, period, true, rng) else {
                continue;
            };
            if rooms.as_slice() == current.rooms() {
                continue;
            }
            let placement = ExamPlacement::new(exam_id, period, rooms);
            return Some(ExamNeighbour::new(model, assignment, placement));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolverConfig;
    use examtt_model::common::{PeriodId, RoomId};
    use examtt_model::model::{ExamModel, PeriodOption, RoomOption};
    use rand::SeedableRng;

    fn model() -> SolverModel {
        let mut b = ExamModel::builder();
        let p = b.add_period(0, 480, 120, 0.0);
        let rooms = [b.add_room("A", 20, 20, None), b.add_room("B", 20, 20, None)];
        let e = b.add_exam("X", 10, 120);
        b.exam_mut(e).add_period(PeriodOption::new(p, 0));
        for r in rooms {
            b.exam_mut(e).add_room(RoomOption::new(r, 0));
        }
        SolverModel::from_model(b.build().unwrap(), &SolverConfig::new()).unwrap()
    }

    #[test]
    fn test_keeps_period_and_changes_rooms() {
        let m = model();
        let mut a = ExamAssignment::new(&m);
        a.assign(
            &m,
            0,
            ExamPlacement::new(ExamId::new(0), PeriodId::new(0), [RoomId::new(0)]),
        );
        let generator = ExamRoomMove::new(100);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let n = generator.generate(&m, &a, &mut rng).unwrap();
        assert_eq!(n.placement().period(), PeriodId::new(0));
        assert_eq!(n.placement().rooms(), &[RoomId::new(1)]);
    }

    #[test]
    fn test_nothing_to_do_on_empty_assignment() {
        let m = model();
        let a = ExamAssignment::new(&m);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(ExamRoomMove::default().generate(&m, &a, &mut rng).is_none());
    }
}
