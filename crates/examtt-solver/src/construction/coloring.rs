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
use crate::model::SolverModel;
use crate::neighbours::{ExamNeighbour, NeighbourSelection};
use crate::solution::Solution;
use examtt_model::common::{ExamId, PeriodId, RoomId};
use examtt_model::model::ExamPlacement;
use fixedbitset::FixedBitSet;
use rand_chacha::ChaCha8Rng;
use std::collections::{HashSet, VecDeque};

/// Graph-coloring opening: colors the conflict graph (shared students,
/// shared instructors, hard separations) with periods in DSATUR order and
/// hands out the resulting placements one at a time. Exams the coloring
/// cannot place are left to the forward construction.
#[derive(Debug)]
pub struct ColoringConstruction {
    component: ComponentId,
}

#[derive(Debug, Default)]
struct ColoringContext {
    built: bool,
    queue: VecDeque<ExamPlacement>,
}

impl ColoringConstruction {
    pub fn new() -> Self {
        Self {
            component: ComponentId::next(),
        }
    }
}

impl Default for ColoringConstruction {
    fn default() -> Self {
        Self::new()
    }
}

impl NeighbourSelection for ColoringConstruction {
    fn name(&self) -> &'static str {
        "ColoringConstruction"
    }

    fn select_neighbour(
        &self,
        model: &SolverModel,
        solution: &mut Solution,
        _rng: &mut ChaCha8Rng,
    ) -> Option<ExamNeighbour> {
        loop {
            let next = {
                let assignment = solution.assignment_mut();
                let context = assignment
                    .contexts_mut()
                    .get_or_create::<ColoringContext, _>(self.component, Default::default);
                if !context.built {
                    context.built = true;
                    context.queue = color_graph(model);
                    tracing::info!("coloring construction placed {} exams", context.queue.len());
                }
                context.queue.pop_front()
            };
            let placement = next?;
            if solution.assignment().placement(placement.exam()).is_some() {
                continue;
            }
            let neighbour = ExamNeighbour::new(model, solution.assignment(), placement);
            if neighbour.conflicts().is_empty() {
                return Some(neighbour);
            }
        }
    }
}

/// DSATUR over the conflict graph: repeatedly color the exam seeing the most
/// distinct neighbour colors (ties by degree, then by size, both
/// descending), assigning the first allowed period with no colored
/// neighbour and enough free rooms, largest-fit-first.
fn color_graph(model: &SolverModel) -> VecDeque<ExamPlacement> {
    let problem = model.problem();
    let nr_exams = problem.nr_exams();
    let nr_periods = problem.nr_periods();

    let neighbours: Vec<Vec<ExamId>> = (0..nr_exams)
        .map(|i| problem.conflicting_exams(ExamId::new(i)))
        .collect();
    let mut done: Vec<bool> = vec![false; nr_exams];
    let mut saturation: Vec<FixedBitSet> = vec![FixedBitSet::with_capacity(nr_periods); nr_exams];
    let mut rooms_taken: HashSet<(PeriodId, RoomId)> = HashSet::new();
    let mut placements = VecDeque::new();

    loop {
        let candidate = (0..nr_exams)
            .filter(|&i| !done[i])
            .max_by_key(|&i| {
                (
                    saturation[i].count_ones(..),
                    neighbours[i].len(),
                    problem.exam(ExamId::new(i)).size(),
                )
            });
        let Some(index) = candidate else {
            break;
        };
        let exam_id = ExamId::new(index);
        let exam = problem.exam(exam_id);

        let mut chosen = None;
        for option in problem.sorted_period_options(exam) {
            let period = option.period();
            if saturation[index].contains(period.get()) {
                continue;
            }
            let rooms = problem.best_rooms_where(exam, period, &|r| {
                !rooms_taken.contains(&(period, r))
            });
            if let Some(rooms) = rooms {
                chosen = Some(ExamPlacement::new(exam_id, period, rooms));
                break;
            }
        }

        done[index] = true;
        if let Some(placement) = chosen {
            for &room in placement.rooms() {
                rooms_taken.insert((placement.period(), room));
            }
            for neighbour in &neighbours[index] {
                saturation[neighbour.get()].insert(placement.period().get());
            }
            placements.push_back(placement);
        }
        // An exam with no colorable period is left to the construction phase.
    }
    placements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolverConfig;
    use crate::prelude::ExamAssignment;
    use examtt_model::model::{ExamModel, PeriodOption, RoomOption};
    use rand::SeedableRng;

    /// Triangle of exams sharing students pairwise, 3 periods, 1 room each.
    fn model() -> SolverModel {
        let mut b = ExamModel::builder();
        let periods = [
            b.add_period(0, 480, 120, 0.0),
            b.add_period(0, 660, 120, 0.0),
            b.add_period(1, 480, 120, 0.0),
        ];
        let rooms = [
            b.add_room("A", 10, 10, None),
            b.add_room("B", 10, 10, None),
            b.add_room("C", 10, 10, None),
        ];
        let exams = [
            b.add_exam("X", 2, 120),
            b.add_exam("Y", 2, 120),
            b.add_exam("Z", 2, 120),
        ];
        for e in exams {
            for p in periods {
                b.exam_mut(e).add_period(PeriodOption::new(p, 0));
            }
            for r in rooms {
                b.exam_mut(e).add_room(RoomOption::new(r, 0));
            }
        }
        for (i, j) in [(0, 1), (1, 2), (0, 2)] {
            let s = b.add_student();
            b.enroll(s, exams[i]);
            b.enroll(s, exams[j]);
        }
        SolverModel::from_model(b.build().unwrap(), &SolverConfig::new()).unwrap()
    }

    #[test]
    fn test_coloring_gives_conflicting_exams_distinct_periods() {
        let m = model();
        let placements = color_graph(&m);
        assert_eq!(placements.len(), 3);
        let periods: HashSet<PeriodId> = placements.iter().map(|p| p.period()).collect();
        assert_eq!(periods.len(), 3, "pairwise conflicting exams need 3 colors");
    }

    #[test]
    fn test_selection_drains_queue_then_stops() {
        let m = model();
        let selection = ColoringConstruction::new();
        let mut solution = Solution::new(ExamAssignment::new(&m));
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut placed = 0;
        while let Some(n) = selection.select_neighbour(&m, &mut solution, &mut rng) {
            let iteration = solution.iteration() + 1;
            n.assign(&m, solution.assignment_mut(), iteration);
            solution.update(&m);
            placed += 1;
        }
        assert_eq!(placed, 3);
        assert!(solution.assignment().is_complete());
        assert!(solution.assignment().verify_consistency(&m).is_ok());
    }
}
