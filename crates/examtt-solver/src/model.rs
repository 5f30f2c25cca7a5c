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
use crate::criteria::{self, Criterion};
use crate::err::ConfigError;
use examtt_model::common::ExamId;
use examtt_model::model::{ExamModel, ExamPlacement};
use smallvec::SmallVec;

/// The solver-side model: the immutable problem plus the registered criteria
/// and the feasibility switches read from the configuration. Shared
/// read-only between all workers.
pub struct SolverModel {
    problem: ExamModel,
    criteria: Vec<Box<dyn Criterion>>,
    soft_distributions: bool,
}

impl SolverModel {
    pub fn from_model(problem: ExamModel, config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            problem,
            criteria: criteria::register_all(config)?,
            soft_distributions: config.get_bool("General.SoftDistributions", false)?,
        })
    }

    #[inline]
    pub fn problem(&self) -> &ExamModel {
        &self.problem
    }

    /// The registered criteria, in registration order. The assignment's
    /// cached totals use the same indices.
    #[inline]
    pub fn criteria(&self) -> &[Box<dyn Criterion>] {
        &self.criteria
    }

    /// Hard distribution constraints are demoted to soft violations.
    #[inline]
    pub fn soft_distributions(&self) -> bool {
        self.soft_distributions
    }

    pub fn criterion_named(&self, name: &str) -> Option<(usize, &dyn Criterion)> {
        self.criteria
            .iter()
            .position(|c| c.name() == name)
            .map(|i| (i, self.criteria[i].as_ref()))
    }

    /// Weighted total over the assignment's cached criterion values.
    pub fn total_value(&self, assignment: &ExamAssignment) -> f64 {
        self.criteria
            .iter()
            .enumerate()
            .map(|(i, c)| c.weight() * assignment.criterion_value(i))
            .sum()
    }

    /// Weighted total recomputed criterion by criterion; the reference value
    /// for consistency checks and tests.
    pub fn total_value_from_scratch(&self, assignment: &ExamAssignment) -> f64 {
        self.criteria
            .iter()
            .map(|c| c.weight() * c.value(&self.problem, assignment))
            .sum()
    }

    /// Weighted total removed by unassigning `exam` alone.
    pub fn removal_value(&self, assignment: &ExamAssignment, exam: ExamId) -> f64 {
        let Some(placement) = assignment.placement(exam) else {
            return 0.0;
        };
        self.criteria
            .iter()
            .map(|c| c.weight() * c.value_of(&self.problem, assignment, placement, &[]))
            .sum()
    }

    /// Installs saved placements (a warm start from the instance file),
    /// skipping any that are infeasible or collide with one already applied.
    /// Returns how many were applied.
    pub fn apply_placements(
        &self,
        assignment: &mut ExamAssignment,
        placements: &[ExamPlacement],
    ) -> usize {
        let mut applied = 0;
        for placement in placements {
            if self.problem.check_placement(placement).is_err() {
                tracing::warn!("skipping saved infeasible placement {placement}");
                continue;
            }
            if !assignment.conflicts(self, placement).is_empty() {
                tracing::warn!("skipping saved conflicting placement {placement}");
                continue;
            }
            assignment.assign(self, 0, placement.clone());
            applied += 1;
        }
        applied
    }

    /// Predicted change of the weighted total if `placement` were assigned
    /// after unassigning `conflicts` (and the exam's own current placement).
    /// Exact up to floating-point associativity: removals are valued as an
    /// ordered sequence so mutually conflicting pairs are not double-counted.
    pub fn move_delta(
        &self,
        assignment: &ExamAssignment,
        placement: &ExamPlacement,
        conflicts: &[ExamId],
    ) -> f64 {
        let mut removed: SmallVec<[ExamId; 8]> = SmallVec::new();
        if assignment.placement(placement.exam()).is_some() {
            removed.push(placement.exam());
        }
        for &exam in conflicts {
            if exam != placement.exam() && !removed.contains(&exam) {
                removed.push(exam);
            }
        }

        let mut delta = 0.0;
        for criterion in &self.criteria {
            let weight = criterion.weight();
            for (k, &exam) in removed.iter().enumerate() {
                if let Some(q) = assignment.placement(exam) {
                    delta -= weight * criterion.value_of(&self.problem, assignment, q, &removed[..k]);
                }
            }
            delta += weight * criterion.value_of(&self.problem, assignment, placement, &removed);
        }
        delta
    }
}

impl std::fmt::Debug for SolverModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolverModel")
            .field("problem", &self.problem.name())
            .field("criteria", &self.criteria.len())
            .field("soft_distributions", &self.soft_distributions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use examtt_model::common::{PeriodId, RoomId};
    use examtt_model::model::{PeriodOption, RoomOption};

    /// 3 exams, one shared student across all, 2 periods, 3 rooms.
    fn model() -> SolverModel {
        let mut b = ExamModel::builder();
        let p0 = b.add_period(0, 480, 120, 0.0);
        let p1 = b.add_period(0, 660, 120, 0.0);
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
            for p in [p0, p1] {
                b.exam_mut(e).add_period(PeriodOption::new(p, 0));
            }
            for r in rooms {
                b.exam_mut(e).add_room(RoomOption::new(r, 0));
            }
        }
        let s = b.add_student();
        for e in exams {
            b.enroll(s, e);
        }
        SolverModel::from_model(b.build().unwrap(), &SolverConfig::new()).unwrap()
    }

    fn plc(exam: usize, period: usize, room: usize) -> ExamPlacement {
        ExamPlacement::new(ExamId::new(exam), PeriodId::new(period), [RoomId::new(room)])
    }

    #[test]
    fn test_total_value_matches_scratch() {
        let m = model();
        let mut a = ExamAssignment::new(&m);
        a.assign(&m, 0, plc(0, 0, 0));
        a.assign(&m, 1, plc(1, 0, 1));
        a.assign(&m, 2, plc(2, 1, 0));
        assert!((m.total_value(&a) - m.total_value_from_scratch(&a)).abs() < 1e-9);
    }

    #[test]
    fn test_move_delta_predicts_actual_change() {
        let m = model();
        let mut a = ExamAssignment::new(&m);
        a.assign(&m, 0, plc(0, 0, 0));
        a.assign(&m, 1, plc(1, 1, 1));

        // Move exam 1 into period 0 next to exam 0: creates a direct conflict.
        let target = plc(1, 0, 2);
        let conflicts = a.conflicts(&m, &target);
        assert!(conflicts.is_empty());
        let predicted = m.move_delta(&a, &target, &conflicts);

        let before = m.total_value(&a);
        a.assign(&m, 2, target);
        let actual = m.total_value(&a) - before;
        assert!(
            (predicted - actual).abs() < 1e-9,
            "predicted {predicted}, actual {actual}"
        );
    }

    #[test]
    fn test_move_delta_with_eviction_matches_sequential_application() {
        let m = model();
        let mut a = ExamAssignment::new(&m);
        a.assign(&m, 0, plc(0, 0, 0));
        a.assign(&m, 1, plc(1, 0, 1));
        a.assign(&m, 2, plc(2, 1, 2));

        // Exam 2 wants room A in period 0: evicts exam 0.
        let target = plc(2, 0, 0);
        let conflicts = a.conflicts(&m, &target);
        assert_eq!(conflicts, vec![ExamId::new(0)]);
        let predicted = m.move_delta(&a, &target, &conflicts);

        let before = m.total_value(&a);
        a.unassign(&m, 3, ExamId::new(0));
        a.assign(&m, 3, target);
        let actual = m.total_value(&a) - before;
        assert!(
            (predicted - actual).abs() < 1e-9,
            "predicted {predicted}, actual {actual}"
        );
        assert!(a.verify_consistency(&m).is_ok());
    }

    #[test]
    fn test_removal_value_is_weighted() {
        let m = model();
        let mut a = ExamAssignment::new(&m);
        a.assign(&m, 0, plc(0, 0, 0));
        a.assign(&m, 1, plc(1, 0, 1));
        // removing either exam kills one direct conflict (weight 1000)
        // plus its period-size contribution (2 students * period 1 * weight 1)
        let removed = m.removal_value(&a, ExamId::new(1));
        assert!(removed >= 1000.0);
    }

    #[test]
    fn test_criterion_named() {
        let m = model();
        assert!(m.criterion_named("StudentDirectConflicts").is_some());
        assert!(m.criterion_named("NoSuchCriterion").is_none());
    }
}
