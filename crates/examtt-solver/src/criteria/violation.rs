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

//! Violation counters for hard constraints demoted to soft. When the
//! General.Soft* switches are on, the search is allowed to keep otherwise
//! forbidden placements and these criteria charge each breach instead.

use crate::assignment::ExamAssignment;
use crate::config::SolverConfig;
use crate::criteria::Criterion;
use crate::err::ConfigError;
use examtt_model::common::ExamId;
use examtt_model::model::{ExamModel, ExamPlacement};

/// Period options at or above the soft limit are treated as demoted hard
/// prohibitions; using one counts a violation.
#[derive(Debug, Clone)]
pub struct PeriodViolation {
    weight: f64,
    limit: i64,
}

impl PeriodViolation {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            weight: config.get_f64("Exams.PeriodViolationWeight", 500.0)?,
            limit: config.get_i64("Exams.SoftPeriodLimit", i64::MAX)?,
        })
    }
}

impl Criterion for PeriodViolation {
    fn name(&self) -> &'static str {
        "PeriodViolation"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn value_of(
        &self,
        model: &ExamModel,
        _assignment: &ExamAssignment,
        placement: &ExamPlacement,
        _ignore: &[ExamId],
    ) -> f64 {
        let exam = model.exam(placement.exam());
        let violated = exam
            .period_option(placement.period())
            .is_some_and(|o| i64::from(o.penalty()) >= self.limit);
        if violated { 1.0 } else { 0.0 }
    }

    fn value(&self, model: &ExamModel, assignment: &ExamAssignment) -> f64 {
        assignment
            .assigned_placements()
            .map(|p| self.value_of(model, assignment, p, &[]))
            .sum()
    }

    fn bounds(&self, model: &ExamModel, _assignment: &ExamAssignment) -> (f64, f64) {
        (0.0, model.nr_exams() as f64)
    }
}

/// Room options at or above the soft limit count a violation per room used.
#[derive(Debug, Clone)]
pub struct RoomViolation {
    weight: f64,
    limit: i64,
}

impl RoomViolation {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            weight: config.get_f64("Exams.RoomViolationWeight", 500.0)?,
            limit: config.get_i64("Exams.SoftRoomLimit", i64::MAX)?,
        })
    }
}

impl Criterion for RoomViolation {
    fn name(&self) -> &'static str {
        "RoomViolation"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn value_of(
        &self,
        model: &ExamModel,
        _assignment: &ExamAssignment,
        placement: &ExamPlacement,
        _ignore: &[ExamId],
    ) -> f64 {
        let exam = model.exam(placement.exam());
        placement
            .rooms()
            .iter()
            .filter(|r| {
                exam.room_option(**r)
                    .is_some_and(|o| i64::from(o.penalty()) >= self.limit)
            })
            .count() as f64
    }

    fn value(&self, model: &ExamModel, assignment: &ExamAssignment) -> f64 {
        assignment
            .assigned_placements()
            .map(|p| self.value_of(model, assignment, p, &[]))
            .sum()
    }
}

/// Violated pairs of hard distribution constraints; only meaningful when
/// General.SoftDistributions stops the assignment from evicting them.
#[derive(Debug, Clone)]
pub struct DistributionViolation {
    weight: f64,
}

impl DistributionViolation {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            weight: config.get_f64("Exams.DistributionViolationWeight", 500.0)?,
        })
    }
}

impl Criterion for DistributionViolation {
    fn name(&self) -> &'static str {
        "DistributionViolation"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn value_of(
        &self,
        model: &ExamModel,
        assignment: &ExamAssignment,
        placement: &ExamPlacement,
        ignore: &[ExamId],
    ) -> f64 {
        let exam = placement.exam();
        let mut violations = 0u32;
        for &cid in model.exam(exam).constraints() {
            let constraint = model.constraint(cid);
            if !constraint.is_hard() {
                continue;
            }
            let my_pos = constraint.exams().iter().position(|e| *e == exam);
            for (pos, &other) in constraint.exams().iter().enumerate() {
                if other == exam || ignore.contains(&other) {
                    continue;
                }
                let Some(q) = assignment.placement(other) else {
                    continue;
                };
                let first_before_second = my_pos.is_none_or(|p| p < pos);
                if !constraint.is_pair_consistent(
                    placement,
                    q,
                    |p| model.day_of(p.period()),
                    first_before_second,
                ) {
                    violations += 1;
                }
            }
        }
        f64::from(violations)
    }

    fn value(&self, model: &ExamModel, assignment: &ExamAssignment) -> f64 {
        let mut violations = 0u32;
        for constraint in model.constraints() {
            if !constraint.is_hard() {
                continue;
            }
            let exams = constraint.exams();
            for (i, &first) in exams.iter().enumerate() {
                let Some(p) = assignment.placement(first) else {
                    continue;
                };
                for &second in exams.iter().skip(i + 1) {
                    let Some(q) = assignment.placement(second) else {
                        continue;
                    };
                    if !constraint.is_pair_consistent(p, q, |x| model.day_of(x.period()), true) {
                        violations += 1;
                    }
                }
            }
        }
        f64::from(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SolverModel;
    use examtt_model::common::{PeriodId, RoomId};
    use examtt_model::model::{DistributionType, ExamModel, PeriodOption, RoomOption};

    fn model() -> SolverModel {
        let mut b = ExamModel::builder();
        let p0 = b.add_period(0, 480, 120, 0.0);
        let p1 = b.add_period(0, 660, 120, 0.0);
        let r0 = b.add_room("A", 10, 10, None);
        let r1 = b.add_room("B", 10, 10, None);
        let e0 = b.add_exam("X", 5, 120);
        let e1 = b.add_exam("Y", 5, 120);
        for e in [e0, e1] {
            b.exam_mut(e).add_period(PeriodOption::new(p0, 0));
            b.exam_mut(e).add_period(PeriodOption::new(p1, 99));
            b.exam_mut(e).add_room(RoomOption::new(r0, 0));
            b.exam_mut(e).add_room(RoomOption::new(r1, 99));
        }
        b.add_constraint(DistributionType::SamePeriod, true, 0.0, vec![e0, e1])
            .unwrap();
        let mut config = SolverConfig::new();
        config.set("General.SoftPeriods", "true");
        config.set("General.SoftRooms", "true");
        config.set("General.SoftDistributions", "true");
        config.set("Exams.SoftPeriodLimit", "99");
        config.set("Exams.SoftRoomLimit", "99");
        SolverModel::from_model(b.build().unwrap(), &config).unwrap()
    }

    fn config() -> SolverConfig {
        let mut config = SolverConfig::new();
        config.set("Exams.SoftPeriodLimit", "99");
        config.set("Exams.SoftRoomLimit", "99");
        config
    }

    #[test]
    fn test_period_and_room_violations() {
        let m = model();
        let pv = PeriodViolation::new(&config()).unwrap();
        let rv = RoomViolation::new(&config()).unwrap();
        let mut a = ExamAssignment::new(&m);
        a.assign(
            &m,
            0,
            ExamPlacement::new(ExamId::new(0), PeriodId::new(1), [RoomId::new(1)]),
        );
        assert_eq!(pv.value(m.problem(), &a), 1.0);
        assert_eq!(rv.value(m.problem(), &a), 1.0);

        a.assign(
            &m,
            1,
            ExamPlacement::new(ExamId::new(0), PeriodId::new(0), [RoomId::new(0)]),
        );
        assert_eq!(pv.value(m.problem(), &a), 0.0);
        assert_eq!(rv.value(m.problem(), &a), 0.0);
    }

    #[test]
    fn test_distribution_violation_counts_hard_breaches() {
        let m = model();
        let dv = DistributionViolation::new(&SolverConfig::new()).unwrap();
        let mut a = ExamAssignment::new(&m);
        a.assign(
            &m,
            0,
            ExamPlacement::new(ExamId::new(0), PeriodId::new(0), [RoomId::new(0)]),
        );
        // Soft distributions: conflicting placement is not evicted.
        let clash = ExamPlacement::new(ExamId::new(1), PeriodId::new(1), [RoomId::new(1)]);
        assert!(a.conflicts(&m, &clash).is_empty());
        a.assign(&m, 1, clash);
        assert_eq!(dv.value(m.problem(), &a), 1.0);
        assert!(a.verify_consistency(&m).is_ok());
    }
}
