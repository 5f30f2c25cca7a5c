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
use crate::criteria::{Criterion, assigned_placements_of};
use crate::err::ConfigError;
use examtt_model::common::ExamId;
use examtt_model::model::{ExamModel, ExamPlacement};
use std::collections::HashMap;

/// Students with two exams in the same period. Each student's k-th
/// simultaneous exam beyond the first counts one conflict.
#[derive(Debug, Clone)]
pub struct StudentDirectConflicts {
    weight: f64,
}

impl StudentDirectConflicts {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            weight: config.get_f64("Exams.DirectConflictWeight", 1000.0)?,
        })
    }
}

impl Criterion for StudentDirectConflicts {
    fn name(&self) -> &'static str {
        "StudentDirectConflicts"
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
        let mut conflicts = 0u32;
        for &sid in model.exam(exam).students() {
            let clash = model.student(sid).exams().iter().any(|&other| {
                other != exam
                    && !ignore.contains(&other)
                    && assignment
                        .placement(other)
                        .is_some_and(|q| q.period() == placement.period())
            });
            if clash {
                conflicts += 1;
            }
        }
        f64::from(conflicts)
    }

    fn value(&self, model: &ExamModel, assignment: &ExamAssignment) -> f64 {
        let mut total = 0usize;
        for student in model.students() {
            let mut per_period: HashMap<usize, usize> = HashMap::new();
            for placement in assigned_placements_of(assignment, student.exams()) {
                *per_period.entry(placement.period().get()).or_default() += 1;
            }
            total += per_period.values().map(|n| n - 1).sum::<usize>();
        }
        total as f64
    }
}

/// Students scheduled into a period they are not available in.
#[derive(Debug, Clone)]
pub struct StudentNotAvailableConflicts {
    weight: f64,
}

impl StudentNotAvailableConflicts {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            weight: config.get_f64("Exams.NotAvailableWeight", 1000.0)?,
        })
    }
}

impl Criterion for StudentNotAvailableConflicts {
    fn name(&self) -> &'static str {
        "StudentNotAvailableConflicts"
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
        let count = model
            .exam(placement.exam())
            .students()
            .iter()
            .filter(|&&sid| !model.student(sid).is_available(placement.period()))
            .count();
        count as f64
    }

    fn value(&self, model: &ExamModel, assignment: &ExamAssignment) -> f64 {
        assignment
            .assigned_placements()
            .map(|p| self.value_of(model, assignment, p, &[]))
            .sum()
    }
}

/// Students with exams in consecutive periods. With the day-break flag off
/// (the default) a pair straddling two days does not count.
#[derive(Debug, Clone)]
pub struct StudentBackToBackConflicts {
    weight: f64,
    across_days: bool,
}

impl StudentBackToBackConflicts {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            weight: config.get_f64("Exams.BackToBackConflictWeight", 10.0)?,
            across_days: config.get_bool("Exams.IsDayBreakBackToBack", false)?,
        })
    }
}

impl Criterion for StudentBackToBackConflicts {
    fn name(&self) -> &'static str {
        "StudentBackToBackConflicts"
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
        let mut pairs = 0u32;
        for &sid in model.exam(exam).students() {
            for &other in model.student(sid).exams() {
                if other == exam || ignore.contains(&other) {
                    continue;
                }
                if let Some(q) = assignment.placement(other) {
                    if model.are_back_to_back(placement.period(), q.period(), self.across_days) {
                        pairs += 1;
                    }
                }
            }
        }
        f64::from(pairs)
    }

    fn value(&self, model: &ExamModel, assignment: &ExamAssignment) -> f64 {
        let mut total = 0usize;
        for student in model.students() {
            let placements = assigned_placements_of(assignment, student.exams());
            for (i, a) in placements.iter().enumerate() {
                for b in placements.iter().skip(i + 1) {
                    if model.are_back_to_back(a.period(), b.period(), self.across_days) {
                        total += 1;
                    }
                }
            }
        }
        total as f64
    }
}

/// Back-to-back pairs on the same day whose rooms are further apart than the
/// configured distance limit.
#[derive(Debug, Clone)]
pub struct StudentDistanceBackToBackConflicts {
    weight: f64,
    distance: f64,
}

impl StudentDistanceBackToBackConflicts {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            weight: config.get_f64("Exams.DistanceBackToBackConflictWeight", 25.0)?,
            distance: config.get_f64("Exams.BackToBackDistance", -1.0)?,
        })
    }
}

impl Criterion for StudentDistanceBackToBackConflicts {
    fn name(&self) -> &'static str {
        "StudentDistanceBackToBackConflicts"
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
        if self.distance < 0.0 {
            return 0.0;
        }
        let exam = placement.exam();
        let mut pairs = 0u32;
        for &sid in model.exam(exam).students() {
            for &other in model.student(sid).exams() {
                if other == exam || ignore.contains(&other) {
                    continue;
                }
                if let Some(q) = assignment.placement(other) {
                    if model.are_back_to_back(placement.period(), q.period(), false)
                        && model.placement_distance(placement, q) > self.distance
                    {
                        pairs += 1;
                    }
                }
            }
        }
        f64::from(pairs)
    }

    fn value(&self, model: &ExamModel, assignment: &ExamAssignment) -> f64 {
        if self.distance < 0.0 {
            return 0.0;
        }
        let mut total = 0usize;
        for student in model.students() {
            let placements = assigned_placements_of(assignment, student.exams());
            for (i, a) in placements.iter().enumerate() {
                for b in placements.iter().skip(i + 1) {
                    if model.are_back_to_back(a.period(), b.period(), false)
                        && model.placement_distance(a, b) > self.distance
                    {
                        total += 1;
                    }
                }
            }
        }
        total as f64
    }
}

/// Students sitting three or more exams on one day; the k-th exam of a day
/// beyond the second counts one conflict.
#[derive(Debug, Clone)]
pub struct StudentMoreThan2ADayConflicts {
    weight: f64,
}

impl StudentMoreThan2ADayConflicts {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            weight: config.get_f64("Exams.MoreThanTwoADayWeight", 100.0)?,
        })
    }
}

impl Criterion for StudentMoreThan2ADayConflicts {
    fn name(&self) -> &'static str {
        "StudentMoreThan2ADayConflicts"
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
        let day = model.day_of(placement.period());
        let mut conflicts = 0u32;
        for &sid in model.exam(exam).students() {
            let same_day = model
                .student(sid)
                .exams()
                .iter()
                .filter(|&&other| {
                    other != exam
                        && !ignore.contains(&other)
                        && assignment
                            .placement(other)
                            .is_some_and(|q| model.day_of(q.period()) == day)
                })
                .count();
            if same_day >= 2 {
                conflicts += 1;
            }
        }
        f64::from(conflicts)
    }

    fn value(&self, model: &ExamModel, assignment: &ExamAssignment) -> f64 {
        let mut total = 0usize;
        for student in model.students() {
            let mut per_day: HashMap<u32, usize> = HashMap::new();
            for placement in assigned_placements_of(assignment, student.exams()) {
                *per_day.entry(model.day_of(placement.period())).or_default() += 1;
            }
            total += per_day.values().map(|n| n.saturating_sub(2)).sum::<usize>();
        }
        total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SolverModel;
    use examtt_model::common::{PeriodId, RoomId};
    use examtt_model::model::{ExamModel, PeriodOption, RoomOption};

    /// One student in three exams; 4 periods on 2 days; one room per exam.
    fn model() -> SolverModel {
        let mut b = ExamModel::builder();
        let periods = [
            b.add_period(0, 480, 120, 0.0),
            b.add_period(0, 660, 120, 0.0),
            b.add_period(1, 480, 120, 0.0),
            b.add_period(1, 660, 120, 0.0),
        ];
        let rooms = [
            b.add_room("A", 10, 10, Some((0.0, 0.0))),
            b.add_room("B", 10, 10, Some((1000.0, 0.0))),
            b.add_room("C", 10, 10, Some((0.0, 5.0))),
        ];
        let exams = [
            b.add_exam("X", 1, 120),
            b.add_exam("Y", 1, 120),
            b.add_exam("Z", 1, 120),
        ];
        for e in exams {
            for p in periods {
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
        b.set_student_unavailable(s, periods[3]);
        let mut config = SolverConfig::new();
        config.set("Exams.BackToBackDistance", "670");
        SolverModel::from_model(b.build().unwrap(), &config).unwrap()
    }

    fn place(
        a: &mut ExamAssignment,
        model: &SolverModel,
        exam: usize,
        period: usize,
        room: usize,
    ) {
        a.assign(
            model,
            0,
            ExamPlacement::new(ExamId::new(exam), PeriodId::new(period), [RoomId::new(room)]),
        );
    }

    #[test]
    fn test_direct_conflicts_count_extra_exams() {
        let m = model();
        let c = StudentDirectConflicts::new(&SolverConfig::new()).unwrap();
        let mut a = ExamAssignment::new(&m);
        place(&mut a, &m, 0, 0, 0);
        place(&mut a, &m, 1, 0, 1);
        assert_eq!(c.value(m.problem(), &a), 1.0);
        place(&mut a, &m, 2, 0, 2);
        // three simultaneous exams of one student = two conflicts
        assert_eq!(c.value(m.problem(), &a), 2.0);
        assert!(a.verify_consistency(&m).is_ok());
    }

    #[test]
    fn test_direct_conflict_delta_respects_ignore() {
        let m = model();
        let c = StudentDirectConflicts::new(&SolverConfig::new()).unwrap();
        let mut a = ExamAssignment::new(&m);
        place(&mut a, &m, 0, 0, 0);

        let clash = ExamPlacement::new(ExamId::new(1), PeriodId::new(0), [RoomId::new(1)]);
        assert_eq!(c.value_of(m.problem(), &a, &clash, &[]), 1.0);
        // With exam 0 marked for removal the clash disappears.
        assert_eq!(c.value_of(m.problem(), &a, &clash, &[ExamId::new(0)]), 0.0);
    }

    #[test]
    fn test_not_available() {
        let m = model();
        let c = StudentNotAvailableConflicts::new(&SolverConfig::new()).unwrap();
        let mut a = ExamAssignment::new(&m);
        place(&mut a, &m, 0, 3, 0);
        assert_eq!(c.value(m.problem(), &a), 1.0);
        place(&mut a, &m, 1, 0, 1);
        assert_eq!(c.value(m.problem(), &a), 1.0);
    }

    #[test]
    fn test_back_to_back_suppressed_across_day_break() {
        let m = model();
        let c = StudentBackToBackConflicts::new(&SolverConfig::new()).unwrap();
        let mut a = ExamAssignment::new(&m);
        // periods 0-1 on one day: counts
        place(&mut a, &m, 0, 0, 0);
        place(&mut a, &m, 1, 1, 1);
        assert_eq!(c.value(m.problem(), &a), 1.0);
        // periods 1-2 adjacent but different days: does not count
        place(&mut a, &m, 2, 2, 2);
        assert_eq!(c.value(m.problem(), &a), 1.0);
    }

    #[test]
    fn test_back_to_back_across_days_when_enabled() {
        let m = model();
        let mut config = SolverConfig::new();
        config.set("Exams.IsDayBreakBackToBack", "true");
        let c = StudentBackToBackConflicts::new(&config).unwrap();
        let mut a = ExamAssignment::new(&m);
        place(&mut a, &m, 0, 1, 0);
        place(&mut a, &m, 1, 2, 1);
        assert_eq!(c.value(m.problem(), &a), 1.0);
    }

    #[test]
    fn test_distance_back_to_back() {
        let m = model();
        let mut config = SolverConfig::new();
        config.set("Exams.BackToBackDistance", "670");
        let c = StudentDistanceBackToBackConflicts::new(&config).unwrap();
        let mut a = ExamAssignment::new(&m);
        // rooms A and B are 1000 apart, periods 0 and 1 back-to-back
        place(&mut a, &m, 0, 0, 0);
        place(&mut a, &m, 1, 1, 1);
        assert_eq!(c.value(m.problem(), &a), 1.0);
        // move exam 1 next door (room C, 5 away): no distance conflict
        place(&mut a, &m, 1, 1, 2);
        assert_eq!(c.value(m.problem(), &a), 0.0);
    }

    #[test]
    fn test_more_than_two_a_day() {
        let m = model();
        let c = StudentMoreThan2ADayConflicts::new(&SolverConfig::new()).unwrap();
        let mut a = ExamAssignment::new(&m);
        place(&mut a, &m, 0, 0, 0);
        place(&mut a, &m, 1, 1, 1);
        assert_eq!(c.value(m.problem(), &a), 0.0);
        // third exam on day 0 comes from period 0 again (different room)
        place(&mut a, &m, 2, 0, 2);
        assert_eq!(c.value(m.problem(), &a), 1.0);
        assert!(a.verify_consistency(&m).is_ok());
    }
}
