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
use crate::criteria::Criterion;
use crate::err::ConfigError;
use examtt_model::common::ExamId;
use examtt_model::model::{ExamModel, ExamPlacement};

/// Large exams scheduled into the tail of the session. An exam counts as
/// large at or above the configured size; the tail starts at the configured
/// fraction of the period count.
#[derive(Debug, Clone)]
pub struct LargeExamsPenalty {
    weight: f64,
    large_size: i64,
    large_period: f64,
}

impl LargeExamsPenalty {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            weight: config.get_f64("Exams.LargeWeight", 1.0)?,
            large_size: config.get_i64("Exams.LargeSize", -1)?,
            large_period: config.get_f64("Exams.LargePeriod", 0.67)?,
        })
    }

    #[inline]
    pub fn large_size(&self) -> i64 {
        self.large_size
    }

    fn first_penalized_period(&self, model: &ExamModel) -> usize {
        (self.large_period * model.nr_periods() as f64).ceil() as usize
    }
}

impl Criterion for LargeExamsPenalty {
    fn name(&self) -> &'static str {
        "LargeExamsPenalty"
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
        if self.large_size < 0 {
            return 0.0;
        }
        let exam = model.exam(placement.exam());
        if exam.is_large(self.large_size)
            && placement.period().get() >= self.first_penalized_period(model)
        {
            1.0
        } else {
            0.0
        }
    }

    fn value(&self, model: &ExamModel, assignment: &ExamAssignment) -> f64 {
        assignment
            .assigned_placements()
            .map(|p| self.value_of(model, assignment, p, &[]))
            .sum()
    }

    fn bounds(&self, model: &ExamModel, _assignment: &ExamAssignment) -> (f64, f64) {
        let large = model
            .exams()
            .iter()
            .filter(|e| e.is_large(self.large_size))
            .count();
        (0.0, large as f64)
    }
}

/// Keeps exams near the periods they were held in past terms: the penalty
/// grows with both the assigned period and the historic average.
#[derive(Debug, Clone)]
pub struct ExamRotationPenalty {
    weight: f64,
}

impl ExamRotationPenalty {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            weight: config.get_f64("Exams.ExamRotationWeight", 0.001)?,
        })
    }
}

impl Criterion for ExamRotationPenalty {
    fn name(&self) -> &'static str {
        "ExamRotationPenalty"
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
        match model.exam(placement.exam()).average_period() {
            Some(avg) => (placement.period().get() as f64 + 1.0) * (f64::from(avg) + 1.0),
            None => 0.0,
        }
    }

    fn value(&self, model: &ExamModel, assignment: &ExamAssignment) -> f64 {
        assignment
            .assigned_placements()
            .map(|p| self.value_of(model, assignment, p, &[]))
            .sum()
    }
}

/// Minimal-perturbation pressure: distance in periods between the current
/// placement and the initial one loaded with the instance.
#[derive(Debug, Clone)]
pub struct PerturbationPenalty {
    weight: f64,
}

impl PerturbationPenalty {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            weight: config.get_f64("Exams.PerturbationWeight", 0.01)?,
        })
    }
}

impl Criterion for PerturbationPenalty {
    fn name(&self) -> &'static str {
        "PerturbationPenalty"
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
        match model.exam(placement.exam()).initial() {
            Some(initial) => model.period_distance(initial.period(), placement.period()) as f64,
            None => 0.0,
        }
    }

    fn value(&self, model: &ExamModel, assignment: &ExamAssignment) -> f64 {
        assignment
            .assigned_placements()
            .map(|p| self.value_of(model, assignment, p, &[]))
            .sum()
    }
}

/// Minimal-perturbation pressure on rooms: how many of the current rooms
/// were not part of the initial placement.
#[derive(Debug, Clone)]
pub struct RoomPerturbationPenalty {
    weight: f64,
}

impl RoomPerturbationPenalty {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            weight: config.get_f64("Exams.RoomPerturbationWeight", 0.01)?,
        })
    }
}

impl Criterion for RoomPerturbationPenalty {
    fn name(&self) -> &'static str {
        "RoomPerturbationPenalty"
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
        match model.exam(placement.exam()).initial() {
            Some(initial) => placement
                .rooms()
                .iter()
                .filter(|r| !initial.uses_room(**r))
                .count() as f64,
            None => 0.0,
        }
    }

    fn value(&self, model: &ExamModel, assignment: &ExamAssignment) -> f64 {
        assignment
            .assigned_placements()
            .map(|p| self.value_of(model, assignment, p, &[]))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SolverModel;
    use examtt_model::common::{PeriodId, RoomId};
    use examtt_model::model::{ExamModel, PeriodOption, RoomOption};

    fn model() -> SolverModel {
        let mut b = ExamModel::builder();
        let periods: Vec<_> = (0..6).map(|i| b.add_period(i / 2, 480, 120, 0.0)).collect();
        let r0 = b.add_room("A", 700, 700, None);
        let r1 = b.add_room("B", 700, 700, None);
        let e = b.add_exam("X", 650, 120);
        for &p in &periods {
            b.exam_mut(e).add_period(PeriodOption::new(p, 0));
        }
        b.exam_mut(e).add_room(RoomOption::new(r0, 0));
        b.exam_mut(e).add_room(RoomOption::new(r1, 0));
        b.exam_mut(e).set_average_period(Some(1));
        b.exam_mut(e)
            .set_initial(Some(ExamPlacement::new(e, periods[0], [r0])));
        let mut config = SolverConfig::new();
        config.set("Exams.LargeSize", "600");
        config.set("General.MPP", "true");
        SolverModel::from_model(b.build().unwrap(), &config).unwrap()
    }

    fn placed(m: &SolverModel, period: usize, room: usize) -> ExamAssignment {
        let mut a = ExamAssignment::new(m);
        a.assign(
            m,
            0,
            ExamPlacement::new(ExamId::new(0), PeriodId::new(period), [RoomId::new(room)]),
        );
        a
    }

    #[test]
    fn test_large_exam_in_tail_periods() {
        let m = model();
        let mut config = SolverConfig::new();
        config.set("Exams.LargeSize", "600");
        let c = LargeExamsPenalty::new(&config).unwrap();
        // ceil(0.67 * 6) = 5, so only the last period is penalized
        let early = placed(&m, 3, 0);
        assert_eq!(c.value(m.problem(), &early), 0.0);
        let late = placed(&m, 5, 0);
        assert_eq!(c.value(m.problem(), &late), 1.0);
        assert_eq!(c.bounds(m.problem(), &late), (0.0, 1.0));
    }

    #[test]
    fn test_rotation_penalty() {
        let m = model();
        let c = ExamRotationPenalty::new(&SolverConfig::new()).unwrap();
        let a = placed(&m, 2, 0);
        // (index 2 + 1) * (average 1 + 1)
        assert_eq!(c.value(m.problem(), &a), 6.0);
    }

    #[test]
    fn test_perturbation_penalties() {
        let m = model();
        let period = PerturbationPenalty::new(&SolverConfig::new()).unwrap();
        let room = RoomPerturbationPenalty::new(&SolverConfig::new()).unwrap();

        let unmoved = placed(&m, 0, 0);
        assert_eq!(period.value(m.problem(), &unmoved), 0.0);
        assert_eq!(room.value(m.problem(), &unmoved), 0.0);

        let moved = placed(&m, 3, 1);
        assert_eq!(period.value(m.problem(), &moved), 3.0);
        assert_eq!(room.value(m.problem(), &moved), 1.0);
        assert!(moved.verify_consistency(&m).is_ok());
    }
}
