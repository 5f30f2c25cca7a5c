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

/// Soft room preferences: sum of the exam's penalties for its chosen rooms.
#[derive(Debug, Clone)]
pub struct RoomPenalty {
    weight: f64,
}

impl RoomPenalty {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            weight: config.get_f64("Exams.RoomWeight", 1.0)?,
        })
    }
}

impl Criterion for RoomPenalty {
    fn name(&self) -> &'static str {
        "RoomPenalty"
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
            .map(|r| exam.room_option(*r).map(|o| f64::from(o.penalty())).unwrap_or(0.0))
            .sum()
    }

    fn value(&self, model: &ExamModel, assignment: &ExamAssignment) -> f64 {
        assignment
            .assigned_placements()
            .map(|p| self.value_of(model, assignment, p, &[]))
            .sum()
    }

    fn bounds(&self, model: &ExamModel, _assignment: &ExamAssignment) -> (f64, f64) {
        let mut min = 0.0;
        let mut max = 0.0;
        for exam in model.exams() {
            if exam.max_rooms() == 0 || exam.rooms().is_empty() {
                continue;
            }
            let mut penalties: Vec<i32> = exam.rooms().iter().map(|o| o.penalty()).collect();
            penalties.sort_unstable();
            min += f64::from(penalties[0]);
            max += penalties
                .iter()
                .rev()
                .take(exam.max_rooms())
                .map(|p| f64::from(*p))
                .sum::<f64>();
        }
        (min, max)
    }
}

/// Wasted seats: total capacity of the chosen rooms minus the exam size.
#[derive(Debug, Clone)]
pub struct RoomSizePenalty {
    weight: f64,
}

impl RoomSizePenalty {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            weight: config.get_f64("Exams.RoomSizeWeight", 0.001)?,
        })
    }
}

impl Criterion for RoomSizePenalty {
    fn name(&self) -> &'static str {
        "RoomSizePenalty"
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
        let seats: u32 = placement
            .rooms()
            .iter()
            .map(|r| model.room(*r).capacity(exam.alt_seating()))
            .sum();
        f64::from(seats.saturating_sub(exam.size()))
    }

    fn value(&self, model: &ExamModel, assignment: &ExamAssignment) -> f64 {
        assignment
            .assigned_placements()
            .map(|p| self.value_of(model, assignment, p, &[]))
            .sum()
    }
}

/// Penalizes splitting an exam over several rooms, quadratically in the
/// number of extra rooms.
#[derive(Debug, Clone)]
pub struct RoomSplitPenalty {
    weight: f64,
}

impl RoomSplitPenalty {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            weight: config.get_f64("Exams.RoomSplitWeight", 10.0)?,
        })
    }
}

impl Criterion for RoomSplitPenalty {
    fn name(&self) -> &'static str {
        "RoomSplitPenalty"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn value_of(
        &self,
        _model: &ExamModel,
        _assignment: &ExamAssignment,
        placement: &ExamPlacement,
        _ignore: &[ExamId],
    ) -> f64 {
        let extra = placement.nr_rooms().saturating_sub(1);
        (extra * extra) as f64
    }

    fn value(&self, model: &ExamModel, assignment: &ExamAssignment) -> f64 {
        assignment
            .assigned_placements()
            .map(|p| self.value_of(model, assignment, p, &[]))
            .sum()
    }
}

/// For split exams, the largest distance between any two of the chosen
/// rooms.
#[derive(Debug, Clone)]
pub struct RoomSplitDistancePenalty {
    weight: f64,
}

impl RoomSplitDistancePenalty {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            weight: config.get_f64("Exams.RoomSplitDistanceWeight", 0.01)?,
        })
    }
}

impl Criterion for RoomSplitDistancePenalty {
    fn name(&self) -> &'static str {
        "RoomSplitDistancePenalty"
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
        if !placement.is_split() {
            return 0.0;
        }
        let rooms = placement.rooms();
        let mut max = 0.0_f64;
        for (i, a) in rooms.iter().enumerate() {
            for b in rooms.iter().skip(i + 1) {
                max = max.max(model.room_distance(*a, *b));
            }
        }
        max
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
        let p = b.add_period(0, 480, 120, 0.0);
        let r0 = b.add_room("A", 100, 50, Some((0.0, 0.0)));
        let r1 = b.add_room("B", 150, 75, Some((60.0, 80.0)));
        let e = b.add_exam("X", 200, 120);
        b.exam_mut(e).add_period(PeriodOption::new(p, 0));
        b.exam_mut(e).add_room(RoomOption::new(r0, 1));
        b.exam_mut(e).add_room(RoomOption::new(r1, 2));
        SolverModel::from_model(b.build().unwrap(), &SolverConfig::new()).unwrap()
    }

    fn split_placement() -> ExamPlacement {
        ExamPlacement::new(ExamId::new(0), PeriodId::new(0), [RoomId::new(0), RoomId::new(1)])
    }

    #[test]
    fn test_room_penalty_sums_options() {
        let m = model();
        let c = RoomPenalty::new(&SolverConfig::new()).unwrap();
        let mut a = ExamAssignment::new(&m);
        a.assign(&m, 0, split_placement());
        assert_eq!(c.value(m.problem(), &a), 3.0);
    }

    #[test]
    fn test_room_size_counts_wasted_seats() {
        let m = model();
        let c = RoomSizePenalty::new(&SolverConfig::new()).unwrap();
        let mut a = ExamAssignment::new(&m);
        // 100 + 150 seats for 200 students: 50 wasted
        a.assign(&m, 0, split_placement());
        assert_eq!(c.value(m.problem(), &a), 50.0);
    }

    #[test]
    fn test_room_split_penalties() {
        let m = model();
        let split = RoomSplitPenalty::new(&SolverConfig::new()).unwrap();
        let dist = RoomSplitDistancePenalty::new(&SolverConfig::new()).unwrap();
        let mut a = ExamAssignment::new(&m);
        a.assign(&m, 0, split_placement());
        // two rooms: (2-1)^2 = 1
        assert_eq!(split.value(m.problem(), &a), 1.0);
        // 3-4-5 triangle times 20
        assert_eq!(dist.value(m.problem(), &a), 100.0);
        assert!(a.verify_consistency(&m).is_ok());
    }
}
