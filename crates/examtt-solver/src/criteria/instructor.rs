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

//! Instructor counterparts of the student conflict criteria. The formulas
//! mirror the student versions over the instructor's exam list.

use crate::assignment::ExamAssignment;
use crate::config::SolverConfig;
use crate::criteria::{Criterion, assigned_placements_of};
use crate::err::ConfigError;
use examtt_model::common::ExamId;
use examtt_model::model::{ExamModel, ExamPlacement};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct InstructorDirectConflicts {
    weight: f64,
}

impl InstructorDirectConflicts {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            weight: config.get_f64("Exams.InstructorDirectConflictWeight", 1000.0)?,
        })
    }
}

impl Criterion for InstructorDirectConflicts {
    fn name(&self) -> &'static str {
        "InstructorDirectConflicts"
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
        for &iid in model.exam(exam).instructors() {
            let clash = model.instructor(iid).exams().iter().any(|&other| {
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
        for instructor in model.instructors() {
            let mut per_period: HashMap<usize, usize> = HashMap::new();
            for placement in assigned_placements_of(assignment, instructor.exams()) {
                *per_period.entry(placement.period().get()).or_default() += 1;
            }
            total += per_period.values().map(|n| n - 1).sum::<usize>();
        }
        total as f64
    }
}

#[derive(Debug, Clone)]
pub struct InstructorNotAvailableConflicts {
    weight: f64,
}

impl InstructorNotAvailableConflicts {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            weight: config.get_f64("Exams.InstructorNotAvailableWeight", 1000.0)?,
        })
    }
}

impl Criterion for InstructorNotAvailableConflicts {
    fn name(&self) -> &'static str {
        "InstructorNotAvailableConflicts"
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
            .instructors()
            .iter()
            .filter(|&&iid| !model.instructor(iid).is_available(placement.period()))
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

#[derive(Debug, Clone)]
pub struct InstructorBackToBackConflicts {
    weight: f64,
    across_days: bool,
}

impl InstructorBackToBackConflicts {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            weight: config.get_f64("Exams.InstructorBackToBackConflictWeight", 10.0)?,
            across_days: config.get_bool("Exams.IsDayBreakBackToBack", false)?,
        })
    }
}

impl Criterion for InstructorBackToBackConflicts {
    fn name(&self) -> &'static str {
        "InstructorBackToBackConflicts"
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
        for &iid in model.exam(exam).instructors() {
            for &other in model.instructor(iid).exams() {
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
        for instructor in model.instructors() {
            let placements = assigned_placements_of(assignment, instructor.exams());
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

#[derive(Debug, Clone)]
pub struct InstructorDistanceBackToBackConflicts {
    weight: f64,
    distance: f64,
}

impl InstructorDistanceBackToBackConflicts {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            weight: config.get_f64("Exams.InstructorDistanceBackToBackConflictWeight", 25.0)?,
            distance: config.get_f64("Exams.BackToBackDistance", -1.0)?,
        })
    }
}

impl Criterion for InstructorDistanceBackToBackConflicts {
    fn name(&self) -> &'static str {
        "InstructorDistanceBackToBackConflicts"
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
        for &iid in model.exam(exam).instructors() {
            for &other in model.instructor(iid).exams() {
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
        for instructor in model.instructors() {
            let placements = assigned_placements_of(assignment, instructor.exams());
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

#[derive(Debug, Clone)]
pub struct InstructorMoreThan2ADayConflicts {
    weight: f64,
}

impl InstructorMoreThan2ADayConflicts {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            weight: config.get_f64("Exams.InstructorMoreThanTwoADayWeight", 100.0)?,
        })
    }
}

impl Criterion for InstructorMoreThan2ADayConflicts {
    fn name(&self) -> &'static str {
        "InstructorMoreThan2ADayConflicts"
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
        for &iid in model.exam(exam).instructors() {
            let same_day = model
                .instructor(iid)
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
        for instructor in model.instructors() {
            let mut per_day: HashMap<u32, usize> = HashMap::new();
            for placement in assigned_placements_of(assignment, instructor.exams()) {
                *per_day.entry(model.day_of(placement.period())).or_default() += 1;
            }
            total += per_day.values().map(|n| n.saturating_sub(2)).sum::<usize>();
        }
        total as f64
    }
}
