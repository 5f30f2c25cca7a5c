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

/// Soft period preferences: the exam's own penalty for the chosen period
/// plus the period's global weight.
#[derive(Debug, Clone)]
pub struct PeriodPenalty {
    weight: f64,
}

impl PeriodPenalty {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            weight: config.get_f64("Exams.PeriodWeight", 1.0)?,
        })
    }
}

impl Criterion for PeriodPenalty {
    fn name(&self) -> &'static str {
        "PeriodPenalty"
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
        let option_penalty = exam
            .period_option(placement.period())
            .map(|o| f64::from(o.penalty()))
            .unwrap_or(0.0);
        option_penalty + model.period(placement.period()).weight()
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
            let costs: Vec<f64> = exam
                .periods()
                .iter()
                .map(|o| f64::from(o.penalty()) + model.period(o.period()).weight())
                .collect();
            if costs.is_empty() {
                continue;
            }
            min += costs.iter().cloned().fold(f64::INFINITY, f64::min);
            max += costs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        }
        (min, max)
    }
}

/// Index of the assigned period; a small pressure toward the front of the
/// examination session when weighted.
#[derive(Debug, Clone)]
pub struct PeriodIndexPenalty {
    weight: f64,
}

impl PeriodIndexPenalty {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            weight: config.get_f64("Exams.PeriodIndexWeight", 0.0)?,
        })
    }
}

impl Criterion for PeriodIndexPenalty {
    fn name(&self) -> &'static str {
        "PeriodIndexPenalty"
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
        placement.period().get() as f64
    }

    fn value(&self, model: &ExamModel, assignment: &ExamAssignment) -> f64 {
        assignment
            .assigned_placements()
            .map(|p| self.value_of(model, assignment, p, &[]))
            .sum()
    }

    fn bounds(&self, model: &ExamModel, _assignment: &ExamAssignment) -> (f64, f64) {
        let last = model.nr_periods().saturating_sub(1) as f64;
        (0.0, last * model.nr_exams() as f64)
    }
}

/// Exam size times the one-based period index; pushes big exams early so
/// grading can start.
#[derive(Debug, Clone)]
pub struct PeriodSizePenalty {
    weight: f64,
}

impl PeriodSizePenalty {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            weight: config.get_f64("Exams.PeriodSizeWeight", 1.0)?,
        })
    }
}

impl Criterion for PeriodSizePenalty {
    fn name(&self) -> &'static str {
        "PeriodSizePenalty"
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
        let size = f64::from(model.exam(placement.exam()).size());
        size * (placement.period().get() as f64 + 1.0)
    }

    fn value(&self, model: &ExamModel, assignment: &ExamAssignment) -> f64 {
        assignment
            .assigned_placements()
            .map(|p| self.value_of(model, assignment, p, &[]))
            .sum()
    }
}
