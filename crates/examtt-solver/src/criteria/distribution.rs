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

/// Soft distribution constraints: every violated pair is charged the
/// constraint's own weight, scaled by this criterion's weight. Charging per
/// pair keeps the value additive under the incremental contract.
#[derive(Debug, Clone)]
pub struct DistributionPenalty {
    weight: f64,
}

impl DistributionPenalty {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            weight: config.get_f64("Exams.DistributionWeight", 1.0)?,
        })
    }
}

impl Criterion for DistributionPenalty {
    fn name(&self) -> &'static str {
        "DistributionPenalty"
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
        let mut penalty = 0.0;
        for &cid in model.exam(exam).constraints() {
            let constraint = model.constraint(cid);
            if constraint.is_hard() {
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
                let consistent = constraint.is_pair_consistent(
                    placement,
                    q,
                    |p| model.day_of(p.period()),
                    first_before_second,
                );
                if !consistent {
                    penalty += constraint.weight();
                }
            }
        }
        penalty
    }

    fn value(&self, model: &ExamModel, assignment: &ExamAssignment) -> f64 {
        let mut penalty = 0.0;
        for constraint in model.constraints() {
            if constraint.is_hard() {
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
                        penalty += constraint.weight();
                    }
                }
            }
        }
        penalty
    }

    fn bounds(&self, model: &ExamModel, _assignment: &ExamAssignment) -> (f64, f64) {
        let mut max = 0.0;
        for constraint in model.constraints() {
            if constraint.is_hard() {
                continue;
            }
            let n = constraint.exams().len() as f64;
            max += constraint.weight() * n * (n - 1.0) / 2.0;
        }
        (0.0, max)
    }
}
