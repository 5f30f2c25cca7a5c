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

mod distribution;
mod instructor;
mod other;
mod period;
mod room;
mod student;
mod violation;

pub use distribution::DistributionPenalty;
pub use instructor::{
    InstructorBackToBackConflicts, InstructorDirectConflicts,
    InstructorDistanceBackToBackConflicts, InstructorMoreThan2ADayConflicts,
    InstructorNotAvailableConflicts,
};
pub use other::{ExamRotationPenalty, LargeExamsPenalty, PerturbationPenalty, RoomPerturbationPenalty};
pub use period::{PeriodIndexPenalty, PeriodPenalty, PeriodSizePenalty};
pub use room::{RoomPenalty, RoomSizePenalty, RoomSplitDistancePenalty, RoomSplitPenalty};
pub use student::{
    StudentBackToBackConflicts, StudentDirectConflicts, StudentDistanceBackToBackConflicts,
    StudentMoreThan2ADayConflicts, StudentNotAvailableConflicts,
};
pub use violation::{DistributionViolation, PeriodViolation, RoomViolation};

use crate::assignment::ExamAssignment;
use crate::config::SolverConfig;
use crate::err::ConfigError;
use examtt_model::common::ExamId;
use examtt_model::model::{ExamModel, ExamPlacement};

/// A named, weighted partial scorer. Criteria are stateless with respect to
/// the assignment; their running totals live in the assignment store and are
/// driven entirely through [`Criterion::value_of`].
///
/// Contract: `value_of(model, a, p, ignore)` is the contribution of `p`
/// counted against the exams currently placed in `a`, excluding `p`'s own
/// exam and every exam in `ignore`. It must run in time proportional to the
/// local neighbourhood of `p`. Summed over an ordered sequence of
/// assigns/unassigns it reproduces `value(model, a)` exactly, which the
/// consistency check verifies.
pub trait Criterion: Send + Sync {
    fn name(&self) -> &'static str;

    fn weight(&self) -> f64;

    fn value_of(
        &self,
        model: &ExamModel,
        assignment: &ExamAssignment,
        placement: &ExamPlacement,
        ignore: &[ExamId],
    ) -> f64;

    /// Total recomputed from scratch; the reference for the cached total.
    fn value(&self, model: &ExamModel, assignment: &ExamAssignment) -> f64;

    /// (min, max) attainable totals, used for normalization and reporting.
    fn bounds(&self, model: &ExamModel, assignment: &ExamAssignment) -> (f64, f64) {
        let _ = (model, assignment);
        (0.0, f64::INFINITY)
    }
}

/// Placements of the given exams under `assignment`, skipping unassigned
/// ones. Shared by the pairwise student/instructor criteria.
pub(crate) fn assigned_placements_of<'a>(
    assignment: &'a ExamAssignment,
    exams: &[ExamId],
) -> Vec<&'a ExamPlacement> {
    exams
        .iter()
        .filter_map(|&exam| assignment.placement(exam))
        .collect()
}

/// Builds the registered criterion list for a configuration. Order is fixed;
/// the optional criteria join only when their feature is switched on.
pub fn register_all(config: &SolverConfig) -> Result<Vec<Box<dyn Criterion>>, ConfigError> {
    let mut criteria: Vec<Box<dyn Criterion>> = vec![
        Box::new(StudentDirectConflicts::new(config)?),
        Box::new(StudentNotAvailableConflicts::new(config)?),
        Box::new(StudentBackToBackConflicts::new(config)?),
        Box::new(StudentMoreThan2ADayConflicts::new(config)?),
        Box::new(InstructorDirectConflicts::new(config)?),
        Box::new(InstructorNotAvailableConflicts::new(config)?),
        Box::new(InstructorBackToBackConflicts::new(config)?),
        Box::new(InstructorMoreThan2ADayConflicts::new(config)?),
        Box::new(PeriodPenalty::new(config)?),
        Box::new(PeriodIndexPenalty::new(config)?),
        Box::new(PeriodSizePenalty::new(config)?),
        Box::new(RoomPenalty::new(config)?),
        Box::new(RoomSizePenalty::new(config)?),
        Box::new(RoomSplitPenalty::new(config)?),
        Box::new(RoomSplitDistancePenalty::new(config)?),
        Box::new(DistributionPenalty::new(config)?),
        Box::new(ExamRotationPenalty::new(config)?),
    ];

    let back_to_back_distance = config.get_f64("Exams.BackToBackDistance", -1.0)?;
    if back_to_back_distance >= 0.0 {
        criteria.push(Box::new(StudentDistanceBackToBackConflicts::new(config)?));
        criteria.push(Box::new(InstructorDistanceBackToBackConflicts::new(config)?));
    }
    if config.get_i64("Exams.LargeSize", -1)? >= 0 {
        criteria.push(Box::new(LargeExamsPenalty::new(config)?));
    }
    if config.get_bool("General.MPP", false)? {
        criteria.push(Box::new(PerturbationPenalty::new(config)?));
        criteria.push(Box::new(RoomPerturbationPenalty::new(config)?));
    }
    if config.get_bool("General.SoftPeriods", false)? {
        criteria.push(Box::new(PeriodViolation::new(config)?));
    }
    if config.get_bool("General.SoftRooms", false)? {
        criteria.push(Box::new(RoomViolation::new(config)?));
    }
    if config.get_bool("General.SoftDistributions", false)? {
        criteria.push(Box::new(DistributionViolation::new(config)?));
    }
    Ok(criteria)
}
