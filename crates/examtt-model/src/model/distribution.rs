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

use crate::common::{ConstraintId, ExamId};
use crate::model::placement::ExamPlacement;

/// The relation a distribution constraint imposes on its exams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistributionType {
    SamePeriod,
    DifferentPeriod,
    /// Exams must be placed in increasing period order of their listing.
    Precedence,
    SameRoom,
    DifferentRoom,
    SameDay,
}

impl DistributionType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "same-period" => Some(Self::SamePeriod),
            "different-period" => Some(Self::DifferentPeriod),
            "precedence" => Some(Self::Precedence),
            "same-room" => Some(Self::SameRoom),
            "different-room" => Some(Self::DifferentRoom),
            "same-day" => Some(Self::SameDay),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SamePeriod => "same-period",
            Self::DifferentPeriod => "different-period",
            Self::Precedence => "precedence",
            Self::SameRoom => "same-room",
            Self::DifferentRoom => "different-room",
            Self::SameDay => "same-day",
        }
    }
}

impl std::fmt::Display for DistributionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed relation over two or more exams, either hard (conflicting exams
/// must be evicted) or soft (violations are charged by the distribution
/// criterion with this constraint's weight).
#[derive(Debug, Clone)]
pub struct DistributionConstraint {
    id: ConstraintId,
    dtype: DistributionType,
    hard: bool,
    weight: f64,
    exams: Vec<ExamId>,
}

impl DistributionConstraint {
    pub fn new(
        id: ConstraintId,
        dtype: DistributionType,
        hard: bool,
        weight: f64,
        exams: Vec<ExamId>,
    ) -> Self {
        Self {
            id,
            dtype,
            hard,
            weight,
            exams,
        }
    }

    #[inline]
    pub fn id(&self) -> ConstraintId {
        self.id
    }

    #[inline]
    pub fn dtype(&self) -> DistributionType {
        self.dtype
    }

    #[inline]
    pub fn is_hard(&self) -> bool {
        self.hard
    }

    #[inline]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Exams in listing order; the order matters for [`DistributionType::Precedence`].
    #[inline]
    pub fn exams(&self) -> &[ExamId] {
        &self.exams
    }

    /// Whether `first` and `second` are compatible under this constraint.
    /// `first_before_second` tells which of the two comes earlier in the
    /// constraint's listing (needed for precedence).
    pub fn is_pair_consistent(
        &self,
        first: &ExamPlacement,
        second: &ExamPlacement,
        day_of: impl Fn(&ExamPlacement) -> u32,
        first_before_second: bool,
    ) -> bool {
        match self.dtype {
            DistributionType::SamePeriod => first.period() == second.period(),
            DistributionType::DifferentPeriod => first.period() != second.period(),
            DistributionType::Precedence => {
                if first_before_second {
                    first.period() < second.period()
                } else {
                    second.period() < first.period()
                }
            }
            DistributionType::SameRoom => first.rooms() == second.rooms(),
            DistributionType::DifferentRoom => {
                !first.rooms().iter().any(|r| second.rooms().contains(r))
            }
            DistributionType::SameDay => day_of(first) == day_of(second),
        }
    }
}

impl std::fmt::Display for DistributionConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} ({}, {} exams)",
            self.id,
            self.dtype,
            if self.hard { "hard" } else { "soft" },
            self.exams.len()
        )
    }
}
