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

use crate::common::{ExamId, InstructorId, PeriodId, StudentId};
use fixedbitset::FixedBitSet;

/// A student enrolled in one or more exams. Exams are referenced by id; the
/// exam side holds the mirror list, and cross-lookup goes through the model.
#[derive(Debug, Clone)]
pub struct Student {
    id: StudentId,
    exams: Vec<ExamId>,
    unavailable: FixedBitSet,
}

impl Student {
    pub fn new(id: StudentId, nr_periods: usize) -> Self {
        Self {
            id,
            exams: Vec::new(),
            unavailable: FixedBitSet::with_capacity(nr_periods),
        }
    }

    #[inline]
    pub fn id(&self) -> StudentId {
        self.id
    }

    #[inline]
    pub fn exams(&self) -> &[ExamId] {
        &self.exams
    }

    pub fn add_exam(&mut self, exam: ExamId) {
        if !self.exams.contains(&exam) {
            self.exams.push(exam);
        }
    }

    pub fn set_unavailable(&mut self, period: PeriodId) {
        if period.get() >= self.unavailable.len() {
            self.unavailable.grow(period.get() + 1);
        }
        self.unavailable.insert(period.get());
    }

    #[inline]
    pub fn is_available(&self, period: PeriodId) -> bool {
        !self.unavailable.contains(period.get())
    }
}

/// An instructor overseeing one or more exams; mirrors [`Student`].
#[derive(Debug, Clone)]
pub struct Instructor {
    id: InstructorId,
    exams: Vec<ExamId>,
    unavailable: FixedBitSet,
}

impl Instructor {
    pub fn new(id: InstructorId, nr_periods: usize) -> Self {
        Self {
            id,
            exams: Vec::new(),
            unavailable: FixedBitSet::with_capacity(nr_periods),
        }
    }

    #[inline]
    pub fn id(&self) -> InstructorId {
        self.id
    }

    #[inline]
    pub fn exams(&self) -> &[ExamId] {
        &self.exams
    }

    pub fn add_exam(&mut self, exam: ExamId) {
        if !self.exams.contains(&exam) {
            self.exams.push(exam);
        }
    }

    pub fn set_unavailable(&mut self, period: PeriodId) {
        if period.get() >= self.unavailable.len() {
            self.unavailable.grow(period.get() + 1);
        }
        self.unavailable.insert(period.get());
    }

    #[inline]
    pub fn is_available(&self, period: PeriodId) -> bool {
        !self.unavailable.contains(period.get())
    }
}
