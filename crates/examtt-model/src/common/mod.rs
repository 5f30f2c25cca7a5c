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

pub trait IdentifierMarkerName: Copy {
    const NAME: &'static str;
}

/// A dense index into one of the model's entity tables, tagged with a marker
/// type so that exam, period, room, student and instructor indices cannot be
/// mixed up.
#[repr(transparent)]
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier<I, U>(I, core::marker::PhantomData<U>);

impl<I, U> Identifier<I, U> {
    #[inline]
    pub fn new(id: I) -> Self {
        Self(id, core::marker::PhantomData)
    }

    #[inline]
    pub fn value(&self) -> &I {
        &self.0
    }

    #[inline]
    pub fn into_inner(self) -> I {
        self.0
    }
}

impl<U> Identifier<usize, U> {
    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl<I, U> std::fmt::Display for Identifier<I, U>
where
    I: std::fmt::Display,
    U: IdentifierMarkerName,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", U::NAME, self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExamIdMarker;

impl IdentifierMarkerName for ExamIdMarker {
    const NAME: &'static str = "ExamId";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeriodIdMarker;

impl IdentifierMarkerName for PeriodIdMarker {
    const NAME: &'static str = "PeriodId";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomIdMarker;

impl IdentifierMarkerName for RoomIdMarker {
    const NAME: &'static str = "RoomId";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StudentIdMarker;

impl IdentifierMarkerName for StudentIdMarker {
    const NAME: &'static str = "StudentId";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstructorIdMarker;

impl IdentifierMarkerName for InstructorIdMarker {
    const NAME: &'static str = "InstructorId";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintIdMarker;

impl IdentifierMarkerName for ConstraintIdMarker {
    const NAME: &'static str = "ConstraintId";
}

pub type ExamId = Identifier<usize, ExamIdMarker>;
pub type PeriodId = Identifier<usize, PeriodIdMarker>;
pub type RoomId = Identifier<usize, RoomIdMarker>;
pub type StudentId = Identifier<usize, StudentIdMarker>;
pub type InstructorId = Identifier<usize, InstructorIdMarker>;
pub type ConstraintId = Identifier<usize, ConstraintIdMarker>;
