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

use crate::common::{ConstraintId, ExamId, InstructorId, PeriodId, RoomId, StudentId};
use crate::model::placement::ExamPlacement;

/// An allowed period of an exam together with its soft preference penalty.
/// A period that is not listed is forbidden (the hard discipline); the
/// penalty expresses the soft one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodOption {
    period: PeriodId,
    penalty: i32,
}

impl PeriodOption {
    #[inline]
    pub fn new(period: PeriodId, penalty: i32) -> Self {
        Self { period, penalty }
    }

    #[inline]
    pub fn period(&self) -> PeriodId {
        self.period
    }

    #[inline]
    pub fn penalty(&self) -> i32 {
        self.penalty
    }
}

/// An allowed room of an exam together with its soft preference penalty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomOption {
    room: RoomId,
    penalty: i32,
}

impl RoomOption {
    #[inline]
    pub fn new(room: RoomId, penalty: i32) -> Self {
        Self { room, penalty }
    }

    #[inline]
    pub fn room(&self) -> RoomId {
        self.room
    }

    #[inline]
    pub fn penalty(&self) -> i32 {
        self.penalty
    }
}

/// The scheduling variable: one examination that needs a period and a set of
/// rooms. Students, instructors and distribution constraints are referenced
/// by id; the model's tables resolve them.
#[derive(Debug, Clone)]
pub struct Exam {
    id: ExamId,
    name: String,
    size: u32,
    duration: u32,
    alt_seating: bool,
    max_rooms: usize,
    average_period: Option<u32>,
    periods: Vec<PeriodOption>,
    rooms: Vec<RoomOption>,
    students: Vec<StudentId>,
    instructors: Vec<InstructorId>,
    constraints: Vec<ConstraintId>,
    initial: Option<ExamPlacement>,
}

impl Exam {
    pub fn new(id: ExamId, name: impl Into<String>, size: u32, duration: u32) -> Self {
        Self {
            id,
            name: name.into(),
            size,
            duration,
            alt_seating: false,
            max_rooms: 4,
            average_period: None,
            periods: Vec::new(),
            rooms: Vec::new(),
            students: Vec::new(),
            instructors: Vec::new(),
            constraints: Vec::new(),
            initial: None,
        }
    }

    #[inline]
    pub fn id(&self) -> ExamId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of students that have to be seated.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn set_size(&mut self, size: u32) {
        self.size = size;
    }

    #[inline]
    pub fn duration(&self) -> u32 {
        self.duration
    }

    /// Whether the exam requires the alternative (spread) room layout.
    #[inline]
    pub fn alt_seating(&self) -> bool {
        self.alt_seating
    }

    pub fn set_alt_seating(&mut self, alt: bool) {
        self.alt_seating = alt;
    }

    /// Upper bound on the number of rooms a placement may be split across.
    #[inline]
    pub fn max_rooms(&self) -> usize {
        self.max_rooms
    }

    pub fn set_max_rooms(&mut self, max_rooms: usize) {
        self.max_rooms = max_rooms;
    }

    /// Rotation target: the average period this exam was held in during past
    /// terms, if known.
    #[inline]
    pub fn average_period(&self) -> Option<u32> {
        self.average_period
    }

    pub fn set_average_period(&mut self, period: Option<u32>) {
        self.average_period = period;
    }

    /// Initial placement from a previous run, used by the perturbation
    /// criteria when solving a minimal-perturbation problem.
    #[inline]
    pub fn initial(&self) -> Option<&ExamPlacement> {
        self.initial.as_ref()
    }

    pub fn set_initial(&mut self, placement: Option<ExamPlacement>) {
        self.initial = placement;
    }

    /// Allowed periods, unordered.
    #[inline]
    pub fn periods(&self) -> &[PeriodOption] {
        &self.periods
    }

    /// Allowed rooms, unordered.
    #[inline]
    pub fn rooms(&self) -> &[RoomOption] {
        &self.rooms
    }

    pub fn add_period(&mut self, option: PeriodOption) {
        self.periods.push(option);
    }

    pub fn add_room(&mut self, option: RoomOption) {
        self.rooms.push(option);
    }

    pub fn period_option(&self, period: PeriodId) -> Option<&PeriodOption> {
        self.periods.iter().find(|o| o.period() == period)
    }

    pub fn room_option(&self, room: RoomId) -> Option<&RoomOption> {
        self.rooms.iter().find(|o| o.room() == room)
    }

    #[inline]
    pub fn is_period_allowed(&self, period: PeriodId) -> bool {
        self.period_option(period).is_some()
    }

    #[inline]
    pub fn is_room_allowed(&self, room: RoomId) -> bool {
        self.room_option(room).is_some()
    }

    #[inline]
    pub fn students(&self) -> &[StudentId] {
        &self.students
    }

    #[inline]
    pub fn instructors(&self) -> &[InstructorId] {
        &self.instructors
    }

    #[inline]
    pub fn constraints(&self) -> &[ConstraintId] {
        &self.constraints
    }

    pub fn add_student(&mut self, student: StudentId) {
        if !self.students.contains(&student) {
            self.students.push(student);
        }
    }

    pub fn add_instructor(&mut self, instructor: InstructorId) {
        if !self.instructors.contains(&instructor) {
            self.instructors.push(instructor);
        }
    }

    pub fn add_constraint(&mut self, constraint: ConstraintId) {
        if !self.constraints.contains(&constraint) {
            self.constraints.push(constraint);
        }
    }

    /// Whether the exam counts as large under the given size threshold.
    /// A negative threshold disables the notion entirely.
    #[inline]
    pub fn is_large(&self, threshold: i64) -> bool {
        threshold >= 0 && i64::from(self.size) >= threshold
    }
}

impl std::fmt::Display for Exam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}' ({} students)", self.id, self.name, self.size)
    }
}
