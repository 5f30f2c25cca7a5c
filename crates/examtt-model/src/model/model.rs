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
use crate::err::{ModelError, PlacementError};
use crate::model::{
    distribution::{DistributionConstraint, DistributionType},
    exam::{Exam, PeriodOption, RoomOption},
    people::{Instructor, Student},
    period::Period,
    placement::ExamPlacement,
    room::Room,
};
use smallvec::SmallVec;
use std::collections::HashMap;

/// The immutable problem model: it owns every entity, resolves all id
/// references, answers distance queries and enumerates exam domains in
/// preference order. It is built once by the loader (or a test) and shared
/// read-only between solver workers afterwards.
#[derive(Debug, Clone)]
pub struct ExamModel {
    name: String,
    periods: Vec<Period>,
    rooms: Vec<Room>,
    exams: Vec<Exam>,
    students: Vec<Student>,
    instructors: Vec<Instructor>,
    constraints: Vec<DistributionConstraint>,
    travel: HashMap<(RoomId, RoomId), f64>,
    exam_labels: Vec<String>,
    period_labels: Vec<String>,
    room_labels: Vec<String>,
}

impl ExamModel {
    pub fn builder() -> ExamModelBuilder {
        ExamModelBuilder::new()
    }

    /// External identifier the exam had in the instance file.
    #[inline]
    pub fn exam_label(&self, id: ExamId) -> &str {
        &self.exam_labels[id.get()]
    }

    #[inline]
    pub fn period_label(&self, id: PeriodId) -> &str {
        &self.period_labels[id.get()]
    }

    #[inline]
    pub fn room_label(&self, id: RoomId) -> &str {
        &self.room_labels[id.get()]
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn exams(&self) -> &[Exam] {
        &self.exams
    }

    #[inline]
    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    #[inline]
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    #[inline]
    pub fn students(&self) -> &[Student] {
        &self.students
    }

    #[inline]
    pub fn instructors(&self) -> &[Instructor] {
        &self.instructors
    }

    #[inline]
    pub fn constraints(&self) -> &[DistributionConstraint] {
        &self.constraints
    }

    #[inline]
    pub fn nr_exams(&self) -> usize {
        self.exams.len()
    }

    #[inline]
    pub fn nr_periods(&self) -> usize {
        self.periods.len()
    }

    #[inline]
    pub fn nr_rooms(&self) -> usize {
        self.rooms.len()
    }

    #[inline]
    pub fn exam(&self, id: ExamId) -> &Exam {
        &self.exams[id.get()]
    }

    #[inline]
    pub fn period(&self, id: PeriodId) -> &Period {
        &self.periods[id.get()]
    }

    #[inline]
    pub fn room(&self, id: RoomId) -> &Room {
        &self.rooms[id.get()]
    }

    #[inline]
    pub fn student(&self, id: StudentId) -> &Student {
        &self.students[id.get()]
    }

    #[inline]
    pub fn instructor(&self, id: InstructorId) -> &Instructor {
        &self.instructors[id.get()]
    }

    #[inline]
    pub fn constraint(&self, id: ConstraintId) -> &DistributionConstraint {
        &self.constraints[id.get()]
    }

    #[inline]
    pub fn day_of(&self, period: PeriodId) -> u32 {
        self.period(period).day()
    }

    /// Index distance between two periods in the global ordering.
    #[inline]
    pub fn period_distance(&self, a: PeriodId, b: PeriodId) -> usize {
        a.get().abs_diff(b.get())
    }

    /// Physical distance between two rooms. An explicit travel entry wins
    /// over the Euclidean distance of the room coordinates.
    pub fn room_distance(&self, a: RoomId, b: RoomId) -> f64 {
        if a == b {
            return 0.0;
        }
        let key = if a < b { (a, b) } else { (b, a) };
        if let Some(d) = self.travel.get(&key) {
            return *d;
        }
        self.room(a).distance_to(self.room(b))
    }

    /// Largest distance between any room of `a` and any room of `b`; the
    /// measure behind the distance back-to-back criteria.
    pub fn placement_distance(&self, a: &ExamPlacement, b: &ExamPlacement) -> f64 {
        let mut max = 0.0_f64;
        for ra in a.rooms() {
            for rb in b.rooms() {
                max = max.max(self.room_distance(*ra, *rb));
            }
        }
        max
    }

    /// Whether two periods are back-to-back: adjacent in the global ordering
    /// and, unless `across_days` is set, on the same day.
    pub fn are_back_to_back(&self, a: PeriodId, b: PeriodId, across_days: bool) -> bool {
        if self.period_distance(a, b) != 1 {
            return false;
        }
        across_days || self.day_of(a) == self.day_of(b)
    }

    /// Hard feasibility of a placement against the static model: allowed
    /// period and rooms, room availability, seating, split maximum. Conflicts
    /// with other assigned exams are the assignment's business.
    pub fn check_placement(&self, placement: &ExamPlacement) -> Result<(), PlacementError> {
        let exam = self.exam(placement.exam());
        let period = placement.period();

        if !exam.is_period_allowed(period) {
            return Err(PlacementError::PeriodNotAllowed {
                exam: exam.id(),
                period,
            });
        }
        if placement.rooms().is_empty() {
            if exam.max_rooms() > 0 {
                return Err(PlacementError::NoRooms { exam: exam.id() });
            }
            return Ok(());
        }
        if placement.nr_rooms() > exam.max_rooms() {
            return Err(PlacementError::TooManyRooms {
                exam: exam.id(),
                rooms: placement.nr_rooms(),
                max_rooms: exam.max_rooms(),
            });
        }
        let mut seats = 0u32;
        let mut last: Option<RoomId> = None;
        for &rid in placement.rooms() {
            if last == Some(rid) {
                return Err(PlacementError::DuplicateRoom { room: rid });
            }
            last = Some(rid);
            if !exam.is_room_allowed(rid) {
                return Err(PlacementError::RoomNotAllowed {
                    exam: exam.id(),
                    room: rid,
                });
            }
            let room = self.room(rid);
            if !room.is_available(period) {
                return Err(PlacementError::RoomNotAvailable { room: rid, period });
            }
            seats += room.capacity(exam.alt_seating());
        }
        if seats < exam.size() {
            return Err(PlacementError::InsufficientSeating {
                exam: exam.id(),
                seats,
                size: exam.size(),
            });
        }
        Ok(())
    }

    #[inline]
    pub fn is_feasible(&self, placement: &ExamPlacement) -> bool {
        self.check_placement(placement).is_ok()
    }

    /// Allowed periods of an exam, cheapest first (option penalty, then the
    /// period's own weight, then index).
    pub fn sorted_period_options(&self, exam: &Exam) -> Vec<PeriodOption> {
        let mut options: Vec<PeriodOption> = exam.periods().to_vec();
        options.sort_by(|a, b| {
            let ka = f64::from(a.penalty()) + self.period(a.period()).weight();
            let kb = f64::from(b.penalty()) + self.period(b.period()).weight();
            ka.partial_cmp(&kb)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.period().cmp(&b.period()))
        });
        options
    }

    /// Allowed rooms of an exam that are open in `period` and can seat at
    /// least one student in the exam's layout.
    pub fn available_room_options(&self, exam: &Exam, period: PeriodId) -> Vec<RoomOption> {
        exam.rooms()
            .iter()
            .filter(|o| {
                let room = self.room(o.room());
                room.is_available(period) && room.capacity(exam.alt_seating()) > 0
            })
            .copied()
            .collect()
    }

    /// Cheapest room set seating the exam in `period`, restricted to rooms
    /// for which `is_free` holds. Prefers a single sufficient room (smallest
    /// adequate, penalties first); otherwise packs largest-fit-first up to
    /// the exam's split maximum.
    pub fn best_rooms_where(
        &self,
        exam: &Exam,
        period: PeriodId,
        is_free: &dyn Fn(RoomId) -> bool,
    ) -> Option<SmallVec<[RoomId; 4]>> {
        if exam.max_rooms() == 0 {
            return Some(SmallVec::new());
        }
        let mut options: Vec<RoomOption> = self
            .available_room_options(exam, period)
            .into_iter()
            .filter(|o| is_free(o.room()))
            .collect();
        if options.is_empty() {
            return None;
        }

        // Single sufficient room: best penalty, then tightest fit.
        let single = options
            .iter()
            .filter(|o| self.room(o.room()).capacity(exam.alt_seating()) >= exam.size())
            .min_by_key(|o| (o.penalty(), self.room(o.room()).capacity(exam.alt_seating())));
        if let Some(best) = single {
            let mut rooms = SmallVec::new();
            rooms.push(best.room());
            return Some(rooms);
        }

        // Split: cheapest penalties first, larger rooms breaking ties.
        options.sort_by_key(|o| {
            (
                o.penalty(),
                std::cmp::Reverse(self.room(o.room()).capacity(exam.alt_seating())),
            )
        });
        let mut rooms: SmallVec<[RoomId; 4]> = SmallVec::new();
        let mut seats = 0u32;
        for option in &options {
            if rooms.len() >= exam.max_rooms() {
                break;
            }
            rooms.push(option.room());
            seats += self.room(option.room()).capacity(exam.alt_seating());
            if seats >= exam.size() {
                rooms.sort_unstable();
                return Some(rooms);
            }
        }
        None
    }

    #[inline]
    pub fn best_rooms(&self, exam: &Exam, period: PeriodId) -> Option<SmallVec<[RoomId; 4]>> {
        self.best_rooms_where(exam, period, &|_| true)
    }

    /// Static heuristic score of a placement; higher is better. The score
    /// combines period preference, room preference and seating fit, and only
    /// depends on the model, never on an assignment.
    pub fn placement_score(&self, placement: &ExamPlacement) -> f64 {
        let exam = self.exam(placement.exam());
        let period_cost = exam
            .period_option(placement.period())
            .map(|o| f64::from(o.penalty()))
            .unwrap_or(f64::MAX)
            + self.period(placement.period()).weight();
        let room_cost: f64 = placement
            .rooms()
            .iter()
            .map(|r| exam.room_option(*r).map(|o| f64::from(o.penalty())).unwrap_or(f64::MAX))
            .sum();
        let seats: u32 = placement
            .rooms()
            .iter()
            .map(|r| self.room(*r).capacity(exam.alt_seating()))
            .sum();
        let fit = if exam.size() == 0 {
            1.0
        } else {
            f64::from(exam.size()) / f64::from(seats.max(1))
        };
        fit / (1.0 + period_cost.max(0.0)) / (1.0 + room_cost.max(0.0))
    }

    /// The exam's domain in decreasing static score: for every allowed
    /// period the cheapest feasible room set, best placements first.
    pub fn ordered_placements(&self, exam: &Exam) -> Vec<ExamPlacement> {
        let mut placements: Vec<ExamPlacement> = self
            .sorted_period_options(exam)
            .iter()
            .filter_map(|option| {
                self.best_rooms(exam, option.period())
                    .map(|rooms| ExamPlacement::new(exam.id(), option.period(), rooms))
            })
            .collect();
        placements.sort_by(|a, b| {
            self.placement_score(b)
                .partial_cmp(&self.placement_score(a))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        placements
    }

    /// Exams sharing a student, an instructor or a hard separating
    /// distribution constraint with `exam`; the edge set of the conflict
    /// graph used by the coloring construction.
    pub fn conflicting_exams(&self, exam: ExamId) -> Vec<ExamId> {
        let mut out: Vec<ExamId> = Vec::new();
        let e = self.exam(exam);
        for &sid in e.students() {
            for &other in self.student(sid).exams() {
                if other != exam && !out.contains(&other) {
                    out.push(other);
                }
            }
        }
        for &iid in e.instructors() {
            for &other in self.instructor(iid).exams() {
                if other != exam && !out.contains(&other) {
                    out.push(other);
                }
            }
        }
        for &cid in e.constraints() {
            let constraint = self.constraint(cid);
            if !constraint.is_hard() {
                continue;
            }
            match constraint.dtype() {
                DistributionType::DifferentPeriod | DistributionType::Precedence => {
                    for &other in constraint.exams() {
                        if other != exam && !out.contains(&other) {
                            out.push(other);
                        }
                    }
                }
                _ => {}
            }
        }
        out
    }
}

/// Assembles an [`ExamModel`]; entity ids are handed out densely in insertion
/// order. Used by the XML loader and by tests.
#[derive(Debug, Default)]
pub struct ExamModelBuilder {
    name: String,
    periods: Vec<Period>,
    rooms: Vec<Room>,
    exams: Vec<Exam>,
    students: Vec<Student>,
    instructors: Vec<Instructor>,
    constraints: Vec<DistributionConstraint>,
    travel: HashMap<(RoomId, RoomId), f64>,
    exam_labels: Vec<String>,
    period_labels: Vec<String>,
    room_labels: Vec<String>,
}

impl ExamModelBuilder {
    pub fn new() -> Self {
        Self {
            name: "exam".into(),
            ..Default::default()
        }
    }

    pub fn set_exam_label(&mut self, id: ExamId, label: impl Into<String>) {
        self.exam_labels[id.get()] = label.into();
    }

    pub fn set_period_label(&mut self, id: PeriodId, label: impl Into<String>) {
        self.period_labels[id.get()] = label.into();
    }

    pub fn set_room_label(&mut self, id: RoomId, label: impl Into<String>) {
        self.room_labels[id.get()] = label.into();
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn add_period(&mut self, day: u32, time: u32, duration: u32, weight: f64) -> PeriodId {
        let id = PeriodId::new(self.periods.len());
        self.periods.push(Period::new(id, day, time, duration, weight));
        self.period_labels.push(id.get().to_string());
        id
    }

    pub fn add_room(
        &mut self,
        name: impl Into<String>,
        size: u32,
        alt_size: u32,
        coordinates: Option<(f64, f64)>,
    ) -> RoomId {
        let id = RoomId::new(self.rooms.len());
        self.rooms
            .push(Room::new(id, name, size, alt_size, coordinates, self.periods.len()));
        self.room_labels.push(id.get().to_string());
        id
    }

    pub fn set_room_unavailable(&mut self, room: RoomId, period: PeriodId) {
        self.rooms[room.get()].set_unavailable(period);
    }

    pub fn set_room_distance(&mut self, a: RoomId, b: RoomId, distance: f64) {
        let key = if a < b { (a, b) } else { (b, a) };
        self.travel.insert(key, distance);
    }

    pub fn add_exam(&mut self, name: impl Into<String>, size: u32, duration: u32) -> ExamId {
        let id = ExamId::new(self.exams.len());
        self.exams.push(Exam::new(id, name, size, duration));
        self.exam_labels.push(id.get().to_string());
        id
    }

    pub fn exam_mut(&mut self, id: ExamId) -> &mut Exam {
        &mut self.exams[id.get()]
    }

    pub fn add_student(&mut self) -> StudentId {
        let id = StudentId::new(self.students.len());
        self.students.push(Student::new(id, self.periods.len()));
        id
    }

    pub fn enroll(&mut self, student: StudentId, exam: ExamId) {
        self.students[student.get()].add_exam(exam);
        self.exams[exam.get()].add_student(student);
    }

    pub fn set_student_unavailable(&mut self, student: StudentId, period: PeriodId) {
        self.students[student.get()].set_unavailable(period);
    }

    pub fn add_instructor(&mut self) -> InstructorId {
        let id = InstructorId::new(self.instructors.len());
        self.instructors.push(Instructor::new(id, self.periods.len()));
        id
    }

    pub fn assign_instructor(&mut self, instructor: InstructorId, exam: ExamId) {
        self.instructors[instructor.get()].add_exam(exam);
        self.exams[exam.get()].add_instructor(instructor);
    }

    pub fn set_instructor_unavailable(&mut self, instructor: InstructorId, period: PeriodId) {
        self.instructors[instructor.get()].set_unavailable(period);
    }

    pub fn add_constraint(
        &mut self,
        dtype: DistributionType,
        hard: bool,
        weight: f64,
        exams: Vec<ExamId>,
    ) -> Result<ConstraintId, ModelError> {
        if exams.len() < 2 {
            return Err(ModelError::ConstraintTooSmall(format!(
                "constraint #{}",
                self.constraints.len()
            )));
        }
        let id = ConstraintId::new(self.constraints.len());
        for &exam in &exams {
            self.exams[exam.get()].add_constraint(id);
        }
        self.constraints
            .push(DistributionConstraint::new(id, dtype, hard, weight, exams));
        Ok(id)
    }

    pub fn build(self) -> Result<ExamModel, ModelError> {
        if self.periods.is_empty() {
            return Err(ModelError::NoPeriods);
        }
        if self.rooms.is_empty() {
            return Err(ModelError::NoRooms);
        }
        for exam in &self.exams {
            if exam.periods().is_empty() {
                return Err(ModelError::EmptyDomain(exam.id()));
            }
            if exam.rooms().is_empty() && exam.max_rooms() > 0 {
                return Err(ModelError::EmptyDomain(exam.id()));
            }
        }
        Ok(ExamModel {
            name: self.name,
            periods: self.periods,
            rooms: self.rooms,
            exams: self.exams,
            students: self.students,
            instructors: self.instructors,
            constraints: self.constraints,
            travel: self.travel,
            exam_labels: self.exam_labels,
            period_labels: self.period_labels,
            room_labels: self.room_labels,
        })
    }
}
