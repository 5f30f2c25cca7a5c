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

use crate::common::{ExamId, PeriodId, RoomId};
use smallvec::SmallVec;

/// The value side of the variable/value model: one exam placed into a period
/// and a set of rooms. Rooms are kept sorted, which is the canonical form
/// used for equality, hashing and the saved solution file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExamPlacement {
    exam: ExamId,
    period: PeriodId,
    rooms: SmallVec<[RoomId; 4]>,
}

impl ExamPlacement {
    pub fn new(exam: ExamId, period: PeriodId, rooms: impl IntoIterator<Item = RoomId>) -> Self {
        let mut rooms: SmallVec<[RoomId; 4]> = rooms.into_iter().collect();
        rooms.sort_unstable();
        Self {
            exam,
            period,
            rooms,
        }
    }

    #[inline]
    pub fn exam(&self) -> ExamId {
        self.exam
    }

    #[inline]
    pub fn period(&self) -> PeriodId {
        self.period
    }

    /// Selected rooms in ascending id order.
    #[inline]
    pub fn rooms(&self) -> &[RoomId] {
        &self.rooms
    }

    #[inline]
    pub fn nr_rooms(&self) -> usize {
        self.rooms.len()
    }

    #[inline]
    pub fn uses_room(&self, room: RoomId) -> bool {
        self.rooms.binary_search(&room).is_ok()
    }

    /// Whether this placement occupies more than one room.
    #[inline]
    pub fn is_split(&self) -> bool {
        self.rooms.len() > 1
    }
}

impl std::fmt::Display for ExamPlacement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} @ {} [", self.exam, self.period)?;
        for (i, r) in self.rooms.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{r}")?;
        }
        write!(f, "]")
    }
}

/// Read access to the current placements, implemented by the assignment
/// stores. The solution writer and the reports only ever need this view.
pub trait PlacementView {
    fn placement(&self, exam: ExamId) -> Option<&ExamPlacement>;

    fn nr_assigned_variables(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[inline]
    fn eid(n: usize) -> ExamId {
        ExamId::new(n)
    }
    #[inline]
    fn pid(n: usize) -> PeriodId {
        PeriodId::new(n)
    }
    #[inline]
    fn rid(n: usize) -> RoomId {
        RoomId::new(n)
    }

    #[test]
    fn test_rooms_are_canonically_sorted() {
        let p = ExamPlacement::new(eid(0), pid(1), [rid(5), rid(2), rid(9)]);
        assert_eq!(p.rooms(), &[rid(2), rid(5), rid(9)]);
        let q = ExamPlacement::new(eid(0), pid(1), [rid(9), rid(5), rid(2)]);
        assert_eq!(p, q);
    }

    #[test]
    fn test_uses_room_and_split() {
        let single = ExamPlacement::new(eid(0), pid(0), [rid(3)]);
        assert!(single.uses_room(rid(3)));
        assert!(!single.uses_room(rid(4)));
        assert!(!single.is_split());

        let split = ExamPlacement::new(eid(0), pid(0), [rid(3), rid(4)]);
        assert!(split.is_split());
        assert_eq!(split.nr_rooms(), 2);
    }

    #[test]
    fn test_display() {
        let p = ExamPlacement::new(eid(1), pid(2), [rid(4), rid(3)]);
        assert_eq!(p.to_string(), "ExamId(1) @ PeriodId(2) [RoomId(3) RoomId(4)]");
    }
}
