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

use crate::common::{PeriodId, RoomId};
use fixedbitset::FixedBitSet;

/// A physical examination room. Availability is tracked per period; rooms are
/// available everywhere unless a period was explicitly closed.
#[derive(Debug, Clone)]
pub struct Room {
    id: RoomId,
    name: String,
    size: u32,
    alt_size: u32,
    coordinates: Option<(f64, f64)>,
    unavailable: FixedBitSet,
}

impl Room {
    pub fn new(
        id: RoomId,
        name: impl Into<String>,
        size: u32,
        alt_size: u32,
        coordinates: Option<(f64, f64)>,
        nr_periods: usize,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            size,
            alt_size,
            coordinates,
            unavailable: FixedBitSet::with_capacity(nr_periods),
        }
    }

    #[inline]
    pub fn id(&self) -> RoomId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Seats in the normal layout.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Seats in the alternative (spread) layout.
    #[inline]
    pub fn alt_size(&self) -> u32 {
        self.alt_size
    }

    /// Seating capacity for the layout an exam requires.
    #[inline]
    pub fn capacity(&self, alt_seating: bool) -> u32 {
        if alt_seating { self.alt_size } else { self.size }
    }

    #[inline]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.coordinates
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

    pub fn unavailable_periods(&self) -> impl Iterator<Item = PeriodId> + '_ {
        self.unavailable.ones().map(PeriodId::new)
    }

    /// Euclidean distance between room coordinates, in the instance's length
    /// unit. Rooms without coordinates are treated as co-located.
    pub fn distance_to(&self, other: &Room) -> f64 {
        match (self.coordinates, other.coordinates) {
            (Some((x1, y1)), Some((x2, y2))) => {
                let dx = x1 - x2;
                let dy = y1 - y2;
                (dx * dx + dy * dy).sqrt()
            }
            _ => 0.0,
        }
    }
}

impl std::fmt::Display for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}' ({} seats, {} alt)", self.id, self.name, self.size, self.alt_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[inline]
    fn rid(n: usize) -> RoomId {
        RoomId::new(n)
    }
    #[inline]
    fn pid(n: usize) -> PeriodId {
        PeriodId::new(n)
    }

    #[test]
    fn test_capacity_by_layout() {
        let r = Room::new(rid(1), "A", 100, 60, None, 4);
        assert_eq!(r.capacity(false), 100);
        assert_eq!(r.capacity(true), 60);
    }

    #[test]
    fn test_availability_defaults_open() {
        let mut r = Room::new(rid(1), "A", 100, 60, None, 4);
        assert!(r.is_available(pid(0)));
        assert!(r.is_available(pid(3)));
        r.set_unavailable(pid(2));
        assert!(!r.is_available(pid(2)));
        assert!(r.is_available(pid(1)));
        assert_eq!(r.unavailable_periods().collect::<Vec<_>>(), vec![pid(2)]);
    }

    #[test]
    fn test_distance_euclidean_and_missing_coordinates() {
        let a = Room::new(rid(1), "A", 10, 10, Some((0.0, 0.0)), 1);
        let b = Room::new(rid(2), "B", 10, 10, Some((3.0, 4.0)), 1);
        let c = Room::new(rid(3), "C", 10, 10, None, 1);
        assert_eq!(a.distance_to(&b), 5.0);
        assert_eq!(a.distance_to(&c), 0.0);
    }
}
