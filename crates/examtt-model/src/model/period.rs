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

use crate::common::PeriodId;

/// One discrete examination slot. Periods are globally ordered by their id,
/// which doubles as the index used for period-to-period distance.
#[derive(Debug, Clone, PartialEq)]
pub struct Period {
    id: PeriodId,
    day: u32,
    time: u32,
    duration: u32,
    weight: f64,
}

impl Period {
    #[inline]
    pub fn new(id: PeriodId, day: u32, time: u32, duration: u32, weight: f64) -> Self {
        Self {
            id,
            day,
            time,
            duration,
            weight,
        }
    }

    #[inline]
    pub fn id(&self) -> PeriodId {
        self.id
    }

    /// Position in the global period ordering.
    #[inline]
    pub fn index(&self) -> usize {
        self.id.get()
    }

    /// Day code; periods with equal day codes take place on the same day.
    #[inline]
    pub fn day(&self) -> u32 {
        self.day
    }

    /// Start of the period, minutes from midnight.
    #[inline]
    pub fn time(&self) -> u32 {
        self.time
    }

    /// Length of the period in minutes.
    #[inline]
    pub fn duration(&self) -> u32 {
        self.duration
    }

    /// Global soft preference attached to scheduling anything in this period.
    #[inline]
    pub fn weight(&self) -> f64 {
        self.weight
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (day {}, {}+{}min)", self.id, self.day, self.time, self.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_accessors() {
        let p = Period::new(PeriodId::new(2), 1, 480, 120, 3.0);
        assert_eq!(p.id(), PeriodId::new(2));
        assert_eq!(p.index(), 2);
        assert_eq!(p.day(), 1);
        assert_eq!(p.time(), 480);
        assert_eq!(p.duration(), 120);
        assert_eq!(p.weight(), 3.0);
        assert_eq!(p.to_string(), "PeriodId(2) (day 1, 480+120min)");
    }
}
