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

use crate::config::SolverConfig;
use crate::err::ConfigError;
use crate::solution::Solution;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A cooperative stop flag shared between the outside world and the solver
/// workers; requesting a stop lets the running iteration finish.
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Decides whether the search may keep going.
pub trait TerminationCondition: Send + Sync {
    fn can_continue(&self, solution: &Solution) -> bool;
}

/// The standard condition: iteration budget, wall-clock budget, optional
/// stop-on-complete, and an external stop flag. With no budget configured at
/// all, the solver stops on the first complete solution.
#[derive(Debug, Clone)]
pub struct GeneralTerminationCondition {
    max_iters: i64,
    timeout: f64,
    stop_when_complete: bool,
    stop: StopToken,
}

impl GeneralTerminationCondition {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            max_iters: config.get_i64("Termination.MaxIters", -1)?,
            timeout: config.get_f64("Termination.TimeOut", -1.0)?,
            stop_when_complete: config.get_bool("Termination.StopWhenComplete", false)?,
            stop: StopToken::new(),
        })
    }

    /// The shared stop flag; clone it to request interruption from outside.
    #[inline]
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// Reuses an existing stop flag so several workers stop together.
    pub fn with_stop_token(mut self, stop: StopToken) -> Self {
        self.stop = stop;
        self
    }
}

impl TerminationCondition for GeneralTerminationCondition {
    fn can_continue(&self, solution: &Solution) -> bool {
        if self.stop.is_set() {
            tracing::info!("stop requested, finishing current iteration");
            return false;
        }
        if self.max_iters >= 0 && solution.iteration() >= self.max_iters as u64 {
            tracing::info!("maximum number of iterations reached");
            return false;
        }
        if self.timeout >= 0.0 && solution.time() > self.timeout {
            tracing::info!("timeout reached");
            return false;
        }
        if self.stop_when_complete || (self.max_iters < 0 && self.timeout < 0.0) {
            let complete = solution.assignment().nr_unassigned_variables() == 0;
            if complete {
                tracing::info!("complete solution found");
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::ExamAssignment;
    use crate::model::SolverModel;
    use examtt_model::common::{ExamId, PeriodId, RoomId};
    use examtt_model::model::{ExamModel, ExamPlacement, PeriodOption, RoomOption};

    fn model() -> SolverModel {
        let mut b = ExamModel::builder();
        let p = b.add_period(0, 480, 120, 0.0);
        let r = b.add_room("A", 20, 20, None);
        let e = b.add_exam("X", 10, 120);
        b.exam_mut(e).add_period(PeriodOption::new(p, 0));
        b.exam_mut(e).add_room(RoomOption::new(r, 0));
        SolverModel::from_model(b.build().unwrap(), &SolverConfig::new()).unwrap()
    }

    fn condition(pairs: &[(&str, &str)]) -> GeneralTerminationCondition {
        let mut config = SolverConfig::new();
        for (k, v) in pairs {
            config.set(*k, *v);
        }
        GeneralTerminationCondition::new(&config).unwrap()
    }

    #[test]
    fn test_max_iters() {
        let m = model();
        let mut s = Solution::new(ExamAssignment::new(&m));
        let term = condition(&[("Termination.MaxIters", "2")]);
        assert!(term.can_continue(&s));
        s.record_failed();
        s.record_failed();
        assert!(!term.can_continue(&s));
    }

    #[test]
    fn test_stop_token_interrupts() {
        let m = model();
        let s = Solution::new(ExamAssignment::new(&m));
        let term = condition(&[("Termination.MaxIters", "1000")]);
        assert!(term.can_continue(&s));
        term.stop_token().request_stop();
        assert!(!term.can_continue(&s));
    }

    #[test]
    fn test_default_stops_on_complete_solution() {
        let m = model();
        let mut s = Solution::new(ExamAssignment::new(&m));
        let term = condition(&[]);
        assert!(term.can_continue(&s));
        s.assignment_mut().assign(
            &m,
            0,
            ExamPlacement::new(ExamId::new(0), PeriodId::new(0), [RoomId::new(0)]),
        );
        assert!(!term.can_continue(&s));
    }

    #[test]
    fn test_incomplete_solution_keeps_running_with_budget() {
        let m = model();
        let s = Solution::new(ExamAssignment::new(&m));
        let term = condition(&[("Termination.TimeOut", "3600")]);
        assert!(term.can_continue(&s));
    }

    #[test]
    fn test_stop_when_complete_with_budget() {
        let m = model();
        let mut s = Solution::new(ExamAssignment::new(&m));
        let term = condition(&[
            ("Termination.TimeOut", "3600"),
            ("Termination.StopWhenComplete", "true"),
        ]);
        assert!(term.can_continue(&s));
        s.assignment_mut().assign(
            &m,
            0,
            ExamPlacement::new(ExamId::new(0), PeriodId::new(0), [RoomId::new(0)]),
        );
        assert!(!term.can_continue(&s));
    }
}
