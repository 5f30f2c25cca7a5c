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

use crate::assignment::ExamAssignment;
use crate::model::SolverModel;
use examtt_model::model::ExamPlacement;
use std::time::Instant;

/// A light event view handed to solution listeners; listeners never see the
/// assignment itself and cannot mutate it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolutionInfo {
    pub iteration: u64,
    pub time: f64,
    pub total_value: f64,
    pub nr_assigned: usize,
    pub nr_unassigned: usize,
    pub failed_iterations: u64,
}

/// Observers of the solution lifecycle. All listeners see the same events in
/// the same order.
pub trait SolutionListener: Send {
    fn solution_updated(&mut self, info: &SolutionInfo) {
        let _ = info;
    }

    fn best_saved(&mut self, info: &SolutionInfo) {
        let _ = info;
    }

    fn best_restored(&mut self, info: &SolutionInfo) {
        let _ = info;
    }

    fn best_cleared(&mut self, info: &SolutionInfo) {
        let _ = info;
    }
}

/// The best solution seen so far, cheap enough to clone across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct BestSnapshot {
    pub placements: Vec<Option<ExamPlacement>>,
    pub total_value: f64,
    pub nr_unassigned: usize,
    pub iteration: u64,
    pub time: f64,
}

impl BestSnapshot {
    /// Lexicographic quality: fewer unassigned exams first, lower weighted
    /// total second.
    #[inline]
    pub fn is_better_than(&self, other_unassigned: usize, other_total: f64) -> bool {
        self.nr_unassigned < other_unassigned
            || (self.nr_unassigned == other_unassigned && self.total_value < other_total)
    }
}

/// The current state of one solver run: the assignment, the iteration and
/// wall-clock counters, the best snapshot and the listener multicast.
pub struct Solution {
    assignment: ExamAssignment,
    iteration: u64,
    failed_iterations: u64,
    started: Instant,
    best: Option<BestSnapshot>,
    listeners: Vec<Box<dyn SolutionListener>>,
}

impl Solution {
    pub fn new(assignment: ExamAssignment) -> Self {
        Self {
            assignment,
            iteration: 0,
            failed_iterations: 0,
            started: Instant::now(),
            best: None,
            listeners: Vec::new(),
        }
    }

    #[inline]
    pub fn assignment(&self) -> &ExamAssignment {
        &self.assignment
    }

    #[inline]
    pub fn assignment_mut(&mut self) -> &mut ExamAssignment {
        &mut self.assignment
    }

    #[inline]
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    #[inline]
    pub fn failed_iterations(&self) -> u64 {
        self.failed_iterations
    }

    /// Seconds since the run started.
    #[inline]
    pub fn time(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    pub fn add_listener(&mut self, listener: Box<dyn SolutionListener>) {
        self.listeners.push(listener);
    }

    pub fn info(&self, model: &SolverModel) -> SolutionInfo {
        SolutionInfo {
            iteration: self.iteration,
            time: self.time(),
            total_value: model.total_value(&self.assignment),
            nr_assigned: self.assignment.nr_assigned_variables(),
            nr_unassigned: self.assignment.nr_unassigned_variables(),
            failed_iterations: self.failed_iterations,
        }
    }

    /// One successful iteration: bumps the counter and notifies listeners.
    pub fn update(&mut self, model: &SolverModel) {
        self.iteration += 1;
        let info = self.info(model);
        for listener in &mut self.listeners {
            listener.solution_updated(&info);
        }
    }

    /// An iteration in which no neighbour was selected.
    pub fn record_failed(&mut self) {
        self.iteration += 1;
        self.failed_iterations += 1;
    }

    #[inline]
    pub fn best(&self) -> Option<&BestSnapshot> {
        self.best.as_ref()
    }

    #[inline]
    pub fn best_total_value(&self) -> Option<f64> {
        self.best.as_ref().map(|b| b.total_value)
    }

    #[inline]
    pub fn best_unassigned(&self) -> Option<usize> {
        self.best.as_ref().map(|b| b.nr_unassigned)
    }

    /// Saves a snapshot when the current state strictly beats the recorded
    /// best (fewer unassigned exams first, total value second). With
    /// `save_best_unassigned >= 0` a state leaving more than that many exams
    /// unplaced is never recorded.
    pub fn save_best_if_improved(&mut self, model: &SolverModel, save_best_unassigned: i64) -> bool {
        let nr_unassigned = self.assignment.nr_unassigned_variables();
        if save_best_unassigned >= 0 && nr_unassigned as i64 > save_best_unassigned {
            return false;
        }
        let total_value = model.total_value(&self.assignment);
        let improved = match &self.best {
            None => true,
            Some(best) => {
                nr_unassigned < best.nr_unassigned
                    || (nr_unassigned == best.nr_unassigned && total_value < best.total_value)
            }
        };
        if !improved {
            return false;
        }
        self.best = Some(BestSnapshot {
            placements: self.assignment.snapshot(),
            total_value,
            nr_unassigned,
            iteration: self.iteration,
            time: self.time(),
        });
        let info = self.info(model);
        for listener in &mut self.listeners {
            listener.best_saved(&info);
        }
        true
    }

    /// Rolls the assignment back to the best snapshot, if any.
    pub fn restore_best(&mut self, model: &SolverModel) {
        let Some(best) = self.best.clone() else {
            return;
        };
        self.assignment.restore(model, self.iteration, &best.placements);
        let info = self.info(model);
        for listener in &mut self.listeners {
            listener.best_restored(&info);
        }
    }

    /// Forgets the best snapshot.
    pub fn clear_best(&mut self, model: &SolverModel) {
        self.best = None;
        let info = self.info(model);
        for listener in &mut self.listeners {
            listener.best_cleared(&info);
        }
    }

    /// Installs an externally produced snapshot as the current best (used
    /// when the parallel solver assembles its final solution).
    pub fn install_best(&mut self, model: &SolverModel, best: BestSnapshot) {
        self.best = Some(best);
        let info = self.info(model);
        for listener in &mut self.listeners {
            listener.best_saved(&info);
        }
    }
}

impl std::fmt::Debug for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solution")
            .field("iteration", &self.iteration)
            .field("failed_iterations", &self.failed_iterations)
            .field("nr_assigned", &self.assignment.nr_assigned_variables())
            .field("has_best", &self.best.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolverConfig;
    use examtt_model::common::{ExamId, PeriodId, RoomId};
    use examtt_model::model::{ExamModel, PeriodOption, RoomOption};
    use std::sync::{Arc, Mutex};

    fn model() -> SolverModel {
        let mut b = ExamModel::builder();
        let p0 = b.add_period(0, 480, 120, 0.0);
        let p1 = b.add_period(0, 660, 120, 5.0);
        let r = b.add_room("A", 20, 20, None);
        let e = b.add_exam("X", 10, 120);
        b.exam_mut(e).add_period(PeriodOption::new(p0, 0));
        b.exam_mut(e).add_period(PeriodOption::new(p1, 0));
        b.exam_mut(e).add_room(RoomOption::new(r, 0));
        SolverModel::from_model(b.build().unwrap(), &SolverConfig::new()).unwrap()
    }

    fn plc(period: usize) -> ExamPlacement {
        ExamPlacement::new(ExamId::new(0), PeriodId::new(period), [RoomId::new(0)])
    }

    #[derive(Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<&'static str>>>,
    }

    impl SolutionListener for Recorder {
        fn solution_updated(&mut self, _info: &SolutionInfo) {
            self.events.lock().unwrap().push("updated");
        }
        fn best_saved(&mut self, _info: &SolutionInfo) {
            self.events.lock().unwrap().push("saved");
        }
        fn best_restored(&mut self, _info: &SolutionInfo) {
            self.events.lock().unwrap().push("restored");
        }
        fn best_cleared(&mut self, _info: &SolutionInfo) {
            self.events.lock().unwrap().push("cleared");
        }
    }

    #[test]
    fn test_best_saved_on_strict_improvement_only() {
        let m = model();
        let mut s = Solution::new(ExamAssignment::new(&m));

        // Empty assignment can be recorded with the unconditional gate.
        assert!(s.save_best_if_improved(&m, -1));
        assert!(!s.save_best_if_improved(&m, -1));
        assert_eq!(s.best_unassigned(), Some(1));

        // Assigning beats the empty best (fewer unassigned).
        s.assignment_mut().assign(&m, 1, plc(1));
        assert!(s.save_best_if_improved(&m, -1));
        let expensive = s.best_total_value().unwrap();

        // Cheaper period strictly improves the total.
        s.assignment_mut().assign(&m, 2, plc(0));
        assert!(s.save_best_if_improved(&m, -1));
        assert!(s.best_total_value().unwrap() < expensive);

        // Going back to the expensive period must not be saved.
        s.assignment_mut().assign(&m, 3, plc(1));
        assert!(!s.save_best_if_improved(&m, -1));
    }

    #[test]
    fn test_save_best_unassigned_gate() {
        let m = model();
        let mut s = Solution::new(ExamAssignment::new(&m));
        // One exam unassigned; gate 0 forbids recording.
        assert!(!s.save_best_if_improved(&m, 0));
        s.assignment_mut().assign(&m, 1, plc(0));
        assert!(s.save_best_if_improved(&m, 0));
    }

    #[test]
    fn test_restore_best_rolls_back() {
        let m = model();
        let mut s = Solution::new(ExamAssignment::new(&m));
        s.assignment_mut().assign(&m, 1, plc(0));
        s.save_best_if_improved(&m, -1);
        let best_total = s.best_total_value().unwrap();

        s.assignment_mut().assign(&m, 2, plc(1));
        assert!(m.total_value(s.assignment()) > best_total);

        s.restore_best(&m);
        assert_eq!(m.total_value(s.assignment()), best_total);
        assert_eq!(s.assignment().placement(ExamId::new(0)).unwrap().period(), PeriodId::new(0));
    }

    #[test]
    fn test_listener_event_order() {
        let m = model();
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut s = Solution::new(ExamAssignment::new(&m));
        s.add_listener(Box::new(Recorder {
            events: events.clone(),
        }));

        s.assignment_mut().assign(&m, 1, plc(0));
        s.update(&m);
        s.save_best_if_improved(&m, -1);
        s.restore_best(&m);
        s.clear_best(&m);

        assert_eq!(
            *events.lock().unwrap(),
            vec!["updated", "saved", "restored", "cleared"]
        );
    }

    #[test]
    fn test_failed_iterations_counted() {
        let m = model();
        let mut s = Solution::new(ExamAssignment::new(&m));
        s.record_failed();
        s.record_failed();
        assert_eq!(s.iteration(), 2);
        assert_eq!(s.failed_iterations(), 2);
    }
}
