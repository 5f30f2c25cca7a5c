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

mod context;

pub use context::{AssignmentId, ComponentId, ContextArena};

use crate::err::ConsistencyError;
use crate::model::SolverModel;
use examtt_model::common::{ExamId, PeriodId, RoomId};
use examtt_model::model::{ExamPlacement, PlacementView};
use smallvec::SmallVec;

const CONSISTENCY_TOLERANCE: f64 = 1e-6;

/// The authoritative mapping exam -> placement. Everything else (the
/// per-(period, room) occupancy table and the running criterion totals) is a
/// cache maintained incrementally on every assign/unassign.
///
/// One worker owns one `ExamAssignment`; the parallel solver reconciles
/// private stores through best-snapshot promotion, never by sharing one.
#[derive(Debug)]
pub struct ExamAssignment {
    id: AssignmentId,
    placements: Vec<Option<ExamPlacement>>,
    occupancy: Vec<SmallVec<[ExamId; 2]>>,
    nr_rooms: usize,
    nr_assigned: usize,
    criterion_values: Vec<f64>,
    contexts: ContextArena,
}

impl ExamAssignment {
    pub fn new(model: &SolverModel) -> Self {
        let nr_exams = model.problem().nr_exams();
        let nr_periods = model.problem().nr_periods();
        let nr_rooms = model.problem().nr_rooms();
        Self {
            id: AssignmentId::next(),
            placements: vec![None; nr_exams],
            occupancy: vec![SmallVec::new(); nr_periods * nr_rooms],
            nr_rooms,
            nr_assigned: 0,
            criterion_values: vec![0.0; model.criteria().len()],
            contexts: ContextArena::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> AssignmentId {
        self.id
    }

    #[inline]
    pub fn placement(&self, exam: ExamId) -> Option<&ExamPlacement> {
        self.placements[exam.get()].as_ref()
    }

    #[inline]
    pub fn nr_assigned_variables(&self) -> usize {
        self.nr_assigned
    }

    #[inline]
    pub fn nr_unassigned_variables(&self) -> usize {
        self.placements.len() - self.nr_assigned
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.nr_assigned == self.placements.len()
    }

    pub fn unassigned_exams(&self) -> impl Iterator<Item = ExamId> + '_ {
        self.placements
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_none())
            .map(|(i, _)| ExamId::new(i))
    }

    pub fn assigned_placements(&self) -> impl Iterator<Item = &ExamPlacement> {
        self.placements.iter().flatten()
    }

    /// Exams currently occupying `room` in `period`.
    #[inline]
    pub fn exams_in(&self, period: PeriodId, room: RoomId) -> &[ExamId] {
        &self.occupancy[period.get() * self.nr_rooms + room.get()]
    }

    /// Cached running total of the criterion at `index` in the model's
    /// criterion list.
    #[inline]
    pub fn criterion_value(&self, index: usize) -> f64 {
        self.criterion_values[index]
    }

    #[inline]
    pub fn contexts(&self) -> &ContextArena {
        &self.contexts
    }

    #[inline]
    pub fn contexts_mut(&mut self) -> &mut ContextArena {
        &mut self.contexts
    }

    /// Installs `placement`, replacing any previous placement of the same
    /// exam and updating all caches.
    ///
    /// Panics
    ///
    /// Panics if the placement violates hard feasibility or any of its rooms
    /// is occupied in the period. Producing feasible placements and evicting
    /// conflicts first is the caller's obligation.
    pub fn assign(&mut self, model: &SolverModel, iteration: u64, placement: ExamPlacement) {
        let exam = placement.exam();
        if self.placements[exam.get()].is_some() {
            self.unassign(model, iteration, exam);
        }
        if let Err(e) = model.problem().check_placement(&placement) {
            panic!("assign of infeasible placement {placement}: {e}");
        }
        for &room in placement.rooms() {
            let occupants = self.exams_in(placement.period(), room);
            assert!(
                occupants.is_empty(),
                "assign of {placement}: {room} already holds {:?}",
                occupants
            );
        }

        for &room in placement.rooms() {
            let slot = placement.period().get() * self.nr_rooms + room.get();
            self.occupancy[slot].push(exam);
        }
        self.placements[exam.get()] = Some(placement.clone());
        self.nr_assigned += 1;

        for index in 0..model.criteria().len() {
            let delta = model.criteria()[index].value_of(model.problem(), self, &placement, &[]);
            self.criterion_values[index] += delta;
        }
    }

    /// Removes the exam's placement if present; unassigning an unassigned
    /// exam is a no-op.
    pub fn unassign(&mut self, model: &SolverModel, iteration: u64, exam: ExamId) {
        let _ = iteration;
        let Some(placement) = self.placements[exam.get()].clone() else {
            return;
        };

        // Totals first, while the placement still counts as assigned.
        for index in 0..model.criteria().len() {
            let delta = model.criteria()[index].value_of(model.problem(), self, &placement, &[]);
            self.criterion_values[index] -= delta;
        }

        for &room in placement.rooms() {
            let slot = placement.period().get() * self.nr_rooms + room.get();
            self.occupancy[slot].retain(|e| *e != exam);
        }
        self.placements[exam.get()] = None;
        self.nr_assigned -= 1;
    }

    /// Currently assigned exams that must be unassigned before `placement`
    /// can go in: room occupants of the requested (period, room) pairs plus
    /// partners of violated hard distribution constraints.
    pub fn conflicts(&self, model: &SolverModel, placement: &ExamPlacement) -> Vec<ExamId> {
        let mut out: Vec<ExamId> = Vec::new();
        for &room in placement.rooms() {
            for &occupant in self.exams_in(placement.period(), room) {
                if occupant != placement.exam() && !out.contains(&occupant) {
                    out.push(occupant);
                }
            }
        }
        if model.soft_distributions() {
            return out;
        }
        let problem = model.problem();
        let exam = problem.exam(placement.exam());
        for &cid in exam.constraints() {
            let constraint = problem.constraint(cid);
            if !constraint.is_hard() {
                continue;
            }
            let my_pos = constraint
                .exams()
                .iter()
                .position(|e| *e == placement.exam());
            for (pos, &other) in constraint.exams().iter().enumerate() {
                if other == placement.exam() || out.contains(&other) {
                    continue;
                }
                let Some(other_placement) = self.placement(other) else {
                    continue;
                };
                let first_before_second = my_pos.is_none_or(|p| p < pos);
                let consistent = constraint.is_pair_consistent(
                    placement,
                    other_placement,
                    |p| problem.day_of(p.period()),
                    first_before_second,
                );
                if !consistent {
                    out.push(other);
                }
            }
        }
        out
    }

    /// Recomputes every criterion from scratch and cross-checks the cached
    /// totals; a mismatch means a criterion broke its incremental contract.
    pub fn verify_consistency(&self, model: &SolverModel) -> Result<(), ConsistencyError> {
        for (index, criterion) in model.criteria().iter().enumerate() {
            let recomputed = criterion.value(model.problem(), self);
            let cached = self.criterion_values[index];
            if (cached - recomputed).abs() > CONSISTENCY_TOLERANCE {
                return Err(ConsistencyError::new(criterion.name(), cached, recomputed));
            }
        }
        Ok(())
    }

    pub fn snapshot(&self) -> Vec<Option<ExamPlacement>> {
        self.placements.clone()
    }

    /// Rebuilds the assignment to match `snapshot`, replaying every change
    /// through the regular assign/unassign path so all caches stay exact.
    pub fn restore(
        &mut self,
        model: &SolverModel,
        iteration: u64,
        snapshot: &[Option<ExamPlacement>],
    ) {
        for index in 0..self.placements.len() {
            let target = &snapshot[index];
            if self.placements[index] == *target {
                continue;
            }
            self.unassign(model, iteration, ExamId::new(index));
        }
        for target in snapshot.iter().flatten() {
            if self.placements[target.exam().get()].as_ref() != Some(target) {
                self.assign(model, iteration, target.clone());
            }
        }
    }
}

impl PlacementView for ExamAssignment {
    #[inline]
    fn placement(&self, exam: ExamId) -> Option<&ExamPlacement> {
        ExamAssignment::placement(self, exam)
    }

    #[inline]
    fn nr_assigned_variables(&self) -> usize {
        self.nr_assigned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolverConfig;
    use examtt_model::model::{DistributionType, ExamModel, PeriodOption, RoomOption};

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

    /// 2 exams sharing a student, 2 periods (same day), 2 rooms.
    fn small() -> SolverModel {
        let mut b = ExamModel::builder();
        let p0 = b.add_period(0, 480, 120, 0.0);
        let p1 = b.add_period(0, 660, 120, 0.0);
        let r0 = b.add_room("A", 100, 100, None);
        let r1 = b.add_room("B", 50, 50, None);
        let e0 = b.add_exam("X", 10, 120);
        let e1 = b.add_exam("Y", 10, 120);
        for e in [e0, e1] {
            for p in [p0, p1] {
                b.exam_mut(e).add_period(PeriodOption::new(p, 0));
            }
            for r in [r0, r1] {
                b.exam_mut(e).add_room(RoomOption::new(r, 0));
            }
        }
        let s = b.add_student();
        b.enroll(s, e0);
        b.enroll(s, e1);
        SolverModel::from_model(b.build().unwrap(), &SolverConfig::new()).unwrap()
    }

    fn plc(model: &SolverModel, exam: usize, period: usize, rooms: &[usize]) -> ExamPlacement {
        let _ = model;
        ExamPlacement::new(
            eid(exam),
            pid(period),
            rooms.iter().map(|r| rid(*r)).collect::<Vec<_>>(),
        )
    }

    #[test]
    fn test_assign_and_unassign_bookkeeping() {
        let model = small();
        let mut a = ExamAssignment::new(&model);
        assert_eq!(a.nr_assigned_variables(), 0);
        assert_eq!(a.nr_unassigned_variables(), 2);

        a.assign(&model, 0, plc(&model, 0, 0, &[0]));
        assert_eq!(a.nr_assigned_variables(), 1);
        assert_eq!(a.placement(eid(0)).unwrap().period(), pid(0));
        assert_eq!(a.exams_in(pid(0), rid(0)), &[eid(0)]);
        assert!(a.exams_in(pid(0), rid(1)).is_empty());

        a.unassign(&model, 1, eid(0));
        assert_eq!(a.nr_assigned_variables(), 0);
        assert!(a.placement(eid(0)).is_none());
        assert!(a.exams_in(pid(0), rid(0)).is_empty());
    }

    #[test]
    fn test_unassign_is_idempotent() {
        let model = small();
        let mut a = ExamAssignment::new(&model);
        a.unassign(&model, 0, eid(0));
        assert_eq!(a.nr_assigned_variables(), 0);
        a.assign(&model, 1, plc(&model, 0, 0, &[0]));
        a.unassign(&model, 2, eid(0));
        a.unassign(&model, 3, eid(0));
        assert_eq!(a.nr_assigned_variables(), 0);
        assert!(a.verify_consistency(&model).is_ok());
    }

    #[test]
    fn test_reassign_replaces_previous_placement() {
        let model = small();
        let mut a = ExamAssignment::new(&model);
        a.assign(&model, 0, plc(&model, 0, 0, &[0]));
        a.assign(&model, 1, plc(&model, 0, 1, &[1]));
        assert_eq!(a.nr_assigned_variables(), 1);
        assert_eq!(a.placement(eid(0)).unwrap().period(), pid(1));
        assert!(a.exams_in(pid(0), rid(0)).is_empty());
        assert_eq!(a.exams_in(pid(1), rid(1)), &[eid(0)]);
        assert!(a.verify_consistency(&model).is_ok());
    }

    #[test]
    #[should_panic(expected = "infeasible placement")]
    fn test_assign_infeasible_panics() {
        let model = small();
        let mut a = ExamAssignment::new(&model);
        // Room 1 holds 50, fine; period 5 does not exist in the exam's domain.
        a.assign(&model, 0, ExamPlacement::new(eid(0), pid(1), [rid(0)]));
        a.assign(
            &model,
            1,
            ExamPlacement::new(eid(1), PeriodId::new(0), [RoomId::new(0), RoomId::new(1)]),
        );
        // Re-assign exam 0 into an occupied room set without evicting.
        a.assign(&model, 2, ExamPlacement::new(eid(0), PeriodId::new(5), [rid(0)]));
    }

    #[test]
    #[should_panic(expected = "already holds")]
    fn test_assign_into_occupied_room_panics() {
        let model = small();
        let mut a = ExamAssignment::new(&model);
        a.assign(&model, 0, plc(&model, 0, 0, &[0]));
        a.assign(&model, 1, plc(&model, 1, 0, &[0]));
    }

    #[test]
    fn test_conflicts_room_occupancy() {
        let model = small();
        let mut a = ExamAssignment::new(&model);
        a.assign(&model, 0, plc(&model, 0, 0, &[0]));

        let clash = plc(&model, 1, 0, &[0]);
        assert_eq!(a.conflicts(&model, &clash), vec![eid(0)]);

        let free = plc(&model, 1, 0, &[1]);
        assert!(a.conflicts(&model, &free).is_empty());
    }

    #[test]
    fn test_conflicts_hard_distribution() {
        let mut b = ExamModel::builder();
        let p0 = b.add_period(0, 480, 120, 0.0);
        let p1 = b.add_period(0, 660, 120, 0.0);
        let r0 = b.add_room("A", 100, 100, None);
        let r1 = b.add_room("B", 100, 100, None);
        let e0 = b.add_exam("X", 10, 120);
        let e1 = b.add_exam("Y", 10, 120);
        for e in [e0, e1] {
            for p in [p0, p1] {
                b.exam_mut(e).add_period(PeriodOption::new(p, 0));
            }
            for r in [r0, r1] {
                b.exam_mut(e).add_room(RoomOption::new(r, 0));
            }
        }
        b.add_constraint(DistributionType::SamePeriod, true, 0.0, vec![e0, e1])
            .unwrap();
        let model = SolverModel::from_model(b.build().unwrap(), &SolverConfig::new()).unwrap();

        let mut a = ExamAssignment::new(&model);
        a.assign(&model, 0, ExamPlacement::new(e0, p0, [r0]));

        // Same period, different room: consistent, no conflict.
        let ok = ExamPlacement::new(e1, p0, [r1]);
        assert!(a.conflicts(&model, &ok).is_empty());

        // Different period violates the hard same-period constraint.
        let bad = ExamPlacement::new(e1, p1, [r1]);
        assert_eq!(a.conflicts(&model, &bad), vec![e0]);
    }

    #[test]
    fn test_snapshot_restore_roundtrip() {
        let model = small();
        let mut a = ExamAssignment::new(&model);
        a.assign(&model, 0, plc(&model, 0, 0, &[0]));
        a.assign(&model, 1, plc(&model, 1, 1, &[1]));
        let snap = a.snapshot();
        let total = model.total_value(&a);

        a.unassign(&model, 2, eid(0));
        a.assign(&model, 3, plc(&model, 1, 0, &[1]));
        a.restore(&model, 4, &snap);

        assert_eq!(a.snapshot(), snap);
        assert_eq!(model.total_value(&a), total);
        assert!(a.verify_consistency(&model).is_ok());
    }

    #[test]
    fn test_incremental_totals_match_scratch_totals() {
        let model = small();
        let mut a = ExamAssignment::new(&model);
        // direct student conflict: both exams in period 0
        a.assign(&model, 0, plc(&model, 0, 0, &[0]));
        a.assign(&model, 1, plc(&model, 1, 0, &[1]));
        assert!(a.verify_consistency(&model).is_ok());
        assert!(model.total_value(&a) > 0.0);

        // move exam 1 away, conflict disappears
        a.assign(&model, 2, plc(&model, 1, 1, &[1]));
        assert!(a.verify_consistency(&model).is_ok());
    }
}
