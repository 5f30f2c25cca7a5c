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

//! Seeded end-to-end scenarios and randomized whole-engine properties.

use examtt_model::common::{ExamId, PeriodId, RoomId, StudentId};
use examtt_model::model::{ExamModel, ExamModelBuilder, ExamPlacement, PeriodOption, RoomOption};
use examtt_model::writer::{SolutionWriter, XmlSolutionWriter};
use examtt_solver::assignment::ExamAssignment;
use examtt_solver::config::SolverConfig;
use examtt_solver::model::SolverModel;
use examtt_solver::neighbours::NeighbourGenerator;
use examtt_solver::solution::Solution;
use examtt_solver::solver::{Solver, solve_with_warm_start};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn quick_config(seed: u64) -> SolverConfig {
    let mut config = SolverConfig::new();
    config.set("General.Seed", seed.to_string());
    config.set("Termination.MaxIters", "20000");
    config.set("HillClimber.MaxIdle", "300");
    config
}

fn full_domain(b: &mut ExamModelBuilder, exam: ExamId, periods: &[PeriodId], rooms: &[RoomId]) {
    for &p in periods {
        b.exam_mut(exam).add_period(PeriodOption::new(p, 0));
    }
    for &r in rooms {
        b.exam_mut(exam).add_room(RoomOption::new(r, 0));
    }
}

fn criterion_total(model: &SolverModel, assignment: &ExamAssignment, name: &str) -> f64 {
    let (index, _) = model.criterion_named(name).unwrap();
    assignment.criterion_value(index)
}

#[test]
fn test_s1_trivial_instance_solves_without_conflicts() {
    let mut b = ExamModel::builder();
    let periods = [b.add_period(0, 480, 120, 0.0), b.add_period(0, 660, 120, 0.0)];
    let rooms = [b.add_room("A", 50, 50, None), b.add_room("B", 50, 50, None)];
    let e0 = b.add_exam("X", 30, 120);
    let e1 = b.add_exam("Y", 30, 120);
    full_domain(&mut b, e0, &periods, &rooms);
    full_domain(&mut b, e1, &periods, &rooms);
    let s0 = b.add_student();
    let s1 = b.add_student();
    b.enroll(s0, e0);
    b.enroll(s1, e1);

    let config = quick_config(11);
    let model = SolverModel::from_model(b.build().unwrap(), &config).unwrap();
    let solver = Solver::new(&config).unwrap();
    let solution = solve_with_warm_start(&solver, &model, &[]);

    assert!(solution.assignment().is_complete());
    assert_eq!(
        criterion_total(&model, solution.assignment(), "StudentDirectConflicts"),
        0.0
    );
    assert_eq!(
        criterion_total(&model, solution.assignment(), "StudentBackToBackConflicts"),
        0.0
    );
}

#[test]
fn test_s2_shared_students_forced_into_distinct_periods() {
    let mut b = ExamModel::builder();
    let periods = [b.add_period(0, 480, 120, 0.0), b.add_period(1, 480, 120, 0.0)];
    let rooms = [b.add_room("A", 50, 50, None)];
    let e0 = b.add_exam("X", 10, 120);
    let e1 = b.add_exam("Y", 10, 120);
    full_domain(&mut b, e0, &periods, &rooms);
    full_domain(&mut b, e1, &periods, &rooms);
    let students: Vec<StudentId> = (0..10).map(|_| b.add_student()).collect();
    for &s in &students {
        b.enroll(s, e0);
        b.enroll(s, e1);
    }

    let config = quick_config(22);
    let model = SolverModel::from_model(b.build().unwrap(), &config).unwrap();
    let solver = Solver::new(&config).unwrap();
    let solution = solve_with_warm_start(&solver, &model, &[]);

    assert!(solution.assignment().is_complete());
    let p0 = solution.assignment().placement(e0).unwrap().period();
    let p1 = solution.assignment().placement(e1).unwrap().period();
    assert_ne!(p0, p1, "shared students must force distinct periods");
    assert_eq!(
        criterion_total(&model, solution.assignment(), "StudentDirectConflicts"),
        0.0
    );
}

#[test]
fn test_s3_forced_direct_conflicts_are_counted_and_best_saved() {
    let mut b = ExamModel::builder();
    let periods = [b.add_period(0, 480, 120, 0.0)];
    let rooms = [b.add_room("A", 50, 50, None), b.add_room("B", 50, 50, None)];
    let e0 = b.add_exam("X", 5, 120);
    let e1 = b.add_exam("Y", 5, 120);
    full_domain(&mut b, e0, &periods, &rooms);
    full_domain(&mut b, e1, &periods, &rooms);
    for _ in 0..5 {
        let s = b.add_student();
        b.enroll(s, e0);
        b.enroll(s, e1);
    }

    let config = quick_config(33);
    let model = SolverModel::from_model(b.build().unwrap(), &config).unwrap();
    let solver = Solver::new(&config).unwrap();
    let solution = solve_with_warm_start(&solver, &model, &[]);

    assert!(solution.best().is_some());
    assert!(solution.assignment().is_complete());
    assert_eq!(
        criterion_total(&model, solution.assignment(), "StudentDirectConflicts"),
        5.0
    );
}

#[test]
fn test_s4_room_split_when_no_single_room_fits() {
    let mut b = ExamModel::builder();
    let periods = [b.add_period(0, 480, 180, 0.0)];
    let r0 = b.add_room("A", 100, 100, None);
    let r1 = b.add_room("B", 150, 150, None);
    let e = b.add_exam("X", 200, 180);
    full_domain(&mut b, e, &periods, &[r0, r1]);

    // A single exam with a forced room pair has an empty neighbourhood, so
    // keep the iteration budget small.
    let mut config = quick_config(44);
    config.set("Termination.MaxIters", "500");
    config.set("HillClimber.MaxIdle", "50");
    let model = SolverModel::from_model(b.build().unwrap(), &config).unwrap();
    let solver = Solver::new(&config).unwrap();
    let solution = solve_with_warm_start(&solver, &model, &[]);

    let placement = solution.assignment().placement(e).unwrap();
    assert_eq!(placement.rooms(), &[r0, r1]);
    assert_eq!(
        criterion_total(&model, solution.assignment(), "RoomSplitPenalty"),
        1.0
    );
}

#[test]
fn test_s5_back_to_back_within_one_day() {
    let mut b = ExamModel::builder();
    // Two consecutive periods on the same day, one room: the shared student
    // forces distinct periods, so exactly one back-to-back pair remains.
    let periods = [b.add_period(0, 480, 120, 0.0), b.add_period(0, 660, 120, 0.0)];
    let rooms = [b.add_room("A", 50, 50, None)];
    let e0 = b.add_exam("X", 1, 120);
    let e1 = b.add_exam("Y", 1, 120);
    full_domain(&mut b, e0, &periods, &rooms);
    full_domain(&mut b, e1, &periods, &rooms);
    let s = b.add_student();
    b.enroll(s, e0);
    b.enroll(s, e1);

    let config = quick_config(55);
    let model = SolverModel::from_model(b.build().unwrap(), &config).unwrap();
    let solver = Solver::new(&config).unwrap();
    let solution = solve_with_warm_start(&solver, &model, &[]);

    assert!(solution.assignment().is_complete());
    assert_eq!(
        criterion_total(&model, solution.assignment(), "StudentDirectConflicts"),
        0.0
    );
    assert_eq!(
        criterion_total(&model, solution.assignment(), "StudentBackToBackConflicts"),
        1.0
    );
}

#[test]
fn test_s5_cross_day_pair_not_counted_with_flag_off() {
    let mut b = ExamModel::builder();
    // Adjacent periods across a day break.
    let periods = [b.add_period(0, 660, 120, 0.0), b.add_period(1, 480, 120, 0.0)];
    let rooms = [b.add_room("A", 50, 50, None)];
    let e0 = b.add_exam("X", 1, 120);
    let e1 = b.add_exam("Y", 1, 120);
    full_domain(&mut b, e0, &periods, &rooms);
    full_domain(&mut b, e1, &periods, &rooms);
    let s = b.add_student();
    b.enroll(s, e0);
    b.enroll(s, e1);

    let config = quick_config(56);
    let model = SolverModel::from_model(b.build().unwrap(), &config).unwrap();
    let solver = Solver::new(&config).unwrap();
    let solution = solve_with_warm_start(&solver, &model, &[]);

    assert!(solution.assignment().is_complete());
    assert_eq!(
        criterion_total(&model, solution.assignment(), "StudentBackToBackConflicts"),
        0.0
    );
}

#[test]
fn test_s6_timeout_is_honored() {
    let mut b = ExamModel::builder();
    let periods: Vec<PeriodId> = (0..10).map(|i| b.add_period(i / 2, 480, 120, 0.0)).collect();
    let rooms: Vec<RoomId> = (0..10).map(|i| b.add_room(format!("R{i}"), 40, 40, None)).collect();
    let mut exams = Vec::new();
    for i in 0..100 {
        let e = b.add_exam(format!("E{i}"), 20, 120);
        full_domain(&mut b, e, &periods, &rooms);
        exams.push(e);
    }
    // A chain of shared students keeps the instance from being trivial.
    for pair in exams.windows(2) {
        let s = b.add_student();
        b.enroll(s, pair[0]);
        b.enroll(s, pair[1]);
    }

    let mut config = SolverConfig::new();
    config.set("General.Seed", "66");
    config.set("Termination.TimeOut", "1");
    config.set("HillClimber.MaxIdle", "200");

    let model = SolverModel::from_model(b.build().unwrap(), &config).unwrap();
    let solver = Solver::new(&config).unwrap();
    let started = std::time::Instant::now();
    let solution = solve_with_warm_start(&solver, &model, &[]);
    let elapsed = started.elapsed();

    assert!(
        elapsed.as_secs_f64() < 1.5,
        "solver ran {elapsed:?} past its 1 second budget"
    );
    assert!(solution.best().is_some(), "a best snapshot must be written");

    // The snapshot renders to a solution document.
    let xml = XmlSolutionWriter::new().save(model.problem(), solution.assignment());
    assert!(xml.contains("<solution"));
}

#[test]
fn test_solution_file_roundtrip_after_solving() {
    let mut b = ExamModel::builder();
    let periods = [b.add_period(0, 480, 120, 0.0), b.add_period(0, 660, 120, 0.0)];
    let rooms = [b.add_room("A", 50, 50, None), b.add_room("B", 50, 50, None)];
    for name in ["V", "W", "X", "Y"] {
        let e = b.add_exam(name, 30, 120);
        full_domain(&mut b, e, &periods, &rooms);
    }

    let config = quick_config(77);
    let model = SolverModel::from_model(b.build().unwrap(), &config).unwrap();
    let solver = Solver::new(&config).unwrap();
    let solution = solve_with_warm_start(&solver, &model, &[]);
    assert!(solution.assignment().is_complete());

    let writer = XmlSolutionWriter::new();
    let xml = writer.save(model.problem(), solution.assignment());
    let parsed = writer.parse_solution(model.problem(), &xml).unwrap();
    assert_eq!(parsed.len(), 4);
    for placement in &parsed {
        assert_eq!(
            solution.assignment().placement(placement.exam()),
            Some(placement)
        );
    }
}

/// A random 8-exam model with a mix of students, instructors and penalties.
fn random_model(seed: u64) -> (SolverConfig, SolverModel) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut b = ExamModel::builder();
    let periods: Vec<PeriodId> = (0..6).map(|i| b.add_period(i / 3, 480, 120, 0.0)).collect();
    let rooms: Vec<RoomId> = (0..4)
        .map(|i| b.add_room(format!("R{i}"), 30 + 10 * i, 20, Some((i as f64 * 100.0, 0.0))))
        .collect();
    let mut exams = Vec::new();
    for i in 0..8 {
        let e = b.add_exam(format!("E{i}"), rng.random_range(5..40), 120);
        for &p in &periods {
            b.exam_mut(e).add_period(PeriodOption::new(p, rng.random_range(0..3)));
        }
        for &r in &rooms {
            b.exam_mut(e).add_room(RoomOption::new(r, rng.random_range(0..2)));
        }
        exams.push(e);
    }
    for _ in 0..10 {
        let s = b.add_student();
        let a = exams[rng.random_range(0..exams.len())];
        let c = exams[rng.random_range(0..exams.len())];
        b.enroll(s, a);
        b.enroll(s, c);
    }
    for _ in 0..2 {
        let i = b.add_instructor();
        b.assign_instructor(i, exams[rng.random_range(0..exams.len())]);
        b.assign_instructor(i, exams[rng.random_range(0..exams.len())]);
    }
    let config = quick_config(seed);
    let model = SolverModel::from_model(b.build().unwrap(), &config).unwrap();
    (config, model)
}

#[test]
fn test_property_incremental_totals_survive_random_move_sequences() {
    for seed in [1u64, 2, 3] {
        let (_, model) = random_model(seed);
        let mut assignment = ExamAssignment::new(&model);
        let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0xABCD);
        let generator = examtt_solver::neighbours::ExamRandomMove::default();

        for step in 0..300u64 {
            if rng.random_bool(0.15) && assignment.nr_assigned_variables() > 0 {
                // Random unassign.
                let assigned: Vec<ExamId> = (0..model.problem().nr_exams())
                    .map(ExamId::new)
                    .filter(|e| assignment.placement(*e).is_some())
                    .collect();
                let victim = assigned[rng.random_range(0..assigned.len())];
                assignment.unassign(&model, step, victim);
            } else if let Some(n) = generator.generate(&model, &assignment, &mut rng) {
                n.assign(&model, &mut assignment, step);
            }
            assignment
                .verify_consistency(&model)
                .expect("incremental totals diverged from scratch totals");
        }
    }
}

#[test]
fn test_property_move_delta_matches_applied_change() {
    for seed in [4u64, 5, 6] {
        let (_, model) = random_model(seed);
        let mut assignment = ExamAssignment::new(&model);
        let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0x1234);
        let generator = examtt_solver::neighbours::ExamRandomMove::default();

        for step in 0..200u64 {
            let Some(n) = generator.generate(&model, &assignment, &mut rng) else {
                continue;
            };
            let before = model.total_value(&assignment);
            let predicted = n.value();
            n.assign(&model, &mut assignment, step);
            let actual = model.total_value(&assignment) - before;
            assert!(
                (predicted - actual).abs() < 1e-6,
                "seed {seed} step {step}: predicted {predicted}, actual {actual}"
            );
        }
    }
}

#[test]
fn test_property_accepted_moves_preserve_hard_feasibility() {
    let (config, model) = random_model(7);
    let solver = Solver::new(&config).unwrap();
    let mut solution = Solution::new(ExamAssignment::new(&model));
    solver.solve(&model, &mut solution);

    for exam in model.problem().exams() {
        if let Some(placement) = solution.assignment().placement(exam.id()) {
            model
                .problem()
                .check_placement(placement)
                .expect("assigned placement violates hard feasibility");
            for &room in placement.rooms() {
                assert_eq!(
                    solution.assignment().exams_in(placement.period(), room),
                    &[exam.id()],
                    "room double-booked"
                );
            }
        }
    }
}

#[test]
fn test_property_idempotent_unassign_under_random_state() {
    let (_, model) = random_model(8);
    let mut assignment = ExamAssignment::new(&model);
    assignment.assign(
        &model,
        0,
        ExamPlacement::new(
            ExamId::new(0),
            PeriodId::new(0),
            model
                .problem()
                .best_rooms(model.problem().exam(ExamId::new(0)), PeriodId::new(0))
                .unwrap(),
        ),
    );
    let before = assignment.snapshot();
    assignment.unassign(&model, 1, ExamId::new(1));
    assignment.unassign(&model, 2, ExamId::new(1));
    assert_eq!(assignment.snapshot(), before);
    assert!(assignment.verify_consistency(&model).is_ok());
}
