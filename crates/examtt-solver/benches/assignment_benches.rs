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

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use examtt_model::common::{ExamId, PeriodId, RoomId};
use examtt_model::model::{ExamModel, ExamPlacement, PeriodOption, RoomOption};
use examtt_solver::assignment::ExamAssignment;
use examtt_solver::config::SolverConfig;
use examtt_solver::model::SolverModel;
use examtt_solver::neighbours::{ExamRandomMove, NeighbourGenerator};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn bench_model(nr_exams: usize) -> SolverModel {
    let mut b = ExamModel::builder();
    let periods: Vec<PeriodId> = (0..20).map(|i| b.add_period(i / 4, 480, 120, 0.0)).collect();
    let rooms: Vec<RoomId> = (0..10)
        .map(|i| b.add_room(format!("R{i}"), 100, 60, Some((i as f64 * 50.0, 0.0))))
        .collect();
    let mut exams = Vec::new();
    for i in 0..nr_exams {
        let e = b.add_exam(format!("E{i}"), 30 + (i % 50) as u32, 120);
        for &p in &periods {
            b.exam_mut(e).add_period(PeriodOption::new(p, (i % 3) as i32));
        }
        for &r in &rooms {
            b.exam_mut(e).add_room(RoomOption::new(r, 0));
        }
        exams.push(e);
    }
    for i in 0..nr_exams * 4 {
        let s = b.add_student();
        b.enroll(s, exams[i % nr_exams]);
        b.enroll(s, exams[(i * 7 + 1) % nr_exams]);
    }
    SolverModel::from_model(b.build().unwrap(), &SolverConfig::new()).unwrap()
}

fn bench_assign_unassign(c: &mut Criterion) {
    let model = bench_model(100);
    c.bench_function("assign_unassign_cycle", |bench| {
        let mut assignment = ExamAssignment::new(&model);
        bench.iter(|| {
            for i in 0..20usize {
                let exam = ExamId::new(i);
                let placement = ExamPlacement::new(
                    exam,
                    PeriodId::new(i % 20),
                    [RoomId::new(i % 10)],
                );
                assignment.assign(&model, i as u64, placement);
            }
            for i in 0..20usize {
                assignment.unassign(&model, i as u64, ExamId::new(i));
            }
            black_box(assignment.nr_assigned_variables())
        });
    });
}

fn bench_move_generation_and_delta(c: &mut Criterion) {
    let model = bench_model(100);
    let mut assignment = ExamAssignment::new(&model);
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let generator = ExamRandomMove::default();
    // Warm the assignment with a partial schedule.
    for _ in 0..500 {
        if let Some(n) = generator.generate(&model, &assignment, &mut rng) {
            n.assign(&model, &mut assignment, 0);
        }
    }
    c.bench_function("random_move_with_delta", |bench| {
        bench.iter(|| {
            let n = generator.generate(&model, &assignment, &mut rng);
            black_box(n.map(|n| n.value()))
        });
    });
}

criterion_group!(benches, bench_assign_unassign, bench_move_generation_and_delta);
criterion_main!(benches);
