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

use crate::assignment::{ComponentId, ExamAssignment};
use crate::config::SolverConfig;
use crate::construction::{ColoringConstruction, ExamConstruction, TabuSearchRepair};
use crate::err::ConfigError;
use crate::heuristics::{GreatDeluge, HillClimber, SimulatedAnnealing};
use crate::model::SolverModel;
use crate::neighbours::{ExamNeighbour, NeighbourSelection};
use crate::solution::Solution;
use rand_chacha::ChaCha8Rng;

/// The search phases, in the order they run. A phase hands over to the next
/// one when its selector returns "no candidate"; the index never goes back,
/// except for the `Final -> Init` step that marks the end of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Init,
    Construction,
    Repair,
    HillClimbing,
    Metaheuristic,
    Final,
}

#[derive(Debug)]
struct SelectionContext {
    phase: Phase,
    can_continue: bool,
    final_requested: bool,
    final_finished: bool,
}

impl Default for SelectionContext {
    fn default() -> Self {
        Self {
            phase: Phase::Init,
            can_continue: true,
            final_requested: false,
            final_finished: false,
        }
    }
}

enum Metaheuristic {
    Annealing(SimulatedAnnealing),
    Deluge(GreatDeluge),
}

/// The multi-phase controller: graph-coloring opening (optional), forward
/// construction, CBS/tabu repair, hill-climbing, then simulated annealing or
/// great deluge until the outer termination condition fires, and one closing
/// hill-climbing sweep over the restored best. It wraps the solver's
/// termination so the final sweep gets to run after the outer condition
/// first says stop.
pub struct ExamNeighbourSelection {
    component: ComponentId,
    coloring: Option<ColoringConstruction>,
    construction: ExamConstruction,
    repair: TabuSearchRepair,
    hill_climber: HillClimber,
    finalization: HillClimber,
    metaheuristic: Metaheuristic,
}

impl ExamNeighbourSelection {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        let coloring = if config.get_bool("Exam.ColoringConstruction", false)? {
            Some(ColoringConstruction::new())
        } else {
            None
        };
        let metaheuristic = if config.get_bool("Exam.GreatDeluge", false)? {
            Metaheuristic::Deluge(GreatDeluge::new(config)?)
        } else {
            Metaheuristic::Annealing(SimulatedAnnealing::new(config)?)
        };
        Ok(Self {
            component: ComponentId::next(),
            coloring,
            construction: ExamConstruction::new(config)?,
            repair: TabuSearchRepair::new(config)?,
            hill_climber: HillClimber::new(config)?,
            finalization: HillClimber::with_name(config, "Finalization")?,
            metaheuristic,
        })
    }

    /// The one-shot message that the outer termination condition rejected
    /// continuation: the controller latches into the final sweep.
    pub fn request_final_phase(&self, assignment: &mut ExamAssignment) {
        let context = self.context_mut(assignment);
        if !context.final_requested {
            context.final_requested = true;
            tracing::info!("***** final phase *****");
        }
    }

    pub fn is_final_phase(&self, assignment: &ExamAssignment) -> bool {
        assignment
            .contexts()
            .get::<SelectionContext>(self.component)
            .map(|c| c.final_requested)
            .unwrap_or(false)
    }

    /// The controller's own termination verdict: false only after the final
    /// sweep has finished.
    pub fn can_continue(&self, assignment: &ExamAssignment) -> bool {
        assignment
            .contexts()
            .get::<SelectionContext>(self.component)
            .map(|c| c.can_continue)
            .unwrap_or(true)
    }

    /// Whether the closing sweep has completed under this assignment.
    pub fn final_finished(&self, assignment: &ExamAssignment) -> bool {
        assignment
            .contexts()
            .get::<SelectionContext>(self.component)
            .map(|c| c.final_finished)
            .unwrap_or(false)
    }

    pub fn phase(&self, assignment: &ExamAssignment) -> Phase {
        assignment
            .contexts()
            .get::<SelectionContext>(self.component)
            .map(|c| c.phase)
            .unwrap_or(Phase::Init)
    }

    /// Exams the construction failed to place under this assignment.
    pub fn unplaceable_exams(
        &self,
        assignment: &ExamAssignment,
    ) -> Vec<examtt_model::common::ExamId> {
        self.construction.infeasible_exams(assignment)
    }

    fn context_mut<'a>(&self, assignment: &'a mut ExamAssignment) -> &'a mut SelectionContext {
        assignment
            .contexts_mut()
            .get_or_create::<SelectionContext, _>(self.component, Default::default)
    }

    fn set_phase(&self, assignment: &mut ExamAssignment, phase: Phase) {
        self.context_mut(assignment).phase = phase;
    }
}

impl NeighbourSelection for ExamNeighbourSelection {
    fn name(&self) -> &'static str {
        "ExamNeighbourSelection"
    }

    fn select_neighbour(
        &self,
        model: &SolverModel,
        solution: &mut Solution,
        rng: &mut ChaCha8Rng,
    ) -> Option<ExamNeighbour> {
        loop {
            let phase = {
                let context = self.context_mut(solution.assignment_mut());
                if !context.can_continue {
                    return None;
                }
                if context.final_requested && context.phase != Phase::Final {
                    context.phase = Phase::Final;
                }
                context.phase
            };

            match phase {
                Phase::Init => {
                    self.set_phase(solution.assignment_mut(), Phase::Construction);
                    tracing::info!("***** construction phase *****");
                }
                Phase::Construction => {
                    if let Some(coloring) = &self.coloring {
                        if let Some(n) = coloring.select_neighbour(model, solution, rng) {
                            return Some(n);
                        }
                    }
                    if let Some(n) = self.construction.select_neighbour(model, solution, rng) {
                        return Some(n);
                    }
                    self.set_phase(solution.assignment_mut(), Phase::Repair);
                    tracing::info!("***** cbs/tabu-search phase *****");
                }
                Phase::Repair => {
                    if solution.assignment().nr_unassigned_variables() > 0 {
                        if let Some(n) = self.repair.select_neighbour(model, solution, rng) {
                            return Some(n);
                        }
                    }
                    self.set_phase(solution.assignment_mut(), Phase::HillClimbing);
                    tracing::info!("***** hill climbing phase *****");
                }
                Phase::HillClimbing => {
                    if let Some(n) = self.hill_climber.select_neighbour(model, solution, rng) {
                        return Some(n);
                    }
                    self.set_phase(solution.assignment_mut(), Phase::Metaheuristic);
                    match &self.metaheuristic {
                        Metaheuristic::Annealing(_) => {
                            tracing::info!("***** simulated annealing phase *****")
                        }
                        Metaheuristic::Deluge(_) => {
                            tracing::info!("***** great deluge phase *****")
                        }
                    }
                }
                Phase::Metaheuristic => {
                    return match &self.metaheuristic {
                        Metaheuristic::Annealing(sa) => {
                            sa.select_neighbour(model, solution, rng)
                        }
                        Metaheuristic::Deluge(gd) => gd.select_neighbour(model, solution, rng),
                    };
                }
                Phase::Final => {
                    if let Some(n) = self.finalization.select_neighbour(model, solution, rng) {
                        return Some(n);
                    }
                    let context = self.context_mut(solution.assignment_mut());
                    context.phase = Phase::Init;
                    context.final_finished = true;
                    context.can_continue = false;
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use examtt_model::model::{ExamModel, PeriodOption, RoomOption};
    use rand::SeedableRng;

    /// 4 exams over 3 periods and 2 rooms, pairwise student overlaps.
    fn model(config: &SolverConfig) -> SolverModel {
        let mut b = ExamModel::builder();
        let periods = [
            b.add_period(0, 480, 120, 0.0),
            b.add_period(0, 660, 120, 0.0),
            b.add_period(1, 480, 120, 0.0),
        ];
        let rooms = [b.add_room("A", 20, 20, None), b.add_room("B", 20, 20, None)];
        let exams: Vec<_> = ["W", "X", "Y", "Z"]
            .iter()
            .map(|name| b.add_exam(*name, 10, 120))
            .collect();
        for &e in &exams {
            for p in periods {
                b.exam_mut(e).add_period(PeriodOption::new(p, 0));
            }
            for r in rooms {
                b.exam_mut(e).add_room(RoomOption::new(r, 0));
            }
        }
        for pair in exams.windows(2) {
            let s = b.add_student();
            b.enroll(s, pair[0]);
            b.enroll(s, pair[1]);
        }
        SolverModel::from_model(b.build().unwrap(), config).unwrap()
    }

    fn drive(config: &SolverConfig, iterations: usize) -> (SolverModel, Solution, Vec<Phase>) {
        let m = model(config);
        let selection = ExamNeighbourSelection::new(config).unwrap();
        let mut solution = Solution::new(ExamAssignment::new(&m));
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut phases = Vec::new();
        for _ in 0..iterations {
            if !selection.can_continue(solution.assignment()) {
                break;
            }
            let Some(n) = selection.select_neighbour(&m, &mut solution, &mut rng) else {
                solution.record_failed();
                continue;
            };
            phases.push(selection.phase(solution.assignment()));
            let iteration = solution.iteration() + 1;
            n.assign(&m, solution.assignment_mut(), iteration);
            solution.update(&m);
            solution.save_best_if_improved(&m, -1);
        }
        (m, solution, phases)
    }

    fn base_config() -> SolverConfig {
        let mut config = SolverConfig::new();
        config.set("HillClimber.MaxIdle", "100");
        config
    }

    #[test]
    fn test_phases_are_monotone_and_reach_metaheuristic() {
        let (m, solution, phases) = drive(&base_config(), 2_000);
        for pair in phases.windows(2) {
            assert!(pair[0] <= pair[1], "phase went backwards: {pair:?}");
        }
        assert_eq!(*phases.last().unwrap(), Phase::Metaheuristic);
        assert!(solution.assignment().is_complete());
        assert!(solution.assignment().verify_consistency(&m).is_ok());
    }

    #[test]
    fn test_coloring_construction_enabled() {
        let mut config = base_config();
        config.set("Exam.ColoringConstruction", "true");
        let (_, solution, phases) = drive(&config, 2_000);
        assert!(solution.assignment().is_complete());
        assert!(phases.contains(&Phase::Construction));
    }

    #[test]
    fn test_great_deluge_selected_by_config() {
        let mut config = base_config();
        config.set("Exam.GreatDeluge", "true");
        let selection = ExamNeighbourSelection::new(&config).unwrap();
        assert!(matches!(selection.metaheuristic, Metaheuristic::Deluge(_)));
    }

    #[test]
    fn test_final_phase_latches_and_finishes() {
        let config = base_config();
        let m = model(&config);
        let selection = ExamNeighbourSelection::new(&config).unwrap();
        let mut solution = Solution::new(ExamAssignment::new(&m));
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        // Run into the metaheuristic phase first.
        for _ in 0..500 {
            let Some(n) = selection.select_neighbour(&m, &mut solution, &mut rng) else {
                break;
            };
            let iteration = solution.iteration() + 1;
            n.assign(&m, solution.assignment_mut(), iteration);
            solution.update(&m);
        }
        assert_eq!(selection.phase(solution.assignment()), Phase::Metaheuristic);

        // Outer termination fires: post the final-phase message.
        selection.request_final_phase(solution.assignment_mut());
        assert!(selection.is_final_phase(solution.assignment()));

        // The final sweep runs and then the controller reasserts termination.
        let mut guard = 0;
        while let Some(n) = selection.select_neighbour(&m, &mut solution, &mut rng) {
            let iteration = solution.iteration() + 1;
            n.assign(&m, solution.assignment_mut(), iteration);
            solution.update(&m);
            guard += 1;
            assert!(guard < 100_000, "final phase never finished");
        }
        assert!(!selection.can_continue(solution.assignment()));
        assert!(selection.final_finished(solution.assignment()));
        // End-of-run marker.
        assert_eq!(selection.phase(solution.assignment()), Phase::Init);
    }
}
