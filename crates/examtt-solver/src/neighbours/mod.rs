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

mod random_move;
mod room_move;
mod time_move;

pub use random_move::ExamRandomMove;
pub use room_move::ExamRoomMove;
pub use time_move::ExamTimeMove;

use crate::assignment::ExamAssignment;
use crate::config::SolverConfig;
use crate::err::ConfigError;
use crate::model::SolverModel;
use crate::solution::Solution;
use examtt_model::common::{ExamId, PeriodId, RoomId};
use examtt_model::model::{Exam, ExamPlacement};
use rand::Rng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use smallvec::SmallVec;

/// A reversible delta against the assignment: one placement to install and
/// the currently assigned exams that must leave first. The predicted value
/// is the weighted criterion delta of applying the whole thing.
#[derive(Debug, Clone)]
pub struct ExamNeighbour {
    placement: ExamPlacement,
    conflicts: Vec<ExamId>,
    value: f64,
}

impl ExamNeighbour {
    pub fn new(
        model: &SolverModel,
        assignment: &ExamAssignment,
        placement: ExamPlacement,
    ) -> Self {
        let conflicts = assignment.conflicts(model, &placement);
        let value = model.move_delta(assignment, &placement, &conflicts);
        Self {
            placement,
            conflicts,
            value,
        }
    }

    #[inline]
    pub fn placement(&self) -> &ExamPlacement {
        &self.placement
    }

    #[inline]
    pub fn conflicts(&self) -> &[ExamId] {
        &self.conflicts
    }

    /// Predicted change of the weighted total value.
    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Applies the delta: evicts the conflicts, then installs the placement.
    pub fn assign(&self, model: &SolverModel, assignment: &mut ExamAssignment, iteration: u64) {
        for &exam in &self.conflicts {
            assignment.unassign(model, iteration, exam);
        }
        assignment.assign(model, iteration, self.placement.clone());
    }
}

impl std::fmt::Display for ExamNeighbour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (value {:+.2}, {} conflicts)",
            self.placement,
            self.value,
            self.conflicts.len()
        )
    }
}

/// Produces one candidate neighbour; pure with respect to the assignment.
pub trait NeighbourGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    fn generate(
        &self,
        model: &SolverModel,
        assignment: &ExamAssignment,
        rng: &mut ChaCha8Rng,
    ) -> Option<ExamNeighbour>;
}

/// Decides which neighbour to apply next; acceptance rules live here, the
/// solver applies whatever comes back. Mutable state goes into the
/// assignment's context arena, never into the selection itself.
pub trait NeighbourSelection: Send + Sync {
    fn name(&self) -> &'static str;

    fn select_neighbour(
        &self,
        model: &SolverModel,
        solution: &mut Solution,
        rng: &mut ChaCha8Rng,
    ) -> Option<ExamNeighbour>;
}

/// Registration table for move generators, keyed by the names used in the
/// `*.Neighbours` configuration values.
pub fn generator_by_name(name: &str) -> Option<Box<dyn NeighbourGenerator>> {
    match name.rsplit('.').next().unwrap_or(name) {
        "ExamRandomMove" => Some(Box::new(ExamRandomMove::default())),
        "ExamRoomMove" => Some(Box::new(ExamRoomMove::default())),
        "ExamTimeMove" => Some(Box::new(ExamTimeMove::default())),
        _ => None,
    }
}

/// Parses a semicolon-separated generator list from the configuration.
pub fn generators_from_config(
    config: &SolverConfig,
    key: &str,
) -> Result<Vec<Box<dyn NeighbourGenerator>>, ConfigError> {
    let raw = config.get_string(key, "ExamRandomMove;ExamRoomMove;ExamTimeMove");
    let mut generators = Vec::new();
    for name in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        match generator_by_name(name) {
            Some(generator) => generators.push(generator),
            None => {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: name.to_string(),
                });
            }
        }
    }
    if generators.is_empty() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        });
    }
    Ok(generators)
}

/// A randomized room set for `exam` in `period`: shuffles the open rooms and
/// packs until the exam fits. With `allow_occupied` the caller accepts the
/// evictions the occupancy conflicts imply.
pub(crate) fn random_rooms(
    model: &SolverModel,
    assignment: &ExamAssignment,
    exam: &Exam,
    period: PeriodId,
    allow_occupied: bool,
    rng: &mut ChaCha8Rng,
) -> Option<SmallVec<[RoomId; 4]>> {
    if exam.max_rooms() == 0 {
        return Some(SmallVec::new());
    }
    let mut options = model.problem().available_room_options(exam, period);
    if !allow_occupied {
        options.retain(|o| assignment.exams_in(period, o.room()).is_empty());
    }
    options.shuffle(rng);

    let mut rooms: SmallVec<[RoomId; 4]> = SmallVec::new();
    let mut seats = 0u32;
    for option in &options {
        if rooms.len() >= exam.max_rooms() {
            break;
        }
        rooms.push(option.room());
        seats += model.problem().room(option.room()).capacity(exam.alt_seating());
        if seats >= exam.size() {
            rooms.sort_unstable();
            return Some(rooms);
        }
    }
    None
}

/// A uniformly random allowed period of the exam.
pub(crate) fn random_period(exam: &Exam, rng: &mut ChaCha8Rng) -> Option<PeriodId> {
    if exam.periods().is_empty() {
        return None;
    }
    let pick = rng.random_range(0..exam.periods().len());
    Some(exam.periods()[pick].period())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_registry() {
        assert_eq!(
            generator_by_name("ExamRandomMove").unwrap().name(),
            "ExamRandomMove"
        );
        // Fully qualified names resolve by their last segment.
        assert_eq!(
            generator_by_name("examtt.neighbours.ExamTimeMove").unwrap().name(),
            "ExamTimeMove"
        );
        assert!(generator_by_name("NoSuchMove").is_none());
    }

    #[test]
    fn test_generators_from_config_default_and_custom() {
        let config = SolverConfig::new();
        let generators = generators_from_config(&config, "HillClimber.Neighbours").unwrap();
        assert_eq!(generators.len(), 3);

        let mut config = SolverConfig::new();
        config.set("HillClimber.Neighbours", "ExamRoomMove; ExamTimeMove");
        let generators = generators_from_config(&config, "HillClimber.Neighbours").unwrap();
        assert_eq!(generators.len(), 2);
        assert_eq!(generators[0].name(), "ExamRoomMove");

        config.set("HillClimber.Neighbours", "Bogus");
        assert!(generators_from_config(&config, "HillClimber.Neighbours").is_err());
    }
}
