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

pub mod assignment;
pub mod config;
pub mod construction;
pub mod criteria;
pub mod err;
pub mod heuristics;
pub mod model;
pub mod neighbours;
pub mod parallel;
pub mod solution;
pub mod solver;
pub mod termination;

pub mod prelude {
    pub use crate::assignment::{AssignmentId, ComponentId, ContextArena, ExamAssignment};
    pub use crate::config::SolverConfig;
    pub use crate::criteria::Criterion;
    pub use crate::err::{ConfigError, ConsistencyError, SolverError};
    pub use crate::heuristics::selection::ExamNeighbourSelection;
    pub use crate::model::SolverModel;
    pub use crate::neighbours::{ExamNeighbour, NeighbourGenerator, NeighbourSelection};
    pub use crate::parallel::ParallelSolver;
    pub use crate::solution::{Solution, SolutionListener};
    pub use crate::solver::Solver;
    pub use crate::termination::{GeneralTerminationCondition, StopToken, TerminationCondition};
}
