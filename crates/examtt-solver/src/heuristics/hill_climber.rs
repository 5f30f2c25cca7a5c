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

use crate::assignment::ComponentId;
use crate::config::SolverConfig;
use crate::err::ConfigError;
use crate::model::SolverModel;
use crate::neighbours::{
    ExamNeighbour, NeighbourGenerator, NeighbourSelection, generators_from_config,
};
use crate::solution::Solution;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Accepts only non-deteriorating moves sampled uniformly from its generator
/// union; returns "no candidate" after the configured number of iterations
/// without strict improvement.
pub struct HillClimber {
    component: ComponentId,
    name: &'static str,
    max_idle: u64,
    generators: Vec<Box<dyn NeighbourGenerator>>,
}

#[derive(Debug, Default)]
struct HillClimberContext {
    iteration: u64,
    last_improvement: u64,
}

impl HillClimber {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Self::with_name(config, "HillClimber")
    }

    /// The finalization sweep is a second instance under its own name (and
    /// its own context).
    pub fn with_name(config: &SolverConfig, name: &'static str) -> Result<Self, ConfigError> {
        Ok(Self {
            component: ComponentId::next(),
            name,
            max_idle: config.get_u64("HillClimber.MaxIdle", 25_000)?,
            generators: generators_from_config(config, "HillClimber.Neighbours")?,
        })
    }
}

impl NeighbourSelection for HillClimber {
    fn name(&self) -> &'static str {
        self.name
    }

    fn select_neighbour(
        &self,
        model: &SolverModel,
        solution: &mut Solution,
        rng: &mut ChaCha8Rng,
    ) -> Option<ExamNeighbour> {
        loop {
            let idle_exceeded = {
                let context = solution
                    .assignment_mut()
                    .contexts_mut()
                    .get_or_create::<HillClimberContext, _>(self.component, Default::default);
                context.iteration += 1;
                context.iteration - context.last_improvement > self.max_idle
            };
            if idle_exceeded {
                tracing::info!("{}: idle limit reached", self.name);
                return None;
            }

            let pick = rng.random_range(0..self.generators.len());
            let Some(neighbour) =
                self.generators[pick].generate(model, solution.assignment(), rng)
            else {
                continue;
            };
            if neighbour.value() > 0.0 {
                continue;
            }
            if neighbour.value() < 0.0 {
                let context = solution
                    .assignment_mut()
                    .contexts_mut()
                    .get_or_create::<HillClimberContext, _>(self.component, Default::default);
                context.last_improvement = context.iteration;
            }
            return Some(neighbour);
        }
    }
}
