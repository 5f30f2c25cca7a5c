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

/// Great-deluge acceptance: any move landing at or under the water level
/// passes. The level starts above the current total, sinks by a
/// multiplicative step every iteration, and is lifted back above the best
/// total once it has sunk below it (the stagnation reset). Never reports
/// "no candidate".
pub struct GreatDeluge {
    component: ComponentId,
    generators: Vec<Box<dyn NeighbourGenerator>>,
    upper_bound_rate: f64,
    lower_bound_rate: f64,
    cool_rate: f64,
}

#[derive(Debug)]
struct DelugeContext {
    bound: f64,
}

impl GreatDeluge {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            component: ComponentId::next(),
            generators: generators_from_config(config, "GreatDeluge.Neighbours")?,
            upper_bound_rate: config.get_f64("GreatDeluge.UpperBoundRate", 1.05)?,
            lower_bound_rate: config.get_f64("GreatDeluge.LowerBoundRate", 0.97)?,
            cool_rate: config.get_f64("GreatDeluge.CoolRate", 0.999_999_5)?,
        })
    }

    /// The current water level under the given assignment, for logging.
    pub fn bound(&self, solution: &Solution) -> Option<f64> {
        solution
            .assignment()
            .contexts()
            .get::<DelugeContext>(self.component)
            .map(|c| c.bound)
    }
}

impl NeighbourSelection for GreatDeluge {
    fn name(&self) -> &'static str {
        "GreatDeluge"
    }

    fn select_neighbour(
        &self,
        model: &SolverModel,
        solution: &mut Solution,
        rng: &mut ChaCha8Rng,
    ) -> Option<ExamNeighbour> {
        // Bounded so the solver's termination check stays responsive even
        // when the neighbourhood is empty or everything stays above the
        // water level.
        for _ in 0..MAX_ATTEMPTS_PER_CALL {
            let total = model.total_value(solution.assignment());
            let best = solution.best_total_value().unwrap_or(total);
            let bound = {
                let upper = self.upper_bound_rate * total.max(1.0);
                let context = solution
                    .assignment_mut()
                    .contexts_mut()
                    .get_or_create::<DelugeContext, _>(self.component, || DelugeContext {
                        bound: upper,
                    });
                context.bound *= self.cool_rate;
                if context.bound < self.lower_bound_rate * best.max(1.0) {
                    context.bound = self.upper_bound_rate * best.max(1.0);
                    tracing::debug!("water level reset to {:.2}", context.bound);
                }
                context.bound
            };

            let pick = rng.random_range(0..self.generators.len());
            let Some(neighbour) =
                self.generators[pick].generate(model, solution.assignment(), rng)
            else {
                continue;
            };
            if neighbour.value() <= 0.0 || total + neighbour.value() <= bound {
                return Some(neighbour);
            }
        }
        None
    }
}

const MAX_ATTEMPTS_PER_CALL: usize = 200;
