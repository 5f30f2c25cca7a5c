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

/// Metropolis acceptance with geometric cooling: improving moves always
/// pass, deteriorating moves pass with probability `exp(-delta / T)`. The
/// temperature is multiplied by the cooling rate after every stretch of
/// iterations, and jumps back to the initial value when nothing improved for
/// the reheat length. Never reports "no candidate".
pub struct SimulatedAnnealing {
    component: ComponentId,
    generators: Vec<Box<dyn NeighbourGenerator>>,
    initial_temperature: f64,
    cooling_rate: f64,
    temperature_length: u64,
    reheat_length: u64,
    reheat: bool,
}

#[derive(Debug)]
struct AnnealingContext {
    iteration: u64,
    temperature: f64,
    last_cooling: u64,
    last_improvement: u64,
}

impl SimulatedAnnealing {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        let temperature_length = config.get_u64("SimulatedAnnealing.TemperatureLength", 25_000)?;
        Ok(Self {
            component: ComponentId::next(),
            generators: generators_from_config(config, "SimulatedAnnealing.Neighbours")?,
            initial_temperature: config.get_f64("SimulatedAnnealing.InitialTemperature", 1.5)?,
            cooling_rate: config.get_f64("SimulatedAnnealing.CoolingRate", 0.95)?,
            temperature_length,
            reheat_length: config
                .get_u64("SimulatedAnnealing.ReheatLength", 5 * temperature_length)?,
            reheat: config.get_bool("SimulatedAnnealing.Reheat", true)?,
        })
    }

    /// Current temperature under the given assignment, mainly for logging.
    pub fn temperature(&self, solution: &Solution) -> Option<f64> {
        solution
            .assignment()
            .contexts()
            .get::<AnnealingContext>(self.component)
            .map(|c| c.temperature)
    }
}

impl NeighbourSelection for SimulatedAnnealing {
    fn name(&self) -> &'static str {
        "SimulatedAnnealing"
    }

    fn select_neighbour(
        &self,
        model: &SolverModel,
        solution: &mut Solution,
        rng: &mut ChaCha8Rng,
    ) -> Option<ExamNeighbour> {
        // Bounded so the solver's termination check stays responsive even
        // when the neighbourhood is empty or everything gets rejected.
        for _ in 0..MAX_ATTEMPTS_PER_CALL {
            let temperature = {
                let initial = self.initial_temperature;
                let context = solution
                    .assignment_mut()
                    .contexts_mut()
                    .get_or_create::<AnnealingContext, _>(self.component, || AnnealingContext {
                        iteration: 0,
                        temperature: initial,
                        last_cooling: 0,
                        last_improvement: 0,
                    });
                context.iteration += 1;
                if context.iteration - context.last_cooling >= self.temperature_length {
                    context.temperature *= self.cooling_rate;
                    context.last_cooling = context.iteration;
                    tracing::debug!("temperature lowered to {:.4}", context.temperature);
                }
                if self.reheat && context.iteration - context.last_improvement > self.reheat_length
                {
                    context.temperature = self.initial_temperature;
                    context.last_improvement = context.iteration;
                    tracing::info!("reheat to {:.4}", context.temperature);
                }
                context.temperature
            };

            let pick = rng.random_range(0..self.generators.len());
            let Some(neighbour) =
                self.generators[pick].generate(model, solution.assignment(), rng)
            else {
                continue;
            };

            let delta = neighbour.value();
            let accept = delta <= 0.0
                || (temperature > 0.0 && rng.random::<f64>() < (-delta / temperature).exp());
            if !accept {
                continue;
            }
            if delta < 0.0 {
                let context = solution
                    .assignment_mut()
                    .contexts_mut()
                    .get_or_create::<AnnealingContext, _>(self.component, || unreachable!());
                context.last_improvement = context.iteration;
            }
            return Some(neighbour);
        }
        None
    }
}

const MAX_ATTEMPTS_PER_CALL: usize = 200;
