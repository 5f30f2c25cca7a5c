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

use crate::err::ConfigError;
use std::collections::HashMap;
use std::path::Path;

/// Every key the solver understands. Validation rejects anything else, which
/// keeps typos from silently running with defaults.
pub const RECOGNIZED_KEYS: &[&str] = &[
    "Termination.StopWhenComplete",
    "Termination.MaxIters",
    "Termination.TimeOut",
    "General.Input",
    "General.OutputFile",
    "General.Output",
    "General.Config",
    "General.Seed",
    "General.SaveBestUnassigned",
    "General.Reports",
    "General.MPP",
    "General.SoftPeriods",
    "General.SoftRooms",
    "General.SoftDistributions",
    "Parallel.NrSolvers",
    "Neighbour.Class",
    "Exam.ColoringConstruction",
    "Exam.GreatDeluge",
    "Construction.MaxAttempts",
    "TabuSearch.Tenure",
    "TabuSearch.CbsWeight",
    "TabuSearch.MaxIdle",
    "HillClimber.Neighbours",
    "HillClimber.MaxIdle",
    "SimulatedAnnealing.Neighbours",
    "SimulatedAnnealing.InitialTemperature",
    "SimulatedAnnealing.CoolingRate",
    "SimulatedAnnealing.TemperatureLength",
    "SimulatedAnnealing.ReheatLength",
    "SimulatedAnnealing.Reheat",
    "GreatDeluge.Neighbours",
    "GreatDeluge.UpperBoundRate",
    "GreatDeluge.LowerBoundRate",
    "GreatDeluge.CoolRate",
    "Exams.DirectConflictWeight",
    "Exams.NotAvailableWeight",
    "Exams.BackToBackConflictWeight",
    "Exams.DistanceBackToBackConflictWeight",
    "Exams.MoreThanTwoADayWeight",
    "Exams.InstructorDirectConflictWeight",
    "Exams.InstructorNotAvailableWeight",
    "Exams.InstructorBackToBackConflictWeight",
    "Exams.InstructorDistanceBackToBackConflictWeight",
    "Exams.InstructorMoreThanTwoADayWeight",
    "Exams.BackToBackDistance",
    "Exams.IsDayBreakBackToBack",
    "Exams.PeriodWeight",
    "Exams.PeriodIndexWeight",
    "Exams.PeriodSizeWeight",
    "Exams.RoomWeight",
    "Exams.RoomSizeWeight",
    "Exams.RoomSplitWeight",
    "Exams.RoomSplitDistanceWeight",
    "Exams.DistributionWeight",
    "Exams.ExamRotationWeight",
    "Exams.LargeSize",
    "Exams.LargePeriod",
    "Exams.LargeWeight",
    "Exams.PerturbationWeight",
    "Exams.RoomPerturbationWeight",
    "Exams.SoftPeriodLimit",
    "Exams.SoftRoomLimit",
    "Exams.PeriodViolationWeight",
    "Exams.RoomViolationWeight",
    "Exams.DistributionViolationWeight",
];

/// A flat key/value configuration bag in `key = value` properties form.
/// Lookups are typed; a present-but-unparsable value is a [`ConfigError`].
#[derive(Debug, Clone, Default)]
pub struct SolverConfig {
    values: HashMap<String, String>,
}

impl SolverConfig {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::new();
        for (nr, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::MalformedLine {
                    line_nr: nr + 1,
                    line: line.to_string(),
                });
            };
            config.set(key.trim(), value.trim());
        }
        Ok(config)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some("true") => Ok(true),
            Some("false") => Ok(false),
            Some(other) => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: other.to_string(),
            }),
        }
    }

    pub fn get_i64(&self, key: &str, default: i64) -> Result<i64, ConfigError> {
        self.parse_with(key, default)
    }

    pub fn get_u64(&self, key: &str, default: u64) -> Result<u64, ConfigError> {
        self.parse_with(key, default)
    }

    pub fn get_usize(&self, key: &str, default: usize) -> Result<usize, ConfigError> {
        self.parse_with(key, default)
    }

    pub fn get_f64(&self, key: &str, default: f64) -> Result<f64, ConfigError> {
        self.parse_with(key, default)
    }

    fn parse_with<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.to_string(),
            }),
        }
    }

    /// Rejects unknown keys. Value validity is checked by the typed getters
    /// at the point of use, which all run during solver construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for key in self.values.keys() {
            if !RECOGNIZED_KEYS.contains(&key.as_str()) {
                return Err(ConfigError::UnknownKey(key.clone()));
            }
        }
        if let Some(class) = self.get("Neighbour.Class") {
            if !class.ends_with("ExamNeighbourSelection") {
                return Err(ConfigError::InvalidValue {
                    key: "Neighbour.Class".to_string(),
                    value: class.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
