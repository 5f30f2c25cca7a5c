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

use examtt_model::err::ModelLoadError;

/// Unknown or unparsable configuration; fatal at solver start.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    UnknownKey(String),
    InvalidValue { key: String, value: String },
    MalformedLine { line_nr: usize, line: String },
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "I/O error: {e}"),
            ConfigError::UnknownKey(key) => write!(f, "unknown configuration key '{key}'"),
            ConfigError::InvalidValue { key, value } => {
                write!(f, "invalid value '{value}' for configuration key '{key}'")
            }
            ConfigError::MalformedLine { line_nr, line } => {
                write!(f, "malformed configuration line {line_nr}: '{line}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// A criterion's cached running total disagrees with the value recomputed
/// from scratch; a criterion contract bug, fatal.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsistencyError {
    criterion: &'static str,
    cached: f64,
    recomputed: f64,
}

impl ConsistencyError {
    pub fn new(criterion: &'static str, cached: f64, recomputed: f64) -> Self {
        Self {
            criterion,
            cached,
            recomputed,
        }
    }

    pub fn criterion(&self) -> &'static str {
        self.criterion
    }

    pub fn cached(&self) -> f64 {
        self.cached
    }

    pub fn recomputed(&self) -> f64 {
        self.recomputed
    }
}

impl std::fmt::Display for ConsistencyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "criterion '{}' cached total {} differs from recomputed total {}",
            self.criterion, self.cached, self.recomputed
        )
    }
}

impl std::error::Error for ConsistencyError {}

/// Top-level solver failure surfaced to the CLI.
#[derive(Debug)]
pub enum SolverError {
    Config(ConfigError),
    Load(ModelLoadError),
    Inconsistent(ConsistencyError),
}

impl From<ConfigError> for SolverError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ModelLoadError> for SolverError {
    fn from(e: ModelLoadError) -> Self {
        Self::Load(e)
    }
}

impl From<ConsistencyError> for SolverError {
    fn from(e: ConsistencyError) -> Self {
        Self::Inconsistent(e)
    }
}

impl std::fmt::Display for SolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverError::Config(e) => write!(f, "configuration error: {e}"),
            SolverError::Load(e) => write!(f, "load error: {e}"),
            SolverError::Inconsistent(e) => write!(f, "internal invariant violation: {e}"),
        }
    }
}

impl std::error::Error for SolverError {}
