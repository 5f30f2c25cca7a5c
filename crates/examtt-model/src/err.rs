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

use crate::common::{ExamId, PeriodId, RoomId};

/// Why a placement is not hard-feasible for its exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementError {
    PeriodNotAllowed { exam: ExamId, period: PeriodId },
    RoomNotAllowed { exam: ExamId, room: RoomId },
    RoomNotAvailable { room: RoomId, period: PeriodId },
    InsufficientSeating { exam: ExamId, seats: u32, size: u32 },
    TooManyRooms { exam: ExamId, rooms: usize, max_rooms: usize },
    NoRooms { exam: ExamId },
    DuplicateRoom { room: RoomId },
}

impl std::fmt::Display for PlacementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlacementError::PeriodNotAllowed { exam, period } => {
                write!(f, "{period} is not an allowed period of {exam}")
            }
            PlacementError::RoomNotAllowed { exam, room } => {
                write!(f, "{room} is not an allowed room of {exam}")
            }
            PlacementError::RoomNotAvailable { room, period } => {
                write!(f, "{room} is not available in {period}")
            }
            PlacementError::InsufficientSeating { exam, seats, size } => {
                write!(f, "{exam} needs {size} seats but the room set offers {seats}")
            }
            PlacementError::TooManyRooms { exam, rooms, max_rooms } => {
                write!(f, "{exam} allows at most {max_rooms} rooms, placement uses {rooms}")
            }
            PlacementError::NoRooms { exam } => {
                write!(f, "placement of {exam} selects no room")
            }
            PlacementError::DuplicateRoom { room } => {
                write!(f, "placement selects {room} twice")
            }
        }
    }
}

impl std::error::Error for PlacementError {}

/// Broken entity invariants detected while assembling a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    UnknownExam(String),
    UnknownPeriod(String),
    UnknownRoom(String),
    DuplicateEntity { kind: &'static str, id: String },
    EmptyDomain(ExamId),
    NoPeriods,
    NoRooms,
    ConstraintTooSmall(String),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::UnknownExam(id) => write!(f, "reference to unknown exam '{id}'"),
            ModelError::UnknownPeriod(id) => write!(f, "reference to unknown period '{id}'"),
            ModelError::UnknownRoom(id) => write!(f, "reference to unknown room '{id}'"),
            ModelError::DuplicateEntity { kind, id } => {
                write!(f, "duplicate {kind} '{id}'")
            }
            ModelError::EmptyDomain(exam) => {
                write!(f, "{exam} has no feasible (period, rooms) placement at all")
            }
            ModelError::NoPeriods => write!(f, "the instance declares no examination periods"),
            ModelError::NoRooms => write!(f, "the instance declares no rooms"),
            ModelError::ConstraintTooSmall(id) => {
                write!(f, "distribution constraint '{id}' references fewer than two exams")
            }
        }
    }
}

impl std::error::Error for ModelError {}

/// Fatal problems while reading an instance file.
#[derive(Debug)]
pub enum ModelLoadError {
    Io(std::io::Error),
    Xml(roxmltree::Error),
    MissingElement(&'static str),
    MissingAttribute { element: &'static str, attribute: &'static str },
    InvalidAttribute { element: &'static str, attribute: &'static str, value: String },
    Model(ModelError),
}

impl From<std::io::Error> for ModelLoadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<roxmltree::Error> for ModelLoadError {
    fn from(e: roxmltree::Error) -> Self {
        Self::Xml(e)
    }
}

impl From<ModelError> for ModelLoadError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

impl std::fmt::Display for ModelLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ModelLoadError::*;
        match self {
            Io(e) => write!(f, "I/O error: {e}"),
            Xml(e) => write!(f, "malformed XML: {e}"),
            MissingElement(name) => write!(f, "missing <{name}> element"),
            MissingAttribute { element, attribute } => {
                write!(f, "<{element}> is missing the '{attribute}' attribute")
            }
            InvalidAttribute { element, attribute, value } => {
                write!(f, "<{element}> has invalid {attribute}='{value}'")
            }
            Model(e) => write!(f, "broken entity invariant: {e}"),
        }
    }
}

impl std::error::Error for ModelLoadError {}
