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
use crate::err::{ModelError, ModelLoadError};
use crate::model::{DistributionType, ExamModel, ExamPlacement, PeriodOption, RoomOption};
use roxmltree::{Document, Node};
use std::collections::HashMap;
use std::path::Path;

/// A parsed instance: the immutable model plus any saved placements the file
/// carried (`<assignment>` children of `<exam>`, used to warm-start).
#[derive(Debug)]
pub struct LoadedProblem {
    pub model: ExamModel,
    pub assignments: Vec<ExamPlacement>,
}

/// Anything that can turn an instance file into a problem.
pub trait ProblemLoader {
    fn load(&self, input: &str) -> Result<LoadedProblem, ModelLoadError>;
}

/// Reads the XML instance format: an `<examtt>` root with `<periods>`,
/// `<rooms>`, `<exams>`, `<students>`, `<instructors>` and `<constraints>`
/// sections. Entity ids in the file are arbitrary strings; they are mapped to
/// dense indices and kept as labels for the solution writer.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlProblemLoader;

impl XmlProblemLoader {
    #[inline]
    pub fn new() -> Self {
        Self
    }

    pub fn from_path(&self, path: impl AsRef<Path>) -> Result<LoadedProblem, ModelLoadError> {
        let text = std::fs::read_to_string(path)?;
        self.load(&text)
    }
}

impl ProblemLoader for XmlProblemLoader {
    fn load(&self, input: &str) -> Result<LoadedProblem, ModelLoadError> {
        let doc = Document::parse(input)?;
        let root = doc.root_element();
        if root.tag_name().name() != "examtt" {
            return Err(ModelLoadError::MissingElement("examtt"));
        }

        let mut builder =
            ExamModel::builder().with_name(root.attribute("name").unwrap_or("exam").to_string());

        let mut periods: HashMap<String, PeriodId> = HashMap::new();
        let mut rooms: HashMap<String, RoomId> = HashMap::new();
        let mut exams: HashMap<String, ExamId> = HashMap::new();

        // Periods
        for node in elements(section(&root, "periods")?) {
            expect_tag(&node, "period")?;
            let label = req_attr(&node, "period", "id")?;
            let day: u32 = parse_attr(&node, "period", "day")?;
            let time: u32 = parse_attr(&node, "period", "time")?;
            let duration: u32 = parse_attr(&node, "period", "length")?;
            let weight: f64 = parse_attr_or(&node, "period", "weight", 0.0)?;
            let id = builder.add_period(day, time, duration, weight);
            builder.set_period_label(id, label);
            if periods.insert(label.to_string(), id).is_some() {
                return Err(ModelError::DuplicateEntity {
                    kind: "period",
                    id: label.to_string(),
                }
                .into());
            }
        }

        // Rooms, first pass: declarations.
        let rooms_section = section(&root, "rooms")?;
        for node in elements(rooms_section) {
            expect_tag(&node, "room")?;
            let label = req_attr(&node, "room", "id")?;
            let size: u32 = parse_attr(&node, "room", "size")?;
            let alt_size: u32 = parse_attr_or(&node, "room", "alt", size)?;
            let coordinates = match node.attribute("coordinates") {
                Some(raw) => Some(parse_coordinates(raw).ok_or_else(|| {
                    ModelLoadError::InvalidAttribute {
                        element: "room",
                        attribute: "coordinates",
                        value: raw.to_string(),
                    }
                })?),
                None => None,
            };
            let name = node.attribute("name").unwrap_or(label);
            let id = builder.add_room(name, size, alt_size, coordinates);
            builder.set_room_label(id, label);
            if rooms.insert(label.to_string(), id).is_some() {
                return Err(ModelError::DuplicateEntity {
                    kind: "room",
                    id: label.to_string(),
                }
                .into());
            }
        }

        // Rooms, second pass: availability and travel times (may reference
        // rooms declared later in the file).
        for node in elements(rooms_section) {
            let label = req_attr(&node, "room", "id")?;
            let id = rooms[label];
            for child in elements(node) {
                match child.tag_name().name() {
                    "unavailable" => {
                        let period = lookup_period(&periods, req_attr(&child, "unavailable", "period")?)?;
                        builder.set_room_unavailable(id, period);
                    }
                    "travel" => {
                        let other = lookup_room(&rooms, req_attr(&child, "travel", "room")?)?;
                        let distance: f64 = parse_attr(&child, "travel", "distance")?;
                        builder.set_room_distance(id, other, distance);
                    }
                    _ => {}
                }
            }
        }

        // Exams.
        let exams_section = section(&root, "exams")?;
        let mut saved: Vec<(ExamId, Node)> = Vec::new();
        let mut explicit_size: Vec<bool> = Vec::new();
        for node in elements(exams_section) {
            expect_tag(&node, "exam")?;
            let label = req_attr(&node, "exam", "id")?;
            let duration: u32 = parse_attr(&node, "exam", "length")?;
            let size: u32 = parse_attr_or(&node, "exam", "size", 0)?;
            explicit_size.push(node.attribute("size").is_some());
            let name = node.attribute("name").unwrap_or(label);
            let id = builder.add_exam(name, size, duration);
            builder.set_exam_label(id, label);
            if exams.insert(label.to_string(), id).is_some() {
                return Err(ModelError::DuplicateEntity {
                    kind: "exam",
                    id: label.to_string(),
                }
                .into());
            }
            {
                let exam = builder.exam_mut(id);
                exam.set_alt_seating(bool_attr(&node, "alt", false));
                if let Some(raw) = node.attribute("maxRooms") {
                    exam.set_max_rooms(raw.parse().map_err(|_| {
                        ModelLoadError::InvalidAttribute {
                            element: "exam",
                            attribute: "maxRooms",
                            value: raw.to_string(),
                        }
                    })?);
                }
                if let Some(raw) = node.attribute("average") {
                    exam.set_average_period(Some(raw.parse().map_err(|_| {
                        ModelLoadError::InvalidAttribute {
                            element: "exam",
                            attribute: "average",
                            value: raw.to_string(),
                        }
                    })?));
                }
            }
            for child in elements(node) {
                match child.tag_name().name() {
                    "period" => {
                        let period = lookup_period(&periods, req_attr(&child, "period", "id")?)?;
                        let penalty: i32 = parse_attr_or(&child, "period", "penalty", 0)?;
                        builder.exam_mut(id).add_period(PeriodOption::new(period, penalty));
                    }
                    "room" => {
                        let room = lookup_room(&rooms, req_attr(&child, "room", "id")?)?;
                        let penalty: i32 = parse_attr_or(&child, "room", "penalty", 0)?;
                        builder.exam_mut(id).add_room(RoomOption::new(room, penalty));
                    }
                    "assignment" | "initial" => saved.push((id, child)),
                    _ => {}
                }
            }
        }

        // Saved placements, after the full id space is known.
        let mut assignments = Vec::new();
        for (exam, node) in saved {
            let period = lookup_period(&periods, req_attr(&node, "assignment", "period")?)?;
            let mut selected = Vec::new();
            for label in req_attr(&node, "assignment", "rooms")?.split_whitespace() {
                selected.push(lookup_room(&rooms, label)?);
            }
            let placement = ExamPlacement::new(exam, period, selected);
            if node.tag_name().name() == "initial" {
                builder.exam_mut(exam).set_initial(Some(placement));
            } else {
                assignments.push(placement);
            }
        }

        // Students.
        if let Ok(students_section) = section(&root, "students") {
            for node in elements(students_section) {
                expect_tag(&node, "student")?;
                let student = builder.add_student();
                for child in elements(node) {
                    match child.tag_name().name() {
                        "exam" => {
                            let exam = lookup_exam(&exams, req_attr(&child, "exam", "id")?)?;
                            builder.enroll(student, exam);
                        }
                        "unavailable" => {
                            let period =
                                lookup_period(&periods, req_attr(&child, "unavailable", "period")?)?;
                            builder.set_student_unavailable(student, period);
                        }
                        _ => {}
                    }
                }
            }
        }

        // Instructors.
        if let Ok(instructors_section) = section(&root, "instructors") {
            for node in elements(instructors_section) {
                expect_tag(&node, "instructor")?;
                let instructor = builder.add_instructor();
                for child in elements(node) {
                    match child.tag_name().name() {
                        "exam" => {
                            let exam = lookup_exam(&exams, req_attr(&child, "exam", "id")?)?;
                            builder.assign_instructor(instructor, exam);
                        }
                        "unavailable" => {
                            let period =
                                lookup_period(&periods, req_attr(&child, "unavailable", "period")?)?;
                            builder.set_instructor_unavailable(instructor, period);
                        }
                        _ => {}
                    }
                }
            }
        }

        // Distribution constraints.
        if let Ok(constraints_section) = section(&root, "constraints") {
            for node in elements(constraints_section) {
                expect_tag(&node, "constraint")?;
                let raw_type = req_attr(&node, "constraint", "type")?;
                let dtype = DistributionType::parse(raw_type).ok_or_else(|| {
                    ModelLoadError::InvalidAttribute {
                        element: "constraint",
                        attribute: "type",
                        value: raw_type.to_string(),
                    }
                })?;
                let hard = bool_attr(&node, "hard", true);
                let weight: f64 = parse_attr_or(&node, "constraint", "weight", 0.0)?;
                let mut members = Vec::new();
                for child in elements(node) {
                    if child.tag_name().name() == "exam" {
                        members.push(lookup_exam(&exams, req_attr(&child, "exam", "id")?)?);
                    }
                }
                builder.add_constraint(dtype, hard, weight, members)?;
            }
        }

        // Exams without an explicit size take the number of enrolled students.
        let derived: Vec<(ExamId, u32)> = exams
            .values()
            .filter(|id| !explicit_size[id.get()])
            .map(|id| {
                let n = builder.exam_mut(*id).students().len() as u32;
                (*id, n)
            })
            .collect();
        for (id, n) in derived {
            builder.exam_mut(id).set_size(n);
        }

        let model = builder.build()?;
        tracing::debug!(
            "loaded instance '{}': {} exams, {} periods, {} rooms, {} students",
            model.name(),
            model.nr_exams(),
            model.nr_periods(),
            model.nr_rooms(),
            model.students().len()
        );
        Ok(LoadedProblem { model, assignments })
    }
}

fn section<'a, 'input>(
    root: &Node<'a, 'input>,
    name: &'static str,
) -> Result<Node<'a, 'input>, ModelLoadError> {
    root.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
        .ok_or(ModelLoadError::MissingElement(name))
}

fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

fn expect_tag(node: &Node, name: &'static str) -> Result<(), ModelLoadError> {
    if node.tag_name().name() == name {
        Ok(())
    } else {
        Err(ModelLoadError::MissingElement(name))
    }
}

fn req_attr<'a>(
    node: &Node<'a, '_>,
    element: &'static str,
    attribute: &'static str,
) -> Result<&'a str, ModelLoadError> {
    node.attribute(attribute)
        .ok_or(ModelLoadError::MissingAttribute { element, attribute })
}

fn parse_attr<T: std::str::FromStr>(
    node: &Node,
    element: &'static str,
    attribute: &'static str,
) -> Result<T, ModelLoadError> {
    let raw = req_attr(node, element, attribute)?;
    raw.parse().map_err(|_| ModelLoadError::InvalidAttribute {
        element,
        attribute,
        value: raw.to_string(),
    })
}

fn parse_attr_or<T: std::str::FromStr>(
    node: &Node,
    element: &'static str,
    attribute: &'static str,
    default: T,
) -> Result<T, ModelLoadError> {
    match node.attribute(attribute) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ModelLoadError::InvalidAttribute {
            element,
            attribute,
            value: raw.to_string(),
        }),
    }
}

fn bool_attr(node: &Node, attribute: &str, default: bool) -> bool {
    match node.attribute(attribute) {
        Some("true") => true,
        Some("false") => false,
        _ => default,
    }
}

fn parse_coordinates(raw: &str) -> Option<(f64, f64)> {
    let (x, y) = raw.split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

fn lookup_period(map: &HashMap<String, PeriodId>, label: &str) -> Result<PeriodId, ModelLoadError> {
    map.get(label)
        .copied()
        .ok_or_else(|| ModelError::UnknownPeriod(label.to_string()).into())
}

fn lookup_room(map: &HashMap<String, RoomId>, label: &str) -> Result<RoomId, ModelLoadError> {
    map.get(label)
        .copied()
        .ok_or_else(|| ModelError::UnknownRoom(label.to_string()).into())
}

fn lookup_exam(map: &HashMap<String, ExamId>, label: &str) -> Result<ExamId, ModelLoadError> {
    map.get(label)
        .copied()
        .ok_or_else(|| ModelError::UnknownExam(label.to_string()).into())
}
