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

use crate::err::{ModelError, ModelLoadError};
use crate::model::{ExamModel, ExamPlacement, PlacementView};
use roxmltree::Document;
use std::collections::HashMap;

/// Anything that can render the current placements into a solution document.
pub trait SolutionWriter {
    fn save(&self, model: &ExamModel, assignment: &dyn PlacementView) -> String;
}

/// Writes the pretty-printed solution XML, one `<assignment>` per placed
/// exam, rooms space-separated in ascending id order (the canonical form the
/// round-trip property relies on).
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlSolutionWriter;

impl XmlSolutionWriter {
    #[inline]
    pub fn new() -> Self {
        Self
    }

    /// Reads a solution document back into placements, resolving the labels
    /// against `model`. Exams absent from the document stay unassigned.
    pub fn parse_solution(
        &self,
        model: &ExamModel,
        input: &str,
    ) -> Result<Vec<ExamPlacement>, ModelLoadError> {
        let doc = Document::parse(input)?;
        let root = doc.root_element();
        if root.tag_name().name() != "solution" {
            return Err(ModelLoadError::MissingElement("solution"));
        }

        let exams: HashMap<&str, usize> = (0..model.nr_exams())
            .map(|i| (model.exam_label(crate::common::ExamId::new(i)), i))
            .collect();
        let periods: HashMap<&str, usize> = (0..model.nr_periods())
            .map(|i| (model.period_label(crate::common::PeriodId::new(i)), i))
            .collect();
        let rooms: HashMap<&str, usize> = (0..model.nr_rooms())
            .map(|i| (model.room_label(crate::common::RoomId::new(i)), i))
            .collect();

        let mut out = Vec::new();
        for node in root.children().filter(|n| n.is_element()) {
            if node.tag_name().name() != "assignment" {
                continue;
            }
            let exam_label = node.attribute("exam").ok_or(ModelLoadError::MissingAttribute {
                element: "assignment",
                attribute: "exam",
            })?;
            let period_label = node.attribute("period").ok_or(ModelLoadError::MissingAttribute {
                element: "assignment",
                attribute: "period",
            })?;
            let exam = *exams
                .get(exam_label)
                .ok_or_else(|| ModelError::UnknownExam(exam_label.to_string()))?;
            let period = *periods
                .get(period_label)
                .ok_or_else(|| ModelError::UnknownPeriod(period_label.to_string()))?;
            let mut selected = Vec::new();
            for label in node.attribute("rooms").unwrap_or("").split_whitespace() {
                let room = *rooms
                    .get(label)
                    .ok_or_else(|| ModelError::UnknownRoom(label.to_string()))?;
                selected.push(crate::common::RoomId::new(room));
            }
            out.push(ExamPlacement::new(
                crate::common::ExamId::new(exam),
                crate::common::PeriodId::new(period),
                selected,
            ));
        }
        Ok(out)
    }
}

impl SolutionWriter for XmlSolutionWriter {
    fn save(&self, model: &ExamModel, assignment: &dyn PlacementView) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str(&format!("<solution name=\"{}\">\n", escape(model.name())));
        for exam in model.exams() {
            let Some(placement) = assignment.placement(exam.id()) else {
                continue;
            };
            let rooms = placement
                .rooms()
                .iter()
                .map(|r| escape(model.room_label(*r)))
                .collect::<Vec<_>>()
                .join(" ");
            out.push_str(&format!(
                "  <assignment exam=\"{}\" period=\"{}\" rooms=\"{}\"/>\n",
                escape(model.exam_label(exam.id())),
                escape(model.period_label(placement.period())),
                rooms
            ));
        }
        out.push_str("</solution>\n");
        out
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ExamId, PeriodId, RoomId};
    use crate::model::{PeriodOption, RoomOption};

    struct MapView(HashMap<ExamId, ExamPlacement>);

    impl PlacementView for MapView {
        fn placement(&self, exam: ExamId) -> Option<&ExamPlacement> {
            self.0.get(&exam)
        }

        fn nr_assigned_variables(&self) -> usize {
            self.0.len()
        }
    }

    fn model() -> ExamModel {
        let mut b = ExamModel::builder().with_name("w");
        let p = b.add_period(0, 480, 120, 0.0);
        b.set_period_label(p, "p1");
        let r1 = b.add_room("A", 100, 100, None);
        b.set_room_label(r1, "r1");
        let r2 = b.add_room("B", 100, 100, None);
        b.set_room_label(r2, "r2");
        let e = b.add_exam("X", 150, 120);
        b.set_exam_label(e, "x");
        b.exam_mut(e).add_period(PeriodOption::new(p, 0));
        b.exam_mut(e).add_room(RoomOption::new(r1, 0));
        b.exam_mut(e).add_room(RoomOption::new(r2, 0));
        let f = b.add_exam("Y", 0, 120);
        b.set_exam_label(f, "y");
        b.exam_mut(f).add_period(PeriodOption::new(p, 0));
        b.exam_mut(f).add_room(RoomOption::new(r1, 0));
        b.build().unwrap()
    }

    #[test]
    fn test_save_writes_sorted_rooms_and_skips_unassigned() {
        let m = model();
        let mut placements = HashMap::new();
        placements.insert(
            ExamId::new(0),
            ExamPlacement::new(
                ExamId::new(0),
                PeriodId::new(0),
                [RoomId::new(1), RoomId::new(0)],
            ),
        );
        let xml = XmlSolutionWriter::new().save(&m, &MapView(placements));
        assert!(xml.contains("<assignment exam=\"x\" period=\"p1\" rooms=\"r1 r2\"/>"));
        assert!(!xml.contains("exam=\"y\""));
    }

    #[test]
    fn test_save_then_parse_roundtrip() {
        let m = model();
        let original = ExamPlacement::new(
            ExamId::new(0),
            PeriodId::new(0),
            [RoomId::new(1), RoomId::new(0)],
        );
        let mut placements = HashMap::new();
        placements.insert(ExamId::new(0), original.clone());
        let writer = XmlSolutionWriter::new();
        let xml = writer.save(&m, &MapView(placements));
        let parsed = writer.parse_solution(&m, &xml).unwrap();
        assert_eq!(parsed, vec![original]);
    }

    #[test]
    fn test_parse_rejects_unknown_labels() {
        let m = model();
        let bad = r#"<solution><assignment exam="zz" period="p1" rooms="r1"/></solution>"#;
        assert!(XmlSolutionWriter::new().parse_solution(&m, bad).is_err());
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a&b<c>\"d'"), "a&amp;b&lt;c&gt;&quot;d&apos;");
    }
}
