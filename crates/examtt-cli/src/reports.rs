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

//! The CSV report pack written next to the solution file when
//! `General.Reports` is on.

use examtt_model::common::RoomId;
use examtt_model::model::ExamModel;
use examtt_solver::assignment::ExamAssignment;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

/// A simple CSV table: a header and string rows, escaped on save.
#[derive(Debug, Default)]
pub struct CsvTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn new(header: &[&str]) -> Self {
        Self {
            header: header.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn nr_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.header.join(","));
        out.push('\n');
        for row in &self.rows {
            let escaped: Vec<String> = row.iter().map(|cell| escape_cell(cell)).collect();
            out.push_str(&escaped.join(","));
            out.push('\n');
        }
        out
    }

    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let mut file = std::fs::File::create(path)?;
        file.write_all(self.render().as_bytes())
    }
}

fn escape_cell(cell: &str) -> String {
    if cell.contains(',') || cell.contains('"') || cell.contains('\n') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// One report over the final assignment.
pub trait Report {
    fn name(&self) -> &'static str;

    /// File suffix, e.g. `schdex` for `<output>.schdex.csv`.
    fn suffix(&self) -> &'static str;

    fn report(&self, model: &ExamModel, assignment: &ExamAssignment) -> CsvTable;
}

/// Every report in the pack, in the order they are written.
pub fn all_reports() -> Vec<Box<dyn Report>> {
    vec![
        Box::new(ExamAssignmentsReport),
        Box::new(StudentConflictsReport),
        Box::new(StudentConflictsPerExamReport),
        Box::new(InstructorConflictsReport),
        Box::new(PeriodUsageReport),
        Box::new(RoomScheduleReport),
        Box::new(RoomSplitReport),
        Box::new(MeetingsPerDayReport),
    ]
}

fn rooms_label(model: &ExamModel, rooms: &[RoomId]) -> String {
    rooms
        .iter()
        .map(|r| model.room_label(*r))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Per-exam schedule: period, time and rooms of every placed exam.
pub struct ExamAssignmentsReport;

impl Report for ExamAssignmentsReport {
    fn name(&self) -> &'static str {
        "ExamAssignments"
    }

    fn suffix(&self) -> &'static str {
        "schdex"
    }

    fn report(&self, model: &ExamModel, assignment: &ExamAssignment) -> CsvTable {
        let mut table = CsvTable::new(&["Exam", "Enrl", "Period", "Day", "Time", "Rooms"]);
        for exam in model.exams() {
            let Some(placement) = assignment.placement(exam.id()) else {
                continue;
            };
            let period = model.period(placement.period());
            table.add_row(vec![
                model.exam_label(exam.id()).to_string(),
                exam.size().to_string(),
                model.period_label(placement.period()).to_string(),
                period.day().to_string(),
                period.time().to_string(),
                rooms_label(model, placement.rooms()),
            ]);
        }
        table
    }
}

/// Direct, back-to-back and more-than-two-a-day conflicts per student.
pub struct StudentConflictsReport;

impl Report for StudentConflictsReport {
    fn name(&self) -> &'static str {
        "StudentConflicts"
    }

    fn suffix(&self) -> &'static str {
        "sconf"
    }

    fn report(&self, model: &ExamModel, assignment: &ExamAssignment) -> CsvTable {
        let mut table = CsvTable::new(&["Student", "Type", "Exam 1", "Exam 2"]);
        for student in model.students() {
            let placed: Vec<_> = student
                .exams()
                .iter()
                .filter_map(|&e| assignment.placement(e))
                .collect();
            for (i, a) in placed.iter().enumerate() {
                for b in placed.iter().skip(i + 1) {
                    let kind = if a.period() == b.period() {
                        Some("direct")
                    } else if model.are_back_to_back(a.period(), b.period(), false) {
                        Some("back-to-back")
                    } else {
                        None
                    };
                    if let Some(kind) = kind {
                        table.add_row(vec![
                            student.id().get().to_string(),
                            kind.to_string(),
                            model.exam_label(a.exam()).to_string(),
                            model.exam_label(b.exam()).to_string(),
                        ]);
                    }
                }
            }
            let mut per_day: HashMap<u32, usize> = HashMap::new();
            for p in &placed {
                *per_day.entry(model.day_of(p.period())).or_default() += 1;
            }
            for (day, n) in per_day {
                if n > 2 {
                    table.add_row(vec![
                        student.id().get().to_string(),
                        "more-than-2-a-day".to_string(),
                        format!("day {day}"),
                        format!("{n} exams"),
                    ]);
                }
            }
        }
        table
    }
}

/// Conflict counts aggregated per exam.
pub struct StudentConflictsPerExamReport;

impl Report for StudentConflictsPerExamReport {
    fn name(&self) -> &'static str {
        "StudentConflictsPerExam"
    }

    fn suffix(&self) -> &'static str {
        "sconfex"
    }

    fn report(&self, model: &ExamModel, assignment: &ExamAssignment) -> CsvTable {
        let mut table = CsvTable::new(&["Exam", "Enrl", "Direct", "Back-To-Back"]);
        for exam in model.exams() {
            let Some(placement) = assignment.placement(exam.id()) else {
                continue;
            };
            let mut direct = 0usize;
            let mut btb = 0usize;
            for &sid in exam.students() {
                for &other in model.student(sid).exams() {
                    if other == exam.id() {
                        continue;
                    }
                    let Some(q) = assignment.placement(other) else {
                        continue;
                    };
                    if q.period() == placement.period() {
                        direct += 1;
                    } else if model.are_back_to_back(placement.period(), q.period(), false) {
                        btb += 1;
                    }
                }
            }
            if direct + btb > 0 {
                table.add_row(vec![
                    model.exam_label(exam.id()).to_string(),
                    exam.size().to_string(),
                    direct.to_string(),
                    btb.to_string(),
                ]);
            }
        }
        table
    }
}

/// Direct and back-to-back conflicts per instructor.
pub struct InstructorConflictsReport;

impl Report for InstructorConflictsReport {
    fn name(&self) -> &'static str {
        "InstructorConflicts"
    }

    fn suffix(&self) -> &'static str {
        "iconf"
    }

    fn report(&self, model: &ExamModel, assignment: &ExamAssignment) -> CsvTable {
        let mut table = CsvTable::new(&["Instructor", "Type", "Exam 1", "Exam 2"]);
        for instructor in model.instructors() {
            let placed: Vec<_> = instructor
                .exams()
                .iter()
                .filter_map(|&e| assignment.placement(e))
                .collect();
            for (i, a) in placed.iter().enumerate() {
                for b in placed.iter().skip(i + 1) {
                    let kind = if a.period() == b.period() {
                        Some("direct")
                    } else if model.are_back_to_back(a.period(), b.period(), false) {
                        Some("back-to-back")
                    } else {
                        None
                    };
                    if let Some(kind) = kind {
                        table.add_row(vec![
                            instructor.id().get().to_string(),
                            kind.to_string(),
                            model.exam_label(a.exam()).to_string(),
                            model.exam_label(b.exam()).to_string(),
                        ]);
                    }
                }
            }
        }
        table
    }
}

/// Exams and seated students per period.
pub struct PeriodUsageReport;

impl Report for PeriodUsageReport {
    fn name(&self) -> &'static str {
        "PeriodUsage"
    }

    fn suffix(&self) -> &'static str {
        "per"
    }

    fn report(&self, model: &ExamModel, assignment: &ExamAssignment) -> CsvTable {
        let mut table = CsvTable::new(&["Period", "Day", "Time", "Exams", "Students"]);
        for period in model.periods() {
            let mut exams = 0usize;
            let mut students = 0u32;
            for exam in model.exams() {
                if let Some(p) = assignment.placement(exam.id()) {
                    if p.period() == period.id() {
                        exams += 1;
                        students += exam.size();
                    }
                }
            }
            table.add_row(vec![
                model.period_label(period.id()).to_string(),
                period.day().to_string(),
                period.time().to_string(),
                exams.to_string(),
                students.to_string(),
            ]);
        }
        table
    }
}

/// Which exam sits in which room, period by period.
pub struct RoomScheduleReport;

impl Report for RoomScheduleReport {
    fn name(&self) -> &'static str {
        "RoomSchedule"
    }

    fn suffix(&self) -> &'static str {
        "schdr"
    }

    fn report(&self, model: &ExamModel, assignment: &ExamAssignment) -> CsvTable {
        let mut table = CsvTable::new(&["Room", "Period", "Exam", "Enrl"]);
        for room in model.rooms() {
            for period in model.periods() {
                for &exam in assignment.exams_in(period.id(), room.id()) {
                    table.add_row(vec![
                        model.room_label(room.id()).to_string(),
                        model.period_label(period.id()).to_string(),
                        model.exam_label(exam).to_string(),
                        model.exam(exam).size().to_string(),
                    ]);
                }
            }
        }
        table
    }
}

/// Exams split over more than one room, with the split distance.
pub struct RoomSplitReport;

impl Report for RoomSplitReport {
    fn name(&self) -> &'static str {
        "RoomSplit"
    }

    fn suffix(&self) -> &'static str {
        "rsplit"
    }

    fn report(&self, model: &ExamModel, assignment: &ExamAssignment) -> CsvTable {
        let mut table = CsvTable::new(&["Exam", "Enrl", "Rooms", "Distance"]);
        for exam in model.exams() {
            let Some(placement) = assignment.placement(exam.id()) else {
                continue;
            };
            if !placement.is_split() {
                continue;
            }
            let mut distance = 0.0_f64;
            for (i, a) in placement.rooms().iter().enumerate() {
                for b in placement.rooms().iter().skip(i + 1) {
                    distance = distance.max(model.room_distance(*a, *b));
                }
            }
            table.add_row(vec![
                model.exam_label(exam.id()).to_string(),
                exam.size().to_string(),
                rooms_label(model, placement.rooms()),
                format!("{distance:.1}"),
            ]);
        }
        table
    }
}

/// Distribution of students by the number of exams they sit per day.
pub struct MeetingsPerDayReport;

impl Report for MeetingsPerDayReport {
    fn name(&self) -> &'static str {
        "MeetingsPerDay"
    }

    fn suffix(&self) -> &'static str {
        "distmpd"
    }

    fn report(&self, model: &ExamModel, assignment: &ExamAssignment) -> CsvTable {
        let mut table = CsvTable::new(&["Day", "1 Exam", "2 Exams", "3+ Exams"]);
        let mut days: Vec<u32> = model.periods().iter().map(|p| p.day()).collect();
        days.sort_unstable();
        days.dedup();
        for day in days {
            let mut histogram = [0usize; 3];
            for student in model.students() {
                let n = student
                    .exams()
                    .iter()
                    .filter_map(|&e| assignment.placement(e))
                    .filter(|p| model.day_of(p.period()) == day)
                    .count();
                match n {
                    0 => {}
                    1 => histogram[0] += 1,
                    2 => histogram[1] += 1,
                    _ => histogram[2] += 1,
                }
            }
            table.add_row(vec![
                day.to_string(),
                histogram[0].to_string(),
                histogram[1].to_string(),
                histogram[2].to_string(),
            ]);
        }
        table
    }
}

/// Used by both the criteria summary line and the tests: the total of a
/// named criterion in the final assignment.
pub fn criterion_total(
    model: &examtt_solver::model::SolverModel,
    assignment: &ExamAssignment,
    name: &str,
) -> f64 {
    model
        .criterion_named(name)
        .map(|(index, _)| assignment.criterion_value(index))
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use examtt_model::model::{ExamPlacement, PeriodOption, RoomOption};
    use examtt_solver::config::SolverConfig;
    use examtt_solver::model::SolverModel;

    fn setup() -> (SolverModel, ExamAssignment) {
        let mut b = ExamModel::builder();
        let p0 = b.add_period(0, 480, 120, 0.0);
        let p1 = b.add_period(0, 660, 120, 0.0);
        let r0 = b.add_room("A", 100, 100, None);
        let r1 = b.add_room("B", 150, 150, None);
        let e0 = b.add_exam("X", 200, 120);
        let e1 = b.add_exam("Y", 10, 120);
        for e in [e0, e1] {
            for p in [p0, p1] {
                b.exam_mut(e).add_period(PeriodOption::new(p, 0));
            }
            for r in [r0, r1] {
                b.exam_mut(e).add_room(RoomOption::new(r, 0));
            }
        }
        let s = b.add_student();
        b.enroll(s, e0);
        b.enroll(s, e1);
        let model = SolverModel::from_model(b.build().unwrap(), &SolverConfig::new()).unwrap();
        let mut assignment = ExamAssignment::new(&model);
        assignment.assign(&model, 0, ExamPlacement::new(e0, p0, [r0, r1]));
        assignment.assign(&model, 1, ExamPlacement::new(e1, p1, [r0]));
        (model, assignment)
    }

    #[test]
    fn test_assignments_report_lists_placed_exams() {
        let (model, assignment) = setup();
        let table = ExamAssignmentsReport.report(model.problem(), &assignment);
        assert_eq!(table.nr_rows(), 2);
        let rendered = table.render();
        assert!(rendered.starts_with("Exam,Enrl,Period,Day,Time,Rooms"));
        assert!(rendered.contains("0,200,0,0,480,0 1"));
    }

    #[test]
    fn test_room_split_report() {
        let (model, assignment) = setup();
        let table = RoomSplitReport.report(model.problem(), &assignment);
        assert_eq!(table.nr_rows(), 1);
        assert!(table.render().contains("0,200,0 1"));
    }

    #[test]
    fn test_student_conflict_report_flags_back_to_back() {
        let (model, assignment) = setup();
        let table = StudentConflictsReport.report(model.problem(), &assignment);
        assert_eq!(table.nr_rows(), 1);
        assert!(table.render().contains("back-to-back"));
    }

    #[test]
    fn test_period_usage_counts() {
        let (model, assignment) = setup();
        let table = PeriodUsageReport.report(model.problem(), &assignment);
        let rendered = table.render();
        assert!(rendered.contains("0,0,480,1,200"));
        assert!(rendered.contains("1,0,660,1,10"));
    }

    #[test]
    fn test_csv_escaping() {
        assert_eq!(escape_cell("plain"), "plain");
        assert_eq!(escape_cell("a,b"), "\"a,b\"");
        assert_eq!(escape_cell("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_all_reports_run() {
        let (model, assignment) = setup();
        for report in all_reports() {
            let _ = report.report(model.problem(), &assignment);
        }
    }
}
