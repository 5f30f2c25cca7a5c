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

mod reports;

use chrono::{DateTime, Utc};
use examtt_model::loader::{ProblemLoader, XmlProblemLoader};
use examtt_model::writer::{SolutionWriter, XmlSolutionWriter};
use examtt_solver::assignment::ExamAssignment;
use examtt_solver::config::SolverConfig;
use examtt_solver::err::SolverError;
use examtt_solver::model::SolverModel;
use examtt_solver::parallel::ParallelSolver;
use examtt_solver::solution::{Solution, SolutionInfo, SolutionListener};
use examtt_solver::solver::Solver;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn enable_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

/// Logs every improvement the way the solution listener contract promises:
/// in event order, without touching the assignment.
struct BestLogListener;

impl SolutionListener for BestLogListener {
    fn best_saved(&mut self, info: &SolutionInfo) {
        let total = info.nr_assigned + info.nr_unassigned;
        let assigned = if info.nr_unassigned > 0 {
            format!("V:{}/{} - ", info.nr_assigned, total)
        } else {
            String::new()
        };
        let failed = if info.failed_iterations > 0 && info.iteration > 0 {
            format!(
                ", F:{:.2}%",
                100.0 * info.failed_iterations as f64 / info.iteration as f64
            )
        } else {
            String::new()
        };
        tracing::info!(
            "**BEST[{}]** {}T:{:.2}{}",
            info.iteration,
            assigned,
            info.total_value,
            failed
        );
    }
}

#[derive(Serialize)]
struct RunRecord {
    instance: String,
    config: String,
    seed: u64,
    workers: usize,
    start_ts: DateTime<Utc>,
    end_ts: DateTime<Utc>,
    runtime_ms: u128,
    iterations: u64,
    best_total: Option<f64>,
    best_unassigned: Option<usize>,
}

/// Appends one line per run to `<instance>.csv`, header included on first
/// write: the master seed, the per-criterion totals of the saved best, the
/// instance and the configuration name.
fn append_csv_line(
    path: &Path,
    seed: u64,
    model: &SolverModel,
    assignment: &ExamAssignment,
    instance: &str,
    config_name: &str,
) -> std::io::Result<()> {
    const COLUMNS: &[(&str, &str)] = &[
        ("NA", "StudentNotAvailableConflicts"),
        ("DC", "StudentDirectConflicts"),
        ("M2D", "StudentMoreThan2ADayConflicts"),
        ("BTB", "StudentBackToBackConflicts"),
        ("iNA", "InstructorNotAvailableConflicts"),
        ("iDC", "InstructorDirectConflicts"),
        ("iM2D", "InstructorMoreThan2ADayConflicts"),
        ("iBTB", "InstructorBackToBackConflicts"),
        ("PP", "PeriodPenalty"),
        ("RP", "RoomPenalty"),
        ("DP", "DistributionPenalty"),
        ("PI", "PeriodIndexPenalty"),
        ("PS", "PeriodSizePenalty"),
        ("RSz", "RoomSizePenalty"),
        ("RSp", "RoomSplitPenalty"),
        ("RD", "RoomSplitDistancePenalty"),
    ];
    let exists = path.exists();
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    if !exists {
        let header: Vec<&str> = COLUMNS.iter().map(|(short, _)| *short).collect();
        writeln!(file, "SEED,{},INSTANCE,CONFIG", header.join(","))?;
    }
    let values: Vec<String> = COLUMNS
        .iter()
        .map(|(_, name)| format!("{:.2}", reports::criterion_total(model, assignment, name)))
        .collect();
    writeln!(file, "{seed},{},{instance},{config_name}", values.join(","))
}

fn resolve_output(config: &SolverConfig, input: &Path) -> PathBuf {
    if let Some(path) = config.get("General.OutputFile") {
        return PathBuf::from(path);
    }
    if let Some(dir) = config.get("General.Output") {
        return Path::new(dir).join("solution.xml");
    }
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "solution".to_string());
    input.with_file_name(format!("{stem}s.xml"))
}

fn write_reports(
    model: &SolverModel,
    assignment: &ExamAssignment,
    output: &Path,
) -> std::io::Result<()> {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "solution".to_string());
    let dir = output.parent().unwrap_or(Path::new("."));
    for report in reports::all_reports() {
        let table = report.report(model.problem(), assignment);
        let path = dir.join(format!("{stem}.{}.csv", report.suffix()));
        table.save(&path)?;
        tracing::info!("report {} written to {}", report.name(), path.display());
    }
    Ok(())
}

fn run() -> Result<(), SolverError> {
    let args: Vec<String> = std::env::args().collect();
    let mut config = match args.get(1) {
        Some(path) => SolverConfig::from_path(path)?,
        None => {
            eprintln!("usage: examtt <config> [<input>] [<output>]");
            std::process::exit(2);
        }
    };
    let config_name = Path::new(&args[1])
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| args[1].clone());
    if let Some(input) = args.get(2) {
        config.set("General.Input", input.clone());
    }
    if let Some(output) = args.get(3) {
        config.set("General.OutputFile", output.clone());
    }
    config.validate()?;

    let input = PathBuf::from(config.get_string("General.Input", "exam.xml"));
    let output = resolve_output(&config, &input);
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(examtt_model::err::ModelLoadError::from)?;
        }
    }

    tracing::info!("loading {}", input.display());
    let loaded = XmlProblemLoader::new().from_path(&input)?;
    tracing::info!(
        "instance '{}': {} exams, {} periods, {} rooms, {} students, {} instructors",
        loaded.model.name(),
        loaded.model.nr_exams(),
        loaded.model.nr_periods(),
        loaded.model.nr_rooms(),
        loaded.model.students().len(),
        loaded.model.instructors().len()
    );
    let model = SolverModel::from_model(loaded.model, &config)?;

    let start_ts = Utc::now();
    let started = Instant::now();
    let nr_solvers = config.get_usize("Parallel.NrSolvers", 1)?;

    let (solution, seed) = if nr_solvers <= 1 {
        let solver = Solver::new(&config)?;
        let seed = solver.seed();
        let mut assignment = ExamAssignment::new(&model);
        if !loaded.assignments.is_empty() {
            let applied = model.apply_placements(&mut assignment, &loaded.assignments);
            tracing::info!("warm start: {applied} saved placements applied");
        }
        let mut solution = Solution::new(assignment);
        solution.add_listener(Box::new(BestLogListener));
        solver.solve(&model, &mut solution);
        let unplaced = solver.selection().unplaceable_exams(solution.assignment());
        for exam in unplaced {
            tracing::warn!(
                "construction found no feasible placement for exam '{}'",
                model.problem().exam_label(exam)
            );
        }
        (solution, seed)
    } else {
        let solver = ParallelSolver::new(&config)?;
        let seed = solver.seed();
        (solver.solve(&model), seed)
    };
    let runtime = started.elapsed();

    match solution.best() {
        None => tracing::error!("no best solution found"),
        Some(best) => tracing::info!(
            "best solution found after {:.2} seconds ({} iterations): total {:.2}, {} assigned of {}",
            best.time,
            best.iteration,
            best.total_value,
            model.problem().nr_exams() - best.nr_unassigned,
            model.problem().nr_exams()
        ),
    }

    let xml = XmlSolutionWriter::new().save(model.problem(), solution.assignment());
    std::fs::write(&output, xml).map_err(examtt_model::err::ModelLoadError::from)?;
    tracing::info!("solution written to {}", output.display());

    if config.get_bool("General.Reports", false)? {
        write_reports(&model, solution.assignment(), &output)
            .map_err(examtt_model::err::ModelLoadError::from)?;
    }

    let instance = input
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let summary = input.with_extension("csv");
    if let Err(e) = append_csv_line(
        &summary,
        seed,
        &model,
        solution.assignment(),
        &instance,
        &config_name,
    ) {
        tracing::error!("unable to append run line to {}: {e}", summary.display());
    }

    let record = RunRecord {
        instance,
        config: config_name,
        seed,
        workers: nr_solvers.max(1),
        start_ts,
        end_ts: Utc::now(),
        runtime_ms: runtime.as_millis(),
        iterations: solution.iteration(),
        best_total: solution.best_total_value(),
        best_unassigned: solution.best_unassigned(),
    };
    let record_path = output.with_extension("json");
    match serde_json::to_string_pretty(&record) {
        Ok(json) => {
            if let Err(e) = std::fs::write(&record_path, json) {
                tracing::error!("unable to write run record: {e}");
            }
        }
        Err(e) => tracing::error!("unable to serialize run record: {e}"),
    }

    Ok(())
}

fn main() {
    enable_tracing();
    if let Err(e) = run() {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
