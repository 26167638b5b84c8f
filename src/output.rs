//! Rendering and persistence of disposition results.
//!
//! Supports a console listing, a CSV roster, route statistics, the
//! evaluation matrices and a JSON summary.

use chrono::NaiveDate;
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::assign::DispositionRun;
use crate::error::{DispositionError, Result};
use crate::model::{DispositionResult, Route};
use crate::parser::DELIMITER;
use crate::quality::committed_projection;
use crate::stats::{RouteStats, RouteStatsTable};

/// Date format used in human-facing output.
pub const DISPLAY_DATE: &str = "%d.%m.%Y";

const NOT_AVAILABLE: &str = "N/A";

/// One line per assignment: `DD.MM.YYYY, Hour H: Route R`.
pub fn disposition_lines(result: &DispositionResult) -> Vec<String> {
    result
        .iter()
        .map(|(date, hour, route)| {
            format!("{}, Hour {}: Route {}", date.format(DISPLAY_DATE), hour, route)
        })
        .collect()
}

/// Logs route statistics using Rust's debug pretty-print format.
pub fn print_pretty(stats: &RouteStatsTable) {
    for s in stats.iter() {
        debug!("{:#?}", s);
    }
}

fn csv_writer(path: &Path) -> Result<csv::Writer<File>> {
    WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_path(path)
        .map_err(|e| DispositionError::write_failure(path.display(), e))
}

fn write_rows(path: &Path, rows: impl IntoIterator<Item = Vec<String>>) -> Result<()> {
    let mut writer = csv_writer(path)?;
    for row in rows {
        writer
            .write_record(&row)
            .map_err(|e| DispositionError::write_failure(path.display(), e))?;
    }
    writer
        .flush()
        .map_err(|e| DispositionError::write_failure(path.display(), e))
}

/// Writes the disposition as a roster: one row per hour 0–23, one column per
/// scheduled date.
pub fn write_roster(path: impl AsRef<Path>, result: &DispositionResult) -> Result<()> {
    let path = path.as_ref();
    let dates: Vec<NaiveDate> = result.dates();
    debug!(path = %path.display(), dates = dates.len(), "Writing roster");

    let header: Vec<String> = std::iter::once("hour".to_string())
        .chain(dates.iter().map(|d| d.format(DISPLAY_DATE).to_string()))
        .collect();

    let rows = (0..24u32).map(|hour| {
        std::iter::once(hour.to_string())
            .chain(
                dates
                    .iter()
                    .map(|d| result.get(*d, hour).unwrap_or_default().to_string()),
            )
            .collect::<Vec<String>>()
    });

    write_rows(path, std::iter::once(header).chain(rows))
}

/// Writes one serialized row per route.
pub fn write_route_stats(path: impl AsRef<Path>, stats: &RouteStatsTable) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv_writer(path)?;
    for row in stats.iter() {
        writer
            .serialize(row)
            .map_err(|e| DispositionError::write_failure(path.display(), e))?;
    }
    writer
        .flush()
        .map_err(|e| DispositionError::write_failure(path.display(), e))
}

/// Writes an hour × route matrix, `N/A` where `cell` yields nothing.
fn write_matrix<F>(path: &Path, routes: &[Route], cell: F) -> Result<()>
where
    F: Fn(u32, &str) -> Option<String>,
{
    let header: Vec<String> = std::iter::once("hour".to_string())
        .chain(routes.iter().cloned())
        .collect();
    let rows = (0..24u32).map(|hour| {
        std::iter::once(hour.to_string())
            .chain(
                routes
                    .iter()
                    .map(|r| cell(hour, r).unwrap_or_else(|| NOT_AVAILABLE.to_string())),
            )
            .collect::<Vec<String>>()
    });
    write_rows(path, std::iter::once(header).chain(rows))
}

/// Writes the three evaluation matrices of a run into `dir`, named
/// `<stem>_data_quality.csv`, `<stem>_planned_hours.csv` and
/// `<stem>_additional_passengers.csv`. Returns the written paths.
pub fn write_evaluation(
    dir: impl AsRef<Path>,
    stem: &str,
    run: &DispositionRun,
    routes: &[Route],
    commitment_weight: f64,
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|e| DispositionError::write_failure(dir.display(), e))?;

    let quality_path = dir.join(format!("{stem}_data_quality.csv"));
    write_matrix(&quality_path, routes, |hour, route| {
        run.data_quality.get(hour, route).map(|t| t.to_string())
    })?;

    let planned_path = dir.join(format!("{stem}_planned_hours.csv"));
    write_matrix(&planned_path, routes, |hour, route| {
        run.scheduled_hours.get(hour, route).map(|c| c.to_string())
    })?;

    let passengers_path = dir.join(format!("{stem}_additional_passengers.csv"));
    write_matrix(&passengers_path, routes, |hour, route| {
        let committed = run.scheduled_hours.get(hour, route)?;
        let stats = run.stats.get(route)?;
        let extra = committed_projection(Some(committed), stats.control_performance, commitment_weight);
        Some((extra.floor() as u64).to_string())
    })?;

    info!(dir = %dir.display(), stem, "Evaluation report written");
    Ok(vec![quality_path, planned_path, passengers_path])
}

#[derive(Serialize)]
struct AssignmentEntry<'a> {
    date: NaiveDate,
    hour: u32,
    route: &'a str,
}

#[derive(Serialize)]
struct SlotEntry<'a, T> {
    hour: u32,
    route: &'a str,
    value: T,
}

/// JSON view of a completed run.
#[derive(Serialize)]
pub struct RunSummary<'a> {
    routes: Vec<&'a RouteStats>,
    disposition: Vec<AssignmentEntry<'a>>,
    data_quality: Vec<SlotEntry<'a, u8>>,
    scheduled_hours: Vec<SlotEntry<'a, u32>>,
}

impl<'a> RunSummary<'a> {
    pub fn new(run: &'a DispositionRun) -> Self {
        Self {
            routes: run.stats.iter().collect(),
            disposition: run
                .disposition
                .iter()
                .map(|(date, hour, route)| AssignmentEntry { date, hour, route })
                .collect(),
            data_quality: run
                .data_quality
                .iter()
                .map(|(hour, route, tier)| SlotEntry {
                    hour,
                    route,
                    value: tier.level(),
                })
                .collect(),
            scheduled_hours: run
                .scheduled_hours
                .iter()
                .map(|(hour, route, count)| SlotEntry {
                    hour,
                    route,
                    value: count,
                })
                .collect(),
        }
    }
}

/// Writes the run as pretty-printed JSON.
pub fn write_json(path: impl AsRef<Path>, run: &DispositionRun) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| DispositionError::write_failure(path.display(), e))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, &RunSummary::new(run))
        .map_err(|e| DispositionError::write_failure(path.display(), e))?;
    writer
        .flush()
        .map_err(|e| DispositionError::write_failure(path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assign::{DispositionEngine, FixedOrder};
    use crate::config::EngineConfig;
    use crate::model::{HistoricalRecord, ScheduleRequirement, ServiceTime};
    use crate::source::ReportData;
    use std::fs;
    use tempfile::tempdir;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 4, day).unwrap()
    }

    fn record(route: &str, hour: i64, passengers: u64, complaints: u64) -> HistoricalRecord {
        HistoricalRecord {
            route: route.to_string(),
            date: date(1),
            departure_time: ServiceTime::from_hms(hour, 0, 0),
            arrival_time: ServiceTime::from_hms(hour + 1, 0, 0),
            num_passengers: passengers,
            num_complaints: complaints,
        }
    }

    fn run() -> (DispositionRun, Vec<Route>) {
        let data = ReportData::new(vec![
            record("A", 8, 600, 6),
            record("B", 8, 200, 10),
        ])
        .unwrap();
        let routes = data.routes();
        let config = EngineConfig {
            shuffle_equal_priorities: false,
            ..Default::default()
        };
        let engine = DispositionEngine::new(&data, routes.clone(), config).unwrap();
        let run = engine
            .process_schedule(
                &[
                    ScheduleRequirement::new(date(1), 8, 9),
                    ScheduleRequirement::new(date(2), 7, 9),
                ],
                &mut FixedOrder,
            )
            .unwrap();
        (run, routes)
    }

    #[test]
    fn test_disposition_lines() {
        let mut result = DispositionResult::default();
        result.assign(date(2), 9, "B".into()).unwrap();
        result.assign(date(1), 8, "A".into()).unwrap();

        assert_eq!(
            disposition_lines(&result),
            vec![
                "01.04.2019, Hour 8: Route A".to_string(),
                "02.04.2019, Hour 9: Route B".to_string(),
            ]
        );
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        let (run, _) = run();
        print_pretty(&run.stats);
    }

    #[test]
    fn test_roster_has_hour_rows_and_date_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("roster.csv");
        let (run, _) = run();

        write_roster(&path, &run.disposition).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 25);
        assert_eq!(lines[0], "hour;01.04.2019;02.04.2019");
        assert_eq!(lines[8], format!("7;;{}", run.disposition.get(date(2), 7).unwrap()));
        assert!(lines[1].starts_with("0;;"));
    }

    #[test]
    fn test_evaluation_matrices() {
        let dir = tempdir().unwrap();
        let (run, routes) = run();

        let paths = write_evaluation(dir.path(), "week_1", &run, &routes, 0.5).unwrap();
        assert_eq!(paths.len(), 3);

        let quality = fs::read_to_string(&paths[0]).unwrap();
        let lines: Vec<_> = quality.lines().collect();
        assert_eq!(lines[0], "hour;A;B");
        assert_eq!(lines[1], "0;N/A;N/A");
        // B was re-estimated after its first commitment on day one.
        assert_eq!(lines[9], "8;1;1");
        assert_eq!(lines[8], "7;3;3");

        let planned = fs::read_to_string(&paths[1]).unwrap();
        assert_eq!(planned.lines().nth(9).unwrap(), "8;N/A;2");

        // B: 200 passengers over 1 operating hour, 2 commitments * 0.5
        let passengers = fs::read_to_string(&paths[2]).unwrap();
        assert_eq!(passengers.lines().nth(9).unwrap(), "8;N/A;200");
    }

    #[test]
    fn test_route_stats_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stats.csv");
        let (run, _) = run();

        write_route_stats(&path, &run.stats).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("route;total_passengers;"));
        assert!(lines[1].starts_with("A;600;6;1;"));
    }

    #[test]
    fn test_json_summary() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.json");
        let (run, _) = run();

        write_json(&path, &run).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["disposition"].as_array().unwrap().len(), 3);
        assert_eq!(value["disposition"][0]["date"], "2019-04-01");
        assert_eq!(value["routes"][0]["route"], "A");
    }

    #[test]
    fn test_unwritable_target_is_write_failure() {
        let (run, _) = run();
        let err = write_roster("/nonexistent/dir/roster.csv", &run.disposition).unwrap_err();
        assert!(matches!(err, DispositionError::WriteFailure { .. }));
    }
}
