//! CSV decoders for report data and schedule files.
//!
//! Both formats are `;`-separated with a header row. Report data columns:
//! `route_name;date;departure_time;arrival_time;num_passengers;num_complaints`.
//! Schedule columns: `date;start_hour;end_hour`.

use csv::ReaderBuilder;
use serde::de::DeserializeOwned;

use crate::error::{DispositionError, Result};
use crate::model::{HistoricalRecord, ScheduleRequirement};

pub const DELIMITER: u8 = b';';

/// Decodes every row of `bytes`, naming failures after `source_id`.
///
/// # Errors
///
/// [`DispositionError::SourceEmpty`] if there are no data rows,
/// [`DispositionError::MalformedRecord`] for the first row that does not decode.
pub fn parse_rows<T: DeserializeOwned>(bytes: &[u8], source_id: &str) -> Result<Vec<T>> {
    parse_checked_rows(bytes, source_id, |_: &T| Ok(()))
}

/// Like [`parse_rows`], but every decoded row must also pass `check`. A
/// rejected row is reported as malformed at its line.
pub fn parse_checked_rows<T, F>(bytes: &[u8], source_id: &str, check: F) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    F: Fn(&T) -> std::result::Result<(), String>,
{
    let malformed = |line: u64, reason: String| DispositionError::MalformedRecord {
        source_id: source_id.to_string(),
        line,
        reason,
    };

    let mut reader = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| malformed(1, e.to_string()))?
        .clone();

    let mut record = csv::StringRecord::new();
    let mut rows = Vec::new();
    loop {
        match reader.read_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => return Err(malformed(e.position().map(|p| p.line()).unwrap_or(0), e.to_string())),
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let row: T = record
            .deserialize(Some(&headers))
            .map_err(|e| malformed(line, e.to_string()))?;
        check(&row).map_err(|reason| malformed(line, reason))?;
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(DispositionError::SourceEmpty {
            source_id: source_id.to_string(),
        });
    }

    Ok(rows)
}

/// Decodes report data, rejecting rows with more complaints than passengers
/// or an arrival before the departure.
pub fn parse_report_data(bytes: &[u8], source_id: &str) -> Result<Vec<HistoricalRecord>> {
    parse_checked_rows(bytes, source_id, HistoricalRecord::check)
}

pub fn parse_schedule(bytes: &[u8], source_id: &str) -> Result<Vec<ScheduleRequirement>> {
    parse_rows(bytes, source_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_report_data() {
        let csv = "route_name;date;departure_time;arrival_time;num_passengers;num_complaints\n\
                   101;20190401;08:15:00;09:05:00;120;3\n\
                   102;20190401;23:40:00;24:20:00;35;0\n";

        let records = parse_report_data(csv.as_bytes(), "report.csv").unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].route, "101");
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2019, 4, 1).unwrap());
        assert_eq!(records[0].departure_hour(), 8);
        assert_eq!(records[0].num_complaints, 3);
        assert!((records[1].operating_hours() - 40.0 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn test_parse_schedule() {
        let csv = "date;start_hour;end_hour\n20190401;6;22\n20190402; 0 ;24\n";

        let schedule = parse_schedule(csv.as_bytes(), "schedule.csv").unwrap();

        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule[0].start_hour, 6);
        assert_eq!(schedule[1].end_hour, 24);
    }

    #[test]
    fn test_header_only_is_empty() {
        let err = parse_schedule(b"date;start_hour;end_hour\n", "schedule.csv").unwrap_err();
        assert!(matches!(err, DispositionError::SourceEmpty { ref source_id } if source_id == "schedule.csv"));
    }

    #[test]
    fn test_blank_file_is_empty() {
        let err = parse_report_data(b"", "report.csv").unwrap_err();
        assert!(matches!(err, DispositionError::SourceEmpty { .. }));
    }

    #[test]
    fn test_more_complaints_than_passengers_is_malformed() {
        let csv = "route_name;date;departure_time;arrival_time;num_passengers;num_complaints\n\
                   A;20190401;08:00:00;09:00:00;600;6\n\
                   X;20190401;08:10:00;09:10:00;100;150\n";

        let err = parse_report_data(csv.as_bytes(), "report.csv").unwrap_err();
        match err {
            DispositionError::MalformedRecord { line, reason, .. } => {
                assert_eq!(line, 3);
                assert!(reason.contains("complaints exceed"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_arrival_before_departure_is_malformed() {
        let csv = "route_name;date;departure_time;arrival_time;num_passengers;num_complaints\n\
                   A;20190401;09:00:00;08:30:00;100;1\n";

        let err = parse_report_data(csv.as_bytes(), "report.csv").unwrap_err();
        assert!(matches!(err, DispositionError::MalformedRecord { line: 2, .. }));
    }

    #[test]
    fn test_bad_row_reports_line() {
        let csv = "date;start_hour;end_hour\n20190401;6;22\n2019-04-02;x;24\n";

        let err = parse_schedule(csv.as_bytes(), "schedule.csv").unwrap_err();
        match err {
            DispositionError::MalformedRecord { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }
}
