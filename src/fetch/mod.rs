//! Loading report data and schedules from local files or HTTP(S) URLs.

mod basic;
mod bearer;
mod client;

pub use basic::BasicClient;
pub use bearer::BearerToken;
pub use client::HttpClient;

use bytes::Bytes;
use tracing::{debug, info};

use crate::error::{DispositionError, Result};
use crate::model::ScheduleRequirement;
use crate::parser::{parse_report_data, parse_schedule};
use crate::source::ReportData;

/// Environment variable holding a bearer token for remote sources.
pub const SOURCE_TOKEN_VAR: &str = "SOURCE_API_TOKEN";

/// Fetches the body at `url`, treating any transport or HTTP status failure
/// as an unreadable source.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Bytes> {
    let parsed = url
        .parse::<reqwest::Url>()
        .map_err(|e| DispositionError::unreadable(url, e))?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    let resp = client
        .execute(req)
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| DispositionError::unreadable(url, e))?;

    resp.bytes()
        .await
        .map_err(|e| DispositionError::unreadable(url, e))
}

/// Reads a source from a local path or, for `http(s)://` locations, over HTTP.
#[tracing::instrument(fields(source = %location))]
pub async fn load_source(location: &str) -> Result<Bytes> {
    let bytes = if location.starts_with("http://") || location.starts_with("https://") {
        match std::env::var(SOURCE_TOKEN_VAR) {
            Ok(token) => {
                let client = BearerToken::new(BasicClient::new(), &token)
                    .map_err(|e| DispositionError::unreadable(location, e))?;
                fetch_bytes(&client, location).await?
            }
            Err(_) => fetch_bytes(&BasicClient::new(), location).await?,
        }
    } else {
        tokio::fs::read(location)
            .await
            .map(Bytes::from)
            .map_err(|e| DispositionError::unreadable(location, e))?
    };
    debug!(bytes = bytes.len(), "Source read");
    Ok(bytes)
}

/// Loads and concatenates report data from every location, in order.
pub async fn load_report_data(locations: &[String]) -> Result<ReportData> {
    let mut data = ReportData::default();
    for location in locations {
        let bytes = load_source(location).await?;
        let records = parse_report_data(&bytes, location)?;
        info!(source = %location, records = records.len(), "Report data loaded");
        data.extend(records)?;
    }
    Ok(data)
}

/// Loads and concatenates schedule requirements from every location, in order.
pub async fn load_schedule(locations: &[String]) -> Result<Vec<ScheduleRequirement>> {
    let mut schedule = Vec::new();
    for location in locations {
        let bytes = load_source(location).await?;
        let rows = parse_schedule(&bytes, location)?;
        info!(source = %location, requirements = rows.len(), "Schedule loaded");
        schedule.extend(rows);
    }
    Ok(schedule)
}


#[cfg(test)]
mod tests {
    use super::canned::Canned;
    use super::*;
    use reqwest::header::AUTHORIZATION;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const URL: &str = "https://reports.example.org/report_data.csv";

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let client = Canned::new(200, "date;start_hour;end_hour\n20190401;6;22\n");

        let bytes = fetch_bytes(&client, URL).await.unwrap();
        let schedule = parse_schedule(&bytes, URL).unwrap();
        assert_eq!(schedule.len(), 1);
    }

    #[tokio::test]
    async fn test_error_status_is_unreadable() {
        for status in [401, 404, 503] {
            let client = Canned::new(status, "nope");

            let err = fetch_bytes(&client, URL).await.unwrap_err();
            assert!(
                matches!(err, DispositionError::SourceUnreadable { ref source_id, .. } if source_id == URL),
                "status {status}: {err}"
            );
        }
    }

    #[tokio::test]
    async fn test_bad_url_is_unreadable() {
        let client = Canned::new(200, "");

        let err = fetch_bytes(&client, "not a url").await.unwrap_err();
        assert!(matches!(err, DispositionError::SourceUnreadable { .. }));
        assert!(client.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bearer_token_reaches_the_request() {
        let client = BearerToken::new(Canned::new(200, "ok"), "s3cret").unwrap();

        fetch_bytes(&client, URL).await.unwrap();

        let inner = client.inner();
        let seen = inner.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].get(AUTHORIZATION).unwrap(), "Bearer s3cret");
    }

    #[tokio::test]
    async fn test_missing_file_is_unreadable() {
        let err = load_source("/nonexistent/report.csv").await.unwrap_err();
        assert!(
            matches!(err, DispositionError::SourceUnreadable { ref source_id, .. } if source_id == "/nonexistent/report.csv")
        );
    }

    #[tokio::test]
    async fn test_report_files_are_appended() {
        let mut first = NamedTempFile::new().unwrap();
        first
            .write_all(
                b"route_name;date;departure_time;arrival_time;num_passengers;num_complaints\n\
                  A;20190401;08:00:00;09:00:00;100;1\n",
            )
            .unwrap();
        let mut second = NamedTempFile::new().unwrap();
        second
            .write_all(
                b"route_name;date;departure_time;arrival_time;num_passengers;num_complaints\n\
                  B;20190402;08:00:00;09:00:00;50;0\n",
            )
            .unwrap();

        let locations = vec![
            first.path().display().to_string(),
            second.path().display().to_string(),
        ];
        let data = load_report_data(&locations).await.unwrap();

        assert_eq!(data.len(), 2);
        assert_eq!(data.routes(), vec!["A".to_string(), "B".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_schedule_is_distinct_from_unreadable() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"date;start_hour;end_hour\n").unwrap();

        let err = load_schedule(&[file.path().display().to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, DispositionError::SourceEmpty { .. }));
    }
}
