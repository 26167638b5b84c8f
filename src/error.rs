//! Error taxonomy shared by loaders, the disposition engine and result writers.

use chrono::NaiveDate;
use thiserror::Error;

/// Boxed cause carried by I/O-flavoured variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum DispositionError {
    #[error("source {source_id} may not be present or readable")]
    SourceUnreadable {
        source_id: String,
        #[source]
        source: BoxError,
    },
    #[error("source {source_id} does not contain any records")]
    SourceEmpty { source_id: String },
    #[error("source {source_id}, line {line}: {reason}")]
    MalformedRecord {
        source_id: String,
        line: u64,
        reason: String,
    },
    #[error("invalid record: {reason}")]
    InvalidRecord { reason: String },
    #[error("historical volume of route {route} exceeds the counter range")]
    VolumeOverflow { route: String },
    #[error("start hour {start_hour} and end hour {end_hour} on {date} must be in interval [0, 24]")]
    HourOutOfRange {
        date: NaiveDate,
        start_hour: i32,
        end_hour: i32,
    },
    #[error("hour {hour} is planned twice on date {date}")]
    DoubleBooked { date: NaiveDate, hour: u32 },
    #[error("route {route} has no historical passengers")]
    ZeroPassengers { route: String },
    #[error("route {route} has no historical operating hours")]
    ZeroOperatingHours { route: String },
    #[error("every route has a complaint rate of zero")]
    ZeroComplaintRates,
    #[error("no historical trips recorded at hour {hour}")]
    ZeroTripsAtHour { hour: u32 },
    #[error("invalid route list: {0}")]
    InvalidRoutes(String),
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to write {target}")]
    WriteFailure {
        target: String,
        #[source]
        source: BoxError,
    },
}

impl DispositionError {
    /// True for failures raised while computing a disposition, as opposed to
    /// loading inputs or persisting results.
    pub fn is_processing_error(&self) -> bool {
        matches!(
            self,
            Self::HourOutOfRange { .. }
                | Self::DoubleBooked { .. }
                | Self::ZeroPassengers { .. }
                | Self::ZeroOperatingHours { .. }
                | Self::ZeroComplaintRates
                | Self::ZeroTripsAtHour { .. }
                | Self::InvalidRoutes(_)
        )
    }

    pub(crate) fn unreadable(source_id: &str, err: impl Into<BoxError>) -> Self {
        Self::SourceUnreadable {
            source_id: source_id.to_string(),
            source: err.into(),
        }
    }

    pub(crate) fn write_failure(target: impl ToString, err: impl Into<BoxError>) -> Self {
        Self::WriteFailure {
            target: target.to_string(),
            source: err.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DispositionError>;
