//! Per-hour route priority.
//!
//! | Quality tier | Priority |
//! |--------------|----------|
//! | 3            | `1.0`    |
//! | 1 or 2       | `complaint_factor × load_factor / 2` |
//!
//! `complaint_factor` is the route's complaint rate relative to the highest
//! rate among active routes. `load_factor` is `1 − share` of the hour's
//! historical trips, where the route's share includes a weighted projection of
//! the trips its already committed hours add.

use crate::config::EngineConfig;
use crate::error::{DispositionError, Result};
use crate::model::{DataQualityMap, HOURS_PER_DAY, QualityTier, Route, ScheduledHoursMap};
use crate::quality::{self, committed_projection};
use crate::source::HistoricalSource;
use crate::stats::{RouteStats, RouteStatsTable};

/// Flat priority given to routes whose estimate is not trusted.
pub const UNTRUSTED_PRIORITY: f64 = 1.0;

/// Read-only inputs shared by every score of a run.
pub struct Scorer<'a, S: ?Sized> {
    source: &'a S,
    stats: &'a RouteStatsTable,
    config: &'a EngineConfig,
    /// Historical trips of all active routes, per departure hour.
    hour_trips: [u64; HOURS_PER_DAY as usize],
}

impl<'a, S> Scorer<'a, S>
where
    S: HistoricalSource + ?Sized,
{
    pub fn new(source: &'a S, stats: &'a RouteStatsTable, routes: &[Route], config: &'a EngineConfig) -> Self {
        let mut hour_trips = [0u64; HOURS_PER_DAY as usize];
        for (hour, total) in (0u32..).zip(hour_trips.iter_mut()) {
            *total = routes
                .iter()
                .map(|r| source.slot_volume(hour, r).trips)
                .fold(0u64, u64::saturating_add);
        }
        Self {
            source,
            stats,
            config,
            hour_trips,
        }
    }

    /// Historical trips of all active routes departing during `hour`.
    pub fn hour_trips(&self, hour: u32) -> u64 {
        self.hour_trips.get(hour as usize).copied().unwrap_or(0)
    }

    /// Priority of `route` at `hour` given the commitments made so far.
    ///
    /// Records the estimated quality tier in `quality` unless the config
    /// ignores data quality.
    pub fn priority(
        &self,
        hour: u32,
        route: &str,
        scheduled: &ScheduledHoursMap,
        quality: &mut DataQualityMap,
    ) -> Result<f64> {
        let stats = self.route_stats(route)?;

        if !self.config.ignore_data_quality {
            let tier = quality::estimate(self.source, stats, hour, scheduled, quality, self.config);
            if tier > QualityTier::Fair {
                return Ok(UNTRUSTED_PRIORITY);
            }
        }

        let complaint_factor = self.complaint_factor(stats)?;
        let load_factor = self.load_factor(hour, stats, scheduled)?;

        Ok(complaint_factor * (load_factor / 2.0))
    }

    /// Complaint rate of the route normalised by the highest active rate.
    pub fn complaint_factor(&self, stats: &RouteStats) -> Result<f64> {
        let max_rate = self.stats.max_complaint_rate();
        if max_rate <= 0.0 {
            return Err(DispositionError::ZeroComplaintRates);
        }
        Ok(stats.complaint_rate / max_rate)
    }

    /// One minus the route's share of all historical trips at `hour`.
    pub fn load_factor(&self, hour: u32, stats: &RouteStats, scheduled: &ScheduledHoursMap) -> Result<f64> {
        let hour_trips = self.hour_trips(hour);
        if hour_trips == 0 {
            return Err(DispositionError::ZeroTripsAtHour { hour });
        }

        let route_trips = self.source.slot_volume(hour, &stats.route).trips as f64
            + committed_projection(
                scheduled.get(hour, &stats.route),
                stats.trips_per_hour,
                self.config.commitment_weight,
            );

        Ok(1.0 - route_trips / hour_trips as f64)
    }

    fn route_stats(&self, route: &str) -> Result<&'a RouteStats> {
        self.stats.get(route).ok_or_else(|| {
            DispositionError::InvalidRoutes(format!("route {route} has no aggregated statistics"))
        })
    }
}
