use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{DispositionError, Result};
use crate::model::Route;
use crate::source::{HistoricalSource, RouteTotals};

/// Aggregate performance of one route over the whole history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStats {
    pub route: Route,
    pub total_passengers: u64,
    pub total_complaints: u64,
    pub total_trips: u64,
    pub operating_hours: f64,
    pub complaint_rate: f64,
    /// Passengers per operating hour.
    pub control_performance: f64,
    pub trips_per_hour: f64,
}

impl RouteStats {
    pub fn from_totals(route: &str, totals: RouteTotals) -> Result<Self> {
        if totals.passengers == 0 {
            return Err(DispositionError::ZeroPassengers {
                route: route.to_string(),
            });
        }
        if totals.operating_hours <= 0.0 {
            return Err(DispositionError::ZeroOperatingHours {
                route: route.to_string(),
            });
        }

        let passengers = totals.passengers as f64;

        Ok(Self {
            route: route.to_string(),
            total_passengers: totals.passengers,
            total_complaints: totals.complaints,
            total_trips: totals.trips,
            operating_hours: totals.operating_hours,
            complaint_rate: totals.complaints as f64 / passengers,
            control_performance: passengers / totals.operating_hours,
            trips_per_hour: totals.trips as f64 / totals.operating_hours,
        })
    }
}

/// Stats for every active route of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouteStatsTable {
    routes: BTreeMap<Route, RouteStats>,
}

impl RouteStatsTable {
    pub fn get(&self, route: &str) -> Option<&RouteStats> {
        self.routes.get(route)
    }

    /// Highest complaint rate among the active routes.
    pub fn max_complaint_rate(&self) -> f64 {
        self.routes
            .values()
            .map(|s| s.complaint_rate)
            .fold(0.0, f64::max)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteStats> {
        self.routes.values()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Computes [`RouteStats`] for each of `routes`.
///
/// # Errors
///
/// Fails on the first route without passengers or operating hours.
pub fn aggregate_routes<S>(source: &S, routes: &[Route]) -> Result<RouteStatsTable>
where
    S: HistoricalSource + ?Sized,
{
    let mut table = RouteStatsTable::default();
    for route in routes {
        let stats = RouteStats::from_totals(route, source.route_totals(route))?;
        table.routes.insert(route.clone(), stats);
    }
    Ok(table)
}
