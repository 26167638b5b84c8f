//! Access to historical report data.
//!
//! [`HistoricalSource`] is the only view of the history the engine needs, so
//! the scoring and assignment logic do not care whether records came from a
//! flat file, a database or a test fixture. [`ReportData`] is the in-memory
//! implementation backing the CSV loader.

use std::collections::{BTreeSet, HashMap};

use crate::error::{DispositionError, Result};
use crate::model::{HistoricalRecord, Route};

/// Route-wide sums over all historical trips.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RouteTotals {
    pub passengers: u64,
    pub complaints: u64,
    pub trips: u64,
    pub operating_hours: f64,
}

/// Sums over the trips of one route departing in one hour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotVolume {
    pub passengers: u64,
    pub complaints: u64,
    pub trips: u64,
}

pub trait HistoricalSource {
    /// Aggregate sums for every trip on `route`.
    fn route_totals(&self, route: &str) -> RouteTotals;

    /// Volume observed on `route` for trips departing during `hour`.
    fn slot_volume(&self, hour: u32, route: &str) -> SlotVolume;
}

/// Historical records held in memory with per-route and per-slot indexes.
#[derive(Debug, Clone, Default)]
pub struct ReportData {
    records: Vec<HistoricalRecord>,
    totals: HashMap<Route, RouteTotals>,
    slots: HashMap<Route, HashMap<u32, SlotVolume>>,
}

impl RouteTotals {
    fn add(&self, record: &HistoricalRecord) -> Option<Self> {
        Some(Self {
            passengers: self.passengers.checked_add(record.num_passengers)?,
            complaints: self.complaints.checked_add(record.num_complaints)?,
            trips: self.trips.checked_add(1)?,
            operating_hours: self.operating_hours + record.operating_hours(),
        })
    }
}

impl SlotVolume {
    fn add(&self, record: &HistoricalRecord) -> Option<Self> {
        Some(Self {
            passengers: self.passengers.checked_add(record.num_passengers)?,
            complaints: self.complaints.checked_add(record.num_complaints)?,
            trips: self.trips.checked_add(1)?,
        })
    }
}

impl ReportData {
    pub fn new(records: Vec<HistoricalRecord>) -> Result<Self> {
        let mut data = Self::default();
        data.extend(records)?;
        Ok(data)
    }

    /// Appends further records, updating the indexes.
    ///
    /// Stops at the first record that is inconsistent or would overflow a
    /// counter. Records before it stay added.
    pub fn extend(&mut self, records: impl IntoIterator<Item = HistoricalRecord>) -> Result<()> {
        for record in records {
            record
                .check()
                .map_err(|reason| DispositionError::InvalidRecord { reason })?;

            let overflow = || DispositionError::VolumeOverflow {
                route: record.route.clone(),
            };
            let hour = record.departure_hour();
            let totals = self
                .totals
                .get(&record.route)
                .copied()
                .unwrap_or_default()
                .add(&record)
                .ok_or_else(overflow)?;
            let slot = self
                .slots
                .get(&record.route)
                .and_then(|hours| hours.get(&hour))
                .copied()
                .unwrap_or_default()
                .add(&record)
                .ok_or_else(overflow)?;

            self.totals.insert(record.route.clone(), totals);
            self.slots
                .entry(record.route.clone())
                .or_default()
                .insert(hour, slot);
            self.records.push(record);
        }
        Ok(())
    }

    /// Distinct route identifiers present in the data, sorted ascending.
    pub fn routes(&self) -> Vec<Route> {
        self.totals
            .keys()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn records(&self) -> &[HistoricalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl HistoricalSource for ReportData {
    fn route_totals(&self, route: &str) -> RouteTotals {
        self.totals.get(route).copied().unwrap_or_default()
    }

    fn slot_volume(&self, hour: u32, route: &str) -> SlotVolume {
        self.slots
            .get(route)
            .and_then(|hours| hours.get(&hour))
            .copied()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ServiceTime;
    use chrono::NaiveDate;

    fn record(route: &str, dep: &str, arr: &str, passengers: u64, complaints: u64) -> HistoricalRecord {
        HistoricalRecord {
            route: route.to_string(),
            date: NaiveDate::from_ymd_opt(2019, 4, 1).unwrap(),
            departure_time: ServiceTime::parse(dep).unwrap(),
            arrival_time: ServiceTime::parse(arr).unwrap(),
            num_passengers: passengers,
            num_complaints: complaints,
        }
    }

    #[test]
    fn test_routes_are_distinct_and_sorted() {
        let data = ReportData::new(vec![
            record("C", "08:00:00", "09:00:00", 10, 0),
            record("A", "08:00:00", "09:00:00", 10, 0),
            record("C", "09:00:00", "10:00:00", 10, 0),
        ])
        .unwrap();
        assert_eq!(data.routes(), vec!["A".to_string(), "C".to_string()]);
    }

    #[test]
    fn test_route_totals_sum_operating_hours() {
        let data = ReportData::new(vec![
            record("A", "08:00:00", "08:30:00", 40, 1),
            record("A", "23:30:00", "25:00:00", 60, 2),
        ])
        .unwrap();
        let totals = data.route_totals("A");

        assert_eq!(totals.passengers, 100);
        assert_eq!(totals.complaints, 3);
        assert_eq!(totals.trips, 2);
        assert_eq!(totals.operating_hours, 2.0);
    }

    #[test]
    fn test_slot_volume_keyed_by_departure_hour() {
        let mut data = ReportData::new(vec![record("A", "08:15:00", "09:10:00", 40, 1)]).unwrap();
        data.extend(vec![record("A", "08:45:00", "09:30:00", 20, 0)])
            .unwrap();

        assert_eq!(
            data.slot_volume(8, "A"),
            SlotVolume {
                passengers: 60,
                complaints: 1,
                trips: 2
            }
        );
        assert_eq!(data.slot_volume(9, "A"), SlotVolume::default());
        assert_eq!(data.route_totals("Z"), RouteTotals::default());
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn test_passenger_overflow_is_an_error() {
        let err = ReportData::new(vec![
            record("A", "08:00:00", "09:00:00", u64::MAX, 0),
            record("A", "09:00:00", "10:00:00", 1, 0),
        ])
        .unwrap_err();
        assert!(matches!(err, DispositionError::VolumeOverflow { ref route } if route == "A"));
    }

    #[test]
    fn test_overflowing_record_is_not_indexed() {
        let mut data = ReportData::new(vec![record("A", "08:00:00", "09:00:00", u64::MAX - 1, 0)]).unwrap();

        assert!(data.extend(vec![record("A", "08:30:00", "09:00:00", 5, 0)]).is_err());
        assert_eq!(data.len(), 1);
        assert_eq!(data.route_totals("A").passengers, u64::MAX - 1);
        assert_eq!(data.slot_volume(8, "A").trips, 1);
    }

    #[test]
    fn test_inconsistent_record_is_rejected() {
        let err = ReportData::new(vec![record("X", "08:00:00", "09:00:00", 100, 150)]).unwrap_err();
        assert!(matches!(err, DispositionError::InvalidRecord { .. }));

        let err = ReportData::new(vec![record("X", "09:00:00", "08:00:00", 100, 1)]).unwrap_err();
        assert!(matches!(err, DispositionError::InvalidRecord { .. }));
    }
}
