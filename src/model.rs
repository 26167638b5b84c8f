//! Domain types: historical trips, schedule requirements and the per-run maps
//! the assignment loop produces.

use chrono::{NaiveDate, TimeDelta};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{DispositionError, Result};

/// A transport route identifier.
pub type Route = String;

/// Last hour boundary a schedule interval may reference.
pub const HOURS_PER_DAY: i32 = 24;

/// Wall-clock time of a trip, `HH:MM:SS`, where `HH` may exceed 23 for trips
/// that roll over midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServiceTime(TimeDelta);

impl ServiceTime {
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        let (hours, rest) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("bad time (HH:MM:SS): {s}"))?;
        let (minutes, seconds) = rest
            .split_once(':')
            .ok_or_else(|| format!("bad time (HH:MM:SS): {s}"))?;

        let component = |v: &str| {
            v.parse::<i64>()
                .map_err(|_| format!("bad time (HH:MM:SS): {s}"))
        };
        let (hours, minutes, seconds) = (component(hours)?, component(minutes)?, component(seconds)?);

        if !(0..10_000).contains(&hours) || !(0..60).contains(&minutes) || !(0..60).contains(&seconds) {
            return Err(format!("time out of range: {s}"));
        }

        Ok(Self(
            TimeDelta::hours(hours) + TimeDelta::minutes(minutes) + TimeDelta::seconds(seconds),
        ))
    }

    pub fn from_hms(hours: i64, minutes: i64, seconds: i64) -> Self {
        Self(TimeDelta::hours(hours) + TimeDelta::minutes(minutes) + TimeDelta::seconds(seconds))
    }

    /// Whole hours since the start of the service day.
    pub fn hour(&self) -> u32 {
        self.0.num_hours() as u32
    }

    /// Signed span from `self` to `later`, in fractional hours.
    pub fn hours_until(&self, later: ServiceTime) -> f64 {
        (later.0 - self.0).num_seconds() as f64 / 3600.0
    }
}

impl fmt::Display for ServiceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.num_seconds();
        write!(f, "{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
    }
}

impl<'de> Deserialize<'de> for ServiceTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ServiceTime::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl Serialize for ServiceTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// `YYYYMMDD` calendar dates as used by report and schedule files.
pub mod compact_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y%m%d";

    pub fn parse(s: &str) -> Result<NaiveDate, chrono::ParseError> {
        NaiveDate::parse_from_str(s.trim(), FORMAT)
    }

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// One observed trip instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    #[serde(rename = "route_name")]
    pub route: Route,
    #[serde(with = "compact_date")]
    pub date: NaiveDate,
    pub departure_time: ServiceTime,
    pub arrival_time: ServiceTime,
    pub num_passengers: u64,
    pub num_complaints: u64,
}

impl HistoricalRecord {
    pub fn departure_hour(&self) -> u32 {
        self.departure_time.hour()
    }

    pub fn operating_hours(&self) -> f64 {
        self.departure_time.hours_until(self.arrival_time)
    }

    /// Checks the counts and times are consistent with one real trip.
    pub fn check(&self) -> std::result::Result<(), String> {
        if self.num_complaints > self.num_passengers {
            return Err(format!(
                "route {}: {} complaints exceed {} passengers",
                self.route, self.num_complaints, self.num_passengers
            ));
        }
        if self.arrival_time < self.departure_time {
            return Err(format!(
                "route {}: arrival {} precedes departure {}",
                self.route, self.arrival_time, self.departure_time
            ));
        }
        Ok(())
    }
}

/// One schedule row: every hour in `[start_hour, end_hour)` on `date` needs a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRequirement {
    #[serde(with = "compact_date")]
    pub date: NaiveDate,
    pub start_hour: i32,
    pub end_hour: i32,
}

impl ScheduleRequirement {
    pub fn new(date: NaiveDate, start_hour: i32, end_hour: i32) -> Self {
        Self {
            date,
            start_hour,
            end_hour,
        }
    }

    /// The hours to fill, after checking both bounds lie in `[0, 24]`.
    ///
    /// A start at or past the end yields an empty range.
    pub fn hours(&self) -> Result<std::ops::Range<u32>> {
        let bounds = 0..=HOURS_PER_DAY;
        if !bounds.contains(&self.start_hour) || !bounds.contains(&self.end_hour) {
            return Err(DispositionError::HourOutOfRange {
                date: self.date,
                start_hour: self.start_hour,
                end_hour: self.end_hour,
            });
        }
        Ok(self.start_hour as u32..self.end_hour as u32)
    }
}

/// Discrete confidence in a route's complaint-rate estimate at one hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QualityTier {
    Good = 1,
    Fair = 2,
    Poor = 3,
}

impl QualityTier {
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::Good),
            2 => Some(Self::Fair),
            3 => Some(Self::Poor),
            _ => None,
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

impl Serialize for QualityTier {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.level())
    }
}

/// How many times each route has been committed at each hour in the current run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduledHoursMap(BTreeMap<u32, BTreeMap<Route, u32>>);

impl ScheduledHoursMap {
    /// Committed count for `(hour, route)`, or `None` if never committed.
    pub fn get(&self, hour: u32, route: &str) -> Option<u32> {
        self.0.get(&hour)?.get(route).copied()
    }

    pub fn count(&self, hour: u32, route: &str) -> u32 {
        self.get(hour, route).unwrap_or(0)
    }

    /// Records one more commitment and returns the new count.
    pub fn commit(&mut self, hour: u32, route: &str) -> u32 {
        let routes = self.0.entry(hour).or_default();
        match routes.get_mut(route) {
            Some(count) => {
                *count += 1;
                *count
            }
            None => {
                routes.insert(route.to_string(), 1);
                1
            }
        }
    }

    /// Entries ordered by hour, then route.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str, u32)> {
        self.0
            .iter()
            .flat_map(|(h, routes)| routes.iter().map(move |(r, c)| (*h, r.as_str(), *c)))
    }

    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Most recent quality tier computed per `(hour, route)`. Diagnostic only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataQualityMap(BTreeMap<u32, BTreeMap<Route, QualityTier>>);

impl DataQualityMap {
    pub fn get(&self, hour: u32, route: &str) -> Option<QualityTier> {
        self.0.get(&hour)?.get(route).copied()
    }

    pub fn record(&mut self, hour: u32, route: &str, tier: QualityTier) {
        let routes = self.0.entry(hour).or_default();
        match routes.get_mut(route) {
            Some(current) => *current = tier,
            None => {
                routes.insert(route.to_string(), tier);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str, QualityTier)> {
        self.0
            .iter()
            .flat_map(|(h, routes)| routes.iter().map(move |(r, t)| (*h, r.as_str(), *t)))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The selected route for each `(date, hour)`. Keys are assigned at most once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispositionResult(BTreeMap<(NaiveDate, u32), Route>);

impl DispositionResult {
    pub fn assign(&mut self, date: NaiveDate, hour: u32, route: Route) -> Result<()> {
        match self.0.entry((date, hour)) {
            std::collections::btree_map::Entry::Occupied(_) => {
                Err(DispositionError::DoubleBooked { date, hour })
            }
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(route);
                Ok(())
            }
        }
    }

    pub fn get(&self, date: NaiveDate, hour: u32) -> Option<&str> {
        self.0.get(&(date, hour)).map(String::as_str)
    }

    /// Entries ordered by date, then hour.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, u32, &str)> {
        self.0.iter().map(|((d, h), r)| (*d, *h, r.as_str()))
    }

    /// Distinct dates in ascending order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.0.keys().map(|(d, _)| *d).collect();
        dates.dedup();
        dates
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
