//! Data-quality tiers from confidence intervals on the complaint rate.
//!
//! The sample size behind an hour's estimate grows with every hour the run has
//! already committed to the route, so a route becomes more trustworthy the
//! more often it is picked.

use crate::config::EngineConfig;
use crate::model::{DataQualityMap, QualityTier, ScheduledHoursMap};
use crate::source::HistoricalSource;
use crate::stats::RouteStats;

/// Two-sided Wald interval `p ± z·sqrt(p(1−p)/n)`.
pub fn confidence_interval(p: f64, n: f64, z: f64) -> (f64, f64) {
    let margin = z * ((p * (1.0 - p)) / n).sqrt();
    (p - margin, p + margin)
}

/// Half the width of an interval.
pub fn interval_deviation(lower: f64, upper: f64) -> f64 {
    (upper - lower) / 2.0
}

/// Projected extra volume from `committed` already planned hours, weighted by
/// `weight`. `per_hour` is passengers or trips per operating hour.
pub fn committed_projection(committed: Option<u32>, per_hour: f64, weight: f64) -> f64 {
    match committed {
        Some(count) => count as f64 * per_hour * weight,
        None => 0.0,
    }
}

/// Tier for `complaints` out of `passengers` observations, judged on the
/// adjusted sample size `adjusted_n`.
///
/// The rate itself is always the observed `complaints / passengers`; only the
/// interval width uses `adjusted_n`.
pub fn quality_tier(passengers: u64, complaints: u64, adjusted_n: f64, config: &EngineConfig) -> QualityTier {
    if passengers == 0 {
        return QualityTier::Poor;
    }
    if adjusted_n > config.high_volume_threshold {
        return QualityTier::Good;
    }
    if adjusted_n < config.low_volume_threshold {
        return QualityTier::Poor;
    }

    let p = complaints as f64 / passengers as f64;
    let (lower, upper) = confidence_interval(p, adjusted_n, config.z_score);
    let deviation = interval_deviation(lower, upper);

    config
        .deviation_thresholds
        .iter()
        .position(|&threshold| deviation < threshold)
        .and_then(|idx| QualityTier::from_level(idx as u8 + 1))
        .unwrap_or(QualityTier::Poor)
}

/// Estimates the tier of `stats.route` at `hour` given the commitments made so
/// far, and records it in `quality`.
pub fn estimate<S>(
    source: &S,
    stats: &RouteStats,
    hour: u32,
    scheduled: &ScheduledHoursMap,
    quality: &mut DataQualityMap,
    config: &EngineConfig,
) -> QualityTier
where
    S: HistoricalSource + ?Sized,
{
    let volume = source.slot_volume(hour, &stats.route);
    let projected = committed_projection(
        scheduled.get(hour, &stats.route),
        stats.control_performance,
        config.commitment_weight,
    );
    let adjusted_n = volume.passengers as f64 + projected;

    let tier = quality_tier(volume.passengers, volume.complaints, adjusted_n, config);
    quality.record(hour, &stats.route, tier);
    tier
}
