//! Greedy hour-by-hour route assignment.
//!
//! Schedule requirements are walked in the order given and their hours in
//! ascending order. Each hour scores every active route, commits the best one
//! and the commitment is visible to every later hour of the same run, so the
//! result depends on the walk order.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

use crate::config::EngineConfig;
use crate::error::{DispositionError, Result};
use crate::model::{DataQualityMap, DispositionResult, Route, ScheduleRequirement, ScheduledHoursMap};
use crate::priority::Scorer;
use crate::source::HistoricalSource;
use crate::stats::{RouteStatsTable, aggregate_routes};

/// Decides the order candidate routes are scored in. The first route among
/// equal maxima wins, so this is the tie-break.
pub trait RouteOrder {
    fn arrange(&mut self, routes: &mut [Route]);
}

/// Keeps the sorted route order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedOrder;

impl RouteOrder for FixedOrder {
    fn arrange(&mut self, _routes: &mut [Route]) {}
}

/// Uniformly random permutation per hour.
#[derive(Debug, Clone)]
pub struct ShuffledOrder<R = StdRng> {
    rng: R,
}

impl ShuffledOrder<StdRng> {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> ShuffledOrder<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> RouteOrder for ShuffledOrder<R> {
    fn arrange(&mut self, routes: &mut [Route]) {
        routes.shuffle(&mut self.rng);
    }
}

/// Validates an explicit route list: trims entries, sorts ascending and drops
/// duplicates.
pub fn normalize_routes<I, T>(routes: I) -> Result<Vec<Route>>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let mut normalized = BTreeSet::new();
    for route in routes {
        let route = route.as_ref().trim();
        if route.is_empty() {
            return Err(DispositionError::InvalidRoutes(
                "route identifiers must not be blank".into(),
            ));
        }
        normalized.insert(route.to_string());
    }
    if normalized.is_empty() {
        return Err(DispositionError::InvalidRoutes("no routes given".into()));
    }
    Ok(normalized.into_iter().collect())
}

/// Everything a completed run produces. Read-only for consumers.
#[derive(Debug, Clone, Default)]
pub struct DispositionRun {
    pub stats: RouteStatsTable,
    pub scheduled_hours: ScheduledHoursMap,
    pub data_quality: DataQualityMap,
    pub disposition: DispositionResult,
}

/// Mutable accumulators threaded through one run.
#[derive(Debug, Default)]
struct RunState {
    scheduled_hours: ScheduledHoursMap,
    data_quality: DataQualityMap,
    disposition: DispositionResult,
}

/// Assigns routes to schedule hours from the history in `source`.
pub struct DispositionEngine<'a, S: ?Sized> {
    source: &'a S,
    routes: Vec<Route>,
    config: EngineConfig,
}

impl<'a, S> DispositionEngine<'a, S>
where
    S: HistoricalSource + ?Sized,
{
    /// `routes` must already be normalized (see [`normalize_routes`]).
    pub fn new(source: &'a S, routes: Vec<Route>, config: EngineConfig) -> Result<Self> {
        if routes.is_empty() {
            return Err(DispositionError::InvalidRoutes("no routes given".into()));
        }
        config.validate()?;
        Ok(Self {
            source,
            routes,
            config,
        })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs one full assignment pass over `schedule`.
    ///
    /// All per-run state starts empty. The first failure aborts the run and
    /// nothing of it is returned.
    pub fn process_schedule<O>(&self, schedule: &[ScheduleRequirement], order: &mut O) -> Result<DispositionRun>
    where
        O: RouteOrder + ?Sized,
    {
        let stats = aggregate_routes(self.source, &self.routes)?;
        let scorer = Scorer::new(self.source, &stats, &self.routes, &self.config);
        let mut state = RunState::default();

        for requirement in schedule {
            for hour in requirement.hours()? {
                let route = self.select_route(&scorer, hour, &mut state, order)?;
                state.scheduled_hours.commit(hour, &route);
                state.disposition.assign(requirement.date, hour, route)?;
            }
        }

        Ok(DispositionRun {
            stats,
            scheduled_hours: state.scheduled_hours,
            data_quality: state.data_quality,
            disposition: state.disposition,
        })
    }

    fn select_route<O>(&self, scorer: &Scorer<'_, S>, hour: u32, state: &mut RunState, order: &mut O) -> Result<Route>
    where
        O: RouteOrder + ?Sized,
    {
        let mut candidates = self.routes.clone();
        if self.config.shuffle_equal_priorities {
            order.arrange(&mut candidates);
        }

        let mut best: Option<(f64, Route)> = None;
        for route in candidates {
            let priority = scorer.priority(hour, &route, &state.scheduled_hours, &mut state.data_quality)?;
            if best.as_ref().is_none_or(|(top, _)| priority > *top) {
                best = Some((priority, route));
            }
        }

        best.map(|(_, route)| route)
            .ok_or_else(|| DispositionError::InvalidRoutes("no routes given".into()))
    }
}
