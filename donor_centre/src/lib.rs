//! Blood donation centre simulation
//!
//! Donors walk in at random intervals and pass through four stages, each
//! guarded by a pool of limited capacity:
//!
//! 1. check-in at a computer station (health history)
//! 2. second test in a private room
//! 3. blood draw in a donation chair
//! 4. rest at the snack bar, with a chance of eating a snack per five minutes
//!
//! Key processes:
//! - `ArrivalGenerator`: perpetual, spawns one `Donor` per arrival
//! - `Donor`: explicit state machine through the four stages
//! - `Restock`: moves snacks from the reserve onto the display
//!
//! The run reports how many donations were completed and how much blood was
//! collected before the horizon, along with pool usage.

pub mod arrivals;
pub mod config;
pub mod donor;
pub mod facility;
pub mod random;
pub mod report;
pub mod restock;

use std::ops::RangeInclusive;
use std::path::PathBuf;

use des::parallel::{ParallelRunner, log_progress};
use des::{EventLoop, PoolId, SimError};
use tracing::info;

use crate::arrivals::ArrivalGenerator;
pub use crate::config::{CentreConfig, ConfigError, MinuteRange, RestockPolicy};
pub use crate::facility::FacilityState;
use crate::random::RandomSource;
pub use crate::report::Report;
use crate::restock::Restock;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("simulation failed: {0}")]
    Sim(#[from] SimError),

    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("could not write config: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error("could not write report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not write sweep results: {0}")]
    Csv(#[from] csv::Error),
}

/// The four resource pools of the centre
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stations {
    pub check_in: PoolId,
    pub test_room: PoolId,
    pub chairs: PoolId,
    /// Registered for reporting; no stage requests a nurse directly.
    pub nurses: PoolId,
}

/// Everything a running process may read or change
pub struct Centre {
    pub config: CentreConfig,
    pub stations: Stations,
    pub facility: FacilityState,
    pub rng: RandomSource,
}

impl Centre {
    pub fn new(config: CentreConfig, stations: Stations) -> Self {
        Centre {
            facility: FacilityState::new(config.snack_display_capacity, config.snack_reserve),
            rng: RandomSource::seeded(config.seed),
            stations,
            config,
        }
    }
}

/// An empty centre: pools and counters, but nobody scheduled to come in.
pub(crate) fn open(config: CentreConfig) -> Result<EventLoop<Centre>, SimError> {
    EventLoop::with_pools(|pools| {
        let stations = Stations {
            check_in: pools.add("check-in", config.check_in_stations)?,
            test_room: pools.add("test room", config.second_test_rooms)?,
            chairs: pools.add("chair", config.chairs)?,
            nurses: pools.add("nurse", config.nurses)?,
        };
        Ok::<_, SimError>(Centre::new(config, stations))
    })
}

/// Build a ready-to-run event loop without validating `config`.
fn assemble(config: CentreConfig) -> Result<EventLoop<Centre>, SimError> {
    let policy = config.restock_policy;
    let mut event_loop = open(config)?;

    event_loop.spawn(Box::new(ArrivalGenerator::new()));
    if policy == RestockPolicy::Recurring {
        event_loop.spawn(Box::new(Restock::recurring()));
    }
    Ok(event_loop)
}

/// Validate `config` and build the event loop for it.
pub fn build(config: CentreConfig) -> Result<EventLoop<Centre>, Error> {
    config.validate()?;
    Ok(assemble(config)?)
}

/// Run one simulation to its configured horizon.
pub fn run(config: CentreConfig) -> Result<Report, Error> {
    let horizon = config.horizon;
    let mut event_loop = build(config)?;
    let summary = event_loop.run_until(horizon)?;
    info!(
        events = summary.events_processed,
        t = summary.final_t,
        "centre closed for the day"
    );
    Ok(Report::collect(&event_loop, summary))
}

/// Run one independent simulation per chair count, in parallel.
///
/// Every run uses the same seed, so differences come from staffing alone.
pub fn sweep_chairs(
    config: &CentreConfig,
    chairs: RangeInclusive<usize>,
    threads: Option<usize>,
) -> Result<Vec<(usize, Result<Report, String>)>, Error> {
    let counts: Vec<usize> = chairs.collect();
    let configs = counts
        .iter()
        .map(|&chairs| {
            let candidate = CentreConfig {
                chairs,
                ..config.clone()
            };
            candidate.validate().map(|_| candidate)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut runner = ParallelRunner::new(configs.len(), |scenario_id| {
        assemble(configs[scenario_id].clone())
    })
    .progress(log_progress(4));
    if let Some(n) = threads {
        runner = runner.num_threads(n);
    }
    let reports = runner.run(config.horizon, Report::collect);

    Ok(counts.into_iter().zip(reports).collect())
}
