//! Run configuration
//!
//! Defaults approximate a mid-sized walk-in donation centre open for a nine
//! hour day. They are best guesses, not measured data. Every field can be
//! overridden from a TOML file; missing fields keep their default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::Error;

/// Half-open range of whole minutes, `[min, max)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinuteRange {
    pub min: usize,
    pub max: usize,
}

impl MinuteRange {
    pub const fn new(min: usize, max: usize) -> Self {
        MinuteRange { min, max }
    }

    /// A range that always samples `minutes`.
    pub const fn fixed(minutes: usize) -> Self {
        MinuteRange {
            min: minutes,
            max: minutes + 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min >= self.max
    }
}

/// How snack restocking is scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestockPolicy {
    /// One single-shot restock routine started with every arrival. Several
    /// restock timers overlap whenever arrivals come faster than
    /// `restock_delay`.
    #[default]
    PerArrival,
    /// One background routine restocking every `restock_delay` minutes.
    Recurring,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CentreConfig {
    pub seed: u64,
    /// Simulated minutes to run for.
    pub horizon: usize,

    // Staffing and equipment
    pub check_in_stations: usize,
    pub second_test_rooms: usize,
    pub nurses: usize,
    pub chairs: usize,

    // Fixed stage durations
    pub history_check_time: usize,
    pub second_test_time: usize,

    pub blood_per_donation_ml: usize,

    // Snack bar
    pub snack_display_capacity: usize,
    pub snack_reserve: usize,
    pub restock_delay: usize,
    /// Chance of eating one snack per whole five minutes of rest.
    pub snack_probability: f64,
    pub restock_policy: RestockPolicy,

    // Sampled durations; kept last so they serialize as trailing TOML tables
    pub inter_arrival: MinuteRange,
    pub bleed_time: MinuteRange,
    pub rest_time: MinuteRange,
}

impl Default for CentreConfig {
    fn default() -> Self {
        CentreConfig {
            seed: 42,
            horizon: 9 * 60,
            check_in_stations: 1,
            second_test_rooms: 1,
            nurses: 8,
            chairs: 8,
            history_check_time: 5,
            second_test_time: 5,
            blood_per_donation_ml: 450,
            snack_display_capacity: 8,
            snack_reserve: 100,
            restock_delay: 10,
            snack_probability: 0.5,
            restock_policy: RestockPolicy::PerArrival,
            inter_arrival: MinuteRange::new(1, 10),
            bleed_time: MinuteRange::new(7, 15),
            rest_time: MinuteRange::new(5, 20),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be at least 1")]
    ZeroCapacity(&'static str),

    #[error("{name} must be at least 1 minute")]
    ZeroDuration { name: &'static str },

    #[error("{name} range [{min}, {max}) is empty")]
    EmptyRange {
        name: &'static str,
        min: usize,
        max: usize,
    },

    #[error("snack_probability must be within [0, 1], got {0}")]
    Probability(f64),
}

impl CentreConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, Error> {
        let config: CentreConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let source = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> Result<String, Error> {
        Ok(toml::to_string(self)?)
    }

    /// Reject configurations the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, capacity) in [
            ("check_in_stations", self.check_in_stations),
            ("second_test_rooms", self.second_test_rooms),
            ("nurses", self.nurses),
            ("chairs", self.chairs),
        ] {
            if capacity == 0 {
                return Err(ConfigError::ZeroCapacity(name));
            }
        }

        for (name, minutes) in [
            ("history_check_time", self.history_check_time),
            ("second_test_time", self.second_test_time),
            ("restock_delay", self.restock_delay),
        ] {
            if minutes == 0 {
                return Err(ConfigError::ZeroDuration { name });
            }
        }

        for (name, range) in [
            ("inter_arrival", self.inter_arrival),
            ("bleed_time", self.bleed_time),
            ("rest_time", self.rest_time),
        ] {
            if range.is_empty() {
                return Err(ConfigError::EmptyRange {
                    name,
                    min: range.min,
                    max: range.max,
                });
            }
        }

        // [0, 1) would spin the arrival generator forever at one instant
        if self.inter_arrival.max <= 1 {
            return Err(ConfigError::ZeroDuration {
                name: "inter_arrival",
            });
        }

        if !(0.0..=1.0).contains(&self.snack_probability) {
            return Err(ConfigError::Probability(self.snack_probability));
        }

        Ok(())
    }
}
