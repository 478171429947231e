//! End-of-day results

use std::fmt;
use std::fs;
use std::path::Path;

use des::{EventLoop, Pool, RunSummary, Termination};
use serde::Serialize;

use crate::{Centre, Error};

/// Snapshot of one resource pool when the run stopped
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolReport {
    pub name: String,
    pub capacity: usize,
    pub in_use: usize,
    pub waiting: usize,
    pub total_grants: usize,
    pub total_queued: usize,
    pub max_waiting: usize,
    /// Minutes, over the requests that queued and were later served.
    pub mean_wait: Option<f64>,
}

impl From<&Pool<Centre>> for PoolReport {
    fn from(pool: &Pool<Centre>) -> Self {
        let stats = pool.stats();
        PoolReport {
            name: pool.name().to_string(),
            capacity: stats.capacity,
            in_use: stats.in_use,
            waiting: stats.waiting,
            total_grants: stats.total_grants,
            total_queued: stats.total_queued,
            max_waiting: stats.max_waiting,
            mean_wait: stats.mean_wait(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Completed blood draws.
    pub total_donors: usize,
    pub total_blood_ml: usize,
    pub donors_arrived: usize,
    pub donors_departed: usize,
    pub snacks_eaten: usize,
    pub snack_visible: usize,
    pub snack_reserve: usize,
    pub stock_outs: usize,
    pub final_t: usize,
    pub events_processed: usize,
    /// False when the agenda ran dry before the horizon.
    pub reached_horizon: bool,
    pub pools: Vec<PoolReport>,
}

impl Report {
    pub fn collect(event_loop: &EventLoop<Centre>, summary: RunSummary) -> Report {
        let facility = &event_loop.world().facility;
        Report {
            total_donors: facility.total_donors,
            total_blood_ml: facility.total_blood_ml,
            donors_arrived: facility.donors_arrived,
            donors_departed: facility.donors_departed,
            snacks_eaten: facility.snacks_eaten,
            snack_visible: facility.snack_visible,
            snack_reserve: facility.snack_reserve,
            stock_outs: facility.stock_outs,
            final_t: summary.final_t,
            events_processed: summary.events_processed,
            reached_horizon: summary.termination == Termination::Horizon,
            pools: event_loop.pools().map(PoolReport::from).collect(),
        }
    }

    pub fn pool(&self, name: &str) -> Option<&PoolReport> {
        self.pools.iter().find(|pool| pool.name == name)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Write one row per chair count of a staffing sweep. Failed runs keep their
/// row with empty counts so the chair column stays contiguous.
pub fn write_sweep_csv<P: AsRef<Path>>(
    path: P,
    results: &[(usize, Result<Report, String>)],
) -> Result<(), Error> {
    let path = path.as_ref();
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "chairs",
        "total_donors",
        "total_blood_ml",
        "donors_departed",
        "chair_mean_wait",
        "error",
    ])?;

    for (chairs, result) in results {
        let row = match result {
            Ok(report) => [
                chairs.to_string(),
                report.total_donors.to_string(),
                report.total_blood_ml.to_string(),
                report.donors_departed.to_string(),
                report
                    .pool("chair")
                    .and_then(|pool| pool.mean_wait)
                    .map(|minutes| minutes.to_string())
                    .unwrap_or_default(),
                String::new(),
            ],
            Err(message) => [
                chairs.to_string(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                message.clone(),
            ],
        };
        wtr.write_record(&row)?;
    }

    wtr.flush().map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total number of donors: {}", self.total_donors)?;
        writeln!(f, "Blood donated: {} mL", self.total_blood_ml)?;
        writeln!(
            f,
            "Donors arrived: {}, departed: {}",
            self.donors_arrived, self.donors_departed
        )?;
        writeln!(
            f,
            "Snacks eaten: {} (display {}, reserve {}, stock-outs {})",
            self.snacks_eaten, self.snack_visible, self.snack_reserve, self.stock_outs
        )?;
        writeln!(
            f,
            "{:<10} {:>8} {:>6} {:>7} {:>7} {:>10}",
            "pool", "capacity", "in use", "waiting", "grants", "mean wait"
        )?;
        for pool in &self.pools {
            let mean_wait = match pool.mean_wait {
                Some(minutes) => format!("{:.1}", minutes),
                None => "-".to_string(),
            };
            writeln!(
                f,
                "{:<10} {:>8} {:>6} {:>7} {:>7} {:>10}",
                pool.name, pool.capacity, pool.in_use, pool.waiting, pool.total_grants, mean_wait
            )?;
        }
        Ok(())
    }
}
