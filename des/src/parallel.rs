//! Independent event loops run side by side
//!
//! Every scenario owns its own `EventLoop`, built, run and summarised on a
//! single rayon worker. Nothing is shared between scenarios, so each one is
//! exactly as deterministic as it would be on its own thread, and results come
//! back in scenario order regardless of thread count.
//!
//! # Example: a capacity sweep
//!
//! ```rust
//! use des::parallel::ParallelRunner;
//! use des::{EventLoop, SimError};
//!
//! let results = ParallelRunner::new(4, |scenario_id| {
//!     let mut event_loop = EventLoop::new(());
//!     event_loop.add_pool("desks", scenario_id + 1)?;
//!     Ok::<_, SimError>(event_loop)
//! })
//! .num_threads(2)
//! .run(100, |event_loop, _summary| event_loop.pools().map(|p| p.capacity()).sum::<usize>());
//!
//! let capacities: Vec<usize> = results.into_iter().map(|r| r.unwrap()).collect();
//! assert_eq!(capacities, vec![1, 2, 3, 4]);
//! ```
//!
//! A scenario that fails to build, returns a `SimError` from its run, or
//! panics is reported as `Err(String)`. The other scenarios carry on.

use std::any::Any;
use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::info;

use crate::{EventLoop, RunSummary, SimError};

type Progress = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Builds, runs and summarises many independent scenarios in parallel
///
/// `F` turns a scenario id into a ready-to-run `EventLoop<W>`.
pub struct ParallelRunner<W, F>
where
    F: Fn(usize) -> Result<EventLoop<W>, SimError> + Send + Sync,
{
    scenarios: usize,
    build: F,
    threads: Option<usize>,
    on_progress: Option<Progress>,
    _world: PhantomData<fn() -> W>,
}

impl<W, F> ParallelRunner<W, F>
where
    F: Fn(usize) -> Result<EventLoop<W>, SimError> + Send + Sync,
{
    pub fn new(scenarios: usize, build: F) -> Self {
        ParallelRunner {
            scenarios,
            build,
            threads: None,
            on_progress: None,
            _world: PhantomData,
        }
    }

    /// Use a dedicated pool of `n` threads instead of rayon's global one.
    pub fn num_threads(mut self, n: usize) -> Self {
        self.threads = Some(n);
        self
    }

    /// Called with `(finished, total)` after each scenario.
    pub fn progress<P>(mut self, callback: P) -> Self
    where
        P: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    fn run_one<R, X>(&self, scenario_id: usize, horizon: usize, extract: &X) -> Result<R, String>
    where
        X: Fn(&EventLoop<W>, RunSummary) -> R,
    {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let mut event_loop = (self.build)(scenario_id)?;
            let summary = event_loop.run_until(horizon)?;
            Ok::<R, SimError>(extract(&event_loop, summary))
        }));

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(format!("scenario {}: {}", scenario_id, err)),
            Err(panic) => Err(format!(
                "scenario {} panicked: {}",
                scenario_id,
                panic_message(panic.as_ref())
            )),
        }
    }

    /// Run every scenario to `horizon` and summarise it with `extract`.
    ///
    /// The event loop itself never leaves its worker; only the value returned
    /// by `extract` does.
    pub fn run<R, X>(self, horizon: usize, extract: X) -> Vec<Result<R, String>>
    where
        R: Send,
        X: Fn(&EventLoop<W>, RunSummary) -> R + Send + Sync,
    {
        let finished = AtomicUsize::new(0);
        let all = || -> Vec<Result<R, String>> {
            (0..self.scenarios)
                .into_par_iter()
                .map(|scenario_id| {
                    let result = self.run_one(scenario_id, horizon, &extract);
                    let done = finished.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(callback) = &self.on_progress {
                        callback(done, self.scenarios);
                    }
                    result
                })
                .collect()
        };

        match self.threads {
            None => all(),
            Some(n) => match rayon::ThreadPoolBuilder::new().num_threads(n).build() {
                Ok(pool) => pool.install(all),
                Err(err) => {
                    let message = format!("failed to create thread pool: {}", err);
                    (0..self.scenarios).map(|_| Err(message.clone())).collect()
                }
            },
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Progress callback that logs every `every` finished scenarios, and the last.
pub fn log_progress(every: usize) -> impl Fn(usize, usize) + Send + Sync {
    let every = every.max(1);
    move |finished, total| {
        if finished % every == 0 || finished == total {
            info!(finished, total, "scenarios finished");
        }
    }
}
