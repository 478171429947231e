//! Errors raised by the event loop and its resource pools

use crate::PoolId;

/// Programming errors detected while scheduling or driving processes.
///
/// None of these are recoverable inside a run: `EventLoop::run_until` stops at
/// the first one and hands it back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    #[error("pool capacity must be at least 1")]
    ZeroCapacity,

    #[error("no pool with id {0:?}")]
    UnknownPool(PoolId),

    /// Released a token the pool has no record of granting (already released,
    /// or minted by a different event loop).
    #[error("pool {pool:?} does not hold token #{serial}")]
    NotHeld { pool: PoolId, serial: u64 },

    #[error("cannot schedule at t={at}, clock is already at t={now}")]
    InPast { at: usize, now: usize },

    /// `now + delay` does not fit in the clock.
    #[error("delay of {delay} from t={now} overflows the clock")]
    TimeOverflow { now: usize, delay: usize },

    /// A process was resumed with a wake-up it was not waiting for.
    #[error("process {process} in state {state} cannot handle {wake}")]
    UnexpectedWake {
        process: String,
        state: String,
        wake: String,
    },
}
