//! Process-oriented discrete event simulation
//!
//! Each simulated actor is a [`Process`]: an explicit state machine that the
//! [`EventLoop`] resumes one step at a time. A step ends at one of two
//! suspension points, reported through [`Step`]:
//!
//! - `Step::Hold(delay)`: wake me up `delay` time units from now
//! - `Step::Acquire(pool)`: wake me up once I hold a token from `pool`
//!
//! Exactly one process runs at any moment. Shared state (the "world" `W` and
//! the resource pools) is lent to the running process through its
//! [`Context`], so mutation needs no locks.
//!
//! Events are ordered by `(time, sequence)`, where the sequence number is
//! assigned when the event is scheduled. Events due at the same time are
//! therefore processed in the order they were scheduled, and a run is fully
//! deterministic given deterministic processes.

mod error;
pub mod parallel;
mod pool;

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use tracing::trace;

pub use error::SimError;
pub use pool::{Pool, PoolId, PoolStats, Token};

/// Why a process is being resumed
#[derive(Debug, PartialEq, Eq)]
pub enum Wake {
    /// First resumption after being spawned.
    Start,
    /// A `Step::Hold` has elapsed.
    Elapsed,
    /// A `Step::Acquire` has been satisfied.
    Granted(Token),
}

impl fmt::Display for Wake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Wake::Start => write!(f, "start"),
            Wake::Elapsed => write!(f, "elapsed hold"),
            Wake::Granted(token) => write!(
                f,
                "grant of token #{} from pool {}",
                token.serial(),
                token.pool().index()
            ),
        }
    }
}

/// Where a process suspends after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Hold(usize),
    Acquire(PoolId),
    Done,
}

pub trait Process<W> {
    /// Run until the next suspension point.
    fn resume(&mut self, wake: Wake, ctx: &mut Context<'_, W>) -> Result<Step, SimError>;

    /// Label used in traces and errors.
    fn name(&self) -> String {
        "process".to_string()
    }
}

struct Event<W> {
    t: usize,
    seq: u64,
    wake: Wake,
    process: Box<dyn Process<W>>,
}

impl<W> PartialEq for Event<W> {
    fn eq(&self, other: &Self) -> bool {
        self.t == other.t && self.seq == other.seq
    }
}

impl<W> Eq for Event<W> {}

impl<W> Ord for Event<W> {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed: BinaryHeap is a max-heap
        other.t.cmp(&self.t).then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<W> PartialOrd for Event<W> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct Agenda<W> {
    queue: BinaryHeap<Event<W>>,
    next_seq: u64,
}

impl<W> Agenda<W> {
    fn new() -> Agenda<W> {
        Agenda {
            queue: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    fn push(&mut self, t: usize, wake: Wake, process: Box<dyn Process<W>>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Event {
            t,
            seq,
            wake,
            process,
        });
    }

    /// Schedule `delay` after `now`, refusing a due time past `usize::MAX`.
    fn push_after(
        &mut self,
        now: usize,
        delay: usize,
        wake: Wake,
        process: Box<dyn Process<W>>,
    ) -> Result<(), SimError> {
        let t = now
            .checked_add(delay)
            .ok_or(SimError::TimeOverflow { now, delay })?;
        self.push(t, wake, process);
        Ok(())
    }

    fn next_due(&self) -> Option<usize> {
        self.queue.peek().map(|event| event.t)
    }
}

/// What the running process can see and touch
pub struct Context<'a, W> {
    now: usize,
    world: &'a mut W,
    pools: &'a mut Vec<Pool<W>>,
    agenda: &'a mut Agenda<W>,
}

impl<W> Context<'_, W> {
    pub fn now(&self) -> usize {
        self.now
    }

    pub fn world(&self) -> &W {
        &*self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut *self.world
    }

    fn pool_mut(&mut self, id: PoolId) -> Result<&mut Pool<W>, SimError> {
        self.pools.get_mut(id.0).ok_or(SimError::UnknownPool(id))
    }

    /// Processes currently queued for `id`.
    pub fn waiting(&self, id: PoolId) -> Result<usize, SimError> {
        self.pools
            .get(id.0)
            .map(|pool| pool.waiting())
            .ok_or(SimError::UnknownPool(id))
    }

    pub fn in_use(&self, id: PoolId) -> Result<usize, SimError> {
        self.pools
            .get(id.0)
            .map(|pool| pool.in_use())
            .ok_or(SimError::UnknownPool(id))
    }

    /// Return a token to its pool. A queued process, if any, receives the
    /// freed capacity and is scheduled to resume at the current time.
    pub fn release(&mut self, token: Token) -> Result<(), SimError> {
        let now = self.now;
        let handed_over = self.pool_mut(token.pool())?.release(token, now)?;
        if let Some((granted, process)) = handed_over {
            self.agenda.push(now, Wake::Granted(granted), process);
        }
        Ok(())
    }

    /// Start a new process immediately. It runs up to its first suspension
    /// point before this call returns.
    pub fn spawn(&mut self, process: Box<dyn Process<W>>) -> Result<(), SimError> {
        drive(process, Wake::Start, self)
    }
}

/// Resume `process` repeatedly until it suspends or finishes.
fn drive<W>(
    mut process: Box<dyn Process<W>>,
    mut wake: Wake,
    ctx: &mut Context<'_, W>,
) -> Result<(), SimError> {
    loop {
        match process.resume(wake, ctx)? {
            Step::Hold(delay) => {
                return ctx.agenda.push_after(ctx.now, delay, Wake::Elapsed, process);
            }
            Step::Acquire(id) => {
                let now = ctx.now;
                let pool = ctx.pool_mut(id)?;
                match pool.try_acquire() {
                    // granted on the spot: same logical step, no event
                    Some(token) => wake = Wake::Granted(token),
                    None => {
                        pool.enqueue(now, process);
                        return Ok(());
                    }
                }
            }
            Step::Done => return Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The next pending event lies beyond the horizon.
    Horizon,
    /// Nothing left to do.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub events_processed: usize,
    pub final_t: usize,
    pub termination: Termination,
}

/// Pools registered before the world exists, see `EventLoop::with_pools`.
pub struct Pools<W>(Vec<Pool<W>>);

impl<W> Pools<W> {
    pub fn add(&mut self, name: &str, capacity: usize) -> Result<PoolId, SimError> {
        let id = PoolId(self.0.len());
        self.0.push(Pool::new(id, name, capacity)?);
        Ok(id)
    }
}

pub struct EventLoop<W> {
    agenda: Agenda<W>,
    current_t: usize,
    pools: Vec<Pool<W>>,
    world: W,
}

impl<W> EventLoop<W> {
    pub fn new(world: W) -> EventLoop<W> {
        EventLoop {
            agenda: Agenda::new(),
            current_t: 0,
            pools: Vec::new(),
            world,
        }
    }

    /// Register pools first, then build a world that holds their ids.
    pub fn with_pools<F, E>(build: F) -> Result<EventLoop<W>, E>
    where
        F: FnOnce(&mut Pools<W>) -> Result<W, E>,
    {
        let mut pools = Pools(Vec::new());
        let world = build(&mut pools)?;
        Ok(EventLoop {
            agenda: Agenda::new(),
            current_t: 0,
            pools: pools.0,
            world,
        })
    }

    pub fn add_pool(&mut self, name: &str, capacity: usize) -> Result<PoolId, SimError> {
        let id = PoolId(self.pools.len());
        self.pools.push(Pool::new(id, name, capacity)?);
        Ok(id)
    }

    pub fn now(&self) -> usize {
        self.current_t
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn pool(&self, id: PoolId) -> Result<&Pool<W>, SimError> {
        self.pools.get(id.0).ok_or(SimError::UnknownPool(id))
    }

    pub fn pools(&self) -> impl Iterator<Item = &Pool<W>> {
        self.pools.iter()
    }

    /// Number of scheduled events not yet processed.
    pub fn pending(&self) -> usize {
        self.agenda.queue.len()
    }

    /// Start `process` at the current time.
    pub fn spawn(&mut self, process: Box<dyn Process<W>>) {
        self.agenda.push(self.current_t, Wake::Start, process);
    }

    /// Start `process` `delay` time units from now.
    pub fn schedule_after(
        &mut self,
        delay: usize,
        process: Box<dyn Process<W>>,
    ) -> Result<(), SimError> {
        self.agenda.push_after(self.current_t, delay, Wake::Start, process)
    }

    /// Start `process` at absolute time `t`, which must not be in the past.
    pub fn schedule_at(&mut self, t: usize, process: Box<dyn Process<W>>) -> Result<(), SimError> {
        if t < self.current_t {
            return Err(SimError::InPast {
                at: t,
                now: self.current_t,
            });
        }
        self.agenda.push(t, Wake::Start, process);
        Ok(())
    }

    /// Process events in `(time, sequence)` order until the next one is due
    /// after `horizon` or the agenda runs dry.
    ///
    /// Processes still suspended when the horizon is reached are left where
    /// they are; a later call with a larger horizon carries on from there.
    pub fn run_until(&mut self, horizon: usize) -> Result<RunSummary, SimError> {
        let mut events_processed = 0;

        while let Some(next_t) = self.agenda.next_due() {
            if next_t > horizon {
                self.current_t = self.current_t.max(horizon);
                return Ok(RunSummary {
                    events_processed,
                    final_t: self.current_t,
                    termination: Termination::Horizon,
                });
            }

            let Some(event) = self.agenda.queue.pop() else {
                break;
            };
            debug_assert!(event.t >= self.current_t, "clock moved backwards");
            self.current_t = event.t;
            trace!(
                t = event.t,
                seq = event.seq,
                process = %event.process.name(),
                wake = %event.wake,
                "resume"
            );

            let mut ctx = Context {
                now: self.current_t,
                world: &mut self.world,
                pools: &mut self.pools,
                agenda: &mut self.agenda,
            };
            drive(event.process, event.wake, &mut ctx)?;
            events_processed += 1;
        }

        Ok(RunSummary {
            events_processed,
            final_t: self.current_t,
            termination: Termination::Exhausted,
        })
    }
}
