//! Capacity-bounded resource pools with FIFO hand-over

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{Process, SimError};

// Serials are unique across every loop in the process, so a token can never
// be mistaken for one granted by another simulation.
static NEXT_SERIAL: AtomicU64 = AtomicU64::new(0);

/// Handle to a pool registered with an `EventLoop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId(pub(crate) usize);

impl PoolId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One unit of pool capacity, held by the process it was granted to.
///
/// Deliberately not `Clone`: giving a token back to `Context::release` consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct Token {
    pool: PoolId,
    serial: u64,
}

impl Token {
    pub fn pool(&self) -> PoolId {
        self.pool
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }
}

/// Observable pool state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub capacity: usize,
    pub in_use: usize,
    pub waiting: usize,
    pub total_requests: usize,
    pub total_grants: usize,
    pub total_queued: usize,
    pub total_wait: usize,
    pub max_waiting: usize,
}

impl PoolStats {
    pub fn is_at_capacity(&self) -> bool {
        self.in_use == self.capacity
    }

    pub fn utilization(&self) -> f64 {
        self.in_use as f64 / self.capacity as f64
    }

    /// Mean time spent queueing by the requests that had to queue and were
    /// eventually served.
    pub fn mean_wait(&self) -> Option<f64> {
        let served = self.total_queued - self.waiting;
        if served == 0 {
            return None;
        }
        Some(self.total_wait as f64 / served as f64)
    }
}

pub struct Pool<W> {
    id: PoolId,
    name: String,
    capacity: usize,
    holders: HashSet<u64>,
    // (requested at, parked process)
    waiters: VecDeque<(usize, Box<dyn Process<W>>)>,
    total_requests: usize,
    total_grants: usize,
    total_queued: usize,
    total_wait: usize,
    max_waiting: usize,
}

impl<W> Pool<W> {
    pub(crate) fn new(id: PoolId, name: &str, capacity: usize) -> Result<Pool<W>, SimError> {
        if capacity == 0 {
            return Err(SimError::ZeroCapacity);
        }
        Ok(Pool {
            id,
            name: name.to_string(),
            capacity,
            holders: HashSet::new(),
            waiters: VecDeque::new(),
            total_requests: 0,
            total_grants: 0,
            total_queued: 0,
            total_wait: 0,
            max_waiting: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_use(&self) -> usize {
        self.holders.len()
    }

    pub fn waiting(&self) -> usize {
        self.waiters.len()
    }

    fn mint(&mut self) -> Token {
        let serial = NEXT_SERIAL.fetch_add(1, Ordering::Relaxed);
        self.holders.insert(serial);
        self.total_grants += 1;
        Token {
            pool: self.id,
            serial,
        }
    }

    /// Grant a token straight away if there is spare capacity and nobody is
    /// queued ahead.
    pub(crate) fn try_acquire(&mut self) -> Option<Token> {
        self.total_requests += 1;
        if self.in_use() < self.capacity && self.waiters.is_empty() {
            Some(self.mint())
        } else {
            None
        }
    }

    pub(crate) fn enqueue(&mut self, now: usize, process: Box<dyn Process<W>>) {
        self.waiters.push_back((now, process));
        self.total_queued += 1;
        self.max_waiting = self.max_waiting.max(self.waiters.len());
    }

    /// Take a token back. If anyone is queued the freed unit goes directly to
    /// the head of the queue, and that process is returned along with its
    /// fresh token so the caller can schedule it.
    pub(crate) fn release(
        &mut self,
        token: Token,
        now: usize,
    ) -> Result<Option<(Token, Box<dyn Process<W>>)>, SimError> {
        if token.pool != self.id || !self.holders.remove(&token.serial) {
            return Err(SimError::NotHeld {
                pool: self.id,
                serial: token.serial,
            });
        }

        match self.waiters.pop_front() {
            Some((requested_at, process)) => {
                self.total_wait += now - requested_at;
                let granted = self.mint();
                Ok(Some((granted, process)))
            }
            None => Ok(None),
        }
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.capacity,
            in_use: self.in_use(),
            waiting: self.waiting(),
            total_requests: self.total_requests,
            total_grants: self.total_grants,
            total_queued: self.total_queued,
            total_wait: self.total_wait,
            max_waiting: self.max_waiting,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Context, Step, Wake};

    struct Idle;

    impl Process<()> for Idle {
        fn resume(&mut self, _wake: Wake, _ctx: &mut Context<'_, ()>) -> Result<Step, SimError> {
            Ok(Step::Done)
        }
    }

    fn waiter_id(entry: Option<(Token, Box<dyn Process<()>>)>) -> Token {
        entry.map(|(token, _)| token).unwrap()
    }

    #[test]
    fn zero_capacity_rejected() {
        let pool = Pool::<()>::new(PoolId(0), "chairs", 0);
        assert_eq!(pool.err(), Some(SimError::ZeroCapacity));
    }

    #[test]
    fn grants_until_capacity() {
        let mut pool = Pool::<()>::new(PoolId(0), "chairs", 2).unwrap();

        let a = pool.try_acquire();
        let b = pool.try_acquire();
        let c = pool.try_acquire();

        assert!(a.is_some());
        assert!(b.is_some());
        assert!(c.is_none());
        assert_eq!(pool.in_use(), 2);
        assert!(pool.stats().is_at_capacity());
        assert_eq!(pool.stats().utilization(), 1.0);
    }

    #[test]
    fn release_without_waiters_frees_capacity() {
        let mut pool = Pool::<()>::new(PoolId(0), "chairs", 1).unwrap();
        let token = pool.try_acquire().unwrap();

        let handed_over = pool.release(token, 5).unwrap();

        assert!(handed_over.is_none());
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn release_hands_over_to_head_of_queue() {
        let mut pool = Pool::<()>::new(PoolId(0), "chairs", 1).unwrap();
        let token = pool.try_acquire().unwrap();
        assert!(pool.try_acquire().is_none());
        pool.enqueue(3, Box::new(Idle));
        assert!(pool.try_acquire().is_none());
        pool.enqueue(4, Box::new(Idle));

        let next = waiter_id(pool.release(token, 10).unwrap());

        // capacity moves straight across, in_use never dips
        assert_eq!(pool.in_use(), 1);
        assert_eq!(pool.waiting(), 1);
        assert_eq!(next.pool(), PoolId(0));

        let stats = pool.stats();
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.total_grants, 2);
        assert_eq!(stats.total_queued, 2);
        assert_eq!(stats.total_wait, 7);
        assert_eq!(stats.max_waiting, 2);
        assert_eq!(stats.mean_wait(), Some(7.0));
    }

    #[test]
    fn queued_requests_block_new_arrivals_even_with_spare_capacity() {
        let mut pool = Pool::<()>::new(PoolId(0), "rooms", 1).unwrap();
        let token = pool.try_acquire().unwrap();
        pool.enqueue(0, Box::new(Idle));

        let handed = waiter_id(pool.release(token, 1).unwrap());

        assert!(pool.try_acquire().is_none());
        assert!(pool.release(handed, 2).unwrap().is_none());
        assert!(pool.try_acquire().is_some());
    }

    #[test]
    fn foreign_token_is_rejected() {
        let mut ours = Pool::<()>::new(PoolId(0), "chairs", 1).unwrap();
        let mut theirs = Pool::<()>::new(PoolId(0), "chairs", 1).unwrap();
        let _held = ours.try_acquire().unwrap();
        let foreign = theirs.try_acquire().unwrap();
        let serial = foreign.serial();

        let result = ours.release(foreign, 0);

        assert_eq!(
            result.err(),
            Some(SimError::NotHeld {
                pool: PoolId(0),
                serial
            })
        );
        assert_eq!(ours.in_use(), 1);
    }

    #[test]
    fn token_for_other_pool_is_rejected() {
        let mut chairs = Pool::<()>::new(PoolId(0), "chairs", 1).unwrap();
        let mut rooms = Pool::<()>::new(PoolId(1), "rooms", 1).unwrap();
        let room = rooms.try_acquire().unwrap();

        assert!(chairs.release(room, 0).is_err());
    }
}
