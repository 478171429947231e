//! Snack bar restocking
//!
//! A restock routine waits `restock_delay` minutes and then tops the display
//! up from the reserve. When the reserve cannot cover the gap it is emptied
//! onto the display and the stock-out is logged.

use des::{Context, Process, SimError, Step, Wake};
use tracing::{debug, info};

use crate::Centre;
use crate::facility::Restocked;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Restock once, then finish.
    OneShot,
    /// Restock every `restock_delay` minutes until there is nothing left.
    Recurring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Waiting,
}

pub struct Restock {
    mode: Mode,
    state: State,
}

impl Restock {
    pub fn one_shot() -> Self {
        Restock {
            mode: Mode::OneShot,
            state: State::Idle,
        }
    }

    pub fn recurring() -> Self {
        Restock {
            mode: Mode::Recurring,
            state: State::Idle,
        }
    }

    fn wait(&mut self, ctx: &Context<'_, Centre>) -> Step {
        self.state = State::Waiting;
        Step::Hold(ctx.world().config.restock_delay)
    }
}

impl Process<Centre> for Restock {
    fn resume(&mut self, wake: Wake, ctx: &mut Context<'_, Centre>) -> Result<Step, SimError> {
        match (self.state, wake) {
            (State::Idle, Wake::Start) => {
                if ctx.world().facility.snacks_exhausted() {
                    debug!(t = ctx.now(), "no snacks left to restock");
                    return Ok(Step::Done);
                }
                Ok(self.wait(ctx))
            }
            (State::Waiting, Wake::Elapsed) => {
                let centre = ctx.world_mut();
                let capacity = centre.config.snack_display_capacity;
                match centre.facility.restock(capacity) {
                    Restocked::Full { moved } => {
                        debug!(t = ctx.now(), moved, "snack display restocked");
                    }
                    Restocked::StockOut { moved } => {
                        info!(t = ctx.now(), moved, "snacks out of stock");
                    }
                    Restocked::Empty => {}
                }

                if self.mode == Mode::OneShot || ctx.world().facility.snacks_exhausted() {
                    return Ok(Step::Done);
                }
                Ok(self.wait(ctx))
            }
            (state, wake) => Err(SimError::UnexpectedWake {
                process: self.name(),
                state: format!("{:?}", state),
                wake: wake.to_string(),
            }),
        }
    }

    fn name(&self) -> String {
        match self.mode {
            Mode::OneShot => "restock".to_string(),
            Mode::Recurring => "recurring restock".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CentreConfig, FacilityState, open};
    use des::{EventLoop, Termination};

    fn snack_bar(visible: usize, reserve: usize) -> EventLoop<Centre> {
        let mut event_loop = open(CentreConfig::default()).unwrap();
        event_loop.world_mut().facility = FacilityState::new(visible, reserve);
        event_loop
    }

    #[test]
    fn nothing_left_means_no_wait() {
        let mut event_loop = snack_bar(0, 0);
        event_loop.spawn(Box::new(Restock::one_shot()));

        let summary = event_loop.run_until(100).unwrap();

        assert_eq!(summary.events_processed, 1);
        assert_eq!(summary.final_t, 0);
        assert_eq!(summary.termination, Termination::Exhausted);
    }

    #[test]
    fn one_shot_tops_up_after_delay() {
        let mut event_loop = snack_bar(3, 100);
        event_loop.spawn(Box::new(Restock::one_shot()));

        event_loop.run_until(9).unwrap();
        assert_eq!(event_loop.world().facility.snack_visible, 3);

        event_loop.run_until(10).unwrap();
        let facility = &event_loop.world().facility;
        assert_eq!(facility.snack_visible, 8);
        assert_eq!(facility.snack_reserve, 95);
        assert_eq!(event_loop.pending(), 0);
    }

    #[test]
    fn one_shot_with_short_reserve_records_stock_out() {
        let mut event_loop = snack_bar(0, 5);
        event_loop.spawn(Box::new(Restock::one_shot()));

        event_loop.run_until(10).unwrap();

        let facility = &event_loop.world().facility;
        assert_eq!(facility.snack_visible, 5);
        assert_eq!(facility.snack_reserve, 0);
        assert_eq!(facility.stock_outs, 1);
    }

    #[test]
    fn recurring_restocks_every_delay() {
        let mut event_loop = snack_bar(8, 100);
        event_loop.spawn(Box::new(Restock::recurring()));

        event_loop.run_until(5).unwrap();
        event_loop.world_mut().facility.snack_visible = 0;
        event_loop.run_until(10).unwrap();
        assert_eq!(event_loop.world().facility.snack_visible, 8);
        assert_eq!(event_loop.world().facility.snack_reserve, 92);

        event_loop.world_mut().facility.snack_visible = 2;
        event_loop.run_until(20).unwrap();
        assert_eq!(event_loop.world().facility.snack_visible, 8);
        assert_eq!(event_loop.world().facility.snack_reserve, 86);
        assert_eq!(event_loop.pending(), 1);
    }

    #[test]
    fn recurring_stops_once_everything_is_gone() {
        let mut event_loop = snack_bar(0, 5);
        event_loop.spawn(Box::new(Restock::recurring()));

        event_loop.run_until(10).unwrap();
        assert_eq!(event_loop.world().facility.snack_visible, 5);
        assert_eq!(event_loop.pending(), 1);

        event_loop.world_mut().facility.snack_visible = 0;
        let summary = event_loop.run_until(100).unwrap();

        assert_eq!(summary.termination, Termination::Exhausted);
        assert_eq!(summary.final_t, 20);
        assert_eq!(event_loop.world().facility.stock_outs, 1);
    }
}
