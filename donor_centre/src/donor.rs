//! Donor lifecycle process
//!
//! ```text
//! Arrived -> AwaitingCheckIn -> CheckingIn
//!         -> AwaitingTestRoom -> SecondTest
//!         -> AwaitingChair -> DrawingBlood
//!         -> Resting -> done
//! ```
//!
//! `Awaiting*` states are parked on a pool, every other non-terminal state is
//! a timed hold. A stage's token is released as soon as its work is done and
//! before the next pool is requested.

use des::{Context, PoolId, Process, SimError, Step, Token, Wake};
use tracing::{debug, info};

use crate::Centre;

/// Minutes of rest that give one chance at a snack.
pub const SNACK_INTERVAL: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Arrived,
    AwaitingCheckIn,
    CheckingIn,
    AwaitingTestRoom,
    SecondTest,
    AwaitingChair,
    DrawingBlood,
    Resting,
}

pub struct Donor {
    id: usize,
    stage: Stage,
    held: Option<Token>,
    rest_minutes: usize,
}

impl Donor {
    pub fn new(id: usize) -> Self {
        Donor {
            id,
            stage: Stage::Arrived,
            held: None,
            rest_minutes: 0,
        }
    }

    fn request(
        &mut self,
        ctx: &mut Context<'_, Centre>,
        pool: PoolId,
        station: &str,
        next: Stage,
    ) -> Result<Step, SimError> {
        let backlog = ctx.waiting(pool)?;
        if backlog > 0 {
            debug!(t = ctx.now(), donor = self.id, backlog, "{} backup", station);
        }
        self.stage = next;
        Ok(Step::Acquire(pool))
    }

    fn occupy(&mut self, token: Token, next: Stage, minutes: usize) -> Step {
        self.held = Some(token);
        self.stage = next;
        Step::Hold(minutes)
    }

    fn vacate(&mut self, ctx: &mut Context<'_, Centre>) -> Result<(), SimError> {
        match self.held.take() {
            Some(token) => ctx.release(token),
            None => Ok(()),
        }
    }

    fn snack(&self, centre: &mut Centre) {
        let p = centre.config.snack_probability;
        for _ in 0..self.rest_minutes / SNACK_INTERVAL {
            // the draw happens whether or not the display is empty
            if centre.rng.chance(p) {
                centre.facility.eat_snack();
            }
        }
    }
}

impl Process<Centre> for Donor {
    fn resume(&mut self, wake: Wake, ctx: &mut Context<'_, Centre>) -> Result<Step, SimError> {
        let stations = ctx.world().stations;

        match (self.stage, wake) {
            (Stage::Arrived, Wake::Start) => {
                info!(t = ctx.now(), donor = self.id, "donor arrived");
                ctx.world_mut().facility.donors_arrived += 1;
                self.request(ctx, stations.check_in, "computer", Stage::AwaitingCheckIn)
            }
            (Stage::AwaitingCheckIn, Wake::Granted(token)) => {
                let minutes = ctx.world().config.history_check_time;
                Ok(self.occupy(token, Stage::CheckingIn, minutes))
            }
            (Stage::CheckingIn, Wake::Elapsed) => {
                self.vacate(ctx)?;
                self.request(ctx, stations.test_room, "room", Stage::AwaitingTestRoom)
            }
            (Stage::AwaitingTestRoom, Wake::Granted(token)) => {
                let minutes = ctx.world().config.second_test_time;
                Ok(self.occupy(token, Stage::SecondTest, minutes))
            }
            (Stage::SecondTest, Wake::Elapsed) => {
                self.vacate(ctx)?;
                self.request(ctx, stations.chairs, "chair", Stage::AwaitingChair)
            }
            (Stage::AwaitingChair, Wake::Granted(token)) => {
                let centre = ctx.world_mut();
                let minutes = centre.rng.minutes(centre.config.bleed_time);
                debug!(t = ctx.now(), donor = self.id, minutes, "blood draw started");
                Ok(self.occupy(token, Stage::DrawingBlood, minutes))
            }
            (Stage::DrawingBlood, Wake::Elapsed) => {
                let centre = ctx.world_mut();
                let blood_ml = centre.config.blood_per_donation_ml;
                centre.facility.credit_donation(blood_ml);
                self.rest_minutes = centre.rng.minutes(centre.config.rest_time);
                self.vacate(ctx)?;
                self.stage = Stage::Resting;
                Ok(Step::Hold(self.rest_minutes))
            }
            (Stage::Resting, Wake::Elapsed) => {
                let centre = ctx.world_mut();
                self.snack(centre);
                centre.facility.donors_departed += 1;
                info!(t = ctx.now(), donor = self.id, "donor left");
                Ok(Step::Done)
            }
            (stage, wake) => Err(SimError::UnexpectedWake {
                process: self.name(),
                state: format!("{:?}", stage),
                wake: wake.to_string(),
            }),
        }
    }

    fn name(&self) -> String {
        format!("donor {}", self.id)
    }
}
