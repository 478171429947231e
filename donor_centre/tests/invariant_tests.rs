// Invariants checked minute by minute across a whole day
// The run is paused at every minute so the checks see every intermediate state

use donor_centre::{Centre, CentreConfig, MinuteRange, RestockPolicy, build};
use des::EventLoop;

fn assert_invariants(event_loop: &EventLoop<Centre>, initial_snacks: usize) {
    let t = event_loop.now();
    let centre = event_loop.world();
    let facility = &centre.facility;

    for pool in event_loop.pools() {
        assert!(
            pool.in_use() <= pool.capacity(),
            "t={}: {} over capacity",
            t,
            pool.name()
        );
        // nobody queues while a slot is free
        if pool.waiting() > 0 {
            assert_eq!(pool.in_use(), pool.capacity(), "t={}: {} idle queue", t, pool.name());
        }
    }

    assert_eq!(
        facility.snack_visible + facility.snack_reserve + facility.snacks_eaten,
        initial_snacks,
        "t={}: snacks appeared or vanished",
        t
    );
    assert!(facility.snack_visible <= centre.config.snack_display_capacity);
    assert_eq!(
        facility.total_blood_ml,
        facility.total_donors * centre.config.blood_per_donation_ml
    );
    assert!(facility.donors_departed <= facility.total_donors);
    assert!(facility.total_donors <= facility.donors_arrived);
}

fn walk_the_day(config: CentreConfig) {
    let initial_snacks = config.snack_display_capacity + config.snack_reserve;
    let horizon = config.horizon;
    let mut event_loop = build(config).unwrap();

    let mut last_t = 0;
    for t in 0..=horizon {
        event_loop.run_until(t).unwrap();
        assert!(event_loop.now() >= last_t, "clock moved backwards");
        assert_eq!(event_loop.now(), t);
        last_t = event_loop.now();
        assert_invariants(&event_loop, initial_snacks);
    }
}

#[test]
fn given_default_centre_when_walked_minute_by_minute_then_invariants_hold() {
    walk_the_day(CentreConfig::default());
}

#[test]
fn given_understaffed_centre_when_walked_then_queues_respect_capacity() {
    // GIVEN: fast arrivals and a single chair so every pool sees a queue
    walk_the_day(CentreConfig {
        chairs: 1,
        inter_arrival: MinuteRange::new(0, 4),
        ..CentreConfig::default()
    });
}

#[test]
fn given_scarce_snacks_when_walked_then_snacks_are_conserved() {
    walk_the_day(CentreConfig {
        snack_reserve: 5,
        snack_probability: 0.9,
        ..CentreConfig::default()
    });
}

#[test]
fn given_recurring_restock_when_walked_then_invariants_hold() {
    walk_the_day(CentreConfig {
        restock_policy: RestockPolicy::Recurring,
        snack_probability: 1.0,
        ..CentreConfig::default()
    });
}

#[test]
fn given_many_seeds_when_run_then_every_day_ends_consistently() {
    for seed in 0..20 {
        let config = CentreConfig {
            seed,
            ..CentreConfig::default()
        };
        let initial_snacks = config.snack_display_capacity + config.snack_reserve;
        let mut event_loop = build(config).unwrap();

        event_loop.run_until(540).unwrap();

        assert_invariants(&event_loop, initial_snacks);
    }
}
