//! Shared counters of the centre

/// Result of moving snacks from the reserve onto the display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restocked {
    /// Display topped up to capacity.
    Full { moved: usize },
    /// Reserve ran dry before the display was full.
    StockOut { moved: usize },
    /// Nothing left in reserve to move.
    Empty,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacilityState {
    pub total_blood_ml: usize,
    /// Donors whose blood draw has finished.
    pub total_donors: usize,
    pub snack_visible: usize,
    pub snack_reserve: usize,

    pub donors_arrived: usize,
    pub donors_departed: usize,
    pub snacks_eaten: usize,
    pub stock_outs: usize,
}

impl FacilityState {
    pub fn new(snack_visible: usize, snack_reserve: usize) -> Self {
        FacilityState {
            snack_visible,
            snack_reserve,
            ..FacilityState::default()
        }
    }

    pub fn snack_stock(&self) -> usize {
        self.snack_visible + self.snack_reserve
    }

    pub fn snacks_exhausted(&self) -> bool {
        self.snack_stock() == 0
    }

    pub fn credit_donation(&mut self, blood_ml: usize) {
        self.total_blood_ml += blood_ml;
        self.total_donors += 1;
    }

    /// Take one snack off the display if there is one.
    pub fn eat_snack(&mut self) -> bool {
        if self.snack_visible == 0 {
            return false;
        }
        self.snack_visible -= 1;
        self.snacks_eaten += 1;
        true
    }

    pub fn restock(&mut self, display_capacity: usize) -> Restocked {
        let needed = display_capacity.saturating_sub(self.snack_visible);
        if self.snack_reserve >= needed {
            self.snack_visible += needed;
            self.snack_reserve -= needed;
            return Restocked::Full { moved: needed };
        }

        let moved = self.snack_reserve;
        if moved == 0 {
            return Restocked::Empty;
        }
        self.snack_visible += moved;
        self.snack_reserve = 0;
        self.stock_outs += 1;
        Restocked::StockOut { moved }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn donation_credits_volume_and_donor() {
        let mut state = FacilityState::new(8, 100);
        state.credit_donation(450);
        state.credit_donation(450);

        assert_eq!(state.total_blood_ml, 900);
        assert_eq!(state.total_donors, 2);
    }

    #[test]
    fn eating_only_from_display() {
        let mut state = FacilityState::new(1, 50);

        assert!(state.eat_snack());
        assert!(!state.eat_snack());
        assert_eq!(state.snack_visible, 0);
        assert_eq!(state.snack_reserve, 50);
        assert_eq!(state.snacks_eaten, 1);
    }

    #[test]
    fn restock_fills_display_from_ample_reserve() {
        let mut state = FacilityState::new(3, 100);

        let outcome = state.restock(8);

        assert_eq!(outcome, Restocked::Full { moved: 5 });
        assert_eq!(state.snack_visible, 8);
        assert_eq!(state.snack_reserve, 95);
    }

    #[test]
    fn restock_with_short_reserve_empties_it() {
        let mut state = FacilityState::new(2, 4);

        let outcome = state.restock(8);

        assert_eq!(outcome, Restocked::StockOut { moved: 4 });
        assert_eq!(state.snack_visible, 6);
        assert_eq!(state.snack_reserve, 0);
        assert_eq!(state.stock_outs, 1);
    }

    #[test]
    fn restock_with_empty_reserve_changes_nothing() {
        let mut state = FacilityState::new(2, 0);

        let outcome = state.restock(8);

        assert_eq!(outcome, Restocked::Empty);
        assert_eq!(state.snack_visible, 2);
        assert_eq!(state.stock_outs, 0);
    }

    #[test]
    fn restock_preserves_total_stock() {
        let mut state = FacilityState::new(1, 20);
        let before = state.snack_stock();

        state.restock(8);
        state.restock(8);

        assert_eq!(state.snack_stock(), before);
    }
}
