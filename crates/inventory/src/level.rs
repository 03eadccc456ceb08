use serde::{Deserialize, Serialize};

/// Per-product stock counters.
///
/// Invariant: `allocated <= on_hand` at all times. `available()` is the only
/// quantity shoppers ever see.
///
/// Each mutator is a conditional update that either applies fully or leaves
/// the level untouched; ledger implementations run them under their row lock
/// (or express them as a single conditional SQL UPDATE) so they are atomic.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    on_hand: u64,
    allocated: u64,
}

impl StockLevel {
    pub fn new(on_hand: u64) -> Self {
        Self {
            on_hand,
            allocated: 0,
        }
    }

    /// Physical stock quantity.
    pub fn on_hand(&self) -> u64 {
        self.on_hand
    }

    /// Quantity provisionally committed to unpaid/unconfirmed orders.
    pub fn allocated(&self) -> u64 {
        self.allocated
    }

    /// Quantity that can still be sold right now.
    pub fn available(&self) -> u64 {
        self.on_hand - self.allocated
    }

    /// Restock arrival: raise `on_hand` by `qty`.
    pub fn receive(&mut self, qty: u64) {
        self.on_hand = self.on_hand.saturating_add(qty);
    }

    /// Provisionally hold `qty` iff it fits within `on_hand`.
    ///
    /// Returns false with no mutation otherwise.
    #[must_use]
    pub fn try_allocate(&mut self, qty: u64) -> bool {
        match self.allocated.checked_add(qty) {
            Some(next) if next <= self.on_hand => {
                self.allocated = next;
                true
            }
            _ => false,
        }
    }

    /// Convert `qty` of held stock into a permanent deduction.
    ///
    /// Succeeds only if both counters cover `qty`.
    #[must_use]
    pub fn try_commit(&mut self, qty: u64) -> bool {
        if self.allocated >= qty && self.on_hand >= qty {
            self.allocated -= qty;
            self.on_hand -= qty;
            true
        } else {
            false
        }
    }

    /// Reverse a hold without consuming stock.
    ///
    /// Guarded by `allocated >= qty`; a no-match is silently ignored, which
    /// makes redundant releases harmless.
    pub fn release(&mut self, qty: u64) {
        if self.allocated >= qty {
            self.allocated -= qty;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_within_on_hand() {
        let mut level = StockLevel::new(5);
        assert!(level.try_allocate(5));
        assert_eq!(level.allocated(), 5);
        assert_eq!(level.available(), 0);

        // Nothing left for a sixth unit.
        assert!(!level.try_allocate(1));
        assert_eq!(level.allocated(), 5);
    }

    #[test]
    fn commit_consumes_both_counters() {
        let mut level = StockLevel::new(5);
        assert!(level.try_allocate(5));
        assert!(level.try_commit(5));
        assert_eq!(level.on_hand(), 0);
        assert_eq!(level.allocated(), 0);
    }

    #[test]
    fn commit_requires_allocation() {
        let mut level = StockLevel::new(5);
        assert!(!level.try_commit(1));
        assert_eq!(level.on_hand(), 5);
    }

    #[test]
    fn release_is_clamped() {
        let mut level = StockLevel::new(5);
        assert!(level.try_allocate(3));
        level.release(3);
        assert_eq!(level.allocated(), 0);
        assert_eq!(level.on_hand(), 5);

        // Redundant release is a no-op, never an underflow.
        level.release(3);
        assert_eq!(level.allocated(), 0);
    }

    #[test]
    fn allocate_overflow_is_rejected() {
        let mut level = StockLevel::new(u64::MAX);
        assert!(level.try_allocate(u64::MAX));
        assert!(!level.try_allocate(1));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Receive(u64),
            Allocate(u64),
            Commit(u64),
            Release(u64),
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0u64..1000).prop_map(Op::Receive),
                (0u64..1000).prop_map(Op::Allocate),
                (0u64..1000).prop_map(Op::Commit),
                (0u64..1000).prop_map(Op::Release),
            ]
        }

        proptest! {
            /// Property: no sequence of ledger operations can ever drive
            /// `allocated` above `on_hand`.
            #[test]
            fn allocated_never_exceeds_on_hand(
                initial in 0u64..1000,
                ops in proptest::collection::vec(op_strategy(), 0..64)
            ) {
                let mut level = StockLevel::new(initial);
                for op in ops {
                    match op {
                        Op::Receive(q) => level.receive(q),
                        Op::Allocate(q) => { let _ = level.try_allocate(q); }
                        Op::Commit(q) => { let _ = level.try_commit(q); }
                        Op::Release(q) => level.release(q),
                    }
                    prop_assert!(level.allocated() <= level.on_hand());
                }
            }

            /// Property: a successful allocate followed by a release restores
            /// both counters exactly.
            #[test]
            fn allocate_release_round_trips(
                initial in 0u64..1000,
                qty in 0u64..1000
            ) {
                let mut level = StockLevel::new(initial);
                let before = level;
                if level.try_allocate(qty) {
                    level.release(qty);
                    prop_assert_eq!(level, before);
                }
            }
        }
    }
}
