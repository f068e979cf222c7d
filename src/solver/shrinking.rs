//! Shrinking heuristic
//!
//! A variable sitting at a bound whose gradient points further into that
//! bound cannot be picked by the working-set rule. Once that has held for
//! `patience` consecutive checks the variable is moved behind the active
//! boundary. Nothing is discarded: shrunk variables keep their multiplier
//! and `G_bar` entry, and gradient reconstruction brings them back.

/// Position of a multiplier relative to its box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AlphaStatus {
    LowerBound,
    UpperBound,
    Free,
}

/// Largest violations seen over the active set at a shrinking check.
///
/// The standard solver uses a single pair of thresholds. The ν solver keeps
/// one pair per label sign because its two equality constraints decouple
/// the classes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ViolationBounds {
    Standard { gmax1: f64, gmax2: f64 },
    Nu { gmax1: f64, gmax2: f64, gmax3: f64, gmax4: f64 },
}

impl ViolationBounds {
    /// Violation gap implied by these bounds
    pub fn gap(&self) -> f64 {
        match *self {
            ViolationBounds::Standard { gmax1, gmax2 } => gmax1 + gmax2,
            ViolationBounds::Nu {
                gmax1,
                gmax2,
                gmax3,
                gmax4,
            } => f64::max(gmax1 + gmax2, gmax3 + gmax4),
        }
    }

    /// True if a variable with this status, sign and gradient cannot be
    /// part of a violating pair
    pub fn is_shrinkable(&self, status: AlphaStatus, sign: i8, g: f64) -> bool {
        let positive = sign > 0;
        match (*self, status) {
            (_, AlphaStatus::Free) => false,
            (ViolationBounds::Standard { gmax1, gmax2 }, AlphaStatus::UpperBound) => {
                -g > if positive { gmax1 } else { gmax2 }
            }
            (ViolationBounds::Standard { gmax1, gmax2 }, AlphaStatus::LowerBound) => {
                g > if positive { gmax2 } else { gmax1 }
            }
            (ViolationBounds::Nu { gmax1, gmax4, .. }, AlphaStatus::UpperBound) => {
                -g > if positive { gmax1 } else { gmax4 }
            }
            (ViolationBounds::Nu { gmax2, gmax3, .. }, AlphaStatus::LowerBound) => {
                g > if positive { gmax2 } else { gmax3 }
            }
        }
    }
}

/// Bookkeeping for the shrinking heuristic
#[derive(Debug)]
pub struct ShrinkingStrategy {
    /// Consecutive checks each position has been shrinkable
    streak: Vec<u32>,
    /// Checks required before a variable is shrunk
    patience: u32,
    /// Set once the full gradient has been rebuilt near convergence
    unshrunk: bool,
}

impl ShrinkingStrategy {
    /// Create a new shrinking strategy
    ///
    /// # Arguments
    /// * `n_variables` - Number of solver variables
    /// * `patience` - Consecutive shrinkable checks before removal (at least 1)
    pub fn new(n_variables: usize, patience: u32) -> Self {
        Self {
            streak: vec![0; n_variables],
            patience: patience.max(1),
            unshrunk: false,
        }
    }

    /// Record one check of the variable at position `i`; returns whether it
    /// should be shrunk now
    pub fn observe(&mut self, i: usize, shrinkable: bool) -> bool {
        if shrinkable {
            self.streak[i] = self.streak[i].saturating_add(1);
            self.streak[i] >= self.patience
        } else {
            self.streak[i] = 0;
            false
        }
    }

    /// Keep per-variable history aligned with the solver's permutation
    pub fn swap(&mut self, i: usize, j: usize) {
        self.streak.swap(i, j);
    }

    /// Returns true exactly once, the first time the gap comes within
    /// `10·eps`, at which point the solver must rebuild the full gradient
    /// and reactivate every variable
    pub fn should_unshrink(&mut self, gap: f64, eps: f64) -> bool {
        if !self.unshrunk && gap <= 10.0 * eps {
            self.unshrunk = true;
            self.reset_history();
            true
        } else {
            false
        }
    }

    /// Forget all streaks
    pub fn reset_history(&mut self) {
        self.streak.fill(0);
    }

    pub fn has_unshrunk(&self) -> bool {
        self.unshrunk
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shrinking_strategy_creation() {
        let strategy = ShrinkingStrategy::new(3, 2);
        assert_eq!(strategy.streak, vec![0, 0, 0]);
        assert_eq!(strategy.patience, 2);
        assert!(!strategy.has_unshrunk());

        assert_eq!(ShrinkingStrategy::new(1, 0).patience, 1);
    }

    #[test]
    fn test_observe_requires_consecutive_checks() {
        let mut strategy = ShrinkingStrategy::new(2, 2);

        assert!(!strategy.observe(0, true));
        assert!(!strategy.observe(0, false));
        assert!(!strategy.observe(0, true));
        assert!(strategy.observe(0, true));
        assert!(!strategy.observe(1, true));
    }

    #[test]
    fn test_swap_moves_history() {
        let mut strategy = ShrinkingStrategy::new(2, 2);
        strategy.observe(0, true);
        strategy.swap(0, 1);
        assert!(strategy.observe(1, true));
        assert!(!strategy.observe(0, true));
    }

    #[test]
    fn test_unshrink_happens_once() {
        let mut strategy = ShrinkingStrategy::new(2, 1);
        strategy.observe(0, true);

        assert!(!strategy.should_unshrink(1.0, 0.001));
        assert!(strategy.should_unshrink(0.005, 0.001));
        assert_eq!(strategy.streak, vec![0, 0]);
        assert!(!strategy.should_unshrink(0.0, 0.001));
    }

    #[test]
    fn test_standard_shrink_rule() {
        let bounds = ViolationBounds::Standard {
            gmax1: 0.5,
            gmax2: 0.2,
        };
        assert!((bounds.gap() - 0.7).abs() < 1e-12);

        // Positive at lower bound with gradient above -y·G max of the other side
        assert!(bounds.is_shrinkable(AlphaStatus::LowerBound, 1, 0.3));
        assert!(!bounds.is_shrinkable(AlphaStatus::LowerBound, 1, 0.1));
        assert!(bounds.is_shrinkable(AlphaStatus::UpperBound, -1, -0.3));
        assert!(!bounds.is_shrinkable(AlphaStatus::Free, 1, 100.0));
    }

    #[test]
    fn test_nu_shrink_rule_uses_class_thresholds() {
        let bounds = ViolationBounds::Nu {
            gmax1: 1.0,
            gmax2: 1.0,
            gmax3: 0.1,
            gmax4: 0.1,
        };
        assert!((bounds.gap() - 2.0).abs() < 1e-12);
        assert!(!bounds.is_shrinkable(AlphaStatus::LowerBound, 1, 0.5));
        assert!(bounds.is_shrinkable(AlphaStatus::LowerBound, -1, 0.5));
        assert!(bounds.is_shrinkable(AlphaStatus::UpperBound, -1, -0.5));
    }
}
