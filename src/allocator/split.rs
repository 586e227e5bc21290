//! Equal-return split and the cap / rounding arithmetic around it.
//!
//! Pure functions over `f64`. Nothing here draws randomness or logs.

use crate::types::{Limits, RoundingStep};

/// Split `capital` so that `a * odds_a == b * odds_b`.
///
/// Returns `(a, b)` with `a + b == capital`. Callers must have validated
/// the odds (see `AllocationInput::validate`).
pub fn equal_return_split(capital: f64, odds_a: f64, odds_b: f64) -> (f64, f64) {
    let a = capital / (1.0 + odds_a / odds_b);
    (a, capital - a)
}

/// Floor `amount` to a multiple of `step`. Never rounds up.
pub fn floor_to_step(amount: f64, step: RoundingStep) -> f64 {
    if !step.is_active() {
        return amount;
    }
    let step = f64::from(step.value());
    (amount / step).floor() * step
}

/// Clamp a single deposit to the per-book ceiling.
pub fn cap_per_book(deposit: f64) -> f64 {
    deposit.min(Limits::MAX_DEPOSIT_PER_BOOK)
}

/// Enforce the aggregate deposit ceiling.
///
/// When the pair exceeds `MAX_TOTAL_DEPOSIT`, both deposits are scaled by
/// the same factor and floored to whole units.
pub fn cap_total(deposit_a: f64, deposit_b: f64) -> (f64, f64) {
    let used = deposit_a + deposit_b;
    if used <= Limits::MAX_TOTAL_DEPOSIT {
        return (deposit_a, deposit_b);
    }
    let scale = Limits::MAX_TOTAL_DEPOSIT / used;
    ((deposit_a * scale).floor(), (deposit_b * scale).floor())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_equalizes_payout() {
        let (a, b) = equal_return_split(15_000.0, 1.60, 2.35);
        assert!((a * 1.60 - b * 2.35).abs() < 1e-6);
        assert!((a + b - 15_000.0).abs() < 1e-9);
        assert!((a - 8924.05).abs() < 0.01);
    }

    #[test]
    fn test_split_even_odds_is_half() {
        let (a, b) = equal_return_split(1000.0, 1.9, 1.9);
        assert_eq!(a, 500.0);
        assert_eq!(b, 500.0);
    }

    #[test]
    fn test_split_zero_capital() {
        let (a, b) = equal_return_split(0.0, 2.0, 3.0);
        assert_eq!(a, 0.0);
        assert_eq!(b, 0.0);
    }

    #[test]
    fn test_floor_to_step() {
        assert_eq!(floor_to_step(8861.7, RoundingStep::Ten), 8860.0);
        assert_eq!(floor_to_step(8861.7, RoundingStep::Fifty), 8850.0);
        assert_eq!(floor_to_step(8861.7, RoundingStep::Hundred), 8800.0);
        assert_eq!(floor_to_step(8861.7, RoundingStep::None), 8861.7);
    }

    #[test]
    fn test_floor_to_step_exact_multiple_unchanged() {
        assert_eq!(floor_to_step(500.0, RoundingStep::Fifty), 500.0);
    }

    #[test]
    fn test_cap_per_book() {
        assert_eq!(cap_per_book(20_000.0), 15_000.0);
        assert_eq!(cap_per_book(14_999.5), 14_999.5);
    }

    #[test]
    fn test_cap_total_below_limit_untouched() {
        assert_eq!(cap_total(10_000.0, 12_000.0), (10_000.0, 12_000.0));
    }

    #[test]
    fn test_cap_total_scales_and_floors() {
        let (a, b) = cap_total(15_000.0, 16_000.0);
        assert!(a + b <= Limits::MAX_TOTAL_DEPOSIT);
        assert_eq!(a, 14_516.0);
        assert_eq!(b, 15_483.0);
    }
}
