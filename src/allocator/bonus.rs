//! Deposit-matched bonus amounts and eligibility routing.
//!
//! Both books are gated by the same minimum-odds threshold. A bonus from
//! book A that cannot be staked on A moves to B when B qualifies; B's own
//! bonus always stakes on B.

use tracing::debug;

use crate::types::{AllocationInput, Book, Limits};

/// Bonus figures for a pair of final deposits.
#[derive(Debug, Clone, PartialEq)]
pub struct BonusRouting {
    pub amount_a: f64,
    pub amount_b: f64,
    pub stake_a: f64,
    pub stake_b: f64,
    pub diverted_a_to_b: f64,
    pub eligible_a: bool,
    pub eligible_b: bool,
}

impl BonusRouting {
    /// Bonus credit awarded across both books, before routing.
    pub fn total_amount(&self) -> f64 {
        self.amount_a + self.amount_b
    }

    /// Bonus actually staked across both books.
    pub fn total_stake(&self) -> f64 {
        self.stake_a + self.stake_b
    }
}

/// Bonus credit awarded for a deposit, capped at `MAX_BONUS`.
pub fn bonus_amount(deposit: f64, bonus_rate: f64) -> f64 {
    (deposit * bonus_rate).min(Limits::MAX_BONUS)
}

/// Compute bonus amounts from final deposits and route them to the books
/// where they may be staked.
pub fn route_bonuses(deposit_a: f64, deposit_b: f64, input: &AllocationInput) -> BonusRouting {
    let amount_a = bonus_amount(deposit_a, input.bonus_rate(Book::A));
    let amount_b = bonus_amount(deposit_b, input.bonus_rate(Book::B));

    let eligible_a = input.odds_a >= input.min_odds_for_bonus_a;
    let eligible_b = input.odds_b >= input.min_odds_for_bonus_a;

    let mut stake_a = 0.0;
    let mut stake_b = 0.0;
    let mut diverted_a_to_b = 0.0;

    if amount_a > 0.0 {
        if !eligible_a && eligible_b {
            diverted_a_to_b = amount_a;
            stake_b += amount_a;
        } else if eligible_a {
            stake_a = amount_a;
        }
    }

    // B's own bonus is not gated by its eligibility flag.
    if amount_b > 0.0 {
        stake_b += amount_b;
    }

    debug!(
        amount_a,
        amount_b,
        eligible_a,
        eligible_b,
        diverted_a_to_b,
        "Bonuses routed"
    );

    BonusRouting {
        amount_a,
        amount_b,
        stake_a,
        stake_b,
        diverted_a_to_b,
        eligible_a,
        eligible_b,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
