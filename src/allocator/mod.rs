//! Allocator: bonus-aware equal-return stake planning across two books.
//!
//! Turns an `AllocationInput` into a `StakePlan` whose stakes pay out the
//! same amount whichever outcome occurs, subject to the per-book and
//! aggregate deposit ceilings, the bonus cap, and floor rounding.

pub mod bonus;
pub mod random;
pub mod split;

use tracing::{debug, info};

use crate::types::{AllocationInput, Book, Limits, RoundingStep, StakeError, StakePlan};
use bonus::{route_bonuses, BonusRouting};
use random::{RandomSource, SystemRandom};
use split::{cap_per_book, cap_total, equal_return_split, floor_to_step};

// ---------------------------------------------------------------------------
// Allocator
// ---------------------------------------------------------------------------

/// Plans deposits and stakes. Holds the random source used by random mode.
pub struct Allocator<R: RandomSource = SystemRandom> {
    rng: R,
}

impl Allocator<SystemRandom> {
    /// Allocator drawing random-mode choices from OS entropy.
    pub fn with_entropy() -> Self {
        Self::new(SystemRandom::new())
    }
}

impl<R: RandomSource> Allocator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Compute a fresh stake plan for the given input.
    ///
    /// Steps:
    /// 1. Equal-return split of the budget.
    /// 2. Floor both deposits to the rounding step (drawn in random mode).
    /// 3. Clamp each deposit to the per-book ceiling.
    /// 4. Redistribute unused budget along the initial split ratio.
    /// 5. Scale down to the aggregate ceiling.
    /// 6–7. Compute bonuses and route them by eligibility.
    /// 8. Re-split deposits plus staked bonus for equal return.
    /// 9. Floor the stakes.
    /// 10. Jitter the stakes in random mode.
    /// 11. Payouts, guaranteed return and profit.
    pub fn allocate(&mut self, input: &AllocationInput) -> Result<StakePlan, StakeError> {
        input.validate()?;

        let budget = input.budget;
        let (step, distribute, jitter_enabled) = if input.random_mode {
            let step = self.rng.rounding_step();
            let distribute = self.rng.redistribute_leftover();
            (step, distribute, true)
        } else {
            (input.rounding_step, true, false)
        };

        // Steps 1–3
        let (raw_a, raw_b) = equal_return_split(budget, input.odds_a, input.odds_b);
        let mut deposit_a = cap_per_book(floor_to_step(raw_a, step));
        let mut deposit_b = cap_per_book(floor_to_step(raw_b, step));

        let mut used = deposit_a + deposit_b;
        let mut leftover = (budget - used).max(0.0);

        debug!(raw_a, raw_b, deposit_a, deposit_b, leftover, step = %step, "Base split");

        // Step 4
        if leftover > 0.0 && distribute {
            let add_a = floor_to_step(leftover * (raw_a / budget), step);
            let add_b = floor_to_step(leftover * (raw_b / budget), step);

            deposit_a = cap_per_book(deposit_a + add_a);
            deposit_b = cap_per_book(deposit_b + add_b);

            used = deposit_a + deposit_b;
            leftover = (budget - used).max(0.0);

            debug!(add_a, add_b, deposit_a, deposit_b, leftover, "Leftover redistributed");
        }

        // Step 5
        if used > Limits::MAX_TOTAL_DEPOSIT {
            (deposit_a, deposit_b) = cap_total(deposit_a, deposit_b);
            used = deposit_a + deposit_b;
            leftover = budget - used;
            debug!(deposit_a, deposit_b, "Scaled to aggregate deposit ceiling");
        }

        // Steps 6–8
        let routing = route_bonuses(deposit_a, deposit_b, input);
        let capital = used + routing.total_stake();
        let (rebalanced_a, rebalanced_b) = equal_return_split(capital, input.odds_a, input.odds_b);

        // Step 9
        let mut stake_a = floor_to_step(rebalanced_a, step);
        let mut stake_b = floor_to_step(rebalanced_b, step);

        // Step 10
        let mut jitter_a = 0.0;
        let mut jitter_b = 0.0;
        if jitter_enabled && step.is_active() {
            let step_size = f64::from(step.value());
            jitter_a = self.rng.jitter(step_size.min(stake_a.max(0.0)));
            jitter_b = self.rng.jitter(step_size.min(stake_b.max(0.0)));

            stake_a = (stake_a - jitter_a).max(0.0);
            stake_b = (stake_b - jitter_b).max(0.0);

            let recovered = recovered_cash(jitter_a, jitter_b, deposit_b, &routing, input);
            leftover = (leftover + recovered).min(budget - used).max(0.0);

            debug!(jitter_a, jitter_b, recovered, leftover, "Jitter applied");
        }

        let plan = finish_plan(
            input,
            PlanDraft {
                rounding_step: step,
                distributed_leftover: distribute,
                jitter_enabled,
                jitter_a,
                jitter_b,
                deposit_a,
                deposit_b,
                leftover,
                stake_a,
                stake_b,
            },
            &routing,
        );

        info!(
            deposit_a = format!("{:.2}", plan.deposit_a),
            deposit_b = format!("{:.2}", plan.deposit_b),
            stake_a = format!("{:.2}", plan.stake_a),
            stake_b = format!("{:.2}", plan.stake_b),
            guaranteed = format!("{:.2}", plan.guaranteed),
            profit = format!("{:.2}", plan.profit),
            random_mode = plan.random_mode,
            "Stake plan computed"
        );

        Ok(plan)
    }

    /// Rebuild a plan around deposits the user actually placed.
    ///
    /// Deposits are re-checked against the ceilings, bonuses are recomputed
    /// and the stakes rebalanced. No rounding, redistribution or jitter.
    pub fn reallocate(
        &self,
        deposit_a: f64,
        deposit_b: f64,
        input: &AllocationInput,
    ) -> Result<StakePlan, StakeError> {
        input.validate()?;
        if !deposit_a.is_finite() || !deposit_b.is_finite() {
            return Err(StakeError::Configuration(format!(
                "Deposits must be finite numbers (got {deposit_a} / {deposit_b})"
            )));
        }

        let (deposit_a, deposit_b) = cap_total(cap_per_book(deposit_a), cap_per_book(deposit_b));

        let fixed = AllocationInput {
            rounding_step: RoundingStep::None,
            random_mode: false,
            ..input.clone()
        };
        let routing = route_bonuses(deposit_a, deposit_b, &fixed);
        let used = deposit_a + deposit_b;
        let (stake_a, stake_b) =
            equal_return_split(used + routing.total_stake(), fixed.odds_a, fixed.odds_b);

        let plan = finish_plan(
            &fixed,
            PlanDraft {
                rounding_step: RoundingStep::None,
                distributed_leftover: false,
                jitter_enabled: false,
                jitter_a: 0.0,
                jitter_b: 0.0,
                deposit_a,
                deposit_b,
                leftover: (fixed.budget - used).max(0.0),
                stake_a,
                stake_b,
            },
            &routing,
        );

        info!(
            deposit_a = format!("{:.2}", plan.deposit_a),
            deposit_b = format!("{:.2}", plan.deposit_b),
            guaranteed = format!("{:.2}", plan.guaranteed),
            profit_on_used = format!("{:.2}", plan.profit_on_used),
            "Stake plan rebuilt from deposits"
        );

        Ok(plan)
    }
}

// ---------------------------------------------------------------------------
// Jitter recovery
// ---------------------------------------------------------------------------

/// Cash share of the stake removed by jitter.
///
/// Each book's jitter is divided by that book's bonus multiplier: `1 + rateA`
/// when A's bonus is staked on A, and `1 + rateB + bonusStakeB / depositB`
/// for B. The B term counts the rate twice when the staked bonus is B's own;
/// that formula is kept as is. A non-positive B deposit drops the ratio term.
pub fn recovered_cash(
    jitter_a: f64,
    jitter_b: f64,
    deposit_b: f64,
    routing: &BonusRouting,
    input: &AllocationInput,
) -> f64 {
    let divisor_a = if routing.eligible_a {
        1.0 + input.bonus_rate(Book::A)
    } else {
        1.0
    };
    let deposit_ratio_b = if deposit_b > 0.0 {
        routing.stake_b / deposit_b
    } else {
        0.0
    };
    let divisor_b = 1.0 + input.bonus_rate(Book::B) + deposit_ratio_b;

    jitter_a / divisor_a + jitter_b / divisor_b
}

// ---------------------------------------------------------------------------
// Plan assembly
// ---------------------------------------------------------------------------

struct PlanDraft {
    rounding_step: RoundingStep,
    distributed_leftover: bool,
    jitter_enabled: bool,
    jitter_a: f64,
    jitter_b: f64,
    deposit_a: f64,
    deposit_b: f64,
    leftover: f64,
    stake_a: f64,
    stake_b: f64,
}

/// Step 11: payouts and profit, then assemble the immutable plan.
fn finish_plan(input: &AllocationInput, draft: PlanDraft, routing: &BonusRouting) -> StakePlan {
    let payout_a = draft.stake_a * input.odds_a;
    let payout_b = draft.stake_b * input.odds_b;
    let guaranteed = payout_a.min(payout_b);
    let used_capital = draft.deposit_a + draft.deposit_b;

    StakePlan {
        random_mode: input.random_mode,
        rounding_step: draft.rounding_step,
        distributed_leftover: draft.distributed_leftover,
        jitter_enabled: draft.jitter_enabled,
        jitter_a: draft.jitter_a,
        jitter_b: draft.jitter_b,
        deposit_a: draft.deposit_a,
        deposit_b: draft.deposit_b,
        bonus_amount_a: routing.amount_a,
        bonus_amount_b: routing.amount_b,
        bonus_stake_a: routing.stake_a,
        bonus_stake_b: routing.stake_b,
        bonus_percent_a: input.bonus_percent_a,
        bonus_percent_b: input.bonus_percent_b,
        total_bonus: routing.total_amount(),
        leftover: draft.leftover,
        stake_a: draft.stake_a,
        stake_b: draft.stake_b,
        bonus_a_diverted_to_b: routing.diverted_a_to_b,
        can_use_bonus_on_a: routing.eligible_a,
        can_use_bonus_on_b: routing.eligible_b,
        min_odds_for_bonus_a: input.min_odds_for_bonus_a,
        payout_a,
        payout_b,
        guaranteed,
        profit: guaranteed - input.budget,
        profit_on_used: guaranteed - used_capital,
        used_capital,
        budget: input.budget,
        odds_a: input.odds_a,
        odds_b: input.odds_b,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
