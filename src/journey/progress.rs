//! Progress tracking against a stake plan.
//!
//! Compares what a `JourneyLog` records with the targets of a `StakePlan`
//! and derives the single next action the user should take.

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::JourneyLog;
use crate::types::{Book, StakePlan};

/// Slack (in currency units) absorbing rounding residue from the allocator.
pub const COMPLETION_TOLERANCE: f64 = 1.0;

// ---------------------------------------------------------------------------
// Per-book progress
// ---------------------------------------------------------------------------

/// How far one book is from its planned deposit, bonus and total stake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookProgress {
    pub book: Book,
    pub target_deposit: f64,
    pub target_bonus: f64,
    pub target_stake: f64,
    pub total_deposit: f64,
    pub total_bonus: f64,
    pub total_placed: f64,
    pub deposit_remaining: f64,
    pub bonus_remaining: f64,
    pub total_remaining: f64,
    pub is_deposit_complete: bool,
    pub is_bonus_complete: bool,
    pub is_complete: bool,
}

impl fmt::Display for BookProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: placed {:.2}/{:.2} (deposit {:.2}/{:.2}, bonus {:.2}/{:.2}){}",
            self.book,
            self.total_placed,
            self.target_stake,
            self.total_deposit,
            self.target_deposit,
            self.total_bonus,
            self.target_bonus,
            if self.is_complete { " ✓" } else { "" },
        )
    }
}

// ---------------------------------------------------------------------------
// Recommendation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendationKind {
    /// Place the remaining planned deposit.
    Deposit,
    /// Stake the remaining bonus credit.
    Bonus,
    /// Cover the remaining shortfall with extra deposit.
    TopUp,
}

/// The single next action for the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub book: Book,
    pub kind: RecommendationKind,
    pub amount: f64,
    /// Total stake the book should reach.
    pub target_stake: f64,
}

impl Recommendation {
    /// Whether the action is paid from deposit (as opposed to bonus credit).
    pub fn is_deposit(&self) -> bool {
        !matches!(self.kind, RecommendationKind::Bonus)
    }

    pub fn message(&self) -> String {
        match self.kind {
            RecommendationKind::Deposit => format!(
                "Place {:.0} deposit on {} to reach {:.0} total",
                self.amount, self.book, self.target_stake
            ),
            RecommendationKind::Bonus => format!(
                "Use {:.0} bonus on {} to reach {:.0} total",
                self.amount, self.book, self.target_stake
            ),
            RecommendationKind::TopUp => format!(
                "Add {:.0} more to {} to reach {:.0} total",
                self.amount, self.book, self.target_stake
            ),
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Full progress snapshot for a journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyReport {
    pub book_a: BookProgress,
    pub book_b: BookProgress,
    pub recommendation: Option<Recommendation>,
    pub total_target: f64,
    pub total_placed: f64,
    pub total_remaining: f64,
    pub all_complete: bool,
}

impl fmt::Display for JourneyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.book_a)?;
        writeln!(f, "{}", self.book_b)?;
        write!(
            f,
            "Total placed {:.2}/{:.2} (remaining {:.2})",
            self.total_placed, self.total_target, self.total_remaining,
        )?;
        match &self.recommendation {
            Some(rec) => write!(f, "\nNext: {rec}"),
            None if self.all_complete => write!(f, "\nAll bets placed."),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Evaluates a journey log against one plan.
pub struct ProgressTracker<'a> {
    plan: &'a StakePlan,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(plan: &'a StakePlan) -> Self {
        Self { plan }
    }

    pub fn book_progress(&self, log: &JourneyLog, book: Book) -> BookProgress {
        let state = log.book(book);
        let target_deposit = self.plan.deposit(book);
        let target_bonus = self.plan.bonus_stake(book);
        let target_stake = self.plan.stake(book);

        let total_deposit = state.total_deposit.to_f64().unwrap_or(0.0);
        let total_bonus = state.total_bonus.to_f64().unwrap_or(0.0);
        let total_placed = total_deposit + total_bonus;

        BookProgress {
            book,
            target_deposit,
            target_bonus,
            target_stake,
            total_deposit,
            total_bonus,
            total_placed,
            deposit_remaining: (target_deposit - total_deposit).max(0.0),
            bonus_remaining: (target_bonus - total_bonus).max(0.0),
            total_remaining: (target_stake - total_placed).max(0.0),
            is_deposit_complete: total_deposit >= target_deposit - COMPLETION_TOLERANCE,
            is_bonus_complete: target_bonus == 0.0
                || total_bonus >= target_bonus - COMPLETION_TOLERANCE,
            is_complete: total_placed >= target_stake - COMPLETION_TOLERANCE,
        }
    }

    /// Next action, checking book A before book B. `None` once both are complete.
    pub fn recommendation(&self, log: &JourneyLog) -> Option<Recommendation> {
        Book::ALL
            .iter()
            .map(|&book| self.book_progress(log, book))
            .find_map(|progress| recommend_for(&progress))
    }

    pub fn report(&self, log: &JourneyLog) -> JourneyReport {
        let book_a = self.book_progress(log, Book::A);
        let book_b = self.book_progress(log, Book::B);
        let recommendation = recommend_for(&book_a).or_else(|| recommend_for(&book_b));

        let total_target = self.plan.total_stake();
        let total_placed = book_a.total_placed + book_b.total_placed;
        let all_complete = book_a.is_complete && book_b.is_complete;

        JourneyReport {
            book_a,
            book_b,
            recommendation,
            total_target,
            total_placed,
            total_remaining: (total_target - total_placed).max(0.0),
            all_complete,
        }
    }
}

/// Deposit first, then bonus, then any remaining shortfall.
fn recommend_for(progress: &BookProgress) -> Option<Recommendation> {
    if progress.is_complete {
        return None;
    }
    let (kind, amount) = if !progress.is_deposit_complete {
        (RecommendationKind::Deposit, progress.deposit_remaining)
    } else if !progress.is_bonus_complete && progress.target_bonus > 0.0 {
        (RecommendationKind::Bonus, progress.bonus_remaining)
    } else if progress.total_remaining > 0.0 {
        (RecommendationKind::TopUp, progress.total_remaining)
    } else {
        return None;
    };
    Some(Recommendation {
        book: progress.book,
        kind,
        amount,
        target_stake: progress.target_stake,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::Allocator;
    use crate::types::AllocationInput;
    use rust_decimal_macros::dec;

    /// Hand-built plan: A gets 600 deposit, B gets 400 deposit + 100 bonus.
    fn plan() -> StakePlan {
        let alloc = Allocator::with_entropy();
        let mut plan = alloc
            .reallocate(600.0, 400.0, &AllocationInput::default())
            .unwrap();
        plan.deposit_a = 600.0;
        plan.deposit_b = 400.0;
        plan.bonus_stake_a = 0.0;
        plan.bonus_stake_b = 100.0;
        plan.stake_a = 620.0;
        plan.stake_b = 500.0;
        plan
    }

    #[test]
    fn test_empty_log_recommends_deposit_on_a() {
        let plan = plan();
        let tracker = ProgressTracker::new(&plan);
        let rec = tracker.recommendation(&JourneyLog::new()).unwrap();
        assert_eq!(rec.book, Book::A);
        assert_eq!(rec.kind, RecommendationKind::Deposit);
        assert_eq!(rec.amount, 600.0);
        assert_eq!(rec.message(), "Place 600 deposit on Book A to reach 620 total");
    }

    #[test]
    fn test_top_up_after_deposit_when_no_bonus() {
        let plan = plan();
        let tracker = ProgressTracker::new(&plan);
        let mut log = JourneyLog::new();
        log.add_entry(Book::A, dec!(600), false, None).unwrap();

        let progress = tracker.book_progress(&log, Book::A);
        assert!(progress.is_deposit_complete);
        assert!(progress.is_bonus_complete);
        assert!(!progress.is_complete);

        let rec = tracker.recommendation(&log).unwrap();
        assert_eq!(rec.kind, RecommendationKind::TopUp);
        assert_eq!(rec.amount, 20.0);
        assert!(rec.is_deposit());
    }

    #[test]
    fn test_moves_to_b_then_bonus() {
        let plan = plan();
        let tracker = ProgressTracker::new(&plan);
        let mut log = JourneyLog::new();
        log.add_entry(Book::A, dec!(620), false, None).unwrap();

        let rec = tracker.recommendation(&log).unwrap();
        assert_eq!(rec.book, Book::B);
        assert_eq!(rec.kind, RecommendationKind::Deposit);
        assert_eq!(rec.amount, 400.0);

        log.add_entry(Book::B, dec!(400), false, None).unwrap();
        let rec = tracker.recommendation(&log).unwrap();
        assert_eq!(rec.kind, RecommendationKind::Bonus);
        assert_eq!(rec.amount, 100.0);
        assert!(!rec.is_deposit());
        assert_eq!(rec.message(), "Use 100 bonus on Book B to reach 500 total");

        log.add_entry(Book::B, dec!(100), true, None).unwrap();
        assert!(tracker.recommendation(&log).is_none());
        assert!(tracker.report(&log).all_complete);
    }

    #[test]
    fn test_tolerance_of_one_unit() {
        let plan = plan();
        let tracker = ProgressTracker::new(&plan);
        let mut log = JourneyLog::new();
        log.add_entry(Book::A, dec!(599.2), false, None).unwrap();
        log.add_entry(Book::A, dec!(19.9), false, None).unwrap();

        let progress = tracker.book_progress(&log, Book::A);
        assert!(progress.is_deposit_complete);
        assert!(progress.is_complete);
        assert!(progress.total_remaining > 0.0);
    }

    #[test]
    fn test_cross_funding_counts_toward_source_deposit() {
        let plan = plan();
        let tracker = ProgressTracker::new(&plan);
        let mut log = JourneyLog::new();
        // Money deposited at A, wagered at B's odds.
        log.add_entry(Book::B, dec!(600), false, Some(Book::A)).unwrap();

        let a = tracker.book_progress(&log, Book::A);
        assert!(a.is_deposit_complete);
        let b = tracker.book_progress(&log, Book::B);
        assert_eq!(b.total_deposit, 600.0);
    }

    #[test]
    fn test_report_totals() {
        let plan = plan();
        let tracker = ProgressTracker::new(&plan);
        let mut log = JourneyLog::new();
        log.add_entry(Book::A, dec!(300), false, None).unwrap();
        log.add_entry(Book::B, dec!(50), true, None).unwrap();

        let report = tracker.report(&log);
        assert_eq!(report.total_target, 1_120.0);
        assert_eq!(report.total_placed, 350.0);
        assert_eq!(report.total_remaining, 770.0);
        assert!(!report.all_complete);
        assert_eq!(report.recommendation, tracker.recommendation(&log));
        assert_eq!(report.book_a.deposit_remaining, 300.0);
    }

    #[test]
    fn test_overplaced_remaining_clamped_to_zero() {
        let plan = plan();
        let tracker = ProgressTracker::new(&plan);
        let mut log = JourneyLog::new();
        log.add_entry(Book::A, dec!(5000), false, None).unwrap();
        let progress = tracker.book_progress(&log, Book::A);
        assert_eq!(progress.deposit_remaining, 0.0);
        assert_eq!(progress.total_remaining, 0.0);
    }

    #[test]
    fn test_complete_book_with_missing_deposit_yields_nothing() {
        // Total reached through bonus alone: book is complete, no action.
        let plan = plan();
        let tracker = ProgressTracker::new(&plan);
        let mut log = JourneyLog::new();
        log.add_entry(Book::A, dec!(620), true, None).unwrap();
        let progress = tracker.book_progress(&log, Book::A);
        assert!(!progress.is_deposit_complete);
        assert!(progress.is_complete);
        assert_eq!(tracker.recommendation(&log).unwrap().book, Book::B);
    }
}
