//! Shared types for STAKEPLAN.
//!
//! These types form the data model used across the allocator, the
//! journey tracker, storage, and the outer surfaces (CLI / HTTP).
//! Every record here is a plain value: the allocator produces them,
//! callers render or persist them.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Policy ceilings of the promotion. Fixed for every computation.
pub struct Limits;

impl Limits {
    /// Maximum deposit accepted by a single book.
    pub const MAX_DEPOSIT_PER_BOOK: f64 = 15_000.0;
    /// Maximum bonus credit a single book will award.
    pub const MAX_BONUS: f64 = 3_000.0;
    /// Maximum combined deposit across both books.
    pub const MAX_TOTAL_DEPOSIT: f64 = 30_000.0;
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// One of the two competing books.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Book {
    A,
    B,
}

impl Book {
    /// Both books in evaluation order.
    pub const ALL: [Book; 2] = [Book::A, Book::B];

    /// The other book.
    pub fn other(&self) -> Self {
        match self {
            Book::A => Book::B,
            Book::B => Book::A,
        }
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Book::A => write!(f, "Book A"),
            Book::B => write!(f, "Book B"),
        }
    }
}

/// Case-insensitive parse of `a`, `b`, `book a`, `bookb`, ...
impl std::str::FromStr for Book {
    type Err = StakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        match normalized.trim_start_matches("book") {
            "a" => Ok(Book::A),
            "b" => Ok(Book::B),
            _ => Err(StakeError::Configuration(format!("Unknown book: {s}"))),
        }
    }
}

/// Floor-to-multiple rounding applied to deposits and stakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum RoundingStep {
    #[default]
    None,
    Ten,
    Fifty,
    Hundred,
}

impl RoundingStep {
    /// All selectable steps, in the order random mode draws from.
    pub const ALL: [RoundingStep; 4] = [
        RoundingStep::None,
        RoundingStep::Ten,
        RoundingStep::Fifty,
        RoundingStep::Hundred,
    ];

    /// Step size in currency units (0 = no rounding).
    pub fn value(&self) -> u32 {
        match self {
            RoundingStep::None => 0,
            RoundingStep::Ten => 10,
            RoundingStep::Fifty => 50,
            RoundingStep::Hundred => 100,
        }
    }

    pub fn is_active(&self) -> bool {
        *self != RoundingStep::None
    }
}

impl TryFrom<u32> for RoundingStep {
    type Error = StakeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RoundingStep::None),
            10 => Ok(RoundingStep::Ten),
            50 => Ok(RoundingStep::Fifty),
            100 => Ok(RoundingStep::Hundred),
            other => Err(StakeError::Configuration(format!(
                "Rounding step must be one of 0, 10, 50, 100 (got {other})"
            ))),
        }
    }
}

impl From<RoundingStep> for u32 {
    fn from(step: RoundingStep) -> Self {
        step.value()
    }
}

impl fmt::Display for RoundingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundingStep::None => write!(f, "none"),
            step => write!(f, "{}", step.value()),
        }
    }
}

// ---------------------------------------------------------------------------
// Allocation input
// ---------------------------------------------------------------------------

/// Parameters of a single allocation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationInput {
    /// Cash budget available across both books.
    pub budget: f64,
    /// Decimal odds offered by book A.
    pub odds_a: f64,
    /// Decimal odds offered by book B.
    pub odds_b: f64,
    /// Deposit-matched bonus offered by book A, in percent.
    pub bonus_percent_a: f64,
    /// Deposit-matched bonus offered by book B, in percent.
    pub bonus_percent_b: f64,
    /// Minimum odds a book must offer for its bonus to be staked there.
    pub min_odds_for_bonus_a: f64,
    #[serde(default)]
    pub rounding_step: RoundingStep,
    #[serde(default)]
    pub random_mode: bool,
}

impl Default for AllocationInput {
    fn default() -> Self {
        Self {
            budget: 15_000.0,
            odds_a: 1.60,
            odds_b: 2.35,
            bonus_percent_a: 0.0,
            bonus_percent_b: 20.0,
            min_odds_for_bonus_a: 2.1,
            rounding_step: RoundingStep::None,
            random_mode: false,
        }
    }
}

impl AllocationInput {
    /// Odds offered by the given book.
    pub fn odds(&self, book: Book) -> f64 {
        match book {
            Book::A => self.odds_a,
            Book::B => self.odds_b,
        }
    }

    /// Bonus rate (fraction, not percent) for the given book.
    pub fn bonus_rate(&self, book: Book) -> f64 {
        match book {
            Book::A => self.bonus_percent_a / 100.0,
            Book::B => self.bonus_percent_b / 100.0,
        }
    }

    /// Reject inputs for which the equal-return split is undefined.
    ///
    /// Everything else (negative budget, odds below 1, oversized bonus
    /// percentages) is accepted and produces a degenerate plan.
    pub fn validate(&self) -> Result<(), StakeError> {
        for book in Book::ALL {
            let odds = self.odds(book);
            if !odds.is_finite() || odds <= 0.0 {
                return Err(StakeError::Configuration(format!(
                    "Odds for {book} must be a positive number (got {odds})"
                )));
            }
        }
        if !self.budget.is_finite() {
            return Err(StakeError::Configuration(format!(
                "Budget must be a finite number (got {})",
                self.budget
            )));
        }
        Ok(())
    }
}

impl fmt::Display for AllocationInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "budget={:.2} odds={:.2}/{:.2} bonus={:.0}%/{:.0}% min_odds={:.2} rounding={}{}",
            self.budget,
            self.odds_a,
            self.odds_b,
            self.bonus_percent_a,
            self.bonus_percent_b,
            self.min_odds_for_bonus_a,
            self.rounding_step,
            if self.random_mode { " (random)" } else { "" },
        )
    }
}

// ---------------------------------------------------------------------------
// Stake plan
// ---------------------------------------------------------------------------

/// Output of the allocator: a self-consistent deposit and stake plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakePlan {
    pub random_mode: bool,
    /// Rounding step actually applied (drawn when in random mode).
    pub rounding_step: RoundingStep,
    pub distributed_leftover: bool,
    pub jitter_enabled: bool,
    pub jitter_a: f64,
    pub jitter_b: f64,

    pub deposit_a: f64,
    pub deposit_b: f64,
    pub bonus_amount_a: f64,
    pub bonus_amount_b: f64,
    /// Bonus staked on A after eligibility routing.
    pub bonus_stake_a: f64,
    /// Bonus staked on B after eligibility routing (includes diverted A bonus).
    pub bonus_stake_b: f64,
    pub bonus_percent_a: f64,
    pub bonus_percent_b: f64,
    pub total_bonus: f64,
    /// Budget not deployed as deposit.
    pub leftover: f64,
    pub stake_a: f64,
    pub stake_b: f64,
    pub bonus_a_diverted_to_b: f64,
    pub can_use_bonus_on_a: bool,
    pub can_use_bonus_on_b: bool,
    pub min_odds_for_bonus_a: f64,

    pub payout_a: f64,
    pub payout_b: f64,
    /// Payout received whichever outcome occurs.
    pub guaranteed: f64,
    pub profit: f64,
    pub profit_on_used: f64,
    pub used_capital: f64,

    pub budget: f64,
    pub odds_a: f64,
    pub odds_b: f64,
}

impl StakePlan {
    pub fn deposit(&self, book: Book) -> f64 {
        match book {
            Book::A => self.deposit_a,
            Book::B => self.deposit_b,
        }
    }

    pub fn bonus_stake(&self, book: Book) -> f64 {
        match book {
            Book::A => self.bonus_stake_a,
            Book::B => self.bonus_stake_b,
        }
    }

    pub fn stake(&self, book: Book) -> f64 {
        match book {
            Book::A => self.stake_a,
            Book::B => self.stake_b,
        }
    }

    pub fn odds(&self, book: Book) -> f64 {
        match book {
            Book::A => self.odds_a,
            Book::B => self.odds_b,
        }
    }

    /// Total stake across both books (deposits plus staked bonus, after rounding).
    pub fn total_stake(&self) -> f64 {
        self.stake_a + self.stake_b
    }

    /// Return on the full budget as a percentage.
    pub fn roi_pct(&self) -> f64 {
        if self.budget > 0.0 {
            self.profit / self.budget * 100.0
        } else {
            0.0
        }
    }
}

impl fmt::Display for StakePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Deposits   A={:.2} B={:.2} (used {:.2}, leftover {:.2})",
            self.deposit_a, self.deposit_b, self.used_capital, self.leftover,
        )?;
        writeln!(
            f,
            "Bonus      A={:.2} B={:.2} | staked A={:.2} B={:.2} | diverted A->B {:.2}",
            self.bonus_amount_a,
            self.bonus_amount_b,
            self.bonus_stake_a,
            self.bonus_stake_b,
            self.bonus_a_diverted_to_b,
        )?;
        writeln!(
            f,
            "Stakes     A={:.2} @ {:.2} -> {:.2} | B={:.2} @ {:.2} -> {:.2}",
            self.stake_a, self.odds_a, self.payout_a, self.stake_b, self.odds_b, self.payout_b,
        )?;
        write!(
            f,
            "Guaranteed {:.2} | profit {:.2} ({:.2}%) | profit on used {:.2} | rounding={}{}",
            self.guaranteed,
            self.profit,
            self.roi_pct(),
            self.profit_on_used,
            self.rounding_step,
            if self.jitter_enabled { " jitter" } else { "" },
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for STAKEPLAN.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StakeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
