//! Betting journey: the running log of bets actually placed against a plan.
//!
//! A `JourneyLog` holds one `BookState` per book. Entries are appended and
//! removed by id; running totals are maintained incrementally and every
//! removal reverses exactly what the matching addition applied, including
//! the deposit credited to the funding book for cross-book entries.

pub mod progress;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::types::{AllocationInput, Book, StakeError, StakePlan};

pub use progress::{BookProgress, JourneyReport, ProgressTracker, Recommendation, RecommendationKind};

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

/// Identity of a journey: the odds pair and budget it was planned for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub odds_a: f64,
    pub odds_b: f64,
    pub budget: f64,
}

impl Fingerprint {
    pub fn of_plan(plan: &StakePlan) -> Self {
        Self {
            odds_a: plan.odds_a,
            odds_b: plan.odds_b,
            budget: plan.budget,
        }
    }

    pub fn of_input(input: &AllocationInput) -> Self {
        Self {
            odds_a: input.odds_a,
            odds_b: input.odds_b,
            budget: input.budget,
        }
    }

    /// Storage key, e.g. `betting-journey-1.6-2.35-15000`.
    pub fn key(&self) -> String {
        format!("{KEY_PREFIX}{}-{}-{}", self.odds_a, self.odds_b, self.budget)
    }
}

/// Prefix shared by every journey storage key.
pub const KEY_PREFIX: &str = "betting-journey-";

/// Parse a storage key back into its fingerprint.
///
/// A `-` at the start of a field is a sign, anywhere else a separator, so
/// negative budgets survive the round trip.
impl std::str::FromStr for Fingerprint {
    type Err = StakeError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let invalid = || StakeError::Configuration(format!("Invalid journey key: {key}"));
        let rest = key.strip_prefix(KEY_PREFIX).ok_or_else(invalid)?;

        let mut fields = Vec::with_capacity(3);
        let mut current = String::new();
        for c in rest.chars() {
            if c == '-' && !current.is_empty() {
                fields.push(std::mem::take(&mut current));
            } else {
                current.push(c);
            }
        }
        fields.push(current);

        let numbers = fields
            .iter()
            .map(|f| f.parse::<f64>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        match numbers.as_slice() {
            [odds_a, odds_b, budget] => Ok(Self {
                odds_a: *odds_a,
                odds_b: *odds_b,
                budget: *budget,
            }),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl StakePlan {
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of_plan(self)
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// A single bet the user placed. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetEntry {
    pub id: String,
    pub amount: Decimal,
    pub is_bonus: bool,
    pub timestamp: DateTime<Utc>,
    /// Book whose account funded the bet; may differ from the book it was placed on.
    pub fund_source: Book,
}

impl BetEntry {
    /// Whether the entry credits the deposit of the other book.
    pub fn is_cross_funded(&self, placed_on: Book) -> bool {
        !self.is_bonus && self.fund_source != placed_on
    }
}

impl fmt::Display for BetEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.2} (funds: {}) @ {} [{}]",
            if self.is_bonus { "bonus" } else { "deposit" },
            self.amount,
            self.fund_source,
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.id,
        )
    }
}

/// Parse a user-typed amount. Non-numeric text is an invalid entry.
pub fn parse_amount(raw: &str) -> Result<Decimal, StakeError> {
    let trimmed = raw.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| StakeError::InvalidEntry(format!("Amount is not a number: {raw:?}")))
}

/// Convert a JSON/float amount. NaN and infinities are invalid entries.
pub fn amount_from_f64(value: f64) -> Result<Decimal, StakeError> {
    Decimal::from_f64(value)
        .ok_or_else(|| StakeError::InvalidEntry(format!("Amount is not a number: {value}")))
}

// ---------------------------------------------------------------------------
// Book state
// ---------------------------------------------------------------------------

/// Bets logged against one book plus their running totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookState {
    pub entries: Vec<BetEntry>,
    pub total_deposit: Decimal,
    pub total_bonus: Decimal,
}

impl BookState {
    pub fn total_placed(&self) -> Decimal {
        self.total_deposit + self.total_bonus
    }

    pub fn find(&self, entry_id: &str) -> Option<&BetEntry> {
        self.entries.iter().find(|e| e.id == entry_id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.total_deposit.is_zero() && self.total_bonus.is_zero()
    }
}

// ---------------------------------------------------------------------------
// Journey log
// ---------------------------------------------------------------------------

/// Both books' logs for one fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JourneyLog {
    pub book_a: BookState,
    pub book_b: BookState,
}

impl JourneyLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn book(&self, book: Book) -> &BookState {
        match book {
            Book::A => &self.book_a,
            Book::B => &self.book_b,
        }
    }

    fn book_mut(&mut self, book: Book) -> &mut BookState {
        match book {
            Book::A => &mut self.book_a,
            Book::B => &mut self.book_b,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.book_a.is_empty() && self.book_b.is_empty()
    }

    /// Record a bet placed on `book`.
    ///
    /// Without an explicit `fund_source` the target book funds the bet. A
    /// non-bonus entry funded by the other book also credits that book's
    /// deposit total. Rejects non-positive amounts without touching state.
    pub fn add_entry(
        &mut self,
        book: Book,
        amount: Decimal,
        is_bonus: bool,
        fund_source: Option<Book>,
    ) -> Result<BetEntry, StakeError> {
        if amount <= Decimal::ZERO {
            return Err(StakeError::InvalidEntry(format!(
                "Amount must be positive (got {amount})"
            )));
        }

        let entry = BetEntry {
            id: uuid::Uuid::new_v4().to_string(),
            amount,
            is_bonus,
            timestamp: Utc::now(),
            fund_source: fund_source.unwrap_or(book),
        };

        self.apply(book, &entry, Decimal::ONE);
        self.book_mut(book).entries.push(entry.clone());

        info!(
            book = %book,
            amount = %entry.amount,
            is_bonus,
            fund_source = %entry.fund_source,
            entry_id = %entry.id,
            "Bet entry added"
        );

        Ok(entry)
    }

    /// Remove an entry by id, reversing its effect on the totals.
    /// Returns `None` when no such entry is logged on `book`.
    pub fn remove_entry(&mut self, book: Book, entry_id: &str) -> Option<BetEntry> {
        let state = self.book_mut(book);
        let Some(pos) = state.entries.iter().position(|e| e.id == entry_id) else {
            debug!(book = %book, entry_id, "Entry not found; nothing removed");
            return None;
        };
        let entry = state.entries.remove(pos);
        self.apply(book, &entry, Decimal::NEGATIVE_ONE);

        info!(
            book = %book,
            amount = %entry.amount,
            is_bonus = entry.is_bonus,
            entry_id = %entry.id,
            "Bet entry removed"
        );

        Some(entry)
    }

    /// Reset both books to the empty state.
    pub fn clear(&mut self) {
        *self = Self::default();
        info!("Journey cleared");
    }

    /// Apply (`sign = 1`) or reverse (`sign = -1`) an entry's aggregation effect.
    fn apply(&mut self, book: Book, entry: &BetEntry, sign: Decimal) {
        let delta = entry.amount * sign;
        let target = self.book_mut(book);
        if entry.is_bonus {
            target.total_bonus += delta;
        } else {
            target.total_deposit += delta;
        }
        if entry.is_cross_funded(book) {
            self.book_mut(entry.fund_source).total_deposit += delta;
        }
    }

    /// Totals for `book` recomputed from the entries alone:
    /// `(deposit, bonus)`, where deposit includes cross-funded entries on
    /// the other book that drew on this one.
    pub fn folded_totals(&self, book: Book) -> (Decimal, Decimal) {
        let own = self.book(book);
        let mut deposit = Decimal::ZERO;
        let mut bonus = Decimal::ZERO;
        for entry in &own.entries {
            if entry.is_bonus {
                bonus += entry.amount;
            } else {
                deposit += entry.amount;
            }
        }
        let other = book.other();
        deposit += self
            .book(other)
            .entries
            .iter()
            .filter(|e| e.is_cross_funded(other) && e.fund_source == book)
            .map(|e| e.amount)
            .sum::<Decimal>();
        (deposit, bonus)
    }

    /// Whether the running totals agree with the folded totals for both books.
    pub fn is_consistent(&self) -> bool {
        Book::ALL.iter().all(|&book| {
            let state = self.book(book);
            self.folded_totals(book) == (state.total_deposit, state.total_bonus)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    // -- Fingerprint --

    #[test]
    fn test_fingerprint_key_format() {
        let fp = Fingerprint {
            odds_a: 1.6,
            odds_b: 2.35,
            budget: 15_000.0,
        };
        assert_eq!(fp.key(), "betting-journey-1.6-2.35-15000");
        assert_eq!(format!("{fp}"), fp.key());
    }

    #[test]
    fn test_fingerprint_parse_key() {
        let fp: Fingerprint = "betting-journey-1.60-2.35-15000".parse().unwrap();
        assert_eq!(fp.key(), "betting-journey-1.6-2.35-15000");

        let negative: Fingerprint = "betting-journey-1.6-2.35--500".parse().unwrap();
        assert_eq!(negative.budget, -500.0);
        assert_eq!(negative.key().parse::<Fingerprint>().unwrap(), negative);
    }

    #[test]
    fn test_fingerprint_parse_rejects_garbage() {
        assert!("journey-1.6-2.35-15000".parse::<Fingerprint>().is_err());
        assert!("betting-journey-1.6-2.35".parse::<Fingerprint>().is_err());
        assert!("betting-journey-1.6-x-15000".parse::<Fingerprint>().is_err());
        assert!("betting-journey-1-2-3-4".parse::<Fingerprint>().is_err());
    }

    #[test]
    fn test_fingerprint_from_input_matches_plan() {
        let input = AllocationInput::default();
        let fp = Fingerprint::of_input(&input);
        assert_eq!(fp.odds_a, 1.6);
        assert_eq!(fp.budget, 15_000.0);
    }

    // -- Amount parsing --

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("250").unwrap(), dec!(250));
        assert_eq!(parse_amount(" 99.5 ").unwrap(), dec!(99.5));
        assert!(matches!(parse_amount("abc"), Err(StakeError::InvalidEntry(_))));
        assert!(parse_amount("").is_err());
    }

    #[test]
    fn test_amount_from_f64_rejects_nan() {
        assert!(matches!(amount_from_f64(f64::NAN), Err(StakeError::InvalidEntry(_))));
        assert!(amount_from_f64(f64::INFINITY).is_err());
        assert_eq!(amount_from_f64(120.0).unwrap(), dec!(120));
    }

    // -- Add / remove --

    #[test]
    fn test_add_deposit_and_bonus() {
        let mut log = JourneyLog::new();
        log.add_entry(Book::A, dec!(500), false, None).unwrap();
        log.add_entry(Book::A, dec!(100), true, None).unwrap();

        assert_eq!(log.book_a.total_deposit, dec!(500));
        assert_eq!(log.book_a.total_bonus, dec!(100));
        assert_eq!(log.book_a.entries.len(), 2);
        assert!(log.book_b.is_empty());
        assert!(log.is_consistent());
    }

    #[test]
    fn test_default_fund_source_is_target() {
        let mut log = JourneyLog::new();
        let entry = log.add_entry(Book::B, dec!(10), false, None).unwrap();
        assert_eq!(entry.fund_source, Book::B);
    }

    #[test]
    fn test_add_rejects_non_positive() {
        let mut log = JourneyLog::new();
        assert!(matches!(
            log.add_entry(Book::A, dec!(0), false, None),
            Err(StakeError::InvalidEntry(_))
        ));
        assert!(log.add_entry(Book::A, dec!(-5), true, None).is_err());
        assert!(log.is_empty());
    }

    #[test]
    fn test_cross_funded_entry_credits_source_deposit() {
        let mut log = JourneyLog::new();
        log.add_entry(Book::B, dec!(300), false, Some(Book::A)).unwrap();

        assert_eq!(log.book_b.total_deposit, dec!(300));
        assert_eq!(log.book_a.total_deposit, dec!(300));
        assert!(log.book_a.entries.is_empty());
        assert!(log.is_consistent());
    }

    #[test]
    fn test_cross_funded_bonus_has_no_source_effect() {
        let mut log = JourneyLog::new();
        log.add_entry(Book::B, dec!(50), true, Some(Book::A)).unwrap();
        assert_eq!(log.book_b.total_bonus, dec!(50));
        assert_eq!(log.book_a.total_deposit, Decimal::ZERO);
    }

    #[test]
    fn test_remove_reverses_cross_funding() {
        let mut log = JourneyLog::new();
        let before = log.clone();
        let entry = log.add_entry(Book::B, dec!(300), false, Some(Book::A)).unwrap();

        let removed = log.remove_entry(Book::B, &entry.id).unwrap();
        assert_eq!(removed.id, entry.id);
        assert_eq!(log, before);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut log = JourneyLog::new();
        log.add_entry(Book::A, dec!(10), false, None).unwrap();
        let snapshot = log.clone();

        assert!(log.remove_entry(Book::A, "missing").is_none());
        assert_eq!(log, snapshot);
    }

    #[test]
    fn test_remove_from_wrong_book_is_noop() {
        let mut log = JourneyLog::new();
        let entry = log.add_entry(Book::A, dec!(10), false, None).unwrap();
        assert!(log.remove_entry(Book::B, &entry.id).is_none());
        assert_eq!(log.book_a.entries.len(), 1);
    }

    #[test]
    fn test_add_then_remove_all_returns_to_zero() {
        let mut log = JourneyLog::new();
        let ids: Vec<(Book, String)> = vec![
            (Book::A, log.add_entry(Book::A, dec!(1000.10), false, None).unwrap().id),
            (Book::A, log.add_entry(Book::A, dec!(0.20), true, None).unwrap().id),
            (Book::B, log.add_entry(Book::B, dec!(333.33), false, Some(Book::A)).unwrap().id),
            (Book::A, log.add_entry(Book::A, dec!(12.5), false, Some(Book::B)).unwrap().id),
        ];
        assert!(log.is_consistent());

        for (book, id) in ids.iter().rev() {
            assert!(log.remove_entry(*book, id).is_some());
            assert!(log.is_consistent());
        }
        assert!(log.is_empty());
        assert_eq!(log.book_a.total_deposit, Decimal::ZERO);
        assert_eq!(log.book_b.total_bonus, Decimal::ZERO);
    }

    #[test]
    fn test_clear() {
        let mut log = JourneyLog::new();
        log.add_entry(Book::A, dec!(10), false, None).unwrap();
        log.add_entry(Book::B, dec!(20), true, None).unwrap();
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_log_serialization_roundtrip() {
        let mut log = JourneyLog::new();
        log.add_entry(Book::A, dec!(250.5), false, Some(Book::B)).unwrap();
        let json = serde_json::to_string(&log).unwrap();
        let back: JourneyLog = serde_json::from_str(&json).unwrap();
        assert_eq!(back.book_a.total_deposit, dec!(250.5));
        assert_eq!(back.book_b.total_deposit, dec!(250.5));
        assert_eq!(back.book_a.entries[0].fund_source, Book::B);
    }
}
