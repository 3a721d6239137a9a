//! Investment and investment entry domain models

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::{Error, Result};

/// Decimal places kept for stored amounts and rates (DECIMAL(38, 10) columns)
pub const STORED_SCALE: u32 = 10;

/// Largest accepted invested amount
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_808_348_672, 232_830_643, 0, false, 0); // 1e18

/// Largest accepted profitability magnitude, as a fraction (100 000 000 %)
pub const MAX_PROFITABILITY: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Round to the stored scale, half away from zero
pub fn to_stored_scale(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(STORED_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// A dated snapshot of an investment's invested and obtained amounts
///
/// `total_invested_amount`, `obtained` and `benefit` are derived from the
/// other amounts and are recomputed on every construction or edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentEntry {
    pub id: Uuid,
    pub investment_id: Uuid,
    /// When the snapshot was taken (naive datetime, local time)
    pub datetime: NaiveDateTime,
    pub initial_invested_amount: Decimal,
    pub reinvested_amount: Decimal,
    pub total_invested_amount: Decimal,
    /// Fraction, e.g. 0.2 for a 20% return
    pub profitability: Decimal,
    pub obtained: Decimal,
    pub benefit: Decimal,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InvestmentEntry {
    /// Create a new entry, computing the derived amounts
    pub fn new(
        investment_id: Uuid,
        datetime: NaiveDateTime,
        initial_invested_amount: Decimal,
        reinvested_amount: Decimal,
        profitability: Decimal,
    ) -> Result<Self> {
        let now = Utc::now();
        let mut entry = Self {
            id: Uuid::new_v4(),
            investment_id,
            datetime,
            initial_invested_amount,
            reinvested_amount,
            total_invested_amount: Decimal::ZERO,
            profitability,
            obtained: Decimal::ZERO,
            benefit: Decimal::ZERO,
            comments: None,
            created_at: now,
            updated_at: now,
        };
        entry.recalculate()?;
        Ok(entry)
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    /// Recompute total invested, obtained and benefit from the input amounts
    ///
    /// Inputs are first rounded to the stored scale so that an entry read
    /// back from the store derives the same values. Out-of-range inputs are
    /// a validation error.
    pub fn recalculate(&mut self) -> Result<()> {
        self.initial_invested_amount = to_stored_scale(self.initial_invested_amount);
        self.reinvested_amount = to_stored_scale(self.reinvested_amount);
        self.profitability = to_stored_scale(self.profitability);

        check_amount("initial invested amount", self.initial_invested_amount)?;
        check_amount("reinvested amount", self.reinvested_amount)?;
        if self.profitability.abs() > MAX_PROFITABILITY {
            return Err(Error::validation(format!(
                "profitability {} is out of range",
                self.profitability
            )));
        }

        let overflow = || Error::validation("entry amounts are too large");
        let total = self
            .initial_invested_amount
            .checked_add(self.reinvested_amount)
            .ok_or_else(overflow)?;
        let obtained = Decimal::ONE
            .checked_add(self.profitability)
            .and_then(|factor| total.checked_mul(factor))
            .ok_or_else(overflow)?;
        let benefit = obtained.checked_sub(total).ok_or_else(overflow)?;

        self.total_invested_amount = total;
        self.obtained = obtained;
        self.benefit = benefit;
        Ok(())
    }
}

fn check_amount(field: &str, value: Decimal) -> Result<()> {
    if value.abs() > MAX_AMOUNT {
        return Err(Error::validation(format!("{} {} is out of range", field, value)));
    }
    Ok(())
}

/// An investment tracked by the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Investment {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// ISO 4217 currency code, normalized to uppercase
    pub currency: String,
    pub start_date_time: NaiveDateTime,
    /// None while the investment is still open
    pub end_date_time: Option<NaiveDateTime>,
    /// Returns are reinvested into the same position
    pub is_reinvested: bool,
    /// Entries owned by this investment, kept ordered by datetime
    pub entries: Vec<InvestmentEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Investment {
    /// Create a new investment with required fields
    pub fn new(
        id: Uuid,
        name: impl Into<String>,
        currency: &str,
        start_date_time: NaiveDateTime,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            description: None,
            currency: Self::normalize_currency(currency),
            start_date_time,
            end_date_time: None,
            is_reinvested: false,
            entries: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Normalize currency code to uppercase
    pub fn normalize_currency(currency: &str) -> String {
        currency.trim().to_uppercase()
    }

    /// An investment is active until its end datetime has passed
    pub fn is_active(&self, now: NaiveDateTime) -> bool {
        self.end_date_time.map_or(true, |end| end > now)
    }

    /// The entry with the latest datetime, used as the current snapshot
    pub fn last_entry(&self) -> Option<&InvestmentEntry> {
        self.entries.iter().max_by_key(|e| e.datetime)
    }

    /// The chronologically first entry
    pub fn first_entry(&self) -> Option<&InvestmentEntry> {
        self.entries.iter().min_by_key(|e| e.datetime)
    }

    pub fn find_entry(&self, entry_id: Uuid) -> Option<&InvestmentEntry> {
        self.entries.iter().find(|e| e.id == entry_id)
    }

    /// Insert an entry keeping the datetime order
    pub fn push_entry(&mut self, entry: InvestmentEntry) {
        let pos = self
            .entries
            .partition_point(|e| e.datetime <= entry.datetime);
        self.entries.insert(pos, entry);
    }

    /// Validate investment data
    pub fn validate(&self) -> std::result::Result<(), &'static str> {
        if self.name.trim().is_empty() {
            return Err("investment name cannot be empty");
        }
        if self.currency.trim().is_empty() {
            return Err("currency cannot be empty");
        }
        if let Some(end) = self.end_date_time {
            if end < self.start_date_time {
                return Err("end datetime cannot be before start datetime");
            }
        }
        Ok(())
    }
}
