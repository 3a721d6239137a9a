//! Investment service - investments and their dated entries

use std::sync::Arc;

use anyhow::Result;
use chrono::{Local, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::result::Error;
use crate::domain::{Investment, InvestmentEntry};
use crate::ports::Repository;

/// Investment fields as entered by the user
#[derive(Debug, Clone, Default)]
pub struct InvestmentDraft {
    pub name: String,
    pub description: Option<String>,
    pub currency: String,
    /// Defaults to now on creation
    pub start_date_time: Option<NaiveDateTime>,
    pub end_date_time: Option<NaiveDateTime>,
    pub is_reinvested: bool,
}

/// Entry fields as entered by the user
#[derive(Debug, Clone, Default)]
pub struct EntryDraft {
    /// Now when adding, unchanged when editing
    pub datetime: Option<NaiveDateTime>,
    pub initial_invested_amount: Decimal,
    pub reinvested_amount: Decimal,
    pub profitability: Decimal,
    pub comments: Option<String>,
}

impl EntryDraft {
    fn validate(&self) -> crate::domain::result::Result<()> {
        if self.initial_invested_amount.is_sign_negative() || self.reinvested_amount.is_sign_negative() {
            return Err(Error::validation("invested amounts cannot be negative"));
        }
        Ok(())
    }
}

pub struct InvestmentService {
    repository: Arc<dyn Repository>,
}

impl InvestmentService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    pub fn list(&self) -> Result<Vec<Investment>> {
        Ok(self.repository.get_investments()?)
    }

    /// Investment with entries, or a not-found error
    pub fn get(&self, id: Uuid) -> Result<Investment> {
        Ok(self
            .repository
            .get_investment_by_id(id)?
            .ok_or_else(|| Error::not_found(format!("investment {}", id)))?)
    }

    pub fn create(&self, draft: InvestmentDraft) -> Result<Investment> {
        let start = draft
            .start_date_time
            .unwrap_or_else(|| Local::now().naive_local());
        let mut investment = Investment::new(Uuid::new_v4(), draft.name.trim(), &draft.currency, start);
        investment.description = clean_optional(draft.description);
        investment.end_date_time = draft.end_date_time;
        investment.is_reinvested = draft.is_reinvested;
        investment.validate().map_err(Error::validation)?;

        self.repository.upsert_investment(&investment)?;
        info!(investment_id = %investment.id, "created investment");
        Ok(investment)
    }

    /// Replace the editable fields of an investment
    pub fn update(&self, id: Uuid, draft: InvestmentDraft) -> Result<Investment> {
        let mut investment = self.get(id)?;
        investment.name = draft.name.trim().to_string();
        investment.description = clean_optional(draft.description);
        investment.currency = Investment::normalize_currency(&draft.currency);
        if let Some(start) = draft.start_date_time {
            investment.start_date_time = start;
        }
        investment.end_date_time = draft.end_date_time;
        investment.is_reinvested = draft.is_reinvested;
        investment.updated_at = Utc::now();
        investment.validate().map_err(Error::validation)?;

        self.repository.upsert_investment(&investment)?;
        debug!(investment_id = %id, "updated investment");
        Ok(investment)
    }

    /// Set the end datetime (now by default), making the investment inactive
    pub fn close(&self, id: Uuid, at: Option<NaiveDateTime>) -> Result<Investment> {
        let mut investment = self.get(id)?;
        investment.end_date_time = Some(at.unwrap_or_else(|| Local::now().naive_local()));
        investment.updated_at = Utc::now();
        investment.validate().map_err(Error::validation)?;

        self.repository.upsert_investment(&investment)?;
        info!(investment_id = %id, "closed investment");
        Ok(investment)
    }

    /// Delete an investment with its entries and forecasts
    pub fn delete(&self, id: Uuid) -> Result<()> {
        self.get(id)?;
        self.repository.delete_investment(id)?;
        info!(investment_id = %id, "deleted investment");
        Ok(())
    }

    pub fn add_entry(&self, investment_id: Uuid, draft: EntryDraft) -> Result<InvestmentEntry> {
        draft.validate()?;
        self.get(investment_id)?;

        let datetime = draft.datetime.unwrap_or_else(|| Local::now().naive_local());
        let mut entry = InvestmentEntry::new(
            investment_id,
            datetime,
            draft.initial_invested_amount,
            draft.reinvested_amount,
            draft.profitability,
        )?;
        entry.comments = clean_optional(draft.comments);

        self.repository.add_entry(&entry)?;
        debug!(investment_id = %investment_id, entry_id = %entry.id, "added entry");
        Ok(entry)
    }

    /// Replace an entry's amounts and recompute its derived fields
    pub fn update_entry(&self, investment_id: Uuid, entry_id: Uuid, draft: EntryDraft) -> Result<InvestmentEntry> {
        draft.validate()?;
        let investment = self.get(investment_id)?;
        let mut entry = investment
            .find_entry(entry_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("entry {}", entry_id)))?;

        if let Some(datetime) = draft.datetime {
            entry.datetime = datetime;
        }
        entry.initial_invested_amount = draft.initial_invested_amount;
        entry.reinvested_amount = draft.reinvested_amount;
        entry.profitability = draft.profitability;
        entry.comments = clean_optional(draft.comments);
        entry.updated_at = Utc::now();
        entry.recalculate()?;

        self.repository.update_entry(&entry)?;
        debug!(investment_id = %investment_id, entry_id = %entry_id, "updated entry");
        Ok(entry)
    }

    pub fn delete_entry(&self, investment_id: Uuid, entry_id: Uuid) -> Result<()> {
        if !self.repository.delete_entry(investment_id, entry_id)? {
            return Err(Error::not_found(format!("entry {}", entry_id)).into());
        }
        debug!(investment_id = %investment_id, entry_id = %entry_id, "deleted entry");
        Ok(())
    }
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
