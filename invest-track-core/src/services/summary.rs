//! Summary service - portfolio and per-investment statistics

use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::result::Error;
use crate::domain::{Investment, Summary};
use crate::ports::Repository;
use crate::services::aggregation::{compute_summary, summarize_investment};

pub struct SummaryService {
    repository: Arc<dyn Repository>,
}

impl SummaryService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Summary across the portfolio, optionally only open investments
    pub fn get_summary(&self, active_only: bool) -> Result<Summary> {
        let investments = self.load(active_only)?;
        Ok(compute_summary(&investments)?)
    }

    /// Portfolio summary plus one line per investment
    pub fn get_status(&self, active_only: bool) -> Result<PortfolioStatus> {
        let investments = self.load(active_only)?;
        let now = Local::now().naive_local();

        let lines = investments
            .iter()
            .map(|investment| {
                Ok(InvestmentSummary {
                    id: investment.id,
                    name: investment.name.clone(),
                    currency: investment.currency.clone(),
                    is_active: investment.is_active(now),
                    entry_count: investment.entries.len(),
                    summary: summarize_investment(investment)?,
                })
            })
            .collect::<crate::domain::result::Result<Vec<_>>>()?;

        Ok(PortfolioStatus {
            summary: compute_summary(&investments)?,
            investments: lines,
        })
    }

    pub fn get_investment_summary(&self, id: Uuid) -> Result<Summary> {
        let investment = self
            .repository
            .get_investment_by_id(id)?
            .ok_or_else(|| Error::not_found(format!("investment {}", id)))?;
        Ok(summarize_investment(&investment)?)
    }

    fn load(&self, active_only: bool) -> Result<Vec<Investment>> {
        let mut investments = self.repository.get_investments()?;
        if active_only {
            let now = Local::now().naive_local();
            investments.retain(|investment| investment.is_active(now));
        }
        Ok(investments)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioStatus {
    pub summary: Summary,
    pub investments: Vec<InvestmentSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentSummary {
    pub id: Uuid,
    pub name: String,
    pub currency: String,
    pub is_active: bool,
    pub entry_count: usize,
    pub summary: Summary,
}
