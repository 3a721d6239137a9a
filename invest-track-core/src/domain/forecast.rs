//! Forecast domain model
//!
//! A forecast is a named projection definition for one investment: a date
//! range and a monthly growth rate for each of the three fixed scenarios.
//! The date range is the canonical duration; month counts, start entries and
//! "duration in months" only exist as [`ForecastDraft`] form state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::investment::{to_stored_scale, InvestmentEntry};
use super::result::{Error, Result};

/// One of the three projection scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Scenario {
    Pessimist,
    Neutral,
    Optimist,
}

impl Scenario {
    /// All scenarios in display order
    pub const ALL: [Scenario; 3] = [Scenario::Pessimist, Scenario::Neutral, Scenario::Optimist];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Pessimist => "PESSIMIST",
            Scenario::Neutral => "NEUTRAL",
            Scenario::Optimist => "OPTIMIST",
        }
    }

    /// Legend label, e.g. "Optimist"
    pub fn display_name(&self) -> &'static str {
        match self {
            Scenario::Pessimist => "Pessimist",
            Scenario::Neutral => "Neutral",
            Scenario::Optimist => "Optimist",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "PESSIMIST" => Ok(Scenario::Pessimist),
            "NEUTRAL" => Ok(Scenario::Neutral),
            "OPTIMIST" => Ok(Scenario::Optimist),
            other => Err(Error::validation(format!("unknown scenario '{}'", other))),
        }
    }
}

/// Largest accepted monthly rate magnitude, in percent
pub const MAX_RATE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Monthly growth rate per scenario, in percent (e.g. 2 = +2% per month)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct ScenarioRates {
    pub pessimist: Decimal,
    pub neutral: Decimal,
    pub optimist: Decimal,
}

impl ScenarioRates {
    pub fn new(pessimist: Decimal, neutral: Decimal, optimist: Decimal) -> Self {
        Self {
            pessimist,
            neutral,
            optimist,
        }
    }

    pub fn rate(&self, scenario: Scenario) -> Decimal {
        match scenario {
            Scenario::Pessimist => self.pessimist,
            Scenario::Neutral => self.neutral,
            Scenario::Optimist => self.optimist,
        }
    }

    /// Rates rounded to the stored scale
    pub fn to_stored_scale(self) -> Self {
        Self::new(
            to_stored_scale(self.pessimist),
            to_stored_scale(self.neutral),
            to_stored_scale(self.optimist),
        )
    }

    /// Parse the three rates as typed into a form
    pub fn parse(pessimist: &str, neutral: &str, optimist: &str) -> Result<Self> {
        Ok(Self::new(
            parse_rate(pessimist)?,
            parse_rate(neutral)?,
            parse_rate(optimist)?,
        ))
    }
}

/// A projection definition attached to an investment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub id: Uuid,
    pub investment_id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub scenario_rates: ScenarioRates,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Forecast {
    /// Create a validated forecast
    pub fn new(
        investment_id: Uuid,
        name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        scenario_rates: ScenarioRates,
    ) -> Result<Self> {
        let now = Utc::now();
        let forecast = Self {
            id: Uuid::new_v4(),
            investment_id,
            name: name.into().trim().to_string(),
            start_date,
            end_date,
            scenario_rates: scenario_rates.to_stored_scale(),
            created_at: now,
            updated_at: now,
        };
        forecast.validate()?;
        Ok(forecast)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::validation("forecast name cannot be empty"));
        }
        for scenario in Scenario::ALL {
            if self.scenario_rates.rate(scenario).abs() > MAX_RATE {
                return Err(Error::validation(format!(
                    "{} rate must be within ±{} %",
                    scenario.display_name(),
                    MAX_RATE
                )));
            }
        }
        self.months().map(|_| ())
    }

    /// Inclusive calendar-month count between start and end date
    ///
    /// Fails when the end date is not strictly after the start date.
    pub fn months(&self) -> Result<usize> {
        if self.end_date <= self.start_date {
            return Err(Error::validation(format!(
                "forecast '{}' ends on {} which is not after its start {}",
                self.name, self.end_date, self.start_date
            )));
        }
        Ok(inclusive_month_span(self.start_date, self.end_date))
    }
}

/// Calendar-month difference plus one; callers guarantee `end >= start`
pub fn inclusive_month_span(start: NaiveDate, end: NaiveDate) -> usize {
    let diff = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    (diff.max(0) + 1) as usize
}

/// `start` advanced by `months` calendar months (clamped to the month end)
pub fn end_date_from_months(start: NaiveDate, months: u32) -> Result<NaiveDate> {
    if months == 0 {
        return Err(Error::validation("forecast duration must be at least one month"));
    }
    start
        .checked_add_months(Months::new(months))
        .ok_or_else(|| Error::validation(format!("{} months after {} is out of range", months, start)))
}

/// The date of the entry a forecast starts from
pub fn resolve_start_date(entries: &[InvestmentEntry], entry_id: Uuid) -> Result<NaiveDate> {
    entries
        .iter()
        .find(|e| e.id == entry_id)
        .map(|e| e.datetime.date())
        .ok_or_else(|| Error::not_found(format!("entry {}", entry_id)))
}

/// Parse a growth rate typed into a form ("1.5", "-2", "0,75")
pub fn parse_rate(text: &str) -> Result<Decimal> {
    let trimmed = text.trim().trim_end_matches('%').trim();
    if trimmed.is_empty() {
        return Err(Error::validation("scenario rate cannot be empty"));
    }
    Decimal::from_str(&trimmed.replace(',', "."))
        .map(to_stored_scale)
        .map_err(|_| Error::validation(format!("scenario rate '{}' is not a number", text.trim())))
}

/// Where a draft forecast starts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ForecastStart {
    Date(NaiveDate),
    /// Start on the date of one of the investment's entries
    Entry(Uuid),
}

/// How long a draft forecast lasts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ForecastDuration {
    Months(u32),
    EndDate(NaiveDate),
}

/// Forecast as collected by a creation or edit form
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastDraft {
    pub name: String,
    pub start: ForecastStart,
    pub duration: ForecastDuration,
    pub scenario_rates: ScenarioRates,
}

impl ForecastDraft {
    /// Prefill an edit form from a stored forecast
    pub fn from_forecast(forecast: &Forecast) -> Self {
        Self {
            name: forecast.name.clone(),
            start: ForecastStart::Date(forecast.start_date),
            duration: ForecastDuration::EndDate(forecast.end_date),
            scenario_rates: forecast.scenario_rates,
        }
    }

    /// Resolve start and end dates against the investment's entries
    pub fn resolve(&self, investment_id: Uuid, entries: &[InvestmentEntry]) -> Result<Forecast> {
        let start_date = match self.start {
            ForecastStart::Date(date) => date,
            ForecastStart::Entry(entry_id) => resolve_start_date(entries, entry_id)?,
        };
        let end_date = match self.duration {
            ForecastDuration::Months(months) => end_date_from_months(start_date, months)?,
            ForecastDuration::EndDate(date) => date,
        };
        Forecast::new(
            investment_id,
            self.name.as_str(),
            start_date,
            end_date,
            self.scenario_rates,
        )
    }
}
