//! Forecast projection engine
//!
//! Turns a forecast and the real entry history of its investment into
//! chart-ready series: one category per month, the real line (with `None`
//! after the last recorded entry) and one compounding line per scenario.
//!
//! Every scenario starts from the same anchor, the total invested amount of
//! the chronologically first entry (zero without entries), so the projected
//! lines and the real line are comparable from month zero. Values are
//! rounded to cents at every step, which makes
//! `values[i + 1] == round(values[i] * (1 + rate / 100), 2)` hold exactly.
//!
//! All functions here are pure: same inputs, same output, no shared state.

use chrono::format::{Item, StrftimeItems};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Forecast, InvestmentEntry, Scenario};

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_MONTH_LABEL: &str = "Month";

/// How category labels are rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionOptions {
    /// strftime format for months backed by a real entry
    pub date_format: String,
    /// Prefix for synthetic months, rendered as "{month_label} {n}"
    pub month_label: String,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            month_label: DEFAULT_MONTH_LABEL.to_string(),
        }
    }
}

impl ProjectionOptions {
    /// Build options, rejecting strftime formats chrono cannot render
    pub fn new(date_format: impl Into<String>, month_label: impl Into<String>) -> Result<Self> {
        let date_format = date_format.into();
        if !is_valid_date_format(&date_format) {
            return Err(Error::config(format!("invalid date format '{}'", date_format)));
        }
        Ok(Self {
            date_format,
            month_label: month_label.into(),
        })
    }
}

pub fn is_valid_date_format(format: &str) -> bool {
    !format.is_empty() && !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// One scenario line
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSeries {
    pub scenario: Scenario,
    /// Legend label: "Optimist", or "{forecast} - Optimist" when combined
    pub label: String,
    pub forecast_id: Uuid,
    pub values: Vec<Decimal>,
}

/// Chart-ready projection; every series has one value per category
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastProjection {
    pub categories: Vec<String>,
    pub real_series: Vec<Option<Decimal>>,
    pub scenario_series: Vec<ScenarioSeries>,
}

impl ForecastProjection {
    /// Number of months covered
    pub fn horizon(&self) -> usize {
        self.categories.len()
    }

    /// First series for the given scenario
    pub fn scenario(&self, scenario: Scenario) -> Option<&ScenarioSeries> {
        self.scenario_series.iter().find(|s| s.scenario == scenario)
    }
}

/// Project a single forecast against the real history
///
/// The horizon is the forecast's inclusive month count, extended to the
/// number of real entries when history is longer.
pub fn project_forecast(
    entries: &[InvestmentEntry],
    forecast: &Forecast,
    options: &ProjectionOptions,
) -> Result<ForecastProjection> {
    let history = chronological(entries);
    let horizon = forecast.months()?.max(history.len());
    let anchor = anchor_value(&history);

    let scenario_series = scenario_lines(forecast, anchor, horizon, |scenario| {
        scenario.display_name().to_string()
    })?;

    Ok(ForecastProjection {
        categories: categories(&history, horizon, options),
        real_series: real_series(&history, horizon),
        scenario_series,
    })
}

/// Project several forecasts of one investment on a shared axis
///
/// The shared horizon is the longest forecast or the real history, whichever
/// is larger. Series are labeled "{forecast name} - {Scenario}".
pub fn project_combined(
    entries: &[InvestmentEntry],
    forecasts: &[Forecast],
    options: &ProjectionOptions,
) -> Result<ForecastProjection> {
    let history = chronological(entries);
    let mut horizon = history.len();
    for forecast in forecasts {
        horizon = horizon.max(forecast.months()?);
    }
    let anchor = anchor_value(&history);

    let mut scenario_series = Vec::with_capacity(forecasts.len() * Scenario::ALL.len());
    for forecast in forecasts {
        scenario_series.extend(scenario_lines(forecast, anchor, horizon, |scenario| {
            format!("{} - {}", forecast.name, scenario.display_name())
        })?);
    }

    Ok(ForecastProjection {
        categories: categories(&history, horizon, options),
        real_series: real_series(&history, horizon),
        scenario_series,
    })
}

/// Monthly compounding from `anchor` at `rate` percent per month
pub fn compound(anchor: Decimal, rate: Decimal, months: usize) -> Result<Vec<Decimal>> {
    let factor = Decimal::ONE + rate / Decimal::ONE_HUNDRED;
    let mut value = round_cents(anchor);
    let mut values = Vec::with_capacity(months);

    for month in 0..months {
        values.push(value);
        if month + 1 < months {
            value = value
                .checked_mul(factor)
                .map(round_cents)
                .ok_or_else(|| {
                    Error::validation(format!(
                        "projection at {}% per month overflows after {} months",
                        rate, month + 1
                    ))
                })?;
        }
    }

    Ok(values)
}

fn scenario_lines(
    forecast: &Forecast,
    anchor: Decimal,
    horizon: usize,
    label: impl Fn(Scenario) -> String,
) -> Result<Vec<ScenarioSeries>> {
    Scenario::ALL
        .iter()
        .map(|&scenario| {
            Ok(ScenarioSeries {
                scenario,
                label: label(scenario),
                forecast_id: forecast.id,
                values: compound(anchor, forecast.scenario_rates.rate(scenario), horizon)?,
            })
        })
        .collect()
}

fn chronological(entries: &[InvestmentEntry]) -> Vec<&InvestmentEntry> {
    let mut sorted: Vec<&InvestmentEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.datetime);
    sorted
}

fn anchor_value(history: &[&InvestmentEntry]) -> Decimal {
    history
        .first()
        .map(|e| e.total_invested_amount)
        .unwrap_or(Decimal::ZERO)
}

fn real_series(history: &[&InvestmentEntry], horizon: usize) -> Vec<Option<Decimal>> {
    history
        .iter()
        .map(|e| Some(round_cents(e.total_invested_amount)))
        .chain(std::iter::repeat(None))
        .take(horizon)
        .collect()
}

fn categories(history: &[&InvestmentEntry], horizon: usize, options: &ProjectionOptions) -> Vec<String> {
    history
        .iter()
        .map(|e| e.datetime.format(&options.date_format).to_string())
        .chain((history.len()..horizon).map(|i| format!("{} {}", options.month_label, i + 1)))
        .take(horizon)
        .collect()
}

fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
