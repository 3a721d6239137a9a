//! Demo data
//!
//! Three investments with a year of monthly statements ending this month:
//! - an index fund with monthly contributions and reinvested returns
//! - a fixed-term deposit closed last month
//! - a crypto position with volatile returns
//!
//! Plus two forecasts on the index fund and one on the crypto position.

use chrono::{Datelike, Local, Months, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Forecast, Investment, InvestmentEntry, ScenarioRates};

pub const INDEX_FUND_ID: Uuid = Uuid::from_u128(0x1111_1111_1111_1111_1111_1111_1111_1111);
pub const DEPOSIT_ID: Uuid = Uuid::from_u128(0x2222_2222_2222_2222_2222_2222_2222_2222);
pub const CRYPTO_ID: Uuid = Uuid::from_u128(0x3333_3333_3333_3333_3333_3333_3333_3333);

const MONTHS_OF_HISTORY: u32 = 12;

/// Crypto monthly profitability in basis points of the cumulative position
const CRYPTO_RETURNS_BP: [i64; 12] = [0, 850, -420, 1310, 640, -1180, -300, 920, 1570, 410, -650, 1200];

/// First day of the month `months_ago` months before the current one, at 09:00
fn month_start(months_ago: u32) -> NaiveDateTime {
    let today = Local::now().date_naive();
    let first = today.with_day(1).unwrap_or(today);
    let date = first
        .checked_sub_months(Months::new(months_ago))
        .unwrap_or(first);
    date.and_time(NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default())
}

/// Demo investments without entries
pub fn generate_demo_investments() -> Vec<Investment> {
    let start = month_start(MONTHS_OF_HISTORY - 1);

    let mut index_fund = Investment::new(INDEX_FUND_ID, "Global Index Fund", "EUR", start);
    index_fund.description = Some("MSCI World tracker, monthly contribution".to_string());
    index_fund.is_reinvested = true;

    let mut deposit = Investment::new(DEPOSIT_ID, "Fixed-Term Deposit", "EUR", start);
    deposit.description = Some("12 month deposit at 3.1% APR".to_string());
    deposit.end_date_time = Some(month_start(1));

    let mut crypto = Investment::new(CRYPTO_ID, "Bitcoin", "USD", start);
    crypto.description = Some("Long-term holding".to_string());

    vec![index_fund, deposit, crypto]
}

/// Monthly statements for the demo investments
pub fn generate_demo_entries() -> Result<Vec<InvestmentEntry>> {
    let mut entries = Vec::new();

    for month in 0..MONTHS_OF_HISTORY {
        let at = month_start(MONTHS_OF_HISTORY - 1 - month);
        let n = Decimal::from(month);

        // 500 initial + 200 a month, returns reinvested at roughly 0.6% a month
        let contributed = Decimal::from(500) + Decimal::from(200) * n;
        let reinvested = (contributed * Decimal::new(6, 3) * n / Decimal::TWO).round_dp(2);
        let profitability = Decimal::new(6, 3) * n;
        entries.push(
            InvestmentEntry::new(INDEX_FUND_ID, at, contributed, reinvested, profitability)?
                .with_comments(format!("Statement {}", month + 1)),
        );

        // Deposit accrues until it closes
        if month < MONTHS_OF_HISTORY - 1 {
            let accrued = (Decimal::new(31, 3) / Decimal::from(12) * n).round_dp(6);
            entries.push(InvestmentEntry::new(
                DEPOSIT_ID,
                at,
                Decimal::from(10_000),
                Decimal::ZERO,
                accrued,
            )?);
        }

        let crypto_total: i64 = CRYPTO_RETURNS_BP[..=month as usize].iter().sum();
        entries.push(InvestmentEntry::new(
            CRYPTO_ID,
            at,
            Decimal::from(1_500),
            Decimal::ZERO,
            Decimal::new(crypto_total, 4),
        )?);
    }

    Ok(entries)
}

/// Demo forecasts
pub fn generate_demo_forecasts() -> Vec<Forecast> {
    let start = month_start(MONTHS_OF_HISTORY - 1).date();
    let mut forecasts = Vec::new();

    let plans = [
        (INDEX_FUND_ID, "Six years", 72, ScenarioRates::new(Decimal::new(-2, 1), Decimal::new(5, 1), Decimal::new(9, 1))),
        (INDEX_FUND_ID, "Three years", 36, ScenarioRates::new(Decimal::new(-5, 1), Decimal::new(4, 1), Decimal::new(12, 1))),
        (CRYPTO_ID, "Next cycle", 48, ScenarioRates::new(Decimal::from(-3), Decimal::ONE, Decimal::from(5))),
    ];

    for (investment_id, name, months, rates) in plans {
        if let Some(end) = start.checked_add_months(Months::new(months)) {
            if let Ok(forecast) = Forecast::new(investment_id, name, start, end, rates) {
                forecasts.push(forecast);
            }
        }
    }

    forecasts
}
