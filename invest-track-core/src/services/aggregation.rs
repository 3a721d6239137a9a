//! Aggregation - summary statistics over investments' last entries

use rust_decimal::Decimal;

use crate::domain::result::{Error, Result};
use crate::domain::{Investment, Summary};

/// Portfolio-wide summary across every investment's last entry
///
/// Investments without entries contribute nothing. Profitability is zero
/// when nothing is invested. Totals beyond the decimal range are a
/// validation error.
pub fn compute_summary(investments: &[Investment]) -> Result<Summary> {
    let overflow = || Error::validation("portfolio totals are too large to summarize");

    let (invested_amount, obtained) = investments
        .iter()
        .filter_map(Investment::last_entry)
        .try_fold((Decimal::ZERO, Decimal::ZERO), |(invested, obtained), entry| {
            Some((
                invested.checked_add(entry.total_invested_amount)?,
                obtained.checked_add(entry.obtained)?,
            ))
        })
        .ok_or_else(overflow)?;

    let benefit = obtained.checked_sub(invested_amount).ok_or_else(overflow)?;

    Ok(Summary {
        invested_amount,
        obtained,
        benefit,
        profitability: profitability(benefit, invested_amount),
    })
}

/// Summary of a single investment's current snapshot
pub fn summarize_investment(investment: &Investment) -> Result<Summary> {
    compute_summary(std::slice::from_ref(investment))
}

fn profitability(benefit: Decimal, invested_amount: Decimal) -> Decimal {
    if invested_amount > Decimal::ZERO {
        benefit.checked_div(invested_amount).unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InvestmentEntry;
    use chrono::{NaiveDate, NaiveDateTime};
    use uuid::Uuid;

    fn at(month: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, month, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn investment_with(entries: &[(u32, i64, i64, Decimal)]) -> Investment {
        let id = Uuid::new_v4();
        let mut investment = Investment::new(id, "Fund", "EUR", at(1));
        for &(month, initial, reinvested, profitability) in entries {
            let entry = InvestmentEntry::new(
                id,
                at(month),
                Decimal::from(initial),
                Decimal::from(reinvested),
                profitability,
            )
            .unwrap();
            investment.push_entry(entry);
        }
        investment
    }

    #[test]
    fn test_empty_portfolio() {
        assert_eq!(compute_summary(&[]).unwrap(), Summary::default());
    }

    #[test]
    fn test_sums_last_entries() {
        let investments = vec![
            investment_with(&[(1, 500, 0, Decimal::ZERO), (2, 1000, 0, Decimal::new(2, 1))]),
            investment_with(&[(1, 800, 1200, Decimal::new(1, 1))]),
            investment_with(&[]),
        ];

        let summary = compute_summary(&investments).unwrap();

        assert_eq!(summary.invested_amount, Decimal::from(3000));
        assert_eq!(summary.obtained, Decimal::from(3400));
        assert_eq!(summary.benefit, Decimal::from(400));
        assert_eq!(summary.profitability.round_dp(4), Decimal::new(1333, 4));
    }

    #[test]
    fn test_last_entry_is_latest_datetime() {
        let id = Uuid::new_v4();
        let mut investment = Investment::new(id, "Fund", "EUR", at(1));
        // Deliberately out of order
        investment.entries = vec![
            InvestmentEntry::new(id, at(6), Decimal::from(2000), Decimal::ZERO, Decimal::ZERO).unwrap(),
            InvestmentEntry::new(id, at(1), Decimal::from(100), Decimal::ZERO, Decimal::ZERO).unwrap(),
        ];

        assert_eq!(summarize_investment(&investment).unwrap().invested_amount, Decimal::from(2000));
    }

    #[test]
    fn test_zero_invested_has_zero_profitability() {
        let investments = vec![
            investment_with(&[(1, 0, 0, Decimal::new(2, 1))]),
            investment_with(&[(1, 0, 0, Decimal::new(1, 1))]),
        ];

        let summary = compute_summary(&investments).unwrap();

        assert_eq!(summary.invested_amount, Decimal::ZERO);
        assert_eq!(summary.obtained, Decimal::ZERO);
        assert_eq!(summary.profitability, Decimal::ZERO);
    }

    #[test]
    fn test_losses_give_negative_profitability() {
        let investments = vec![investment_with(&[(1, 1000, 0, Decimal::new(-1, 1))])];

        let summary = compute_summary(&investments).unwrap();

        assert_eq!(summary.benefit, Decimal::from(-100));
        assert_eq!(summary.profitability, Decimal::new(-1, 1));
    }

    #[test]
    fn test_overflowing_totals_are_rejected() {
        let id = Uuid::new_v4();
        let oversized = |offset: i64| {
            let mut investment = Investment::new(Uuid::new_v4(), "Fund", "EUR", at(1));
            // Bypass entry validation to model totals near the decimal limit
            let mut entry = InvestmentEntry::new(id, at(2), Decimal::ONE, Decimal::ZERO, Decimal::ZERO).unwrap();
            entry.total_invested_amount = Decimal::MAX / Decimal::TWO + Decimal::from(offset);
            entry.obtained = entry.total_invested_amount;
            investment.push_entry(entry);
            investment
        };

        let err = compute_summary(&[oversized(1), oversized(2)]).unwrap_err();
        assert!(err.is_validation());
    }
}
