//! Summary statistics derived from investment entries

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregated amounts across one or more investments' last entries
///
/// Always derived, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub invested_amount: Decimal,
    pub obtained: Decimal,
    pub benefit: Decimal,
    /// Fraction of the invested amount; zero when nothing is invested
    pub profitability: Decimal,
}
