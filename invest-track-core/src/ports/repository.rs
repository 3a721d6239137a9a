//! Repository port - the data store for investments, entries and forecasts

use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Forecast, Investment, InvestmentEntry};

/// Data store abstraction
///
/// Investments are returned with their entries loaded and ordered by
/// datetime. Entries and forecasts never outlive their investment.
pub trait Repository: Send + Sync {
    // === Schema ===

    /// Run any pending migrations
    fn ensure_schema(&self) -> Result<()>;

    // === Investments ===

    /// Insert or update an investment (entries are stored separately)
    fn upsert_investment(&self, investment: &Investment) -> Result<()>;

    /// Get all investments with their entries
    fn get_investments(&self) -> Result<Vec<Investment>>;

    /// Get an investment with its entries
    fn get_investment_by_id(&self, id: Uuid) -> Result<Option<Investment>>;

    /// Delete an investment together with its entries and forecasts
    fn delete_investment(&self, id: Uuid) -> Result<()>;

    // === Entries ===

    fn add_entry(&self, entry: &InvestmentEntry) -> Result<()>;

    fn update_entry(&self, entry: &InvestmentEntry) -> Result<()>;

    /// Entries of one investment, ordered by datetime ascending
    fn get_entries(&self, investment_id: Uuid) -> Result<Vec<InvestmentEntry>>;

    /// Returns false when no entry matched
    fn delete_entry(&self, investment_id: Uuid, entry_id: Uuid) -> Result<bool>;

    // === Forecasts ===

    fn upsert_forecast(&self, forecast: &Forecast) -> Result<()>;

    /// Forecasts of one investment, ordered by creation time
    fn get_forecasts(&self, investment_id: Uuid) -> Result<Vec<Forecast>>;

    fn get_forecast_by_id(&self, id: Uuid) -> Result<Option<Forecast>>;

    /// Returns false when no forecast matched
    fn delete_forecast(&self, id: Uuid) -> Result<bool>;
}
