//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

pub mod forecast;
mod investment;
pub mod result;
mod summary;

pub use forecast::{Forecast, ForecastDraft, ForecastDuration, ForecastStart, Scenario, ScenarioRates};
pub use investment::{Investment, InvestmentEntry};
pub use summary::Summary;
