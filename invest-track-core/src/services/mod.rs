//! Service layer - business logic orchestration
//!
//! Aggregation and projection are pure functions over domain values. The
//! other services load from the Repository port and call into them.

pub mod aggregation;
mod demo;
mod forecast;
mod investment;
pub mod logging;
pub mod migration;
pub mod projection;
mod summary;

pub use aggregation::{compute_summary, summarize_investment};
pub use demo::DemoService;
pub use forecast::ForecastService;
pub use investment::{EntryDraft, InvestmentDraft, InvestmentService};
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use projection::{
    project_combined, project_forecast, ForecastProjection, ProjectionOptions, ScenarioSeries,
};
pub use summary::{InvestmentSummary, PortfolioStatus, SummaryService};
