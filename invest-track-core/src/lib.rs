//! Invest Track Core - investment tracking and forecast projection
//!
//! Hexagonal layout:
//!
//! - **domain**: investments, entries, forecasts, summaries
//! - **ports**: the Repository trait
//! - **services**: aggregation, projection and the services built on them
//! - **adapters**: DuckDB store and demo data

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::DuckDbRepository;
use config::Config;
use ports::Repository;
use services::{ForecastService, InvestmentService, SummaryService};

pub use domain::result::{Error, OperationResult};
pub use domain::{
    Forecast, ForecastDraft, ForecastDuration, ForecastStart, Investment, InvestmentEntry,
    Scenario, ScenarioRates, Summary,
};
pub use services::{
    compute_summary, project_combined, project_forecast, EntryPoint, ForecastProjection, LogEvent,
    LoggingService, ProjectionOptions,
};

/// Entry point for all business logic: configuration, store and services
pub struct InvestTrackContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub investment_service: InvestmentService,
    pub summary_service: SummaryService,
    pub forecast_service: ForecastService,
}

impl InvestTrackContext {
    /// Open the database for the configured mode and migrate it
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;
        let db_path = data_dir.join(config.db_filename());

        let repository = Arc::new(DuckDbRepository::new(&db_path)?);
        repository.ensure_schema()?;

        let store: Arc<dyn Repository> = repository.clone();
        let investment_service = InvestmentService::new(Arc::clone(&store));
        let summary_service = SummaryService::new(Arc::clone(&store));
        let forecast_service = ForecastService::new(store, config.projection_options());

        Ok(Self {
            config,
            repository,
            investment_service,
            summary_service,
            forecast_service,
        })
    }
}
