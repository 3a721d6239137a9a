//! Forecast service - stored forecasts and their projections
//!
//! Every call reads the affected investment's entries and forecasts from the
//! store; no projection is cached.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::result::Error;
use crate::domain::{Forecast, ForecastDraft};
use crate::ports::Repository;
use crate::services::projection::{project_combined, project_forecast, ForecastProjection, ProjectionOptions};

pub struct ForecastService {
    repository: Arc<dyn Repository>,
    options: ProjectionOptions,
}

impl ForecastService {
    pub fn new(repository: Arc<dyn Repository>, options: ProjectionOptions) -> Self {
        Self { repository, options }
    }

    pub fn options(&self) -> &ProjectionOptions {
        &self.options
    }

    /// Forecasts of an investment, oldest first
    pub fn list(&self, investment_id: Uuid) -> Result<Vec<Forecast>> {
        self.require_investment(investment_id)?;
        Ok(self.repository.get_forecasts(investment_id)?)
    }

    pub fn get(&self, forecast_id: Uuid) -> Result<Forecast> {
        Ok(self
            .repository
            .get_forecast_by_id(forecast_id)?
            .ok_or_else(|| Error::not_found(format!("forecast {}", forecast_id)))?)
    }

    /// Validate a draft against the investment's entries and store it
    pub fn create(&self, investment_id: Uuid, draft: &ForecastDraft) -> Result<Forecast> {
        self.require_investment(investment_id)?;
        let entries = self.repository.get_entries(investment_id)?;
        let forecast = draft.resolve(investment_id, &entries)?;

        self.repository.upsert_forecast(&forecast)?;
        info!(investment_id = %investment_id, forecast_id = %forecast.id, "created forecast");
        Ok(forecast)
    }

    /// Replace a forecast's fields, keeping its id and creation time
    pub fn update(&self, forecast_id: Uuid, draft: &ForecastDraft) -> Result<Forecast> {
        let existing = self.get(forecast_id)?;
        let entries = self.repository.get_entries(existing.investment_id)?;
        let resolved = draft.resolve(existing.investment_id, &entries)?;

        let forecast = Forecast {
            id: existing.id,
            created_at: existing.created_at,
            updated_at: Utc::now(),
            ..resolved
        };

        self.repository.upsert_forecast(&forecast)?;
        debug!(forecast_id = %forecast_id, "updated forecast");
        Ok(forecast)
    }

    pub fn delete(&self, forecast_id: Uuid) -> Result<()> {
        if !self.repository.delete_forecast(forecast_id)? {
            return Err(Error::not_found(format!("forecast {}", forecast_id)).into());
        }
        info!(forecast_id = %forecast_id, "deleted forecast");
        Ok(())
    }

    /// Project one forecast against its investment's entries
    pub fn project(&self, forecast_id: Uuid) -> Result<ForecastProjection> {
        let forecast = self.get(forecast_id)?;
        let entries = self.repository.get_entries(forecast.investment_id)?;

        let projection = project_forecast(&entries, &forecast, &self.options)?;
        debug!(forecast_id = %forecast_id, horizon = projection.horizon(), "projected forecast");
        Ok(projection)
    }

    /// Project every forecast of an investment on one shared axis
    pub fn project_investment(&self, investment_id: Uuid) -> Result<ForecastProjection> {
        self.require_investment(investment_id)?;
        let entries = self.repository.get_entries(investment_id)?;
        let forecasts = self.repository.get_forecasts(investment_id)?;

        let projection = project_combined(&entries, &forecasts, &self.options)?;
        debug!(
            investment_id = %investment_id,
            forecasts = forecasts.len(),
            horizon = projection.horizon(),
            "projected combined forecasts"
        );
        Ok(projection)
    }

    fn require_investment(&self, investment_id: Uuid) -> Result<()> {
        if self.repository.get_investment_by_id(investment_id)?.is_none() {
            return Err(Error::not_found(format!("investment {}", investment_id)).into());
        }
        Ok(())
    }
}
