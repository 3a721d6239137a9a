//! Configuration management
//!
//! settings.json in the data directory:
//! ```json
//! {
//!   "app": { "demoMode": false },
//!   "projection": { "dateFormat": "%Y-%m-%d", "monthLabel": "Month" }
//! }
//! ```
//! Keys this crate does not manage are kept as they are when saving.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::services::projection::{
    is_valid_date_format, ProjectionOptions, DEFAULT_DATE_FORMAT, DEFAULT_MONTH_LABEL,
};

const SETTINGS_FILE: &str = "settings.json";

/// Database used while demo mode is on
pub const DEMO_DB_FILE: &str = "demo.duckdb";

/// Database holding the user's own data
pub const MAIN_DB_FILE: &str = "invest-track.duckdb";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(default)]
    projection: ProjectionSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    demo_mode: bool,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectionSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    month_label: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Invest Track configuration (the managed view of settings.json)
#[derive(Debug, Clone)]
pub struct Config {
    pub demo_mode: bool,
    /// strftime format for real-entry categories
    pub date_format: String,
    /// Prefix for synthetic month categories
    pub month_label: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            demo_mode: false,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            month_label: DEFAULT_MONTH_LABEL.to_string(),
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// INVEST_TRACK_DEMO_MODE overrides the stored demo flag. A date format
    /// chrono cannot render falls back to the default.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let raw = read_settings(data_dir)?;

        let demo_mode = match std::env::var("INVEST_TRACK_DEMO_MODE").ok().as_deref() {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => true,
            Some("false" | "0" | "no" | "FALSE" | "NO") => false,
            _ => raw.app.demo_mode,
        };

        let date_format = match raw.projection.date_format {
            Some(format) if is_valid_date_format(&format) => format,
            Some(format) => {
                warn!(format = %format, "ignoring invalid projection date format");
                DEFAULT_DATE_FORMAT.to_string()
            }
            None => DEFAULT_DATE_FORMAT.to_string(),
        };

        let month_label = raw
            .projection
            .month_label
            .filter(|label| !label.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MONTH_LABEL.to_string());

        Ok(Self {
            demo_mode,
            date_format,
            month_label,
        })
    }

    /// Save the managed fields, preserving everything else in settings.json
    ///
    /// A date format chrono cannot render is refused rather than written.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        ProjectionOptions::new(self.date_format.as_str(), self.month_label.as_str())?;
        let mut settings = read_settings(data_dir)?;

        settings.app.demo_mode = self.demo_mode;
        settings.projection.date_format = non_default(&self.date_format, DEFAULT_DATE_FORMAT);
        settings.projection.month_label = non_default(&self.month_label, DEFAULT_MONTH_LABEL);

        let content = serde_json::to_string_pretty(&settings)?;
        let settings_path = data_dir.join(SETTINGS_FILE);
        std::fs::write(&settings_path, content)
            .with_context(|| format!("Failed to write {}", settings_path.display()))?;
        Ok(())
    }

    pub fn enable_demo_mode(&mut self) {
        self.demo_mode = true;
    }

    pub fn disable_demo_mode(&mut self) {
        self.demo_mode = false;
    }

    /// Database file for the current mode
    pub fn db_filename(&self) -> &'static str {
        if self.demo_mode {
            DEMO_DB_FILE
        } else {
            MAIN_DB_FILE
        }
    }

    /// Category rendering options for the projection engine
    pub fn projection_options(&self) -> ProjectionOptions {
        ProjectionOptions {
            date_format: self.date_format.clone(),
            month_label: self.month_label.clone(),
        }
    }
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let settings_path = data_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }

    let content = std::fs::read_to_string(&settings_path)
        .with_context(|| format!("Failed to read {}", settings_path.display()))?;
    match serde_json::from_str(&content) {
        Ok(settings) => Ok(settings),
        Err(e) => {
            warn!(error = %e, "settings.json is not valid, using defaults");
            Ok(SettingsFile::default())
        }
    }
}

fn non_default(value: &str, default: &str) -> Option<String> {
    (value != default).then(|| value.to_string())
}
