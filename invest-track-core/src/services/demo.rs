//! Demo service - manage demo mode
//!
//! Demo mode switches to demo.duckdb, seeded with sample investments,
//! entries and forecasts, leaving the real database untouched.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{info, warn};

use crate::adapters::demo::{generate_demo_entries, generate_demo_forecasts, generate_demo_investments};
use crate::adapters::duckdb::DuckDbRepository;
use crate::config::{Config, DEMO_DB_FILE};
use crate::ports::Repository;

pub struct DemoService {
    data_dir: PathBuf,
}

impl DemoService {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
        }
    }

    pub fn is_enabled(&self) -> Result<bool> {
        Ok(Config::load(&self.data_dir)?.demo_mode)
    }

    /// Enable demo mode with a freshly seeded demo database
    ///
    /// The setting is only saved once seeding succeeded; a failed seed
    /// leaves no demo database behind.
    pub fn enable(&self) -> Result<()> {
        self.remove_demo_db()?;

        let mut config = Config::load(&self.data_dir).unwrap_or_default();
        config.enable_demo_mode();

        if let Err(e) = self.seed(&config) {
            warn!(error = %e, "demo seeding failed");
            self.remove_demo_db()?;
            return Err(e);
        }

        config.save(&self.data_dir)?;
        info!("demo mode enabled");
        Ok(())
    }

    fn seed(&self, config: &Config) -> Result<()> {
        let repository = DuckDbRepository::new(&self.data_dir.join(config.db_filename()))?;
        repository.ensure_schema()?;

        for investment in generate_demo_investments() {
            repository.upsert_investment(&investment)?;
        }
        for entry in generate_demo_entries()? {
            repository.add_entry(&entry)?;
        }
        for forecast in generate_demo_forecasts() {
            repository.upsert_forecast(&forecast)?;
        }
        Ok(())
    }

    /// Disable demo mode, deleting the demo database when `clean` is set
    pub fn disable(&self, clean: bool) -> Result<()> {
        let mut config = Config::load(&self.data_dir).unwrap_or_default();
        config.disable_demo_mode();
        config.save(&self.data_dir)?;

        if clean {
            self.remove_demo_db()?;
        }

        info!(clean, "demo mode disabled");
        Ok(())
    }

    fn remove_demo_db(&self) -> Result<()> {
        let wal = format!("{}.wal", DEMO_DB_FILE);
        for file in [DEMO_DB_FILE, wal.as_str()] {
            let path = self.data_dir.join(file);
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}
