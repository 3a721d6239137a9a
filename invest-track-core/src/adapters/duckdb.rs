//! DuckDB repository implementation

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use duckdb::types::Type;
use duckdb::{params, Connection, Row};
use rust_decimal::Decimal;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Forecast, Investment, InvestmentEntry, ScenarioRates};
use crate::ports::Repository;
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of attempts when the database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock on file")
}

const INVESTMENT_COLUMNS: &str = "SELECT investment_id, name, description, currency,
        start_date_time::VARCHAR, end_date_time::VARCHAR, is_reinvested,
        created_at::VARCHAR, updated_at::VARCHAR
    FROM sys_investments";

const ENTRY_COLUMNS: &str = "SELECT entry_id, investment_id, entry_datetime::VARCHAR,
        CAST(initial_invested_amount AS VARCHAR), CAST(reinvested_amount AS VARCHAR),
        CAST(total_invested_amount AS VARCHAR), CAST(profitability AS VARCHAR),
        CAST(obtained AS VARCHAR), CAST(benefit AS VARCHAR), comments,
        created_at::VARCHAR, updated_at::VARCHAR
    FROM sys_investment_entries";

const FORECAST_COLUMNS: &str = "SELECT forecast_id, investment_id, name,
        start_date::VARCHAR, end_date::VARCHAR,
        CAST(pessimist_rate AS VARCHAR), CAST(neutral_rate AS VARCHAR), CAST(optimist_rate AS VARCHAR),
        created_at::VARCHAR, updated_at::VARCHAR
    FROM sys_forecasts";

/// DuckDB-backed [`Repository`]
///
/// A single connection is shared behind a mutex, so one repository can be
/// used from several threads.
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbRepository {
    /// Open (or create) the database file
    ///
    /// Retries with exponential backoff while another process holds the
    /// file lock.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    debug!(path = %db_path.display(), "opened database");
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            "database busy, retrying: {}",
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::database(format!("failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// In-memory database, mostly for tests
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            db_path: PathBuf::from(":memory:"),
        })
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extensions are statically linked; autoloading cached ones is not wanted
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("connection lock poisoned: {}", e)))
    }

    /// Run pending migrations and report what was applied
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.conn()?;
        MigrationService::new(&conn)
            .run_pending()
            .map_err(|e| Error::database(format!("migration failed: {}", e)))
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn load_entries(conn: &Connection, investment_id: Option<Uuid>) -> Result<Vec<InvestmentEntry>> {
        let order = "ORDER BY entry_datetime ASC, created_at ASC";
        let entries = match investment_id {
            Some(id) => {
                let mut stmt = conn.prepare(&format!("{} WHERE investment_id = ? {}", ENTRY_COLUMNS, order))?;
                let rows = stmt.query_map([id.to_string()], row_to_entry)?;
                rows.collect::<duckdb::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!("{} {}", ENTRY_COLUMNS, order))?;
                let rows = stmt.query_map([], row_to_entry)?;
                rows.collect::<duckdb::Result<Vec<_>>>()?
            }
        };
        Ok(entries)
    }
}

impl Repository for DuckDbRepository {
    fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    // === Investments ===

    fn upsert_investment(&self, investment: &Investment) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sys_investments (investment_id, name, description, currency,
                                          start_date_time, end_date_time, is_reinvested,
                                          created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (investment_id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                currency = EXCLUDED.currency,
                start_date_time = EXCLUDED.start_date_time,
                end_date_time = EXCLUDED.end_date_time,
                is_reinvested = EXCLUDED.is_reinvested,
                updated_at = EXCLUDED.updated_at",
            params![
                investment.id.to_string(),
                investment.name,
                investment.description,
                investment.currency,
                format_naive(&investment.start_date_time),
                investment.end_date_time.as_ref().map(format_naive),
                investment.is_reinvested,
                format_utc(&investment.created_at),
                format_utc(&investment.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_investments(&self) -> Result<Vec<Investment>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY start_date_time ASC, name ASC", INVESTMENT_COLUMNS))?;
        let mut investments = stmt
            .query_map([], row_to_investment)?
            .collect::<duckdb::Result<Vec<_>>>()?;

        let mut entries_by_investment: HashMap<Uuid, Vec<InvestmentEntry>> = HashMap::new();
        for entry in Self::load_entries(&conn, None)? {
            entries_by_investment
                .entry(entry.investment_id)
                .or_default()
                .push(entry);
        }
        for investment in &mut investments {
            investment.entries = entries_by_investment.remove(&investment.id).unwrap_or_default();
        }

        Ok(investments)
    }

    fn get_investment_by_id(&self, id: Uuid) -> Result<Option<Investment>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{} WHERE investment_id = ?", INVESTMENT_COLUMNS))?;
        let mut rows = stmt.query_map([id.to_string()], row_to_investment)?;

        match rows.next() {
            Some(investment) => {
                let mut investment = investment?;
                investment.entries = Self::load_entries(&conn, Some(id))?;
                Ok(Some(investment))
            }
            None => Ok(None),
        }
    }

    fn delete_investment(&self, id: Uuid) -> Result<()> {
        let mut conn = self.conn()?;
        let id = id.to_string();

        // Children first, then the investment itself
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM sys_forecasts WHERE investment_id = ?", params![id])?;
        tx.execute("DELETE FROM sys_investment_entries WHERE investment_id = ?", params![id])?;
        tx.execute("DELETE FROM sys_investments WHERE investment_id = ?", params![id])?;
        tx.commit()?;

        Ok(())
    }

    // === Entries ===

    fn add_entry(&self, entry: &InvestmentEntry) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sys_investment_entries (entry_id, investment_id, entry_datetime,
                                                 initial_invested_amount, reinvested_amount,
                                                 total_invested_amount, profitability, obtained,
                                                 benefit, comments, created_at, updated_at)
             VALUES (?, ?, ?,
                     CAST(? AS DECIMAL(38, 10)), CAST(? AS DECIMAL(38, 10)),
                     CAST(? AS DECIMAL(38, 10)), CAST(? AS DECIMAL(38, 10)),
                     CAST(? AS DECIMAL(38, 10)), CAST(? AS DECIMAL(38, 10)),
                     ?, ?, ?)",
            params![
                entry.id.to_string(),
                entry.investment_id.to_string(),
                format_naive(&entry.datetime),
                entry.initial_invested_amount.to_string(),
                entry.reinvested_amount.to_string(),
                entry.total_invested_amount.to_string(),
                entry.profitability.to_string(),
                entry.obtained.to_string(),
                entry.benefit.to_string(),
                entry.comments,
                format_utc(&entry.created_at),
                format_utc(&entry.updated_at),
            ],
        )?;
        Ok(())
    }

    fn update_entry(&self, entry: &InvestmentEntry) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE sys_investment_entries SET
                entry_datetime = ?,
                initial_invested_amount = CAST(? AS DECIMAL(38, 10)),
                reinvested_amount = CAST(? AS DECIMAL(38, 10)),
                total_invested_amount = CAST(? AS DECIMAL(38, 10)),
                profitability = CAST(? AS DECIMAL(38, 10)),
                obtained = CAST(? AS DECIMAL(38, 10)),
                benefit = CAST(? AS DECIMAL(38, 10)),
                comments = ?,
                updated_at = ?
             WHERE entry_id = ? AND investment_id = ?",
            params![
                format_naive(&entry.datetime),
                entry.initial_invested_amount.to_string(),
                entry.reinvested_amount.to_string(),
                entry.total_invested_amount.to_string(),
                entry.profitability.to_string(),
                entry.obtained.to_string(),
                entry.benefit.to_string(),
                entry.comments,
                format_utc(&entry.updated_at),
                entry.id.to_string(),
                entry.investment_id.to_string(),
            ],
        )?;

        if updated == 0 {
            return Err(Error::not_found(format!("entry {}", entry.id)));
        }
        Ok(())
    }

    fn get_entries(&self, investment_id: Uuid) -> Result<Vec<InvestmentEntry>> {
        let conn = self.conn()?;
        Self::load_entries(&conn, Some(investment_id))
    }

    fn delete_entry(&self, investment_id: Uuid, entry_id: Uuid) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM sys_investment_entries WHERE entry_id = ? AND investment_id = ?",
            params![entry_id.to_string(), investment_id.to_string()],
        )?;
        Ok(deleted > 0)
    }

    // === Forecasts ===

    fn upsert_forecast(&self, forecast: &Forecast) -> Result<()> {
        let conn = self.conn()?;
        let rates = &forecast.scenario_rates;
        conn.execute(
            "INSERT INTO sys_forecasts (forecast_id, investment_id, name, start_date, end_date,
                                        pessimist_rate, neutral_rate, optimist_rate,
                                        created_at, updated_at)
             VALUES (?, ?, ?, ?, ?,
                     CAST(? AS DECIMAL(38, 10)), CAST(? AS DECIMAL(38, 10)), CAST(? AS DECIMAL(38, 10)),
                     ?, ?)
             ON CONFLICT (forecast_id) DO UPDATE SET
                name = EXCLUDED.name,
                start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date,
                pessimist_rate = EXCLUDED.pessimist_rate,
                neutral_rate = EXCLUDED.neutral_rate,
                optimist_rate = EXCLUDED.optimist_rate,
                updated_at = EXCLUDED.updated_at",
            params![
                forecast.id.to_string(),
                forecast.investment_id.to_string(),
                forecast.name,
                forecast.start_date.to_string(),
                forecast.end_date.to_string(),
                rates.pessimist.to_string(),
                rates.neutral.to_string(),
                rates.optimist.to_string(),
                format_utc(&forecast.created_at),
                format_utc(&forecast.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_forecasts(&self, investment_id: Uuid) -> Result<Vec<Forecast>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE investment_id = ? ORDER BY created_at ASC, name ASC",
            FORECAST_COLUMNS
        ))?;
        let forecasts = stmt
            .query_map([investment_id.to_string()], row_to_forecast)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(forecasts)
    }

    fn get_forecast_by_id(&self, id: Uuid) -> Result<Option<Forecast>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{} WHERE forecast_id = ?", FORECAST_COLUMNS))?;
        let mut rows = stmt.query_map([id.to_string()], row_to_forecast)?;
        Ok(rows.next().transpose()?)
    }

    fn delete_forecast(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM sys_forecasts WHERE forecast_id = ?",
            params![id.to_string()],
        )?;
        Ok(deleted > 0)
    }
}

// Row mapping

fn row_to_investment(row: &Row) -> duckdb::Result<Investment> {
    Ok(Investment {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        currency: row.get(3)?,
        start_date_time: naive_at(row, 4)?,
        end_date_time: row
            .get::<_, Option<String>>(5)?
            .map(|s| parse_naive_datetime(&s).map_err(|e| conversion_error(5, e)))
            .transpose()?,
        is_reinvested: row.get(6)?,
        entries: Vec::new(),
        created_at: utc_at(row, 7)?,
        updated_at: utc_at(row, 8)?,
    })
}

/// Derived amounts are recomputed from the stored inputs; the stored
/// columns are rounded to the column scale.
fn row_to_entry(row: &Row) -> duckdb::Result<InvestmentEntry> {
    let mut entry = InvestmentEntry {
        id: uuid_at(row, 0)?,
        investment_id: uuid_at(row, 1)?,
        datetime: naive_at(row, 2)?,
        initial_invested_amount: decimal_at(row, 3)?,
        reinvested_amount: decimal_at(row, 4)?,
        total_invested_amount: decimal_at(row, 5)?,
        profitability: decimal_at(row, 6)?,
        obtained: decimal_at(row, 7)?,
        benefit: decimal_at(row, 8)?,
        comments: row.get(9)?,
        created_at: utc_at(row, 10)?,
        updated_at: utc_at(row, 11)?,
    };
    entry.recalculate().map_err(|e| conversion_error(7, e))?;
    Ok(entry)
}

fn row_to_forecast(row: &Row) -> duckdb::Result<Forecast> {
    Ok(Forecast {
        id: uuid_at(row, 0)?,
        investment_id: uuid_at(row, 1)?,
        name: row.get(2)?,
        start_date: date_at(row, 3)?,
        end_date: date_at(row, 4)?,
        scenario_rates: ScenarioRates::new(decimal_at(row, 5)?, decimal_at(row, 6)?, decimal_at(row, 7)?),
        created_at: utc_at(row, 8)?,
        updated_at: utc_at(row, 9)?,
    })
}

fn conversion_error<E>(idx: usize, err: E) -> duckdb::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    duckdb::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn uuid_at(row: &Row, idx: usize) -> duckdb::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text).map_err(|e| conversion_error(idx, e))
}

fn decimal_at(row: &Row, idx: usize) -> duckdb::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str_exact(&text)
        .map(|d| d.normalize())
        .map_err(|e| conversion_error(idx, e))
}

fn naive_at(row: &Row, idx: usize) -> duckdb::Result<NaiveDateTime> {
    let text: String = row.get(idx)?;
    parse_naive_datetime(&text).map_err(|e| conversion_error(idx, e))
}

fn utc_at(row: &Row, idx: usize) -> duckdb::Result<DateTime<Utc>> {
    naive_at(row, idx).map(|dt| dt.and_utc())
}

fn date_at(row: &Row, idx: usize) -> duckdb::Result<NaiveDate> {
    let text: String = row.get(idx)?;
    NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_err(|e| conversion_error(idx, e))
}

// Helper functions

fn format_naive(dt: &NaiveDateTime) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

/// UTC timestamps are stored as naive UTC
fn format_utc(dt: &DateTime<Utc>) -> String {
    format_naive(&dt.naive_utc())
}

fn parse_naive_datetime(s: &str) -> std::result::Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
}
