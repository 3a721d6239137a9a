//! CLI command implementations

pub mod demo;
pub mod entry;
pub mod forecast;
pub mod investment;
pub mod logs;
pub mod status;

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use invest_track_core::{EntryPoint, Investment, InvestTrackContext, LogEvent, LoggingService};

/// Install the diagnostics subscriber, filtered by INVEST_TRACK_LOG (default warn)
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("INVEST_TRACK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Logging service for CLI operations, None if it cannot be opened
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_data_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        if let Err(e) = l.log(event) {
            tracing::debug!("failed to write event log: {}", e);
        }
    }
}

/// Data directory from INVEST_TRACK_DIR, or ~/.invest-track
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("INVEST_TRACK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".invest-track"))
        .ok_or_else(|| anyhow!("Could not find home directory; set INVEST_TRACK_DIR"))
}

pub fn get_context() -> Result<InvestTrackContext> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    InvestTrackContext::new(&data_dir).context("Failed to initialize invest-track context")
}

/// Find an investment by id, unique id prefix or case-insensitive name
pub fn resolve_investment(ctx: &InvestTrackContext, needle: &str) -> Result<Investment> {
    let needle = needle.trim();
    if let Ok(id) = Uuid::parse_str(needle) {
        return ctx.investment_service.get(id);
    }

    let investments = ctx.investment_service.list()?;
    let lower = needle.to_lowercase();
    let mut matches: Vec<Investment> = investments
        .into_iter()
        .filter(|i| i.name.to_lowercase() == lower || i.id.to_string().starts_with(&lower))
        .collect();

    match matches.len() {
        0 => Err(invest_track_core::Error::not_found(format!("investment '{}'", needle)).into()),
        1 => Ok(matches.remove(0)),
        n => bail!("'{}' matches {} investments; use the full id", needle, n),
    }
}

/// Accepts a full id or a unique prefix among `ids`
pub fn resolve_id(needle: &str, ids: impl IntoIterator<Item = Uuid>, what: &str) -> Result<Uuid> {
    let needle = needle.trim().to_lowercase();
    if let Ok(id) = Uuid::parse_str(&needle) {
        return Ok(id);
    }

    let matches: Vec<Uuid> = ids
        .into_iter()
        .filter(|id| id.to_string().starts_with(&needle))
        .collect();
    match matches.as_slice() {
        [] => Err(invest_track_core::Error::not_found(format!("{} '{}'", what, needle)).into()),
        [id] => Ok(*id),
        _ => bail!("'{}' matches {} {}s; use more characters", needle, matches.len(), what),
    }
}

pub fn short_id(id: &Uuid) -> String {
    id.to_string()[..8].to_string()
}

pub fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|_| invest_track_core::Error::validation(format!("invalid date '{}', use YYYY-MM-DD", text.trim())).into())
}

/// "YYYY-MM-DD", "YYYY-MM-DD HH:MM" or "YYYY-MM-DD HH:MM:SS"
pub fn parse_datetime(text: &str) -> Result<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M"))
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| parse_date(text).map(|d| d.and_time(chrono::NaiveTime::default())).map_err(|_| ()))
        .map_err(|_| {
            invest_track_core::Error::validation(format!(
                "invalid datetime '{}', use YYYY-MM-DD [HH:MM[:SS]]",
                text
            ))
            .into()
        })
}

/// Decimal amount as typed ("1000", "1000.50", "1000,50")
pub fn parse_amount(text: &str, field: &str) -> Result<Decimal> {
    let cleaned = text.trim().replace(',', ".");
    Decimal::from_str(&cleaned)
        .map_err(|_| invest_track_core::Error::validation(format!("{} '{}' is not a number", field, text.trim())).into())
}

/// Percentage as typed ("12.5" or "12.5%") converted to a fraction
pub fn parse_percent(text: &str) -> Result<Decimal> {
    let value = parse_amount(text.trim().trim_end_matches('%'), "profitability")?;
    Ok(value / Decimal::ONE_HUNDRED)
}

pub fn format_percent(fraction: &Decimal) -> String {
    format!("{:.2} %", fraction * Decimal::ONE_HUNDRED)
}

pub fn format_money(amount: &Decimal) -> String {
    format!("{:.2}", amount)
}
