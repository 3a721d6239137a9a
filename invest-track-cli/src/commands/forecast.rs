//! Forecast commands - manage forecasts and print their projections

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use colored::Colorize;
use comfy_table::Cell;
use dialoguer::{Confirm, Input};
use serde_json::json;
use uuid::Uuid;

use invest_track_core::domain::forecast::parse_rate;
use invest_track_core::{
    Forecast, ForecastDraft, ForecastDuration, ForecastProjection, ForecastStart, Investment,
    InvestTrackContext, OperationResult, ScenarioRates,
};

use super::{format_money, get_context, parse_date, resolve_id, resolve_investment, short_id};
use crate::output::{self, create_table, number_cell};

/// Start, duration and rate flags shared by `new` and `edit`
#[derive(Args)]
pub struct ForecastFields {
    /// Start date (YYYY-MM-DD)
    #[arg(long, conflicts_with = "from_entry")]
    start: Option<String>,
    /// Start on the date of this entry (id or id prefix)
    #[arg(long)]
    from_entry: Option<String>,
    /// Duration in months
    #[arg(long, conflicts_with = "end")]
    months: Option<u32>,
    /// End date (YYYY-MM-DD)
    #[arg(long)]
    end: Option<String>,
    /// Pessimist monthly growth in percent
    #[arg(long, allow_hyphen_values = true)]
    pessimist: Option<String>,
    /// Neutral monthly growth in percent
    #[arg(long, allow_hyphen_values = true)]
    neutral: Option<String>,
    /// Optimist monthly growth in percent
    #[arg(long, allow_hyphen_values = true)]
    optimist: Option<String>,
    /// Output as JSON (no prompts)
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
pub enum ForecastCommands {
    /// List the forecasts of an investment
    List {
        /// Investment id, id prefix or name
        investment: String,
        #[arg(long)]
        json: bool,
    },

    /// Create a forecast
    New {
        investment: String,
        /// Forecast name (prompted when omitted)
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: ForecastFields,
    },

    /// Edit a forecast; omitted fields keep their value
    Edit {
        investment: String,
        /// Forecast id, id prefix or name
        forecast: String,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: ForecastFields,
    },

    /// Remove a forecast
    Remove {
        investment: String,
        forecast: String,
        #[arg(long, short)]
        force: bool,
        #[arg(long)]
        json: bool,
    },

    /// Project one forecast, or all forecasts of the investment together
    Project {
        investment: String,
        /// Forecast id, id prefix or name
        #[arg(required_unless_present = "all")]
        forecast: Option<String>,
        /// Combine every forecast of the investment on one axis
        #[arg(long, conflicts_with = "forecast")]
        all: bool,
        #[arg(long)]
        json: bool,
    },
}

impl ForecastCommands {
    pub fn name(&self) -> &'static str {
        match self {
            ForecastCommands::List { .. } => "forecast_list",
            ForecastCommands::New { .. } => "forecast_new",
            ForecastCommands::Edit { .. } => "forecast_edit",
            ForecastCommands::Remove { .. } => "forecast_remove",
            ForecastCommands::Project { all: true, .. } => "forecast_project_combined",
            ForecastCommands::Project { .. } => "forecast_project",
        }
    }
}

pub fn run(command: ForecastCommands) -> Result<()> {
    let ctx = get_context()?;
    match command {
        ForecastCommands::List { investment, json } => {
            let investment = resolve_investment(&ctx, &investment)?;
            run_list(&ctx, &investment, json)
        }
        ForecastCommands::New { investment, name, fields } => {
            let investment = resolve_investment(&ctx, &investment)?;
            let name = match name {
                Some(n) => n,
                None if fields.json => bail!("--name is required with --json"),
                None => Input::new().with_prompt("Forecast name").interact_text()?,
            };
            let draft = build_draft(&investment, name, &fields, None)?;
            let forecast = ctx.forecast_service.create(investment.id, &draft)?;
            report(&forecast, "created", fields.json)
        }
        ForecastCommands::Edit { investment, forecast, name, fields } => {
            let investment = resolve_investment(&ctx, &investment)?;
            let current = resolve_forecast(&ctx, &investment, &forecast)?;
            let name = name.unwrap_or_else(|| current.name.clone());
            let draft = build_draft(&investment, name, &fields, Some(&current))?;
            let updated = ctx.forecast_service.update(current.id, &draft)?;
            report(&updated, "updated", fields.json)
        }
        ForecastCommands::Remove { investment, forecast, force, json } => {
            let investment = resolve_investment(&ctx, &investment)?;
            let forecast = resolve_forecast(&ctx, &investment, &forecast)?;
            if !force && !json {
                let prompt = format!("Remove forecast '{}' from '{}'?", forecast.name, investment.name);
                if !Confirm::new().with_prompt(prompt).default(false).interact()? {
                    println!("{}\n", "Cancelled".dimmed());
                    return Ok(());
                }
            }
            ctx.forecast_service.delete(forecast.id)?;
            if json {
                let result = OperationResult::ok(forecast.id).with_context("name", json!(forecast.name));
                return output::print_json(&result);
            }
            output::success(&format!("Forecast '{}' removed", forecast.name));
            Ok(())
        }
        ForecastCommands::Project { investment, forecast, all, json } => {
            let investment = resolve_investment(&ctx, &investment)?;
            let (title, projection) = match forecast.filter(|_| !all) {
                Some(needle) => {
                    let forecast = resolve_forecast(&ctx, &investment, &needle)?;
                    (forecast.name.clone(), ctx.forecast_service.project(forecast.id)?)
                }
                None => (
                    format!("{} - all forecasts", investment.name),
                    ctx.forecast_service.project_investment(investment.id)?,
                ),
            };
            if json {
                return output::print_json(&projection);
            }
            print_projection(&title, &investment, &projection);
            Ok(())
        }
    }
}

fn run_list(ctx: &InvestTrackContext, investment: &Investment, json: bool) -> Result<()> {
    let forecasts = ctx.forecast_service.list(investment.id)?;
    if json {
        return output::print_json(&forecasts);
    }
    if forecasts.is_empty() {
        println!("{}", format!("No forecasts for '{}'", investment.name).dimmed());
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["ID", "Name", "Start", "End", "Months", "Pessimist", "Neutral", "Optimist"]);
    for forecast in &forecasts {
        let months = forecast.months().map(|m| m.to_string()).unwrap_or_else(|_| "-".to_string());
        let rates = &forecast.scenario_rates;
        table.add_row(vec![
            Cell::new(short_id(&forecast.id)),
            Cell::new(&forecast.name),
            Cell::new(forecast.start_date),
            Cell::new(forecast.end_date),
            number_cell(months),
            number_cell(format!("{} %", rates.pessimist)),
            number_cell(format!("{} %", rates.neutral)),
            number_cell(format!("{} %", rates.optimist)),
        ]);
    }
    println!("{}", table);
    Ok(())
}

/// Find a forecast of `investment` by id, id prefix or case-insensitive name
fn resolve_forecast(ctx: &InvestTrackContext, investment: &Investment, needle: &str) -> Result<Forecast> {
    let forecasts = ctx.forecast_service.list(investment.id)?;
    let lower = needle.trim().to_lowercase();
    if let Some(found) = forecasts.iter().find(|f| f.name.to_lowercase() == lower) {
        return Ok(found.clone());
    }
    let id = resolve_id(needle, forecasts.iter().map(|f| f.id), "forecast")?;
    forecasts
        .into_iter()
        .find(|f| f.id == id)
        .ok_or_else(|| invest_track_core::Error::not_found(format!("forecast {}", id)).into())
}

fn resolve_entry_id(investment: &Investment, needle: &str) -> Result<Uuid> {
    resolve_id(needle, investment.entries.iter().map(|e| e.id), "entry")
}

/// Merge flags, prompts and the current forecast into a draft
fn build_draft(
    investment: &Investment,
    name: String,
    fields: &ForecastFields,
    current: Option<&Forecast>,
) -> Result<ForecastDraft> {
    let interactive = !fields.json;

    let start = match (&fields.from_entry, &fields.start) {
        (Some(entry), _) => ForecastStart::Entry(resolve_entry_id(investment, entry)?),
        (None, Some(date)) => ForecastStart::Date(parse_date(date)?),
        (None, None) => match current {
            Some(f) => ForecastStart::Date(f.start_date),
            None => ForecastStart::Date(default_start(investment, interactive)?),
        },
    };

    let duration = match (fields.months, &fields.end) {
        (Some(months), _) => ForecastDuration::Months(months),
        (None, Some(end)) => ForecastDuration::EndDate(parse_date(end)?),
        (None, None) => match current {
            Some(f) => ForecastDuration::EndDate(f.end_date),
            None if interactive => {
                let months: u32 = Input::new()
                    .with_prompt("Duration (months)")
                    .default(12)
                    .interact_text()?;
                ForecastDuration::Months(months)
            }
            None => bail!("--months or --end is required"),
        },
    };

    let base = current.map(|f| f.scenario_rates).unwrap_or_default();
    let scenario_rates = ScenarioRates::new(
        rate_field(fields.pessimist.as_deref(), "Pessimist rate (%/month)", base.pessimist, interactive)?,
        rate_field(fields.neutral.as_deref(), "Neutral rate (%/month)", base.neutral, interactive)?,
        rate_field(fields.optimist.as_deref(), "Optimist rate (%/month)", base.optimist, interactive)?,
    );

    Ok(ForecastDraft {
        name,
        start,
        duration,
        scenario_rates,
    })
}

/// First entry date, else the investment start date, confirmed interactively
fn default_start(investment: &Investment, interactive: bool) -> Result<NaiveDate> {
    let fallback = investment
        .first_entry()
        .map(|e| e.datetime.date())
        .unwrap_or_else(|| investment.start_date_time.date());
    if !interactive {
        return Ok(fallback);
    }
    let text: String = Input::new()
        .with_prompt("Start date")
        .default(fallback.format("%Y-%m-%d").to_string())
        .interact_text()?;
    parse_date(&text)
}

fn rate_field(
    flag: Option<&str>,
    prompt: &str,
    fallback: rust_decimal::Decimal,
    interactive: bool,
) -> Result<rust_decimal::Decimal> {
    match flag {
        Some(text) => Ok(parse_rate(text)?),
        None if interactive => {
            let text: String = Input::new()
                .with_prompt(prompt)
                .default(fallback.normalize().to_string())
                .interact_text()?;
            Ok(parse_rate(&text)?)
        }
        None => Ok(fallback),
    }
}

fn report(forecast: &Forecast, verb: &str, json: bool) -> Result<()> {
    if json {
        return output::print_json(&OperationResult::ok(forecast));
    }
    output::success(&format!("Forecast '{}' {}", forecast.name, verb));
    println!(
        "  {} to {}  ({} months)",
        forecast.start_date,
        forecast.end_date,
        forecast.months()?
    );
    Ok(())
}

fn print_projection(title: &str, investment: &Investment, projection: &ForecastProjection) {
    println!("{} {}", title.bold(), format!("({})", investment.currency).dimmed());

    if projection.scenario_series.is_empty() {
        println!("{}", "No forecasts to project".dimmed());
        return;
    }

    let mut header = vec!["Month".to_string(), "Real".to_string()];
    header.extend(projection.scenario_series.iter().map(|s| s.label.clone()));

    let mut table = create_table();
    table.set_header(header);
    for (i, category) in projection.categories.iter().enumerate() {
        let mut row = vec![Cell::new(category)];
        let real = projection.real_series.get(i).copied().flatten();
        row.push(number_cell(real.map(|v| format_money(&v)).unwrap_or_default()));
        for series in &projection.scenario_series {
            let value = series.values.get(i).map(format_money).unwrap_or_default();
            row.push(number_cell(value));
        }
        table.add_row(row);
    }
    println!("{}", table);
}
