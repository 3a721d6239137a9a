//! Investment commands - list, inspect, create, edit, close and remove

use anyhow::Result;
use chrono::Local;
use clap::Subcommand;
use colored::Colorize;
use comfy_table::Cell;
use dialoguer::{Confirm, Input};
use serde_json::json;

use invest_track_core::services::InvestmentDraft;
use invest_track_core::{Investment, OperationResult};

use super::{format_money, format_percent, get_context, parse_datetime, resolve_investment, short_id};
use crate::output::{self, create_table, number_cell, signed_cell};

#[derive(Subcommand)]
pub enum InvestmentCommands {
    /// List investments
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show an investment with its entries
    Show {
        /// Investment id, id prefix or name
        investment: String,
        #[arg(long)]
        json: bool,
    },

    /// Create a new investment
    New {
        /// Name (prompted when omitted)
        #[arg(long)]
        name: Option<String>,
        /// Currency code
        #[arg(long)]
        currency: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Start (YYYY-MM-DD [HH:MM]), defaults to now
        #[arg(long)]
        start: Option<String>,
        /// End (YYYY-MM-DD [HH:MM]), leave empty for an open investment
        #[arg(long)]
        end: Option<String>,
        /// Gains are reinvested
        #[arg(long)]
        reinvested: bool,
        #[arg(long)]
        json: bool,
    },

    /// Edit an investment; omitted fields keep their value
    Edit {
        investment: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        currency: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long, conflicts_with = "reopen")]
        end: Option<String>,
        /// Clear the end date
        #[arg(long)]
        reopen: bool,
        /// Whether gains are reinvested
        #[arg(long)]
        reinvested: Option<bool>,
        #[arg(long)]
        json: bool,
    },

    /// Close an investment (sets its end date)
    Close {
        investment: String,
        /// End (YYYY-MM-DD [HH:MM]), defaults to now
        #[arg(long)]
        at: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Remove an investment with its entries and forecasts
    Remove {
        investment: String,
        /// Skip confirmation
        #[arg(long, short)]
        force: bool,
        #[arg(long)]
        json: bool,
    },
}

impl InvestmentCommands {
    pub fn name(&self) -> &'static str {
        match self {
            InvestmentCommands::List { .. } => "investment_list",
            InvestmentCommands::Show { .. } => "investment_show",
            InvestmentCommands::New { .. } => "investment_new",
            InvestmentCommands::Edit { .. } => "investment_edit",
            InvestmentCommands::Close { .. } => "investment_close",
            InvestmentCommands::Remove { .. } => "investment_remove",
        }
    }
}

pub fn run(command: InvestmentCommands) -> Result<()> {
    match command {
        InvestmentCommands::List { json } => run_list(json),
        InvestmentCommands::Show { investment, json } => run_show(&investment, json),
        InvestmentCommands::New {
            name,
            currency,
            description,
            start,
            end,
            reinvested,
            json,
        } => {
            let name = match name {
                Some(n) => n,
                None => Input::new().with_prompt("Name").interact_text()?,
            };
            let currency = match currency {
                Some(c) => c,
                None => Input::new()
                    .with_prompt("Currency")
                    .default("EUR".to_string())
                    .interact_text()?,
            };
            let draft = InvestmentDraft {
                name,
                description,
                currency,
                start_date_time: start.as_deref().map(parse_datetime).transpose()?,
                end_date_time: end.as_deref().map(parse_datetime).transpose()?,
                is_reinvested: reinvested,
            };
            run_new(draft, json)
        }
        InvestmentCommands::Edit {
            investment,
            name,
            currency,
            description,
            start,
            end,
            reopen,
            reinvested,
            json,
        } => {
            let ctx = get_context()?;
            let current = resolve_investment(&ctx, &investment)?;
            let end_date_time = if reopen {
                None
            } else {
                match end.as_deref() {
                    Some(text) => Some(parse_datetime(text)?),
                    None => current.end_date_time,
                }
            };
            let draft = InvestmentDraft {
                name: name.unwrap_or_else(|| current.name.clone()),
                description: description.or_else(|| current.description.clone()),
                currency: currency.unwrap_or_else(|| current.currency.clone()),
                start_date_time: start.as_deref().map(parse_datetime).transpose()?,
                end_date_time,
                is_reinvested: reinvested.unwrap_or(current.is_reinvested),
            };
            let updated = ctx.investment_service.update(current.id, draft)?;
            report(&updated, "updated", json)
        }
        InvestmentCommands::Close { investment, at, json } => {
            let ctx = get_context()?;
            let current = resolve_investment(&ctx, &investment)?;
            let at = at.as_deref().map(parse_datetime).transpose()?;
            let closed = ctx.investment_service.close(current.id, at)?;
            report(&closed, "closed", json)
        }
        InvestmentCommands::Remove { investment, force, json } => run_remove(&investment, force, json),
    }
}

fn run_list(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let investments = ctx.investment_service.list()?;

    if json {
        return output::print_json(&investments);
    }

    if investments.is_empty() {
        println!("{}", "No investments".dimmed());
        return Ok(());
    }

    let now = Local::now().naive_local();
    let mut table = create_table();
    table.set_header(vec!["ID", "Name", "Currency", "Start", "End", "Reinvested", "Entries"]);
    for investment in &investments {
        let end = match investment.end_date_time {
            Some(end) => end.format("%Y-%m-%d").to_string(),
            None => "-".to_string(),
        };
        let name = if investment.is_active(now) {
            Cell::new(&investment.name)
        } else {
            Cell::new(&investment.name).fg(comfy_table::Color::DarkGrey)
        };
        table.add_row(vec![
            Cell::new(short_id(&investment.id)),
            name,
            Cell::new(&investment.currency),
            Cell::new(investment.start_date_time.format("%Y-%m-%d")),
            Cell::new(end),
            Cell::new(if investment.is_reinvested { "yes" } else { "no" }),
            number_cell(investment.entries.len().to_string()),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn run_show(needle: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let investment = resolve_investment(&ctx, needle)?;
    let summary = ctx.summary_service.get_investment_summary(investment.id)?;

    if json {
        return output::print_json(&json!({ "investment": investment, "summary": summary }));
    }

    println!("{} {}", investment.name.bold(), format!("({})", investment.id).dimmed());
    if let Some(description) = &investment.description {
        println!("{}", description);
    }
    println!(
        "Currency: {}   Start: {}   End: {}   Reinvested: {}",
        investment.currency,
        investment.start_date_time.format("%Y-%m-%d %H:%M"),
        investment
            .end_date_time
            .map(|e| e.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "open".to_string()),
        if investment.is_reinvested { "yes" } else { "no" }
    );
    println!(
        "Invested: {}   Obtained: {}   Benefit: {}   Profitability: {}",
        format_money(&summary.invested_amount),
        format_money(&summary.obtained),
        format_money(&summary.benefit),
        format_percent(&summary.profitability)
    );
    println!();

    if investment.entries.is_empty() {
        println!("{}", "No entries yet. Add one with 'invest entry add'".dimmed());
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec![
        "ID", "Date", "Initial", "Reinvested", "Total", "Profitability", "Obtained", "Benefit", "Comments",
    ]);
    for entry in &investment.entries {
        table.add_row(vec![
            Cell::new(short_id(&entry.id)),
            Cell::new(entry.datetime.format("%Y-%m-%d %H:%M")),
            number_cell(format_money(&entry.initial_invested_amount)),
            number_cell(format_money(&entry.reinvested_amount)),
            number_cell(format_money(&entry.total_invested_amount)),
            signed_cell(&entry.profitability, format_percent(&entry.profitability)),
            number_cell(format_money(&entry.obtained)),
            signed_cell(&entry.benefit, format_money(&entry.benefit)),
            Cell::new(entry.comments.as_deref().unwrap_or("")),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn run_new(draft: InvestmentDraft, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let investment = ctx.investment_service.create(draft)?;
    report(&investment, "created", json)
}

fn run_remove(needle: &str, force: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let investment = resolve_investment(&ctx, needle)?;

    if !force && !json {
        println!(
            "\n{}",
            format!(
                "This will remove '{}' with {} entries and all of its forecasts.",
                investment.name,
                investment.entries.len()
            )
            .yellow()
        );
        if !Confirm::new().with_prompt("Are you sure?").default(false).interact()? {
            println!("{}\n", "Cancelled".dimmed());
            return Ok(());
        }
    }

    ctx.investment_service.delete(investment.id)?;

    if json {
        let result = OperationResult::ok(investment.id).with_context("name", json!(investment.name));
        return output::print_json(&result);
    }
    output::success(&format!("Investment '{}' removed", investment.name));
    Ok(())
}

fn report(investment: &Investment, verb: &str, json: bool) -> Result<()> {
    if json {
        return output::print_json(&OperationResult::ok(investment));
    }
    output::success(&format!("Investment '{}' {}", investment.name, verb));
    println!("  ID: {}", investment.id);
    Ok(())
}
