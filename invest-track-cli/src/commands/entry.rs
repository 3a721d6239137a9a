//! Entry commands - record, correct and remove investment snapshots
//!
//! Profitability is typed as a percentage and stored as a fraction.
//! Interactive prompts are prefilled from the latest entry.

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use dialoguer::{Confirm, Input};
use rust_decimal::Decimal;
use serde_json::json;

use invest_track_core::services::EntryDraft;
use invest_track_core::{InvestmentEntry, OperationResult};

use super::{
    format_money, format_percent, get_context, parse_amount, parse_datetime, parse_percent,
    resolve_id, resolve_investment, short_id,
};
use crate::output;

/// Amount fields shared by `add` and `edit`
#[derive(Args)]
pub struct EntryFields {
    /// Entry date (YYYY-MM-DD [HH:MM[:SS]]); now when adding
    #[arg(long)]
    date: Option<String>,
    /// Initial invested amount
    #[arg(long, conflicts_with = "total")]
    initial: Option<String>,
    /// Total invested amount; the initial amount becomes total minus reinvested
    #[arg(long)]
    total: Option<String>,
    /// Reinvested amount
    #[arg(long)]
    reinvested: Option<String>,
    /// Profitability in percent, e.g. 6.12
    #[arg(long, allow_hyphen_values = true)]
    profitability: Option<String>,
    #[arg(long)]
    comments: Option<String>,
    /// Output as JSON (no prompts)
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
pub enum EntryCommands {
    /// Add an entry to an investment
    Add {
        /// Investment id, id prefix or name
        investment: String,
        #[command(flatten)]
        fields: EntryFields,
    },

    /// Edit an entry; omitted fields keep their value
    Edit {
        investment: String,
        /// Entry id or id prefix
        entry: String,
        #[command(flatten)]
        fields: EntryFields,
    },

    /// Remove an entry
    Remove {
        investment: String,
        entry: String,
        #[arg(long, short)]
        force: bool,
        #[arg(long)]
        json: bool,
    },
}

impl EntryCommands {
    pub fn name(&self) -> &'static str {
        match self {
            EntryCommands::Add { .. } => "entry_add",
            EntryCommands::Edit { .. } => "entry_edit",
            EntryCommands::Remove { .. } => "entry_remove",
        }
    }
}

pub fn run(command: EntryCommands) -> Result<()> {
    match command {
        EntryCommands::Add { investment, fields } => run_add(&investment, fields),
        EntryCommands::Edit { investment, entry, fields } => run_edit(&investment, &entry, fields),
        EntryCommands::Remove { investment, entry, force, json } => run_remove(&investment, &entry, force, json),
    }
}

fn run_add(needle: &str, fields: EntryFields) -> Result<()> {
    let ctx = get_context()?;
    let investment = resolve_investment(&ctx, needle)?;

    let draft = collect(&fields, investment.last_entry(), true)?;
    let entry = ctx.investment_service.add_entry(investment.id, draft)?;
    report(&entry, &investment.name, "added", fields.json)
}

fn run_edit(needle: &str, entry_needle: &str, fields: EntryFields) -> Result<()> {
    let ctx = get_context()?;
    let investment = resolve_investment(&ctx, needle)?;
    let entry_id = resolve_id(entry_needle, investment.entries.iter().map(|e| e.id), "entry")?;
    let current = investment
        .find_entry(entry_id)
        .ok_or_else(|| invest_track_core::Error::not_found(format!("entry {}", entry_id)))?;

    let draft = collect(&fields, Some(current), false)?;
    let entry = ctx.investment_service.update_entry(investment.id, entry_id, draft)?;
    report(&entry, &investment.name, "updated", fields.json)
}

fn run_remove(needle: &str, entry_needle: &str, force: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let investment = resolve_investment(&ctx, needle)?;
    let entry_id = resolve_id(entry_needle, investment.entries.iter().map(|e| e.id), "entry")?;

    if !force && !json {
        let prompt = format!("Remove entry {} from '{}'?", short_id(&entry_id), investment.name);
        if !Confirm::new().with_prompt(prompt).default(false).interact()? {
            println!("{}\n", "Cancelled".dimmed());
            return Ok(());
        }
    }

    ctx.investment_service.delete_entry(investment.id, entry_id)?;

    if json {
        let result = OperationResult::ok(entry_id).with_context("investment_id", json!(investment.id));
        return output::print_json(&result);
    }
    output::success(&format!("Entry {} removed", short_id(&entry_id)));
    Ok(())
}

/// Build a draft from flags, prompting for missing amounts unless `--json`
fn collect(fields: &EntryFields, base: Option<&InvestmentEntry>, adding: bool) -> Result<EntryDraft> {
    let interactive = !fields.json;
    let zero = Decimal::ZERO;

    let reinvested = amount_field(
        fields.reinvested.as_deref(),
        "Reinvested amount",
        base.map(|e| e.reinvested_amount).unwrap_or(zero),
        interactive,
    )?;

    let initial = match fields.total.as_deref() {
        Some(total) => initial_from_total(parse_amount(total, "total invested amount")?, reinvested)?,
        None => amount_field(
            fields.initial.as_deref(),
            "Initial invested amount",
            base.map(|e| e.initial_invested_amount).unwrap_or(zero),
            interactive,
        )?,
    };

    let profitability = match fields.profitability.as_deref() {
        Some(text) => parse_percent(text)?,
        None => {
            let fallback = base.map(|e| e.profitability).unwrap_or(zero);
            if interactive {
                let text: String = Input::new()
                    .with_prompt("Profitability (%)")
                    .default((fallback * Decimal::ONE_HUNDRED).normalize().to_string())
                    .interact_text()?;
                parse_percent(&text)?
            } else {
                fallback
            }
        }
    };

    let comments = match &fields.comments {
        Some(c) => Some(c.clone()),
        None if adding => None,
        None => base.and_then(|e| e.comments.clone()),
    };

    let datetime = fields.date.as_deref().map(parse_datetime).transpose()?;

    if interactive {
        if let Some(line) = preview_line(initial, reinvested, profitability) {
            println!("{}", line.dimmed());
        }
    }

    Ok(EntryDraft {
        datetime,
        initial_invested_amount: initial,
        reinvested_amount: reinvested,
        profitability,
        comments,
    })
}

/// Initial amount for `--total` mode
fn initial_from_total(total: Decimal, reinvested: Decimal) -> Result<Decimal> {
    total.checked_sub(reinvested).ok_or_else(|| {
        invest_track_core::Error::validation("total and reinvested amounts are too large").into()
    })
}

/// Derived amounts shown before saving; `None` when they overflow
fn preview_line(initial: Decimal, reinvested: Decimal, profitability: Decimal) -> Option<String> {
    let total = initial.checked_add(reinvested)?;
    let obtained = total.checked_mul(Decimal::ONE.checked_add(profitability)?)?;
    let benefit = obtained.checked_sub(total)?;
    Some(format!(
        "Total {}  Obtained {}  Benefit {}",
        format_money(&total),
        format_money(&obtained),
        format_money(&benefit)
    ))
}

fn amount_field(flag: Option<&str>, prompt: &str, fallback: Decimal, interactive: bool) -> Result<Decimal> {
    match flag {
        Some(text) => parse_amount(text, prompt),
        None if interactive => {
            let text: String = Input::new()
                .with_prompt(prompt)
                .default(fallback.normalize().to_string())
                .interact_text()?;
            parse_amount(&text, prompt)
        }
        None => Ok(fallback),
    }
}

fn report(entry: &InvestmentEntry, investment_name: &str, verb: &str, json: bool) -> Result<()> {
    if json {
        return output::print_json(&OperationResult::ok(entry));
    }
    output::success(&format!("Entry {} {} for '{}'", short_id(&entry.id), verb, investment_name));
    println!(
        "  {}  invested {}  profitability {}  obtained {}  benefit {}",
        entry.datetime.format("%Y-%m-%d %H:%M"),
        format_money(&entry.total_invested_amount),
        format_percent(&entry.profitability),
        format_money(&entry.obtained),
        format_money(&entry.benefit)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_from_total() {
        let initial = initial_from_total(Decimal::new(1500, 0), Decimal::new(250, 0)).unwrap();
        assert_eq!(initial, Decimal::new(1250, 0));

        let err = initial_from_total(Decimal::MIN, Decimal::ONE).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_preview_line() {
        let line = preview_line(Decimal::new(1000, 0), Decimal::new(20, 0), Decimal::new(5, 2)).unwrap();
        assert_eq!(line, "Total 1020.00  Obtained 1071.00  Benefit 51.00");
    }

    #[test]
    fn test_preview_skipped_on_overflow() {
        assert!(preview_line(Decimal::MAX, Decimal::ONE, Decimal::ZERO).is_none());
        assert!(preview_line(Decimal::MAX, Decimal::ZERO, Decimal::ONE).is_none());
    }
}
