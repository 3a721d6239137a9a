//! Status command - portfolio summary and per-investment totals

use anyhow::Result;
use colored::Colorize;
use comfy_table::{Cell, ContentArrangement, Table};

use super::{format_money, format_percent, get_context, short_id};
use crate::output::{self, create_table, number_cell, signed_cell};

pub fn run(active_only: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let status = ctx.summary_service.get_status(active_only)?;

    if json {
        return output::print_json(&status);
    }

    if ctx.config.demo_mode {
        output::warning("Demo mode is on; showing sample data");
    }

    let heading = if active_only { "Active Investments" } else { "Portfolio" };
    println!("{}", heading.bold());
    println!();

    let summary = &status.summary;
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec![Cell::new("Invested"), number_cell(format_money(&summary.invested_amount))]);
    table.add_row(vec![Cell::new("Obtained"), number_cell(format_money(&summary.obtained))]);
    table.add_row(vec![
        Cell::new("Benefit"),
        signed_cell(&summary.benefit, format_money(&summary.benefit)),
    ]);
    table.add_row(vec![
        Cell::new("Profitability"),
        signed_cell(&summary.profitability, format_percent(&summary.profitability)),
    ]);
    println!("{}", table);
    println!();

    if status.investments.is_empty() {
        println!("{}", "No investments yet. Add one with 'invest investment new'".dimmed());
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec![
        "ID", "Name", "Currency", "State", "Entries", "Invested", "Obtained", "Benefit", "Profitability",
    ]);
    for item in &status.investments {
        let state = if item.is_active { Cell::new("open") } else { Cell::new("closed").fg(comfy_table::Color::DarkGrey) };
        table.add_row(vec![
            Cell::new(short_id(&item.id)),
            Cell::new(&item.name),
            Cell::new(&item.currency),
            state,
            number_cell(item.entry_count.to_string()),
            number_cell(format_money(&item.summary.invested_amount)),
            number_cell(format_money(&item.summary.obtained)),
            signed_cell(&item.summary.benefit, format_money(&item.summary.benefit)),
            signed_cell(&item.summary.profitability, format_percent(&item.summary.profitability)),
        ]);
    }
    println!("{}", table);

    Ok(())
}
