//! Integration tests for invest-track-core services
//!
//! Everything runs against a real DuckDB file in a temporary directory.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use std::sync::Arc;
use std::thread;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use tempfile::TempDir;
use uuid::Uuid;

use invest_track_core::adapters::duckdb::DuckDbRepository;
use invest_track_core::ports::Repository;
use invest_track_core::services::{
    DemoService, EntryDraft, ForecastService, InvestmentDraft, InvestmentService, ProjectionOptions,
    SummaryService,
};
use invest_track_core::{
    project_forecast, Error, ForecastDraft, ForecastDuration, ForecastStart, InvestTrackContext, Scenario,
    ScenarioRates,
};

// ============================================================================
// Test Helpers
// ============================================================================

struct Services {
    repo: Arc<DuckDbRepository>,
    investments: InvestmentService,
    summaries: SummaryService,
    forecasts: ForecastService,
}

/// Repository with schema initialized plus the services on top of it
fn create_services(temp_dir: &TempDir) -> Services {
    let db_path = temp_dir.path().join("test.duckdb");
    let repo = Arc::new(DuckDbRepository::new(&db_path).expect("Failed to create repository"));
    repo.ensure_schema().expect("Failed to initialize schema");

    let store: Arc<dyn Repository> = repo.clone();
    Services {
        repo,
        investments: InvestmentService::new(Arc::clone(&store)),
        summaries: SummaryService::new(Arc::clone(&store)),
        forecasts: ForecastService::new(store, ProjectionOptions::default()),
    }
}

fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn investment_draft(name: &str) -> InvestmentDraft {
    InvestmentDraft {
        name: name.to_string(),
        currency: "eur".to_string(),
        start_date_time: Some(at(2024, 1, 1)),
        ..Default::default()
    }
}

fn entry_draft(when: NaiveDateTime, initial: i64, reinvested: i64, profitability: Decimal) -> EntryDraft {
    EntryDraft {
        datetime: Some(when),
        initial_invested_amount: Decimal::from(initial),
        reinvested_amount: Decimal::from(reinvested),
        profitability,
        comments: None,
    }
}

fn rates() -> ScenarioRates {
    ScenarioRates::new(Decimal::from(-1), Decimal::ZERO, Decimal::from(2))
}

fn domain_error(err: &anyhow::Error) -> &Error {
    err.downcast_ref::<Error>().expect("expected a domain error")
}

// ============================================================================
// Investment and entry flows
// ============================================================================

#[test]
fn test_summary_follows_last_entries() {
    let temp_dir = TempDir::new().unwrap();
    let s = create_services(&temp_dir);

    let fund = s.investments.create(investment_draft("Fund")).unwrap();
    let deposit = s.investments.create(investment_draft("Deposit")).unwrap();

    s.investments
        .add_entry(fund.id, entry_draft(at(2024, 1, 1), 500, 0, Decimal::ZERO))
        .unwrap();
    s.investments
        .add_entry(fund.id, entry_draft(at(2024, 2, 1), 1000, 0, Decimal::new(2, 1)))
        .unwrap();
    s.investments
        .add_entry(deposit.id, entry_draft(at(2024, 1, 1), 800, 1200, Decimal::new(1, 1)))
        .unwrap();

    let summary = s.summaries.get_summary(false).unwrap();
    assert_eq!(summary.invested_amount, Decimal::from(3000));
    assert_eq!(summary.obtained, Decimal::from(3400));
    assert_eq!(summary.benefit, Decimal::from(400));

    let fund_summary = s.summaries.get_investment_summary(fund.id).unwrap();
    assert_eq!(fund_summary.invested_amount, Decimal::from(1000));
    assert_eq!(fund_summary.profitability, Decimal::new(2, 1));
}

#[test]
fn test_active_only_summary_skips_closed() {
    let temp_dir = TempDir::new().unwrap();
    let s = create_services(&temp_dir);

    let open = s.investments.create(investment_draft("Open")).unwrap();
    let closed = s.investments.create(investment_draft("Closed")).unwrap();
    s.investments
        .add_entry(open.id, entry_draft(at(2024, 1, 1), 1000, 0, Decimal::ZERO))
        .unwrap();
    s.investments
        .add_entry(closed.id, entry_draft(at(2024, 1, 1), 5000, 0, Decimal::ZERO))
        .unwrap();
    s.investments.close(closed.id, Some(at(2024, 6, 1))).unwrap();

    assert_eq!(s.summaries.get_summary(false).unwrap().invested_amount, Decimal::from(6000));
    assert_eq!(s.summaries.get_summary(true).unwrap().invested_amount, Decimal::from(1000));

    let status = s.summaries.get_status(false).unwrap();
    assert_eq!(status.investments.len(), 2);
    assert_eq!(status.investments.iter().filter(|i| i.is_active).count(), 1);
}

#[test]
fn test_entry_without_datetime_is_stamped() {
    let temp_dir = TempDir::new().unwrap();
    let s = create_services(&temp_dir);
    let fund = s.investments.create(investment_draft("Fund")).unwrap();

    let before = chrono::Local::now().naive_local();
    let entry = s
        .investments
        .add_entry(
            fund.id,
            EntryDraft {
                initial_invested_amount: Decimal::from(10),
                ..Default::default()
            },
        )
        .unwrap();

    assert!(entry.datetime >= before - chrono::Duration::seconds(1));
    assert_eq!(s.investments.get(fund.id).unwrap().entries.len(), 1);
}

#[test]
fn test_update_entry_recomputes_derived_fields() {
    let temp_dir = TempDir::new().unwrap();
    let s = create_services(&temp_dir);
    let fund = s.investments.create(investment_draft("Fund")).unwrap();
    let entry = s
        .investments
        .add_entry(fund.id, entry_draft(at(2024, 1, 1), 1000, 0, Decimal::ZERO))
        .unwrap();

    s.investments
        .update_entry(
            fund.id,
            entry.id,
            EntryDraft {
                datetime: None,
                comments: Some("  corrected  ".to_string()),
                ..entry_draft(at(2024, 1, 1), 1000, 500, Decimal::new(1, 1))
            },
        )
        .unwrap();

    let stored = &s.repo.get_entries(fund.id).unwrap()[0];
    assert_eq!(stored.datetime, at(2024, 1, 1));
    assert_eq!(stored.total_invested_amount, Decimal::from(1500));
    assert_eq!(stored.obtained, Decimal::from(1650));
    assert_eq!(stored.benefit, Decimal::from(150));
    assert_eq!(stored.comments.as_deref(), Some("corrected"));
}

#[test]
fn test_unknown_ids_are_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let s = create_services(&temp_dir);
    let fund = s.investments.create(investment_draft("Fund")).unwrap();

    let err = s.investments.get(Uuid::new_v4()).unwrap_err();
    assert!(domain_error(&err).is_not_found());

    let err = s
        .investments
        .add_entry(Uuid::new_v4(), entry_draft(at(2024, 1, 1), 1, 0, Decimal::ZERO))
        .unwrap_err();
    assert!(domain_error(&err).is_not_found());

    let err = s.investments.delete_entry(fund.id, Uuid::new_v4()).unwrap_err();
    assert!(domain_error(&err).is_not_found());

    let err = s.forecasts.project(Uuid::new_v4()).unwrap_err();
    assert!(domain_error(&err).is_not_found());
}

#[test]
fn test_invalid_input_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let s = create_services(&temp_dir);

    let err = s.investments.create(investment_draft("   ")).unwrap_err();
    assert!(domain_error(&err).is_validation());

    let fund = s.investments.create(investment_draft("Fund")).unwrap();
    let err = s
        .investments
        .add_entry(fund.id, entry_draft(at(2024, 1, 1), -5, 0, Decimal::ZERO))
        .unwrap_err();
    assert!(domain_error(&err).is_validation());

    let err = s.investments.close(fund.id, Some(at(2023, 1, 1))).unwrap_err();
    assert!(domain_error(&err).is_validation());
}

// ============================================================================
// Forecast flows
// ============================================================================

#[test]
fn test_forecast_from_entry_and_project() {
    let temp_dir = TempDir::new().unwrap();
    let s = create_services(&temp_dir);
    let fund = s.investments.create(investment_draft("Fund")).unwrap();
    let first = s
        .investments
        .add_entry(fund.id, entry_draft(at(2024, 1, 1), 1000, 0, Decimal::ZERO))
        .unwrap();

    let forecast = s
        .forecasts
        .create(
            fund.id,
            &ForecastDraft {
                name: "Base".to_string(),
                start: ForecastStart::Entry(first.id),
                duration: ForecastDuration::Months(3),
                scenario_rates: rates(),
            },
        )
        .unwrap();
    assert_eq!(forecast.start_date, date(2024, 1, 1));
    assert_eq!(forecast.end_date, date(2024, 4, 1));

    let projection = s.forecasts.project(forecast.id).unwrap();
    assert_eq!(projection.horizon(), 4);
    assert_eq!(
        projection.scenario(Scenario::Optimist).unwrap().values,
        vec![
            Decimal::new(100000, 2),
            Decimal::new(102000, 2),
            Decimal::new(104040, 2),
            Decimal::new(106121, 2)
        ]
    );
    assert_eq!(projection.real_series[0], Some(Decimal::from(1000)));
    assert_eq!(projection.real_series[1], None);
}

#[test]
fn test_projection_sees_new_entries() {
    let temp_dir = TempDir::new().unwrap();
    let s = create_services(&temp_dir);
    let fund = s.investments.create(investment_draft("Fund")).unwrap();
    s.investments
        .add_entry(fund.id, entry_draft(at(2024, 1, 1), 1000, 0, Decimal::ZERO))
        .unwrap();

    let forecast = s
        .forecasts
        .create(
            fund.id,
            &ForecastDraft {
                name: "Short".to_string(),
                start: ForecastStart::Date(date(2024, 1, 1)),
                duration: ForecastDuration::EndDate(date(2024, 2, 1)),
                scenario_rates: rates(),
            },
        )
        .unwrap();
    assert_eq!(s.forecasts.project(forecast.id).unwrap().horizon(), 2);

    for month in 2..=4 {
        s.investments
            .add_entry(fund.id, entry_draft(at(2024, month, 1), 1000 + 100 * month as i64, 0, Decimal::ZERO))
            .unwrap();
    }

    let projection = s.forecasts.project(forecast.id).unwrap();
    assert_eq!(projection.horizon(), 4);
    assert_eq!(projection.real_series[3], Some(Decimal::from(1400)));
    assert_eq!(projection.categories[3], "2024-04-01");
}

#[test]
fn test_combined_projection_uses_longest_forecast() {
    let temp_dir = TempDir::new().unwrap();
    let s = create_services(&temp_dir);
    let fund = s.investments.create(investment_draft("Fund")).unwrap();
    s.investments
        .add_entry(fund.id, entry_draft(at(2024, 1, 1), 1000, 0, Decimal::ZERO))
        .unwrap();

    for (name, months) in [("Three", 2), ("Six", 5)] {
        s.forecasts
            .create(
                fund.id,
                &ForecastDraft {
                    name: name.to_string(),
                    start: ForecastStart::Date(date(2024, 1, 1)),
                    duration: ForecastDuration::Months(months),
                    scenario_rates: rates(),
                },
            )
            .unwrap();
    }

    let combined = s.forecasts.project_investment(fund.id).unwrap();
    assert_eq!(combined.horizon(), 6);
    assert_eq!(combined.scenario_series.len(), 6);
    assert!(combined.scenario_series.iter().all(|series| series.values.len() == 6));
    assert_eq!(combined.scenario_series[0].label, "Three - Pessimist");
}

#[test]
fn test_update_forecast_keeps_identity() {
    let temp_dir = TempDir::new().unwrap();
    let s = create_services(&temp_dir);
    let fund = s.investments.create(investment_draft("Fund")).unwrap();
    let forecast = s
        .forecasts
        .create(
            fund.id,
            &ForecastDraft {
                name: "Plan".to_string(),
                start: ForecastStart::Date(date(2024, 1, 1)),
                duration: ForecastDuration::Months(12),
                scenario_rates: rates(),
            },
        )
        .unwrap();

    let mut draft = ForecastDraft::from_forecast(&forecast);
    draft.name = "Longer plan".to_string();
    draft.duration = ForecastDuration::Months(24);
    let updated = s.forecasts.update(forecast.id, &draft).unwrap();

    assert_eq!(updated.id, forecast.id);
    assert_eq!(updated.end_date, date(2026, 1, 1));
    let stored = s.forecasts.list(fund.id).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].name, "Longer plan");

    draft.duration = ForecastDuration::Months(0);
    let err = s.forecasts.update(forecast.id, &draft).unwrap_err();
    assert!(domain_error(&err).is_validation());
}

#[test]
fn test_delete_investment_removes_forecasts() {
    let temp_dir = TempDir::new().unwrap();
    let s = create_services(&temp_dir);
    let fund = s.investments.create(investment_draft("Fund")).unwrap();
    s.investments
        .add_entry(fund.id, entry_draft(at(2024, 1, 1), 1000, 0, Decimal::ZERO))
        .unwrap();
    let forecast = s
        .forecasts
        .create(
            fund.id,
            &ForecastDraft {
                name: "Plan".to_string(),
                start: ForecastStart::Date(date(2024, 1, 1)),
                duration: ForecastDuration::Months(6),
                scenario_rates: rates(),
            },
        )
        .unwrap();

    s.investments.delete(fund.id).unwrap();

    assert!(s.repo.get_forecast_by_id(forecast.id).unwrap().is_none());
    assert!(s.repo.get_entries(fund.id).unwrap().is_empty());
    assert!(domain_error(&s.forecasts.project_investment(fund.id).unwrap_err()).is_not_found());
}

// ============================================================================
// Persistence and context
// ============================================================================

#[test]
fn test_data_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let fund_id = {
        let s = create_services(&temp_dir);
        let fund = s.investments.create(investment_draft("Fund")).unwrap();
        s.investments
            .add_entry(fund.id, entry_draft(at(2024, 1, 1), 1000, 0, Decimal::ZERO))
            .unwrap();
        fund.id
    };

    let s = create_services(&temp_dir);
    let fund = s.investments.get(fund_id).unwrap();
    assert_eq!(fund.currency, "EUR");
    assert_eq!(fund.entries.len(), 1);
    assert!(s.repo.run_migrations().unwrap().applied.is_empty());
}

#[test]
fn test_demo_mode_switches_database() {
    let temp_dir = TempDir::new().unwrap();
    let demo = DemoService::new(temp_dir.path());

    demo.enable().unwrap();
    assert!(demo.is_enabled().unwrap());
    let context = InvestTrackContext::new(temp_dir.path()).unwrap();
    assert!(context.config.demo_mode);
    let investments = context.investment_service.list().unwrap();
    assert_eq!(investments.len(), 3);
    assert!(investments.iter().all(|i| !i.entries.is_empty()));
    let projection = context
        .forecast_service
        .project_investment(investments[0].id)
        .unwrap();
    assert!(projection.horizon() >= 12);
    drop(context);

    demo.disable(true).unwrap();
    assert!(!temp_dir.path().join("demo.duckdb").exists());
    let context = InvestTrackContext::new(temp_dir.path()).unwrap();
    assert!(context.investment_service.list().unwrap().is_empty());
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_concurrent_projections_agree() {
    let temp_dir = TempDir::new().unwrap();
    let s = create_services(&temp_dir);
    let fund = s.investments.create(investment_draft("Fund")).unwrap();
    for month in 1..=6 {
        s.investments
            .add_entry(fund.id, entry_draft(at(2024, month, 1), 1000 * month as i64, 0, Decimal::ZERO))
            .unwrap();
    }
    let forecast = s
        .forecasts
        .create(
            fund.id,
            &ForecastDraft {
                name: "Plan".to_string(),
                start: ForecastStart::Date(date(2024, 1, 1)),
                duration: ForecastDuration::Months(36),
                scenario_rates: rates(),
            },
        )
        .unwrap();

    let expected = s.forecasts.project(forecast.id).unwrap();
    let service = Arc::new(s.forecasts);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            thread::spawn(move || service.project(forecast.id).unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn test_pure_projection_across_threads() {
    let temp_dir = TempDir::new().unwrap();
    let s = create_services(&temp_dir);
    let fund = s.investments.create(investment_draft("Fund")).unwrap();
    s.investments
        .add_entry(fund.id, entry_draft(at(2024, 1, 1), 2500, 0, Decimal::ZERO))
        .unwrap();

    let entries = Arc::new(s.repo.get_entries(fund.id).unwrap());
    let handles: Vec<_> = (1..=4u32)
        .map(|years| {
            let entries = Arc::clone(&entries);
            thread::spawn(move || {
                let forecast = invest_track_core::Forecast::new(
                    Uuid::new_v4(),
                    "Thread",
                    date(2024, 1, 1),
                    date(2024 + years as i32, 1, 1),
                    rates(),
                )
                .unwrap();
                project_forecast(&entries, &forecast, &ProjectionOptions::default()).unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let projection = handle.join().unwrap();
        assert_eq!(projection.horizon(), 12 * (i + 1) + 1);
        assert!(projection
            .scenario_series
            .iter()
            .all(|series| series.values[0] == Decimal::from(2500)));
    }
}
