//! Concurrent access through one shared repository
//!
//! Services share a single `DuckDbRepository` behind an `Arc`; its connection
//! mutex must serialize writers without losing or interleaving rows.
//!
//! Run with: cargo test --test concurrent_access_test -- --nocapture

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use tempfile::TempDir;
use uuid::Uuid;

use invest_track_core::adapters::duckdb::DuckDbRepository;
use invest_track_core::ports::Repository;
use invest_track_core::services::{EntryDraft, InvestmentDraft, InvestmentService, SummaryService};
use invest_track_core::Investment;

const THREAD_COUNT: usize = 6;
const ENTRIES_PER_THREAD: usize = 5;

fn shared_repository(temp_dir: &TempDir) -> Arc<DuckDbRepository> {
    let repo = DuckDbRepository::new(&temp_dir.path().join("concurrent.duckdb")).unwrap();
    repo.ensure_schema().unwrap();
    Arc::new(repo)
}

#[test]
fn test_concurrent_entry_writes_are_all_stored() {
    let temp_dir = TempDir::new().unwrap();
    let repo = shared_repository(&temp_dir);
    let store: Arc<dyn Repository> = repo.clone();

    let service = InvestmentService::new(Arc::clone(&store));
    let investment = service
        .create(InvestmentDraft {
            name: "Shared fund".to_string(),
            currency: "EUR".to_string(),
            ..Default::default()
        })
        .unwrap();

    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let written = Arc::new(AtomicUsize::new(0));
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();

    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|thread_id| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            let written = Arc::clone(&written);
            thread::spawn(move || {
                let service = InvestmentService::new(store);
                barrier.wait();
                for i in 0..ENTRIES_PER_THREAD {
                    let offset = (thread_id * ENTRIES_PER_THREAD + i) as i64;
                    let draft = EntryDraft {
                        datetime: Some(start + Duration::hours(offset)),
                        initial_invested_amount: Decimal::new(1000, 0),
                        reinvested_amount: Decimal::new(offset, 0),
                        profitability: Decimal::new(5, 2),
                        comments: None,
                    };
                    service.add_entry(investment.id, draft).unwrap();
                    written.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("writer thread panicked");
    }

    let expected = THREAD_COUNT * ENTRIES_PER_THREAD;
    assert_eq!(written.load(Ordering::SeqCst), expected);

    let entries = repo.get_entries(investment.id).unwrap();
    assert_eq!(entries.len(), expected);
    assert!(entries.windows(2).all(|w| w[0].datetime <= w[1].datetime));

    // Last entry is the one with the largest offset
    let last = entries.last().unwrap();
    assert_eq!(last.reinvested_amount, Decimal::new(expected as i64 - 1, 0));
}

#[test]
fn test_readers_and_writers_interleave() {
    let temp_dir = TempDir::new().unwrap();
    let repo = shared_repository(&temp_dir);
    let store: Arc<dyn Repository> = repo.clone();

    let opened = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    let ids: Vec<Uuid> = (0..THREAD_COUNT)
        .map(|i| {
            let investment = Investment::new(Uuid::new_v4(), format!("Fund {}", i), "EUR", opened);
            store.upsert_investment(&investment).unwrap();
            investment.id
        })
        .collect();

    let barrier = Arc::new(Barrier::new(THREAD_COUNT * 2));
    let mut handles = Vec::new();

    for id in ids.iter().copied() {
        let store = Arc::clone(&store);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            let service = InvestmentService::new(store);
            barrier.wait();
            for month in 0..ENTRIES_PER_THREAD {
                let draft = EntryDraft {
                    datetime: Some(opened + Duration::days(30 * month as i64 + 1)),
                    initial_invested_amount: Decimal::new(100, 0),
                    profitability: Decimal::new(1, 1),
                    ..Default::default()
                };
                service.add_entry(id, draft).unwrap();
            }
        }));
    }

    for _ in 0..THREAD_COUNT {
        let store = Arc::clone(&store);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            let summaries = SummaryService::new(store);
            barrier.wait();
            for _ in 0..ENTRIES_PER_THREAD {
                let summary = summaries.get_summary(false).unwrap();
                // Every stored last entry is 100 invested at +10 %
                assert_eq!(summary.obtained, summary.invested_amount * Decimal::new(11, 1));
            }
        }));
    }

    for handle in handles {
        handle.join().expect("worker thread panicked");
    }

    let summary = SummaryService::new(store).get_summary(false).unwrap();
    assert_eq!(summary.invested_amount, Decimal::new(100 * THREAD_COUNT as i64, 0));
    assert_eq!(summary.profitability, Decimal::new(1, 1));
}

#[test]
fn test_reopen_after_drop() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("reopen.duckdb");

    for _ in 0..3 {
        let repo = DuckDbRepository::new(&db_path).unwrap();
        repo.ensure_schema().unwrap();
        assert!(repo.get_investments().unwrap().is_empty());
    }
}
