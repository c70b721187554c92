//! Quarter lifecycle against the SQLite workbook
//!
//! Drives the transition engine, maintenance checker and scheduler with a
//! mock clock across a quarter boundary.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use quartermaster_core::application::constants::*;
use quartermaster_core::application::{
    BackgroundScheduler, MaintenanceChecker, MaintenanceConfig, SchedulerConfig,
    StoreSheetRegistry, TransitionEngine,
};
use quartermaster_core::domain::{CheckStatus, TransitionState};
use quartermaster_core::port::id_provider::mocks::SequentialIdProvider;
use quartermaster_core::port::time_provider::mocks::MockTimeProvider;
use quartermaster_core::port::{PartitionStore, RegistryConfig, SheetRegistry, StoreSession};
use quartermaster_infra_sqlite::SqliteWorkbookStore;

const URL: &str = "sqlite::memory:";
const DOC: &str = "finance";

struct System {
    session: Arc<dyn StoreSession>,
    registry: Arc<StoreSheetRegistry>,
    engine: Arc<TransitionEngine>,
    checker: Arc<MaintenanceChecker>,
}

async fn system() -> System {
    let store = Arc::new(SqliteWorkbookStore::new());
    let session = store.connect(URL).await.unwrap();
    let registry = Arc::new(StoreSheetRegistry::new(store, RegistryConfig::new(URL, DOC)));
    registry.connect().await.unwrap();

    let headers: Vec<String> = ["Date", "Vendor", "Amount"].iter().map(|h| h.to_string()).collect();
    registry.ensure_template(&headers).await.unwrap();
    session
        .append_rows(
            DOC,
            "Record Mapper",
            &[
                vec!["Raw Name".to_string(), "Canonical Name".to_string()],
                vec!["ACME CORP".to_string(), "Acme".to_string()],
            ],
        )
        .await
        .unwrap();

    let engine = Arc::new(TransitionEngine::new(registry.clone()));
    let checker = Arc::new(MaintenanceChecker::new(
        registry.clone(),
        Arc::new(SequentialIdProvider::default()),
        MaintenanceConfig::default(),
    ));
    System {
        session,
        registry,
        engine,
        checker,
    }
}

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

#[tokio::test]
async fn test_transition_creates_current_quarter_once() {
    let s = system().await;
    let now = utc(2025, 10, 1, 0, 5);

    let first = s.engine.check_transition(now).await;
    assert_eq!(first.state, TransitionState::TransitionComplete);
    assert!(first.transition_needed);
    assert!(first.new_sheet_created);
    assert_eq!(first.sheet_name, "Q4-2025");

    let second = s.engine.check_transition(now).await;
    assert_eq!(second.state, TransitionState::NoTransition);
    assert!(!second.transition_needed);

    let rows = s.session.read_table(DOC, "Q4-2025").await.unwrap();
    assert_eq!(rows, vec![vec!["Date", "Vendor", "Amount"]]);
}

#[tokio::test]
async fn test_maintenance_prepares_next_quarter_within_lookahead() {
    let s = system().await;
    let now = utc(2025, 9, 24, 9, 0);
    s.engine.check_transition(now).await;

    let report = s.checker.run(now).await;
    assert_eq!(report.run_id, "run-1");
    let names: Vec<&str> = report.checks.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, CHECK_ORDER.to_vec());

    let current = report.check(CHECK_CURRENT_SHEET).unwrap();
    assert_eq!(current.status, CheckStatus::Pass);

    let preparation = report.check(CHECK_NEXT_PREPARATION).unwrap();
    assert_eq!(preparation.status, CheckStatus::Warning);
    assert!(preparation.details.contains("days=7"), "{}", preparation.details);

    let creation = report.check(CHECK_NEXT_CREATION).unwrap();
    assert_eq!(creation.status, CheckStatus::Pass);
    assert_eq!(creation.details, "created Q4-2025");
    assert!(s.registry.exists("Q4-2025").await.unwrap());

    assert_eq!(report.check(CHECK_TEMPLATE).unwrap().status, CheckStatus::Pass);
    assert_eq!(report.check(CHECK_MAPPER).unwrap().status, CheckStatus::Pass);
    assert_eq!(report.check(CHECK_CONNECTIVITY).unwrap().status, CheckStatus::Pass);
    assert_eq!(report.overall(), CheckStatus::Warning);

    // A week later the boundary has passed and the sheet is already in place
    let boundary = s.engine.check_transition(utc(2025, 10, 1, 0, 5)).await;
    assert_eq!(boundary.state, TransitionState::NoTransition);
}

#[tokio::test]
async fn test_maintenance_outside_lookahead_creates_nothing() {
    let s = system().await;
    let now = utc(2025, 8, 4, 9, 0);
    s.engine.check_transition(now).await;

    let report = s.checker.run(now).await;
    assert_eq!(report.check(CHECK_NEXT_PREPARATION).unwrap().status, CheckStatus::Pass);
    assert_eq!(report.overall(), CheckStatus::Pass);
    assert!(!s.registry.exists("Q4-2025").await.unwrap());
}

#[tokio::test]
async fn test_maintenance_reports_missing_current_sheet() {
    let s = system().await;

    let report = s.checker.run(utc(2025, 5, 12, 9, 0)).await;
    let current = report.check(CHECK_CURRENT_SHEET).unwrap();
    assert_eq!(current.status, CheckStatus::Fail);
    assert!(current.details.contains("Q2-2025"));
    assert_eq!(report.overall(), CheckStatus::Fail);
}

#[tokio::test]
async fn test_scheduler_jobs_walk_across_year_boundary() {
    let s = system().await;
    let start = utc(2025, 12, 31, 23, 0);
    let clock = Arc::new(MockTimeProvider::new(start));
    let config = SchedulerConfig {
        startup_delay: Duration::from_secs(10),
        ..SchedulerConfig::default()
    };
    let scheduler = BackgroundScheduler::for_partitions(
        s.engine.clone(),
        s.checker.clone(),
        clock.clone(),
        config,
    );

    // First pass only seeds the jobs
    assert!(scheduler.run_pending(start).await.is_empty());

    let due = scheduler.next_due();
    assert_eq!(due[0], (JOB_STARTUP_TRANSITION.to_string(), utc(2025, 12, 31, 23, 0) + chrono::Duration::seconds(10)));
    assert_eq!(due[1], (JOB_DAILY_TRANSITION.to_string(), utc(2026, 1, 1, 0, 5)));
    assert_eq!(due[2], (JOB_WEEKLY_MAINTENANCE.to_string(), utc(2026, 1, 5, 9, 0)));

    // Startup check creates Q4-2025
    let t = utc(2025, 12, 31, 23, 1);
    clock.set(t);
    assert_eq!(scheduler.run_pending(t).await, vec![JOB_STARTUP_TRANSITION]);
    assert!(s.registry.exists("Q4-2025").await.unwrap());

    // Just after midnight the daily check rolls into Q1-2026
    let t = utc(2026, 1, 1, 0, 5);
    clock.set(t);
    assert_eq!(scheduler.run_pending(t).await, vec![JOB_DAILY_TRANSITION]);
    assert!(s.registry.exists("Q1-2026").await.unwrap());

    // The one-shot job is retired
    let remaining: Vec<String> = scheduler.next_due().into_iter().map(|(name, _)| name).collect();
    assert_eq!(remaining, vec![JOB_DAILY_TRANSITION, JOB_WEEKLY_MAINTENANCE]);

    let partitions = s.registry.list_partitions().await.unwrap();
    let names: Vec<String> = partitions.iter().map(|q| q.sheet_name()).collect();
    assert_eq!(names, vec!["Q4-2025", "Q1-2026"]);
}
