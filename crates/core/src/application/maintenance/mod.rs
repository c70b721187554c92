// Maintenance Checker
// Health checks over the partitioning scheme, aggregated into one report

use crate::application::constants::*;
use crate::application::panic_guard::{execute_guarded_async, PanicGuardResult};
use crate::domain::{CheckResult, CheckStatus, MaintenanceReport, QuarterId};
use crate::error::Result;
use crate::port::{IdProvider, SheetRegistry};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

/// Maintenance configuration
#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    /// Lookahead window: prepare the next partition this many days before the boundary
    pub lookahead_days: i64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
        }
    }
}

/// Runs the six partition health checks in a fixed order
///
/// Each check is isolated: an error or panic inside one check is recorded as
/// that check's result and the remaining checks still run.
pub struct MaintenanceChecker {
    registry: Arc<dyn SheetRegistry>,
    id_provider: Arc<dyn IdProvider>,
    config: MaintenanceConfig,
}

impl MaintenanceChecker {
    pub fn new(
        registry: Arc<dyn SheetRegistry>,
        id_provider: Arc<dyn IdProvider>,
        config: MaintenanceConfig,
    ) -> Self {
        Self {
            registry,
            id_provider,
            config,
        }
    }

    /// Run every check and aggregate the report (never fails)
    pub async fn run(&self, now: DateTime<Utc>) -> MaintenanceReport {
        let run_id = self.id_provider.generate_id();
        let quarter = QuarterId::current(now);

        info!(run_id = %run_id, quarter = %quarter, "Running partition maintenance");

        let mut checks = Vec::with_capacity(CHECK_ORDER.len());

        checks.push(guarded(CHECK_CURRENT_SHEET, CheckStatus::Fail, self.current_sheet(quarter)).await);

        let preparation = guarded(
            CHECK_NEXT_PREPARATION,
            CheckStatus::Fail,
            self.next_preparation(quarter, now),
        )
        .await;
        let lookahead_open = preparation.status == CheckStatus::Warning;
        checks.push(preparation);

        checks.push(
            guarded(
                CHECK_NEXT_CREATION,
                CheckStatus::Fail,
                self.next_creation(quarter, lookahead_open),
            )
            .await,
        );
        checks.push(guarded(CHECK_TEMPLATE, CheckStatus::Fail, self.template()).await);
        // Mapper is optional: any failure degrades to a warning
        checks.push(guarded(CHECK_MAPPER, CheckStatus::Warning, self.mapper()).await);
        checks.push(guarded(CHECK_CONNECTIVITY, CheckStatus::Fail, self.connectivity()).await);

        let report = MaintenanceReport {
            run_id,
            timestamp: now,
            checks,
        };

        let overall = report.overall();
        if overall == CheckStatus::Pass {
            info!(run_id = %report.run_id, "Partition maintenance passed");
        } else {
            warn!(
                run_id = %report.run_id,
                overall = %overall,
                warnings = report.count(CheckStatus::Warning),
                failures = report.count(CheckStatus::Fail),
                "Partition maintenance found issues"
            );
        }
        report
    }

    async fn current_sheet(&self, quarter: QuarterId) -> Result<CheckResult> {
        let name = quarter.sheet_name();
        Ok(if self.registry.exists(&name).await? {
            CheckResult::pass(CHECK_CURRENT_SHEET, format!("{} exists", name))
        } else {
            CheckResult::fail(CHECK_CURRENT_SHEET, format!("{} is missing", name))
        })
    }

    async fn next_preparation(&self, quarter: QuarterId, now: DateTime<Utc>) -> Result<CheckResult> {
        let days = quarter.days_until_boundary(now);
        let details = format!("days={} until {} begins", days, quarter.next().sheet_name());

        Ok(if days <= self.config.lookahead_days {
            CheckResult::warning(CHECK_NEXT_PREPARATION, details)
        } else {
            CheckResult::pass(CHECK_NEXT_PREPARATION, details)
        })
    }

    async fn next_creation(&self, quarter: QuarterId, lookahead_open: bool) -> Result<CheckResult> {
        if !lookahead_open {
            return Ok(CheckResult::pass(
                CHECK_NEXT_CREATION,
                "outside lookahead window, not needed",
            ));
        }

        let next = quarter.next();
        let name = next.sheet_name();
        if self.registry.exists(&name).await? {
            return Ok(CheckResult::pass(
                CHECK_NEXT_CREATION,
                format!("{} already exists", name),
            ));
        }

        // Failure here stays local to this check
        let descriptor = self.registry.create(next).await?;
        info!(sheet = %descriptor.name, "Prepared next quarter sheet ahead of boundary");
        Ok(CheckResult::pass(
            CHECK_NEXT_CREATION,
            format!("created {}", descriptor.name),
        ))
    }

    async fn template(&self) -> Result<CheckResult> {
        let template = self.registry.get_template().await?;
        Ok(CheckResult::pass(
            CHECK_TEMPLATE,
            format!("{} header columns", template.headers.len()),
        ))
    }

    async fn mapper(&self) -> Result<CheckResult> {
        let entries = self.registry.get_mapper_data().await?;
        Ok(if entries.is_empty() {
            CheckResult::warning(CHECK_MAPPER, "record mapper absent or empty")
        } else {
            CheckResult::pass(CHECK_MAPPER, format!("{} mapping entries", entries.len()))
        })
    }

    async fn connectivity(&self) -> Result<CheckResult> {
        Ok(if self.registry.connection_status().await {
            CheckResult::pass(CHECK_CONNECTIVITY, "registry reachable")
        } else {
            CheckResult::fail(CHECK_CONNECTIVITY, "registry client unset or unreachable")
        })
    }
}

/// Run one check, converting errors and panics into a result with `on_error` status
async fn guarded<F>(name: &'static str, on_error: CheckStatus, check: F) -> CheckResult
where
    F: Future<Output = Result<CheckResult>>,
{
    match execute_guarded_async(name, check).await {
        PanicGuardResult::Success(Ok(result)) => result,
        PanicGuardResult::Success(Err(e)) => {
            warn!(check = name, error = %e, "Maintenance check errored");
            CheckResult::new(name, on_error, e.to_string())
        }
        PanicGuardResult::Panicked(msg) => CheckResult::new(name, on_error, format!("check panicked: {}", msg)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::sheet_registry::mocks::{MapperBehavior, MockSheetRegistry};
    use chrono::TimeZone;

    fn checker(registry: Arc<MockSheetRegistry>) -> MaintenanceChecker {
        MaintenanceChecker::new(
            registry,
            Arc::new(SequentialIdProvider::default()),
            MaintenanceConfig::default(),
        )
    }

    fn at(month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, month, day, 9, 0, 0).unwrap()
    }

    fn status(report: &MaintenanceReport, name: &str) -> CheckStatus {
        report.check(name).unwrap().status
    }

    #[tokio::test]
    async fn test_healthy_mid_quarter_report() {
        let registry = Arc::new(MockSheetRegistry::new().with_sheet("Q3-2025"));
        let report = checker(registry.clone()).run(at(8, 1)).await;

        let names: Vec<&str> = report.checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, CHECK_ORDER.to_vec());
        assert_eq!(report.overall(), CheckStatus::Pass);
        assert_eq!(report.run_id, "run-1");
        assert_eq!(registry.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_lookahead_scenario_creates_next_sheet() {
        // 2025-09-24 is 7 days before Q4 2025 begins
        let registry = Arc::new(MockSheetRegistry::new().with_sheet("Q3-2025"));
        let report = checker(registry.clone()).run(at(9, 24)).await;

        let preparation = report.check(CHECK_NEXT_PREPARATION).unwrap();
        assert_eq!(preparation.status, CheckStatus::Warning);
        assert!(preparation.details.contains("days=7"));

        let creation = report.check(CHECK_NEXT_CREATION).unwrap();
        assert_eq!(creation.status, CheckStatus::Pass);
        assert!(creation.details.contains("created Q4-2025"));
        assert_eq!(registry.create_calls(), 1);
        assert!(registry.headers_of("Q4-2025").is_some());
    }

    #[tokio::test]
    async fn test_lookahead_next_sheet_preexisting() {
        let registry = Arc::new(
            MockSheetRegistry::new()
                .with_sheet("Q3-2025")
                .with_sheet("Q4-2025"),
        );
        let report = checker(registry.clone()).run(at(9, 28)).await;

        let creation = report.check(CHECK_NEXT_CREATION).unwrap();
        assert_eq!(creation.status, CheckStatus::Pass);
        assert!(creation.details.contains("already exists"));
        assert_eq!(registry.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_lookahead_create_failure_is_local() {
        let registry = Arc::new(MockSheetRegistry::new().with_sheet("Q3-2025"));
        registry.set_create_error(Some("quota exceeded"));
        let report = checker(registry).run(at(9, 30)).await;

        assert_eq!(report.checks.len(), 6);
        assert_eq!(status(&report, CHECK_NEXT_CREATION), CheckStatus::Fail);
        assert!(report.check(CHECK_NEXT_CREATION).unwrap().details.contains("quota exceeded"));
        assert_eq!(status(&report, CHECK_TEMPLATE), CheckStatus::Pass);
        assert_eq!(status(&report, CHECK_CONNECTIVITY), CheckStatus::Pass);
    }

    #[tokio::test]
    async fn test_mapper_error_degrades_to_warning() {
        let registry = Arc::new(
            MockSheetRegistry::new()
                .with_sheet("Q3-2025")
                .with_mapper(MapperBehavior::Fail("mapper read failed".to_string())),
        );
        let report = checker(registry).run(at(8, 1)).await;

        assert_eq!(report.checks.len(), 6);
        assert_eq!(status(&report, CHECK_MAPPER), CheckStatus::Warning);
        assert_eq!(report.overall(), CheckStatus::Warning);
    }

    #[tokio::test]
    async fn test_mapper_panic_is_isolated() {
        let registry = Arc::new(
            MockSheetRegistry::new()
                .with_sheet("Q3-2025")
                .with_mapper(MapperBehavior::Panic("mapper exploded".to_string())),
        );
        let report = checker(registry).run(at(8, 1)).await;

        assert_eq!(report.checks.len(), 6);
        let mapper = report.check(CHECK_MAPPER).unwrap();
        assert_eq!(mapper.status, CheckStatus::Warning);
        assert!(mapper.details.contains("mapper exploded"));
        assert_eq!(status(&report, CHECK_CONNECTIVITY), CheckStatus::Pass);
    }

    #[tokio::test]
    async fn test_mapper_absent_is_warning_never_fail() {
        let registry = Arc::new(
            MockSheetRegistry::new()
                .with_sheet("Q3-2025")
                .with_mapper(MapperBehavior::Absent),
        );
        let report = checker(registry).run(at(8, 1)).await;
        assert_eq!(status(&report, CHECK_MAPPER), CheckStatus::Warning);
    }

    #[tokio::test]
    async fn test_failures_reported_per_check() {
        let registry = Arc::new(MockSheetRegistry::new().with_template(None));
        registry.set_connected(false);
        let report = checker(registry).run(at(8, 1)).await;

        assert_eq!(report.checks.len(), 6);
        assert_eq!(status(&report, CHECK_CURRENT_SHEET), CheckStatus::Fail);
        assert_eq!(status(&report, CHECK_NEXT_PREPARATION), CheckStatus::Pass);
        assert_eq!(status(&report, CHECK_TEMPLATE), CheckStatus::Fail);
        assert_eq!(status(&report, CHECK_CONNECTIVITY), CheckStatus::Fail);
        assert_eq!(report.count(CheckStatus::Fail), 3);
    }

    #[tokio::test]
    async fn test_registry_errors_never_escape() {
        let registry = Arc::new(MockSheetRegistry::new());
        registry.set_exists_error(Some("timeout"));
        let report = checker(registry).run(at(9, 25)).await;

        assert_eq!(report.checks.len(), 6);
        assert_eq!(status(&report, CHECK_CURRENT_SHEET), CheckStatus::Fail);
        assert_eq!(status(&report, CHECK_NEXT_CREATION), CheckStatus::Fail);
    }

    #[tokio::test]
    async fn test_each_run_gets_new_id() {
        let checker = checker(Arc::new(MockSheetRegistry::new()));
        let first = checker.run(at(8, 1)).await;
        let second = checker.run(at(8, 1)).await;
        assert_ne!(first.run_id, second.run_id);
    }
}
