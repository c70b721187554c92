// Scheduled jobs driven by the BackgroundScheduler

use crate::application::maintenance::MaintenanceChecker;
use crate::application::transition::TransitionEngine;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// A unit of periodic work
///
/// Errors are logged by the scheduler and the job is rescheduled at its next
/// occurrence; nothing is retried early.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    async fn run(&self, now: DateTime<Utc>) -> Result<()>;
}

/// Ensures the current quarter's partition exists
pub struct TransitionJob {
    engine: Arc<TransitionEngine>,
}

impl TransitionJob {
    pub fn new(engine: Arc<TransitionEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl ScheduledJob for TransitionJob {
    async fn run(&self, now: DateTime<Utc>) -> Result<()> {
        let result = self.engine.check_transition(now).await;
        if result.is_failed() {
            return Err(AppError::Internal(format!(
                "transition to {} failed: {}",
                result.sheet_name,
                result.error.unwrap_or_default()
            )));
        }
        Ok(())
    }
}

/// Weekly partition health report
pub struct MaintenanceJob {
    checker: Arc<MaintenanceChecker>,
}

impl MaintenanceJob {
    pub fn new(checker: Arc<MaintenanceChecker>) -> Self {
        Self { checker }
    }
}

#[async_trait]
impl ScheduledJob for MaintenanceJob {
    async fn run(&self, now: DateTime<Utc>) -> Result<()> {
        // The checker logs its own summary; a degraded report is not a job failure
        self.checker.run(now).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::sheet_registry::mocks::MockSheetRegistry;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_transition_job_surfaces_failure() {
        let registry = Arc::new(MockSheetRegistry::new().with_template(None));
        let job = TransitionJob::new(Arc::new(TransitionEngine::new(registry)));

        let err = job
            .run(Utc.with_ymd_and_hms(2026, 1, 1, 0, 5, 0).unwrap())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Q1-2026"));
    }

    #[tokio::test]
    async fn test_transition_job_ok_when_sheet_created() {
        let registry = Arc::new(MockSheetRegistry::new());
        let job = TransitionJob::new(Arc::new(TransitionEngine::new(registry.clone())));

        job.run(Utc.with_ymd_and_hms(2026, 1, 1, 0, 5, 0).unwrap())
            .await
            .unwrap();
        assert_eq!(registry.sheet_names(), vec!["Q1-2026"]);
    }
}
