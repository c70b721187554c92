//! RPC Method Handlers

use crate::error::to_rpc_error;
use crate::types::{CheckResponse, MaintenanceResponse, NextRun, PartitionsResponse, StatusResponse};
use jsonrpsee::types::ErrorObjectOwned;
use quartermaster_core::application::{BackgroundScheduler, PartitionService};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    service: Arc<PartitionService>,
    scheduler: Arc<BackgroundScheduler>,
    start_time: Instant,
}

impl RpcHandler {
    pub fn new(service: Arc<PartitionService>, scheduler: Arc<BackgroundScheduler>) -> Self {
        Self {
            service,
            scheduler,
            start_time: Instant::now(),
        }
    }

    /// partition.check.v1
    pub async fn check(&self) -> Result<CheckResponse, ErrorObjectOwned> {
        let result = self
            .service
            .run_immediate_check()
            .await
            .map_err(to_rpc_error)?;

        info!(state = %result.state, sheet = %result.sheet_name, "RPC transition check finished");
        Ok(result.into())
    }

    /// admin.maintenance.v1
    pub async fn maintenance(&self) -> Result<MaintenanceResponse, ErrorObjectOwned> {
        let report = self
            .service
            .run_immediate_maintenance()
            .await
            .map_err(to_rpc_error)?;

        info!(run_id = %report.run_id, overall = %report.overall(), "RPC maintenance finished");
        Ok(report.into())
    }

    /// admin.status.v1
    pub async fn status(&self) -> Result<StatusResponse, ErrorObjectOwned> {
        let status = self.service.get_system_status().await;
        let next_runs = self
            .scheduler
            .next_due()
            .into_iter()
            .map(|(job, due)| NextRun {
                job,
                due: due.to_rfc3339(),
            })
            .collect();

        Ok(StatusResponse {
            version: quartermaster_core::VERSION.to_string(),
            configuration_valid: status.configuration_valid,
            connected: status.connected,
            scheduler_running: self.scheduler.is_running(),
            current_quarter: status.current_quarter.to_string(),
            current_sheet_name: status.current_sheet_name,
            current_sheet_exists: status.current_sheet_exists,
            next_runs,
            uptime_seconds: self.start_time.elapsed().as_secs(),
        })
    }

    /// partition.list.v1
    pub async fn partitions(&self) -> Result<PartitionsResponse, ErrorObjectOwned> {
        let partitions = self.service.list_partitions().await.map_err(to_rpc_error)?;
        Ok(PartitionsResponse {
            partitions: partitions.iter().map(|q| q.sheet_name()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::code;
    use chrono::{TimeZone, Utc};
    use quartermaster_core::application::{MaintenanceChecker, SchedulerConfig, TransitionEngine};
    use quartermaster_core::port::id_provider::mocks::SequentialIdProvider;
    use quartermaster_core::port::sheet_registry::mocks::MockSheetRegistry;
    use quartermaster_core::port::time_provider::mocks::MockTimeProvider;
    use quartermaster_core::port::TimeProvider;

    fn handler(registry: Arc<MockSheetRegistry>, invalid: bool) -> RpcHandler {
        let clock: Arc<dyn TimeProvider> = Arc::new(MockTimeProvider::new(
            Utc.with_ymd_and_hms(2025, 9, 24, 9, 0, 0).unwrap(),
        ));
        let engine = Arc::new(TransitionEngine::new(registry.clone()));
        let checker = Arc::new(MaintenanceChecker::new(
            registry.clone(),
            Arc::new(SequentialIdProvider::default()),
            Default::default(),
        ));
        let scheduler = Arc::new(BackgroundScheduler::for_partitions(
            engine.clone(),
            checker.clone(),
            clock.clone(),
            SchedulerConfig::default(),
        ));

        let mut service = PartitionService::new(registry, engine, checker, clock);
        if invalid {
            service = service.with_invalid_config("store credentials are missing");
        }
        RpcHandler::new(Arc::new(service), scheduler)
    }

    #[tokio::test]
    async fn test_check_reports_created_sheet() {
        let registry = Arc::new(MockSheetRegistry::new());
        let response = handler(registry, false).check().await.unwrap();

        assert_eq!(response.state, "TRANSITION_COMPLETE");
        assert_eq!(response.sheet_name, "Q3-2025");
        assert!(response.new_sheet_created);
    }

    #[tokio::test]
    async fn test_maintenance_counts() {
        let registry = Arc::new(MockSheetRegistry::new().with_sheet("Q3-2025"));
        let response = handler(registry, false).maintenance().await.unwrap();

        assert_eq!(response.checks.len(), 6);
        assert_eq!(response.overall, "warning");
        assert_eq!(response.warnings, 1);
        assert_eq!(response.passed, 5);
    }

    #[tokio::test]
    async fn test_invalid_config_maps_to_config_code() {
        let registry = Arc::new(MockSheetRegistry::new());
        let handler = handler(registry, true);

        let err = handler.check().await.unwrap_err();
        assert_eq!(err.code(), code::CONFIG_ERROR);

        let status = handler.status().await.unwrap();
        assert!(!status.configuration_valid);
        assert!(!status.scheduler_running);
        assert_eq!(status.current_quarter, "Q3-2025");
    }

    #[tokio::test]
    async fn test_partitions_by_name() {
        let registry = Arc::new(
            MockSheetRegistry::new()
                .with_sheet("Q3-2025")
                .with_sheet("Q2-2025"),
        );
        let response = handler(registry, false).partitions().await.unwrap();
        assert_eq!(response.partitions, vec!["Q2-2025", "Q3-2025"]);
    }

    #[tokio::test]
    async fn test_check_wire_format() {
        let registry = Arc::new(MockSheetRegistry::new());
        let response = handler(registry, false).check().await.unwrap();

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "state": "TRANSITION_COMPLETE",
                "transition_needed": true,
                "new_sheet_created": true,
                "sheet_name": "Q3-2025",
                "error": null,
            })
        );
    }

    #[tokio::test]
    async fn test_maintenance_wire_format() {
        let registry = Arc::new(MockSheetRegistry::new().with_sheet("Q3-2025"));
        let response = handler(registry, false).maintenance().await.unwrap();

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["run_id"], "run-1");
        assert_eq!(json["overall"], "warning");
        assert_eq!(json["checks"][0]["name"], "current_quarter_sheet_exists");
        assert_eq!(json["checks"][0]["status"], "pass");
        assert_eq!(json["checks"][1]["status"], "warning");
        assert_eq!(json["checks"].as_array().unwrap().len(), 6);
        assert!(json["timestamp"].as_str().unwrap().starts_with("2025-09-24T09:00:00"));
    }

    #[tokio::test]
    async fn test_status_wire_format() {
        let registry = Arc::new(MockSheetRegistry::new().with_sheet("Q3-2025"));
        let status = handler(registry, false).status().await.unwrap();

        let json = serde_json::to_value(&status).unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "configuration_valid",
                "connected",
                "current_quarter",
                "current_sheet_exists",
                "current_sheet_name",
                "next_runs",
                "scheduler_running",
                "uptime_seconds",
                "version",
            ]
        );
        assert_eq!(json["current_sheet_name"], "Q3-2025");
        assert_eq!(json["current_sheet_exists"], true);
    }
}
