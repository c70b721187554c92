//! PartitionService - operational facade behind the RPC endpoints
//!
//! On-demand triggers run on a spawned tokio task so a slow store never stalls
//! request handling. When the daemon started with an invalid configuration the
//! triggers refuse with `AppError::Config` and status reports it.

use crate::application::maintenance::MaintenanceChecker;
use crate::application::transition::TransitionEngine;
use crate::domain::{MaintenanceReport, QuarterId, SystemStatus, TransitionResult};
use crate::error::{AppError, Result};
use crate::port::{SheetRegistry, TimeProvider};
use std::sync::Arc;
use tracing::{info, warn};

pub struct PartitionService {
    registry: Arc<dyn SheetRegistry>,
    engine: Arc<TransitionEngine>,
    checker: Arc<MaintenanceChecker>,
    time_provider: Arc<dyn TimeProvider>,
    config_error: Option<String>,
}

impl PartitionService {
    pub fn new(
        registry: Arc<dyn SheetRegistry>,
        engine: Arc<TransitionEngine>,
        checker: Arc<MaintenanceChecker>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            registry,
            engine,
            checker,
            time_provider,
            config_error: None,
        }
    }

    /// Mark the configuration invalid; triggers will refuse to run
    pub fn with_invalid_config(mut self, reason: impl Into<String>) -> Self {
        self.config_error = Some(reason.into());
        self
    }

    pub fn is_configured(&self) -> bool {
        self.config_error.is_none()
    }

    fn ensure_configured(&self) -> Result<()> {
        match &self.config_error {
            Some(reason) => Err(AppError::Config(reason.clone())),
            None => Ok(()),
        }
    }

    /// Run the transition check now
    pub async fn run_immediate_check(&self) -> Result<TransitionResult> {
        self.ensure_configured()?;
        let engine = self.engine.clone();
        let now = self.time_provider.now();

        info!("Immediate transition check requested");
        tokio::spawn(async move { engine.check_transition(now).await })
            .await
            .map_err(|e| AppError::Internal(format!("transition task failed: {}", e)))
    }

    /// Run the maintenance checks now
    pub async fn run_immediate_maintenance(&self) -> Result<MaintenanceReport> {
        self.ensure_configured()?;
        let checker = self.checker.clone();
        let now = self.time_provider.now();

        info!("Immediate maintenance requested");
        tokio::spawn(async move { checker.run(now).await })
            .await
            .map_err(|e| AppError::Internal(format!("maintenance task failed: {}", e)))
    }

    /// Snapshot of configuration, connectivity and the current partition
    pub async fn get_system_status(&self) -> SystemStatus {
        let current_quarter = QuarterId::current(self.time_provider.now());
        let current_sheet_name = current_quarter.sheet_name();

        if !self.is_configured() {
            return SystemStatus {
                configuration_valid: false,
                connected: false,
                current_quarter,
                current_sheet_name,
                current_sheet_exists: false,
            };
        }

        let connected = self.registry.connection_status().await;
        let current_sheet_exists = match self.registry.exists(&current_sheet_name).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(sheet = %current_sheet_name, error = %e, "Status lookup failed");
                false
            }
        };

        SystemStatus {
            configuration_valid: true,
            connected,
            current_quarter,
            current_sheet_name,
            current_sheet_exists,
        }
    }

    /// Existing partitions, oldest first
    pub async fn list_partitions(&self) -> Result<Vec<QuarterId>> {
        self.ensure_configured()?;
        self.registry.list_partitions().await
    }
}
