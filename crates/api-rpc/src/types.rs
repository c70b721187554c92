//! RPC Response Types
//!
//! Result payloads of the JSON-RPC methods. None of the methods take
//! parameters.

use quartermaster_core::domain::{CheckResult, CheckStatus, MaintenanceReport, TransitionResult};
use serde::{Deserialize, Serialize};

/// partition.check.v1 - Run the transition check now
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResponse {
    pub state: String,
    pub transition_needed: bool,
    pub new_sheet_created: bool,
    pub sheet_name: String,
    pub error: Option<String>,
}

impl From<TransitionResult> for CheckResponse {
    fn from(result: TransitionResult) -> Self {
        Self {
            state: result.state.to_string(),
            transition_needed: result.transition_needed,
            new_sheet_created: result.new_sheet_created,
            sheet_name: result.sheet_name,
            error: result.error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckItem {
    pub name: String,
    pub status: String,
    pub details: String,
}

impl From<CheckResult> for CheckItem {
    fn from(check: CheckResult) -> Self {
        Self {
            name: check.name,
            status: check.status.to_string(),
            details: check.details,
        }
    }
}

/// admin.maintenance.v1 - Run the maintenance checks now
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceResponse {
    pub run_id: String,
    pub timestamp: String,
    pub overall: String,
    pub passed: usize,
    pub warnings: usize,
    pub failures: usize,
    pub checks: Vec<CheckItem>,
}

impl From<MaintenanceReport> for MaintenanceResponse {
    fn from(report: MaintenanceReport) -> Self {
        Self {
            overall: report.overall().to_string(),
            passed: report.count(CheckStatus::Pass),
            warnings: report.count(CheckStatus::Warning),
            failures: report.count(CheckStatus::Fail),
            run_id: report.run_id,
            timestamp: report.timestamp.to_rfc3339(),
            checks: report.checks.into_iter().map(CheckItem::from).collect(),
        }
    }
}

/// admin.status.v1 - System status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub configuration_valid: bool,
    pub connected: bool,
    pub scheduler_running: bool,
    pub current_quarter: String,
    pub current_sheet_name: String,
    pub current_sheet_exists: bool,
    pub next_runs: Vec<NextRun>,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextRun {
    pub job: String,
    pub due: String,
}

/// partition.list.v1 - Existing partitions, oldest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionsResponse {
    pub partitions: Vec<String>,
}
