// Transition / Maintenance Result Models
//
// Created fresh per invocation, returned to the caller and logged.

use super::quarter::QuarterId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome state of one transition check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionState {
    NoTransition,
    TransitionComplete,
    TransitionFailed,
}

impl std::fmt::Display for TransitionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionState::NoTransition => write!(f, "NO_TRANSITION"),
            TransitionState::TransitionComplete => write!(f, "TRANSITION_COMPLETE"),
            TransitionState::TransitionFailed => write!(f, "TRANSITION_FAILED"),
        }
    }
}

/// Result of `TransitionEngine::check_transition`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionResult {
    pub state: TransitionState,
    pub transition_needed: bool,
    pub new_sheet_created: bool,
    pub sheet_name: String,
    pub error: Option<String>,
}

impl TransitionResult {
    pub fn no_transition(sheet_name: impl Into<String>) -> Self {
        Self {
            state: TransitionState::NoTransition,
            transition_needed: false,
            new_sheet_created: false,
            sheet_name: sheet_name.into(),
            error: None,
        }
    }

    pub fn complete(sheet_name: impl Into<String>) -> Self {
        Self {
            state: TransitionState::TransitionComplete,
            transition_needed: true,
            new_sheet_created: true,
            sheet_name: sheet_name.into(),
            error: None,
        }
    }

    pub fn failed(sheet_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            state: TransitionState::TransitionFailed,
            transition_needed: true,
            new_sheet_created: false,
            sheet_name: sheet_name.into(),
            error: Some(error.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.state == TransitionState::TransitionFailed
    }
}

/// Health check status, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warning,
    Fail,
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckStatus::Pass => write!(f, "pass"),
            CheckStatus::Warning => write!(f, "warning"),
            CheckStatus::Fail => write!(f, "fail"),
        }
    }
}

/// One maintenance check outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub details: String,
}

impl CheckResult {
    pub fn new(name: impl Into<String>, status: CheckStatus, details: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            details: details.into(),
        }
    }

    pub fn pass(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Pass, details)
    }

    pub fn warning(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Warning, details)
    }

    pub fn fail(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Fail, details)
    }
}

/// Aggregated result of one maintenance run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceReport {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub checks: Vec<CheckResult>,
}

impl MaintenanceReport {
    /// Worst status across all checks (`Pass` for an empty report)
    pub fn overall(&self) -> CheckStatus {
        self.checks
            .iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(CheckStatus::Pass)
    }

    pub fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }

    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }
}

/// Operational snapshot returned by `PartitionService::get_system_status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub configuration_valid: bool,
    pub connected: bool,
    pub current_quarter: QuarterId,
    pub current_sheet_name: String,
    pub current_sheet_exists: bool,
}
