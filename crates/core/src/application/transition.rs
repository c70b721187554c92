//! TransitionEngine - ensures the current quarter's partition exists
//!
//! Stateless across calls: every invocation re-derives the quarter from `now`
//! and asks the registry. At most one `create` per invocation, and none at all
//! once the sheet exists, so repeated or concurrent invocations are safe.

use crate::domain::{QuarterId, TransitionResult};
use crate::port::SheetRegistry;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info};

pub struct TransitionEngine {
    registry: Arc<dyn SheetRegistry>,
}

impl TransitionEngine {
    pub fn new(registry: Arc<dyn SheetRegistry>) -> Self {
        Self { registry }
    }

    /// Create the current quarter's sheet if it is missing
    ///
    /// Never returns an error: registry failures become `TRANSITION_FAILED`
    /// and are retried on the next scheduled invocation.
    pub async fn check_transition(&self, now: DateTime<Utc>) -> TransitionResult {
        let quarter = QuarterId::current(now);
        let sheet_name = quarter.sheet_name();

        match self.registry.exists(&sheet_name).await {
            Ok(true) => {
                info!(sheet = %sheet_name, "Current quarter sheet present, no transition needed");
                return TransitionResult::no_transition(sheet_name);
            }
            Ok(false) => {}
            Err(e) => {
                error!(sheet = %sheet_name, error = %e, "Could not determine whether quarter sheet exists");
                return TransitionResult::failed(sheet_name, e.to_string());
            }
        }

        info!(sheet = %sheet_name, quarter = %quarter, "Quarter transition detected, creating sheet");

        match self.registry.create(quarter).await {
            Ok(descriptor) => {
                info!(sheet = %descriptor.name, "Quarter transition complete");
                TransitionResult::complete(descriptor.name)
            }
            Err(e) => {
                error!(sheet = %sheet_name, error = %e, "Quarter transition failed");
                TransitionResult::failed(sheet_name, e.to_string())
            }
        }
    }
}
