// Application Layer - Use Cases and Scheduling

pub mod constants;
pub mod maintenance;
pub mod panic_guard;
pub mod registry;
pub mod scheduler;
pub mod service;
pub mod transition;

// Re-exports
pub use maintenance::{MaintenanceChecker, MaintenanceConfig};
pub use registry::StoreSheetRegistry;
pub use scheduler::{BackgroundScheduler, Schedule, ScheduledJob, SchedulerConfig};
pub use service::PartitionService;
pub use transition::TransitionEngine;
