// Domain Layer - Pure business logic and entities

pub mod error;
pub mod quarter;
pub mod report;
pub mod sheet;

// Re-exports
pub use error::DomainError;
pub use quarter::QuarterId;
pub use report::{
    CheckResult, CheckStatus, MaintenanceReport, SystemStatus, TransitionResult, TransitionState,
};
pub use sheet::{MapperEntry, SheetDescriptor, TemplateSheet};
