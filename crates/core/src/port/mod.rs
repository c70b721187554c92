// Port Layer - Interfaces for external dependencies

pub mod id_provider; // For deterministic testing
pub mod partition_store;
pub mod sheet_registry;
pub mod time_provider;

// Re-exports
pub use id_provider::IdProvider;
pub use partition_store::{PartitionStore, StoreSession};
pub use sheet_registry::{RegistryConfig, SheetRegistry};
pub use time_provider::TimeProvider;
