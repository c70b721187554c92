// Quartermaster Infrastructure - SQLite Workbook Adapter
// Implements: PartitionStore, StoreSession

mod connection;
mod error;
mod migration;
mod workbook;

pub use connection::create_pool;
pub use migration::run_migrations;
pub use workbook::{SqliteWorkbookSession, SqliteWorkbookStore};
