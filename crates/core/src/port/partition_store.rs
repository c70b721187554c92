// Partition Store Port
// The external, spreadsheet-like workbook that physically holds partition sheets.
// Only StoreSheetRegistry talks to it; the rest of the core sees SheetRegistry.

use crate::domain::SheetDescriptor;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Connector for the external store
#[async_trait]
pub trait PartitionStore: Send + Sync {
    /// Open a session with the given credentials
    ///
    /// # Errors
    /// - `AppError::Connectivity` if the store cannot be reached
    /// - `AppError::Config` if the credentials are malformed
    async fn connect(&self, credentials: &str) -> Result<Arc<dyn StoreSession>>;
}

/// An authenticated session against the store
///
/// There is deliberately no delete operation: partitions are never removed.
#[async_trait]
pub trait StoreSession: Send + Sync {
    /// Names of all worksheets in the document
    async fn list_worksheets(&self, document_id: &str) -> Result<Vec<String>>;

    /// First row of a worksheet, in column order
    ///
    /// # Errors
    /// - `AppError::NotFound` if the worksheet does not exist
    async fn read_header_row(&self, document_id: &str, sheet_name: &str) -> Result<Vec<String>>;

    /// All rows of a worksheet, header row first
    ///
    /// # Errors
    /// - `AppError::NotFound` if the worksheet does not exist
    async fn read_table(&self, document_id: &str, sheet_name: &str) -> Result<Vec<Vec<String>>>;

    /// Create `new_name` carrying a copy of `template_name`'s header row
    ///
    /// # Errors
    /// - `AppError::Conflict` if `new_name` already exists (nothing is modified)
    /// - `AppError::NotFound` if the template does not exist
    async fn create_from_template(
        &self,
        document_id: &str,
        new_name: &str,
        template_name: &str,
    ) -> Result<SheetDescriptor>;

    /// Append rows after the last row, creating the worksheet if needed
    async fn append_rows(
        &self,
        document_id: &str,
        sheet_name: &str,
        rows: &[Vec<String>],
    ) -> Result<()>;

    /// Cheap liveness probe
    async fn ping(&self) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    type SheetKey = (String, String);

    /// In-memory workbook shared by every session it hands out
    #[derive(Default)]
    pub struct InMemoryWorkbook {
        sheets: Mutex<BTreeMap<SheetKey, Vec<Vec<String>>>>,
        create_calls: AtomicUsize,
        offline: AtomicBool,
    }

    impl InMemoryWorkbook {
        fn check_online(&self) -> Result<()> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(AppError::Connectivity("workbook offline".to_string()));
            }
            Ok(())
        }

        fn key(document_id: &str, sheet_name: &str) -> SheetKey {
            (document_id.to_string(), sheet_name.to_string())
        }
    }

    #[async_trait]
    impl StoreSession for InMemoryWorkbook {
        async fn list_worksheets(&self, document_id: &str) -> Result<Vec<String>> {
            self.check_online()?;
            let sheets = self.sheets.lock().unwrap();
            Ok(sheets
                .keys()
                .filter(|(doc, _)| doc == document_id)
                .map(|(_, name)| name.clone())
                .collect())
        }

        async fn read_header_row(&self, document_id: &str, sheet_name: &str) -> Result<Vec<String>> {
            let rows = self.read_table(document_id, sheet_name).await?;
            Ok(rows.into_iter().next().unwrap_or_default())
        }

        async fn read_table(&self, document_id: &str, sheet_name: &str) -> Result<Vec<Vec<String>>> {
            self.check_online()?;
            let sheets = self.sheets.lock().unwrap();
            sheets
                .get(&Self::key(document_id, sheet_name))
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("worksheet '{}'", sheet_name)))
        }

        async fn create_from_template(
            &self,
            document_id: &str,
            new_name: &str,
            template_name: &str,
        ) -> Result<SheetDescriptor> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            self.check_online()?;

            let mut sheets = self.sheets.lock().unwrap();
            let header = sheets
                .get(&Self::key(document_id, template_name))
                .and_then(|rows| rows.first().cloned())
                .ok_or_else(|| AppError::NotFound(format!("template '{}'", template_name)))?;

            let key = Self::key(document_id, new_name);
            if sheets.contains_key(&key) {
                return Err(AppError::Conflict(format!("worksheet '{}' exists", new_name)));
            }
            sheets.insert(key, vec![header]);
            Ok(SheetDescriptor::existing(new_name))
        }

        async fn append_rows(
            &self,
            document_id: &str,
            sheet_name: &str,
            rows: &[Vec<String>],
        ) -> Result<()> {
            self.check_online()?;
            let mut sheets = self.sheets.lock().unwrap();
            sheets
                .entry(Self::key(document_id, sheet_name))
                .or_default()
                .extend(rows.iter().cloned());
            Ok(())
        }

        async fn ping(&self) -> Result<()> {
            self.check_online()
        }
    }

    /// Mock PartitionStore handing out sessions over one shared workbook
    #[derive(Default)]
    pub struct InMemoryPartitionStore {
        workbook: Arc<InMemoryWorkbook>,
        refuse_connect: AtomicBool,
        connect_calls: AtomicUsize,
    }

    impl InMemoryPartitionStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed a worksheet (first row is the header)
        pub fn with_sheet(self, document_id: &str, name: &str, rows: &[&[&str]]) -> Self {
            let rows = rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect();
            self.workbook
                .sheets
                .lock()
                .unwrap()
                .insert(InMemoryWorkbook::key(document_id, name), rows);
            self
        }

        pub fn set_offline(&self, offline: bool) {
            self.workbook.offline.store(offline, Ordering::SeqCst);
        }

        pub fn set_refuse_connect(&self, refuse: bool) {
            self.refuse_connect.store(refuse, Ordering::SeqCst);
        }

        pub fn sheet_rows(&self, document_id: &str, name: &str) -> Option<Vec<Vec<String>>> {
            self.workbook
                .sheets
                .lock()
                .unwrap()
                .get(&InMemoryWorkbook::key(document_id, name))
                .cloned()
        }

        pub fn sheet_count(&self, document_id: &str) -> usize {
            self.workbook
                .sheets
                .lock()
                .unwrap()
                .keys()
                .filter(|(doc, _)| doc == document_id)
                .count()
        }

        pub fn create_calls(&self) -> usize {
            self.workbook.create_calls.load(Ordering::SeqCst)
        }

        pub fn connect_calls(&self) -> usize {
            self.connect_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PartitionStore for InMemoryPartitionStore {
        async fn connect(&self, credentials: &str) -> Result<Arc<dyn StoreSession>> {
            self.connect_calls.fetch_add(1, Ordering::SeqCst);
            if credentials.trim().is_empty() {
                return Err(AppError::Config("empty credentials".to_string()));
            }
            if self.refuse_connect.load(Ordering::SeqCst) {
                return Err(AppError::Connectivity("connection refused".to_string()));
            }
            let session: Arc<dyn StoreSession> = self.workbook.clone();
            Ok(session)
        }
    }
}
