// Sheet Registry Port
// Narrow capability interface over whatever backs the partition sheets
// (remote spreadsheet, database, object store).

use crate::domain::{MapperEntry, QuarterId, SheetDescriptor, TemplateSheet};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::time::Duration;

pub const DEFAULT_TEMPLATE_SHEET: &str = "Master Template";
pub const DEFAULT_MAPPER_SHEET: &str = "Record Mapper";

/// Upper bound on a single store call (30s)
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Registry configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Store credentials (connection URL for the SQLite workbook)
    pub credentials: String,

    /// Workbook / spreadsheet document holding every partition
    pub document_id: String,

    /// Worksheet whose header row is cloned into new partitions
    pub template_sheet: String,

    /// Optional raw -> canonical column mapping worksheet
    pub mapper_sheet: String,

    /// Timeout applied to each store call
    pub call_timeout: Duration,
}

impl RegistryConfig {
    pub fn new(credentials: impl Into<String>, document_id: impl Into<String>) -> Self {
        Self {
            credentials: credentials.into(),
            document_id: document_id.into(),
            template_sheet: DEFAULT_TEMPLATE_SHEET.to_string(),
            mapper_sheet: DEFAULT_MAPPER_SHEET.to_string(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Reject configurations the scheduler must not run with
    pub fn validate(&self) -> Result<()> {
        if self.credentials.trim().is_empty() {
            return Err(AppError::Config("store credentials are missing".to_string()));
        }
        if self.document_id.trim().is_empty() {
            return Err(AppError::Config("document id is missing".to_string()));
        }
        if self.template_sheet.trim().is_empty() {
            return Err(AppError::Config("template sheet name is empty".to_string()));
        }
        if self.template_sheet.parse::<QuarterId>().is_ok() {
            return Err(AppError::Config(format!(
                "template sheet '{}' collides with a partition name",
                self.template_sheet
            )));
        }
        if self.call_timeout.is_zero() {
            return Err(AppError::Config("call timeout must be positive".to_string()));
        }
        Ok(())
    }
}

/// Partition registry
#[async_trait]
pub trait SheetRegistry: Send + Sync {
    /// Whether a sheet with this name exists
    async fn exists(&self, name: &str) -> Result<bool>;

    /// Master Template header row
    ///
    /// # Errors
    /// - `AppError::NotFound` if the template sheet is missing
    async fn get_template(&self) -> Result<TemplateSheet>;

    /// Record Mapper entries; empty (not an error) when the mapper sheet is absent
    async fn get_mapper_data(&self) -> Result<Vec<MapperEntry>>;

    /// Create the partition for `quarter` from the Master Template
    ///
    /// Race-tolerant: if the sheet already exists (e.g. created concurrently
    /// by another replica) the existing descriptor is returned.
    async fn create(&self, quarter: QuarterId) -> Result<SheetDescriptor>;

    /// Liveness of the underlying client; false when unset or unreachable
    async fn connection_status(&self) -> bool;

    /// Every existing partition, oldest first
    async fn list_partitions(&self) -> Result<Vec<QuarterId>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Mock mapper behavior
    #[derive(Debug, Clone)]
    pub enum MapperBehavior {
        Entries(Vec<MapperEntry>),
        Absent,
        Fail(String),
        /// Panic inside the call (for check isolation testing)
        Panic(String),
    }

    /// Mock SheetRegistry for testing
    pub struct MockSheetRegistry {
        sheets: Mutex<BTreeMap<String, Vec<String>>>,
        template: Mutex<Option<TemplateSheet>>,
        mapper: Mutex<MapperBehavior>,
        connected: AtomicBool,
        exists_error: Mutex<Option<String>>,
        create_error: Mutex<Option<String>>,
        exists_calls: AtomicUsize,
        create_calls: AtomicUsize,
    }

    impl Default for MockSheetRegistry {
        fn default() -> Self {
            Self {
                sheets: Mutex::new(BTreeMap::new()),
                template: Mutex::new(Some(TemplateSheet::new(["Date", "Vendor", "Amount"]))),
                mapper: Mutex::new(MapperBehavior::Entries(vec![MapperEntry::new(
                    "Inv No",
                    "invoice_number",
                )])),
                connected: AtomicBool::new(true),
                exists_error: Mutex::new(None),
                create_error: Mutex::new(None),
                exists_calls: AtomicUsize::new(0),
                create_calls: AtomicUsize::new(0),
            }
        }
    }

    impl MockSheetRegistry {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_sheet(self, name: &str) -> Self {
            self.sheets
                .lock()
                .unwrap()
                .insert(name.to_string(), Vec::new());
            self
        }

        pub fn with_template(self, template: Option<TemplateSheet>) -> Self {
            *self.template.lock().unwrap() = template;
            self
        }

        pub fn with_mapper(self, behavior: MapperBehavior) -> Self {
            *self.mapper.lock().unwrap() = behavior;
            self
        }

        pub fn set_connected(&self, connected: bool) {
            self.connected.store(connected, Ordering::SeqCst);
        }

        pub fn set_exists_error(&self, error: Option<&str>) {
            *self.exists_error.lock().unwrap() = error.map(str::to_string);
        }

        pub fn set_create_error(&self, error: Option<&str>) {
            *self.create_error.lock().unwrap() = error.map(str::to_string);
        }

        pub fn headers_of(&self, name: &str) -> Option<Vec<String>> {
            self.sheets.lock().unwrap().get(name).cloned()
        }

        pub fn sheet_names(&self) -> Vec<String> {
            self.sheets.lock().unwrap().keys().cloned().collect()
        }

        pub fn exists_calls(&self) -> usize {
            self.exists_calls.load(Ordering::SeqCst)
        }

        pub fn create_calls(&self) -> usize {
            self.create_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SheetRegistry for MockSheetRegistry {
        async fn exists(&self, name: &str) -> Result<bool> {
            self.exists_calls.fetch_add(1, Ordering::SeqCst);
            let exists_error = self.exists_error.lock().unwrap().clone();
            if let Some(msg) = exists_error {
                return Err(AppError::Connectivity(msg));
            }
            Ok(self.sheets.lock().unwrap().contains_key(name))
        }

        async fn get_template(&self) -> Result<TemplateSheet> {
            self.template
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| AppError::NotFound(DEFAULT_TEMPLATE_SHEET.to_string()))
        }

        async fn get_mapper_data(&self) -> Result<Vec<MapperEntry>> {
            let behavior = self.mapper.lock().unwrap().clone();
            match behavior {
                MapperBehavior::Entries(entries) => Ok(entries),
                MapperBehavior::Absent => Ok(Vec::new()),
                MapperBehavior::Fail(msg) => Err(AppError::Connectivity(msg)),
                MapperBehavior::Panic(msg) => panic!("{}", msg),
            }
        }

        async fn create(&self, quarter: QuarterId) -> Result<SheetDescriptor> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            let create_error = self.create_error.lock().unwrap().clone();
            if let Some(msg) = create_error {
                return Err(AppError::Connectivity(msg));
            }
            let template = self.get_template().await?;

            // Insert-if-absent under one lock: concurrent creators converge
            let name = quarter.sheet_name();
            self.sheets
                .lock()
                .unwrap()
                .entry(name.clone())
                .or_insert(template.headers);
            Ok(SheetDescriptor::existing(name))
        }

        async fn connection_status(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        async fn list_partitions(&self) -> Result<Vec<QuarterId>> {
            let mut partitions: Vec<QuarterId> = self
                .sheets
                .lock()
                .unwrap()
                .keys()
                .filter_map(|name| name.parse().ok())
                .collect();
            partitions.sort();
            Ok(partitions)
        }
    }
}
