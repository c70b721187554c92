//! StoreSheetRegistry - SheetRegistry over a PartitionStore session
//!
//! Owns the client slot: `connect()` fills it, every operation reuses it and
//! reconnects lazily when it is unset, so a store outage at startup is retried
//! on the next scheduled cycle. Each store call is bounded by
//! `RegistryConfig::call_timeout`.

use crate::domain::{MapperEntry, QuarterId, SheetDescriptor, TemplateSheet};
use crate::error::{AppError, Result};
use crate::port::{PartitionStore, RegistryConfig, SheetRegistry, StoreSession};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub struct StoreSheetRegistry {
    store: Arc<dyn PartitionStore>,
    config: RegistryConfig,
    session: RwLock<Option<Arc<dyn StoreSession>>>,
}

impl StoreSheetRegistry {
    pub fn new(store: Arc<dyn PartitionStore>, config: RegistryConfig) -> Self {
        Self {
            store,
            config,
            session: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Open a session and store it in the client slot
    pub async fn connect(&self) -> Result<()> {
        let session = self
            .bounded("connect", self.store.connect(&self.config.credentials))
            .await
            .inspect_err(|e| warn!(error = %e, "Partition store connection failed"))?;

        *self.session.write().await = Some(session);
        info!(document_id = %self.config.document_id, "Connected to partition store");
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Seed the Master Template header row when the template sheet is absent
    ///
    /// Returns true if the template was written.
    pub async fn ensure_template(&self, headers: &[String]) -> Result<bool> {
        if headers.is_empty() {
            return Err(AppError::Validation("template headers are empty".to_string()));
        }
        if self.exists(&self.config.template_sheet).await? {
            return Ok(false);
        }

        let session = self.session().await?;
        self.bounded(
            "append_rows",
            session.append_rows(
                &self.config.document_id,
                &self.config.template_sheet,
                &[headers.to_vec()],
            ),
        )
        .await?;

        info!(
            template = %self.config.template_sheet,
            columns = headers.len(),
            "Seeded master template"
        );
        Ok(true)
    }

    async fn session(&self) -> Result<Arc<dyn StoreSession>> {
        if let Some(session) = self.session.read().await.as_ref() {
            return Ok(session.clone());
        }

        debug!("Partition store client unset, reconnecting");
        self.connect().await?;
        self.session
            .read()
            .await
            .clone()
            .ok_or_else(|| AppError::Connectivity("partition store client not set".to_string()))
    }

    async fn bounded<T, F>(&self, op: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.config.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Connectivity(format!(
                "{} timed out after {:?}",
                op, self.config.call_timeout
            ))),
        }
    }

    async fn worksheet_names(&self) -> Result<Vec<String>> {
        let session = self.session().await?;
        self.bounded(
            "list_worksheets",
            session.list_worksheets(&self.config.document_id),
        )
        .await
    }
}

#[async_trait]
impl SheetRegistry for StoreSheetRegistry {
    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.worksheet_names().await?.iter().any(|n| n == name))
    }

    async fn get_template(&self) -> Result<TemplateSheet> {
        let session = self.session().await?;
        let headers = self
            .bounded(
                "read_header_row",
                session.read_header_row(&self.config.document_id, &self.config.template_sheet),
            )
            .await?;

        if headers.is_empty() {
            return Err(AppError::NotFound(format!(
                "template '{}' has no header row",
                self.config.template_sheet
            )));
        }
        Ok(TemplateSheet { headers })
    }

    async fn get_mapper_data(&self) -> Result<Vec<MapperEntry>> {
        if !self.exists(&self.config.mapper_sheet).await? {
            debug!(mapper = %self.config.mapper_sheet, "Record mapper sheet absent");
            return Ok(Vec::new());
        }

        let session = self.session().await?;
        let rows = self
            .bounded(
                "read_table",
                session.read_table(&self.config.document_id, &self.config.mapper_sheet),
            )
            .await?;

        // First row is the mapper's own header
        Ok(rows
            .iter()
            .skip(1)
            .filter_map(|row| MapperEntry::from_row(row))
            .collect())
    }

    async fn create(&self, quarter: QuarterId) -> Result<SheetDescriptor> {
        let name = quarter.sheet_name();
        let session = self.session().await?;

        let created = self
            .bounded(
                "create_from_template",
                session.create_from_template(
                    &self.config.document_id,
                    &name,
                    &self.config.template_sheet,
                ),
            )
            .await;

        match created {
            Ok(descriptor) => {
                info!(sheet = %descriptor.name, template = %self.config.template_sheet, "Created partition sheet");
                Ok(descriptor)
            }
            Err(e) if e.is_conflict() => {
                info!(sheet = %name, "Partition sheet already exists, treating create as success");
                Ok(SheetDescriptor::existing(name))
            }
            Err(e) => Err(e),
        }
    }

    async fn connection_status(&self) -> bool {
        let session = match self.session.read().await.clone() {
            Some(session) => session,
            None => return false,
        };

        match self.bounded("ping", session.ping()).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Partition store ping failed");
                false
            }
        }
    }

    async fn list_partitions(&self) -> Result<Vec<QuarterId>> {
        let mut partitions: Vec<QuarterId> = self
            .worksheet_names()
            .await?
            .iter()
            .filter_map(|name| name.parse().ok())
            .collect();
        partitions.sort();
        Ok(partitions)
    }
}
