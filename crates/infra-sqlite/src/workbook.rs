// SQLite Workbook - PartitionStore implementation
//
// A workbook document is a set of named worksheets whose rows are JSON arrays
// of text cells. Worksheets are never deleted.

use crate::error::map_sqlx_error;
use crate::{create_pool, run_migrations};
use async_trait::async_trait;
use quartermaster_core::domain::SheetDescriptor;
use quartermaster_core::error::{AppError, Result};
use quartermaster_core::port::{PartitionStore, StoreSession};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Connector that opens (and caches) a pool per store URL
///
/// The pool is reused across reconnects so an in-memory workbook survives a
/// dropped session.
#[derive(Default)]
pub struct SqliteWorkbookStore {
    pool: Mutex<Option<(String, SqlitePool)>>,
}

impl SqliteWorkbookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PartitionStore for SqliteWorkbookStore {
    async fn connect(&self, credentials: &str) -> Result<Arc<dyn StoreSession>> {
        let url = credentials.trim();
        if url.is_empty() {
            return Err(AppError::Config("store url is empty".to_string()));
        }

        let mut slot = self.pool.lock().await;
        if let Some((cached_url, pool)) = slot.as_ref() {
            if cached_url == url && !pool.is_closed() {
                debug!("Reusing workbook pool");
                let session: Arc<dyn StoreSession> = Arc::new(SqliteWorkbookSession::new(pool.clone()));
                return Ok(session);
            }
        }

        let pool = create_pool(url).await?;
        run_migrations(&pool).await?;
        info!("Opened SQLite workbook");

        *slot = Some((url.to_string(), pool.clone()));
        let session: Arc<dyn StoreSession> = Arc::new(SqliteWorkbookSession::new(pool));
        Ok(session)
    }
}

/// Session over a migrated workbook pool
pub struct SqliteWorkbookSession {
    pool: SqlitePool,
}

impl SqliteWorkbookSession {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn worksheet_exists(&self, document_id: &str, sheet_name: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM worksheets WHERE document_id = ? AND name = ?",
        )
        .bind(document_id)
        .bind(sheet_name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(count > 0)
    }

    async fn require_worksheet(&self, document_id: &str, sheet_name: &str) -> Result<()> {
        if self.worksheet_exists(document_id, sheet_name).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("worksheet '{}'", sheet_name)))
        }
    }
}

fn decode_row(cells: &str) -> Result<Vec<String>> {
    Ok(serde_json::from_str(cells)?)
}

/// Insert the worksheet row; false if it already existed
async fn insert_worksheet(
    tx: &mut Transaction<'_, Sqlite>,
    document_id: &str,
    sheet_name: &str,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO worksheets (document_id, name, created_at)
        VALUES (?, ?, ?)
        ON CONFLICT (document_id, name) DO NOTHING
        "#,
    )
    .bind(document_id)
    .bind(sheet_name)
    .bind(chrono::Utc::now().timestamp_millis())
    .execute(&mut **tx)
    .await
    .map_err(map_sqlx_error)?;

    Ok(result.rows_affected() > 0)
}

#[async_trait]
impl StoreSession for SqliteWorkbookSession {
    async fn list_worksheets(&self, document_id: &str) -> Result<Vec<String>> {
        sqlx::query_scalar("SELECT name FROM worksheets WHERE document_id = ? ORDER BY name")
            .bind(document_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn read_header_row(&self, document_id: &str, sheet_name: &str) -> Result<Vec<String>> {
        self.require_worksheet(document_id, sheet_name).await?;

        let cells: Option<String> = sqlx::query_scalar(
            r#"
            SELECT cells FROM worksheet_rows
            WHERE document_id = ? AND sheet_name = ?
            ORDER BY row_index
            LIMIT 1
            "#,
        )
        .bind(document_id)
        .bind(sheet_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match cells {
            Some(cells) => decode_row(&cells),
            None => Ok(Vec::new()),
        }
    }

    async fn read_table(&self, document_id: &str, sheet_name: &str) -> Result<Vec<Vec<String>>> {
        self.require_worksheet(document_id, sheet_name).await?;

        let rows: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT cells FROM worksheet_rows
            WHERE document_id = ? AND sheet_name = ?
            ORDER BY row_index
            "#,
        )
        .bind(document_id)
        .bind(sheet_name)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(|cells| decode_row(cells)).collect()
    }

    async fn create_from_template(
        &self,
        document_id: &str,
        new_name: &str,
        template_name: &str,
    ) -> Result<SheetDescriptor> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // Write first so concurrent creators queue on the write lock
        if !insert_worksheet(&mut tx, document_id, new_name).await? {
            return Err(AppError::Conflict(format!("worksheet '{}' already exists", new_name)));
        }

        let header: Option<String> = sqlx::query_scalar(
            r#"
            SELECT cells FROM worksheet_rows
            WHERE document_id = ? AND sheet_name = ?
            ORDER BY row_index
            LIMIT 1
            "#,
        )
        .bind(document_id)
        .bind(template_name)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        // Dropping the transaction rolls back the worksheet insert
        let header = header.ok_or_else(|| {
            AppError::NotFound(format!("template '{}' (or its header row)", template_name))
        })?;

        sqlx::query(
            "INSERT INTO worksheet_rows (document_id, sheet_name, row_index, cells) VALUES (?, ?, 0, ?)",
        )
        .bind(document_id)
        .bind(new_name)
        .bind(&header)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(SheetDescriptor::existing(new_name))
    }

    async fn append_rows(
        &self,
        document_id: &str,
        sheet_name: &str,
        rows: &[Vec<String>],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        insert_worksheet(&mut tx, document_id, sheet_name).await?;

        let last_index: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(row_index), -1) FROM worksheet_rows WHERE document_id = ? AND sheet_name = ?",
        )
        .bind(document_id)
        .bind(sheet_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        for (offset, row) in rows.iter().enumerate() {
            sqlx::query(
                "INSERT INTO worksheet_rows (document_id, sheet_name, row_index, cells) VALUES (?, ?, ?, ?)",
            )
            .bind(document_id)
            .bind(sheet_name)
            .bind(last_index + 1 + offset as i64)
            .bind(serde_json::to_string(row)?)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    const DOC: &str = "ledger";

    async fn session() -> Arc<dyn StoreSession> {
        SqliteWorkbookStore::new().connect("sqlite::memory:").await.unwrap()
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_empty_workbook() {
        let session = session().await;
        assert!(session.list_worksheets(DOC).await.unwrap().is_empty());
        assert_ok!(session.ping().await);
    }

    #[tokio::test]
    async fn test_append_then_read_preserves_order() {
        let session = session().await;
        session
            .append_rows(DOC, "Master Template", &[row(&["Date", "Vendor", "Amount"])])
            .await
            .unwrap();
        session
            .append_rows(DOC, "Master Template", &[row(&["2025-01-02", "Acme", "10"])])
            .await
            .unwrap();

        let table = session.read_table(DOC, "Master Template").await.unwrap();
        assert_eq!(table, vec![row(&["Date", "Vendor", "Amount"]), row(&["2025-01-02", "Acme", "10"])]);
        assert_eq!(
            session.read_header_row(DOC, "Master Template").await.unwrap(),
            row(&["Date", "Vendor", "Amount"])
        );
    }

    #[tokio::test]
    async fn test_create_from_template_copies_header_only() {
        let session = session().await;
        session
            .append_rows(
                DOC,
                "Master Template",
                &[row(&["Date", "Amount"]), row(&["2025-01-02", "10"])],
            )
            .await
            .unwrap();

        let descriptor = session
            .create_from_template(DOC, "Q4-2025", "Master Template")
            .await
            .unwrap();
        assert_eq!(descriptor, SheetDescriptor::existing("Q4-2025"));
        assert_eq!(
            session.read_table(DOC, "Q4-2025").await.unwrap(),
            vec![row(&["Date", "Amount"])]
        );
    }

    #[tokio::test]
    async fn test_create_existing_is_conflict_and_untouched() {
        let session = session().await;
        session.append_rows(DOC, "Master Template", &[row(&["Date"])]).await.unwrap();
        session.append_rows(DOC, "Q4-2025", &[row(&["Old"])]).await.unwrap();

        let err = session
            .create_from_template(DOC, "Q4-2025", "Master Template")
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(session.read_table(DOC, "Q4-2025").await.unwrap(), vec![row(&["Old"])]);
    }

    #[tokio::test]
    async fn test_create_without_template_leaves_nothing() {
        let session = session().await;
        let err = session
            .create_from_template(DOC, "Q1-2026", "Master Template")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(session.list_worksheets(DOC).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_worksheet_is_not_found() {
        let session = session().await;
        assert!(session.read_table(DOC, "Nope").await.unwrap_err().is_not_found());
        assert!(session.read_header_row(DOC, "Nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_documents_are_isolated() {
        let session = session().await;
        session.append_rows("a", "Sheet", &[row(&["x"])]).await.unwrap();
        assert!(session.list_worksheets("b").await.unwrap().is_empty());
        assert_eq!(session.list_worksheets("a").await.unwrap(), vec!["Sheet"]);
    }

    #[tokio::test]
    async fn test_reconnect_reuses_pool() {
        let store = SqliteWorkbookStore::new();
        let first = store.connect("sqlite::memory:").await.unwrap();
        first.append_rows(DOC, "Master Template", &[row(&["Date"])]).await.unwrap();

        let second = store.connect("sqlite::memory:").await.unwrap();
        assert_eq!(second.list_worksheets(DOC).await.unwrap(), vec!["Master Template"]);
    }

    #[tokio::test]
    async fn test_empty_credentials_rejected() {
        let err = SqliteWorkbookStore::new().connect("  ").await.err().unwrap();
        assert!(matches!(err, AppError::Config(_)));
    }
}
