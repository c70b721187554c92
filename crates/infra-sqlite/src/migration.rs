// Migration Runner

use crate::error::map_sqlx_error;
use quartermaster_core::error::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Run database migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let table_exists: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
    )
    .fetch_one(pool)
    .await
    .map_err(map_sqlx_error)?;

    let current_version: i64 = if table_exists > 0 {
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await
            .map_err(map_sqlx_error)?
            .unwrap_or(0)
    } else {
        0
    };

    if current_version < 1 {
        info!("Applying migration 001: Workbook schema");
        apply_migration(pool, include_str!("../migrations/001_workbook.sql")).await?;
    }

    info!(schema_version = 1, "Workbook schema up to date");
    Ok(())
}

/// Apply a single migration SQL file
async fn apply_migration(pool: &SqlitePool, sql: &str) -> Result<()> {
    let mut tx = pool.begin().await.map_err(map_sqlx_error)?;

    for statement in split_statements(sql) {
        sqlx::query(&statement)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
    }

    tx.commit().await.map_err(map_sqlx_error)?;
    Ok(())
}

/// Split a migration file into statements
///
/// `--` comments are removed before splitting on `;`. Migrations must not put
/// `--` or `;` inside string literals.
fn split_statements(sql: &str) -> Vec<String> {
    let uncommented = sql
        .lines()
        .map(|line| line.find("--").map_or(line, |at| &line[..at]))
        .collect::<Vec<_>>()
        .join("\n");

    uncommented
        .split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_pool;

    #[tokio::test]
    async fn test_run_migrations_is_repeatable() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM worksheets")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);

        let versions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_version")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn test_split_ignores_semicolons_in_comments() {
        let sql = "-- header; with a semicolon\nCREATE TABLE a (x INTEGER); -- trailing; note\n\n-- only a comment\nINSERT INTO a VALUES (1);\n";
        assert_eq!(
            split_statements(sql),
            vec!["CREATE TABLE a (x INTEGER)", "INSERT INTO a VALUES (1)"]
        );
    }

    #[test]
    fn test_split_workbook_migration() {
        let statements = split_statements(include_str!("../migrations/001_workbook.sql"));
        assert_eq!(statements.len(), 4);
        assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS schema_version"));
        assert!(statements[3].starts_with("INSERT OR IGNORE INTO schema_version"));
    }

    #[tokio::test]
    async fn test_fresh_database_migrates() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(tables, vec!["schema_version", "worksheet_rows", "worksheets"]);
    }

    #[tokio::test]
    async fn test_version_row_tolerates_concurrent_migrator() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();

        // A second replica that read version 0 before the first committed
        apply_migration(&pool, include_str!("../migrations/001_workbook.sql"))
            .await
            .unwrap();

        let versions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_version")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(versions, 1);
    }
}
