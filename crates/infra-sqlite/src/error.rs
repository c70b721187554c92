// sqlx::Error -> AppError
//
// Orphan rules prevent `From<sqlx::Error> for AppError` here, so every query
// maps through this helper.

use quartermaster_core::error::AppError;

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            // SQLite result codes: https://www.sqlite.org/rescode.html
            match db_err.code().as_deref() {
                Some("2067") | Some("1555") => {
                    AppError::Conflict(format!("Unique constraint violation: {}", db_err.message()))
                }
                Some("787") | Some("3850") => AppError::Database(format!(
                    "Foreign key constraint violation: {}",
                    db_err.message()
                )),
                Some("5") => AppError::Database(format!(
                    "Database locked (SQLITE_BUSY): {}",
                    db_err.message()
                )),
                Some(code) => {
                    AppError::Database(format!("Database error [{}]: {}", code, db_err.message()))
                }
                None => AppError::Database(format!("Database error: {}", db_err.message())),
            }
        }
        sqlx::Error::Configuration(e) => AppError::Config(e.to_string()),
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            AppError::Connectivity(err.to_string())
        }
        sqlx::Error::RowNotFound => AppError::NotFound("row".to_string()),
        _ => AppError::Database(err.to_string()),
    }
}
