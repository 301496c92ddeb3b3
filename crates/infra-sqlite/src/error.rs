// sqlx::Error -> AppError

use docpipe_core::error::AppError;

/// Convert sqlx::Error to AppError with structured information
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            if let Some(code) = db_err.code() {
                let code_str = code.as_ref();

                // SQLite error codes: https://www.sqlite.org/rescode.html
                match code_str {
                    "2067" | "1555" => {
                        // UNIQUE / PRIMARY KEY constraint failed
                        AppError::DuplicateId(db_err.message().to_string())
                    }
                    "5" => AppError::Store(format!(
                        "Database locked (SQLITE_BUSY): {}",
                        db_err.message()
                    )),
                    "13" => AppError::Store(format!("Database full: {}", db_err.message())),
                    _ => AppError::Store(format!(
                        "Database error [{}]: {}",
                        code_str,
                        db_err.message()
                    )),
                }
            } else {
                AppError::Store(format!("Database error: {}", db_err.message()))
            }
        }
        sqlx::Error::RowNotFound => AppError::Store("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => AppError::Store(format!("Column not found: {}", col)),
        // Connection, pool, protocol errors
        _ => AppError::Store(err.to_string()),
    }
}
