use sqlx::Error as SqlxError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(SqlxError),

    /// Row not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Unique constraint violation, e.g. a short code that is already taken
    #[error("Conflict error: {0}")]
    Conflict(String),

    /// Invalid input data
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl RepositoryError {
    /// Whether the write lost a race on a unique column and may be retried with new data
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<SqlxError> for RepositoryError {
    fn from(err: SqlxError) -> Self {
        match err {
            SqlxError::RowNotFound => Self::NotFound("Resource not found".to_string()),
            SqlxError::Database(db_err) => {
                // PostgreSQL error codes for common constraints
                if let Some(code) = db_err.code() {
                    match code.as_ref() {
                        // Unique violation
                        "23505" => {
                            return Self::Conflict(
                                db_err
                                    .constraint()
                                    .map(|c| format!("Unique constraint '{}' violated", c))
                                    .unwrap_or_else(|| "Resource already exists".to_string()),
                            )
                        }
                        // Not-null or check constraint violation
                        "23502" | "23514" => {
                            return Self::InvalidData("Data violates constraints".to_string())
                        }
                        _ => {}
                    }
                }
                Self::Database(SqlxError::Database(db_err))
            }
            _ => Self::Database(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    use sqlx::error::{DatabaseError, ErrorKind};

    use super::*;

    /// A Postgres-style error carrying only a SQLSTATE and constraint name
    #[derive(Debug)]
    struct PgViolation {
        code: &'static str,
        constraint: Option<&'static str>,
    }

    impl fmt::Display for PgViolation {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "SQLSTATE {}", self.code)
        }
    }

    impl StdError for PgViolation {}

    impl DatabaseError for PgViolation {
        fn message(&self) -> &str {
            "constraint violated"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn constraint(&self) -> Option<&str> {
            self.constraint
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.code {
                "23505" => ErrorKind::UniqueViolation,
                "23502" => ErrorKind::NotNullViolation,
                "23514" => ErrorKind::CheckViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn pg_error(code: &'static str, constraint: Option<&'static str>) -> SqlxError {
        SqlxError::Database(Box::new(PgViolation { code, constraint }))
    }

    #[test]
    fn test_unique_violation_is_a_retryable_conflict() {
        let err = RepositoryError::from(pg_error("23505", Some("url_mappings_code_key")));
        assert!(err.is_conflict());
        assert!(err.to_string().contains("url_mappings_code_key"));

        let err = RepositoryError::from(pg_error("23505", None));
        assert!(err.is_conflict());
    }

    #[test]
    fn test_not_null_and_check_violations_are_invalid_data() {
        for code in ["23502", "23514"] {
            let err = RepositoryError::from(pg_error(code, None));
            assert!(matches!(err, RepositoryError::InvalidData(_)), "SQLSTATE {}", code);
            assert!(!err.is_conflict());
        }
    }

    #[test]
    fn test_other_sqlstates_stay_database_errors() {
        let err = RepositoryError::from(pg_error("42P01", None));
        assert!(matches!(err, RepositoryError::Database(_)));
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err = RepositoryError::from(SqlxError::RowNotFound);
        assert!(matches!(err, RepositoryError::NotFound(_)));
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_other_sqlx_errors_are_database_errors() {
        let err = RepositoryError::from(SqlxError::PoolTimedOut);
        assert!(matches!(err, RepositoryError::Database(_)));
        assert!(err.to_string().starts_with("Database error"));
    }

    #[test]
    fn test_conflict_is_retryable() {
        assert!(RepositoryError::Conflict("code".into()).is_conflict());
    }
}
