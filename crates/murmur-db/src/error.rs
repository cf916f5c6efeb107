use murmur_error::AppError;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure reported by a store implementation
#[derive(Error, Debug)]
pub enum StoreError {
    /// A uniqueness precondition lost a race (or the record already exists)
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    /// A stored value could not be mapped back into a domain type
    #[error("Corrupt record: {0}")]
    Decode(String),

    /// Backend temporarily unreachable; the operation may be retried
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::UniqueViolation(
                    db_err
                        .constraint()
                        .unwrap_or("unique constraint")
                        .to_string(),
                )
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                StoreError::NotFound(
                    db_err
                        .constraint()
                        .unwrap_or("foreign key")
                        .to_string(),
                )
            }
            sqlx::Error::RowNotFound => StoreError::NotFound("row".to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(what) => AppError::Conflict(what),
            StoreError::NotFound(what) => AppError::NotFound(what),
            StoreError::Unavailable(msg) => AppError::TransientStore(msg),
            StoreError::Decode(msg) => AppError::Internal(msg),
            StoreError::Database(e) => AppError::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_transient() {
        let err: StoreError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, StoreError::Unavailable(_)));

        let app: AppError = err.into();
        assert!(app.is_retryable());
    }

    #[test]
    fn test_unique_violation_maps_to_conflict() {
        let app: AppError = StoreError::UniqueViolation("pair_key".into()).into();
        assert_eq!(app.error_code(), "CONFLICT");
    }
}
