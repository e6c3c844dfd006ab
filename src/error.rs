use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the payroll engine and the leave ledger.
#[derive(Debug, Error)]
pub enum PayrollError {
    #[error("{0}")]
    Validation(String),

    #[error("component '{name}' is registered as {expected}, not {claimed}")]
    CatalogMismatch {
        name: String,
        expected: String,
        claimed: String,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Retriable store failure: deadlock, lock wait timeout, lost connection.
    #[error("temporary database failure: {0}")]
    Transient(#[source] sqlx::Error),

    /// Invariant violation. The unit of work is rolled back.
    #[error("invariant violated: {0}")]
    Fatal(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

// MySQL server error numbers the gateway classifies.
const ER_DUP_ENTRY: &str = "1062";
const ER_LOCK_WAIT_TIMEOUT: &str = "1205";
const ER_LOCK_DEADLOCK: &str = "1213";
const ER_NO_REFERENCED_ROW: &str = "1452";

impl From<sqlx::Error> for PayrollError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                PayrollError::Transient(err)
            }
            sqlx::Error::Database(db_err) => {
                let number = db_err
                    .try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
                    .map(|e| e.number().to_string());

                match number.as_deref() {
                    Some(ER_LOCK_DEADLOCK) | Some(ER_LOCK_WAIT_TIMEOUT) => {
                        PayrollError::Transient(err)
                    }
                    Some(ER_DUP_ENTRY) => PayrollError::Conflict("Record already exists".into()),
                    Some(ER_NO_REFERENCED_ROW) => {
                        PayrollError::NotFound("Employee not found".into())
                    }
                    _ => PayrollError::Database(err),
                }
            }
            _ => PayrollError::Database(err),
        }
    }
}

impl PayrollError {
    pub fn kind(&self) -> &'static str {
        match self {
            PayrollError::Validation(_) => "validation_failure",
            PayrollError::CatalogMismatch { .. } => "catalog_mismatch",
            PayrollError::NotFound(_) => "not_found",
            PayrollError::Conflict(_) => "conflict",
            PayrollError::Transient(_) => "transient",
            PayrollError::Fatal(_) | PayrollError::Database(_) => "internal",
        }
    }

    pub fn is_retriable(&self) -> bool {
        matches!(self, PayrollError::Transient(_))
    }
}

impl ResponseError for PayrollError {
    fn status_code(&self) -> StatusCode {
        match self {
            PayrollError::Validation(_) | PayrollError::CatalogMismatch { .. } => {
                StatusCode::BAD_REQUEST
            }
            PayrollError::NotFound(_) => StatusCode::NOT_FOUND,
            PayrollError::Conflict(_) => StatusCode::CONFLICT,
            PayrollError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            PayrollError::Fatal(_) | PayrollError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        // internals stay in the log, not in the response
        let message = match self {
            PayrollError::Fatal(_) | PayrollError::Database(_) => {
                "Something went wrong, Contact with system admin".to_string()
            }
            PayrollError::Transient(_) => "Temporary database failure, retry later".to_string(),
            other => other.to_string(),
        };

        let mut builder = HttpResponse::build(self.status_code());
        if self.is_retriable() {
            builder.insert_header(("Retry-After", "1"));
        }

        builder.json(json!({
            "error": self.kind(),
            "message": message,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let err = PayrollError::Validation("amount must not be negative".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), "validation_failure");
    }

    #[test]
    fn catalog_mismatch_names_both_types() {
        let err = PayrollError::CatalogMismatch {
            name: "PF".into(),
            expected: "deductions".into(),
            claimed: "earnings".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "component 'PF' is registered as deductions, not earnings"
        );
    }

    #[test]
    fn pool_timeout_is_transient() {
        let err = PayrollError::from(sqlx::Error::PoolTimedOut);
        assert!(err.is_retriable());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        let resp = err.error_response();
        assert_eq!(resp.headers().get("Retry-After").unwrap(), "1");
    }

    #[test]
    fn row_not_found_is_not_retriable() {
        let err = PayrollError::from(sqlx::Error::RowNotFound);
        assert!(!err.is_retriable());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn conflict_and_not_found_statuses() {
        assert_eq!(
            PayrollError::Conflict("dup".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            PayrollError::NotFound("missing".into()).status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
