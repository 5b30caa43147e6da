use database_adapter::db::DbError;
use market_data_adapter::MarketDataError;
use thiserror::Error;
use validator::ValidationErrors;

/// Errors surfaced by the tracker services. Storage errors are folded into
/// `Storage` so callers never see the adapter types.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{entity} {key} already exists")]
    AlreadyExists { entity: &'static str, key: String },
    #[error("{entity} {id} belongs to another user")]
    Unauthorized { entity: &'static str, id: String },
    #[error("Market data unavailable: {0}")]
    UpstreamUnavailable(#[from] MarketDataError),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Storage failure: {0}")]
    Storage(String),
}

impl TrackerError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        TrackerError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn unauthorized(entity: &'static str, id: impl ToString) -> Self {
        TrackerError::Unauthorized {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        TrackerError::Validation(message.into())
    }
}

impl From<DbError> for TrackerError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(id) => TrackerError::NotFound {
                entity: "Record",
                id,
            },
            DbError::UniqueViolation(fields) => TrackerError::AlreadyExists {
                entity: "Record",
                key: fields.join(", "),
            },
            other => TrackerError::Storage(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for TrackerError {
    fn from(e: ValidationErrors) -> Self {
        TrackerError::Validation(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
