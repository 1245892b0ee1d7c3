//! Error taxonomy shared by the catalog, the ranker and the search index.

use thiserror::Error;

/// Errors returned by catalog operations.
///
/// `NotFound`, `Validation`, `Conflict` and `Forbidden` are meant to be
/// translated into a user-facing response by the caller. `ExternalService`
/// is produced by the search index only.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Search index error: {0}")]
    ExternalService(String),

    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl CatalogError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CatalogError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CatalogError::Validation(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound { .. })
    }
}

impl From<rusqlite::Error> for CatalogError {
    fn from(e: rusqlite::Error) -> Self {
        CatalogError::Store(e.into())
    }
}
