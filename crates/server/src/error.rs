use services::services::email::EmailError;
use thiserror::Error;

/// Failures of a handler operation. `api_try` turns them into failure
/// envelopes: classifiers match on the variant, anything unmatched becomes
/// `INTERNAL_ERROR`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Email(#[from] EmailError),
}

impl ApiError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, ApiError::Database(err) if db::is_unique_violation(err))
    }
}
