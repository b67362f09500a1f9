use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use utils::validation::{Validate, ValidationErrors, ValidationReport};

/// `Json<T>` that also runs [`Validate`]. Bodies that fail to parse or fail
/// validation are rejected with a 422 [`ValidationReport`] before the handler
/// runs.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ValidationReport;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                ValidationReport::body(ValidationErrors::single("", rejection.body_text()))
            })?;
        value.validate().map_err(ValidationReport::body)?;
        Ok(Self(value))
    }
}
