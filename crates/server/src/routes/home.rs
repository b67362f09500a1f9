use axum::{Router, routing::get};
use db::models::user::NAME_MAX_LEN;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::{
    response::ApiResponse,
    validation::{Validate, ValidationErrors},
};

use crate::{DeploymentImpl, middleware::ValidatedJson};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Person {
    pub name: String,
}

impl Validate for Person {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check_length("/name", &self.name, 1, NAME_MAX_LEN);
        errors.into_result()
    }
}

pub async fn say_hello() -> &'static str {
    "Hello Axum"
}

pub async fn say_hi_person(ValidatedJson(person): ValidatedJson<Person>) -> ApiResponse<Person> {
    tracing::debug!(name = %person.name, "Greeting person");
    ApiResponse::success(person)
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new().route("/home", get(say_hello).post(say_hi_person))
}
