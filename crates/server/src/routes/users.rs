use axum::{
    Extension, Router,
    extract::{Path, State},
    routing::{get, post},
};
use db::models::user::{CreateUser, EMAIL_MAX_LEN, UpdateUser, User};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::{
    email::{EmailError, SendEmailPayload},
    telemetry::RouteLabels,
};
use ts_rs::TS;
use utils::{
    api_try::{TryOptions, api_try},
    response::{ApiResponse, ErrorCode},
    validation::{Validate, ValidationErrors},
};
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::{RequestContext, ValidatedJson},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeletedUser {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct TestMailRequest {
    pub email: String,
}

impl Validate for TestMailRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check_length("/email", &self.email, 1, EMAIL_MAX_LEN);
        errors.into_result()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QueuedEmail {
    pub to: String,
    pub queued: bool,
}

fn count(deployment: &DeploymentImpl, endpoint: &'static str, method: &'static str) {
    deployment
        .user_counter()
        .add(&RouteLabels::new(endpoint, method));
}

/// Ids that are not UUIDs cannot name a row, so they resolve to "not found".
fn parse_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id).ok()
}

fn user_not_found<T>(ctx: &RequestContext, id: &str, action: &str) -> ApiResponse<T> {
    tracing::warn!(user_id = %id, path = %ctx.path, "User not found for {}", action);
    ApiResponse::failure(ErrorCode::NotFound, "User not found")
}

/// Logs the failure and maps duplicate emails to `VALIDATION_ERROR`. Other
/// errors fall through to the `INTERNAL_ERROR` default.
fn classify_user_error<'a, T>(
    ctx: &'a RequestContext,
    action: &'static str,
) -> impl FnOnce(&ApiError) -> Option<ApiResponse<T>> + Send + 'a {
    move |err| {
        tracing::error!(
            error = %err,
            method = %ctx.method,
            path = %ctx.path,
            ip = ?ctx.ip,
            "Failed to {} user",
            action
        );
        err.is_unique_violation()
            .then(|| ApiResponse::failure(ErrorCode::ValidationError, "Email already exists"))
    }
}

pub async fn list_users(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
) -> ApiResponse<Vec<User>> {
    count(&deployment, "/", "GET");
    api_try(
        async {
            let users = User::find_all(&deployment.db().pool).await?;
            tracing::info!(count = users.len(), "Users listed");
            Ok::<_, ApiError>(users)
        },
        TryOptions::new()
            .error_message("Failed to list users")
            .on_error(classify_user_error(&ctx, "list")),
    )
    .await
}

pub async fn get_user(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResponse<User> {
    count(&deployment, "/{id}", "GET");
    api_try(
        async {
            let user = match parse_id(&id) {
                Some(user_id) => User::find_by_id(&deployment.db().pool, user_id).await?,
                None => None,
            };
            let Some(user) = user else {
                return Ok(user_not_found(&ctx, &id, "get"));
            };
            tracing::info!(user_id = %user.id, "User retrieved");
            Ok::<_, ApiError>(ApiResponse::success(user))
        },
        TryOptions::new()
            .error_message("Failed to get user")
            .on_error(classify_user_error(&ctx, "get")),
    )
    .await
}

pub async fn create_user(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    ValidatedJson(payload): ValidatedJson<CreateUser>,
) -> ApiResponse<User> {
    count(&deployment, "/", "POST");
    api_try(
        async {
            let user = User::insert_one(&deployment.db().pool, &payload).await?;
            tracing::info!(user_id = %user.id, "User created");
            Ok::<_, ApiError>(ApiResponse::success_with_message(
                user,
                "User created successfully",
            ))
        },
        TryOptions::new()
            .error_message("Failed to create user")
            .on_error(classify_user_error(&ctx, "create")),
    )
    .await
}

pub async fn update_user(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateUser>,
) -> ApiResponse<User> {
    count(&deployment, "/{id}", "PUT");
    api_try(
        async {
            let updated = match parse_id(&id) {
                Some(user_id) => {
                    User::update_by_id(&deployment.db().pool, user_id, &payload).await?
                }
                None => None,
            };
            let Some(user) = updated else {
                return Ok(user_not_found(&ctx, &id, "update"));
            };
            tracing::info!(user_id = %user.id, "User updated");
            Ok::<_, ApiError>(ApiResponse::success_with_message(
                user,
                "User updated successfully",
            ))
        },
        TryOptions::new()
            .error_message("Failed to update user")
            .on_error(classify_user_error(&ctx, "update")),
    )
    .await
}

pub async fn delete_user(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResponse<DeletedUser> {
    count(&deployment, "/{id}", "DELETE");
    api_try(
        async {
            let rows_affected = match parse_id(&id) {
                Some(user_id) => User::delete_by_id(&deployment.db().pool, user_id).await?,
                None => 0,
            };
            if rows_affected == 0 {
                return Ok(user_not_found(&ctx, &id, "delete"));
            }
            tracing::info!(user_id = %id, "User deleted");
            Ok::<_, ApiError>(ApiResponse::success_with_message(
                DeletedUser { id: id.clone() },
                "User deleted successfully",
            ))
        },
        TryOptions::new()
            .error_message("Failed to delete user")
            .on_error(classify_user_error(&ctx, "delete")),
    )
    .await
}

pub async fn send_test_email(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    ValidatedJson(request): ValidatedJson<TestMailRequest>,
) -> ApiResponse<QueuedEmail> {
    count(&deployment, "/email", "POST");
    api_try(
        async {
            let app_name = &deployment.config().app_name;
            let payload = SendEmailPayload {
                to: request.email.clone(),
                subject: format!("Test email from {app_name}"),
                body: format!("This is a test email sent by {app_name}."),
                html: format!("<p>This is a test email sent by <strong>{app_name}</strong>.</p>"),
                user_id: None,
            };
            // Detached; the task logs its own outcome.
            let _task = deployment.spawn_email_task(payload)?;
            tracing::info!(to = %request.email, "Test email queued");
            Ok::<_, ApiError>(ApiResponse::success_with_message(
                QueuedEmail {
                    to: request.email.clone(),
                    queued: true,
                },
                "Test email queued",
            ))
        },
        TryOptions::new()
            .error_message("Failed to queue test email")
            .on_error(|err: &ApiError| match err {
                ApiError::Email(EmailError::NotConfigured) => {
                    tracing::warn!(path = %ctx.path, "Test email requested but email is not configured");
                    Some(ApiResponse::failure(
                        ErrorCode::BadRequest,
                        "Email delivery is not configured",
                    ))
                }
                _ => {
                    tracing::error!(error = %err, path = %ctx.path, "Failed to queue test email");
                    None
                }
            }),
    )
    .await
}

pub fn router() -> Router<DeploymentImpl> {
    let user_router = Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/email", post(send_test_email))
        .route(
            "/{id}",
            get(get_user).put(update_user).delete(delete_user),
        );

    // The nested "/" only matches "/user"; "/user/" is served explicitly.
    Router::new()
        .route("/user/", get(list_users).post(create_user))
        .nest("/user", user_router)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_ids_never_parse() {
        assert!(parse_id("not-a-uuid").is_none());
        assert!(parse_id("").is_none());
        assert!(parse_id(&Uuid::new_v4().to_string()).is_some());
    }

    #[test]
    fn test_mail_request_requires_an_address() {
        let empty = TestMailRequest {
            email: String::new(),
        };
        assert!(empty.validate().is_err());
        let ok = TestMailRequest {
            email: "john@x.com".to_string(),
        };
        assert!(ok.validate().is_ok());
    }
}
