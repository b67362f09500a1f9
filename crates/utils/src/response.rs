use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use ts_rs::TS;

/// Closed set of failure classifications a client can branch on.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TS,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    InternalError,
    BadRequest,
}

impl ErrorCode {
    /// HTTP status the transport layer uses when emitting a failure with this code.
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorCode::ValidationError | ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ApiErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub details: Option<Value>,
}

/// The envelope every JSON route returns.
///
/// Exactly one of `data` and `error` is populated, discriminated by `success`.
/// Fields are private so the only way to build one is through the
/// constructors below, which uphold that invariant and never emit `null` for
/// an absent `message` or `details`.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    error: Option<ApiErrorBody>,
}

impl<T> ApiResponse<T> {
    /// Creates a successful response, with `data` and no message.
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    /// Creates a successful response carrying a human readable message.
    /// An empty message is treated as absent.
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        let message = message.into();
        ApiResponse {
            success: true,
            data: Some(data),
            message: (!message.is_empty()).then_some(message),
            error: None,
        }
    }

    /// Creates a failure response with `code` and `message`, and no data.
    pub fn failure(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            message: None,
            error: Some(ApiErrorBody {
                code,
                message: message.into(),
                details: None,
            }),
        }
    }

    /// Creates a failure response with structured `details`. A JSON `null` is
    /// treated as absent; `0`, `false` and empty collections are kept.
    pub fn failure_with_details(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        let mut response = Self::failure(code, message);
        if let Some(error) = response.error.as_mut() {
            error.details = (!details.is_null()).then_some(details);
        }
        response
    }

    /// Creates a failure response from a textual error code.
    ///
    /// # Panics
    ///
    /// Panics if `code` is not an [`ErrorCode`]. Passing an unknown code is a
    /// bug in the caller, not a runtime condition.
    pub fn failure_from_str(code: &str, message: impl Into<String>) -> Self {
        let code = code
            .parse::<ErrorCode>()
            .unwrap_or_else(|_| panic!("`{code}` is not a recognised error code"));
        Self::failure(code, message)
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn error(&self) -> Option<&ApiErrorBody> {
        self.error.as_ref()
    }

    pub fn status_code(&self) -> StatusCode {
        self.error
            .as_ref()
            .map_or(StatusCode::OK, |error| error.code.status_code())
    }
}

impl<T> From<T> for ApiResponse<T> {
    fn from(data: T) -> Self {
        ApiResponse::success(data)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}
