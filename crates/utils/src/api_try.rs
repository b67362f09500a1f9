//! Guarded execution of a single handler operation.
//!
//! [`api_try`] is the one place where a failed operation is turned into a
//! failure envelope. Classification of domain errors (unique violations,
//! missing rows, ...) is supplied by the caller through
//! [`TryOptions::on_error`]; anything left unclassified becomes
//! `INTERNAL_ERROR`.

use std::{
    any::Any,
    fmt::Display,
    future::Future,
    panic::{self, AssertUnwindSafe},
};

use futures::FutureExt;

use crate::response::{ApiResponse, ErrorCode};

type OnError<'a, T, E> = Box<dyn FnOnce(&E) -> Option<ApiResponse<T>> + Send + 'a>;

pub struct TryOptions<'a, T, E> {
    on_error: Option<OnError<'a, T, E>>,
    error_message: Option<String>,
}

impl<T, E> Default for TryOptions<'_, T, E> {
    fn default() -> Self {
        Self {
            on_error: None,
            error_message: None,
        }
    }
}

impl<'a, T, E> TryOptions<'a, T, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifier consulted when the operation fails. Returning `None` falls
    /// back to the default `INTERNAL_ERROR` failure.
    pub fn on_error(
        mut self,
        classify: impl FnOnce(&E) -> Option<ApiResponse<T>> + Send + 'a,
    ) -> Self {
        self.on_error = Some(Box::new(classify));
        self
    }

    /// Message used for unclassified failures instead of the error's own text.
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// Awaits `operation` and always produces an envelope.
///
/// A bare value is wrapped with [`ApiResponse::success`]; an envelope is
/// passed through unchanged. Errors go through the caller's classifier and
/// then the `INTERNAL_ERROR` fallback. Panics inside the operation or the
/// classifier are contained the same way, so nothing escapes to the transport
/// layer.
pub async fn api_try<T, R, E, Fut>(operation: Fut, options: TryOptions<'_, T, E>) -> ApiResponse<T>
where
    Fut: Future<Output = Result<R, E>>,
    R: Into<ApiResponse<T>>,
    E: Display,
{
    let TryOptions {
        on_error,
        error_message,
    } = options;

    match AssertUnwindSafe(operation).catch_unwind().await {
        Ok(Ok(outcome)) => outcome.into(),
        Ok(Err(error)) => {
            let classified = on_error.and_then(|classify| {
                panic::catch_unwind(AssertUnwindSafe(|| classify(&error))).unwrap_or_else(
                    |payload| {
                        let reason = panic_message(payload.as_ref());
                        tracing::error!(reason = %reason, "Error classifier panicked inside api_try");
                        None
                    },
                )
            });
            if let Some(failure) = classified {
                return failure;
            }
            ApiResponse::failure(
                ErrorCode::InternalError,
                error_message.unwrap_or_else(|| error.to_string()),
            )
        }
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            tracing::error!(reason = %reason, "Operation panicked inside api_try");
            ApiResponse::failure(ErrorCode::InternalError, error_message.unwrap_or(reason))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "operation panicked".to_string()
    }
}
