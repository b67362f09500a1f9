use axum::{Router, middleware::from_fn};
use tower_http::trace::TraceLayer;

use crate::{DeploymentImpl, middleware::request_context_middleware};

pub mod health;
pub mod home;
pub mod metrics;
pub mod users;

/// Application routes. The metrics exporter is served separately, see
/// [`metrics::router`].
pub fn router(deployment: DeploymentImpl) -> Router {
    Router::new()
        .merge(health::router())
        .merge(home::router())
        .merge(users::router())
        .layer(from_fn(request_context_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(deployment)
}
