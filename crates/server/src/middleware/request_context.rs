use std::{
    net::{IpAddr, SocketAddr},
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request},
    http::Method,
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// Per-request facts gathered once by [`request_context_middleware`] and
/// handed to handlers as an `Extension`. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    /// Peer address, absent when the server was not started with connect info.
    pub ip: Option<IpAddr>,
    pub method: Method,
    pub path: String,
    pub started_at: Instant,
}

impl RequestContext {
    pub fn from_request(request: &Request) -> Self {
        let ip = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Self {
            request_id: Uuid::new_v4(),
            ip,
            method: request.method().clone(),
            path: request.uri().path().to_string(),
            started_at: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

pub async fn request_context_middleware(mut request: Request, next: Next) -> Response {
    let context = RequestContext::from_request(&request);
    let span = tracing::debug_span!(
        "request",
        request_id = %context.request_id,
        method = %context.method,
        path = %context.path,
    );
    request.extensions_mut().insert(context.clone());

    let response = next.run(request).instrument(span.clone()).await;
    span.in_scope(|| {
        tracing::debug!(
            status = response.status().as_u16(),
            elapsed_ms = context.elapsed().as_millis() as u64,
            "Request handled"
        );
    });
    response
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http};

    use super::*;

    #[test]
    fn reads_peer_address_when_available() {
        let mut request = http::Request::builder()
            .method(Method::POST)
            .uri("/user?x=1")
            .body(Body::empty())
            .unwrap();
        let addr: SocketAddr = "10.0.0.7:5555".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));

        let context = RequestContext::from_request(&request);
        assert_eq!(context.ip, Some(addr.ip()));
        assert_eq!(context.method, Method::POST);
        assert_eq!(context.path, "/user");
    }

    #[test]
    fn peer_address_is_optional() {
        let request = http::Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(RequestContext::from_request(&request).ip, None);
    }
}
