mod common;

use axum::http::{Method, StatusCode};
use common::send;
use deployment::Deployment;
use serde_json::json;
use server::{DeploymentImpl, routes};
use services::services::config::AppConfig;
use uuid::Uuid;

#[tokio::test]
async fn exporter_counts_user_requests() {
    let mut config = AppConfig::for_tests();
    config.metrics.enabled = true;
    let deployment = DeploymentImpl::new(config).await.unwrap();
    let app = routes::router(deployment.clone());
    let exporter = routes::metrics::router(deployment.metrics().clone());

    send(&app, Method::GET, "/user", None).await;
    send(&app, Method::GET, "/user", None).await;
    send(
        &app,
        Method::POST,
        "/user",
        Some(json!({ "name": "John", "email": "john@x.com" })),
    )
    .await;

    let response = send(&exporter, Method::GET, "/metrics", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(
        response
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("text/plain"))
    );
    let text = response.text();
    assert!(text.contains(r#"user_requests_total{endpoint="/",method="GET"} 2"#));
    assert!(text.contains(r#"user_requests_total{endpoint="/",method="POST"} 1"#));
}

#[tokio::test]
async fn failed_requests_are_counted_once() {
    let mut config = AppConfig::for_tests();
    config.metrics.enabled = true;
    let deployment = DeploymentImpl::new(config).await.unwrap();
    let app = routes::router(deployment.clone());
    let exporter = routes::metrics::router(deployment.metrics().clone());

    let missing = send(&app, Method::GET, &format!("/user/{}", Uuid::new_v4()), None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    let unknown = send(&app, Method::DELETE, "/user/not-a-uuid", None).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let john = json!({ "name": "John", "email": "john@x.com" });
    send(&app, Method::POST, "/user", Some(john.clone())).await;
    let duplicate = send(&app, Method::POST, "/user", Some(john)).await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);

    let text = send(&exporter, Method::GET, "/metrics", None).await.text();
    assert!(text.contains(r#"user_requests_total{endpoint="/{id}",method="GET"} 1"#));
    assert!(text.contains(r#"user_requests_total{endpoint="/{id}",method="DELETE"} 1"#));
    assert!(text.contains(r#"user_requests_total{endpoint="/",method="POST"} 2"#));
}

#[tokio::test]
async fn exporter_reports_disabled_metrics() {
    let deployment = common::test_deployment().await;
    let exporter = routes::metrics::router(deployment.metrics().clone());

    let response = send(&exporter, Method::GET, "/metrics", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["error"]["code"], "NOT_FOUND");
}
