mod common;

use axum::{
    Router,
    http::{Method, StatusCode},
};
use common::{send, test_app};
use serde_json::{Value, json};
use uuid::Uuid;

async fn create(app: &Router, name: &str, email: &str) -> Value {
    let response = send(
        app,
        Method::POST,
        "/user",
        Some(json!({ "name": name, "email": email })),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    response.json()
}

#[tokio::test]
async fn create_user_returns_the_row_with_a_message() {
    let app = test_app().await;
    let body = create(&app, "John", "john@x.com").await;

    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "User created successfully");
    let user = &body["data"];
    assert!(Uuid::parse_str(user["id"].as_str().unwrap()).is_ok());
    assert_eq!(user["name"], "John");
    assert_eq!(user["email"], "john@x.com");
    assert!(user["createdAt"].is_string());
    assert!(user["updatedAt"].is_string());
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn duplicate_email_is_a_validation_failure() {
    let app = test_app().await;
    create(&app, "John", "john@x.com").await;

    let response = send(
        &app,
        Method::POST,
        "/user",
        Some(json!({ "name": "Other John", "email": "john@x.com" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json(),
        json!({
            "success": false,
            "error": { "code": "VALIDATION_ERROR", "message": "Email already exists" }
        })
    );
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let app = test_app().await;
    let missing = format!("/user/{}", Uuid::new_v4());

    for (method, body) in [
        (Method::GET, None),
        (Method::PUT, Some(json!({ "name": "Nobody" }))),
        (Method::DELETE, None),
    ] {
        let response = send(&app, method.clone(), &missing, body).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{method}");
        assert_eq!(
            response.json(),
            json!({
                "success": false,
                "error": { "code": "NOT_FOUND", "message": "User not found" }
            })
        );
    }
}

#[tokio::test]
async fn malformed_ids_are_not_found() {
    let app = test_app().await;
    let response = send(&app, Method::GET, "/user/not-a-uuid", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn get_user_returns_the_row_without_a_message() {
    let app = test_app().await;
    let created = create(&app, "John", "john@x.com").await;
    let id = created["data"]["id"].as_str().unwrap();

    let response = send(&app, Method::GET, &format!("/user/{id}"), None).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["data"], created["data"]);
    assert!(body.get("message").is_none());
}

#[tokio::test]
async fn update_applies_only_present_fields() {
    let app = test_app().await;
    let created = create(&app, "John", "john@x.com").await;
    let id = created["data"]["id"].as_str().unwrap();

    let response = send(
        &app,
        Method::PUT,
        &format!("/user/{id}"),
        Some(json!({ "name": "Johnny" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["message"], "User updated successfully");
    assert_eq!(body["data"]["name"], "Johnny");
    assert_eq!(body["data"]["email"], "john@x.com");
    assert_eq!(body["data"]["createdAt"], created["data"]["createdAt"]);
}

#[tokio::test]
async fn update_to_a_taken_email_is_a_validation_failure() {
    let app = test_app().await;
    create(&app, "John", "john@x.com").await;
    let jane = create(&app, "Jane", "jane@x.com").await;
    let id = jane["data"]["id"].as_str().unwrap();

    let response = send(
        &app,
        Method::PUT,
        &format!("/user/{id}"),
        Some(json!({ "email": "john@x.com" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn delete_removes_the_user() {
    let app = test_app().await;
    let created = create(&app, "John", "john@x.com").await;
    let id = created["data"]["id"].as_str().unwrap();

    let response = send(&app, Method::DELETE, &format!("/user/{id}"), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({
            "success": true,
            "data": { "id": id },
            "message": "User deleted successfully"
        })
    );

    let again = send(&app, Method::GET, &format!("/user/{id}"), None).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_returns_users_in_creation_order() {
    let app = test_app().await;
    let empty = send(&app, Method::GET, "/user", None).await;
    assert_eq!(empty.json(), json!({ "success": true, "data": [] }));

    create(&app, "John", "john@x.com").await;
    create(&app, "Jane", "jane@x.com").await;

    let body = send(&app, Method::GET, "/user", None).await.json();
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|user| user["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["John", "Jane"]);
}

#[tokio::test]
async fn trailing_slash_serves_the_collection() {
    let app = test_app().await;
    let created = send(
        &app,
        Method::POST,
        "/user/",
        Some(json!({ "name": "John", "email": "john@x.com" })),
    )
    .await;
    assert_eq!(created.status, StatusCode::OK);

    let listed = send(&app, Method::GET, "/user/", None).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.json()["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_create_bodies_are_rejected_before_the_handler() {
    let app = test_app().await;

    let missing = send(&app, Method::POST, "/user", Some(json!({ "name": "John" }))).await;
    assert_eq!(missing.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(missing.json()["type"], "validation");

    let too_long = send(
        &app,
        Method::POST,
        "/user",
        Some(json!({ "name": "x".repeat(256), "email": "john@x.com" })),
    )
    .await;
    assert_eq!(too_long.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(too_long.json()["errors"][0]["path"], "/name");

    let listed = send(&app, Method::GET, "/user", None).await.json();
    assert_eq!(listed["data"], json!([]));
}

#[tokio::test]
async fn test_email_requires_email_configuration() {
    let app = test_app().await;
    let response = send(
        &app,
        Method::POST,
        "/user/email",
        Some(json!({ "email": "john@x.com" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json(),
        json!({
            "success": false,
            "error": { "code": "BAD_REQUEST", "message": "Email delivery is not configured" }
        })
    );
}

#[tokio::test]
async fn test_email_is_queued_when_configured() {
    use deployment::Deployment;
    use server::{DeploymentImpl, routes};
    use services::services::{config::AppConfig, email::EmailConfig};

    let mut config = AppConfig::for_tests();
    config.email = Some(EmailConfig {
        api_key: "re_test".to_string(),
        api_url: "http://127.0.0.1:9".to_string(),
        from: "kit@example.com".to_string(),
    });
    let app = routes::router(DeploymentImpl::new(config).await.unwrap());

    let response = send(
        &app,
        Method::POST,
        "/user/email",
        Some(json!({ "email": "john@x.com" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({
            "success": true,
            "data": { "to": "john@x.com", "queued": true },
            "message": "Test email queued"
        })
    );
}
