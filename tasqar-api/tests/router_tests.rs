//! Router tests that never reach the database
//!
//! Authentication, request validation and middleware all answer before a
//! handler touches the pool, so these run without PostgreSQL.

mod common;

use axum::http::StatusCode;
use common::{lazy_app, request, send, token};
use serde_json::json;
use std::{
    io,
    sync::{Arc, Mutex},
};
use tasqar_shared::auth::jwt::TokenType;
use tower::ServiceExt;
use tracing_subscriber::fmt::MakeWriter;
use uuid::Uuid;

/// Collects formatted log output in memory
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[tokio::test]
async fn test_protected_route_without_token_is_401() {
    let app = lazy_app();

    let (status, body) = send(&app, request("GET", "/api/tasks", None, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
    assert_eq!(body["message"], "Missing credentials");
}

#[tokio::test]
async fn test_garbage_token_is_401() {
    let app = lazy_app();

    let (status, body) = send(&app, request("GET", "/api/projects", Some("not.a.jwt"), None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let app = lazy_app();
    let refresh = token(Uuid::new_v4(), TokenType::Refresh);

    let (status, _) = send(&app, request("GET", "/api/users/me", Some(&refresh), None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sse_rejects_bad_query_token_before_streaming() {
    let app = lazy_app();

    let response = app
        .oneshot(request("GET", "/api/notifications/sse?token=bogus", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_ne!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("text/event-stream")
    );
}

#[tokio::test]
async fn test_register_validation_is_field_level_400() {
    let app = lazy_app();

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "email": "nope", "password": "short" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|d| d["field"].as_str())
        .collect();
    assert_eq!(fields, vec!["email", "password"]);
}

#[tokio::test]
async fn test_register_rejects_weak_password() {
    let app = lazy_app();

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "email": "ada@example.com", "password": "onlyletters" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "password");
    assert_eq!(
        body["details"][0]["message"],
        "Password must contain at least one digit"
    );
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let app = lazy_app();
    let access = token(Uuid::new_v4(), TokenType::Access);

    let response = app
        .oneshot(
            axum::http::Request::builder()
                .method("POST")
                .uri("/api/tasks")
                .header("authorization", format!("Bearer {access}"))
                .header("content-type", "application/json")
                .body(axum::body::Body::from("{\"title\":"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_task_validation_with_valid_token() {
    let app = lazy_app();
    let access = token(Uuid::new_v4(), TokenType::Access);

    let (status, body) = send(
        &app,
        request("POST", "/api/tasks", Some(&access), Some(json!({ "title": "" }))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "title");
}

#[tokio::test]
async fn test_unknown_enum_value_is_400() {
    let app = lazy_app();
    let access = token(Uuid::new_v4(), TokenType::Access);

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/tasks",
            Some(&access),
            Some(json!({ "title": "x", "priority": "URGENT" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_empty_reorder_is_400() {
    let app = lazy_app();
    let access = token(Uuid::new_v4(), TokenType::Access);

    let (status, body) = send(
        &app,
        request("PUT", "/api/tasks/reorder", Some(&access), Some(json!({ "updates": [] }))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "updates");
}

#[tokio::test]
async fn test_connection_request_needs_one_target() {
    let app = lazy_app();
    let access = token(Uuid::new_v4(), TokenType::Access);

    let (status, body) = send(
        &app,
        request("POST", "/api/connections", Some(&access), Some(json!({}))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Provide either email or user_id");
}

#[tokio::test]
async fn test_security_headers_on_error_responses() {
    let app = lazy_app();

    let response = app
        .oneshot(request("GET", "/api/tasks", None, None))
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.get("strict-transport-security").is_none());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = lazy_app();

    let (status, _) = send(&app, request("GET", "/api/nothing-here", None, None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_reports_degraded_without_database() {
    let app = lazy_app();

    let (status, body) = send(&app, request("GET", "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "disconnected");
}

#[tokio::test]
async fn test_request_logs_omit_query_token() {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let response = lazy_app()
        .oneshot(request(
            "GET",
            "/api/notifications/sse?token=SECRETJWTVALUE",
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let output = logs.contents();
    assert!(output.contains("/api/notifications/sse"), "no request logged: {output}");
    assert!(!output.contains("SECRETJWTVALUE"), "token leaked: {output}");
}
