//! End-to-end API flows against PostgreSQL
//!
//! Run with: DATABASE_URL=postgresql://... cargo test -p tasqar-api --test api_flow_tests
//!
//! Without `DATABASE_URL` each test returns early.

mod common;

use axum::http::StatusCode;
use common::{db_app, register, request, send};
use futures::StreamExt;
use serde_json::json;
use std::time::Duration;
use tower::ServiceExt;

#[tokio::test]
async fn test_task_lifecycle_and_assignment_rules() {
    let Some((app, _pool)) = db_app().await else {
        return;
    };

    let (_alice_id, alice) = register(&app, "Alice").await;
    let (bob_id, bob) = register(&app, "Bob").await;

    let (status, task) = send(
        &app,
        request("POST", "/api/tasks", Some(&alice), Some(json!({ "title": "Write launch post" }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["status"], "TODO");
    assert_eq!(task["priority"], "MEDIUM");
    let task_uri = format!("/api/tasks/{}", task["id"].as_str().unwrap());

    // Strangers can't see it
    let (status, _) = send(&app, request("GET", &task_uri, Some(&bob), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Not connected yet, so no assignment
    let (status, _) = send(
        &app,
        request("PATCH", &task_uri, Some(&alice), Some(json!({ "assignee_id": bob_id }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Connect
    let (status, connection) = send(
        &app,
        request("POST", "/api/connections", Some(&alice), Some(json!({ "user_id": bob_id }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(connection["status"], "PENDING");

    let (_, incoming) = send(&app, request("GET", "/api/notifications", Some(&bob), None)).await;
    assert_eq!(incoming[0]["type"], "CONNECTION_REQUEST");

    let accept_uri = format!("/api/connections/{}/accept", connection["id"].as_str().unwrap());
    let (status, _) = send(&app, request("POST", &accept_uri, Some(&alice), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, accepted) = send(&app, request("POST", &accept_uri, Some(&bob), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["status"], "ACCEPTED");

    // Assign and notify
    let (status, assigned) = send(
        &app,
        request("PATCH", &task_uri, Some(&alice), Some(json!({ "assignee_id": bob_id }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(assigned["assignee_id"], bob_id.to_string());

    let (_, unread) = send(
        &app,
        request("GET", "/api/notifications?unread_only=true", Some(&bob), None),
    )
    .await;
    assert!(unread
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["type"] == "TASK_ASSIGNED"));

    // The assignee may move the card but not edit it
    let (status, _) = send(
        &app,
        request("PATCH", &task_uri, Some(&bob), Some(json!({ "title": "Mine now" }))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, moved) = send(
        &app,
        request("PATCH", &task_uri, Some(&bob), Some(json!({ "status": "IN_PROGRESS" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["status"], "IN_PROGRESS");

    let (status, _) = send(&app, request("DELETE", &task_uri, Some(&bob), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, request("DELETE", &task_uri, Some(&alice), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_reorder_is_all_or_nothing() {
    let Some((app, _pool)) = db_app().await else {
        return;
    };

    let (_, alice) = register(&app, "Alice").await;
    let (_, mallory) = register(&app, "Mallory").await;

    let mut ids = Vec::new();
    for title in ["one", "two"] {
        let (_, task) = send(
            &app,
            request("POST", "/api/tasks", Some(&alice), Some(json!({ "title": title }))),
        )
        .await;
        ids.push(task["id"].as_str().unwrap().to_string());
    }

    let (_, foreign) = send(
        &app,
        request("POST", "/api/tasks", Some(&mallory), Some(json!({ "title": "not yours" }))),
    )
    .await;

    let (status, _) = send(
        &app,
        request(
            "PUT",
            "/api/tasks/reorder",
            Some(&alice),
            Some(json!({ "updates": [
                { "id": ids[1], "status": "DONE", "position": 0 },
                { "id": foreign["id"], "status": "DONE", "position": 1 },
            ]})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, unchanged) = send(&app, request("GET", &format!("/api/tasks/{}", ids[1]), Some(&alice), None)).await;
    assert_eq!(unchanged["status"], "TODO");

    let (status, body) = send(
        &app,
        request(
            "PUT",
            "/api/tasks/reorder",
            Some(&alice),
            Some(json!({ "updates": [
                { "id": ids[1], "status": "TODO", "position": 0 },
                { "id": ids[0], "status": "TODO", "position": 1 },
            ]})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 2);

    let (_, tasks) = send(&app, request("GET", "/api/tasks?status=TODO", Some(&alice), None)).await;
    let order: Vec<&str> = tasks
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["id"].as_str())
        .collect();
    assert_eq!(order, vec![ids[1].as_str(), ids[0].as_str()]);
}

#[tokio::test]
async fn test_projects_are_owner_only() {
    let Some((app, _pool)) = db_app().await else {
        return;
    };

    let (_, alice) = register(&app, "Alice").await;
    let (_, bob) = register(&app, "Bob").await;

    let (status, project) = send(
        &app,
        request("POST", "/api/projects", Some(&alice), Some(json!({ "title": "Launch", "status": "ACTIVE" }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let project_id = project["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        request("POST", "/api/tasks", Some(&alice), Some(json!({ "title": "Draft", "project_id": project_id }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let project_uri = format!("/api/projects/{project_id}");
    let (status, detail) = send(&app, request("GET", &project_uri, Some(&alice), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["tasks"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, request("GET", &project_uri, Some(&bob), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Bob can't file tasks under Alice's project either
    let (status, _) = send(
        &app,
        request("POST", "/api/tasks", Some(&bob), Some(json!({ "title": "Sneaky", "project_id": project_id }))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = send(&app, request("GET", "/api/projects", Some(&alice), None)).await;
    assert_eq!(list[0]["task_count"], 1);
}

#[tokio::test]
async fn test_sse_sends_current_list_immediately() {
    let Some((app, _pool)) = db_app().await else {
        return;
    };

    let (_, alice) = register(&app, "Alice").await;

    let response = app
        .oneshot(request(
            "GET",
            &format!("/api/notifications/sse?token={alice}"),
            None,
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );

    let mut body = response.into_body().into_data_stream();
    let first = tokio::time::timeout(Duration::from_secs(5), body.next())
        .await
        .expect("first frame within 5s")
        .expect("stream open")
        .expect("frame bytes");

    assert_eq!(first.as_ref(), b"data: []\n\n");
}

#[tokio::test]
async fn test_invitations() {
    let Some((app, _pool)) = db_app().await else {
        return;
    };

    let (_, alice) = register(&app, "Alice").await;

    let (status, me) = send(&app, request("GET", "/api/users/me", Some(&alice), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(me.get("password_hash").is_none());

    // Existing account: send a connection request instead
    let (status, _) = send(
        &app,
        request("POST", "/api/invitations", Some(&alice), Some(json!({ "email": me["email"] }))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, sent) = send(
        &app,
        request(
            "POST",
            "/api/invitations",
            Some(&alice),
            Some(json!({ "email": common::unique_email("friend") })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["email_sent"], true);
    assert!(sent.get("token_hash").is_none());

    let (_, pending) = send(&app, request("GET", "/api/invitations", Some(&alice), None)).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, request("GET", "/api/invitations/not-a-token", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
