/// API integration tests
///
/// The first group runs against a lazily connected pool and covers every
/// path that is decided before the database is queried. The scenario tests
/// at the bottom need a PostgreSQL instance at `DATABASE_URL` and are
/// ignored by default:
///
/// ```bash
/// cargo test -p taskboard-api --test api_test -- --ignored
/// ```

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use common::{lazy_app, send, session_cookie, TestContext};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

fn multipart_upload(file_name: &str, content_type: &str, bytes: &[u8]) -> (String, Vec<u8>) {
    let boundary = "taskboard-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"profilePic\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={boundary}"), body)
}

// ---------------------------------------------------------------------------
// Session guard
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_protected_routes_require_session() {
    let app = lazy_app();

    for (method, uri) in [
        ("GET", "/api/task"),
        ("GET", "/api/board"),
        ("GET", "/api/board/invitations"),
        ("GET", "/api/notifications"),
        ("GET", "/api/notifications/unread-count"),
        ("GET", "/api/auth/check"),
        ("POST", "/api/auth/logout"),
        ("DELETE", "/api/auth/delete-account"),
    ] {
        let res = send(&app, method, uri, None, None).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(res.message(), "User not authenticated!");
    }
}

#[tokio::test]
async fn test_invalid_token_rejected() {
    let app = lazy_app();

    let res = send(&app, "GET", "/api/task", Some("JwtToken=not-a-token"), None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.message(), "Invalid Token");
}

#[tokio::test]
async fn test_check_reports_session_user() {
    let app = lazy_app();
    let user_id = Uuid::new_v4();

    let res = send(&app, "GET", "/api/auth/check", Some(&session_cookie(user_id)), None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["authenticated"], true);
    assert_eq!(res.body["userId"], user_id.to_string());
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = lazy_app();

    let res = send(
        &app,
        "POST",
        "/api/auth/logout",
        Some(&session_cookie(Uuid::new_v4())),
        None,
    )
    .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.message(), "Logout successful!");

    let set_cookie = res
        .headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(set_cookie.starts_with("JwtToken=;"));
    assert!(set_cookie.contains("Max-Age=0"));
}

// ---------------------------------------------------------------------------
// Auth input validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_login_with_existing_session_not_acceptable() {
    let app = lazy_app();

    let res = send(
        &app,
        "POST",
        "/api/auth/login",
        Some(&session_cookie(Uuid::new_v4())),
        Some(json!({ "email": "a@example.com", "password": "secret" })),
    )
    .await;

    assert_eq!(res.status, StatusCode::NOT_ACCEPTABLE);
    assert_eq!(res.message(), "User already logged in!");
}

#[tokio::test]
async fn test_signup_missing_fields() {
    let app = lazy_app();

    let res = send(&app, "POST", "/api/auth/signup", None, Some(json!({}))).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "All fields are required!");

    let res = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({ "name": "Ada", "email": "", "password": "secret" })),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "All fields are required!");
}

#[tokio::test]
async fn test_signup_short_password() {
    let app = lazy_app();

    let res = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({ "name": "Ada", "email": "ada@example.com", "password": "abc" })),
    )
    .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Password must be at least 4 characters!");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = lazy_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/signup")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_system_info_is_public() {
    let app = lazy_app();

    let res = send(&app, "GET", "/api/auth/systeminfo", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    for field in ["totalRAM", "freeRAM", "usedRAM"] {
        assert!(res.body[field].as_str().unwrap().ends_with(" GB"), "{}", field);
    }
}

#[tokio::test]
async fn test_profile_pic_rejects_unsupported_type() {
    let app = lazy_app();
    let (content_type, body) = multipart_upload("notes.txt", "text/plain", b"hello");

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/profilepic")
                .header(header::COOKIE, session_cookie(Uuid::new_v4()))
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_profile_pic_requires_file() {
    let app = lazy_app();
    let content_type = "multipart/form-data; boundary=taskboard-test-boundary";
    let body = "--taskboard-test-boundary--\r\n";

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/profilepic")
                .header(header::COOKIE, session_cookie(Uuid::new_v4()))
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Task, board and notification input validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_task_requires_name() {
    let app = lazy_app();
    let cookie = session_cookie(Uuid::new_v4());

    for body in [json!({}), json!({ "taskName": "   " })] {
        let res = send(&app, "POST", "/api/task", Some(&cookie), Some(body)).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.message(), "Task name is required!");
    }
}

#[tokio::test]
async fn test_invalid_status_value() {
    let app = lazy_app();
    let uri = format!("/api/task/{}/status", Uuid::new_v4());

    let res = send(
        &app,
        "PATCH",
        &uri,
        Some(&session_cookie(Uuid::new_v4())),
        Some(json!({ "status": "Archived" })),
    )
    .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Invalid status value!");
}

#[tokio::test]
async fn test_empty_comment_rejected() {
    let app = lazy_app();
    let uri = format!("/api/task/{}/comments", Uuid::new_v4());

    let res = send(
        &app,
        "POST",
        &uri,
        Some(&session_cookie(Uuid::new_v4())),
        Some(json!({ "content": "  " })),
    )
    .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Comment content is required");
}

#[tokio::test]
async fn test_create_board_requires_name() {
    let app = lazy_app();

    let res = send(
        &app,
        "POST",
        "/api/board",
        Some(&session_cookie(Uuid::new_v4())),
        Some(json!({ "description": "no name" })),
    )
    .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Board name is required");
}

#[tokio::test]
async fn test_invalid_ids_rejected() {
    let app = lazy_app();
    let cookie = session_cookie(Uuid::new_v4());

    for (method, uri) in [
        ("GET", "/api/task/not-an-id"),
        ("DELETE", "/api/task/42"),
        ("GET", "/api/board/xyz"),
        ("POST", "/api/board/invitations/abc/accept"),
        ("PUT", "/api/notifications/abc/read"),
    ] {
        let res = send(&app, method, uri, Some(&cookie), None).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "{} {}", method, uri);
        assert_eq!(res.message(), "Invalid ID!");
    }
}

#[tokio::test]
async fn test_unknown_api_path() {
    let app = lazy_app();

    let res = send(&app, "GET", "/api/does-not-exist", None, None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.message(), "API endpoint not found");

    let res = send(&app, "GET", "/api/auth/nope", None, None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_security_headers_present() {
    let app = lazy_app();

    let res = send(&app, "GET", "/api/auth/systeminfo", None, None).await;
    assert_eq!(res.headers.get("x-content-type-options").unwrap(), "nosniff");
    assert!(res.headers.get("content-security-policy").is_some());
}

#[tokio::test]
async fn test_cors_preflight_allows_credentials() {
    let app = lazy_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/task")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:5173"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );
}

// ---------------------------------------------------------------------------
// Scenarios against a real database
// ---------------------------------------------------------------------------

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_signup_login_and_duplicate_email() {
    let ctx = TestContext::new().await.unwrap();
    let (user_id, cookie) = ctx.signup("Ada").await;
    let email = ctx.email_of(&cookie).await;

    let res = send(
        &ctx.app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({ "name": "Other", "email": email, "password": "hunter22" })),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "This email is already used!");

    let res = send(
        &ctx.app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": "wrong-pass" })),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Invalid password!");

    let res = send(
        &ctx.app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": "hunter22" })),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["id"], user_id.to_string());
    assert!(res.session_cookie().is_some());

    let res = send(
        &ctx.app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "nobody@example.com", "password": "hunter22" })),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Invalid email, please signup!");
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_board_invitation_flow() {
    let ctx = TestContext::new().await.unwrap();
    let (owner_id, owner) = ctx.signup("Owner").await;
    let (guest_id, guest) = ctx.signup("Guest").await;
    let guest_email = ctx.email_of(&guest).await;

    let res = send(
        &ctx.app,
        "POST",
        "/api/board",
        Some(&owner),
        Some(json!({ "name": "Roadmap" })),
    )
    .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["owner"]["_id"], owner_id.to_string());
    assert_eq!(res.body["members"][0]["role"], "owner");
    let board_id = res.body["_id"].as_str().unwrap().to_string();

    // Private board is hidden from outsiders
    let res = send(&ctx.app, "GET", &format!("/api/board/{}", board_id), Some(&guest), None).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let invite_uri = format!("/api/board/{}/invite", board_id);
    let res = send(
        &ctx.app,
        "POST",
        &invite_uri,
        Some(&owner),
        Some(json!({ "email": guest_email, "role": "admin" })),
    )
    .await;
    assert_eq!(res.status, StatusCode::CREATED);

    let res = send(
        &ctx.app,
        "POST",
        &invite_uri,
        Some(&owner),
        Some(json!({ "email": guest_email })),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Invitation already sent");

    let res = send(&ctx.app, "GET", "/api/notifications/unread-count", Some(&guest), None).await;
    assert_eq!(res.body["count"], 1);

    let res = send(&ctx.app, "GET", "/api/board/invitations", Some(&guest), None).await;
    assert_eq!(res.status, StatusCode::OK);
    let invitation_id = res.body[0]["_id"].as_str().unwrap().to_string();
    assert_eq!(res.body[0]["board"]["name"], "Roadmap");
    assert_eq!(res.body[0]["invitedBy"]["_id"], owner_id.to_string());

    // Only the invitee may answer
    let accept_uri = format!("/api/board/invitations/{}/accept", invitation_id);
    let res = send(&ctx.app, "POST", &accept_uri, Some(&owner), None).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = send(&ctx.app, "POST", &accept_uri, Some(&guest), None).await;
    assert_eq!(res.status, StatusCode::OK);

    let res = send(&ctx.app, "POST", &accept_uri, Some(&guest), None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = send(&ctx.app, "GET", &format!("/api/board/{}", board_id), Some(&guest), None).await;
    assert_eq!(res.status, StatusCode::OK);
    let members = res.body["members"].as_array().unwrap();
    assert!(members
        .iter()
        .any(|m| m["user"]["_id"] == guest_id.to_string() && m["role"] == "admin"));

    let res = send(&ctx.app, "GET", "/api/notifications", Some(&owner), None).await;
    assert_eq!(res.body["notifications"][0]["type"], "board_member_joined");
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_task_lifecycle_with_assignee() {
    let ctx = TestContext::new().await.unwrap();
    let (_, owner) = ctx.signup("Owner").await;
    let (helper_id, helper) = ctx.signup("Helper").await;
    let (_, stranger) = ctx.signup("Stranger").await;

    let res = send(
        &ctx.app,
        "POST",
        "/api/task",
        Some(&owner),
        Some(json!({ "taskName": "Write release notes", "dueDate": "2030-01-15" })),
    )
    .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["task"]["taskStatus"], "Pending");
    assert_eq!(res.body["task"]["category"], "General");
    let task_id = res.body["task"]["_id"].as_str().unwrap().to_string();
    let task_uri = format!("/api/task/{}", task_id);

    let res = send(&ctx.app, "GET", &task_uri, Some(&stranger), None).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = send(
        &ctx.app,
        "PATCH",
        &format!("{}/assign", task_uri),
        Some(&owner),
        Some(json!({ "userIds": [helper_id, helper_id] })),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["assignedTo"].as_array().unwrap().len(), 1);

    let res = send(&ctx.app, "GET", "/api/notifications?unreadOnly=true", Some(&helper), None).await;
    assert_eq!(res.body["pagination"]["total"], 1);
    assert_eq!(res.body["notifications"][0]["type"], "task_assigned");
    let notification_id = res.body["notifications"][0]["_id"].as_str().unwrap().to_string();

    // Assignee moves the status along; owner hears about it
    let status_uri = format!("{}/status", task_uri);
    let res = send(&ctx.app, "PATCH", &status_uri, Some(&helper), None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["taskStatus"], "In Progress");

    let res = send(
        &ctx.app,
        "PATCH",
        &status_uri,
        Some(&helper),
        Some(json!({ "status": "Completed" })),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["taskStatus"], "Completed");

    let res = send(&ctx.app, "GET", "/api/notifications", Some(&owner), None).await;
    assert_eq!(res.body["notifications"][0]["type"], "task_status_changed");
    assert_eq!(res.body["notifications"][0]["data"]["newValue"], "Completed");

    // Editing stays with the owner; outsiders cannot delete
    let res = send(
        &ctx.app,
        "PUT",
        &task_uri,
        Some(&helper),
        Some(json!({ "taskName": "Hijacked" })),
    )
    .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = send(&ctx.app, "DELETE", &task_uri, Some(&stranger), None).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = send(
        &ctx.app,
        "POST",
        &format!("{}/comments", task_uri),
        Some(&helper),
        Some(json!({ "content": "Done, please review" })),
    )
    .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["content"], "Done, please review");

    let res = send(&ctx.app, "GET", &format!("{}/comments", task_uri), Some(&owner), None).await;
    assert_eq!(res.body.as_array().unwrap().len(), 1);

    let res = send(
        &ctx.app,
        "PUT",
        &format!("/api/notifications/{}/read", notification_id),
        Some(&helper),
        None,
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);

    let res = send(
        &ctx.app,
        "PUT",
        &format!("/api/notifications/{}/read", notification_id),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    // Assignees share delete with the owner
    let res = send(&ctx.app, "DELETE", &task_uri, Some(&helper), None).await;
    assert_eq!(res.status, StatusCode::OK);

    let res = send(&ctx.app, "GET", &task_uri, Some(&owner), None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_profile_pic_and_account_deletion() {
    let ctx = TestContext::new().await.unwrap();
    let (_, cookie) = ctx.signup("Pic").await;

    let res = send(&ctx.app, "DELETE", "/api/auth/profilepic", Some(&cookie), None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let (content_type, body) = multipart_upload("me.png", "image/png", &[0x89, b'P', b'N', b'G']);
    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/profilepic")
                .header(header::COOKIE, &cookie)
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(ctx.images.uploads.lock().unwrap().len(), 1);

    let res = send(&ctx.app, "GET", "/api/auth/getuser", Some(&cookie), None).await;
    let public_id = res.body["profilePicPublicId"].as_str().unwrap().to_string();
    assert!(public_id.starts_with("auth-system/"));

    let res = send(&ctx.app, "DELETE", "/api/auth/profilepic", Some(&cookie), None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(*ctx.images.deletes.lock().unwrap(), vec![public_id.clone()]);

    let res = send(&ctx.app, "DELETE", "/api/auth/profilepic", Some(&cookie), None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "No profile picture to delete!");

    let res = send(&ctx.app, "DELETE", "/api/auth/delete-account", Some(&cookie), None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(ctx.images.deletes.lock().unwrap().len(), 1);

    let res = send(&ctx.app, "GET", "/api/auth/getuser", Some(&cookie), None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}
