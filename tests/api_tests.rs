//! End-to-end tests for the HTTP surface.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::TestServer;
use serde_json::{Value, json};
use staged_uploads::models::FieldConfig;
use tower::ServiceExt;

async fn send(router: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body_json = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
    };

    (status, body_json)
}

async fn json_request(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };
    send(router, builder.body(body).unwrap()).await
}

async fn put_object(router: &axum::Router, key: &str, data: &'static [u8]) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("PUT")
        .uri(format!("/objects/{key}"))
        .body(Body::from(data))
        .unwrap();
    send(router, request).await
}

fn avatar_upload(uuid: &str, key: &str, name: &str) -> Value {
    json!({
        "avatar": { "uuid": uuid, "originalName": name },
        "avatarkey": key,
        "avatars3Key": key,
    })
}

async fn create_user(router: &axum::Router) -> String {
    let (status, body) = json_request(router, "POST", "/records/users", None).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn healthz_is_ok() {
    let server = TestServer::new().await;
    let (status, body) = json_request(&server.router, "GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn readyz_checks_database_and_storage() {
    let server = TestServer::new().await;
    let (status, _) = json_request(&server.router, "GET", "/readyz", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn staging_upload_requires_tmp_prefix() {
    let server = TestServer::new().await;

    let (status, body) = put_object(&server.router, "uploads/a.png", b"png").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);

    let (status, body) = put_object(&server.router, "tmp/2025/a.png", b"png").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["key"], "tmp/2025/a.png");
    assert_eq!(body["size"], 3);
    assert!(server.storage.exists("tmp/2025/a.png").await.unwrap());
}

#[tokio::test]
async fn saving_a_record_finalizes_the_upload() {
    let server = TestServer::new().await;
    put_object(&server.router, "tmp/a.png", b"0123456789").await;
    let id = create_user(&server.router).await;

    let (status, body) = json_request(
        &server.router,
        "PUT",
        &format!("/records/users/{id}"),
        Some(avatar_upload("u1", "tmp/a.png", "me.png")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["attributes"]["avatar"], "uploads/a.png");
    assert_eq!(body["attributes"]["avatar_name"], "me.png");
    assert_eq!(body["attributes"]["avatar_size"], 10);
    assert!(server.storage.exists("uploads/a.png").await.unwrap());

    let (_, fetched) =
        json_request(&server.router, "GET", &format!("/records/users/{id}"), None).await;
    assert_eq!(fetched["attributes"]["avatar"], "uploads/a.png");
}

#[tokio::test]
async fn saving_without_upload_leaves_attributes_alone() {
    let server = TestServer::new().await;
    put_object(&server.router, "tmp/a.png", b"png").await;
    let id = create_user(&server.router).await;
    let uri = format!("/records/users/{id}");

    json_request(
        &server.router,
        "PUT",
        &uri,
        Some(avatar_upload("u1", "tmp/a.png", "a.png")),
    )
    .await;
    let (status, body) =
        json_request(&server.router, "PUT", &uri, Some(json!({ "name": "x" }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["attributes"]["avatar"], "uploads/a.png");
}

#[tokio::test]
async fn replacing_an_upload_removes_the_old_file() {
    let server = TestServer::new().await;
    put_object(&server.router, "tmp/a.png", b"a").await;
    put_object(&server.router, "tmp/b.png", b"bb").await;
    let id = create_user(&server.router).await;
    let uri = format!("/records/users/{id}");

    json_request(
        &server.router,
        "PUT",
        &uri,
        Some(avatar_upload("u1", "tmp/a.png", "a.png")),
    )
    .await;
    let (status, body) = json_request(
        &server.router,
        "PUT",
        &uri,
        Some(avatar_upload("u2", "tmp/b.png", "b.png")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["attributes"]["avatar"], "uploads/b.png");
    assert_eq!(body["attributes"]["avatar_size"], 2);
    assert!(!server.storage.exists("uploads/a.png").await.unwrap());
    assert!(server.storage.exists("uploads/b.png").await.unwrap());
}

#[tokio::test]
async fn missing_staged_file_is_unprocessable() {
    let server = TestServer::new().await;
    let id = create_user(&server.router).await;

    let (status, body) = json_request(
        &server.router,
        "PUT",
        &format!("/records/users/{id}"),
        Some(avatar_upload("u1", "tmp/ghost.png", "ghost.png")),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], 422);
}

#[tokio::test]
async fn detach_clears_the_field_and_deletes_the_file() {
    let server = TestServer::new().await;
    put_object(&server.router, "tmp/a.png", b"a").await;
    let id = create_user(&server.router).await;
    let uri = format!("/records/users/{id}");
    json_request(
        &server.router,
        "PUT",
        &uri,
        Some(avatar_upload("u1", "tmp/a.png", "a.png")),
    )
    .await;

    let (status, body) =
        json_request(&server.router, "DELETE", &format!("{uri}/files/avatar"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["attributes"]["avatar"], Value::Null);
    assert_eq!(body["attributes"]["avatar_size"], Value::Null);
    assert!(!server.storage.exists("uploads/a.png").await.unwrap());

    let (status, _) =
        json_request(&server.router, "DELETE", &format!("{uri}/files/banner"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_record_removes_its_files() {
    let server = TestServer::new().await;
    put_object(&server.router, "tmp/a.png", b"a").await;
    let id = create_user(&server.router).await;
    let uri = format!("/records/users/{id}");
    json_request(
        &server.router,
        "PUT",
        &uri,
        Some(avatar_upload("u1", "tmp/a.png", "a.png")),
    )
    .await;

    let (status, _) = json_request(&server.router, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!server.storage.exists("uploads/a.png").await.unwrap());

    let (status, _) = json_request(&server.router, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failed_copy_is_rejected_and_keeps_the_stored_file() {
    let field = FieldConfig::new("avatar").path("uploads/").prunable();
    let server = TestServer::with_fields(vec![field]).await;
    put_object(&server.router, "tmp/a.png", b"a").await;
    let id = create_user(&server.router).await;
    let uri = format!("/records/users/{id}");
    json_request(
        &server.router,
        "PUT",
        &uri,
        Some(avatar_upload("u1", "tmp/a.png", "a.png")),
    )
    .await;

    let (status, body) = json_request(
        &server.router,
        "PUT",
        &uri,
        Some(avatar_upload("u2", "tmp/ghost.png", "ghost.png")),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], 422);
    assert!(server.storage.exists("uploads/a.png").await.unwrap());

    let (_, fetched) = json_request(&server.router, "GET", &uri, None).await;
    assert_eq!(fetched["attributes"]["avatar"], "uploads/a.png");
}
