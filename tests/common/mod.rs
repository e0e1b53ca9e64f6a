#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use ayora::{
    auth::hash_password,
    users::repo_types::{NewUser, Role},
    build_app, AppState,
};

pub const PASSWORD: &str = "secret123";

pub fn app() -> Router {
    build_app(AppState::fake())
}

/// Router plus the state behind it, for tests that reach into the stores.
pub fn app_with_state() -> (Router, AppState) {
    let state = AppState::fake();
    (build_app(state.clone()), state)
}

/// Admins cannot self-register, so they are inserted straight into the store.
pub async fn seed_admin(state: &AppState, email: &str) {
    state
        .users
        .create(NewUser {
            name: "Admin".into(),
            email: email.into(),
            password_hash: hash_password(PASSWORD).unwrap(),
            role: Role::Admin,
        })
        .await
        .unwrap();
}

pub async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/api/users/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await
}

pub async fn patch(app: &Router, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::PATCH, uri, Some(token), Some(body)).await
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

pub async fn get(app: &Router, uri: &str, token: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post(app: &Router, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put(app: &Router, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn delete(app: &Router, uri: &str, token: &str) -> (StatusCode, Value) {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Registers a user and returns `(user_id, access_token)`.
pub async fn register(app: &Router, email: &str, role: &str) -> (String, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/users/register",
        None,
        Some(json!({
            "name": "Test User",
            "email": email,
            "password": PASSWORD,
            "role": role,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    (
        body["data"]["user"]["id"].as_str().unwrap().to_string(),
        body["data"]["token"].as_str().unwrap().to_string(),
    )
}

pub async fn create_meal(app: &Router, token: &str, body: Value) -> Value {
    let (status, res) = post(app, "/api/meals", token, body).await;
    assert_eq!(status, StatusCode::CREATED, "create meal failed: {res}");
    res["data"].clone()
}

/// Hand-built multipart body with one file part and optional text parts.
pub fn multipart(
    file_field: &str,
    file_name: &str,
    content_type: &str,
    bytes: &[u8],
    texts: &[(&str, &str)],
) -> (String, Vec<u8>) {
    let boundary = "ayora-test-boundary";
    let mut body = Vec::new();
    for (name, value) in texts {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{file_field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

pub async fn upload(
    app: &Router,
    uri: &str,
    token: &str,
    form: (String, Vec<u8>),
) -> (StatusCode, Value) {
    let (content_type, body) = form;
    let req = Request::post(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}
