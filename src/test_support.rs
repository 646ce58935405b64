//! Helpers for driving the router in handler tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::{app::build_app, state::AppState};

pub struct TestApp {
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self {
            router: build_app(AppState::fake()),
        }
    }
}

pub async fn call(
    app: &TestApp,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(v) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.router.clone().oneshot(req).await.unwrap()
}

pub async fn body_json(res: Response) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Signs up a user and returns its id.
pub async fn signup_user(app: &TestApp, username: &str, email: &str, password: &str) -> String {
    let res = call(
        app,
        "POST",
        "/api/v1/signup",
        None,
        Some(json!({ "username": username, "email": email, "password": password })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    body_json(res).await["id"].as_str().unwrap().to_string()
}

pub async fn login_token(app: &TestApp, email: &str, password: &str) -> String {
    let res = call(
        app,
        "POST",
        "/api/v1/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await["token"].as_str().unwrap().to_string()
}

/// Signs up and logs in; returns `(user_id, token)`.
pub async fn user_with_token(app: &TestApp, username: &str) -> (String, String) {
    let email = format!("{username}@example.com");
    let id = signup_user(app, username, &email, "password").await;
    let token = login_token(app, &email, "password").await;
    (id, token)
}

/// Creates a post and returns its id.
pub async fn create_post(app: &TestApp, token: &str, title: &str) -> String {
    let res = call(
        app,
        "POST",
        "/api/v1/posts",
        Some(token),
        Some(json!({ "title": title, "content": format!("body of {title}") })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    body_json(res).await["id"].as_str().unwrap().to_string()
}
