mod common;

use axum::http::{Method, StatusCode};
use common::{json_body, TestApp};

#[tokio::test]
async fn api_requires_a_session_token() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/menu-items", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(Method::GET, "/api/v1/menu-items", None, Some("garbage"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Invalid session token");

    let response = app.get("/api/v1/menu-items").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn session_cookie_is_accepted() {
    let app = TestApp::new().await;
    let cookie = format!(
        "theme=dark; {}={}",
        app.state.auth.cookie_name(),
        app.token()
    );

    let request = axum::http::Request::builder()
        .method(Method::GET)
        .uri("/api/v1/payment-methods")
        .header("cookie", cookie)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_probes_are_public() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.request(Method::GET, "/health/ready", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["database"]["status"], "up");
}

#[tokio::test]
async fn responses_echo_the_request_id() {
    let app = TestApp::new().await;
    let request = axum::http::Request::builder()
        .method(Method::GET)
        .uri("/health")
        .header("x-request-id", "till-7")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.headers()["x-request-id"], "till-7");
}
