mod common;

use axum::http::{Method, StatusCode};
use common::{data, decimal, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn removal_mode_flow_adjusts_and_removes_units() {
    let app = TestApp::new().await;
    let a = app.seed_menu_item("Sisig", dec!(150)).await;
    let cart = app.open_cart().await;
    for _ in 0..3 {
        app.post(
            &format!("/api/v1/carts/{cart}/items"),
            json!({ "menu_item_id": a }),
        )
        .await;
    }

    let view = data(
        app.request_authenticated(
            Method::POST,
            &format!("/api/v1/carts/{cart}/items/{a}/remove-mode"),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(view["removal"]["pending"], json!(1));

    let view = data(
        app.post(
            &format!("/api/v1/carts/{cart}/removal/step"),
            json!({ "delta": 5 }),
        )
        .await,
    )
    .await;
    // clamped to the line quantity
    assert_eq!(view["removal"]["pending"], json!(3));

    let view = data(
        app.post(
            &format!("/api/v1/carts/{cart}/removal/step"),
            json!({ "delta": -1 }),
        )
        .await,
    )
    .await;
    assert_eq!(view["removal"]["pending"], json!(2));

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/carts/{cart}/items/{a}/remove"),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let result = data(response).await;
    assert_eq!(result["removed"], json!(2));
    assert_eq!(result["cart"]["lines"][0]["quantity"], json!(1));
    assert_eq!(decimal(&result["cart"]["total"]), dec!(150));
    assert!(result["cart"]["removal"].is_null());
}

#[tokio::test]
async fn explicit_removal_quantity_can_clear_a_line() {
    let app = TestApp::new().await;
    let a = app.seed_menu_item("Halo-halo", dec!(95)).await;
    let cart = app.open_cart().await;
    app.post(
        &format!("/api/v1/carts/{cart}/items"),
        json!({ "menu_item_id": a }),
    )
    .await;

    let result = data(
        app.post(
            &format!("/api/v1/carts/{cart}/items/{a}/remove"),
            json!({ "quantity": 10 }),
        )
        .await,
    )
    .await;
    assert_eq!(result["removed"], json!(1));
    assert!(result["cart"]["lines"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn step_without_removal_mode_is_rejected() {
    let app = TestApp::new().await;
    let cart = app.open_cart().await;
    let response = app
        .post(
            &format!("/api/v1/carts/{cart}/removal/step"),
            json!({ "delta": 1 }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deactivated_menu_items_cannot_be_rung_up() {
    let app = TestApp::new().await;
    let a = app.seed_menu_item("Seasonal Soup", dec!(80)).await;
    let response = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/menu-items/{a}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let cart = app.open_cart().await;
    let response = app
        .post(
            &format!("/api/v1/carts/{cart}/items"),
            json!({ "menu_item_id": a }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_and_discarded_carts_are_not_found() {
    let app = TestApp::new().await;
    let response = app.get(&format!("/api/v1/carts/{}", Uuid::new_v4())).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let cart = app.open_cart().await;
    let response = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/carts/{cart}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = app.get(&format!("/api/v1/carts/{cart}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.get("/api/v1/carts/not-a-uuid").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn selecting_an_unknown_payment_method_is_not_found() {
    let app = TestApp::new().await;
    let cart = app.open_cart().await;
    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/carts/{cart}/payment-method"),
            Some(json!({ "payment_method_id": Uuid::new_v4() })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
