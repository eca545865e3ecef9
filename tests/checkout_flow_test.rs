mod common;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use chrono::Utc;
use common::{data, decimal, json_body, TestApp};
use restaurant_pos::{
    entities::{sale, sale_item},
    errors::ServiceError,
    services::checkout::{NewSale, NewSaleItem, SaleStore},
};
use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;
use tokio::sync::Notify;
use uuid::Uuid;

#[tokio::test]
async fn checkout_records_one_sale_with_its_items() {
    let app = TestApp::new().await;
    let cash = app.seed_payment_method("Cash").await;
    let a = app.seed_menu_item("A", dec!(50)).await;
    let b = app.seed_menu_item("B", dec!(30)).await;
    let cart = app.open_cart().await;

    for item in [a, a, b] {
        let response = app
            .post(
                &format!("/api/v1/carts/{cart}/items"),
                json!({ "menu_item_id": item }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .post(
            &format!("/api/v1/carts/{cart}/checkout"),
            json!({ "payment_method_id": cash }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let receipt = data(response).await;

    assert_eq!(decimal(&receipt["sale"]["total_amount"]), dec!(130));
    assert_eq!(receipt["sale"]["payment_method_id"], json!(cash));
    assert_eq!(receipt["sale"]["user_id"], json!(app.user_id));
    assert_eq!(
        receipt["sale"]["date"],
        json!(Utc::now().date_naive().to_string())
    );

    let items = receipt["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    let line_a = items.iter().find(|i| i["menu_item_id"] == json!(a)).unwrap();
    assert_eq!(line_a["quantity"], json!(2));
    assert_eq!(decimal(&line_a["price"]), dec!(50));
    let line_b = items.iter().find(|i| i["menu_item_id"] == json!(b)).unwrap();
    assert_eq!(line_b["quantity"], json!(1));
    assert_eq!(decimal(&line_b["price"]), dec!(30));

    let db = app.state.db.as_ref();
    assert_eq!(sale::Entity::find().count(db).await.unwrap(), 1);
    assert_eq!(sale_item::Entity::find().count(db).await.unwrap(), 2);

    // the cart is empty and ready for the next customer
    let cart_view = data(app.get(&format!("/api/v1/carts/{cart}")).await).await;
    assert!(cart_view["lines"].as_array().unwrap().is_empty());
    assert_eq!(decimal(&cart_view["total"]), dec!(0));
}

#[tokio::test]
async fn checkout_without_payment_method_writes_nothing() {
    let app = TestApp::new().await;
    let a = app.seed_menu_item("A", dec!(50)).await;
    let cart = app.open_cart().await;
    app.post(
        &format!("/api/v1/carts/{cart}/items"),
        json!({ "menu_item_id": a }),
    )
    .await;

    let response = app
        .post(&format!("/api/v1/carts/{cart}/checkout"), json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Please select a payment method"));

    let db = app.state.db.as_ref();
    assert_eq!(sale::Entity::find().count(db).await.unwrap(), 0);
    assert_eq!(sale_item::Entity::find().count(db).await.unwrap(), 0);

    let cart_view = data(app.get(&format!("/api/v1/carts/{cart}")).await).await;
    assert_eq!(cart_view["lines"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn empty_cart_cannot_be_checked_out() {
    let app = TestApp::new().await;
    let cash = app.seed_payment_method("Cash").await;
    let cart = app.open_cart().await;

    let response = app
        .post(
            &format!("/api/v1/carts/{cart}/checkout"),
            json!({ "payment_method_id": cash }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        sale::Entity::find()
            .count(app.state.db.as_ref())
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn selected_payment_method_is_used_when_none_is_sent() {
    let app = TestApp::new().await;
    let gcash = app.seed_payment_method("GCash").await;
    let a = app.seed_menu_item("A", dec!(50)).await;
    let cart = app.open_cart().await;
    app.post(
        &format!("/api/v1/carts/{cart}/items"),
        json!({ "menu_item_id": a }),
    )
    .await;

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/carts/{cart}/payment-method"),
            Some(json!({ "payment_method_id": gcash })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/carts/{cart}/checkout"),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let receipt = data(response).await;
    assert_eq!(receipt["sale"]["payment_method_id"], json!(gcash));
}

/// Accepts the sale row, then fails on the items
#[derive(Default)]
struct FailingItemsStore {
    sale_writes: AtomicUsize,
    item_writes: AtomicUsize,
}

#[async_trait]
impl SaleStore for FailingItemsStore {
    async fn insert_sale(&self, new: NewSale) -> Result<sale::Model, ServiceError> {
        self.sale_writes.fetch_add(1, Ordering::SeqCst);
        Ok(sale::Model {
            id: new.id,
            date: new.date,
            total_amount: new.total_amount,
            payment_method_id: new.payment_method_id,
            user_id: new.user_id,
            created_at: Utc::now(),
        })
    }

    async fn insert_sale_items(
        &self,
        _sale_id: Uuid,
        _items: Vec<NewSaleItem>,
    ) -> Result<Vec<sale_item::Model>, ServiceError> {
        self.item_writes.fetch_add(1, Ordering::SeqCst);
        Err(ServiceError::db_error("foreign key constraint failed"))
    }
}

#[tokio::test]
async fn failed_item_write_is_reported_and_cart_is_kept() {
    let store = Arc::new(FailingItemsStore::default());
    let app = TestApp::with_sale_store(store.clone()).await;
    let cash = app.seed_payment_method("Cash").await;
    let a = app.seed_menu_item("A", dec!(50)).await;
    let cart = app.open_cart().await;
    app.post(
        &format!("/api/v1/carts/{cart}/items"),
        json!({ "menu_item_id": a }),
    )
    .await;

    let response = app
        .post(
            &format!("/api/v1/carts/{cart}/checkout"),
            json!({ "payment_method_id": cash }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["message"], json!("Failed to record sale items."));

    assert_eq!(store.sale_writes.load(Ordering::SeqCst), 1);
    assert_eq!(store.item_writes.load(Ordering::SeqCst), 1);

    let cart_view = data(app.get(&format!("/api/v1/carts/{cart}")).await).await;
    assert_eq!(cart_view["lines"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_payment_method_on_checkout_is_not_found() {
    let app = TestApp::new().await;
    let a = app.seed_menu_item("A", dec!(50)).await;
    let cart = app.open_cart().await;
    app.post(
        &format!("/api/v1/carts/{cart}/items"),
        json!({ "menu_item_id": a }),
    )
    .await;

    let response = app
        .post(
            &format!("/api/v1/carts/{cart}/checkout"),
            json!({ "payment_method_id": Uuid::new_v4() }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let db = app.state.db.as_ref();
    assert_eq!(sale::Entity::find().count(db).await.unwrap(), 0);
    assert_eq!(sale_item::Entity::find().count(db).await.unwrap(), 0);

    let cart_view = data(app.get(&format!("/api/v1/carts/{cart}")).await).await;
    assert_eq!(cart_view["lines"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_payment_method_on_manual_entry_is_not_found() {
    let app = TestApp::new().await;
    let a = app.seed_menu_item("A", dec!(50)).await;

    let response = app
        .post(
            "/api/v1/sales",
            json!({
                "payment_method_id": Uuid::new_v4(),
                "items": [{ "menu_item_id": a, "quantity": 2 }],
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let db = app.state.db.as_ref();
    assert_eq!(sale::Entity::find().count(db).await.unwrap(), 0);
    assert_eq!(sale_item::Entity::find().count(db).await.unwrap(), 0);
}

#[tokio::test]
async fn malformed_checkout_body_is_rejected() {
    let app = TestApp::new().await;
    let cash = app.seed_payment_method("Cash").await;
    let a = app.seed_menu_item("A", dec!(50)).await;
    let cart = app.open_cart().await;
    app.post(
        &format!("/api/v1/carts/{cart}/items"),
        json!({ "menu_item_id": a }),
    )
    .await;
    app.request_authenticated(
        Method::PUT,
        &format!("/api/v1/carts/{cart}/payment-method"),
        Some(json!({ "payment_method_id": cash })),
    )
    .await;

    // a usable method is selected, but the body itself is broken
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/v1/carts/{cart}/checkout"))
        .header("authorization", format!("Bearer {}", app.token()))
        .header("content-type", "application/json")
        .body(Body::from(r#"{"payment_method_id": "#))
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(
        sale::Entity::find()
            .count(app.state.db.as_ref())
            .await
            .unwrap(),
        0
    );
    let cart_view = data(app.get(&format!("/api/v1/carts/{cart}")).await).await;
    assert_eq!(cart_view["lines"].as_array().unwrap().len(), 1);
}

/// Holds the sale write until released
#[derive(Default)]
struct PausingStore {
    entered: Notify,
    release: Notify,
    sale_writes: AtomicUsize,
    item_writes: AtomicUsize,
}

#[async_trait]
impl SaleStore for PausingStore {
    async fn insert_sale(&self, new: NewSale) -> Result<sale::Model, ServiceError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.sale_writes.fetch_add(1, Ordering::SeqCst);
        Ok(sale::Model {
            id: new.id,
            date: new.date,
            total_amount: new.total_amount,
            payment_method_id: new.payment_method_id,
            user_id: new.user_id,
            created_at: Utc::now(),
        })
    }

    async fn insert_sale_items(
        &self,
        sale_id: Uuid,
        items: Vec<NewSaleItem>,
    ) -> Result<Vec<sale_item::Model>, ServiceError> {
        self.item_writes.fetch_add(1, Ordering::SeqCst);
        Ok(items
            .into_iter()
            .map(|item| sale_item::Model {
                id: Uuid::new_v4(),
                sale_id,
                menu_item_id: item.menu_item_id,
                quantity: item.quantity,
                price: item.price,
            })
            .collect())
    }
}

#[tokio::test]
async fn cart_is_locked_while_its_checkout_is_in_flight() {
    let store = Arc::new(PausingStore::default());
    let app = Arc::new(TestApp::with_sale_store(store.clone()).await);
    let cash = app.seed_payment_method("Cash").await;
    let a = app.seed_menu_item("A", dec!(50)).await;
    let b = app.seed_menu_item("B", dec!(30)).await;
    let cart = app.open_cart().await;
    app.post(
        &format!("/api/v1/carts/{cart}/items"),
        json!({ "menu_item_id": a }),
    )
    .await;

    let in_flight = tokio::spawn({
        let app = app.clone();
        async move {
            app.post(
                &format!("/api/v1/carts/{cart}/checkout"),
                json!({ "payment_method_id": cash }),
            )
            .await
        }
    });
    store.entered.notified().await;

    let response = app
        .post(
            &format!("/api/v1/carts/{cart}/items"),
            json!({ "menu_item_id": b }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .post(
            &format!("/api/v1/carts/{cart}/checkout"),
            json!({ "payment_method_id": cash }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    store.release.notify_one();
    let response = in_flight.await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let receipt = data(response).await;
    assert_eq!(decimal(&receipt["sale"]["total_amount"]), dec!(50));
    assert_eq!(receipt["items"].as_array().unwrap().len(), 1);

    assert_eq!(store.sale_writes.load(Ordering::SeqCst), 1);
    assert_eq!(store.item_writes.load(Ordering::SeqCst), 1);

    // unlocked and empty again
    let response = app
        .post(
            &format!("/api/v1/carts/{cart}/items"),
            json!({ "menu_item_id": b }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cart_view = data(response).await;
    assert_eq!(cart_view["lines"].as_array().unwrap().len(), 1);
    assert_eq!(decimal(&cart_view["total"]), dec!(30));
}
