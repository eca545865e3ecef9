mod common;

use axum::http::{header, StatusCode};
use chrono::{Datelike, Utc};
use common::{body_bytes, data, decimal, json_body, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

async fn ring_up_sales(app: &TestApp) {
    let cash = app.seed_payment_method("Cash").await;
    let gcash = app.seed_payment_method("GCash").await;
    let adobo = app.seed_menu_item("Adobo", dec!(50)).await;

    for (method, quantity) in [(cash, 3), (gcash, 1)] {
        let response = app
            .post(
                "/api/v1/sales",
                json!({ "payment_method_id": method, "items": [{ "menu_item_id": adobo, "quantity": quantity }] }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}

#[tokio::test]
async fn dashboard_breaks_down_the_current_month() {
    let app = TestApp::new().await;
    ring_up_sales(&app).await;
    let today = Utc::now().date_naive();
    app.post(
        "/api/v1/expenses",
        json!({ "category": "Rent", "amount": 600, "date": today }),
    )
    .await;

    let month = format!("{:04}-{:02}", today.year(), today.month());
    let summary = data(app.get(&format!("/api/v1/dashboard?month={month}")).await).await;

    assert_eq!(decimal(&summary["total_income"]), dec!(200));
    assert_eq!(summary["cashflow_by_payment_method"][0]["name"], json!("Cash"));
    assert_eq!(
        decimal(&summary["income_by_payment_method"][0]["percentage"]),
        dec!(75)
    );
    assert_eq!(decimal(&summary["expenses_by_category"][0]["percentage"]), dec!(100));
    assert_eq!(summary["recent_months"][0], json!(month));

    // no month means this month
    let default = data(app.get("/api/v1/dashboard").await).await;
    assert_eq!(default["month"], json!(month));
}

#[tokio::test]
async fn malformed_month_is_a_bad_request() {
    let app = TestApp::new().await;
    let response = app.get("/api/v1/dashboard?month=2025-13").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sales_report_downloads_as_xlsx() {
    let app = TestApp::new().await;
    ring_up_sales(&app).await;
    let today = Utc::now().date_naive();

    let response = app
        .get(&format!("/api/v1/reports/sales?from={today}&to={today}"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        format!("attachment; filename=\"Sales_Report_{today}_to_{today}.xlsx\"").as_str()
    );
    let bytes = body_bytes(response).await;
    assert_eq!(&bytes[..2], b"PK");
}

#[tokio::test]
async fn report_range_errors() {
    let app = TestApp::new().await;

    let response = app.get("/api/v1/reports/sales?from=2025-01-01").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Please select both From and To dates."));

    let response = app
        .get("/api/v1/reports/sales?from=2025-02-01&to=2025-01-01")
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .get("/api/v1/reports/inventory?from=2020-01-01&to=2020-01-31")
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("No sales found in selected range"));
}
