use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::common::{created_response, per_page, success_response, PaginatedResponse},
    services::{
        checkout::Receipt,
        sales::{ManualSaleRequest, SaleFormOptions, SalesQuery, DEFAULT_PAGE_SIZE},
    },
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/sales",
    params(SalesQuery),
    responses(
        (status = 200, description = "Sales with items, newest first"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn list_sales(
    State(state): State<AppState>,
    Query(mut query): Query<SalesQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = query.page.unwrap_or(1).max(1);
    let size = per_page(&state.config, query.per_page, DEFAULT_PAGE_SIZE);
    query.page = Some(page);
    query.per_page = Some(size);

    let (sales, total) = state.services.sales.list(&query).await?;
    Ok(success_response(PaginatedResponse::new(sales, page, size, total)))
}

#[utoipa::path(
    get,
    path = "/api/v1/sales/payment-methods",
    responses((status = 200, description = "Payment method names that appear on sales", body = [String])),
    tag = "sales"
)]
pub async fn sale_payment_method_names(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.sales.payment_method_names().await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/sales/form-options",
    responses((status = 200, description = "Choices for the manual sale form", body = SaleFormOptions)),
    tag = "sales"
)]
pub async fn sale_form_options(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.services.sales.form_options().await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/sales",
    request_body = ManualSaleRequest,
    responses(
        (status = 201, description = "Sale recorded", body = Receipt),
        (status = 400, description = "Incomplete lines or payment method", body = crate::errors::ErrorResponse),
        (status = 500, description = "Sale or sale items could not be written", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn record_manual_sale(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ManualSaleRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let receipt = state
        .services
        .sales
        .record_manual(payload, Some(user.user_id))
        .await?;
    Ok(created_response(receipt))
}

pub fn sales_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sales).post(record_manual_sale))
        .route("/payment-methods", get(sale_payment_method_names))
        .route("/form-options", get(sale_form_options))
}
