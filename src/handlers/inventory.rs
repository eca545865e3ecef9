use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    entities::inventory_item,
    errors::ServiceError,
    handlers::common::{
        created_response, no_content_response, parse_id, per_page, success_response,
        PaginatedResponse,
    },
    services::inventory::{
        CreateInventoryItemRequest, InventoryQuery, UpdateInventoryItemRequest, DEFAULT_PAGE_SIZE,
    },
    AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct StockSummary {
    pub total_stock: Decimal,
    pub low_stock: Vec<inventory_item::Model>,
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory",
    params(InventoryQuery),
    responses(
        (status = 200, description = "Inventory page, most recently updated first"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn list_inventory(
    State(state): State<AppState>,
    Query(mut query): Query<InventoryQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = query.page.unwrap_or(1).max(1);
    let size = per_page(&state.config, query.per_page, DEFAULT_PAGE_SIZE);
    query.page = Some(page);
    query.per_page = Some(size);

    let (items, total) = state.services.inventory.list(&query).await?;
    Ok(success_response(PaginatedResponse::new(items, page, size, total)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/{id}",
    params(("id" = String, Path, description = "Inventory item ID")),
    responses(
        (status = 200, description = "Inventory item returned", body = inventory_item::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn get_inventory_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.inventory.get(parse_id(&id)?).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory",
    request_body = CreateInventoryItemRequest,
    responses(
        (status = 201, description = "Inventory item created", body = inventory_item::Model),
        (status = 400, description = "Missing or negative fields", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn create_inventory_item(
    State(state): State<AppState>,
    Json(payload): Json<CreateInventoryItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(created_response(
        state.services.inventory.create(payload).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/inventory/{id}",
    params(("id" = String, Path, description = "Inventory item ID")),
    request_body = UpdateInventoryItemRequest,
    responses(
        (status = 200, description = "Inventory item updated", body = inventory_item::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn update_inventory_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateInventoryItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state
        .services
        .inventory
        .update(parse_id(&id)?, payload)
        .await?;
    Ok(success_response(item))
}

#[utoipa::path(
    delete,
    path = "/api/v1/inventory/{id}",
    params(("id" = String, Path, description = "Inventory item ID")),
    responses(
        (status = 204, description = "Inventory item deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn delete_inventory_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.inventory.delete(parse_id(&id)?).await?;
    Ok(no_content_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/categories",
    responses((status = 200, description = "Distinct categories", body = [String])),
    tag = "inventory"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.services.inventory.categories().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/stock",
    responses((status = 200, description = "Total stock and low-stock items", body = StockSummary)),
    tag = "inventory"
)]
pub async fn stock_summary(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let inventory = &state.services.inventory;
    let (total_stock, low_stock) = tokio::try_join!(inventory.total_stock(), inventory.low_stock())?;
    Ok(success_response(StockSummary {
        total_stock,
        low_stock,
    }))
}

pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_inventory).post(create_inventory_item))
        .route("/categories", get(list_categories))
        .route("/stock", get(stock_summary))
        .route(
            "/:id",
            get(get_inventory_item)
                .put(update_inventory_item)
                .delete(delete_inventory_item),
        )
}
