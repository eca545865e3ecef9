use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::{
    errors::ServiceError,
    handlers::common::{created_response, no_content_response, parse_id, success_response},
    services::menu::{CreateMenuItemRequest, MenuItemView, UpdateMenuItemRequest},
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/menu-items",
    responses(
        (status = 200, description = "Active menu items with ingredients", body = [MenuItemView]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "menu"
)]
pub async fn list_menu_items(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.services.menu.list_active().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/menu-items/{id}",
    params(("id" = String, Path, description = "Menu item ID")),
    responses(
        (status = 200, description = "Menu item returned", body = MenuItemView),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "menu"
)]
pub async fn get_menu_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.services.menu.get(parse_id(&id)?).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/menu-items",
    request_body = CreateMenuItemRequest,
    responses(
        (status = 201, description = "Menu item created", body = MenuItemView),
        (status = 400, description = "Name and price are required", body = crate::errors::ErrorResponse)
    ),
    tag = "menu"
)]
pub async fn create_menu_item(
    State(state): State<AppState>,
    Json(payload): Json<CreateMenuItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state.services.menu.create(payload).await?;
    Ok(created_response(item))
}

#[utoipa::path(
    put,
    path = "/api/v1/menu-items/{id}",
    params(("id" = String, Path, description = "Menu item ID")),
    request_body = UpdateMenuItemRequest,
    responses(
        (status = 200, description = "Menu item updated", body = MenuItemView),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "menu"
)]
pub async fn update_menu_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateMenuItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state.services.menu.update(parse_id(&id)?, payload).await?;
    Ok(success_response(item))
}

/// Soft delete: the item disappears from the menu but stays on past sales
#[utoipa::path(
    delete,
    path = "/api/v1/menu-items/{id}",
    params(("id" = String, Path, description = "Menu item ID")),
    responses(
        (status = 204, description = "Menu item deactivated"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "menu"
)]
pub async fn deactivate_menu_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.menu.deactivate(parse_id(&id)?).await?;
    Ok(no_content_response())
}

pub fn menu_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_menu_items).post(create_menu_item))
        .route(
            "/:id",
            get(get_menu_item)
                .put(update_menu_item)
                .delete(deactivate_menu_item),
        )
}
