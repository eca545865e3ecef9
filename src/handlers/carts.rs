//! Till terminal endpoints. A cart is created per terminal session and
//! driven one tap at a time.

use axum::{
    body::Bytes,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::common::{
        created_response, no_content_response, optional_json, parse_id, success_response,
    },
    services::{carts::CartView, checkout::Receipt},
    AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCartItemRequest {
    pub menu_item_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StepRemovalRequest {
    /// Usually +1 or -1
    pub delta: i64,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct ConfirmRemoveRequest {
    pub quantity: Option<u32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectPaymentMethodRequest {
    pub payment_method_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CheckoutRequest {
    pub payment_method_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RemovalResult {
    pub removed: u32,
    pub cart: CartView,
}

#[utoipa::path(
    post,
    path = "/api/v1/carts",
    responses(
        (status = 201, description = "Cart opened", body = CartView),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "carts"
)]
pub async fn create_cart(State(state): State<AppState>) -> impl IntoResponse {
    created_response(state.services.carts.create())
}

#[utoipa::path(
    get,
    path = "/api/v1/carts/{id}",
    params(("id" = String, Path, description = "Cart ID")),
    responses(
        (status = 200, description = "Cart returned", body = CartView),
        (status = 404, description = "Cart not found", body = crate::errors::ErrorResponse)
    ),
    tag = "carts"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let cart = state.services.carts.get(parse_id(&id)?)?;
    Ok(success_response(cart))
}

#[utoipa::path(
    post,
    path = "/api/v1/carts/{id}/items",
    params(("id" = String, Path, description = "Cart ID")),
    request_body = AddCartItemRequest,
    responses(
        (status = 200, description = "One unit added", body = CartView),
        (status = 409, description = "Cart is being checked out", body = crate::errors::ErrorResponse),
        (status = 400, description = "Menu item is inactive", body = crate::errors::ErrorResponse),
        (status = 404, description = "Cart or menu item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "carts"
)]
pub async fn add_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<AddCartItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let cart = state
        .services
        .carts
        .add_item(parse_id(&id)?, payload.menu_item_id)
        .await?;
    Ok(success_response(cart))
}

#[utoipa::path(
    post,
    path = "/api/v1/carts/{id}/items/{menu_item_id}/remove-mode",
    params(
        ("id" = String, Path, description = "Cart ID"),
        ("menu_item_id" = String, Path, description = "Menu item ID of the line")
    ),
    responses(
        (status = 200, description = "Removal mode toggled", body = CartView),
        (status = 404, description = "Cart or line not found", body = crate::errors::ErrorResponse)
    ),
    tag = "carts"
)]
pub async fn toggle_remove_mode(
    State(state): State<AppState>,
    Path((id, menu_item_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ServiceError> {
    let cart = state
        .services
        .carts
        .toggle_remove_mode(parse_id(&id)?, parse_id(&menu_item_id)?)?;
    Ok(success_response(cart))
}

#[utoipa::path(
    post,
    path = "/api/v1/carts/{id}/removal/step",
    params(("id" = String, Path, description = "Cart ID")),
    request_body = StepRemovalRequest,
    responses(
        (status = 200, description = "Pending removal adjusted", body = CartView),
        (status = 400, description = "No line is in removal mode", body = crate::errors::ErrorResponse)
    ),
    tag = "carts"
)]
pub async fn step_removal(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<StepRemovalRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let cart = state
        .services
        .carts
        .step_removal(parse_id(&id)?, payload.delta)?;
    Ok(success_response(cart))
}

#[utoipa::path(
    post,
    path = "/api/v1/carts/{id}/items/{menu_item_id}/remove",
    params(
        ("id" = String, Path, description = "Cart ID"),
        ("menu_item_id" = String, Path, description = "Menu item ID of the line")
    ),
    request_body = ConfirmRemoveRequest,
    responses(
        (status = 200, description = "Units removed", body = RemovalResult),
        (status = 400, description = "Malformed body or zero quantity", body = crate::errors::ErrorResponse),
        (status = 409, description = "Cart is being checked out", body = crate::errors::ErrorResponse),
        (status = 404, description = "Cart not found", body = crate::errors::ErrorResponse)
    ),
    tag = "carts"
)]
pub async fn confirm_remove(
    State(state): State<AppState>,
    Path((id, menu_item_id)): Path<(String, String)>,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    let payload: ConfirmRemoveRequest = optional_json(&body)?;
    let (removed, cart) = state.services.carts.confirm_remove(
        parse_id(&id)?,
        parse_id(&menu_item_id)?,
        payload.quantity,
    )?;
    Ok(success_response(RemovalResult { removed, cart }))
}

#[utoipa::path(
    put,
    path = "/api/v1/carts/{id}/payment-method",
    params(("id" = String, Path, description = "Cart ID")),
    request_body = SelectPaymentMethodRequest,
    responses(
        (status = 200, description = "Payment method selected", body = CartView),
        (status = 404, description = "Cart or payment method not found", body = crate::errors::ErrorResponse)
    ),
    tag = "carts"
)]
pub async fn select_payment_method(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<SelectPaymentMethodRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let cart = state
        .services
        .carts
        .select_payment_method(parse_id(&id)?, payload.payment_method_id)
        .await?;
    Ok(success_response(cart))
}

#[utoipa::path(
    post,
    path = "/api/v1/carts/{id}/checkout",
    params(("id" = String, Path, description = "Cart ID")),
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Sale recorded", body = Receipt),
        (status = 400, description = "Missing payment method, empty cart, or malformed body", body = crate::errors::ErrorResponse),
        (status = 404, description = "Cart or payment method not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Cart is already being checked out", body = crate::errors::ErrorResponse),
        (status = 500, description = "Sale or sale items could not be written", body = crate::errors::ErrorResponse)
    ),
    tag = "carts"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    let payload: CheckoutRequest = optional_json(&body)?;
    let receipt = state
        .services
        .carts
        .checkout(parse_id(&id)?, payload.payment_method_id, Some(user.user_id))
        .await?;
    Ok(created_response(receipt))
}

#[utoipa::path(
    delete,
    path = "/api/v1/carts/{id}",
    params(("id" = String, Path, description = "Cart ID")),
    responses(
        (status = 204, description = "Cart discarded"),
        (status = 409, description = "Cart is being checked out", body = crate::errors::ErrorResponse),
        (status = 404, description = "Cart not found", body = crate::errors::ErrorResponse)
    ),
    tag = "carts"
)]
pub async fn discard_cart(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.carts.discard(parse_id(&id)?)?;
    Ok(no_content_response())
}

pub fn carts_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_cart))
        .route("/:id", get(get_cart).delete(discard_cart))
        .route("/:id/items", post(add_item))
        .route("/:id/items/:menu_item_id/remove-mode", post(toggle_remove_mode))
        .route("/:id/items/:menu_item_id/remove", post(confirm_remove))
        .route("/:id/removal/step", post(step_removal))
        .route("/:id/payment-method", put(select_payment_method))
        .route("/:id/checkout", post(checkout))
}
