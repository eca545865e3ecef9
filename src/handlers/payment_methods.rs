use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};

use crate::{
    entities::payment_method,
    errors::ServiceError,
    handlers::common::{created_response, success_response},
    services::payment_methods::CreatePaymentMethodRequest,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/payment-methods",
    responses((status = 200, description = "Payment methods by name", body = [payment_method::Model])),
    tag = "payment-methods"
)]
pub async fn list_payment_methods(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.services.payment_methods.list().await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/payment-methods",
    request_body = CreatePaymentMethodRequest,
    responses(
        (status = 201, description = "Payment method created", body = payment_method::Model),
        (status = 400, description = "Name is required", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "payment-methods"
)]
pub async fn create_payment_method(
    State(state): State<AppState>,
    Json(payload): Json<CreatePaymentMethodRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(created_response(
        state.services.payment_methods.create(payload).await?,
    ))
}

pub fn payment_methods_routes() -> Router<AppState> {
    Router::new().route("/", get(list_payment_methods).post(create_payment_method))
}
