use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::{
    entities::expense,
    errors::ServiceError,
    handlers::common::{created_response, success_response},
    services::expenses::{CreateExpenseRequest, ExpenseQuery},
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/expenses",
    params(ExpenseQuery),
    responses(
        (status = 200, description = "Expenses, newest date first", body = [expense::Model]),
        (status = 400, description = "Invalid date range", body = crate::errors::ErrorResponse)
    ),
    tag = "expenses"
)]
pub async fn list_expenses(
    State(state): State<AppState>,
    Query(query): Query<ExpenseQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.services.expenses.list(&query).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/expenses",
    request_body = CreateExpenseRequest,
    responses(
        (status = 201, description = "Expense recorded", body = expense::Model),
        (status = 400, description = "Category and a positive amount are required", body = crate::errors::ErrorResponse)
    ),
    tag = "expenses"
)]
pub async fn create_expense(
    State(state): State<AppState>,
    Json(payload): Json<CreateExpenseRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(created_response(state.services.expenses.create(payload).await?))
}

pub fn expenses_routes() -> Router<AppState> {
    Router::new().route("/", get(list_expenses).post(create_expense))
}
