use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    errors::ServiceError,
    handlers::common::success_response,
    services::dashboard::{recent_months, DashboardSummary, RECENT_MONTHS},
    AppState,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DashboardQuery {
    /// `YYYY-MM`; defaults to the current month
    pub month: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Income and expense series for the month", body = DashboardSummary),
        (status = 400, description = "Malformed month", body = crate::errors::ErrorResponse)
    ),
    tag = "dashboard"
)]
pub async fn dashboard_summary(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let month = match query.month.filter(|m| !m.trim().is_empty()) {
        Some(month) => month,
        None => recent_months(1)
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::InternalError("no current month".to_string()))?,
    };
    Ok(success_response(state.services.dashboard.summary(&month).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard/months",
    responses((status = 200, description = "Selectable months, newest first", body = [String])),
    tag = "dashboard"
)]
pub async fn dashboard_months() -> impl IntoResponse {
    success_response(recent_months(RECENT_MONTHS))
}

pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard_summary))
        .route("/months", get(dashboard_months))
}
