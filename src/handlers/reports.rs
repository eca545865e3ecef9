use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    errors::ServiceError,
    reports::{ExportedReport, XLSX_CONTENT_TYPE},
    AppState,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ReportRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

fn attachment(report: ExportedReport) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", report.filename),
            ),
        ],
        report.bytes,
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/sales",
    params(ReportRange),
    responses(
        (status = 200, description = "Sales workbook", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        (status = 400, description = "Missing or reversed dates", body = crate::errors::ErrorResponse),
        (status = 404, description = "No sales found in selected range", body = crate::errors::ErrorResponse)
    ),
    tag = "reports"
)]
pub async fn export_sales(
    State(state): State<AppState>,
    Query(range): Query<ReportRange>,
) -> Result<impl IntoResponse, ServiceError> {
    let report = state
        .services
        .reports
        .sales_report(range.from, range.to)
        .await?;
    Ok(attachment(report))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/inventory",
    params(ReportRange),
    responses(
        (status = 200, description = "Inventory workbook", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        (status = 400, description = "Missing or reversed dates", body = crate::errors::ErrorResponse),
        (status = 404, description = "Nothing created in selected range", body = crate::errors::ErrorResponse)
    ),
    tag = "reports"
)]
pub async fn export_inventory(
    State(state): State<AppState>,
    Query(range): Query<ReportRange>,
) -> Result<impl IntoResponse, ServiceError> {
    let report = state
        .services
        .reports
        .inventory_report(range.from, range.to)
        .await?;
    Ok(attachment(report))
}

pub fn reports_routes() -> Router<AppState> {
    Router::new()
        .route("/sales", get(export_sales))
        .route("/inventory", get(export_inventory))
}
