//! Spreadsheet exports of sales and inventory for a date range.

pub mod inventory_report;
pub mod sales_report;

use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    services::{inventory::InventoryService, sales::SalesService},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder};
use std::sync::Arc;
use tracing::{info, instrument};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const NO_RECORDS_IN_RANGE: &str = "No sales found in selected range";

/// A rendered workbook ready to download
#[derive(Debug, Clone)]
pub struct ExportedReport {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Both bounds are required and `from` may not be after `to`
pub fn validate_range(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<(NaiveDate, NaiveDate), ServiceError> {
    let (Some(from), Some(to)) = (from, to) else {
        return Err(ServiceError::ValidationError(
            "Please select both From and To dates.".to_string(),
        ));
    };
    if from > to {
        return Err(ServiceError::ValidationError(
            "From date must not be after To date".to_string(),
        ));
    }
    Ok((from, to))
}

pub(crate) fn title_format() -> Format {
    Format::new()
        .set_bold()
        .set_font_size(14)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
}

pub(crate) fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_border(FormatBorder::Thin)
}

pub(crate) fn cell_format() -> Format {
    Format::new()
        .set_align(FormatAlign::Center)
        .set_border(FormatBorder::Thin)
}

pub(crate) fn total_format() -> Format {
    cell_format().set_bold()
}

pub(crate) fn as_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

#[derive(Clone)]
pub struct ReportService {
    sales: Arc<SalesService>,
    inventory: Arc<InventoryService>,
    event_sender: Arc<EventSender>,
    business_name: String,
}

impl ReportService {
    pub fn new(
        sales: Arc<SalesService>,
        inventory: Arc<InventoryService>,
        event_sender: Arc<EventSender>,
        business_name: impl Into<String>,
    ) -> Self {
        Self {
            sales,
            inventory,
            event_sender,
            business_name: business_name.into(),
        }
    }

    #[instrument(skip(self))]
    pub async fn sales_report(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<ExportedReport, ServiceError> {
        let (from, to) = validate_range(from, to)?;
        let sales = self.sales.in_range(from, to).await?;
        if sales.is_empty() {
            return Err(ServiceError::NotFound(NO_RECORDS_IN_RANGE.to_string()));
        }

        let rows = sales_report::rows(&sales);
        let bytes = sales_report::render(&self.business_name, from, to, &rows)?;
        self.exported("sales", from, to, rows.len()).await;

        Ok(ExportedReport {
            filename: sales_report::filename(from, to),
            bytes,
        })
    }

    #[instrument(skip(self))]
    pub async fn inventory_report(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<ExportedReport, ServiceError> {
        let (from, to) = validate_range(from, to)?;
        let items = self.inventory.created_between(from, to).await?;
        if items.is_empty() {
            return Err(ServiceError::NotFound(NO_RECORDS_IN_RANGE.to_string()));
        }

        let bytes = inventory_report::render(&self.business_name, from, to, &items)?;
        self.exported("inventory", from, to, items.len()).await;

        Ok(ExportedReport {
            filename: inventory_report::filename(from, to),
            bytes,
        })
    }

    async fn exported(&self, kind: &str, from: NaiveDate, to: NaiveDate, rows: usize) {
        info!(kind, %from, %to, rows, "Report exported");
        self.event_sender
            .send_or_log(Event::ReportExported {
                kind: kind.to_string(),
                from,
                to,
                generated_at: Utc::now(),
            })
            .await;
    }
}
