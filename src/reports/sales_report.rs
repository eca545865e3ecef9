use super::{as_f64, cell_format, header_format, title_format, total_format};
use crate::services::sales::SaleView;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use uuid::Uuid;

pub const HEADERS: [&str; 8] = [
    "Sale ID",
    "Date",
    "Payment Method",
    "Menu Item",
    "Quantity",
    "Price per Unit",
    "Subtotal",
    "Total Sale Amount",
];
pub const COLUMN_WIDTHS: [f64; 8] = [12.0, 20.0, 18.0, 22.0, 10.0, 16.0, 15.0, 18.0];

/// One spreadsheet row per sale item
#[derive(Debug, Clone, PartialEq)]
pub struct SalesReportRow {
    pub sale_id: Uuid,
    pub date: NaiveDate,
    pub payment_method: String,
    pub menu_item: String,
    pub quantity: i32,
    pub price: Decimal,
    pub subtotal: Decimal,
    pub sale_total: Decimal,
}

pub fn rows(sales: &[SaleView]) -> Vec<SalesReportRow> {
    sales
        .iter()
        .flat_map(|sale| {
            sale.items.iter().map(move |item| SalesReportRow {
                sale_id: sale.sale_id,
                date: sale.date,
                payment_method: sale.payment_method_name.clone().unwrap_or_default(),
                menu_item: item.menu_item_name.clone(),
                quantity: item.quantity,
                price: item.price,
                subtotal: item.subtotal(),
                sale_total: sale.total_amount,
            })
        })
        .collect()
}

/// Σ of the subtotal column
pub fn grand_total(rows: &[SalesReportRow]) -> Decimal {
    rows.iter().map(|r| r.subtotal).sum()
}

pub fn filename(from: NaiveDate, to: NaiveDate) -> String {
    format!("Sales_Report_{}_to_{}.xlsx", from, to)
}

pub fn render(
    business_name: &str,
    from: NaiveDate,
    to: NaiveDate,
    rows: &[SalesReportRow],
) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name("Sales Report")?;

    let title = title_format();
    let last_col = (HEADERS.len() - 1) as u16;
    worksheet.merge_range(0, 0, 0, last_col, &format!("{} SALES REPORT", business_name), &title)?;
    worksheet.merge_range(1, 0, 1, last_col, &format!("AS OF {} - {}", from, to), &title)?;

    let header = header_format();
    for (col, name) in HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(3, col as u16, *name, &header)?;
    }

    let cell = cell_format();
    let mut row_idx: u32 = 4;
    for row in rows {
        worksheet.write_string_with_format(row_idx, 0, &row.sale_id.to_string(), &cell)?;
        worksheet.write_string_with_format(row_idx, 1, &row.date.to_string(), &cell)?;
        worksheet.write_string_with_format(row_idx, 2, &row.payment_method, &cell)?;
        worksheet.write_string_with_format(row_idx, 3, &row.menu_item, &cell)?;
        worksheet.write_number_with_format(row_idx, 4, f64::from(row.quantity), &cell)?;
        worksheet.write_number_with_format(row_idx, 5, as_f64(row.price), &cell)?;
        worksheet.write_number_with_format(row_idx, 6, as_f64(row.subtotal), &cell)?;
        worksheet.write_number_with_format(row_idx, 7, as_f64(row.sale_total), &cell)?;
        row_idx += 1;
    }

    // blank row, then the total under the last two columns
    let total_row = row_idx + 1;
    worksheet.write_string_with_format(total_row, 6, "TOTAL:", &cell)?;
    worksheet.write_number_with_format(total_row, 7, as_f64(grand_total(rows)), &total_format())?;

    for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
        worksheet.set_column_width(col as u16, *width)?;
    }

    workbook.push_worksheet(worksheet);
    workbook.save_to_buffer()
}
