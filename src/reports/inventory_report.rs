use super::{as_f64, cell_format, header_format, title_format, total_format};
use crate::entities::inventory_item;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};

pub const HEADERS: [&str; 7] = [
    "Item ID",
    "Name",
    "Unit",
    "Quantity",
    "Cost per Unit",
    "Created At",
    "Total Cost",
];
pub const COLUMN_WIDTHS: [f64; 7] = [15.0, 25.0, 10.0, 12.0, 15.0, 25.0, 15.0];

pub fn filename(from: NaiveDate, to: NaiveDate) -> String {
    format!("Inventory_Report_{}_to_{}.xlsx", from, to)
}

pub fn total_cost(items: &[inventory_item::Model]) -> Decimal {
    items.iter().map(inventory_item::Model::total_cost).sum()
}

pub fn render(
    business_name: &str,
    from: NaiveDate,
    to: NaiveDate,
    items: &[inventory_item::Model],
) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name("Inventory Report")?;

    let title = title_format();
    let last_col = (HEADERS.len() - 1) as u16;
    worksheet.merge_range(0, 0, 0, last_col, &format!("{} INVENTORY REPORT", business_name), &title)?;
    worksheet.merge_range(1, 0, 1, last_col, &format!("AS OF {} - {}", from, to), &title)?;

    let header = header_format();
    for (col, name) in HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(3, col as u16, *name, &header)?;
    }

    let cell = cell_format();
    let mut row_idx: u32 = 4;
    for item in items {
        let created_at = item.created_at.format("%Y-%m-%d %H:%M:%S").to_string();
        worksheet.write_string_with_format(row_idx, 0, &item.id.to_string(), &cell)?;
        worksheet.write_string_with_format(row_idx, 1, &item.name, &cell)?;
        worksheet.write_string_with_format(row_idx, 2, &item.unit, &cell)?;
        worksheet.write_number_with_format(row_idx, 3, as_f64(item.quantity), &cell)?;
        worksheet.write_number_with_format(row_idx, 4, as_f64(item.cost_per_unit), &cell)?;
        worksheet.write_string_with_format(row_idx, 5, &created_at, &cell)?;
        worksheet.write_number_with_format(row_idx, 6, as_f64(item.total_cost()), &cell)?;
        row_idx += 1;
    }

    let total_row = row_idx + 1;
    worksheet.write_string_with_format(total_row, 5, "TOTAL:", &cell)?;
    worksheet.write_number_with_format(total_row, 6, as_f64(total_cost(items)), &total_format())?;

    for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
        worksheet.set_column_width(col as u16, *width)?;
    }

    workbook.push_worksheet(worksheet);
    workbook.save_to_buffer()
}
