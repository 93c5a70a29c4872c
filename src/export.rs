//! Spreadsheet export of the derived tables

use crate::aggregate::{CustomerAggregate, MonthlyRevenuePivot};
use crate::discount::DiscountAssignment;
use crate::model::SegmentSummary;
use anyhow::{anyhow, Context};
use std::fs;
use std::path::{Path, PathBuf};

pub const MONTHLY_REVENUE_FILE: &str = "Pendapatan_Bulanan_by_Product.xlsx";
pub const CUSTOMER_DISCOUNT_FILE: &str = "Diskon_Pelanggan.xlsx";
pub const LOW_SELLER_DISCOUNT_FILE: &str = "Diskon_Produk_dengan_Penjualan_Rendah.xlsx";
pub const SEGMENTATION_FILE: &str = "Segmentasi_Pelanggan.xlsx";
pub const SEGMENT_ANALYSIS_FILE: &str = "Analisis_Segmentasi Pelanggan.xlsx";

/// A single cell of an exported sheet
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Empty,
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

/// Header plus rows, written to the first sheet of a workbook
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetTable {
    fn with_headers<S: AsRef<str>>(headers: &[S]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.as_ref().to_string()).collect(),
            rows: Vec::new(),
        }
    }
}

/// Pivoted monthly revenue: `Product, Month, <year>...`
pub fn monthly_revenue_sheet(pivot: &MonthlyRevenuePivot) -> SheetTable {
    let mut headers = vec!["Product".to_string(), "Month".to_string()];
    headers.extend(pivot.years.iter().map(|y| y.to_string()));

    let mut table = SheetTable::with_headers(headers.as_slice());
    for row in &pivot.rows {
        let mut cells = vec![
            CellValue::from(row.product.as_str()),
            CellValue::from(row.month as f64),
        ];
        cells.extend(row.revenue.iter().map(|&v| CellValue::from(v)));
        table.rows.push(cells);
    }
    table
}

/// Discount table with the entity column named `entity_header`
pub fn discount_sheet(
    entity_header: &str,
    rate_header: &str,
    discounts: &[DiscountAssignment],
) -> SheetTable {
    let mut table = SheetTable::with_headers(&[entity_header, "Jumlah Pesanan", rate_header]);
    table.rows = discounts
        .iter()
        .map(|d| {
            vec![
                CellValue::from(d.name.as_str()),
                CellValue::from(d.orders as f64),
                CellValue::from(d.rate),
            ]
        })
        .collect();
    table
}

/// Per-customer segment assignment
pub fn segmentation_sheet(customers: &[CustomerAggregate]) -> SheetTable {
    let mut table =
        SheetTable::with_headers(&["Customer", "total_orders", "total_pengeluaran", "Segment"]);
    table.rows = customers
        .iter()
        .map(|c| {
            vec![
                CellValue::from(c.customer.as_str()),
                CellValue::from(c.total_orders as f64),
                CellValue::from(c.total_spend),
                c.segment
                    .map(|s| CellValue::from(s as f64))
                    .unwrap_or(CellValue::Empty),
            ]
        })
        .collect();
    table
}

/// Per-segment summary statistics
pub fn segment_analysis_sheet(summaries: &[SegmentSummary]) -> SheetTable {
    let mut table = SheetTable::with_headers(&[
        "Segment",
        "customer_count",
        "avg_total_orders",
        "avg_total_spent",
    ]);
    table.rows = summaries
        .iter()
        .map(|s| {
            vec![
                CellValue::from(s.segment as f64),
                CellValue::from(s.customer_count as f64),
                CellValue::from(s.avg_total_orders),
                CellValue::from(s.avg_total_spent),
            ]
        })
        .collect();
    table
}

/// Write `table` to a new workbook at `path`, header in row 1.
pub fn write_sheet(path: &Path, table: &SheetTable) -> crate::Result<()> {
    let mut book = umya_spreadsheet::new_file();
    let sheet = book
        .get_sheet_mut(&0)
        .ok_or_else(|| anyhow!("New workbook has no default sheet"))?;

    // Header values are type-guessed, so year columns land as numbers
    for (col, header) in table.headers.iter().enumerate() {
        sheet
            .get_cell_mut((col as u32 + 1, 1))
            .set_value(header.as_str());
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let row_no = row_idx as u32 + 2;
        for (col, value) in row.iter().enumerate() {
            let coordinate = (col as u32 + 1, row_no);
            match value {
                CellValue::Text(text) => {
                    sheet.get_cell_mut(coordinate).set_value_string(text.as_str());
                }
                CellValue::Number(number) => {
                    sheet.get_cell_mut(coordinate).set_value_number(*number);
                }
                CellValue::Empty => {}
            }
        }
    }

    umya_spreadsheet::writer::xlsx::write(&book, path)
        .map_err(|e| anyhow!("Failed to write workbook {}: {}", path.display(), e))?;

    tracing::debug!(path = %path.display(), rows = table.rows.len(), "wrote workbook");
    Ok(())
}

/// Everything the export stage writes
pub struct ExportInputs<'a> {
    pub monthly_revenue: &'a MonthlyRevenuePivot,
    pub customer_discounts: &'a [DiscountAssignment],
    pub low_seller_discounts: &'a [DiscountAssignment],
    pub customers: &'a [CustomerAggregate],
    pub segment_summaries: &'a [SegmentSummary],
}

/// Write the five result workbooks into `output_dir`
///
/// # Returns
/// * Paths of the written files, in the order listed above
pub fn export_all(output_dir: &Path, inputs: &ExportInputs<'_>) -> crate::Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let sheets = [
        (MONTHLY_REVENUE_FILE, monthly_revenue_sheet(inputs.monthly_revenue)),
        (
            CUSTOMER_DISCOUNT_FILE,
            discount_sheet("Customer", "Diskon", inputs.customer_discounts),
        ),
        (
            LOW_SELLER_DISCOUNT_FILE,
            discount_sheet("Product", "Diskon yang Disarankan", inputs.low_seller_discounts),
        ),
        (SEGMENTATION_FILE, segmentation_sheet(inputs.customers)),
        (
            SEGMENT_ANALYSIS_FILE,
            segment_analysis_sheet(inputs.segment_summaries),
        ),
    ];

    let mut written = Vec::with_capacity(sheets.len());
    for (file_name, table) in &sheets {
        let path = output_dir.join(file_name);
        write_sheet(&path, table)?;
        written.push(path);
    }

    Ok(written)
}
