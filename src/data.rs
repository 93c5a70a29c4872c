//! Workbook loading and cleaning of sales-order rows

use crate::error::SalesError;
use anyhow::Context;
use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{Datelike, Duration, NaiveDate};
use polars::prelude::*;
use std::path::Path;

/// Column names as they appear in the promoted header row.
pub mod columns {
    pub const SO_NUMBER: &str = "SO Number";
    pub const SO_DATE: &str = "SO Date";
    pub const PRODUCT: &str = "Product";
    pub const CUSTOMER: &str = "Customer";
    pub const PRICE_CATEGORY: &str = "Price List Category";
    pub const AMOUNT_TOTAL: &str = "Amount Total";
    pub const MONTH: &str = "Month";
    pub const YEAR: &str = "Year";

    pub const REQUIRED: [&str; 6] = [
        SO_DATE,
        PRODUCT,
        CUSTOMER,
        AMOUNT_TOTAL,
        SO_NUMBER,
        PRICE_CATEGORY,
    ];
}

/// Sheet row holding the real column names. Rows above it are report metadata.
pub const HEADER_ROW: usize = 3;

/// Spreadsheet serial dates count days from this origin.
const SERIAL_DATE_ORIGIN: (i32, u32, u32) = (1899, 12, 30);

/// One cleaned sales-order line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalesRecord {
    pub order_id: Option<String>,
    pub product: Option<String>,
    pub customer: Option<String>,
    pub order_date: Option<NaiveDate>,
    /// Calendar month (1-12) of `order_date`
    pub month: Option<u32>,
    /// Calendar year of `order_date`
    pub year: Option<i32>,
    pub price_category: Option<String>,
    pub amount_total: Option<f64>,
}

impl SalesRecord {
    /// Set the order date and derive month/year from it.
    pub fn with_order_date(mut self, order_date: Option<NaiveDate>) -> Self {
        self.order_date = order_date;
        self.month = order_date.map(|d| d.month());
        self.year = order_date.map(|d| d.year());
        self
    }
}

/// The cleaned working table
#[derive(Debug, Clone, Default)]
pub struct SalesTable {
    /// Trimmed header names in sheet order
    pub columns: Vec<String>,
    /// Data rows, indexed contiguously from 0
    pub records: Vec<SalesRecord>,
}

impl SalesTable {
    /// Table with exactly the required columns, for records built in code
    pub fn from_records(records: Vec<SalesRecord>) -> Self {
        Self {
            columns: columns::REQUIRED.iter().map(|c| c.to_string()).collect(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Header names the analysis does not use, in sheet order
    pub fn extra_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(String::as_str)
            .filter(|name| !name.is_empty() && !columns::REQUIRED.contains(name))
            .collect()
    }

    /// Number of rows whose order date could not be decoded
    pub fn missing_dates(&self) -> usize {
        self.records.iter().filter(|r| r.order_date.is_none()).count()
    }

    /// Convert the table into a polars `DataFrame` for aggregation.
    ///
    /// `SO Date` is stored as days from the common era (`num_days_from_ce`)
    /// so it groups and sorts as a plain integer; use [`date_from_frame`]
    /// to decode it.
    pub fn to_frame(&self) -> crate::Result<DataFrame> {
        let order_ids: Vec<Option<&str>> =
            self.records.iter().map(|r| r.order_id.as_deref()).collect();
        let products: Vec<Option<&str>> =
            self.records.iter().map(|r| r.product.as_deref()).collect();
        let customers: Vec<Option<&str>> =
            self.records.iter().map(|r| r.customer.as_deref()).collect();
        let categories: Vec<Option<&str>> = self
            .records
            .iter()
            .map(|r| r.price_category.as_deref())
            .collect();
        let dates: Vec<Option<i32>> = self
            .records
            .iter()
            .map(|r| r.order_date.map(|d| d.num_days_from_ce()))
            .collect();
        let months: Vec<Option<i32>> = self
            .records
            .iter()
            .map(|r| r.month.map(|m| m as i32))
            .collect();
        let years: Vec<Option<i32>> = self.records.iter().map(|r| r.year).collect();
        let amounts: Vec<Option<f64>> = self.records.iter().map(|r| r.amount_total).collect();

        let df = df!(
            columns::SO_NUMBER => order_ids,
            columns::SO_DATE => dates,
            columns::PRODUCT => products,
            columns::CUSTOMER => customers,
            columns::PRICE_CATEGORY => categories,
            columns::AMOUNT_TOTAL => amounts,
            columns::MONTH => months,
            columns::YEAR => years
        )?;

        Ok(df)
    }
}

/// Decode a `SO Date` value produced by [`SalesTable::to_frame`].
pub fn date_from_frame(days_from_ce: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days_from_ce)
}

/// Load the first worksheet of a workbook and clean it into a [`SalesTable`]
///
/// # Arguments
/// * `path` - Path to an `.xlsx`, `.xls` or `.ods` file
///
/// # Returns
/// * `SalesTable` with typed records; undecodable cells are `None`
pub fn load_sales_workbook<P: AsRef<Path>>(path: P) -> crate::Result<SalesTable> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook {}", path.display()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SalesError::EmptyWorkbook(path.display().to_string()))?
        .with_context(|| format!("Failed to read first worksheet of {}", path.display()))?;

    let rows = absolute_rows(&range);
    let table = clean_rows(&rows)?;

    tracing::debug!(
        path = %path.display(),
        rows = table.len(),
        missing_dates = table.missing_dates(),
        ignored_columns = ?table.extra_columns(),
        "loaded sales workbook"
    );

    Ok(table)
}

/// Materialise the used range as rows addressed from sheet row 0.
fn absolute_rows(range: &Range<Data>) -> Vec<Vec<Data>> {
    let offset = range.start().map(|(row, _)| row as usize).unwrap_or(0);

    std::iter::repeat_with(Vec::new)
        .take(offset)
        .chain(range.rows().map(|row| row.to_vec()))
        .collect()
}

/// Drop the metadata rows, promote the header and coerce every data row.
pub fn clean_rows(rows: &[Vec<Data>]) -> crate::Result<SalesTable> {
    let header = rows.get(HEADER_ROW).ok_or(SalesError::SheetTooShort {
        rows: rows.len(),
        header_row: HEADER_ROW,
    })?;

    let names: Vec<String> = header.iter().map(header_name).collect();
    let index_of = |name: &str| -> Result<usize, SalesError> {
        names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| SalesError::MissingColumn(name.to_string()))
    };

    let so_number = index_of(columns::SO_NUMBER)?;
    let so_date = index_of(columns::SO_DATE)?;
    let product = index_of(columns::PRODUCT)?;
    let customer = index_of(columns::CUSTOMER)?;
    let category = index_of(columns::PRICE_CATEGORY)?;
    let amount = index_of(columns::AMOUNT_TOTAL)?;

    let records = rows[HEADER_ROW + 1..]
        .iter()
        .map(|row| {
            let cell = |idx: usize| row.get(idx).unwrap_or(&Data::Empty);
            let order_date = coerce_numeric(cell(so_date)).and_then(serial_to_date);

            SalesRecord {
                order_id: cell_text(cell(so_number)),
                product: cell_text(cell(product)),
                customer: cell_text(cell(customer)),
                price_category: cell_text(cell(category)),
                amount_total: coerce_numeric(cell(amount)),
                ..SalesRecord::default()
            }
            .with_order_date(order_date)
        })
        .collect();

    Ok(SalesTable {
        columns: names,
        records,
    })
}

/// Header cell text with surrounding whitespace removed
fn header_name(cell: &Data) -> String {
    cell_text(cell)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Numeric value of a cell, or `None` when it cannot be read as a number.
///
/// Text is trimmed and parsed; empty, boolean and error cells are missing.
pub fn coerce_numeric(cell: &Data) -> Option<f64> {
    let value = match cell {
        Data::Int(v) => Some(*v as f64),
        Data::Float(v) => Some(*v),
        Data::DateTime(dt) => Some(dt.as_f64()),
        Data::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite())
}

/// Text value of a cell; empty and error cells are missing.
pub fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        Data::Int(v) => Some(v.to_string()),
        // Integral floats print without the trailing ".0"
        Data::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => Some(format!("{}", *v as i64)),
        Data::Float(v) => Some(v.to_string()),
        Data::Bool(v) => Some(v.to_string()),
        Data::DateTime(dt) => Some(dt.as_f64().to_string()),
    }
}

/// Convert a spreadsheet serial day count into a calendar date.
///
/// Fractional days (time of day) are floored. Values outside chrono's
/// representable range yield `None`.
pub fn serial_to_date(days: f64) -> Option<NaiveDate> {
    if !days.is_finite() {
        return None;
    }
    let (y, m, d) = SERIAL_DATE_ORIGIN;
    let origin = NaiveDate::from_ymd_opt(y, m, d)?;
    let whole = days.floor();
    if whole.abs() > i32::MAX as f64 {
        return None;
    }
    origin.checked_add_signed(Duration::try_days(whole as i64)?)
}
