//! Structural failures that abort an analysis run

use thiserror::Error;

/// Errors raised when the input cannot be analysed at all.
///
/// Per-cell coercion problems are never reported here; those cells simply
/// become missing values.
#[derive(Error, Debug, PartialEq)]
pub enum SalesError {
    /// The workbook has no worksheets.
    #[error("Workbook contains no worksheets: {0}")]
    EmptyWorkbook(String),

    /// The sheet ends before the header row.
    #[error("Sheet has {rows} rows; the header is expected at row {header_row}")]
    SheetTooShort { rows: usize, header_row: usize },

    /// A required column is absent from the promoted header.
    #[error("Required column '{0}' not found in header")]
    MissingColumn(String),

    /// Clustering needs at least as many customers as segments.
    #[error("Number of customers ({customers}) must be at least equal to number of segments ({segments})")]
    NotEnoughCustomers { customers: usize, segments: usize },

    /// Malformed `--predict` argument.
    #[error("Invalid predict value: {0}")]
    InvalidPredict(String),
}
