//! SalesForge: sales analytics over a single spreadsheet extract
//!
//! The crate cleans a sales-order sheet, computes descriptive aggregates,
//! recommends discount tiers and segments customers with K-Means clustering.

pub mod aggregate;
pub mod cli;
pub mod data;
pub mod discount;
pub mod error;
pub mod export;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{load_sales_workbook, SalesRecord, SalesTable};
pub use error::SalesError;
pub use model::{fit_segments, predict_segment, SegmentModel};
pub use pipeline::{run_analysis, AnalysisReport, PipelineConfig};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
