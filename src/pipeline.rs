//! End-to-end analysis run: load, aggregate, discount, segment, export, chart

use crate::aggregate::{aggregate_sales, customer_totals, SalesAggregates};
use crate::data::{load_sales_workbook, SalesTable};
use crate::discount::{customer_discounts, low_seller_discounts, DiscountAssignment};
use crate::export::{export_all, ExportInputs};
use crate::model::{fit_segments, SegmentConfig, SegmentModel, SegmentSummary};
use crate::viz;
use std::path::PathBuf;
use std::time::Instant;

/// Inputs and knobs of a single run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    /// `None` skips chart rendering
    pub charts_dir: Option<PathBuf>,
    pub seed: u64,
    pub max_iters: usize,
    pub tolerance: f64,
}

impl PipelineConfig {
    pub fn segment_config(&self) -> SegmentConfig {
        SegmentConfig {
            seed: self.seed,
            max_iters: self.max_iters,
            tolerance: self.tolerance,
        }
    }
}

/// Everything a run produced
#[derive(Debug)]
pub struct AnalysisReport {
    pub table: SalesTable,
    pub aggregates: SalesAggregates,
    pub customer_discounts: Vec<DiscountAssignment>,
    pub low_seller_discounts: Vec<DiscountAssignment>,
    pub model: SegmentModel,
    pub segment_summaries: Vec<SegmentSummary>,
    pub exported: Vec<PathBuf>,
    pub charts: Vec<PathBuf>,
}

/// Load the workbook and fit the customer segmentation only
pub fn fit_from_workbook(config: &PipelineConfig) -> crate::Result<SegmentModel> {
    let table = load_sales_workbook(&config.input)?;
    let customers = customer_totals(&table)?;
    fit_segments(&customers, &config.segment_config())
}

/// Run every stage once, writing workbooks and (optionally) charts
pub fn run_analysis(config: &PipelineConfig) -> crate::Result<AnalysisReport> {
    let started = Instant::now();

    let stage = Instant::now();
    let table = load_sales_workbook(&config.input)?;
    tracing::info!(
        rows = table.len(),
        missing_dates = table.missing_dates(),
        elapsed_ms = stage.elapsed().as_millis() as u64,
        "loaded {}",
        config.input.display()
    );

    let stage = Instant::now();
    let aggregates = aggregate_sales(&table)?;
    let customer_discounts = customer_discounts(&aggregates.top_customers);
    let low_seller_discounts = low_seller_discounts(&aggregates.low_sellers);
    tracing::info!(
        products = aggregates.product_ranking.len(),
        elapsed_ms = stage.elapsed().as_millis() as u64,
        "computed aggregates"
    );

    let stage = Instant::now();
    let customers = customer_totals(&table)?;
    let model = fit_segments(&customers, &config.segment_config())?;
    let segment_summaries = model.summaries();
    tracing::info!(
        customers = customers.len(),
        inertia = model.inertia,
        elapsed_ms = stage.elapsed().as_millis() as u64,
        "segmented customers"
    );

    let exported = export_all(
        &config.output_dir,
        &ExportInputs {
            monthly_revenue: &aggregates.monthly_revenue,
            customer_discounts: &customer_discounts,
            low_seller_discounts: &low_seller_discounts,
            customers: &model.customers,
            segment_summaries: &segment_summaries,
        },
    )?;
    tracing::info!(files = exported.len(), "exported workbooks to {}", config.output_dir.display());

    let charts = match &config.charts_dir {
        Some(dir) => {
            let charts = viz::render_all(dir, &aggregates, &customer_discounts, &model)?;
            tracing::info!(charts = charts.len(), "rendered charts to {}", dir.display());
            charts
        }
        None => Vec::new(),
    };

    tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, "analysis finished");

    Ok(AnalysisReport {
        table,
        aggregates,
        customer_discounts,
        low_seller_discounts,
        model,
        segment_summaries,
        exported,
        charts,
    })
}
