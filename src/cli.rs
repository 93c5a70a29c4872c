//! Command-line interface definitions and argument parsing

use crate::error::SalesError;
use crate::pipeline::PipelineConfig;
use clap::Parser;
use std::path::PathBuf;

/// Sales analytics CLI: aggregates, discount tiers and customer segmentation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the sales workbook (.xlsx, .xls or .ods)
    #[arg(short, long, default_value = "PenjualanABC.xlsx")]
    pub input: String,

    /// Directory receiving the exported workbooks
    #[arg(short, long, default_value = ".")]
    pub output_dir: String,

    /// Directory receiving the rendered charts
    #[arg(long, default_value = "charts")]
    pub charts_dir: String,

    /// Skip chart rendering
    #[arg(long)]
    pub no_charts: bool,

    /// Random seed for K-Means initialisation
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Maximum iterations for K-Means algorithm
    #[arg(long, default_value = "300")]
    pub max_iters: usize,

    /// Tolerance for K-Means convergence
    #[arg(long, default_value = "1e-4")]
    pub tolerance: f64,

    /// Prediction mode: provide order count and spend as comma-separated string
    /// Example: --predict "25,15000000" for 25 orders totalling 15,000,000
    #[arg(short, long)]
    pub predict: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Parse the (orders, spend) pair from the predict string
    /// Expected format: "orders,spend"
    pub fn parse_predict_values(&self) -> crate::Result<Option<(f64, f64)>> {
        let Some(ref predict_str) = self.predict else {
            return Ok(None);
        };

        let parts: Vec<&str> = predict_str.split(',').collect();
        if parts.len() != 2 {
            return Err(SalesError::InvalidPredict(
                "values must be in format 'orders,spend'".to_string(),
            )
            .into());
        }

        let orders: f64 = parts[0]
            .trim()
            .parse()
            .map_err(|_| SalesError::InvalidPredict(format!("order count '{}'", parts[0])))?;
        let spend: f64 = parts[1]
            .trim()
            .parse()
            .map_err(|_| SalesError::InvalidPredict(format!("spend '{}'", parts[1])))?;

        if orders < 0.0 || !orders.is_finite() || !spend.is_finite() {
            return Err(SalesError::InvalidPredict(predict_str.clone()).into());
        }

        Ok(Some((orders, spend)))
    }

    /// Build the pipeline configuration from the parsed flags.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            input: PathBuf::from(&self.input),
            output_dir: PathBuf::from(&self.output_dir),
            charts_dir: (!self.no_charts).then(|| PathBuf::from(&self.charts_dir)),
            seed: self.seed,
            max_iters: self.max_iters,
            tolerance: self.tolerance,
        }
    }
}
