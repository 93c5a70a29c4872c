//! SalesForge: sales analytics CLI
//!
//! Main entrypoint: either runs the whole analysis or, with `--predict`,
//! fits the segmentation and classifies a single hypothetical customer.

use anyhow::Result;
use clap::Parser;
use salesforge::model::segment_profile;
use salesforge::pipeline::fit_from_workbook;
use salesforge::{predict_segment, report, run_analysis, Args};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    if let Some((orders, spend)) = args.parse_predict_values()? {
        run_prediction_mode(&args, orders, spend)?;
    } else {
        run_full_pipeline(&args)?;
    }

    Ok(())
}

/// `RUST_LOG` wins over the verbosity flag
fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Fit on the workbook, then place one customer in a segment
fn run_prediction_mode(args: &Args, orders: f64, spend: f64) -> Result<()> {
    println!("=== Prediction Mode ===");
    println!("Input: orders={}, spend={:.2}", orders, spend);

    let start_time = Instant::now();
    let model = fit_from_workbook(&args.pipeline_config())?;
    let segment = predict_segment(&model, orders, spend)?;

    println!("\n✓ Predicted Segment: {}", segment);
    println!("  Processing time: {:.2}s", start_time.elapsed().as_secs_f64());

    let sizes = model.segment_sizes();
    let total = model.customers.len();
    println!("\nSegment {} details:", segment);
    println!(
        "  Size: {} customers ({:.1}% of total)",
        sizes[segment],
        sizes[segment] as f64 / total as f64 * 100.0
    );
    if let Some(profile) = segment_profile(segment) {
        println!("  Profile: {}", profile.description);
        println!("  Marketing Strategy: {}", profile.strategy);
    }

    Ok(())
}

fn run_full_pipeline(args: &Args) -> Result<()> {
    println!("=== Sales Analysis Pipeline ===");

    let start_time = Instant::now();
    let report = run_analysis(&args.pipeline_config())?;

    report::print_aggregates(&report.aggregates);
    report::print_discounts(
        "Diskon untuk Top 20 Pelanggan",
        "Customer",
        &report.customer_discounts,
    );
    report::print_discounts(
        "Diskon Produk dengan Penjualan Rendah",
        "Product",
        &report.low_seller_discounts,
    );
    report::print_segment_summaries(&report.segment_summaries);
    report::print_segment_statistics(&report.model);
    report::print_segment_strategies();

    println!("\n=== Pipeline Complete ===");
    println!(
        "Total processing time: {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    for path in report.exported.iter().chain(report.charts.iter()) {
        println!("Saved: {}", path.display());
    }

    Ok(())
}
