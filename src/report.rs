//! Console report of every intermediate table

use crate::aggregate::{
    DailySales, MonthlyRevenuePivot, RankedCount, SalesAggregates, SeasonalityPivot,
};
use crate::discount::DiscountAssignment;
use crate::model::{SegmentModel, SegmentSummary, SEGMENT_PROFILES};

/// Print a titled two-column ranking
pub fn print_ranking(title: &str, ranking: &[RankedCount]) {
    println!("\n=== {} ===", title);
    let width = ranking.iter().map(|r| r.name.chars().count()).max().unwrap_or(4).max(4);
    for entry in ranking {
        println!("  {:<width$} | {:>6}", entry.name, entry.count, width = width);
    }
}

pub fn print_sales_over_time(daily: &[DailySales]) {
    println!("\n=== Penjualan dari waktu ke waktu ===");
    for day in daily {
        println!("  {} | {:>6}", day.date.format("%Y-%m-%d"), day.orders);
    }
}

pub fn print_monthly_revenue(pivot: &MonthlyRevenuePivot) {
    println!("\n=== Pendapatan Bulanan per Produk ===");
    let width = pivot
        .rows
        .iter()
        .map(|r| r.product.chars().count())
        .max()
        .unwrap_or(7)
        .max(7);

    let years: Vec<String> = pivot.years.iter().map(|y| format!("{:>14}", y)).collect();
    println!("  {:<width$} | Month | {}", "Product", years.join(" "), width = width);
    for row in &pivot.rows {
        let cells: Vec<String> = row.revenue.iter().map(|v| format!("{:>14.2}", v)).collect();
        println!(
            "  {:<width$} | {:>5} | {}",
            row.product,
            row.month,
            cells.join(" "),
            width = width
        );
    }
}

pub fn print_seasonality(pivot: &SeasonalityPivot) {
    println!("\n=== Pola Penjualan Musiman ===");
    let years: Vec<String> = pivot.years.iter().map(|y| format!("{:>8}", y)).collect();
    println!("  Month | {}", years.join(" "));
    for row in &pivot.rows {
        let cells: Vec<String> = row
            .orders
            .iter()
            .map(|o| match o {
                Some(count) => format!("{:>8}", count),
                None => format!("{:>8}", "-"),
            })
            .collect();
        println!("  {:>5} | {}", row.month, cells.join(" "));
    }
}

pub fn print_discounts(title: &str, entity: &str, discounts: &[DiscountAssignment]) {
    println!("\n=== {} ===", title);
    let width = discounts
        .iter()
        .map(|d| d.name.chars().count())
        .max()
        .unwrap_or(0)
        .max(entity.len());
    println!("  {:<width$} | Jumlah Pesanan | Diskon", entity, width = width);
    for d in discounts {
        println!(
            "  {:<width$} | {:>14} | {:>5.0}%",
            d.name,
            d.orders,
            d.rate * 100.0,
            width = width
        );
    }
}

pub fn print_segment_summaries(summaries: &[SegmentSummary]) {
    println!("\n=== Analisis Segmentasi Customer ===");
    println!("  Segment | Customers | Avg Orders | Avg Spent");
    println!("  --------|-----------|------------|------------------");
    for s in summaries {
        println!(
            "  {:7} | {:9} | {:10.2} | {:16.2}",
            s.segment, s.customer_count, s.avg_total_orders, s.avg_total_spent
        );
    }
}

pub fn print_segment_strategies() {
    println!("\n=== Strategi yang Diusulkan ===");
    for profile in SEGMENT_PROFILES.iter() {
        println!("Segment {}: {}", profile.id, profile.description);
        println!("Marketing Strategy: {}\n", profile.strategy);
    }
}

/// Print segmentation quality: sizes, inertia, silhouette and centroids
pub fn print_segment_statistics(model: &SegmentModel) {
    let total = model.customers.len();
    println!("\n=== Segment Statistics ===");
    println!("Total customers: {}", total);
    println!("Within-cluster sum of squares (Inertia): {:.2}", model.inertia);

    let silhouette_score = model.compute_silhouette_sample(100);
    println!("Silhouette score (sample): {:.3}", silhouette_score);

    println!("\nSegment sizes:");
    for (i, &size) in model.segment_sizes().iter().enumerate() {
        let percentage = if total > 0 {
            size as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        println!("  Segment {}: {} customers ({:.1}%)", i, size, percentage);
    }

    println!("\nSegment centroids (standardised):");
    println!("  Segment | Orders | Spend");
    println!("  --------|--------|-------");
    for (i, centroid) in model.centroids.outer_iter().enumerate() {
        println!("  {:7} | {:6.2} | {:5.2}", i, centroid[0], centroid[1]);
    }
}

/// Print every descriptive aggregate
pub fn print_aggregates(aggregates: &SalesAggregates) {
    print_sales_over_time(&aggregates.sales_over_time);
    print_ranking("Produk yang Paling Banyak Terjual", &aggregates.best_sellers);
    print_ranking("Produk dengan Penjualan Rendah", &aggregates.low_sellers);
    print_ranking(
        "Top 20 Pelanggan Teratas Berdasarkan Jumlah Pemesanan",
        &aggregates.top_customers,
    );
    print_monthly_revenue(&aggregates.monthly_revenue);
    print_seasonality(&aggregates.seasonality);
    print_ranking(
        "Distribusi Pesanan Berdasarkan Kategori Harga",
        &aggregates.price_categories,
    );
}
