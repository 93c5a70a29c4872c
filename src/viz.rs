//! Chart rendering with Plotters

use crate::aggregate::{DailySales, RankedCount, SalesAggregates, SeasonalityPivot};
use crate::discount::DiscountAssignment;
use crate::model::{SegmentModel, SEGMENT_COUNT};
use anyhow::Context;
use chrono::Duration;
use plotters::prelude::*;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Color palette for different segments
const SEGMENT_COLORS: [RGBColor; SEGMENT_COUNT] = [RED, BLUE, GREEN, MAGENTA];

/// Bar labels longer than this are shortened
const MAX_LABEL_CHARS: usize = 14;

pub const SEGMENT_SCATTER_FILE: &str = "segmentasi_pelanggan.png";
pub const PRICE_CATEGORY_FILE: &str = "kategori_harga.png";
pub const LOW_SELLERS_FILE: &str = "produk_penjualan_rendah.png";
pub const BEST_SELLERS_FILE: &str = "produk_terlaris.png";
pub const TOP_CUSTOMERS_FILE: &str = "pelanggan_teratas.png";
pub const CUSTOMER_DISCOUNT_FILE: &str = "diskon_pelanggan.png";
pub const SEASONALITY_FILE: &str = "pola_penjualan_musiman.png";
pub const SALES_TREND_FILE: &str = "tren_penjualan.png";

/// Axis range covering `values` with `pad` fraction of the span on each side
pub fn padded_range(values: impl IntoIterator<Item = f64>, pad: f64) -> Range<f64> {
    let (min, max) = values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    let span = if max > min { max - min } else { max.abs().max(1.0) };
    (min - span * pad)..(max + span * pad)
}

/// Shorten a label to at most [`MAX_LABEL_CHARS`] characters
pub fn short_label(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        label.to_string()
    } else {
        let head: String = label.chars().take(MAX_LABEL_CHARS - 1).collect();
        format!("{head}…")
    }
}

/// Scatter of order count against spend, colored by segment
pub fn create_segment_scatter(model: &SegmentModel, output_path: &Path) -> crate::Result<()> {
    let orders: Vec<f64> = model.raw_features.column(0).to_vec();
    let spend: Vec<f64> = model.raw_features.column(1).to_vec();

    let root = BitMapBackend::new(output_path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Segmentasi Pelanggan", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(
            padded_range(orders.iter().copied(), 0.05),
            padded_range(spend.iter().copied(), 0.05),
        )?;

    chart
        .configure_mesh()
        .x_desc("Total Pesanan")
        .y_desc("Total Pengeluaran")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (segment, &color) in SEGMENT_COLORS.iter().enumerate() {
        let points: Vec<(f64, f64)> = model
            .labels
            .iter()
            .zip(orders.iter().zip(spend.iter()))
            .filter(|(label, _)| **label == segment)
            .map(|(_, (&x, &y))| (x, y))
            .collect();

        chart
            .draw_series(points.into_iter().map(|p| Circle::new(p, 4, color.filled())))?
            .label(format!("Segment {segment}"))
            .legend(move |(x, y)| Circle::new((x + 5, y), 4, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Vertical bar chart of one value per label
pub fn create_bar_chart(
    output_path: &Path,
    title: &str,
    x_desc: &str,
    y_desc: &str,
    bars: &[(String, f64)],
    color: RGBColor,
) -> crate::Result<()> {
    if bars.is_empty() {
        tracing::warn!(chart = title, "no data, chart skipped");
        return Ok(());
    }

    let n = bars.len() as u32;
    let y_max = bars.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    let y_max = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };

    let root = BitMapBackend::new(output_path, (1200, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d((0u32..n).into_segmented(), 0f64..y_max)?;

    let label_of = |value: &SegmentValue<u32>| match value {
        SegmentValue::CenterOf(idx) => bars
            .get(*idx as usize)
            .map(|(label, _)| short_label(label))
            .unwrap_or_default(),
        _ => String::new(),
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len())
        .x_label_formatter(&label_of)
        .x_label_style(("sans-serif", 11))
        .x_desc(x_desc)
        .y_desc(y_desc)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(color.filled())
            .margin(8)
            .data(bars.iter().enumerate().map(|(idx, (_, v))| (idx as u32, *v))),
    )?;

    root.present()?;
    Ok(())
}

/// Ranking as (label, value) bars
fn ranking_bars(ranking: &[RankedCount]) -> Vec<(String, f64)> {
    ranking
        .iter()
        .map(|r| (r.name.clone(), r.count as f64))
        .collect()
}

/// One line per year of order lines by month
pub fn create_seasonality_chart(pivot: &SeasonalityPivot, output_path: &Path) -> crate::Result<()> {
    if pivot.years.is_empty() {
        tracing::warn!("no dated sales, seasonality chart skipped");
        return Ok(());
    }

    let y_max = pivot
        .rows
        .iter()
        .flat_map(|r| r.orders.iter().flatten())
        .map(|&o| o as f64)
        .fold(0.0, f64::max);

    let root = BitMapBackend::new(output_path, (1200, 700)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Pola Penjualan Musiman", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(0.5f64..12.5f64, 0f64..(y_max * 1.1).max(1.0))?;

    chart
        .configure_mesh()
        .x_labels(12)
        .x_label_formatter(&|m| format!("{:.0}", m))
        .x_desc("Bulan")
        .y_desc("Jumlah Pesanan")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (idx, &year) in pivot.years.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        let points: Vec<(f64, f64)> = pivot
            .series(year)
            .into_iter()
            .map(|(month, orders)| (month as f64, orders as f64))
            .collect();

        chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?
            .label(year.to_string())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        chart.draw_series(points.iter().map(|&p| Circle::new(p, 4, color.filled())))?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Order lines per day over the whole period
pub fn create_sales_trend_chart(daily: &[DailySales], output_path: &Path) -> crate::Result<()> {
    let Some(first) = daily.first().map(|d| d.date) else {
        tracing::warn!("no dated sales, trend chart skipped");
        return Ok(());
    };

    let points: Vec<(f64, f64)> = daily
        .iter()
        .map(|d| ((d.date - first).num_days() as f64, d.orders as f64))
        .collect();

    let root = BitMapBackend::new(output_path, (1200, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Tren Penjualan Seiring Waktu", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(
            padded_range(points.iter().map(|p| p.0), 0.02),
            0f64..padded_range(points.iter().map(|p| p.1), 0.1).end.max(1.0),
        )?;

    let date_label = |offset: &f64| {
        Duration::try_days(offset.round() as i64)
            .and_then(|d| first.checked_add_signed(d))
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    };

    chart
        .configure_mesh()
        .x_labels(8)
        .x_label_formatter(&date_label)
        .x_desc("Tanggal")
        .y_desc("Jumlah Pesanan Penjualan")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(LineSeries::new(points.iter().copied(), BLUE.stroke_width(2)))?;
    chart.draw_series(points.iter().map(|&p| Circle::new(p, 3, BLUE.filled())))?;

    root.present()?;
    Ok(())
}

/// Render every chart of a run into `charts_dir`
///
/// # Returns
/// * Paths of the rendered charts
pub fn render_all(
    charts_dir: &Path,
    aggregates: &SalesAggregates,
    customer_discounts: &[DiscountAssignment],
    model: &SegmentModel,
) -> crate::Result<Vec<PathBuf>> {
    fs::create_dir_all(charts_dir)
        .with_context(|| format!("Failed to create chart directory {}", charts_dir.display()))?;

    let path = |name: &str| charts_dir.join(name);
    let discount_bars: Vec<(String, f64)> = customer_discounts
        .iter()
        .map(|d| (d.name.clone(), d.rate))
        .collect();

    create_segment_scatter(model, &path(SEGMENT_SCATTER_FILE))?;
    create_bar_chart(
        &path(PRICE_CATEGORY_FILE),
        "Kategori Harga",
        "Kategori Pelanggan",
        "Jumlah Pesanan",
        &ranking_bars(&aggregates.price_categories),
        GREEN,
    )?;
    create_bar_chart(
        &path(LOW_SELLERS_FILE),
        "Produk dengan Penjualan Rendah",
        "Produk",
        "Jumlah Pesanan",
        &ranking_bars(&aggregates.low_sellers),
        RED,
    )?;
    create_bar_chart(
        &path(BEST_SELLERS_FILE),
        "Produk Terlaris",
        "Produk",
        "Jumlah Pesanan",
        &ranking_bars(&aggregates.best_sellers),
        RGBColor(135, 206, 235),
    )?;
    create_bar_chart(
        &path(TOP_CUSTOMERS_FILE),
        "Pelanggan Teratas dengan Jumlah Pemesanan Terbanyak",
        "Pelanggan",
        "Jumlah Pesanan",
        &ranking_bars(&aggregates.top_customers),
        RGBColor(135, 206, 235),
    )?;
    create_bar_chart(
        &path(CUSTOMER_DISCOUNT_FILE),
        "Top 20 Pelanggan yang Mendapatkan Diskon",
        "Pelanggan",
        "Diskon",
        &discount_bars,
        RGBColor(255, 165, 0),
    )?;
    create_seasonality_chart(&aggregates.seasonality, &path(SEASONALITY_FILE))?;
    create_sales_trend_chart(&aggregates.sales_over_time, &path(SALES_TREND_FILE))?;

    let rendered: Vec<PathBuf> = [
        SEGMENT_SCATTER_FILE,
        PRICE_CATEGORY_FILE,
        LOW_SELLERS_FILE,
        BEST_SELLERS_FILE,
        TOP_CUSTOMERS_FILE,
        CUSTOMER_DISCOUNT_FILE,
        SEASONALITY_FILE,
        SALES_TREND_FILE,
    ]
    .iter()
    .map(|name| path(*name))
    .filter(|p| p.exists())
    .collect();

    tracing::debug!(charts = rendered.len(), dir = %charts_dir.display(), "rendered charts");
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::CustomerAggregate;
    use crate::model::{fit_segments, SegmentConfig};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    #[test]
    fn test_padded_range() {
        let range = padded_range([0.0, 10.0], 0.1);
        assert!((range.start + 1.0).abs() < 1e-12);
        assert!((range.end - 11.0).abs() < 1e-12);

        let single = padded_range([5.0], 0.5);
        assert!(single.start < 5.0 && single.end > 5.0);

        assert_eq!(padded_range(std::iter::empty(), 0.1), 0.0..1.0);
    }

    #[test]
    fn test_short_label() {
        assert_eq!(short_label("Semen"), "Semen");
        let long = short_label("Semen Portland Komposit 50kg");
        assert_eq!(long.chars().count(), MAX_LABEL_CHARS);
        assert!(long.ends_with('…'));
    }

    #[test]
    fn test_ranking_bars() {
        let bars = ranking_bars(&[RankedCount {
            name: "Semen".to_string(),
            count: 7,
        }]);
        assert_eq!(bars, vec![("Semen".to_string(), 7.0)]);
    }

    #[test]
    fn test_empty_charts_are_skipped() {
        let dir = tempdir().unwrap();
        let bar = dir.path().join("empty_bar.png");
        let trend = dir.path().join("empty_trend.png");
        let season = dir.path().join("empty_season.png");

        create_bar_chart(&bar, "Empty", "x", "y", &[], RED).unwrap();
        create_sales_trend_chart(&[], &trend).unwrap();
        create_seasonality_chart(&SeasonalityPivot::default(), &season).unwrap();

        assert!(!bar.exists());
        assert!(!trend.exists());
        assert!(!season.exists());
    }

    #[test]
    fn test_create_bar_chart() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("bars.png");
        let bars = vec![("Semen".to_string(), 12.0), ("Pasir".to_string(), 4.0)];

        create_bar_chart(&output, "Produk Terlaris", "Produk", "Jumlah Pesanan", &bars, BLUE)
            .unwrap();
        assert!(output.exists());
    }

    fn test_model() -> SegmentModel {
        let customers: Vec<CustomerAggregate> = [
            ("Toko A", 60, 10_000.0),
            ("Toko B", 58, 9_800.0),
            ("Toko C", 30, 5_000.0),
            ("Toko D", 29, 4_900.0),
            ("Toko E", 10, 1_000.0),
            ("Toko F", 11, 1_100.0),
            ("Toko G", 1, 50.0),
            ("Toko H", 2, 40.0),
        ]
        .into_iter()
        .map(|(name, orders, spend)| CustomerAggregate {
            customer: name.to_string(),
            total_orders: orders,
            total_spend: spend,
            segment: None,
        })
        .collect();
        fit_segments(&customers, &SegmentConfig::default()).unwrap()
    }

    #[test]
    fn test_create_segment_scatter() {
        let dir = tempdir().unwrap();
        let output = dir.path().join(SEGMENT_SCATTER_FILE);

        create_segment_scatter(&test_model(), &output).unwrap();
        assert!(output.exists());
    }

    #[test]
    fn test_create_seasonality_chart() {
        let dir = tempdir().unwrap();
        let output = dir.path().join(SEASONALITY_FILE);
        let pivot = SeasonalityPivot::from_counts(&[(2022, 1, 4), (2022, 3, 7), (2023, 1, 2)]);

        create_seasonality_chart(&pivot, &output).unwrap();
        assert!(output.exists());
    }

    #[test]
    fn test_create_sales_trend_chart() {
        let dir = tempdir().unwrap();
        let output = dir.path().join(SALES_TREND_FILE);
        let daily = vec![
            DailySales {
                date: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
                orders: 3,
            },
            DailySales {
                date: NaiveDate::from_ymd_opt(2023, 1, 9).unwrap(),
                orders: 5,
            },
        ];

        create_sales_trend_chart(&daily, &output).unwrap();
        assert!(output.exists());
    }

    #[test]
    fn test_render_all_writes_eight_charts() {
        let dir = tempdir().unwrap();
        let charts_dir = dir.path().join("charts");
        let ranking = vec![
            RankedCount {
                name: "Semen".to_string(),
                count: 9,
            },
            RankedCount {
                name: "Cat".to_string(),
                count: 4,
            },
        ];
        let aggregates = SalesAggregates {
            sales_over_time: vec![DailySales {
                date: NaiveDate::from_ymd_opt(2023, 5, 1).unwrap(),
                orders: 2,
            }],
            product_ranking: ranking.clone(),
            best_sellers: ranking.clone(),
            low_sellers: ranking.clone(),
            top_customers: ranking.clone(),
            price_categories: ranking,
            seasonality: SeasonalityPivot::from_counts(&[(2023, 5, 2)]),
            ..SalesAggregates::default()
        };
        let discounts = vec![DiscountAssignment {
            name: "Toko A".to_string(),
            orders: 60,
            rate: 0.2,
        }];

        let charts = render_all(&charts_dir, &aggregates, &discounts, &test_model()).unwrap();
        assert_eq!(charts.len(), 8);
        for path in &charts {
            assert!(path.exists(), "{} missing", path.display());
        }
    }
}
