//! Integration tests for SalesForge

use calamine::{open_workbook_auto, Data, DataType, Reader};
use salesforge::export::{
    CUSTOMER_DISCOUNT_FILE, LOW_SELLER_DISCOUNT_FILE, MONTHLY_REVENUE_FILE, SEGMENTATION_FILE,
    SEGMENT_ANALYSIS_FILE,
};
use salesforge::pipeline::fit_from_workbook;
use salesforge::{predict_segment, run_analysis, PipelineConfig, SalesError};
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

/// 2022-01-01 as a spreadsheet serial day
const FIRST_SERIAL: f64 = 44562.0;

const HEADERS: [&str; 7] = [
    "SO Number",
    "SO Date",
    "Product",
    "Customer",
    "Price List Category",
    "Amount Total",
    "Sales Person",
];

/// (customer, orders, amount per order)
const CUSTOMERS: [(&str, usize, f64); 5] = [
    ("Toko A", 3, 100.0),
    ("Toko B", 12, 200.0),
    ("Toko C", 55, 1000.0),
    ("Toko D", 25, 150.0),
    ("Toko E", 1, 50.0),
];

const PRODUCTS: [&str; 3] = ["Semen", "Cat", "Paku"];

enum Cell<'a> {
    Text(&'a str),
    Number(f64),
}

/// Write a workbook with three metadata rows, the header on row 4 and data below.
fn write_workbook(path: &Path, headers: &[&str], rows: &[Vec<Cell<'_>>]) {
    let mut book = umya_spreadsheet::new_file();
    let sheet = book.get_sheet_mut(&0).unwrap();

    sheet.get_cell_mut((1, 1)).set_value_string("Laporan Penjualan");
    sheet.get_cell_mut((1, 2)).set_value_string("PT ABC");
    sheet.get_cell_mut((1, 3)).set_value_string("Periode 2022-2023");

    for (col, header) in headers.iter().enumerate() {
        sheet
            .get_cell_mut((col as u32 + 1, 4))
            .set_value_string(*header);
    }

    for (row_idx, row) in rows.iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            let cell_ref = sheet.get_cell_mut((col as u32 + 1, row_idx as u32 + 5));
            match cell {
                Cell::Text(text) => {
                    cell_ref.set_value_string(*text);
                }
                Cell::Number(number) => {
                    cell_ref.set_value_number(*number);
                }
            }
        }
    }

    umya_spreadsheet::writer::xlsx::write(&book, path).unwrap();
}

/// Sales rows for [`CUSTOMERS`]; Toko E's only order carries an unreadable date.
fn sample_rows(order_ids: &[String]) -> Vec<Vec<Cell<'_>>> {
    let mut rows = Vec::new();
    let mut idx = 0;
    for (customer, orders, amount) in CUSTOMERS {
        for _ in 0..orders {
            let date = if customer == "Toko E" {
                Cell::Text("n/a")
            } else {
                Cell::Number(FIRST_SERIAL + (idx * 7) as f64)
            };
            rows.push(vec![
                Cell::Text(&order_ids[idx]),
                date,
                Cell::Text(PRODUCTS[idx % PRODUCTS.len()]),
                Cell::Text(customer),
                Cell::Text(if idx % 2 == 0 { "Retail" } else { "Grosir" }),
                Cell::Number(amount),
                Cell::Text("Budi"),
            ]);
            idx += 1;
        }
    }
    rows
}

fn order_ids() -> Vec<String> {
    let total: usize = CUSTOMERS.iter().map(|(_, orders, _)| orders).sum();
    (1..=total).map(|i| format!("SO-{:04}", i)).collect()
}

fn sample_workbook(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("PenjualanABC.xlsx");
    let ids = order_ids();
    write_workbook(&path, &HEADERS, &sample_rows(&ids));
    path
}

fn config_for(input: PathBuf, output_dir: PathBuf) -> PipelineConfig {
    PipelineConfig {
        input,
        output_dir,
        charts_dir: None,
        seed: 42,
        max_iters: 300,
        tolerance: 1e-4,
    }
}

fn read_rows(path: &Path) -> Vec<Vec<Data>> {
    let mut workbook = open_workbook_auto(path).unwrap();
    let range = workbook.worksheet_range_at(0).unwrap().unwrap();
    range.rows().map(|r| r.to_vec()).collect()
}

fn text(cell: &Data) -> String {
    cell.as_string().unwrap_or_default()
}

#[test]
fn test_end_to_end_pipeline() {
    let dir = tempdir().unwrap();
    let input = sample_workbook(&dir);
    let out = dir.path().join("out");

    let report = run_analysis(&config_for(input, out.clone())).unwrap();

    assert_eq!(report.table.len(), 96);
    assert_eq!(report.table.missing_dates(), 1);
    assert_eq!(report.exported.len(), 5);
    assert!(report.charts.is_empty());
    for file in [
        MONTHLY_REVENUE_FILE,
        CUSTOMER_DISCOUNT_FILE,
        LOW_SELLER_DISCOUNT_FILE,
        SEGMENTATION_FILE,
        SEGMENT_ANALYSIS_FILE,
    ] {
        assert!(out.join(file).exists(), "{} missing", file);
    }

    // Every product is counted once per record
    let product_total: u64 = report
        .aggregates
        .product_ranking
        .iter()
        .map(|r| r.count)
        .sum();
    assert_eq!(product_total, 96);
    assert_eq!(report.aggregates.monthly_revenue.years, vec![2022, 2023]);
}

#[test]
fn test_customer_discount_export() {
    let dir = tempdir().unwrap();
    let input = sample_workbook(&dir);
    let out = dir.path().join("out");
    run_analysis(&config_for(input, out.clone())).unwrap();

    let rows = read_rows(&out.join(CUSTOMER_DISCOUNT_FILE));
    assert_eq!(text(&rows[0][0]), "Customer");
    assert_eq!(text(&rows[0][1]), "Jumlah Pesanan");
    assert_eq!(text(&rows[0][2]), "Diskon");

    let discounts: Vec<(String, f64, f64)> = rows[1..]
        .iter()
        .map(|r| {
            (
                text(&r[0]),
                r[1].as_f64().unwrap(),
                r[2].as_f64().unwrap(),
            )
        })
        .collect();

    assert_eq!(
        discounts,
        vec![
            ("Toko C".to_string(), 55.0, 0.20),
            ("Toko D".to_string(), 25.0, 0.10),
            ("Toko B".to_string(), 12.0, 0.05),
            ("Toko A".to_string(), 3.0, 0.0),
            ("Toko E".to_string(), 1.0, 0.0),
        ]
    );
}

#[test]
fn test_monthly_revenue_matches_dated_amounts() {
    let dir = tempdir().unwrap();
    let input = sample_workbook(&dir);
    let out = dir.path().join("out");
    run_analysis(&config_for(input, out.clone())).unwrap();

    let rows = read_rows(&out.join(MONTHLY_REVENUE_FILE));
    assert_eq!(text(&rows[0][0]), "Product");
    assert_eq!(text(&rows[0][1]), "Month");
    assert_eq!(rows[0][2].as_f64(), Some(2022.0));
    assert_eq!(rows[0][3].as_f64(), Some(2023.0));

    let pivot_total: f64 = rows[1..]
        .iter()
        .flat_map(|r| r[2..].iter().filter_map(|c| c.as_f64()))
        .sum();
    // Toko E's undated order is dropped from the pivot
    let dated_total: f64 = CUSTOMERS
        .iter()
        .filter(|(name, _, _)| *name != "Toko E")
        .map(|(_, orders, amount)| *orders as f64 * amount)
        .sum();
    assert!((pivot_total - dated_total).abs() < 1e-6);
}

#[test]
fn test_low_seller_discounts_cover_all_products() {
    let dir = tempdir().unwrap();
    let input = sample_workbook(&dir);
    let out = dir.path().join("out");
    run_analysis(&config_for(input, out.clone())).unwrap();

    let rows = read_rows(&out.join(LOW_SELLER_DISCOUNT_FILE));
    assert_eq!(text(&rows[0][2]), "Diskon yang Disarankan");
    // Fewer than ten products, so all of them are low sellers; 32 orders each
    assert_eq!(rows.len(), 1 + PRODUCTS.len());
    for row in &rows[1..] {
        assert_eq!(row[1].as_f64(), Some(32.0));
        assert_eq!(row[2].as_f64(), Some(0.15));
    }
}

#[test]
fn test_segments_follow_spend_ranking() {
    let dir = tempdir().unwrap();
    let input = sample_workbook(&dir);
    let report = run_analysis(&config_for(input, dir.path().join("out"))).unwrap();

    let segment_of = |name: &str| {
        report
            .model
            .customers
            .iter()
            .find(|c| c.customer == name)
            .and_then(|c| c.segment)
            .unwrap()
    };

    assert_eq!(report.model.customers.len(), CUSTOMERS.len());
    assert!(report
        .model
        .customers
        .iter()
        .all(|c| c.segment.map_or(false, |s| s < 4)));
    assert_eq!(segment_of("Toko C"), 0);
    assert_eq!(segment_of("Toko E"), 3);

    let counted: usize = report
        .segment_summaries
        .iter()
        .map(|s| s.customer_count)
        .sum();
    assert_eq!(counted, CUSTOMERS.len());
}

#[test]
fn test_segmentation_is_deterministic() {
    let dir = tempdir().unwrap();
    let input = sample_workbook(&dir);

    let first = run_analysis(&config_for(input.clone(), dir.path().join("run1"))).unwrap();
    let second = run_analysis(&config_for(input, dir.path().join("run2"))).unwrap();

    assert_eq!(first.model.labels, second.model.labels);
    assert_eq!(
        read_rows(&dir.path().join("run1").join(SEGMENTATION_FILE)),
        read_rows(&dir.path().join("run2").join(SEGMENTATION_FILE))
    );
}

#[test]
fn test_predict_high_value_customer() {
    let dir = tempdir().unwrap();
    let input = sample_workbook(&dir);

    let model = fit_from_workbook(&config_for(input, dir.path().join("out"))).unwrap();
    let segment = predict_segment(&model, 55.0, 55_000.0).unwrap();
    assert_eq!(segment, 0);
}

#[test]
fn test_missing_column_aborts() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.xlsx");
    let headers = ["SO Number", "SO Date", "Product", "Customer", "Amount Total"];
    write_workbook(
        &path,
        &headers,
        &[vec![
            Cell::Text("SO-0001"),
            Cell::Number(FIRST_SERIAL),
            Cell::Text("Semen"),
            Cell::Text("Toko A"),
            Cell::Number(10.0),
        ]],
    );

    let err = run_analysis(&config_for(path, dir.path().join("out"))).unwrap_err();
    assert_eq!(
        err.downcast_ref::<SalesError>(),
        Some(&SalesError::MissingColumn("Price List Category".to_string()))
    );
}

#[test]
fn test_short_sheet_aborts() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("short.xlsx");
    let mut book = umya_spreadsheet::new_file();
    let sheet = book.get_sheet_mut(&0).unwrap();
    sheet.get_cell_mut((1, 1)).set_value_string("Laporan Penjualan");
    sheet.get_cell_mut((1, 2)).set_value_string("PT ABC");
    umya_spreadsheet::writer::xlsx::write(&book, &path).unwrap();

    let err = run_analysis(&config_for(path, dir.path().join("out"))).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SalesError>(),
        Some(SalesError::SheetTooShort { .. })
    ));
}

#[test]
fn test_too_few_customers_aborts() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tiny.xlsx");
    let rows: Vec<Vec<Cell<'_>>> = ["Toko A", "Toko B"]
        .iter()
        .map(|customer| {
            vec![
                Cell::Text("SO-0001"),
                Cell::Number(FIRST_SERIAL),
                Cell::Text("Semen"),
                Cell::Text(customer),
                Cell::Text("Retail"),
                Cell::Number(10.0),
                Cell::Text("Budi"),
            ]
        })
        .collect();
    write_workbook(&path, &HEADERS, &rows);

    let err = run_analysis(&config_for(path, dir.path().join("out"))).unwrap_err();
    assert_eq!(
        err.downcast_ref::<SalesError>(),
        Some(&SalesError::NotEnoughCustomers {
            customers: 2,
            segments: 4
        })
    );
}

#[test]
fn test_pipeline_renders_every_chart() {
    let dir = tempdir().unwrap();
    let input = sample_workbook(&dir);
    let charts_dir = dir.path().join("charts");
    let config = PipelineConfig {
        charts_dir: Some(charts_dir.clone()),
        ..config_for(input, dir.path().join("out"))
    };

    let report = run_analysis(&config).unwrap();

    assert_eq!(report.charts.len(), 8);
    for path in &report.charts {
        assert!(path.starts_with(&charts_dir));
        assert!(path.exists(), "{} missing", path.display());
    }
    assert_eq!(report.table.extra_columns(), vec!["Sales Person"]);
}
