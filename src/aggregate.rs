//! Descriptive aggregates over the cleaned sales table using Polars

use crate::data::{columns, date_from_frame, SalesTable};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Number of products reported as best sellers
pub const BEST_SELLER_COUNT: usize = 10;
/// Number of products reported as low sellers
pub const LOW_SELLER_COUNT: usize = 10;
/// Number of customers reported as top customers
pub const TOP_CUSTOMER_COUNT: usize = 20;

const ORDERS: &str = "orders";
const REVENUE: &str = "total_revenue";

/// Entity name with its number of order lines
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCount {
    pub name: String,
    pub count: u64,
}

/// Order lines recorded on one day
#[derive(Debug, Clone, PartialEq)]
pub struct DailySales {
    pub date: NaiveDate,
    pub orders: u64,
}

/// Revenue of one product in one (year, month)
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyRevenue {
    pub product: String,
    pub year: i32,
    pub month: u32,
    pub revenue: f64,
}

/// One (product, month) row of the revenue pivot
#[derive(Debug, Clone, PartialEq)]
pub struct RevenueRow {
    pub product: String,
    pub month: u32,
    /// Revenue per year, aligned with [`MonthlyRevenuePivot::years`]
    pub revenue: Vec<f64>,
}

/// Revenue pivoted to rows (product, month) by columns year.
/// Combinations without sales read as 0.0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlyRevenuePivot {
    pub years: Vec<i32>,
    pub rows: Vec<RevenueRow>,
}

impl MonthlyRevenuePivot {
    pub fn from_long(entries: &[MonthlyRevenue]) -> Self {
        let years: Vec<i32> = entries
            .iter()
            .map(|e| e.year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut cells: BTreeMap<(&str, u32), Vec<f64>> = BTreeMap::new();
        for entry in entries {
            let row = cells
                .entry((entry.product.as_str(), entry.month))
                .or_insert_with(|| vec![0.0; years.len()]);
            if let Ok(idx) = years.binary_search(&entry.year) {
                row[idx] += entry.revenue;
            }
        }

        let rows = cells
            .into_iter()
            .map(|((product, month), revenue)| RevenueRow {
                product: product.to_string(),
                month,
                revenue,
            })
            .collect();

        Self { years, rows }
    }

    /// Cell value, or `None` when the (product, month) row or the year column
    /// does not exist at all.
    pub fn get(&self, product: &str, month: u32, year: i32) -> Option<f64> {
        let col = self.years.binary_search(&year).ok()?;
        self.rows
            .iter()
            .find(|r| r.product == product && r.month == month)
            .map(|r| r.revenue[col])
    }
}

/// One month row of the seasonality pivot
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonRow {
    pub month: u32,
    /// Order lines per year, aligned with [`SeasonalityPivot::years`];
    /// `None` where the month has no sales in that year
    pub orders: Vec<Option<u64>>,
}

/// Order lines pivoted to rows month by columns year
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeasonalityPivot {
    pub years: Vec<i32>,
    pub rows: Vec<SeasonRow>,
}

impl SeasonalityPivot {
    pub fn from_counts(counts: &[(i32, u32, u64)]) -> Self {
        let years: Vec<i32> = counts
            .iter()
            .map(|(y, _, _)| *y)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut by_month: BTreeMap<u32, Vec<Option<u64>>> = BTreeMap::new();
        for &(year, month, orders) in counts {
            let row = by_month
                .entry(month)
                .or_insert_with(|| vec![None; years.len()]);
            if let Ok(idx) = years.binary_search(&year) {
                row[idx] = Some(row[idx].unwrap_or(0) + orders);
            }
        }

        let rows = by_month
            .into_iter()
            .map(|(month, orders)| SeasonRow { month, orders })
            .collect();

        Self { years, rows }
    }

    /// (month, orders) points of one year, skipping months without sales
    pub fn series(&self, year: i32) -> Vec<(u32, u64)> {
        let Ok(col) = self.years.binary_search(&year) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter_map(|r| r.orders[col].map(|o| (r.month, o)))
            .collect()
    }
}

/// Per-customer order count and spend, the input of segmentation
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerAggregate {
    pub customer: String,
    /// Rows with a non-missing `SO Number`
    pub total_orders: u64,
    pub total_spend: f64,
    /// Segment id once the customer has been clustered
    pub segment: Option<usize>,
}

/// All descriptive aggregates of one run
#[derive(Debug, Clone, Default)]
pub struct SalesAggregates {
    pub sales_over_time: Vec<DailySales>,
    /// Every product ranked by order lines
    pub product_ranking: Vec<RankedCount>,
    pub best_sellers: Vec<RankedCount>,
    pub low_sellers: Vec<RankedCount>,
    pub top_customers: Vec<RankedCount>,
    pub price_categories: Vec<RankedCount>,
    pub monthly_revenue: MonthlyRevenuePivot,
    pub seasonality: SeasonalityPivot,
}

/// Compute every descriptive aggregate of the table
pub fn aggregate_sales(table: &SalesTable) -> crate::Result<SalesAggregates> {
    let df = table.to_frame()?;

    let product_ranking = value_counts(&df, columns::PRODUCT)?;
    let customer_ranking = value_counts(&df, columns::CUSTOMER)?;

    let aggregates = SalesAggregates {
        sales_over_time: sales_over_time(&df)?,
        best_sellers: head(&product_ranking, BEST_SELLER_COUNT),
        low_sellers: tail(&product_ranking, LOW_SELLER_COUNT),
        top_customers: head(&customer_ranking, TOP_CUSTOMER_COUNT),
        price_categories: value_counts(&df, columns::PRICE_CATEGORY)?,
        monthly_revenue: MonthlyRevenuePivot::from_long(&monthly_revenue(&df)?),
        seasonality: SeasonalityPivot::from_counts(&monthly_order_counts(&df)?),
        product_ranking,
    };

    tracing::debug!(
        products = aggregates.product_ranking.len(),
        customers = customer_ranking.len(),
        days = aggregates.sales_over_time.len(),
        "computed sales aggregates"
    );

    Ok(aggregates)
}

/// Count rows per distinct non-missing value, most frequent first.
/// Equal counts are ordered by name.
pub fn value_counts(df: &DataFrame, column: &str) -> crate::Result<Vec<RankedCount>> {
    let counts = df
        .clone()
        .lazy()
        .filter(col(column).is_not_null())
        .group_by([col(column)])
        .agg([len().cast(DataType::UInt64).alias(ORDERS)])
        .sort_by_exprs(
            [col(ORDERS), col(column)],
            SortMultipleOptions::default().with_order_descending_multi([true, false]),
        )
        .collect()?;

    let names = counts.column(column)?.str()?;
    let orders = counts.column(ORDERS)?.u64()?;

    Ok(names
        .into_iter()
        .zip(orders.into_iter())
        .filter_map(|(name, count)| {
            Some(RankedCount {
                name: name?.to_string(),
                count: count?,
            })
        })
        .collect())
}

/// Order lines per order date, ascending by date
pub fn sales_over_time(df: &DataFrame) -> crate::Result<Vec<DailySales>> {
    let daily = df
        .clone()
        .lazy()
        .filter(col(columns::SO_DATE).is_not_null())
        .group_by([col(columns::SO_DATE)])
        .agg([len().cast(DataType::UInt64).alias(ORDERS)])
        .sort_by_exprs([col(columns::SO_DATE)], SortMultipleOptions::default())
        .collect()?;

    let dates = daily.column(columns::SO_DATE)?.i32()?;
    let orders = daily.column(ORDERS)?.u64()?;

    Ok(dates
        .into_iter()
        .zip(orders.into_iter())
        .filter_map(|(days, orders)| {
            Some(DailySales {
                date: date_from_frame(days?)?,
                orders: orders?,
            })
        })
        .collect())
}

/// Summed `Amount Total` per (product, year, month).
/// Rows missing any of the three keys are left out.
pub fn monthly_revenue(df: &DataFrame) -> crate::Result<Vec<MonthlyRevenue>> {
    let grouped = df
        .clone()
        .lazy()
        .filter(
            col(columns::PRODUCT)
                .is_not_null()
                .and(col(columns::YEAR).is_not_null())
                .and(col(columns::MONTH).is_not_null()),
        )
        .group_by([col(columns::PRODUCT), col(columns::YEAR), col(columns::MONTH)])
        .agg([col(columns::AMOUNT_TOTAL).sum().alias(REVENUE)])
        .sort_by_exprs(
            [col(columns::PRODUCT), col(columns::YEAR), col(columns::MONTH)],
            SortMultipleOptions::default(),
        )
        .collect()?;

    let products = grouped.column(columns::PRODUCT)?.str()?;
    let years = grouped.column(columns::YEAR)?.i32()?;
    let months = grouped.column(columns::MONTH)?.i32()?;
    let revenue = grouped.column(REVENUE)?.f64()?;

    let mut entries = Vec::with_capacity(grouped.height());
    for idx in 0..grouped.height() {
        if let (Some(product), Some(year), Some(month)) =
            (products.get(idx), years.get(idx), months.get(idx))
        {
            entries.push(MonthlyRevenue {
                product: product.to_string(),
                year,
                month: month as u32,
                revenue: revenue.get(idx).unwrap_or(0.0),
            });
        }
    }

    Ok(entries)
}

/// Order lines per (year, month)
pub fn monthly_order_counts(df: &DataFrame) -> crate::Result<Vec<(i32, u32, u64)>> {
    let grouped = df
        .clone()
        .lazy()
        .filter(
            col(columns::YEAR)
                .is_not_null()
                .and(col(columns::MONTH).is_not_null()),
        )
        .group_by([col(columns::YEAR), col(columns::MONTH)])
        .agg([len().cast(DataType::UInt64).alias(ORDERS)])
        .sort_by_exprs(
            [col(columns::YEAR), col(columns::MONTH)],
            SortMultipleOptions::default(),
        )
        .collect()?;

    let years = grouped.column(columns::YEAR)?.i32()?;
    let months = grouped.column(columns::MONTH)?.i32()?;
    let orders = grouped.column(ORDERS)?.u64()?;

    Ok((0..grouped.height())
        .filter_map(|idx| Some((years.get(idx)?, months.get(idx)? as u32, orders.get(idx)?)))
        .collect())
}

/// Order count and summed spend of every customer, ordered by customer name
pub fn customer_totals(table: &SalesTable) -> crate::Result<Vec<CustomerAggregate>> {
    let df = table.to_frame()?;
    let grouped = df
        .lazy()
        .filter(col(columns::CUSTOMER).is_not_null())
        .group_by([col(columns::CUSTOMER)])
        .agg([
            col(columns::SO_NUMBER)
                .count()
                .cast(DataType::UInt64)
                .alias(ORDERS),
            col(columns::AMOUNT_TOTAL).sum().alias(REVENUE),
        ])
        .sort_by_exprs([col(columns::CUSTOMER)], SortMultipleOptions::default())
        .collect()?;

    let customers = grouped.column(columns::CUSTOMER)?.str()?;
    let orders = grouped.column(ORDERS)?.u64()?;
    let spend = grouped.column(REVENUE)?.f64()?;

    Ok((0..grouped.height())
        .filter_map(|idx| {
            Some(CustomerAggregate {
                customer: customers.get(idx)?.to_string(),
                total_orders: orders.get(idx).unwrap_or(0),
                total_spend: spend.get(idx).unwrap_or(0.0),
                segment: None,
            })
        })
        .collect())
}

fn head(ranking: &[RankedCount], n: usize) -> Vec<RankedCount> {
    ranking.iter().take(n).cloned().collect()
}

fn tail(ranking: &[RankedCount], n: usize) -> Vec<RankedCount> {
    ranking[ranking.len().saturating_sub(n)..].to_vec()
}
