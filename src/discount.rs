//! Rule-based discount tiers derived from order counts

use crate::aggregate::RankedCount;

/// Discount recommended for an entity with a given order count
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountAssignment {
    pub name: String,
    pub orders: u64,
    pub rate: f64,
}

/// Discount for loyal customers; more orders earn a larger rate.
///
/// | orders | rate |
/// |--------|------|
/// | > 50   | 0.20 |
/// | > 30   | 0.15 |
/// | > 20   | 0.10 |
/// | > 10   | 0.05 |
/// | else   | 0.00 |
pub fn customer_discount(orders: u64) -> f64 {
    match orders {
        51.. => 0.20,
        31..=50 => 0.15,
        21..=30 => 0.10,
        11..=20 => 0.05,
        _ => 0.00,
    }
}

/// Discount to push slow-moving products; fewer orders earn a larger rate.
pub fn low_seller_discount(orders: u64) -> f64 {
    match orders {
        0..=5 => 0.25,
        6..=10 => 0.20,
        _ => 0.15,
    }
}

/// Apply `rule` to every entry of a ranking, keeping its order.
pub fn assign_discounts(ranking: &[RankedCount], rule: fn(u64) -> f64) -> Vec<DiscountAssignment> {
    ranking
        .iter()
        .map(|entry| DiscountAssignment {
            name: entry.name.clone(),
            orders: entry.count,
            rate: rule(entry.count),
        })
        .collect()
}

/// Discount table for the top customers
pub fn customer_discounts(top_customers: &[RankedCount]) -> Vec<DiscountAssignment> {
    assign_discounts(top_customers, customer_discount)
}

/// Discount table for the low-selling products
pub fn low_seller_discounts(low_sellers: &[RankedCount]) -> Vec<DiscountAssignment> {
    assign_discounts(low_sellers, low_seller_discount)
}
