//! Headline KPIs of the performance view.

use super::{column_sum, percentage};
use crate::error::Result;
use crate::frame::{MARGIN, PAYMENT_AMOUNT, SELLER_NAME};
use polars::prelude::*;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    pub total_revenue: f64,
    pub order_count: usize,
    /// Percent; 0 when revenue is 0.
    pub average_margin_rate: f64,
    pub active_sellers: usize,
}

pub fn total_revenue(df: &DataFrame) -> Result<f64> {
    column_sum(df, PAYMENT_AMOUNT)
}

pub fn total_margin(df: &DataFrame) -> Result<f64> {
    column_sum(df, MARGIN)
}

/// Line items, not distinct orders.
pub fn order_count(df: &DataFrame) -> usize {
    df.height()
}

pub fn average_margin_rate(df: &DataFrame) -> Result<f64> {
    Ok(percentage(total_margin(df)?, total_revenue(df)?))
}

pub fn active_seller_count(df: &DataFrame) -> Result<usize> {
    Ok(df.column(SELLER_NAME)?.n_unique()?)
}

pub fn kpi_summary(df: &DataFrame) -> Result<KpiSummary> {
    Ok(KpiSummary {
        total_revenue: total_revenue(df)?,
        order_count: order_count(df),
        average_margin_rate: average_margin_rate(df)?,
        active_sellers: active_seller_count(df)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::{frame, record};

    #[test]
    fn test_kpis() {
        let a = record("2024-01-01", "Orange", 1000.0, 100.0);
        let mut b = record("2024-01-02", "Orange", 3000.0, 500.0);
        b.seller_name = "seller-b".to_string();
        let mut c = record("2024-01-03", "Kiwi", 0.0, 0.0);
        c.payment_amount = None;

        let kpis = kpi_summary(&frame(vec![a, b, c])).unwrap();
        assert_eq!(kpis.total_revenue, 4000.0);
        assert_eq!(kpis.order_count, 3);
        assert_eq!(kpis.average_margin_rate, 15.0);
        assert_eq!(kpis.active_sellers, 2);
    }

    #[test]
    fn test_margin_rate_is_zero_without_revenue() {
        assert_eq!(average_margin_rate(&frame(vec![])).unwrap(), 0.0);

        let free = record("2024-01-01", "Orange", 0.0, 10.0);
        assert_eq!(average_margin_rate(&frame(vec![free])).unwrap(), 0.0);
    }

    #[test]
    fn test_empty_summary() {
        let kpis = kpi_summary(&frame(vec![])).unwrap();
        assert_eq!(kpis.total_revenue, 0.0);
        assert_eq!(kpis.order_count, 0);
        assert_eq!(kpis.active_sellers, 0);
    }
}
