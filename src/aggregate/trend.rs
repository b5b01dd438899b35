//! Time-based series: per-day totals, seller comparison, weekday and hour
//! histograms.

use super::{day_values, float_values, text_values, usize_values, ORDERS};
use crate::error::Result;
use crate::frame::{HOUR, MARGIN, ORDER_DAY, PAYMENT_AMOUNT, SELLER_NAME, WEEKDAY};
use crate::model::Weekday;
use chrono::NaiveDate;
use itertools::{izip, Itertools};
use polars::prelude::*;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SellerDailyRevenue {
    pub date: NaiveDate,
    pub seller: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotals {
    pub date: NaiveDate,
    pub revenue: f64,
    pub margin: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekdayCount {
    pub weekday: Weekday,
    pub orders: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourCount {
    pub hour: u32,
    pub orders: usize,
}

/// Daily revenue of the sellers picked for comparison only, ordered by date
/// then seller. Picking no seller yields no series.
pub fn seller_daily_trend(df: &DataFrame, sellers: &[String]) -> Result<Vec<SellerDailyRevenue>> {
    let grouped = df
        .clone()
        .lazy()
        .filter(col(SELLER_NAME).is_in(lit(Series::new("sellers", sellers))))
        .group_by([col(ORDER_DAY), col(SELLER_NAME)])
        .agg([col(PAYMENT_AMOUNT).sum()])
        .collect()?;

    let days = day_values(&grouped, ORDER_DAY)?;
    let names = text_values(&grouped, SELLER_NAME)?;
    let revenue = float_values(&grouped, PAYMENT_AMOUNT)?;

    Ok(izip!(days, names, revenue)
        .filter_map(|(date, seller, revenue)| {
            Some(SellerDailyRevenue {
                date: date?,
                seller,
                revenue: revenue.unwrap_or(0.0),
            })
        })
        .sorted_by(|a, b| (a.date, &a.seller).cmp(&(b.date, &b.seller)))
        .collect())
}

/// One row per calendar date present in the input.
pub fn daily_revenue_and_margin(df: &DataFrame) -> Result<Vec<DailyTotals>> {
    let grouped = df
        .clone()
        .lazy()
        .group_by([col(ORDER_DAY)])
        .agg([col(PAYMENT_AMOUNT).sum(), col(MARGIN).sum()])
        .collect()?;

    let days = day_values(&grouped, ORDER_DAY)?;
    let revenue = float_values(&grouped, PAYMENT_AMOUNT)?;
    let margin = float_values(&grouped, MARGIN)?;

    Ok(izip!(days, revenue, margin)
        .filter_map(|(date, revenue, margin)| {
            Some(DailyTotals {
                date: date?,
                revenue: revenue.unwrap_or(0.0),
                margin: margin.unwrap_or(0.0),
            })
        })
        .sorted_by_key(|d| d.date)
        .collect())
}

/// Always seven rows, Monday first.
pub fn orders_by_weekday(df: &DataFrame) -> Result<Vec<WeekdayCount>> {
    let counts: [usize; 7] = binned_counts(df, WEEKDAY)?;
    Ok(Weekday::ALL
        .iter()
        .zip(counts)
        .map(|(weekday, orders)| WeekdayCount {
            weekday: *weekday,
            orders,
        })
        .collect())
}

/// Always 24 rows, hour 0 first.
pub fn orders_by_hour(df: &DataFrame) -> Result<Vec<HourCount>> {
    let counts: [usize; 24] = binned_counts(df, HOUR)?;
    Ok(counts
        .iter()
        .enumerate()
        .map(|(hour, orders)| HourCount {
            hour: hour as u32,
            orders: *orders,
        })
        .collect())
}

/// Row count per value of a small integer column, zero-filled.
fn binned_counts<const N: usize>(df: &DataFrame, column: &str) -> Result<[usize; N]> {
    let grouped = df
        .clone()
        .lazy()
        .group_by([col(column)])
        .agg([len().alias(ORDERS)])
        .collect()?;

    let mut counts = [0usize; N];
    for (bin, orders) in usize_values(&grouped, column)?
        .into_iter()
        .zip(usize_values(&grouped, ORDERS)?)
    {
        if let Some(slot) = counts.get_mut(bin) {
            *slot = orders;
        }
    }
    Ok(counts)
}
