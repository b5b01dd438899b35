//! Aggregation Library
//!
//! Pure reducers over the filtered working frame. Each one is a polars lazy
//! query (`group_by(..).agg(..)`) whose result is read back into typed rows.
//! Every function accepts an empty frame and answers with zeros or empty
//! tables; divisions are guarded where they happen.
//!
//! Granularity is the line item: nothing is rolled up to order level, so an
//! order split over several lines counts once per line.

pub mod breakdown;
pub mod distribution;
pub mod kpi;
pub mod repurchase;
pub mod trend;

pub use breakdown::*;
pub use distribution::*;
pub use kpi::*;
pub use repurchase::*;
pub use trend::*;

use crate::error::Result;
use crate::model::MISSING_LABEL;
use chrono::NaiveDate;
use itertools::Itertools;
use polars::prelude::*;
use serde::Serialize;

/// Row-count column produced by `len()` aggregations.
pub(crate) const ORDERS: &str = "orders";

/// One group of a single-key aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub key: String,
    pub value: f64,
}

/// Mean of a group; `None` when the group has no usable value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMean {
    pub key: String,
    pub mean: Option<f64>,
}

/// Grouping key for a text column; missing values form their own
/// `"(missing)"` group so single-key totals still add up.
pub(crate) fn label(column: &str) -> Expr {
    col(column).fill_null(lit(MISSING_LABEL))
}

/// Sum `value` per `key`, ordered by key. Missing values are skipped; a
/// group whose values are all missing sums to 0.
pub(crate) fn group_sum(df: &DataFrame, key: &str, value: &str) -> Result<Vec<GroupTotal>> {
    let grouped = df
        .clone()
        .lazy()
        .group_by([label(key)])
        .agg([col(value).sum()])
        .collect()?;

    let keys = text_values(&grouped, key)?;
    let values = float_values(&grouped, value)?;
    Ok(keys
        .into_iter()
        .zip(values)
        .map(|(key, value)| GroupTotal {
            key,
            value: value.unwrap_or(0.0),
        })
        .sorted_by(|a, b| a.key.cmp(&b.key))
        .collect())
}

/// Mean of `value` per `key`, ordered by key.
pub(crate) fn group_mean(df: &DataFrame, key: &str, value: &str) -> Result<Vec<GroupMean>> {
    let grouped = df
        .clone()
        .lazy()
        .group_by([label(key)])
        .agg([col(value).mean()])
        .collect()?;

    let keys = text_values(&grouped, key)?;
    let means = float_values(&grouped, value)?;
    Ok(keys
        .into_iter()
        .zip(means)
        .map(|(key, mean)| GroupMean { key, mean })
        .sorted_by(|a, b| a.key.cmp(&b.key))
        .collect())
}

/// Total of one column over the whole frame; 0 when empty.
pub(crate) fn column_sum(df: &DataFrame, column: &str) -> Result<f64> {
    let totals = df.clone().lazy().select([col(column).sum()]).collect()?;
    Ok(float_values(&totals, column)?
        .into_iter()
        .next()
        .flatten()
        .unwrap_or(0.0))
}

/// `part / whole * 100`, or 0 when `whole` is 0.
pub(crate) fn percentage(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        part / whole * 100.0
    }
}

pub(crate) fn text_values(df: &DataFrame, column: &str) -> Result<Vec<String>> {
    Ok(df
        .column(column)?
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or(MISSING_LABEL).to_string())
        .collect())
}

pub(crate) fn optional_text_values(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>> {
    Ok(df
        .column(column)?
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

pub(crate) fn float_values(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>> {
    let series = df.column(column)?.cast(&DataType::Float64)?;
    let values = series.f64()?.into_iter().collect();
    Ok(values)
}

/// Counts and small indices (`len()` results, hour, weekday).
pub(crate) fn usize_values(df: &DataFrame, column: &str) -> Result<Vec<usize>> {
    let series = df.column(column)?.cast(&DataType::UInt64)?;
    let values = series
        .u64()?
        .into_iter()
        .map(|v| v.unwrap_or(0) as usize)
        .collect();
    Ok(values)
}

pub(crate) fn day_values(df: &DataFrame, column: &str) -> Result<Vec<Option<NaiveDate>>> {
    Ok(df.column(column)?.date()?.as_date_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{MARGIN, PAYMENT_AMOUNT, REGION};
    use crate::model::test_support::{frame, record};

    #[test]
    fn test_percentage_guards_zero() {
        assert_eq!(percentage(5.0, 0.0), 0.0);
        assert_eq!(percentage(1.0, 4.0), 25.0);
    }

    #[test]
    fn test_group_sum_labels_missing_keys() {
        let a = record("2024-01-01", "Orange", 100.0, 10.0);
        let mut b = record("2024-01-01", "Orange", 50.0, 5.0);
        b.region = None;
        let mut c = record("2024-01-01", "Orange", 0.0, 0.0);
        c.region = Some("Udo".to_string());
        c.payment_amount = None;

        let totals = group_sum(&frame(vec![a, b, c]), REGION, PAYMENT_AMOUNT).unwrap();
        assert_eq!(
            totals,
            vec![
                GroupTotal { key: MISSING_LABEL.into(), value: 50.0 },
                GroupTotal { key: "Jeju-si".into(), value: 100.0 },
                GroupTotal { key: "Udo".into(), value: 0.0 },
            ]
        );
    }

    #[test]
    fn test_group_mean_of_missing_values() {
        let mut a = record("2024-01-01", "Orange", 100.0, 10.0);
        a.margin = None;
        let means = group_mean(&frame(vec![a]), REGION, MARGIN).unwrap();
        assert_eq!(means, vec![GroupMean { key: "Jeju-si".into(), mean: None }]);
    }

    #[test]
    fn test_column_sum_of_empty_frame() {
        assert_eq!(column_sum(&frame(vec![]), PAYMENT_AMOUNT).unwrap(), 0.0);
    }
}
