//! Box-plot summaries of the per-record margin rate by region.

use super::{float_values, label, text_values, usize_values};
use crate::error::Result;
use crate::frame::{MARGIN_RATE, REGION};
use itertools::{izip, Itertools};
use polars::prelude::*;
use serde::Serialize;

const COUNT: &str = "count";
const MIN: &str = "min";
const Q1: &str = "q1";
const MEDIAN: &str = "median";
const Q3: &str = "q3";
const MAX: &str = "max";

/// Five-number summary of one region's margin rates (percent).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSummary {
    pub region: String,
    /// Records that contributed a margin rate.
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// Margin-rate distribution per region, ordered by region. Records with a
/// zero or missing amount have no rate and are skipped; a region left
/// without any rate is omitted. Quartiles interpolate linearly between
/// closest ranks.
pub fn margin_rate_by_region(df: &DataFrame) -> Result<Vec<BoxSummary>> {
    let rate = || col(MARGIN_RATE);
    let grouped = df
        .clone()
        .lazy()
        .filter(rate().is_not_null())
        .group_by([label(REGION)])
        .agg([
            len().alias(COUNT),
            rate().min().alias(MIN),
            rate()
                .quantile(lit(0.25), QuantileInterpolOptions::Linear)
                .alias(Q1),
            rate().median().alias(MEDIAN),
            rate()
                .quantile(lit(0.75), QuantileInterpolOptions::Linear)
                .alias(Q3),
            rate().max().alias(MAX),
        ])
        .collect()?;

    let stat = |name: &str| float_values(&grouped, name);
    Ok(izip!(
        text_values(&grouped, REGION)?,
        usize_values(&grouped, COUNT)?,
        stat(MIN)?,
        stat(Q1)?,
        stat(MEDIAN)?,
        stat(Q3)?,
        stat(MAX)?
    )
    .filter_map(|(region, count, min, q1, median, q3, max)| {
        Some(BoxSummary {
            region,
            count,
            min: min?,
            q1: q1?,
            median: median?,
            q3: q3?,
            max: max?,
        })
    })
    .sorted_by(|a, b| a.region.cmp(&b.region))
    .collect())
}
