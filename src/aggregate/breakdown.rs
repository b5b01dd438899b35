//! Categorical breakdowns: shares, rankings, per-product statistics and the
//! size × weight cross tabulation.

use super::{
    float_values, group_mean, group_sum, label, optional_text_values, percentage, text_values,
    usize_values, GroupMean, GroupTotal, ORDERS,
};
use crate::error::Result;
use crate::frame::{
    MARGIN, MEMBERSHIP_TYPE, ORDER_QUANTITY, PAYMENT_AMOUNT, PAYMENT_METHOD, PRODUCT_DISPLAY_NAME,
    PRODUCT_NAME, REGION, SELLER_NAME, SIZE, WEIGHT,
};
use itertools::{izip, Itertools};
use polars::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Number of rows kept by the ranking tables.
pub const TOP_N: usize = 10;

const REVENUE_SUM: &str = "revenue_sum";
const REVENUE_MEAN: &str = "revenue_mean";
const REVENUE_MAX: &str = "revenue_max";
const MARGIN_SUM: &str = "margin_sum";
const MARGIN_MEAN: &str = "margin_mean";

/// Revenue of one product with its per-size split.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductShare {
    pub product: String,
    pub revenue: f64,
    pub sizes: Vec<GroupTotal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub key: String,
    pub count: usize,
    /// Share of all counted rows, in percent.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub payment_amount: f64,
    pub margin: f64,
    pub product: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSummary {
    pub product: String,
    pub revenue_sum: f64,
    pub revenue_mean: Option<f64>,
    pub revenue_max: Option<f64>,
    pub margin_sum: f64,
    pub margin_mean: Option<f64>,
}

/// Counts of (size, weight) combinations laid out as a grid. Rows are
/// sizes and columns are weights, both sorted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CrossTab {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub counts: Vec<Vec<usize>>,
}

impl CrossTab {
    pub fn get(&self, row: &str, column: &str) -> usize {
        let r = self.rows.iter().position(|v| v == row);
        let c = self.columns.iter().position(|v| v == column);
        match (r, c) {
            (Some(r), Some(c)) => self.counts[r][c],
            _ => 0,
        }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }
}

/// Revenue per product, nested by size.
pub fn product_size_share(df: &DataFrame) -> Result<Vec<ProductShare>> {
    let grouped = df
        .clone()
        .lazy()
        .group_by([label(PRODUCT_NAME), col(SIZE)])
        .agg([col(PAYMENT_AMOUNT).sum()])
        .collect()?;

    let products = text_values(&grouped, PRODUCT_NAME)?;
    let sizes = text_values(&grouped, SIZE)?;
    let revenue = float_values(&grouped, PAYMENT_AMOUNT)?;

    let mut nested: BTreeMap<String, Vec<GroupTotal>> = BTreeMap::new();
    for (product, size, value) in izip!(products, sizes, revenue) {
        nested.entry(product).or_default().push(GroupTotal {
            key: size,
            value: value.unwrap_or(0.0),
        });
    }

    Ok(nested
        .into_iter()
        .map(|(product, sizes)| ProductShare {
            product,
            revenue: sizes.iter().map(|s| s.value).sum(),
            sizes: sizes
                .into_iter()
                .sorted_by(|a, b| a.key.cmp(&b.key))
                .collect(),
        })
        .collect())
}

/// Order count per payment method with its percentage of all rows.
pub fn payment_method_share(df: &DataFrame) -> Result<Vec<CategoryShare>> {
    let grouped = df
        .clone()
        .lazy()
        .group_by([label(PAYMENT_METHOD)])
        .agg([len().alias(ORDERS)])
        .collect()?;

    let total = df.height() as f64;
    let methods = text_values(&grouped, PAYMENT_METHOD)?;
    let counts = usize_values(&grouped, ORDERS)?;

    Ok(methods
        .into_iter()
        .zip(counts)
        .map(|(key, count)| CategoryShare {
            key,
            count,
            percentage: percentage(count as f64, total),
        })
        .sorted_by(|a, b| a.key.cmp(&b.key))
        .collect())
}

/// Raw (amount, margin) pairs in input order; rows missing either value are
/// left out.
pub fn margin_revenue_scatter(df: &DataFrame) -> Result<Vec<ScatterPoint>> {
    let points = df
        .clone()
        .lazy()
        .filter(col(PAYMENT_AMOUNT).is_not_null().and(col(MARGIN).is_not_null()))
        .select([
            col(PAYMENT_AMOUNT),
            col(MARGIN),
            label(PRODUCT_NAME),
            col(PRODUCT_DISPLAY_NAME),
        ])
        .collect()?;

    Ok(izip!(
        float_values(&points, PAYMENT_AMOUNT)?,
        float_values(&points, MARGIN)?,
        text_values(&points, PRODUCT_NAME)?,
        optional_text_values(&points, PRODUCT_DISPLAY_NAME)?
    )
    .filter_map(|(amount, margin, product, display_name)| {
        Some(ScatterPoint {
            payment_amount: amount?,
            margin: margin?,
            product,
            display_name,
        })
    })
    .collect())
}

pub fn mean_quantity_by_product(df: &DataFrame) -> Result<Vec<GroupMean>> {
    group_mean(df, PRODUCT_NAME, ORDER_QUANTITY)
}

pub fn mean_payment_by_method(df: &DataFrame) -> Result<Vec<GroupMean>> {
    group_mean(df, PAYMENT_METHOD, PAYMENT_AMOUNT)
}

pub fn product_summary(df: &DataFrame) -> Result<Vec<ProductSummary>> {
    let grouped = df
        .clone()
        .lazy()
        .group_by([label(PRODUCT_NAME)])
        .agg([
            col(PAYMENT_AMOUNT).sum().alias(REVENUE_SUM),
            col(PAYMENT_AMOUNT).mean().alias(REVENUE_MEAN),
            col(PAYMENT_AMOUNT).max().alias(REVENUE_MAX),
            col(MARGIN).sum().alias(MARGIN_SUM),
            col(MARGIN).mean().alias(MARGIN_MEAN),
        ])
        .collect()?;

    Ok(izip!(
        text_values(&grouped, PRODUCT_NAME)?,
        float_values(&grouped, REVENUE_SUM)?,
        float_values(&grouped, REVENUE_MEAN)?,
        float_values(&grouped, REVENUE_MAX)?,
        float_values(&grouped, MARGIN_SUM)?,
        float_values(&grouped, MARGIN_MEAN)?
    )
    .map(
        |(product, revenue_sum, revenue_mean, revenue_max, margin_sum, margin_mean)| ProductSummary {
            product,
            revenue_sum: revenue_sum.unwrap_or(0.0),
            revenue_mean,
            revenue_max,
            margin_sum: margin_sum.unwrap_or(0.0),
            margin_mean,
        },
    )
    .sorted_by(|a, b| a.product.cmp(&b.product))
    .collect())
}

/// Sellers ranked by total margin, highest first.
pub fn top_sellers_by_margin(df: &DataFrame, limit: usize) -> Result<Vec<GroupTotal>> {
    Ok(top_n(group_sum(df, SELLER_NAME, MARGIN)?, limit))
}

/// Regions ranked by revenue, highest first.
pub fn region_revenue_ranking(df: &DataFrame, limit: usize) -> Result<Vec<GroupTotal>> {
    Ok(top_n(group_sum(df, REGION, PAYMENT_AMOUNT)?, limit))
}

pub fn revenue_by_membership(df: &DataFrame) -> Result<Vec<GroupTotal>> {
    group_sum(df, MEMBERSHIP_TYPE, PAYMENT_AMOUNT)
}

pub fn revenue_by_product(df: &DataFrame) -> Result<Vec<GroupTotal>> {
    group_sum(df, PRODUCT_NAME, PAYMENT_AMOUNT)
}

pub fn revenue_by_region(df: &DataFrame) -> Result<Vec<GroupTotal>> {
    group_sum(df, REGION, PAYMENT_AMOUNT)
}

pub fn revenue_by_seller(df: &DataFrame) -> Result<Vec<GroupTotal>> {
    group_sum(df, SELLER_NAME, PAYMENT_AMOUNT)
}

/// Sort key-ordered totals descending by value (ties keep key order) and
/// keep `limit` rows.
fn top_n(totals: Vec<GroupTotal>, limit: usize) -> Vec<GroupTotal> {
    totals
        .into_iter()
        .sorted_by(|a, b| b.value.total_cmp(&a.value))
        .take(limit)
        .collect()
}

pub fn size_weight_crosstab(df: &DataFrame) -> Result<CrossTab> {
    let grouped = df
        .clone()
        .lazy()
        .group_by([col(SIZE), col(WEIGHT)])
        .agg([len().alias(ORDERS)])
        .collect()?;

    let sizes = text_values(&grouped, SIZE)?;
    let weights = text_values(&grouped, WEIGHT)?;
    let counts = usize_values(&grouped, ORDERS)?;

    let rows: Vec<String> = sizes.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect();
    let columns: Vec<String> = weights.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect();
    let pairs: BTreeMap<(String, String), usize> = izip!(sizes, weights, counts)
        .map(|(size, weight, count)| ((size, weight), count))
        .collect();

    let counts = rows
        .iter()
        .map(|size| {
            columns
                .iter()
                .map(|weight| {
                    pairs
                        .get(&(size.clone(), weight.clone()))
                        .copied()
                        .unwrap_or(0)
                })
                .collect()
        })
        .collect();

    Ok(CrossTab {
        rows,
        columns,
        counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::kpi::total_revenue;
    use crate::model::test_support::{frame, record};
    use crate::model::MISSING_LABEL;

    fn sample() -> DataFrame {
        let mut records = vec![
            record("2024-01-01", "Orange", 1000.0, 100.0),
            record("2024-01-01", "Orange", 500.0, 80.0),
            record("2024-01-02", "Hallabong", 2000.0, 500.0),
            record("2024-01-03", "Kiwi", 300.0, 20.0),
        ];
        records[1].size = "M".to_string();
        records[1].payment_method = Some("transfer".to_string());
        records[2].seller_name = "seller-b".to_string();
        records[2].region = Some("Seogwipo-si".to_string());
        records[2].weight = "3kg".to_string();
        records[3].membership_type = None;
        records[3].order_quantity = Some(4);
        frame(records)
    }

    #[test]
    fn test_product_size_share_nests_sizes() {
        let shares = product_size_share(&sample()).unwrap();

        assert_eq!(shares.len(), 3);
        let orange = shares.iter().find(|s| s.product == "Orange").unwrap();
        assert_eq!(orange.revenue, 1500.0);
        assert_eq!(
            orange.sizes,
            vec![
                GroupTotal { key: "L".into(), value: 1000.0 },
                GroupTotal { key: "M".into(), value: 500.0 },
            ]
        );
    }

    #[test]
    fn test_single_key_groupings_sum_to_total_revenue() {
        let df = sample();
        let total = total_revenue(&df).unwrap();

        for groups in [
            revenue_by_product(&df).unwrap(),
            revenue_by_region(&df).unwrap(),
            revenue_by_seller(&df).unwrap(),
            revenue_by_membership(&df).unwrap(),
        ] {
            let sum: f64 = groups.iter().map(|g| g.value).sum();
            assert!((sum - total).abs() < 1e-9);
        }
        let nested: f64 = product_size_share(&df).unwrap().iter().map(|p| p.revenue).sum();
        assert!((nested - total).abs() < 1e-9);
    }

    #[test]
    fn test_missing_membership_gets_label() {
        let membership = revenue_by_membership(&sample()).unwrap();
        assert_eq!(membership[0].key, MISSING_LABEL);
        assert_eq!(membership[0].value, 300.0);
    }

    #[test]
    fn test_payment_share_percentages() {
        let shares = payment_method_share(&sample()).unwrap();
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].key, "card");
        assert_eq!(shares[0].count, 3);
        assert_eq!(shares[0].percentage, 75.0);
        assert_eq!(shares.iter().map(|s| s.percentage).sum::<f64>(), 100.0);
    }

    #[test]
    fn test_rankings() {
        let df = sample();

        let sellers = top_sellers_by_margin(&df, TOP_N).unwrap();
        assert_eq!(sellers[0], GroupTotal { key: "seller-b".into(), value: 500.0 });
        assert_eq!(sellers[1].value, 200.0);

        let regions = region_revenue_ranking(&df, 1).unwrap();
        assert_eq!(regions, vec![GroupTotal { key: "Seogwipo-si".into(), value: 2000.0 }]);
    }

    #[test]
    fn test_ranking_ties_keep_key_order() {
        let mut a = record("2024-01-01", "Orange", 100.0, 10.0);
        a.seller_name = "zeta".to_string();
        let mut b = record("2024-01-01", "Orange", 100.0, 10.0);
        b.seller_name = "alpha".to_string();

        let sellers = top_sellers_by_margin(&frame(vec![a, b]), TOP_N).unwrap();
        assert_eq!(sellers[0].key, "alpha");
        assert_eq!(sellers[1].key, "zeta");
    }

    #[test]
    fn test_product_summary_and_means() {
        let df = sample();

        let summary = product_summary(&df).unwrap();
        assert_eq!(summary[0].product, "Hallabong");
        let orange = summary.iter().find(|s| s.product == "Orange").unwrap();
        assert_eq!(orange.revenue_sum, 1500.0);
        assert_eq!(orange.revenue_mean, Some(750.0));
        assert_eq!(orange.revenue_max, Some(1000.0));
        assert_eq!(orange.margin_sum, 180.0);
        assert_eq!(orange.margin_mean, Some(90.0));

        let qty = mean_quantity_by_product(&df).unwrap();
        let kiwi = qty.iter().find(|g| g.key == "Kiwi").unwrap();
        assert_eq!(kiwi.mean, Some(4.0));

        let by_method = mean_payment_by_method(&df).unwrap();
        assert_eq!(by_method[1], GroupMean { key: "transfer".into(), mean: Some(500.0) });
    }

    #[test]
    fn test_crosstab() {
        let tab = size_weight_crosstab(&sample()).unwrap();

        assert_eq!(tab.rows, vec!["L", "M"]);
        assert_eq!(tab.columns, vec!["3kg", "5kg"]);
        assert_eq!(tab.get("L", "5kg"), 2);
        assert_eq!(tab.get("L", "3kg"), 1);
        assert_eq!(tab.get("M", "3kg"), 0);
        assert_eq!(tab.total(), 4);
    }

    #[test]
    fn test_scatter_skips_incomplete_rows() {
        let mut records = vec![
            record("2024-01-01", "Orange", 1000.0, 100.0),
            record("2024-01-02", "Kiwi", 300.0, 20.0),
        ];
        records[0].margin = None;
        let points = margin_revenue_scatter(&frame(records)).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].product, "Kiwi");
        assert_eq!(points[0].display_name.as_deref(), Some("Kiwi box"));
    }

    #[test]
    fn test_empty_inputs() {
        let empty = frame(vec![]);
        assert!(product_size_share(&empty).unwrap().is_empty());
        assert!(payment_method_share(&empty).unwrap().is_empty());
        assert!(top_sellers_by_margin(&empty, TOP_N).unwrap().is_empty());
        assert_eq!(size_weight_crosstab(&empty).unwrap(), CrossTab::default());
        assert!(product_summary(&empty).unwrap().is_empty());
        assert!(margin_revenue_scatter(&empty).unwrap().is_empty());
    }
}
