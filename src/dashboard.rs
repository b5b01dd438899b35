//! Dashboard View Model
//!
//! One interaction = one call to [`render`]: filter the dataset frame with
//! the current criteria and run every aggregation over the result. Nothing
//! is kept between calls.

use crate::aggregate::{self, *};
use crate::error::Result;
use crate::filter::{filter, FilterCriteria};
use crate::loader::Dataset;
use crate::model::Record;
use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::{info, warn};

/// Which view(s) to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewSelection {
    Performance,
    Analysis,
    #[default]
    All,
}

/// Per-interaction options that are not filters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderOptions {
    /// Sellers drawn in the trend comparison.
    pub compared_sellers: Vec<String>,
    pub view: ViewSelection,
    /// Include the filtered rows themselves.
    pub include_raw: bool,
}

/// Operational view: KPIs and sales trends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceView {
    pub kpis: KpiSummary,
    pub compared_sellers: Vec<String>,
    pub seller_trend: Vec<SellerDailyRevenue>,
    pub daily: Vec<DailyTotals>,
    pub product_size_share: Vec<ProductShare>,
}

/// Exploratory view: distributions and statistics tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisView {
    pub orders_by_weekday: Vec<WeekdayCount>,
    pub payment_method_share: Vec<CategoryShare>,
    pub margin_revenue_scatter: Vec<ScatterPoint>,
    pub orders_by_hour: Vec<HourCount>,
    pub margin_rate_by_region: Vec<BoxSummary>,
    pub mean_quantity_by_product: Vec<GroupMean>,
    pub repurchase: Vec<RepurchaseStats>,
    pub product_summary: Vec<ProductSummary>,
    pub region_revenue_ranking: Vec<GroupTotal>,
    pub mean_payment_by_method: Vec<GroupMean>,
    pub top_sellers_by_margin: Vec<GroupTotal>,
    pub size_weight: CrossTab,
    pub revenue_by_membership: Vec<GroupTotal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub criteria: FilterCriteria,
    pub matched_records: usize,
    pub total_records: usize,
    pub performance: Option<PerformanceView>,
    pub analysis: Option<AnalysisView>,
    pub raw: Option<Vec<Record>>,
}

impl DashboardView {
    pub fn is_empty(&self) -> bool {
        self.matched_records == 0
    }
}

/// Recompute the whole dashboard for one set of criteria.
pub fn render(dataset: &Dataset, criteria: &FilterCriteria, options: &RenderOptions) -> Result<DashboardView> {
    let working = filter(dataset.frame(), criteria)?;

    if working.height() == 0 {
        warn!("No records match the current filters; reporting empty results");
    } else {
        info!(
            "Rendering dashboard over {} of {} records",
            working.height(),
            dataset.len()
        );
    }

    let performance = matches!(options.view, ViewSelection::Performance | ViewSelection::All)
        .then(|| performance_view(&working, &options.compared_sellers))
        .transpose()?;
    let analysis = matches!(options.view, ViewSelection::Analysis | ViewSelection::All)
        .then(|| analysis_view(&working))
        .transpose()?;
    let raw = if options.include_raw {
        Some(dataset.rows(&working)?.into_iter().cloned().collect())
    } else {
        None
    };

    Ok(DashboardView {
        criteria: criteria.clone(),
        matched_records: working.height(),
        total_records: dataset.len(),
        performance,
        analysis,
        raw,
    })
}

pub fn performance_view(df: &DataFrame, compared_sellers: &[String]) -> Result<PerformanceView> {
    Ok(PerformanceView {
        kpis: kpi_summary(df)?,
        compared_sellers: compared_sellers.to_vec(),
        seller_trend: seller_daily_trend(df, compared_sellers)?,
        daily: daily_revenue_and_margin(df)?,
        product_size_share: product_size_share(df)?,
    })
}

pub fn analysis_view(df: &DataFrame) -> Result<AnalysisView> {
    Ok(AnalysisView {
        orders_by_weekday: orders_by_weekday(df)?,
        payment_method_share: payment_method_share(df)?,
        margin_revenue_scatter: margin_revenue_scatter(df)?,
        orders_by_hour: orders_by_hour(df)?,
        margin_rate_by_region: margin_rate_by_region(df)?,
        mean_quantity_by_product: mean_quantity_by_product(df)?,
        repurchase: repurchase_rate_by_membership(df)?,
        product_summary: product_summary(df)?,
        region_revenue_ranking: region_revenue_ranking(df, aggregate::TOP_N)?,
        mean_payment_by_method: mean_payment_by_method(df)?,
        top_sellers_by_margin: top_sellers_by_margin(df, aggregate::TOP_N)?,
        size_weight: size_weight_crosstab(df)?,
        revenue_by_membership: revenue_by_membership(df)?,
    })
}
