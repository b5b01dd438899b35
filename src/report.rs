//! Terminal Presentation
//!
//! Prints a [`DashboardView`] as plain-text sections, and writes filtered
//! rows as CSV for the raw-data inspection output.

use crate::dashboard::{AnalysisView, DashboardView, PerformanceView};
use crate::error::Result;
use crate::filter::FilterOptions;
use crate::frame::{records_to_frame, RAW_COLUMNS};
use polars::prelude::*;
use std::io::Write;

const WIDTH: usize = 80;

/// `₩1,234,568` style amount, rounded to whole units.
pub fn format_currency(value: f64) -> String {
    format!("₩{}", group_thousands(value.round() as i64))
}

pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

fn header(out: &mut impl Write, title: &str) -> Result<()> {
    writeln!(out, "\n{}", "=".repeat(WIDTH))?;
    writeln!(out, " {}", title)?;
    writeln!(out, "{}", "=".repeat(WIDTH))?;
    Ok(())
}

fn subsection(out: &mut impl Write, title: &str) -> Result<()> {
    writeln!(out, "\n {}", title)?;
    writeln!(out, "{}", "-".repeat(WIDTH))?;
    Ok(())
}

pub fn write_dashboard(out: &mut impl Write, view: &DashboardView) -> Result<()> {
    header(out, "STORE DASHBOARD")?;
    writeln!(
        out,
        " Period: {} ~ {}   Matched: {} / {} records",
        view.criteria.start, view.criteria.end, view.matched_records, view.total_records
    )?;
    if view.is_empty() {
        writeln!(out, " No records match the current filters.")?;
    }

    if let Some(performance) = &view.performance {
        write_performance(out, performance)?;
    }
    if let Some(analysis) = &view.analysis {
        write_analysis(out, analysis)?;
    }
    if let Some(raw) = &view.raw {
        subsection(out, "Filtered records")?;
        write_raw_csv(out, &records_to_frame(raw)?)?;
    }
    Ok(())
}

pub fn write_performance(out: &mut impl Write, view: &PerformanceView) -> Result<()> {
    header(out, "PERFORMANCE")?;
    let kpis = &view.kpis;
    writeln!(out, " Total revenue      {}", format_currency(kpis.total_revenue))?;
    writeln!(out, " Orders             {}", group_thousands(kpis.order_count as i64))?;
    writeln!(out, " Avg margin rate    {:.1}%", kpis.average_margin_rate)?;
    writeln!(out, " Active sellers     {}", kpis.active_sellers)?;

    subsection(out, &format!("Seller trend ({})", view.compared_sellers.join(", ")))?;
    for point in &view.seller_trend {
        writeln!(out, "   {}  {:<20} {:>16}", point.date, point.seller, format_currency(point.revenue))?;
    }

    subsection(out, "Daily revenue and margin")?;
    for day in &view.daily {
        writeln!(
            out,
            "   {}  revenue {:>16}  margin {:>14}",
            day.date,
            format_currency(day.revenue),
            format_currency(day.margin)
        )?;
    }

    subsection(out, "Revenue by product / size")?;
    for product in &view.product_size_share {
        writeln!(out, "   {:<24} {:>16}", product.product, format_currency(product.revenue))?;
        for size in &product.sizes {
            writeln!(out, "     - {:<20} {:>16}", size.key, format_currency(size.value))?;
        }
    }
    Ok(())
}

pub fn write_analysis(out: &mut impl Write, view: &AnalysisView) -> Result<()> {
    header(out, "DATA ANALYSIS")?;

    subsection(out, "1. Orders by weekday")?;
    for row in &view.orders_by_weekday {
        writeln!(out, "   {:<10} {:>8}", row.weekday, row.orders)?;
    }

    subsection(out, "2. Payment methods")?;
    for row in &view.payment_method_share {
        writeln!(out, "   {:<20} {:>8}  {:>5.1}%", row.key, row.count, row.percentage)?;
    }

    subsection(out, "3. Amount vs margin")?;
    writeln!(out, "   {} points", view.margin_revenue_scatter.len())?;

    subsection(out, "4. Orders by hour")?;
    for row in view.orders_by_hour.iter().filter(|h| h.orders > 0) {
        writeln!(out, "   {:02}h {:>8}", row.hour, row.orders)?;
    }

    subsection(out, "5. Margin rate by region (%)")?;
    writeln!(
        out,
        "   {:<16} {:>6} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "region", "n", "min", "q1", "median", "q3", "max"
    )?;
    for b in &view.margin_rate_by_region {
        writeln!(
            out,
            "   {:<16} {:>6} {:>8.1} {:>8.1} {:>8.1} {:>8.1} {:>8.1}",
            b.region, b.count, b.min, b.q1, b.median, b.q3, b.max
        )?;
    }

    subsection(out, "6. Mean order quantity by product")?;
    for row in &view.mean_quantity_by_product {
        writeln!(out, "   {:<24} {:>8}", row.key, format_mean(row.mean))?;
    }

    subsection(out, "7. Repurchase rate by membership")?;
    for row in &view.repurchase {
        writeln!(
            out,
            "   {:<16} customers {:>6}  repeat {:>6}  rate {:>5.1}%",
            row.membership_type, row.total_customers, row.repeat_customers, row.repurchase_rate
        )?;
    }

    subsection(out, "Product statistics")?;
    for row in &view.product_summary {
        writeln!(
            out,
            "   {:<16} sum {:>14} mean {:>12} max {:>12} margin {:>12} / {:>10}",
            row.product,
            format_currency(row.revenue_sum),
            format_optional_currency(row.revenue_mean),
            format_optional_currency(row.revenue_max),
            format_currency(row.margin_sum),
            format_optional_currency(row.margin_mean)
        )?;
    }

    subsection(out, "Revenue ranking by region")?;
    for row in &view.region_revenue_ranking {
        writeln!(out, "   {:<24} {:>16}", row.key, format_currency(row.value))?;
    }

    subsection(out, "Mean payment by method")?;
    for row in &view.mean_payment_by_method {
        writeln!(out, "   {:<24} {:>16}", row.key, format_optional_currency(row.mean))?;
    }

    subsection(out, "Top sellers by margin")?;
    for row in &view.top_sellers_by_margin {
        writeln!(out, "   {:<24} {:>16}", row.key, format_currency(row.value))?;
    }

    subsection(out, "Size x weight orders")?;
    write!(out, "   {:<14}", "")?;
    for column in &view.size_weight.columns {
        write!(out, " {:>10}", column)?;
    }
    writeln!(out)?;
    for (size, counts) in view.size_weight.rows.iter().zip(&view.size_weight.counts) {
        write!(out, "   {:<14}", size)?;
        for count in counts {
            write!(out, " {:>10}", count)?;
        }
        writeln!(out)?;
    }

    subsection(out, "Revenue by membership")?;
    for row in &view.revenue_by_membership {
        writeln!(out, "   {:<24} {:>16}", row.key, format_currency(row.value))?;
    }
    Ok(())
}

fn format_mean(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

fn format_optional_currency(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), format_currency)
}

pub fn write_options(out: &mut impl Write, options: &FilterOptions) -> Result<()> {
    header(out, "FILTER OPTIONS")?;
    let span = match (options.first_date, options.last_date) {
        (Some(first), Some(last)) => format!("{} ~ {}", first, last),
        _ => "(no data)".to_string(),
    };
    writeln!(out, " Dates    {}", span)?;
    writeln!(out, " Products {}", options.products.join(", "))?;
    writeln!(out, " Sizes    {}", options.sizes.join(", "))?;
    writeln!(out, " Weights  {}", options.weights.join(", "))?;
    writeln!(out, " Regions  {}", options.regions.join(", "))?;
    writeln!(out, " Sellers  {}", options.sellers.join(", "))?;
    Ok(())
}

/// Write the record columns of a dataset frame as CSV with a header line.
/// Derived columns are left out.
pub fn write_raw_csv(out: &mut impl Write, frame: &DataFrame) -> Result<()> {
    let mut raw = frame.select(RAW_COLUMNS)?;
    CsvWriter::new(out).include_header(true).finish(&mut raw)?;
    Ok(())
}
