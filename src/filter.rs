//! Filter Engine
//!
//! Narrows the raw dataset to the working set for one interaction. The
//! criteria compile to one polars predicate: date bounds plus an `is_in`
//! per category, combined with AND. An empty value set in any dimension
//! selects nothing, and a missing category value never matches.

use crate::error::Result;
use crate::frame::{epoch_days, ORDER_DAY, PRODUCT_NAME, REGION, SIZE, WEIGHT};
use crate::model::Record;
use chrono::NaiveDate;
use itertools::Itertools;
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Number of sellers pre-selected for the trend comparison.
pub const DEFAULT_COMPARED_SELLERS: usize = 3;

/// What the date picker produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DateSelection {
    Range(NaiveDate, NaiveDate),
    Single(NaiveDate),
}

impl DateSelection {
    /// Exactly two picked dates form a range; any other non-empty pick
    /// collapses to its first date.
    pub fn from_picked(dates: &[NaiveDate]) -> Option<Self> {
        match dates {
            [] => None,
            [start, end] => Some(DateSelection::Range(*start, *end)),
            [first, ..] => Some(DateSelection::Single(*first)),
        }
    }

    /// Inclusive (start, end) pair.
    pub fn bounds(&self) -> (NaiveDate, NaiveDate) {
        match *self {
            DateSelection::Range(start, end) => (start, end),
            DateSelection::Single(day) => (day, day),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterCriteria {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub products: BTreeSet<String>,
    pub sizes: BTreeSet<String>,
    pub weights: BTreeSet<String>,
    pub regions: BTreeSet<String>,
}

impl FilterCriteria {
    /// Criteria over the given dates with every category set empty.
    pub fn new(dates: DateSelection) -> Self {
        let (start, end) = dates.bounds();
        Self {
            start,
            end,
            products: BTreeSet::new(),
            sizes: BTreeSet::new(),
            weights: BTreeSet::new(),
            regions: BTreeSet::new(),
        }
    }

    pub fn with_dates(mut self, dates: DateSelection) -> Self {
        let (start, end) = dates.bounds();
        self.start = start;
        self.end = end;
        self
    }

    pub fn with_products<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.products = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sizes<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sizes = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_weights<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.weights = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_regions<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regions = values.into_iter().map(Into::into).collect();
        self
    }

    /// Row predicate over the dataset frame. Dates compare as days since the
    /// epoch so the open bounds of an empty dataset stay representable.
    pub fn predicate(&self) -> Expr {
        let day = || col(ORDER_DAY).cast(DataType::Int32);
        day()
            .gt_eq(lit(epoch_days(self.start)))
            .and(day().lt_eq(lit(epoch_days(self.end))))
            .and(col(PRODUCT_NAME).is_in(value_list(PRODUCT_NAME, &self.products)))
            .and(col(SIZE).is_in(value_list(SIZE, &self.sizes)))
            .and(col(WEIGHT).is_in(value_list(WEIGHT, &self.weights)))
            .and(col(REGION).is_in(value_list(REGION, &self.regions)))
    }

    /// Why this selection can never match anything, if it can't.
    pub fn degenerate_reason(&self) -> Option<String> {
        if self.start > self.end {
            return Some(format!("start date {} is after end date {}", self.start, self.end));
        }
        let empty: Vec<&str> = [
            ("products", &self.products),
            ("sizes", &self.sizes),
            ("weights", &self.weights),
            ("regions", &self.regions),
        ]
        .iter()
        .filter(|(_, set)| set.is_empty())
        .map(|(name, _)| *name)
        .collect();

        if empty.is_empty() {
            None
        } else {
            Some(format!("no {} selected", empty.join(", ")))
        }
    }
}

fn value_list(name: &str, values: &BTreeSet<String>) -> Expr {
    let values: Vec<&str> = values.iter().map(String::as_str).collect();
    lit(Series::new(name, values))
}

/// Keep the rows of `frame` that satisfy `criteria`, in input order. The
/// input frame is not modified.
pub fn filter(frame: &DataFrame, criteria: &FilterCriteria) -> Result<DataFrame> {
    if let Some(reason) = criteria.degenerate_reason() {
        warn!("Degenerate filter selection ({}); working set will be empty", reason);
    }

    let subset = frame.clone().lazy().filter(criteria.predicate()).collect()?;

    debug!(
        "Filter {}..={} kept {} of {} rows",
        criteria.start,
        criteria.end,
        subset.height(),
        frame.height()
    );
    Ok(subset)
}

/// Values the user can pick from, derived from the raw dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub products: Vec<String>,
    pub sizes: Vec<String>,
    pub weights: Vec<String>,
    pub regions: Vec<String>,
    pub sellers: Vec<String>,
}

impl FilterOptions {
    pub fn from_records(records: &[Record]) -> Self {
        let dates = records.iter().map(Record::date).minmax().into_option();

        Self {
            first_date: dates.map(|(first, _)| first),
            last_date: dates.map(|(_, last)| last),
            products: distinct(records.iter().filter_map(|r| r.product_name.as_deref())),
            sizes: distinct(records.iter().map(|r| r.size.as_str())),
            weights: distinct(records.iter().map(|r| r.weight.as_str())),
            regions: distinct(records.iter().filter_map(|r| r.region.as_deref())),
            sellers: distinct(records.iter().map(|r| r.seller_name.as_str())),
        }
    }

    /// Unconstrained criteria: the full date span and every value selected.
    pub fn select_all(&self) -> FilterCriteria {
        let start = self.first_date.unwrap_or(NaiveDate::MIN);
        let end = self.last_date.unwrap_or(NaiveDate::MAX);
        FilterCriteria::new(DateSelection::Range(start, end))
            .with_products(self.products.iter().cloned())
            .with_sizes(self.sizes.iter().cloned())
            .with_weights(self.weights.iter().cloned())
            .with_regions(self.regions.iter().cloned())
    }

    /// First sellers in sorted order, the default trend comparison.
    pub fn default_compared_sellers(&self) -> Vec<String> {
        self.sellers
            .iter()
            .take(DEFAULT_COMPARED_SELLERS)
            .cloned()
            .collect()
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values.sorted().dedup().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ROW;
    use crate::model::test_support::{frame, record};

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample() -> Vec<Record> {
        let mut records = vec![
            record("2024-01-01 08:00:00", "Orange", 1000.0, 100.0),
            record("2024-01-02 23:59:59", "Hallabong", 2000.0, 300.0),
            record("2024-01-03 12:00:00", "Orange", 500.0, 50.0),
            record("2024-01-05 00:00:00", "Kiwi", 700.0, 70.0),
        ];
        records[1].size = "M".to_string();
        records[2].region = Some("Seogwipo-si".to_string());
        records[3].product_name = None;
        records
    }

    fn kept_rows(df: &DataFrame) -> Vec<u32> {
        df.column(ROW).unwrap().u32().unwrap().into_no_null_iter().collect()
    }

    #[test]
    fn test_select_all_keeps_records_with_known_categories() {
        let records = sample();
        let criteria = FilterOptions::from_records(&records).select_all();
        let subset = filter(&frame(records), &criteria).unwrap();
        // the record with no product never matches a product set
        assert_eq!(kept_rows(&subset), vec![0, 1, 2]);
    }

    #[test]
    fn test_every_predicate_applies() {
        let records = sample();
        let criteria = FilterOptions::from_records(&records)
            .select_all()
            .with_dates(DateSelection::Range(day("2024-01-01"), day("2024-01-02")))
            .with_sizes(["L"]);
        let subset = filter(&frame(records), &criteria).unwrap();
        assert_eq!(kept_rows(&subset), vec![0]);

        let criteria = FilterOptions::from_records(&sample())
            .select_all()
            .with_products(["Orange"])
            .with_regions(["Seogwipo-si"]);
        assert_eq!(kept_rows(&filter(&frame(sample()), &criteria).unwrap()), vec![2]);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let records = sample();
        let criteria = FilterOptions::from_records(&records)
            .select_all()
            .with_regions(["Jeju-si"]);
        let once = filter(&frame(records), &criteria).unwrap();
        let twice = filter(&once, &criteria).unwrap();
        assert!(once.equals_missing(&twice));
    }

    #[test]
    fn test_empty_set_selects_nothing() {
        let records = sample();
        let criteria = FilterOptions::from_records(&records)
            .select_all()
            .with_products(Vec::<String>::new());
        assert_eq!(filter(&frame(records), &criteria).unwrap().height(), 0);
        assert!(criteria.degenerate_reason().unwrap().contains("products"));
    }

    #[test]
    fn test_single_date_collapses_range() {
        let records = sample();
        let picked = DateSelection::from_picked(&[day("2024-01-02")]).unwrap();
        assert_eq!(picked.bounds(), (day("2024-01-02"), day("2024-01-02")));

        let criteria = FilterOptions::from_records(&records).select_all().with_dates(picked);
        // 23:59:59 on the picked day is still inside it
        assert_eq!(kept_rows(&filter(&frame(records), &criteria).unwrap()), vec![1]);
    }

    #[test]
    fn test_from_picked_shapes() {
        assert_eq!(DateSelection::from_picked(&[]), None);
        let three = [day("2024-01-03"), day("2024-01-01"), day("2024-01-02")];
        assert_eq!(
            DateSelection::from_picked(&three),
            Some(DateSelection::Single(day("2024-01-03")))
        );
    }

    #[test]
    fn test_reversed_range_is_empty() {
        let records = sample();
        let criteria = FilterOptions::from_records(&records)
            .select_all()
            .with_dates(DateSelection::Range(day("2024-01-05"), day("2024-01-01")));
        assert_eq!(filter(&frame(records), &criteria).unwrap().height(), 0);
        assert!(criteria.degenerate_reason().is_some());
    }

    #[test]
    fn test_options_are_sorted_and_distinct() {
        let options = FilterOptions::from_records(&sample());
        assert_eq!(options.products, vec!["Hallabong", "Orange"]);
        assert_eq!(options.sizes, vec!["L", "M"]);
        assert_eq!(options.first_date, Some(day("2024-01-01")));
        assert_eq!(options.last_date, Some(day("2024-01-05")));
        assert_eq!(options.default_compared_sellers(), vec!["seller-a"]);
    }

    #[test]
    fn test_options_of_empty_dataset() {
        let options = FilterOptions::from_records(&[]);
        assert_eq!(options.first_date, None);
        let criteria = options.select_all();
        assert!(criteria.products.is_empty());
        // the open span still compiles to a usable predicate
        assert_eq!(filter(&frame(vec![]), &criteria).unwrap().height(), 0);
    }
}
