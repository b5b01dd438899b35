//! Data Loader
//!
//! Reads the store export once per process and hands out the parsed records
//! together with their typed polars frame. Every column is read as text by
//! polars and converted here, so that an unparseable cell is reported with
//! its line and header rather than being silently coerced.

use crate::config::{ColumnMap, DashboardConfig};
use crate::error::{DashboardError, Result};
use crate::filter::FilterOptions;
use crate::frame::{records_to_frame, ROW};
use crate::model::{Record, UNCLASSIFIED_SIZE, UNKNOWN_SELLER, UNLABELED_WEIGHT};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y/%m/%dT%H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Cell spellings read as a missing value, as spreadsheet and dataframe
/// exports write them.
pub const MISSING_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// The immutable raw dataset: parsed records and the frame the filter and
/// aggregations query.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<Record>,
    frame: DataFrame,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Result<Self> {
        let frame = records_to_frame(&records)?;
        Ok(Self { records, frame })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Records behind the rows of a frame derived from [`Dataset::frame`].
    pub fn rows(&self, frame: &DataFrame) -> Result<Vec<&Record>> {
        frame
            .column(ROW)?
            .u32()?
            .into_iter()
            .flatten()
            .map(|row| {
                self.records.get(row as usize).ok_or_else(|| {
                    DashboardError::InvalidInput(format!("Row {} is not in the dataset", row))
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Selectable filter values (date span and distinct categories).
    pub fn options(&self) -> FilterOptions {
        FilterOptions::from_records(&self.records)
    }
}

/// Loads the dataset on first use and caches it for the loader's lifetime.
///
/// The cache is written once and only read afterwards; other components
/// reach the data exclusively through [`DataLoader::load`].
pub struct DataLoader {
    config: DashboardConfig,
    cache: OnceLock<Arc<Dataset>>,
}

impl DataLoader {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            cache: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.cache.get().is_some()
    }

    /// Return the cached dataset, reading the source file on the first call.
    pub fn load(&self) -> Result<Arc<Dataset>> {
        if let Some(dataset) = self.cache.get() {
            debug!("Dataset cache hit ({} records)", dataset.len());
            return Ok(Arc::clone(dataset));
        }

        let dataset = Arc::new(read_dataset(&self.config.data_path, &self.config.columns)?);
        Ok(Arc::clone(self.cache.get_or_init(|| dataset)))
    }
}

/// Read and normalise a CSV file without caching.
pub fn read_dataset(path: &Path, columns: &ColumnMap) -> Result<Dataset> {
    if !path.exists() {
        return Err(DashboardError::DataFormat(format!(
            "Data file not found: {}",
            path.display()
        )));
    }

    info!("Loading store data from {}", path.display());

    // infer_schema_length = 0 keeps every column as String
    let df = LazyCsvReader::new(path)
        .with_infer_schema_length(Some(0))
        .finish()
        .and_then(|lf| lf.collect())
        .map_err(|e| DashboardError::DataFormat(format!("Failed to read CSV {}: {}", path.display(), e)))?;

    let records = records_from_frame(&df, columns)?;
    info!("Loaded {} records ({} columns)", records.len(), df.width());

    Dataset::new(records)
}

/// Convert an all-text frame into records, applying sentinels to seller,
/// size and weight.
pub fn records_from_frame(df: &DataFrame, columns: &ColumnMap) -> Result<Vec<Record>> {
    let order_date = text_column(df, &columns.order_date)?;
    let product_name = text_column(df, &columns.product_name)?;
    let size = text_column(df, &columns.size)?;
    let weight = text_column(df, &columns.weight)?;
    let region = text_column(df, &columns.region)?;
    let seller_name = text_column(df, &columns.seller_name)?;
    let payment_amount = text_column(df, &columns.payment_amount)?;
    let margin = text_column(df, &columns.margin)?;
    let payment_method = text_column(df, &columns.payment_method)?;
    let order_quantity = text_column(df, &columns.order_quantity)?;
    let customer_name = text_column(df, &columns.customer_name)?;
    let customer_contact = text_column(df, &columns.customer_contact)?;
    let membership_type = text_column(df, &columns.membership_type)?;
    let product_display_name = text_column(df, &columns.product_display_name)?;

    let mut records = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        // header is line 1
        let line = row + 2;

        let raw_date = cell(order_date, row).ok_or_else(|| {
            DashboardError::DataFormat(format!(
                "Line {}: column '{}' is empty",
                line, columns.order_date
            ))
        })?;
        let timestamp = parse_timestamp(raw_date).ok_or_else(|| {
            DashboardError::DataFormat(format!(
                "Line {}: cannot parse '{}' in column '{}' as a timestamp",
                line, raw_date, columns.order_date
            ))
        })?;

        records.push(Record {
            order_date: timestamp,
            product_name: owned(cell(product_name, row)),
            size: owned(cell(size, row)).unwrap_or_else(|| UNCLASSIFIED_SIZE.to_string()),
            weight: owned(cell(weight, row)).unwrap_or_else(|| UNLABELED_WEIGHT.to_string()),
            region: owned(cell(region, row)),
            seller_name: owned(cell(seller_name, row)).unwrap_or_else(|| UNKNOWN_SELLER.to_string()),
            payment_amount: parse_decimal(cell(payment_amount, row), line, &columns.payment_amount)?,
            margin: parse_decimal(cell(margin, row), line, &columns.margin)?,
            payment_method: owned(cell(payment_method, row)),
            order_quantity: parse_integer(cell(order_quantity, row), line, &columns.order_quantity)?,
            customer_name: owned(cell(customer_name, row)),
            customer_contact: owned(cell(customer_contact, row)),
            membership_type: owned(cell(membership_type, row)),
            product_display_name: owned(cell(product_display_name, row)),
        });
    }

    Ok(records)
}

fn text_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a StringChunked> {
    let series = df
        .column(name)
        .map_err(|_| DashboardError::DataFormat(format!("Missing required column '{}'", name)))?;
    series
        .str()
        .map_err(|e| DashboardError::DataFormat(format!("Column '{}' is not text: {}", name, e)))
}

/// Trimmed cell value; blank cells and [`MISSING_TOKENS`] count as missing.
fn cell(column: &StringChunked, row: usize) -> Option<&str> {
    column
        .get(row)
        .map(str::trim)
        .filter(|value| !is_missing(value))
}

fn is_missing(value: &str) -> bool {
    value.is_empty() || MISSING_TOKENS.contains(&value)
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

/// Parse an order timestamp; a bare date is taken as midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn parse_decimal(raw: Option<&str>, line: usize, column: &str) -> Result<Option<f64>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.replace(',', "").parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(DashboardError::DataFormat(format!(
            "Line {}: cannot parse '{}' in column '{}' as a finite number",
            line, raw, column
        ))),
    }
}

fn parse_integer(raw: Option<&str>, line: usize, column: &str) -> Result<Option<i64>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let cleaned = raw.replace(',', "");
    if let Ok(value) = cleaned.parse::<i64>() {
        return Ok(Some(value));
    }
    // "3.0" style exports from spreadsheet tools
    match cleaned.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 => Ok(Some(value as i64)),
        _ => Err(DashboardError::DataFormat(format!(
            "Line {}: cannot parse '{}' in column '{}' as an integer",
            line, raw, column
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(order_dates: &[&str], sellers: &[Option<&str>]) -> DataFrame {
        let n = order_dates.len();
        let text = |v: &'static str| vec![Some(v); n];
        df![
            "order_date" => order_dates.to_vec(),
            "product_name" => text("Orange"),
            "size" => vec![None::<&str>; n],
            "weight" => vec![Some("  "); n],
            "region" => text("Jeju-si"),
            "seller_name" => sellers.to_vec(),
            "payment_amount" => text("1,000"),
            "margin" => text("100.5"),
            "payment_method" => text("card"),
            "order_quantity" => text("2.0"),
            "customer_name" => text("A"),
            "customer_contact" => vec![None::<&str>; n],
            "membership_type" => text("member"),
            "product_display_name" => text("Orange 5kg")
        ]
        .unwrap()
    }

    #[test]
    fn test_sentinels_and_parsing() {
        let df = frame(&["2024-01-01 09:15:00", "2024/01/02"], &[Some("farm"), None]);
        let records = records_from_frame(&df, &ColumnMap::default()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].seller_name, "farm");
        assert_eq!(records[1].seller_name, UNKNOWN_SELLER);
        assert!(records.iter().all(|r| r.size == UNCLASSIFIED_SIZE));
        assert!(records.iter().all(|r| r.weight == UNLABELED_WEIGHT));
        assert_eq!(records[0].payment_amount, Some(1000.0));
        assert_eq!(records[0].margin, Some(100.5));
        assert_eq!(records[0].order_quantity, Some(2));
        assert_eq!(records[0].hour(), 9);
        assert_eq!(records[1].hour(), 0);
        // only seller/size/weight get sentinels
        assert_eq!(records[0].customer_contact, None);
    }

    #[test]
    fn test_missing_value_spellings() {
        let df = df![
            "order_date" => ["2024-01-01", "2024-01-02", "2024-01-03"],
            "product_name" => ["Orange", "N/A", "Kiwi"],
            "size" => ["NA", "L", "<NA>"],
            "weight" => ["null", "5kg", "#N/A"],
            "region" => ["Jeju-si", "nan", "Jeju-si"],
            "seller_name" => ["NaN", "farm", "None"],
            "payment_amount" => ["NaN", "N/A", "1,500"],
            "margin" => ["nan", "10", "NULL"],
            "payment_method" => ["card", "card", "n/a"],
            "order_quantity" => ["NA", "1", "2"],
            "customer_name" => ["A", "B", "C"],
            "customer_contact" => ["nan", "222", "333"],
            "membership_type" => ["member", "member", "member"],
            "product_display_name" => ["Orange", "-", "Kiwi"]
        ]
        .unwrap();
        let records = records_from_frame(&df, &ColumnMap::default()).unwrap();

        assert_eq!(records[0].size, UNCLASSIFIED_SIZE);
        assert_eq!(records[0].weight, UNLABELED_WEIGHT);
        assert_eq!(records[0].seller_name, UNKNOWN_SELLER);
        assert_eq!(records[0].payment_amount, None);
        assert_eq!(records[0].margin, None);
        assert_eq!(records[0].order_quantity, None);
        assert_eq!(records[0].customer_contact, None);
        assert_eq!(records[1].product_name, None);
        assert_eq!(records[1].region, None);
        assert_eq!(records[1].payment_amount, None);
        assert_eq!(records[2].size, UNCLASSIFIED_SIZE);
        assert_eq!(records[2].seller_name, UNKNOWN_SELLER);
        assert_eq!(records[2].payment_amount, Some(1500.0));
        assert_eq!(records[2].payment_method, None);
        // only the listed spellings are missing
        assert_eq!(records[1].product_display_name.as_deref(), Some("-"));
    }

    #[test]
    fn test_non_finite_number_is_rejected() {
        let mut df = frame(&["2024-01-01"], &[Some("farm")]);
        df.with_column(Series::new("payment_amount", ["inf"])).unwrap();
        match records_from_frame(&df, &ColumnMap::default()).unwrap_err() {
            DashboardError::DataFormat(msg) => {
                assert!(msg.contains("Line 2"));
                assert!(msg.contains("finite"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_dataset_rows_follow_frame() {
        let df = frame(&["2024-01-01", "2024-01-02"], &[Some("a"), Some("b")]);
        let dataset = Dataset::new(records_from_frame(&df, &ColumnMap::default()).unwrap()).unwrap();
        assert_eq!(dataset.frame().height(), 2);

        let tail = dataset.frame().slice(1, 1);
        let rows = dataset.rows(&tail).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].seller_name, "b");
    }

    #[test]
    fn test_bad_timestamp_is_data_format_error() {
        let df = frame(&["2024-01-01", "yesterday"], &[Some("farm"), Some("farm")]);
        let err = records_from_frame(&df, &ColumnMap::default()).unwrap_err();
        match err {
            DashboardError::DataFormat(msg) => assert!(msg.contains("Line 3")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_column_is_data_format_error() {
        let df = frame(&["2024-01-01"], &[Some("farm")]);
        let mut columns = ColumnMap::default();
        columns.region = "area".to_string();
        assert!(matches!(
            records_from_frame(&df, &columns),
            Err(DashboardError::DataFormat(_))
        ));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-03-05T10:20:30").is_some());
        assert!(parse_timestamp("2024-03-05 10:20").is_some());
        assert!(parse_timestamp("05.03.2024").is_none());
    }

    #[test]
    fn test_missing_file() {
        let result = read_dataset(Path::new("/definitely/not/here.csv"), &ColumnMap::default());
        assert!(matches!(result, Err(DashboardError::DataFormat(_))));
    }
}
