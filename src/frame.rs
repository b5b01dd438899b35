//! Columnar Dataset
//!
//! The filter and every aggregation run as polars lazy queries over the frame
//! built here. It holds the record fields under their canonical names plus the
//! derived columns the reducers group on.

use crate::error::Result;
use crate::model::Record;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

/// Position of the row in [`crate::loader::Dataset::records`].
pub const ROW: &str = "row";
/// `YYYY-MM-DD HH:MM:SS` text, as exported.
pub const ORDER_DATE: &str = "order_date";
pub const PRODUCT_NAME: &str = "product_name";
pub const SIZE: &str = "size";
pub const WEIGHT: &str = "weight";
pub const REGION: &str = "region";
pub const SELLER_NAME: &str = "seller_name";
pub const PAYMENT_AMOUNT: &str = "payment_amount";
pub const MARGIN: &str = "margin";
pub const PAYMENT_METHOD: &str = "payment_method";
pub const ORDER_QUANTITY: &str = "order_quantity";
pub const CUSTOMER_NAME: &str = "customer_name";
pub const CUSTOMER_CONTACT: &str = "customer_contact";
pub const MEMBERSHIP_TYPE: &str = "membership_type";
pub const PRODUCT_DISPLAY_NAME: &str = "product_display_name";

/// Calendar date of the order (`Date`).
pub const ORDER_DAY: &str = "order_day";
pub const HOUR: &str = "hour";
/// 0 = Monday .. 6 = Sunday.
pub const WEEKDAY: &str = "weekday";
pub const CUSTOMER_KEY: &str = "customer_key";
pub const MARGIN_RATE: &str = "margin_rate";

/// Record fields in export order.
pub const RAW_COLUMNS: [&str; 14] = [
    ORDER_DATE,
    PRODUCT_NAME,
    SIZE,
    WEIGHT,
    REGION,
    SELLER_NAME,
    PAYMENT_AMOUNT,
    MARGIN,
    PAYMENT_METHOD,
    ORDER_QUANTITY,
    CUSTOMER_NAME,
    CUSTOMER_CONTACT,
    MEMBERSHIP_TYPE,
    PRODUCT_DISPLAY_NAME,
];

const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Days since 1970-01-01, the physical value of a polars `Date`.
pub fn epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

pub fn records_to_frame(records: &[Record]) -> Result<DataFrame> {
    let row: Vec<u32> = (0..records.len() as u32).collect();
    let order_date: Vec<String> = records
        .iter()
        .map(|r| r.order_date.format("%Y-%m-%d %H:%M:%S").to_string())
        .collect();
    let order_day: Vec<NaiveDate> = records.iter().map(Record::date).collect();
    let hour: Vec<u32> = records.iter().map(Record::hour).collect();
    let weekday: Vec<u32> = records.iter().map(|r| r.weekday() as u32).collect();
    let payment_amount: Vec<Option<f64>> = records.iter().map(|r| r.payment_amount).collect();
    let margin: Vec<Option<f64>> = records.iter().map(|r| r.margin).collect();
    let order_quantity: Vec<Option<i64>> = records.iter().map(|r| r.order_quantity).collect();
    let customer_key: Vec<Option<String>> = records.iter().map(Record::customer_key).collect();
    let margin_rate: Vec<Option<f64>> = records.iter().map(Record::margin_rate).collect();

    let columns = vec![
        Series::new(ROW, row),
        Series::new(ORDER_DATE, order_date),
        Series::new(PRODUCT_NAME, text(records, |r| r.product_name.as_deref())),
        Series::new(SIZE, text(records, |r| Some(r.size.as_str()))),
        Series::new(WEIGHT, text(records, |r| Some(r.weight.as_str()))),
        Series::new(REGION, text(records, |r| r.region.as_deref())),
        Series::new(SELLER_NAME, text(records, |r| Some(r.seller_name.as_str()))),
        Series::new(PAYMENT_AMOUNT, payment_amount),
        Series::new(MARGIN, margin),
        Series::new(PAYMENT_METHOD, text(records, |r| r.payment_method.as_deref())),
        Series::new(ORDER_QUANTITY, order_quantity),
        Series::new(CUSTOMER_NAME, text(records, |r| r.customer_name.as_deref())),
        Series::new(CUSTOMER_CONTACT, text(records, |r| r.customer_contact.as_deref())),
        Series::new(MEMBERSHIP_TYPE, text(records, |r| r.membership_type.as_deref())),
        Series::new(PRODUCT_DISPLAY_NAME, text(records, |r| r.product_display_name.as_deref())),
        Series::new(ORDER_DAY, order_day),
        Series::new(HOUR, hour),
        Series::new(WEEKDAY, weekday),
        Series::new(CUSTOMER_KEY, customer_key),
        Series::new(MARGIN_RATE, margin_rate),
    ];

    Ok(DataFrame::new(columns)?)
}

fn text(records: &[Record], field: fn(&Record) -> Option<&str>) -> Vec<Option<String>> {
    records
        .iter()
        .map(|r| field(r).map(str::to_string))
        .collect()
}
