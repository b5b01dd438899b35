//! Repurchase Rate
//!
//! Share of distinct customers, per membership type, who bought more than
//! once. Customers are identified by name + contact (see
//! [`crate::model::Record::customer_key`]), and the grouping key is the pair
//! (membership type, customer): a customer whose records carry two different
//! membership labels is counted once under each label.

use super::{label, percentage, text_values, usize_values};
use crate::error::Result;
use crate::frame::{CUSTOMER_KEY, MEMBERSHIP_TYPE};
use itertools::{izip, Itertools};
use polars::prelude::*;
use serde::Serialize;

const PURCHASES: &str = "purchases";
const CUSTOMERS: &str = "customers";
const REPEAT: &str = "repeat";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepurchaseStats {
    pub membership_type: String,
    pub total_customers: usize,
    pub repeat_customers: usize,
    /// Percent in [0, 100]; 0 when there are no customers.
    pub repurchase_rate: f64,
}

/// One row per membership type present in the input, ordered by label.
/// Records without a customer name contribute no customer, so a membership
/// type seen only on such records reports 0 customers and a 0 rate.
pub fn repurchase_rate_by_membership(df: &DataFrame) -> Result<Vec<RepurchaseStats>> {
    let grouped = df
        .clone()
        .lazy()
        .group_by([label(MEMBERSHIP_TYPE), col(CUSTOMER_KEY)])
        .agg([len().alias(PURCHASES)])
        .group_by([col(MEMBERSHIP_TYPE)])
        .agg([
            // null keys are the records without a customer
            col(CUSTOMER_KEY).count().alias(CUSTOMERS),
            col(CUSTOMER_KEY)
                .is_not_null()
                .and(col(PURCHASES).gt(lit(1)))
                .cast(DataType::UInt32)
                .sum()
                .alias(REPEAT),
        ])
        .collect()?;

    Ok(izip!(
        text_values(&grouped, MEMBERSHIP_TYPE)?,
        usize_values(&grouped, CUSTOMERS)?,
        usize_values(&grouped, REPEAT)?
    )
    .map(|(membership_type, total_customers, repeat_customers)| RepurchaseStats {
        membership_type,
        total_customers,
        repeat_customers,
        repurchase_rate: percentage(repeat_customers as f64, total_customers as f64),
    })
    .sorted_by(|a, b| a.membership_type.cmp(&b.membership_type))
    .collect())
}
