//! Record Model
//!
//! One transaction line item of the store export, plus the derived values the
//! aggregations key on (calendar date, weekday, hour, customer identity).

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;

/// Placeholder for a missing seller name.
pub const UNKNOWN_SELLER: &str = "unknown";
/// Placeholder for a missing size.
pub const UNCLASSIFIED_SIZE: &str = "unclassified";
/// Placeholder for a missing weight.
pub const UNLABELED_WEIGHT: &str = "unlabeled";
/// Group label for records whose grouping column is missing.
pub const MISSING_LABEL: &str = "(missing)";

/// One line item. Seller, size and weight are always present (sentinels are
/// substituted at load time); every other optional column stays `None` when
/// the source cell is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub order_date: NaiveDateTime,
    pub product_name: Option<String>,
    pub size: String,
    pub weight: String,
    pub region: Option<String>,
    pub seller_name: String,
    pub payment_amount: Option<f64>,
    pub margin: Option<f64>,
    pub payment_method: Option<String>,
    pub order_quantity: Option<i64>,
    pub customer_name: Option<String>,
    pub customer_contact: Option<String>,
    pub membership_type: Option<String>,
    pub product_display_name: Option<String>,
}

impl Record {
    /// Calendar date of the order (time of day dropped).
    pub fn date(&self) -> NaiveDate {
        self.order_date.date()
    }

    pub fn hour(&self) -> u32 {
        self.order_date.hour()
    }

    pub fn weekday(&self) -> Weekday {
        Weekday::from(self.order_date.weekday())
    }

    /// Customer identity: name followed by contact.
    ///
    /// A missing contact concatenates as the empty string, so "A" with no
    /// contact is the key `"A"`. Exports that stringify the empty cell first
    /// would key it as `"Anan"` instead; the empty string is used on purpose
    /// so a blank contact never looks like a literal value.
    ///
    /// Two distinct people whose name and contact concatenate to the same
    /// string are treated as one customer, and the same person with a
    /// differently formatted contact is treated as two. This is a known
    /// precision limitation of the source data model and is kept as-is.
    pub fn customer_key(&self) -> Option<String> {
        let name = self.customer_name.as_deref()?;
        let contact = self.customer_contact.as_deref().unwrap_or("");
        Some(format!("{}{}", name, contact))
    }

    /// Per-record margin rate in percent; `None` when the amount is missing
    /// or zero.
    pub fn margin_rate(&self) -> Option<f64> {
        match (self.margin, self.payment_amount) {
            (Some(margin), Some(amount)) if amount != 0.0 => Some(margin / amount * 100.0),
            _ => None,
        }
    }
}

/// Day of week with a fixed Monday-first order, independent of locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}
