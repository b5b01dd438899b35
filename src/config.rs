//! Dashboard Configuration
//!
//! Where the dataset lives and how its headers map onto record fields.
//! Values come from the environment (optionally via `.env`) and can be
//! overridden by CLI flags.

use crate::error::{DashboardError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_DATA_PATH: &str = "DASHBOARD_DATA_PATH";
pub const ENV_COLUMN_MAP: &str = "DASHBOARD_COLUMN_MAP";
pub const ENV_PRESET: &str = "DASHBOARD_PRESET";

const DEFAULT_DATA_PATH: &str = "data/store.csv";

/// Header name for each record field in the source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub order_date: String,
    pub product_name: String,
    pub size: String,
    pub weight: String,
    pub region: String,
    pub seller_name: String,
    pub payment_amount: String,
    pub margin: String,
    pub payment_method: String,
    pub order_quantity: String,
    pub customer_name: String,
    pub customer_contact: String,
    pub membership_type: String,
    pub product_display_name: String,
}

impl Default for ColumnMap {
    /// Headers equal to the field names.
    fn default() -> Self {
        Self {
            order_date: "order_date".to_string(),
            product_name: "product_name".to_string(),
            size: "size".to_string(),
            weight: "weight".to_string(),
            region: "region".to_string(),
            seller_name: "seller_name".to_string(),
            payment_amount: "payment_amount".to_string(),
            margin: "margin".to_string(),
            payment_method: "payment_method".to_string(),
            order_quantity: "order_quantity".to_string(),
            customer_name: "customer_name".to_string(),
            customer_contact: "customer_contact".to_string(),
            membership_type: "membership_type".to_string(),
            product_display_name: "product_display_name".to_string(),
        }
    }
}

impl ColumnMap {
    /// Korean headers of the Jeju fruit store export.
    pub fn jeju() -> Self {
        Self {
            order_date: "주문일".to_string(),
            product_name: "과일명".to_string(),
            size: "크기".to_string(),
            weight: "중량".to_string(),
            region: "지역".to_string(),
            seller_name: "셀러명".to_string(),
            payment_amount: "결제금액(상품별)".to_string(),
            margin: "마진".to_string(),
            payment_method: "결제방법".to_string(),
            order_quantity: "주문수량".to_string(),
            customer_name: "주문자명".to_string(),
            customer_contact: "주문자연락처".to_string(),
            membership_type: "회원구분".to_string(),
            product_display_name: "상품명".to_string(),
        }
    }

    pub fn preset(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "default" | "" => Ok(Self::default()),
            "jeju" => Ok(Self::jeju()),
            other => Err(DashboardError::Config(format!(
                "Unknown column preset '{}' (expected 'default' or 'jeju')",
                other
            ))),
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| DashboardError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| DashboardError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// All header names, in field order.
    pub fn headers(&self) -> [&str; 14] {
        [
            self.order_date.as_str(),
            self.product_name.as_str(),
            self.size.as_str(),
            self.weight.as_str(),
            self.region.as_str(),
            self.seller_name.as_str(),
            self.payment_amount.as_str(),
            self.margin.as_str(),
            self.payment_method.as_str(),
            self.order_quantity.as_str(),
            self.customer_name.as_str(),
            self.customer_contact.as_str(),
            self.membership_type.as_str(),
            self.product_display_name.as_str(),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub data_path: PathBuf,
    pub columns: ColumnMap,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            columns: ColumnMap::default(),
        }
    }
}

impl DashboardConfig {
    /// Build from `DASHBOARD_*` environment variables. A column map file takes
    /// precedence over a preset name.
    pub fn from_env() -> Result<Self> {
        let data_path = std::env::var(ENV_DATA_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_PATH));

        let columns = match (std::env::var(ENV_COLUMN_MAP).ok(), std::env::var(ENV_PRESET).ok()) {
            (Some(map_path), _) => ColumnMap::from_json_file(map_path)?,
            (None, Some(preset)) => ColumnMap::preset(&preset)?,
            (None, None) => ColumnMap::default(),
        };

        Ok(Self { data_path, columns })
    }

    pub fn with_data_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.data_path = path;
        }
        self
    }

    pub fn with_columns(mut self, columns: Option<ColumnMap>) -> Self {
        if let Some(columns) = columns {
            self.columns = columns;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_presets() {
        assert_eq!(ColumnMap::preset("default").unwrap(), ColumnMap::default());
        assert_eq!(ColumnMap::preset("JEJU").unwrap().order_date, "주문일");
        assert!(matches!(ColumnMap::preset("bogus"), Err(DashboardError::Config(_))));
    }

    #[test]
    fn test_column_map_from_json() {
        let mut map = ColumnMap::default();
        map.payment_amount = "amount".to_string();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&map).unwrap()).unwrap();

        let loaded = ColumnMap::from_json_file(file.path()).unwrap();
        assert_eq!(loaded.payment_amount, "amount");
        assert_eq!(loaded.headers().len(), 14);
    }

    #[test]
    fn test_overrides() {
        let config = DashboardConfig::default()
            .with_data_path(Some(PathBuf::from("x.csv")))
            .with_columns(None);
        assert_eq!(config.data_path, PathBuf::from("x.csv"));
        assert_eq!(config.columns, ColumnMap::default());
    }

    // the only test in this crate that touches process environment
    #[test]
    fn test_from_env_precedence() {
        let mut map = ColumnMap::default();
        map.order_date = "when".to_string();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&map).unwrap()).unwrap();

        std::env::set_var(ENV_DATA_PATH, "sales.csv");
        std::env::set_var(ENV_COLUMN_MAP, file.path());
        std::env::set_var(ENV_PRESET, "jeju");
        let config = DashboardConfig::from_env().unwrap();
        assert_eq!(config.data_path, PathBuf::from("sales.csv"));
        assert_eq!(config.columns.order_date, "when");

        std::env::remove_var(ENV_COLUMN_MAP);
        assert_eq!(DashboardConfig::from_env().unwrap().columns, ColumnMap::jeju());

        std::env::set_var(ENV_PRESET, "bogus");
        assert!(matches!(DashboardConfig::from_env(), Err(DashboardError::Config(_))));

        std::env::remove_var(ENV_PRESET);
        std::env::remove_var(ENV_DATA_PATH);
        let config = DashboardConfig::from_env().unwrap();
        assert_eq!(config.data_path, PathBuf::from(DEFAULT_DATA_PATH));
        assert_eq!(config.columns, ColumnMap::default());
    }
}
