pub mod aggregate;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod filter;
pub mod frame;
pub mod loader;
pub mod model;
pub mod report;
pub mod session;

pub use config::{ColumnMap, DashboardConfig};
pub use dashboard::{render, DashboardView, RenderOptions, ViewSelection};
pub use error::{DashboardError, Result};
pub use filter::{filter, DateSelection, FilterCriteria, FilterOptions};
pub use loader::{DataLoader, Dataset};
pub use model::Record;
