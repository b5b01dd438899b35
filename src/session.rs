//! Interactive Session
//!
//! Holds the current filter selection between interactions. Every command
//! that changes the selection re-renders the full dashboard from the cached
//! dataset; nothing derived is kept from one render to the next.

use crate::dashboard::{render, DashboardView, RenderOptions, ViewSelection};
use crate::error::{DashboardError, Result};
use crate::filter::{DateSelection, FilterCriteria, FilterOptions};
use crate::loader::DataLoader;
use chrono::NaiveDate;
use tracing::debug;

pub const HELP: &str = "\
Commands:
  dates <from> [<to>]        order date range (YYYY-MM-DD); one date selects that day
  products|sizes|weights|regions [v1,v2,..|all]
                             allowed values; no value selects none
  sellers [s1,s2,..]         sellers compared in the trend chart
  view performance|analysis|all
  raw on|off                 include filtered rows
  reset                      back to every value selected
  show                       render with the current selection
  help
  quit";

/// Result of one command.
#[derive(Debug)]
pub enum Outcome {
    Rendered(Box<DashboardView>),
    Help(&'static str),
    Quit,
}

pub struct Session<'a> {
    loader: &'a DataLoader,
    options: FilterOptions,
    criteria: FilterCriteria,
    render_options: RenderOptions,
}

impl<'a> Session<'a> {
    /// Start with every value selected and the default seller comparison.
    pub fn new(loader: &'a DataLoader) -> Result<Self> {
        let options = loader.load()?.options();
        let criteria = options.select_all();
        let render_options = RenderOptions {
            compared_sellers: options.default_compared_sellers(),
            ..Default::default()
        };
        Ok(Self {
            loader,
            options,
            criteria,
            render_options,
        })
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn render_options(&self) -> &RenderOptions {
        &self.render_options
    }

    /// One interaction: load (cached), filter, aggregate.
    pub fn render(&self) -> Result<DashboardView> {
        let dataset = self.loader.load()?;
        render(&dataset, &self.criteria, &self.render_options)
    }

    /// Apply a command line and re-render unless it was `help` or `quit`.
    pub fn apply(&mut self, line: &str) -> Result<Outcome> {
        let line = line.trim();
        let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        debug!("Session command '{}' args '{}'", command, rest);

        match command.to_lowercase().as_str() {
            "" | "show" => {}
            "help" | "?" => return Ok(Outcome::Help(HELP)),
            "quit" | "exit" | "q" => return Ok(Outcome::Quit),
            "reset" => {
                self.criteria = self.options.select_all();
                self.render_options.compared_sellers = self.options.default_compared_sellers();
            }
            "dates" => {
                let picked = rest
                    .split_whitespace()
                    .map(parse_date)
                    .collect::<Result<Vec<_>>>()?;
                let selection = DateSelection::from_picked(&picked).ok_or_else(|| {
                    DashboardError::InvalidInput("dates needs at least one date".to_string())
                })?;
                self.criteria = self.criteria.clone().with_dates(selection);
            }
            "products" => {
                self.criteria.products = pick(rest, &self.options.products).into_iter().collect()
            }
            "sizes" => self.criteria.sizes = pick(rest, &self.options.sizes).into_iter().collect(),
            "weights" => {
                self.criteria.weights = pick(rest, &self.options.weights).into_iter().collect()
            }
            "regions" => {
                self.criteria.regions = pick(rest, &self.options.regions).into_iter().collect()
            }
            "sellers" => self.render_options.compared_sellers = pick(rest, &self.options.sellers),
            "view" => self.render_options.view = parse_view(rest)?,
            "raw" => {
                self.render_options.include_raw = match rest.to_lowercase().as_str() {
                    "on" | "true" | "yes" => true,
                    "off" | "false" | "no" => false,
                    other => {
                        return Err(DashboardError::InvalidInput(format!(
                            "raw expects on/off, got '{}'",
                            other
                        )))
                    }
                }
            }
            other => {
                return Err(DashboardError::InvalidInput(format!(
                    "unknown command '{}' (try 'help')",
                    other
                )))
            }
        }

        Ok(Outcome::Rendered(Box::new(self.render()?)))
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| DashboardError::InvalidInput(format!("bad date '{}': {}", raw, e)))
}

pub fn parse_view(raw: &str) -> Result<ViewSelection> {
    match raw.trim().to_lowercase().as_str() {
        "performance" | "perf" => Ok(ViewSelection::Performance),
        "analysis" | "eda" => Ok(ViewSelection::Analysis),
        "all" | "" => Ok(ViewSelection::All),
        other => Err(DashboardError::InvalidInput(format!("unknown view '{}'", other))),
    }
}

/// Comma-separated values; `all` means every available value and an empty
/// argument means none.
fn pick(raw: &str, available: &[String]) -> Vec<String> {
    if raw.eq_ignore_ascii_case("all") {
        return available.to_vec();
    }
    raw.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}
