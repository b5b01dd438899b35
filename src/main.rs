use store_dashboard::config::{ColumnMap, DashboardConfig};
use store_dashboard::dashboard::{render, RenderOptions};
use store_dashboard::filter::{filter, DateSelection, FilterCriteria, FilterOptions};
use store_dashboard::loader::DataLoader;
use store_dashboard::report::{write_dashboard, write_options, write_raw_csv};
use store_dashboard::session::{parse_date, parse_view, Outcome, Session};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "store-dashboard")]
#[command(about = "Sales dashboard over a store transaction export")]
#[command(version)]
struct Args {
    /// Transaction CSV (or set DASHBOARD_DATA_PATH)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// JSON column map (or set DASHBOARD_COLUMN_MAP)
    #[arg(long, global = true)]
    columns: Option<PathBuf>,

    /// Built-in column map: default or jeju (or set DASHBOARD_PRESET)
    #[arg(long, global = true)]
    preset: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the dashboard once for the given filters
    Render {
        #[command(flatten)]
        filters: FilterArgs,

        /// performance, analysis or all
        #[arg(long, default_value = "all")]
        view: String,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Append the filtered rows
        #[arg(long)]
        raw: bool,
    },
    /// List the values available to each filter
    Options,
    /// Write the filtered rows as CSV
    Inspect {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Read commands from stdin and re-render after each one
    Session,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Filter flags. An omitted list keeps every value; a flag given with no
/// values selects none.
#[derive(clap::Args)]
struct FilterArgs {
    /// First order date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<String>,

    /// Last order date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<String>,

    /// Single order date, overrides --from/--to
    #[arg(long)]
    date: Option<String>,

    #[arg(long, value_delimiter = ',', num_args = 0..)]
    product: Option<Vec<String>>,

    #[arg(long, value_delimiter = ',', num_args = 0..)]
    size: Option<Vec<String>>,

    #[arg(long, value_delimiter = ',', num_args = 0..)]
    weight: Option<Vec<String>>,

    #[arg(long, value_delimiter = ',', num_args = 0..)]
    region: Option<Vec<String>>,

    /// Sellers in the trend comparison (defaults to the first three)
    #[arg(long, value_delimiter = ',', num_args = 0..)]
    compare_seller: Option<Vec<String>>,
}

impl FilterArgs {
    fn criteria(&self, options: &FilterOptions) -> Result<FilterCriteria> {
        let mut criteria = options.select_all();

        if let Some(day) = &self.date {
            criteria = criteria.with_dates(DateSelection::Single(parse_date(day)?));
        } else if self.from.is_some() || self.to.is_some() {
            let start = optional_date(&self.from)?.unwrap_or(criteria.start);
            let end = optional_date(&self.to)?.unwrap_or(criteria.end);
            criteria = criteria.with_dates(DateSelection::Range(start, end));
        }

        if let Some(products) = &self.product {
            criteria = criteria.with_products(non_blank(products));
        }
        if let Some(sizes) = &self.size {
            criteria = criteria.with_sizes(non_blank(sizes));
        }
        if let Some(weights) = &self.weight {
            criteria = criteria.with_weights(non_blank(weights));
        }
        if let Some(regions) = &self.region {
            criteria = criteria.with_regions(non_blank(regions));
        }
        Ok(criteria)
    }

    fn compared_sellers(&self, options: &FilterOptions) -> Vec<String> {
        match &self.compare_seller {
            Some(sellers) => non_blank(sellers),
            None => options.default_compared_sellers(),
        }
    }
}

fn optional_date(raw: &Option<String>) -> Result<Option<NaiveDate>> {
    Ok(raw.as_deref().map(parse_date).transpose()?)
}

fn non_blank(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let loader = DataLoader::new(build_config(&args)?);
    info!("Using data file {:?}", loader.config().data_path);

    match args.command {
        Commands::Render { filters, view, format, raw } => {
            run_render(&loader, &filters, &view, format, raw)
        }
        Commands::Options => run_options(&loader),
        Commands::Inspect { filters } => run_inspect(&loader, &filters),
        Commands::Session => run_session(&loader),
    }
}

fn build_config(args: &Args) -> Result<DashboardConfig> {
    let columns = match (&args.columns, &args.preset) {
        (Some(path), _) => Some(
            ColumnMap::from_json_file(path)
                .with_context(|| format!("Failed to read column map {:?}", path))?,
        ),
        (None, Some(name)) => Some(ColumnMap::preset(name)?),
        (None, None) => None,
    };
    Ok(DashboardConfig::from_env()
        .context("Invalid dashboard environment configuration")?
        .with_data_path(args.data.clone())
        .with_columns(columns))
}

fn run_render(
    loader: &DataLoader,
    filters: &FilterArgs,
    view: &str,
    format: OutputFormat,
    raw: bool,
) -> Result<()> {
    let dataset = loader.load().context("Failed to load transactions")?;
    let options = dataset.options();
    let criteria = filters.criteria(&options)?;
    let render_options = RenderOptions {
        compared_sellers: filters.compared_sellers(&options),
        view: parse_view(view)?,
        include_raw: raw,
    };

    let dashboard = render(&dataset, &criteria, &render_options)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Text => write_dashboard(&mut out, &dashboard)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &dashboard)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn run_options(loader: &DataLoader) -> Result<()> {
    let dataset = loader.load().context("Failed to load transactions")?;
    write_options(&mut io::stdout().lock(), &dataset.options())?;
    Ok(())
}

fn run_inspect(loader: &DataLoader, filters: &FilterArgs) -> Result<()> {
    let dataset = loader.load().context("Failed to load transactions")?;
    let criteria = filters.criteria(&dataset.options())?;
    let working = filter(dataset.frame(), &criteria)?;
    info!("Writing {} filtered rows", working.height());
    write_raw_csv(&mut io::stdout().lock(), &working)?;
    Ok(())
}

fn run_session(loader: &DataLoader) -> Result<()> {
    let mut session = Session::new(loader).context("Failed to load transactions")?;

    println!("\n{}", "=".repeat(80));
    println!(" STORE DASHBOARD SESSION (type 'help' for commands)");
    println!("{}", "=".repeat(80));
    write_dashboard(&mut io::stdout().lock(), &session.render()?)?;

    let stdin = io::stdin();
    loop {
        print!("\n> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        match session.apply(&line) {
            Ok(Outcome::Rendered(view)) => write_dashboard(&mut io::stdout().lock(), &view)?,
            Ok(Outcome::Help(text)) => println!("{}", text),
            Ok(Outcome::Quit) => break,
            Err(e) => println!(" {}", e),
        }
    }
    Ok(())
}
