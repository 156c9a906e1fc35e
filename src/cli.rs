use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::client::Endpoint;
use crate::data::ColumnType;

#[derive(Debug, Parser)]
#[command(author, version, about = "Fetch, normalize, and analyze air-quality data", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Query the monitoring API around a point and print normalized readings
    Fetch(FetchArgs),
    /// Produce per-column descriptive statistics for a tabular file
    Describe(DescribeArgs),
    /// Reassign the declared type of one column in a tabular file
    Coerce(CoerceArgs),
    /// Compute a correlation matrix over numeric columns of a tabular file
    Correlate(CorrelateArgs),
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Latitude of the query center in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub latitude: f64,
    /// Longitude of the query center in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub longitude: f64,
    /// Search radius in meters
    #[arg(long, default_value_t = 12_000)]
    pub radius: u32,
    /// Maximum number of raw records to request
    #[arg(long, default_value_t = 100)]
    pub limit: u32,
    /// Restrict output to one pollutant (exact match, e.g. pm25)
    #[arg(short = 'p', long)]
    pub parameter: Option<String>,
    /// Restrict the query to one upstream location id
    #[arg(long = "location-id")]
    pub location_id: Option<u64>,
    /// Upstream endpoint to query; each responds with a different record shape
    #[arg(long, value_enum, default_value = "locations")]
    pub endpoint: EndpointKind,
    /// Cache time-to-live in seconds for repeated identical queries
    #[arg(long, default_value_t = 600)]
    pub ttl: u64,
    /// Base URL of the monitoring API
    #[arg(long = "base-url", default_value = "https://api.openaq.org/v2")]
    pub base_url: String,
    /// Only print the distinct pollutant list for this query
    #[arg(long = "list-parameters")]
    pub list_parameters: bool,
    /// Drop rows without coordinates (the map-layer subset)
    #[arg(long = "mappable-only")]
    pub mappable_only: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum EndpointKind {
    Locations,
    Latest,
    Measurements,
}

impl From<EndpointKind> for Endpoint {
    fn from(kind: EndpointKind) -> Self {
        match kind {
            EndpointKind::Locations => Endpoint::Locations,
            EndpointKind::Latest => Endpoint::Latest,
            EndpointKind::Measurements => Endpoint::Measurements,
        }
    }
}

#[derive(Debug, Args)]
pub struct DescribeArgs {
    /// Input file (csv, tsv, xlsx, xls, xlsm, xlsb, or ods)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
}

#[derive(Debug, Args)]
pub struct CoerceArgs {
    /// Input file (csv, tsv, xlsx, xls, xlsm, xlsb, or ods)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Column to retype
    #[arg(short = 'C', long = "column")]
    pub column: String,
    /// Target type for the column
    #[arg(short = 't', long = "type", value_enum)]
    pub target: TargetType,
    /// Output CSV file (prints a preview table if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Number of preview rows when no output file is given
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum TargetType {
    Integer,
    Float,
    Text,
    Timestamp,
    Duration,
}

impl From<TargetType> for ColumnType {
    fn from(target: TargetType) -> Self {
        match target {
            TargetType::Integer => ColumnType::Integer,
            TargetType::Float => ColumnType::Float,
            TargetType::Text => ColumnType::Text,
            TargetType::Timestamp => ColumnType::Timestamp,
            TargetType::Duration => ColumnType::Duration,
        }
    }
}

#[derive(Debug, Args)]
pub struct CorrelateArgs {
    /// Input file (csv, tsv, xlsx, xls, xlsm, xlsb, or ods)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Columns to include (defaults to all numeric columns)
    #[arg(short = 'C', long = "columns", value_delimiter = ',')]
    pub columns: Vec<String>,
}
