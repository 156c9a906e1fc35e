pub mod cache;
pub mod cli;
pub mod client;
pub mod data;
pub mod error;
pub mod filter;
pub mod frame;
pub mod ingest;
pub mod normalize;
pub mod pipeline;
pub mod stats;
pub mod table;

use std::{env, fs, path::Path, sync::OnceLock, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::cli::{Cli, CoerceArgs, Commands, CorrelateArgs, DescribeArgs, FetchArgs};
use crate::client::{LocationQuery, OpenAqClient};
use crate::normalize::CanonicalRow;
use crate::pipeline::LocationQueryPipeline;

/// Environment variable carrying the opaque monitoring-API key.
pub const API_KEY_VAR: &str = "AIRQ_API_KEY";

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("airq", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Fetch(args) => handle_fetch(&args),
        Commands::Describe(args) => handle_describe(&args),
        Commands::Coerce(args) => handle_coerce(&args),
        Commands::Correlate(args) => handle_correlate(&args),
    }
}

fn handle_fetch(args: &FetchArgs) -> Result<()> {
    let query = LocationQuery {
        endpoint: args.endpoint.into(),
        latitude: args.latitude,
        longitude: args.longitude,
        radius_meters: args.radius,
        limit: args.limit,
        parameter: args.parameter.clone(),
        location_id: args.location_id,
    };
    info!(
        "Querying {} within {} m of ({}, {}), limit {}",
        query.endpoint.api_path(),
        query.radius_meters,
        query.latitude,
        query.longitude,
        query.limit
    );

    let client = OpenAqClient::new(args.base_url.as_str(), env::var(API_KEY_VAR).ok());
    let mut pipeline = LocationQueryPipeline::with_ttl(client, Duration::from_secs(args.ttl));
    let rows = pipeline.query(&query)?;

    if args.list_parameters {
        let parameters = filter::distinct_parameters(&rows);
        if parameters.is_empty() {
            println!("No data available for this query.");
            return Ok(());
        }
        let rows = parameters.into_iter().map(|p| vec![p]).collect::<Vec<_>>();
        table::print_table(&["parameter".to_string()], &rows);
        return Ok(());
    }

    let mut selected = match &args.parameter {
        Some(parameter) => filter::filter_by_parameter(&rows, parameter),
        None => rows,
    };
    if args.mappable_only {
        selected = filter::with_coordinates(&selected);
    }
    // Empty-after-fetch and empty-after-filter are the same reportable
    // "no data" state, never a silently empty table.
    if selected.is_empty() {
        println!("No data available for this query.");
        return Ok(());
    }

    table::print_table(&reading_headers(), &reading_rows(&selected));
    info!("Rendered {} reading(s)", selected.len());
    Ok(())
}

fn reading_headers() -> Vec<String> {
    ["location", "parameter", "value", "unit", "latitude", "longitude"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn reading_rows(rows: &[CanonicalRow]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| {
            vec![
                row.location.clone().unwrap_or_default(),
                row.parameter.clone(),
                row.value.map(|v| v.to_string()).unwrap_or_default(),
                row.unit.clone().unwrap_or_default(),
                row.latitude.map(|v| v.to_string()).unwrap_or_default(),
                row.longitude.map(|v| v.to_string()).unwrap_or_default(),
            ]
        })
        .collect()
}

fn load_table(path: &Path) -> Result<frame::TypedTable> {
    let bytes = fs::read(path).with_context(|| format!("Reading input file {path:?}"))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    ingest::ingest(&bytes, &filename)
}

fn handle_describe(args: &DescribeArgs) -> Result<()> {
    let table_data = load_table(&args.input)?;
    if table_data.row_count() == 0 {
        println!("No data available in {:?}.", args.input);
        return Ok(());
    }
    let stats = stats::describe(&table_data);
    table::print_table(&stats::describe_headers(), &stats::describe_rows(&stats));
    info!("Profiled {} column(s)", stats.len());
    Ok(())
}

fn handle_coerce(args: &CoerceArgs) -> Result<()> {
    let mut table_data = load_table(&args.input)?;
    table_data.coerce(&args.column, args.target.into())?;
    info!("Column '{}' retyped to {}", args.column, data::ColumnType::from(args.target));
    match &args.output {
        Some(path) => {
            let file = fs::File::create(path)
                .with_context(|| format!("Creating output file {path:?}"))?;
            table_data.write_csv(file)?;
            info!("Wrote {} row(s) to {path:?}", table_data.row_count());
        }
        None => {
            table::print_table(&table_data.headers(), &table_data.display_rows(Some(args.rows)));
        }
    }
    Ok(())
}

fn handle_correlate(args: &CorrelateArgs) -> Result<()> {
    let table_data = load_table(&args.input)?;
    let selection = (!args.columns.is_empty()).then_some(args.columns.as_slice());
    let matrix = stats::correlation_matrix(&table_data, selection)?;
    let mut headers = vec!["column".to_string()];
    headers.extend(matrix.columns.iter().cloned());
    table::print_table(&headers, &stats::correlation_rows(&matrix));
    info!("Correlated {} numeric column(s)", matrix.size());
    Ok(())
}
