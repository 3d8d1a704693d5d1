use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chorus_core::date_range::{select_date_range, DateRange};
use chorus_core::ebv::assemble_ebv_ready;
use chorus_core::metadata::SiteMetadata;
use chorus_core::{combine_climate, harmonize, HarmonizeConfig, GRID_COLUMNS};
use clap::{Args, Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use polars::io::parquet::write::{ParquetCompression, ParquetWriter};
use polars::prelude::*;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Chorus acoustic and climate harmonization CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Align inference, datalogger and weather-station tables onto one time grid
    Harmonize(HarmonizeArgs),
}

#[derive(Args, Debug)]
struct HarmonizeArgs {
    /// Classifier output table (CSV or Parquet)
    #[arg(long)]
    inference: PathBuf,
    /// Datalogger readings (CSV or Parquet)
    #[arg(long)]
    datalogger: PathBuf,
    /// Weather-station records stamped in UTC
    #[arg(long)]
    weather_station: Option<PathBuf>,
    /// Site metadata table; requires --location
    #[arg(long, requires = "location")]
    metadata: Option<PathBuf>,
    /// Location id to look up in the metadata table
    #[arg(long)]
    location: Option<String>,
    /// First date to keep (YYYY-MM-DD)
    #[arg(long, requires = "end")]
    start: Option<String>,
    /// Last date to keep (YYYY-MM-DD)
    #[arg(long, requires = "start")]
    end: Option<String>,
    /// TOML config; falls back to CHORUS_CONFIG
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory receiving the parquet outputs
    #[arg(long, default_value = "harmonized")]
    out_dir: PathBuf,
    /// Print the summary as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct TableSummary {
    table: String,
    rows: usize,
    columns: usize,
    non_null_cells: usize,
    path: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Harmonize(args) => run_harmonize(args),
    }
}

fn run_harmonize(args: HarmonizeArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let options = config.options().context("invalid harmonization config")?;

    let mut inference = read_table(&args.inference)?;
    let mut datalogger = read_table(&args.datalogger)?;
    let mut weather_station = args
        .weather_station
        .as_deref()
        .map(read_table)
        .transpose()?;

    if let (Some(path), Some(location)) = (args.metadata.as_deref(), args.location.as_deref()) {
        let metadata = read_table(path)?;
        let Some(site) = SiteMetadata::from_frame(&metadata, location)? else {
            bail!("location {location} not found in {}", path.display());
        };
        info!(location, name = ?site.name, weather_station = site.has_weather_station(), "loaded site metadata");
        if !site.has_weather_station() && weather_station.take().is_some() {
            warn!(location, "site has no weather station; ignoring weather-station table");
        }
    }

    if let (Some(start), Some(end)) = (args.start.as_deref(), args.end.as_deref()) {
        let range = DateRange::parse(start, end)?;
        inference = select_date_range(
            &inference,
            "inference",
            &options.inference_schema.timestamp,
            range,
        )?
        .frame;
        datalogger = select_date_range(
            &datalogger,
            "datalogger",
            &options.datalogger_schema.timestamp,
            range,
        )?
        .frame;
        // Station records are in UTC; keep the neighbouring days so the offset can pull
        // them into range.
        if let Some(station) = weather_station.as_mut() {
            let padded = DateRange::new(
                range.start.pred_opt().unwrap_or(range.start),
                range.end.succ_opt().unwrap_or(range.end),
            )?;
            *station = select_date_range(
                station,
                "weather_station",
                &options.weather_station_schema.timestamp,
                padded,
            )?
            .frame;
        }
    }

    let tables = harmonize(&inference, &datalogger, weather_station.as_ref(), &options)?;
    let climate = combine_climate(&tables.datalogger, tables.weather_station.as_ref())?;
    let ebv = assemble_ebv_ready(&tables.inference, &climate, &config.species)?;

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("failed to create {}", args.out_dir.display()))?;

    let mut outputs = vec![
        ("inference_harmonized", tables.inference),
        ("datalogger_harmonized", tables.datalogger),
    ];
    if let Some(station) = tables.weather_station {
        outputs.push(("weather_station_harmonized", station));
    }
    outputs.push(("climate_combined", climate));
    outputs.push(("ebv_ready", ebv));

    let mut summaries = Vec::with_capacity(outputs.len());
    for (name, mut frame) in outputs {
        let path = args.out_dir.join(format!("{name}.parquet"));
        write_parquet(&path, &mut frame)?;
        summaries.push(summarize(name, &frame, &path));
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        print_summary(&summaries);
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<HarmonizeConfig> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os("CHORUS_CONFIG").map(PathBuf::from));
    match path {
        Some(path) => HarmonizeConfig::from_path(&path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(HarmonizeConfig::default()),
    }
}

fn read_table(path: &Path) -> Result<DataFrame> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let frame = match extension.as_deref() {
        Some("parquet") => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            ParquetReader::new(file).finish()?
        }
        Some("csv") => CsvReadOptions::default()
            .with_has_header(true)
            .map_parse_options(|opts| opts.with_try_parse_dates(true))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()
            .with_context(|| format!("failed to parse {}", path.display()))?,
        _ => bail!("unsupported table format: {}", path.display()),
    };

    info!(path = %path.display(), rows = frame.height(), columns = frame.width(), "loaded table");
    Ok(frame)
}

fn write_parquet(path: &Path, frame: &mut DataFrame) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    ParquetWriter::new(file)
        .with_compression(ParquetCompression::Zstd(None))
        .finish(frame)
        .with_context(|| format!("failed to write parquet to {}", path.display()))?;
    Ok(())
}

fn summarize(name: &str, frame: &DataFrame, path: &Path) -> TableSummary {
    let value_columns: Vec<&Column> = frame
        .get_columns()
        .iter()
        .filter(|column| !GRID_COLUMNS.contains(&column.name().as_str()))
        .collect();
    let non_null_cells = value_columns
        .iter()
        .map(|column| column.len() - column.null_count())
        .sum();

    TableSummary {
        table: name.to_string(),
        rows: frame.height(),
        columns: value_columns.len(),
        non_null_cells,
        path: path.display().to_string(),
    }
}

fn print_summary(summaries: &[TableSummary]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["table", "rows", "columns", "non-null cells", "path"]);
    for summary in summaries {
        table.add_row(vec![
            summary.table.clone(),
            summary.rows.to_string(),
            summary.columns.to_string(),
            summary.non_null_cells.to_string(),
            summary.path.clone(),
        ]);
    }
    println!("{table}");
}
