//! CLI entry point for the ZCTA feature pipeline.
//!
//! Provides subcommands for merging ACS tables onto the ZCTA layer,
//! aggregating the NYC spatial layers, running both stages, and
//! summarising an output layer.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use zcta_features::config::PipelineConfig;
use zcta_features::output::print_json;
use zcta_features::pipeline::{
    AggregateOptions, aggregate_features, merge_features, run_all, summarize,
};

#[derive(Parser)]
#[command(name = "zcta_features")]
#[command(about = "Builds per-ZCTA socioeconomic and spatial features for NYC", long_about = None)]
struct Cli {
    /// JSON file overriding the default input and output paths
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage A: join the ACS tables onto the ZCTA polygon layer
    Merge {
        /// ZCTA polygon layer (GeoJSON)
        #[arg(long)]
        polygons: Option<PathBuf>,

        /// ACS S1903 income table
        #[arg(long)]
        income: Option<PathBuf>,

        /// ACS DP02 education table
        #[arg(long)]
        education: Option<PathBuf>,

        /// ACS DP05 demographics table
        #[arg(long)]
        demographics: Option<PathBuf>,

        /// ACS DP04 housing table
        #[arg(long)]
        housing: Option<PathBuf>,

        /// Merged layer to write
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Stage B: count and measure the spatial layers per ZCTA
    Aggregate {
        /// Merged layer produced by `merge`
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Subway stations (GeoJSON points)
        #[arg(long)]
        subway: Option<PathBuf>,

        /// Parking lots (CSV with WKT geometry)
        #[arg(long)]
        parking: Option<PathBuf>,

        /// Truck routes (CSV with WKT geometry)
        #[arg(long)]
        truck_routes: Option<PathBuf>,

        /// Crime incidents (GeoJSON points)
        #[arg(long)]
        crime: Option<PathBuf>,

        /// Final layer to write
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        extras: ExtraOutputs,
    },
    /// Run both stages with the configured paths
    Run {
        #[command(flatten)]
        extras: ExtraOutputs,
    },
    /// Print per-column statistics for a layer as JSON
    Summary {
        /// Layer to summarise (defaults to the final output)
        #[arg(value_name = "FILE")]
        path: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ExtraOutputs {
    /// Also write min-max normalised copies of the score columns
    #[arg(long, default_value_t = false)]
    normalize: bool,

    /// Also export the attribute table (no geometry) as CSV
    #[arg(long, value_name = "FILE")]
    csv: Option<PathBuf>,
}

impl From<ExtraOutputs> for AggregateOptions {
    fn from(extras: ExtraOutputs) -> Self {
        AggregateOptions {
            normalize: extras.normalize,
            csv_export: extras.csv,
        }
    }
}

fn override_path(target: &mut PathBuf, value: Option<PathBuf>) {
    if let Some(path) = value {
        *target = path;
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/zcta_features.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("zcta_features.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let mut config = PipelineConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Merge {
            polygons,
            income,
            education,
            demographics,
            housing,
            output,
        } => {
            override_path(&mut config.zcta_polygons, polygons);
            override_path(&mut config.income, income);
            override_path(&mut config.education, education);
            override_path(&mut config.demographics, demographics);
            override_path(&mut config.housing, housing);
            override_path(&mut config.merged_output, output);

            merge_features(&config)?;
            info!(path = %config.merged_output.display(), "Data successfully saved");
        }
        Commands::Aggregate {
            input,
            subway,
            parking,
            truck_routes,
            crime,
            output,
            extras,
        } => {
            override_path(&mut config.merged_output, input);
            override_path(&mut config.subway, subway);
            override_path(&mut config.parking, parking);
            override_path(&mut config.truck_routes, truck_routes);
            override_path(&mut config.crime, crime);
            override_path(&mut config.final_output, output);

            aggregate_features(&config, &extras.into())?;
            info!(path = %config.final_output.display(), "Data successfully saved");
        }
        Commands::Run { extras } => {
            run_all(&config, &extras.into())?;
            info!(path = %config.final_output.display(), "Data successfully saved");
        }
        Commands::Summary { path } => {
            let path = path.unwrap_or_else(|| config.final_output.clone());
            let summary = summarize(&path)?;
            print_json(&summary)?;
        }
    }

    Ok(())
}
