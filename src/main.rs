//! CLI entry point for the route disposition engine.
//!
//! Provides subcommands for assigning routes to a schedule, producing
//! data-quality evaluation reports, and inspecting per-route statistics.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use route_disposition::assign::normalize_routes;
use route_disposition::fetch::{load_report_data, load_schedule};
use route_disposition::model::{Route, ScheduleRequirement};
use route_disposition::output::{
    disposition_lines, print_pretty, write_evaluation, write_json, write_roster, write_route_stats,
};
use route_disposition::publish::upload_all;
use route_disposition::stats::aggregate_routes;
use route_disposition::{DispositionEngine, DispositionRun, EngineConfig, ReportData, ShuffledOrder};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "route_disposition")]
#[command(about = "Assign transport routes to schedule hours from historical complaint data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that runs the engine.
#[derive(Args)]
struct EngineArgs {
    /// Report data file or URL (repeat to append further files)
    #[arg(short, long = "data", value_name = "FILE_OR_URL", required = true)]
    data: Vec<String>,

    /// Comma-separated routes to use instead of every route in the data
    #[arg(short, long)]
    routes: Option<String>,

    /// JSON engine configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Score routes in sorted order instead of shuffling equal priorities
    #[arg(long, default_value_t = false)]
    no_shuffle: bool,

    /// Seed for the tie-break shuffle
    #[arg(long)]
    seed: Option<u64>,

    /// Rank every route by complaint rate and load, skipping the quality tier
    #[arg(long, default_value_t = false)]
    ignore_data_quality: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Assign a route to every scheduled hour
    Process {
        #[command(flatten)]
        engine: EngineArgs,

        /// Schedule file or URL (repeat to append further files)
        #[arg(short, long = "schedule", value_name = "FILE_OR_URL", required = true)]
        schedule: Vec<String>,

        /// CSV roster to write the disposition to
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// JSON file to write the full run to
        #[arg(long)]
        json: Option<PathBuf>,

        /// Optional: S3 bucket to upload written files to
        #[arg(long)]
        s3_bucket: Option<String>,

        /// Optional: Gzip compress files before uploading to S3
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Process each schedule separately and write data-quality matrices
    Evaluate {
        #[command(flatten)]
        engine: EngineArgs,

        /// Schedule files or URLs, each evaluated as its own run
        #[arg(short, long = "schedule", value_name = "FILE_OR_URL", required = true)]
        schedule: Vec<String>,

        /// Directory for the evaluation CSVs
        #[arg(short = 'o', long, default_value = "output")]
        output_dir: PathBuf,
    },
    /// Show aggregate statistics per route
    Stats {
        /// Report data file or URL (repeat to append further files)
        #[arg(short, long = "data", value_name = "FILE_OR_URL", required = true)]
        data: Vec<String>,

        /// Comma-separated routes to use instead of every route in the data
        #[arg(short, long)]
        routes: Option<String>,

        /// CSV file to write the statistics to
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/route_disposition.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("route_disposition.log"));

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

    match cli.command {
        Commands::Process {
            engine,
            schedule,
            output,
            json,
            s3_bucket,
            gzip,
        } => {
            let data = load_report_data(&engine.data).await?;
            let requirements = load_schedule(&schedule).await?;
            let mut order = route_order(engine.seed);
            let run = run_engine(&engine, &data, &requirements, &mut order)?;

            for line in disposition_lines(&run.disposition) {
                println!("{line}");
            }

            let mut written = Vec::new();
            if let Some(path) = output {
                write_roster(&path, &run.disposition)?;
                info!(path = %path.display(), "Roster written");
                written.push(path);
            }
            if let Some(path) = json {
                write_json(&path, &run)?;
                info!(path = %path.display(), "Run summary written");
                written.push(path);
            }

            if let Some(bucket) = s3_bucket {
                if written.is_empty() {
                    warn!(bucket = %bucket, "Nothing written, skipping S3 upload");
                } else {
                    info!(bucket = %bucket, gzip, "S3 upload enabled");
                    let config = aws_config::load_from_env().await;
                    let s3 = aws_sdk_s3::Client::new(&config);
                    upload_all(&s3, &bucket, &written, gzip).await?;
                }
            }
        }
        Commands::Evaluate {
            engine,
            schedule,
            output_dir,
        } => {
            let data = load_report_data(&engine.data).await?;
            let config = engine_config(&engine)?;
            // one stream for every schedule so seeded evaluations do not repeat ties
            let mut order = route_order(engine.seed);

            for location in &schedule {
                let requirements = load_schedule(std::slice::from_ref(location)).await?;
                let run = run_engine(&engine, &data, &requirements, &mut order)
                    .with_context(|| format!("evaluating schedule {location}"))?;

                let stem = Path::new(location)
                    .file_stem()
                    .and_then(OsStr::to_str)
                    .unwrap_or("evaluation");
                let routes = select_routes(engine.routes.as_deref(), &data)?;
                write_evaluation(&output_dir, stem, &run, &routes, config.commitment_weight)?;

                info!(
                    schedule = %location,
                    assigned = run.disposition.len(),
                    "Schedule evaluated"
                );
            }
        }
        Commands::Stats {
            data,
            routes,
            output,
        } => {
            let data = load_report_data(&data).await?;
            let routes = select_routes(routes.as_deref(), &data)?;
            let table = aggregate_routes(&data, &routes)?;

            for s in table.iter() {
                info!(
                    route = %s.route,
                    passengers = s.total_passengers,
                    complaints = s.total_complaints,
                    trips = s.total_trips,
                    complaint_rate = s.complaint_rate,
                    control_performance = s.control_performance,
                    trips_per_hour = s.trips_per_hour,
                    "Route"
                );
            }
            print_pretty(&table);

            if let Some(path) = output {
                write_route_stats(&path, &table)?;
                info!(path = %path.display(), "Route statistics written");
            }
        }
    }

    Ok(())
}

/// Explicit `--routes` list if given, otherwise every route in the data.
fn select_routes(routes: Option<&str>, data: &ReportData) -> Result<Vec<Route>> {
    let routes = match routes {
        Some(list) => normalize_routes(list.split(','))?,
        None => data.routes(),
    };
    Ok(routes)
}

/// Config file (or defaults) with command-line overrides applied.
fn engine_config(args: &EngineArgs) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading engine config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if args.no_shuffle {
        config.shuffle_equal_priorities = false;
    }
    if args.ignore_data_quality {
        config.ignore_data_quality = true;
    }
    Ok(config)
}

/// Tie-break order for the process, seeded once from `--seed` or entropy.
fn route_order(seed: Option<u64>) -> ShuffledOrder {
    match seed {
        Some(seed) => ShuffledOrder::seeded(seed),
        None => ShuffledOrder::from_entropy(),
    }
}

#[tracing::instrument(skip_all, fields(requirements = requirements.len()))]
fn run_engine(
    args: &EngineArgs,
    data: &ReportData,
    requirements: &[ScheduleRequirement],
    order: &mut ShuffledOrder,
) -> Result<DispositionRun> {
    let routes = select_routes(args.routes.as_deref(), data)?;
    let config = engine_config(args)?;
    info!(
        routes = routes.len(),
        records = data.len(),
        shuffle = config.shuffle_equal_priorities,
        ignore_data_quality = config.ignore_data_quality,
        "Processing schedule"
    );

    let engine = DispositionEngine::new(data, routes, config)?;
    let run = engine.process_schedule(requirements, order)?;

    info!(assigned = run.disposition.len(), "Schedule processed");
    Ok(run)
}
