//! Vista
//!
//! Inspects a training model directory: the resolved run configuration, the
//! saved snapshots and the camera manifest, plus an optional preview of an
//! inflated camera manifest.

use clap::{CommandFactory, FromArgMatches, Parser};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};
use vista_data::{DataError, read_camera_manifest};
use vista_train::GaussianModel;
use vista_train::config::{
    self, ALL_GROUPS, ConfigError, MODEL_PARAMS, ModelParams, OptimizationParams, PipelineParams,
};
use vista_train::ingest::{IngestError, load_inflated_infos};
use vista_train::model::PointGaussians;
use vista_train::scene::{
    CAMERAS_JSON, LoadIteration, POINT_CLOUD_DIR, SceneError, search_for_max_iteration, snapshot_path,
};

/// Vista - Gaussian splatting model directory inspection
#[derive(Parser, Debug)]
#[command(name = "vista")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Snapshot iteration to inspect, -1 for the latest
    #[arg(long = "load_iteration", default_value_t = -1, allow_negative_numbers = true)]
    load_iteration: i64,

    /// Inflated camera manifest to preview
    #[arg(long)]
    inflate: Option<PathBuf>,

    /// Keep every n-th inflated camera
    #[arg(long = "inflate_stride", default_value_t = 1)]
    inflate_stride: usize,

    /// Write the resolved parameters to <model_path>/cfg_args
    #[arg(long = "write_cfg")]
    write_cfg: bool,

    /// Log level used when RUST_LOG is unset
    #[arg(long = "log_level", default_value = "info")]
    log_level: String,
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("--model_path is required")]
    MissingModelPath,
    #[error("Invalid snapshot iteration {0}")]
    InvalidIteration(i64),
}

fn build_command() -> clap::Command {
    ALL_GROUPS
        .iter()
        .fold(Args::command(), |command, group| group.register(command))
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .init();
}

fn run(args: &Args, matches: &clap::ArgMatches, out: &mut impl Write) -> Result<(), AppError> {
    let params = config::combine(matches, &ALL_GROUPS)?;
    let model = ModelParams::from_set(&params)?;
    let pipeline = PipelineParams::from_set(&params)?;
    let optimization = OptimizationParams::from_set(&params)?;
    if model.model_path.as_os_str().is_empty() {
        return Err(AppError::MissingModelPath);
    }

    writeln!(out, "{}:", MODEL_PARAMS.title)?;
    for (name, value) in MODEL_PARAMS.resolve(&params) {
        writeln!(out, "  {name} = {value}")?;
    }
    writeln!(
        out,
        "Optimization: {} iterations, densify {}..{} every {}",
        optimization.iterations,
        optimization.densify_from_iter,
        optimization.densify_until_iter,
        optimization.densification_interval
    )?;
    debug!("Pipeline parameters: {:?}", pipeline);

    if args.write_cfg {
        config::save_cfg_args(&model.model_path, &params)?;
        info!("Wrote {}", model.model_path.join(config::CFG_ARGS_FILE).display());
    }

    let snapshots = model.model_path.join(POINT_CLOUD_DIR);
    let load_iteration =
        LoadIteration::from_arg(args.load_iteration).ok_or(AppError::InvalidIteration(args.load_iteration))?;
    let iteration = match load_iteration {
        LoadIteration::Latest if !snapshots.is_dir() => None,
        LoadIteration::Latest => Some(search_for_max_iteration(&snapshots)?),
        LoadIteration::At(iteration) => Some(iteration),
    };
    match iteration {
        Some(iteration) => {
            let mut gaussians = PointGaussians::default();
            gaussians.load_ply(&snapshot_path(&model.model_path, iteration))?;
            writeln!(out, "Snapshot iteration {}: {} gaussians", iteration, gaussians.len())?;
        }
        None => writeln!(out, "No snapshots saved")?,
    }

    let manifest = model.model_path.join(CAMERAS_JSON);
    if manifest.exists() {
        let entries = read_camera_manifest(&manifest)?;
        writeln!(out, "Camera manifest: {} cameras", entries.len())?;
    } else {
        writeln!(out, "Camera manifest: missing")?;
    }

    if let Some(inflate) = &args.inflate {
        let infos = load_inflated_infos(inflate, args.inflate_stride)?;
        writeln!(
            out,
            "Inflation preview: {} cameras at stride {}",
            infos.len(),
            args.inflate_stride
        )?;
    }

    Ok(())
}

fn main() {
    let matches = build_command().get_matches();
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
    init_logging(&args.log_level);

    if let Err(e) = run(&args, &matches, &mut io::stdout().lock()) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
