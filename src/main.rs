//! TSEG Runner - drive external tumor-segmentation inference from the
//! command line.
//!
//! The binary acts as a minimal, file-backed host: the image calibration
//! and selection come from flags, tiles are staged from a directory the
//! host image server already exported, and the merged annotation tree is
//! written back out as GeoJSON.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tseg_runner::{
    host::{ImageHost, ImageInfo, Selection},
    Annotation, DirectoryTileExporter, InferenceLayout, InferenceOrchestrator, InferenceOutcome,
    InferenceRequest, RegionBounds, Settings, TokioInvoker,
};

// =============================================================================
// CLI
// =============================================================================

/// TSEG Runner - tumor segmentation inference orchestration.
///
/// Exports a region of a Whole Slide Image as overlapping tiles, runs an
/// external segmentation model over them, and imports the resulting
/// polygons as locked annotations.
#[derive(Parser, Debug)]
#[command(name = "tseg-runner")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run inference over a selected region.
    Run(RunArgs),

    /// Check the inference environment (layout, setup, models).
    Check(CheckArgs),

    /// Copy a model file into the model store.
    AddModel(AddModelArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    settings: Settings,

    /// Model file name inside the model store, or an absolute path.
    ///
    /// Falls back to the configured default model.
    #[arg(long)]
    model: Option<String>,

    /// Source image pixel size in micrometers per pixel.
    #[arg(long)]
    pixel_size: f64,

    /// Selected region as "x,y,width,height" in source-image pixels.
    #[arg(long, value_parser = parse_region)]
    region: RegionBounds,

    /// Directory holding the pre-rendered tiles for the region.
    #[arg(long)]
    tile_source: PathBuf,

    /// Write the merged annotation tree to this GeoJSON file on success.
    #[arg(long)]
    annotations_out: Option<PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct CheckArgs {
    #[command(flatten)]
    settings: Settings,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct AddModelArgs {
    #[command(flatten)]
    settings: Settings,

    /// Model file to copy into the store (.onnx).
    model_file: PathBuf,
}

/// Parse "x,y,width,height" into region bounds.
fn parse_region(value: &str) -> Result<RegionBounds, String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err("expected x,y,width,height".to_string());
    }

    let x: i32 = parts[0].parse().map_err(|_| "invalid x".to_string())?;
    let y: i32 = parts[1].parse().map_err(|_| "invalid y".to_string())?;
    let width: u32 = parts[2].parse().map_err(|_| "invalid width".to_string())?;
    let height: u32 = parts[3]
        .parse()
        .map_err(|_| "invalid height".to_string())?;

    Ok(RegionBounds::new(x, y, width, height))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run_inference(args).await,
        Command::Check(args) => run_check(args),
        Command::AddModel(args) => run_add_model(args),
    }
}

// =============================================================================
// File-Backed Host
// =============================================================================

/// Host implementation backed entirely by CLI flags and files.
struct CliHost {
    image: ImageInfo,
    selection: Selection,
}

impl CliHost {
    fn new(pixel_size_um: f64, region: RegionBounds) -> Self {
        let image = ImageInfo {
            pixel_size_um,
            width: region.x.max(0) as u32 + region.width,
            height: region.y.max(0) as u32 + region.height,
        };
        Self {
            image,
            selection: Selection::from_bounds(region),
        }
    }

    fn annotation(&self) -> Arc<Mutex<Annotation>> {
        Arc::clone(&self.selection.annotation)
    }
}

impl ImageHost for CliHost {
    fn current_image(&self) -> Option<ImageInfo> {
        Some(self.image)
    }

    fn selection(&self) -> Option<Selection> {
        Some(self.selection.clone())
    }
}

// =============================================================================
// Run Command
// =============================================================================

async fn run_inference(args: RunArgs) -> ExitCode {
    init_logging(args.verbose);

    if let Err(e) = args.settings.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let layout = match InferenceLayout::resolve_from(&args.settings) {
        Ok(layout) => layout,
        Err(e) => {
            error!("Failed to resolve inference directories: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let model_path = match resolve_model(&args, &layout) {
        Ok(path) => path,
        Err(message) => {
            error!("{}", message);
            return ExitCode::FAILURE;
        }
    };

    let host = CliHost::new(args.pixel_size, args.region);
    let annotation = host.annotation();

    let orchestrator = InferenceOrchestrator::new(
        host,
        DirectoryTileExporter::new(&args.tile_source),
        TokioInvoker,
        layout,
        args.settings.clone(),
    );

    let request = InferenceRequest {
        model_path,
        target_mpp: args.settings.target_mpp,
        confidence: args.settings.confidence,
        region: None,
    };

    let handle = match orchestrator.try_start(request) {
        Ok(handle) => handle,
        Err(e) => {
            error!("Could not start run: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match handle.outcome().await {
        InferenceOutcome::Success {
            polygon_count,
            elapsed_seconds,
            message,
            ..
        } => {
            info!("{}", message);
            info!(
                "Attached {} locked annotation(s) in {:.1}s.",
                polygon_count, elapsed_seconds
            );

            if let Some(out) = args.annotations_out {
                if let Err(e) = write_annotations(&annotation, &out) {
                    error!("Failed to write annotations to {}: {}", out.display(), e);
                    return ExitCode::FAILURE;
                }
                info!("Wrote annotation tree to {}.", out.display());
            }
            ExitCode::SUCCESS
        }
        InferenceOutcome::Failure {
            reason, log_file, ..
        } => {
            error!("{}", reason);
            error!("Full log: {}", log_file.display());
            ExitCode::FAILURE
        }
    }
}

fn resolve_model(args: &RunArgs, layout: &InferenceLayout) -> Result<PathBuf, String> {
    let name = args
        .model
        .clone()
        .or_else(|| args.settings.default_model.clone())
        .ok_or_else(|| "No model given. Pass --model or set TSEG_DEFAULT_MODEL".to_string())?;

    let candidate = PathBuf::from(&name);
    if candidate.is_absolute() {
        Ok(candidate)
    } else {
        Ok(layout.model_path(&name))
    }
}

fn write_annotations(
    annotation: &Arc<Mutex<Annotation>>,
    out: &std::path::Path,
) -> Result<(), std::io::Error> {
    let features = {
        let guard = match annotation.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.to_geojson_features()
    };

    let collection = serde_json::json!({
        "type": "FeatureCollection",
        "features": features,
    });

    std::fs::write(out, collection.to_string())
}

// =============================================================================
// Check Command
// =============================================================================

fn run_check(args: CheckArgs) -> ExitCode {
    if args.verbose {
        init_logging(true);
    }

    println!("TSEG Runner Environment Check");
    println!("═════════════════════════════");
    println!();

    if let Err(e) = args.settings.validate() {
        println!("✗ Settings: {}", e);
        return ExitCode::FAILURE;
    }
    println!("✓ Settings valid");

    let layout = match InferenceLayout::resolve_from(&args.settings) {
        Ok(layout) => {
            println!("✓ Root: {}", layout.root().display());
            layout
        }
        Err(e) => {
            println!("✗ Root: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut healthy = true;

    if layout.has_completed_setup() {
        println!("✓ Setup completed");
    } else {
        println!("✗ Setup marker missing ({})", layout.setup_marker_path().display());
        healthy = false;
    }

    if layout.script_path().is_file() {
        println!("✓ Inference script: {}", layout.script_path().display());
    } else {
        println!("✗ Inference script missing ({})", layout.script_path().display());
        healthy = false;
    }

    println!();
    println!("Models:");
    println!("───────");
    match layout.list_models() {
        Ok(models) if models.is_empty() => {
            println!("  (no models installed)");
            healthy = false;
        }
        Ok(models) => {
            for model in &models {
                let name = model
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                println!("  {}", name);
            }
            println!();
            println!("Total: {} model(s)", models.len());
        }
        Err(e) => {
            println!("  Error listing models: {}", e);
            healthy = false;
        }
    }

    println!();
    println!("═════════════════════════════");
    if healthy {
        println!("✓ Ready to run inference");
        ExitCode::SUCCESS
    } else {
        println!("✗ Environment is not ready");
        ExitCode::FAILURE
    }
}

// =============================================================================
// Add-Model Command
// =============================================================================

fn run_add_model(args: AddModelArgs) -> ExitCode {
    if let Err(e) = args.settings.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let layout = match InferenceLayout::resolve_from(&args.settings) {
        Ok(layout) => layout,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match layout.add_model(&args.model_file) {
        Ok(target) => {
            println!("Model added: {}", target.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "tseg_runner=debug"
    } else {
        "tseg_runner=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// =============================================================================
// Tests
// =============================================================================
