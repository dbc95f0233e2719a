//! fiducial-lens CLI: deskew a quadrilateral out of an image, or replay a
//! recorded tracking frame through capture, projection and rectification.

use clap::{Args, Parser, Subcommand};
use fiducial_lens::core::{parse_level, rectify, Quad};
use fiducial_lens::io::{capture_scene, load_raster, save_raster, CaptureReport, RectifyReport};
use fiducial_lens::recognizer::RecognizerConfig;
use log::LevelFilter;
use nalgebra::Point2;
use std::path::PathBuf;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "fiducial-lens")]
#[command(about = "Deskew tracked planar surfaces out of camera frames")]
#[command(version)]
struct Cli {
    /// Log level: off, error, warn, info, debug or trace. Defaults to the
    /// recognizer config's `log_level` when one is given, else `warn`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rectify a quadrilateral region of an image.
    Rectify(RectifyArgs),

    /// Replay a JSON scene: capture the viewport, project the surface and
    /// rectify it.
    Capture(CaptureArgs),
}

#[derive(Debug, Clone, Args)]
struct RectifyArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Corners as `x,y` in pixels, ordered top-left top-right bottom-left
    /// bottom-right.
    #[arg(
        long,
        num_args = 4,
        value_parser = parse_point,
        required = true,
        allow_hyphen_values = true
    )]
    quad: Vec<Point2<f64>>,

    /// Where to write the rectified image.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Clone, Args)]
struct CaptureArgs {
    /// Scene description (JSON).
    #[arg(long)]
    config: PathBuf,

    /// Where to write the rectified surface image.
    #[arg(long)]
    out: PathBuf,

    /// Recognizer settings (JSON) used to prepare the classifier input.
    #[arg(long, requires = "input_out")]
    recognizer_config: Option<PathBuf>,

    /// Where to write the classifier input image.
    #[arg(long, requires = "recognizer_config")]
    input_out: Option<PathBuf>,
}

fn parse_point(s: &str) -> Result<Point2<f64>, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got {s:?}"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|e| format!("bad coordinate {v:?}: {e}"))
    };
    Ok(Point2::new(parse(x)?, parse(y)?))
}

fn log_filter(
    level: Option<&str>,
    recognizer: Option<&RecognizerConfig>,
) -> CliResult<LevelFilter> {
    match (level, recognizer) {
        (Some(level), _) => {
            Ok(parse_level(level).ok_or_else(|| format!("unknown log level {level:?}"))?)
        }
        (None, Some(cfg)) => Ok(cfg.level_filter()?),
        (None, None) => Ok(LevelFilter::Warn),
    }
}

fn init_logging(filter: LevelFilter) -> CliResult<()> {
    #[cfg(feature = "tracing")]
    {
        let _ = tracing_log::LogTracer::init();
        fiducial_lens::core::init_tracing(false, filter);
    }
    #[cfg(not(feature = "tracing"))]
    fiducial_lens::core::init_with_level(filter).map_err(|e| format!("logger: {e}"))?;

    Ok(())
}

fn run_rectify(args: RectifyArgs) -> CliResult<()> {
    let [tl, tr, bl, br] = <[Point2<f64>; 4]>::try_from(args.quad)
        .map_err(|pts| format!("expected 4 corners, got {}", pts.len()))?;
    let quad = Quad::new(tl, tr, bl, br);

    let img = load_raster(&args.image)?;
    let out = rectify(&img, &quad)?;
    save_raster(&out, &args.out)?;

    let report = RectifyReport {
        input: args.image.display().to_string(),
        output: args.out.display().to_string(),
        quad,
        width: out.width,
        height: out.height,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_capture(args: CaptureArgs, recognizer: Option<RecognizerConfig>) -> CliResult<()> {
    let (capture, rectified) = capture_scene(&args.config)?;
    save_raster(&rectified, &args.out)?;

    let mut classifier_input = None;
    if let (Some(cfg), Some(path)) = (recognizer, &args.input_out) {
        let input = cfg.prepare_input(rectified.clone())?;
        save_raster(&input, path)?;
        classifier_input = Some([input.width, input.height]);
    }

    let report = CaptureReport {
        surface_id: capture.surface_id,
        timestamp: capture.timestamp,
        viewport_width: capture.image.width,
        viewport_height: capture.image.height,
        quad: capture.quad,
        width: rectified.width,
        height: rectified.height,
        classifier_input,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    let recognizer = match &cli.command {
        Commands::Capture(CaptureArgs {
            recognizer_config: Some(path),
            ..
        }) => Some(RecognizerConfig::load_json(path)?),
        _ => None,
    };
    init_logging(log_filter(cli.log_level.as_deref(), recognizer.as_ref())?)?;

    match cli.command {
        Commands::Rectify(args) => run_rectify(args),
        Commands::Capture(args) => run_capture(args, recognizer),
    }
}
