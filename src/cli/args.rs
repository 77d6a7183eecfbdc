//! CLI argument definitions.

use clap::{Args, Parser};
use std::path::PathBuf;

/// Animal detection and species classification on camera trap images.
#[derive(Debug, Parser)]
#[command(name = "camtrap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Folder containing images to process (subfolders are searched too).
    pub image_folder: PathBuf,

    /// Path to YAML configuration file.
    #[arg(short, long, env = "CAMTRAP_CONFIG")]
    pub config: PathBuf,

    /// Output name for results (overrides config file setting).
    #[arg(short, long, env = "CAMTRAP_OUTPUT")]
    pub output: Option<String>,

    /// Log file path (default: inference_<timestamp>.log in the working directory).
    #[arg(long, env = "CAMTRAP_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Common options for analysis.
    #[command(flatten)]
    pub analyze: AnalyzeArgs,
}

/// Overrides and runtime switches for an analysis run.
#[derive(Debug, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct AnalyzeArgs {
    /// Minimum detector confidence (0.0-1.0).
    #[arg(long, value_parser = parse_confidence, env = "CAMTRAP_DETECTION_THRESHOLD")]
    pub detection_threshold: Option<f32>,

    /// Minimum classifier confidence (0.0-1.0).
    #[arg(long, value_parser = parse_confidence, env = "CAMTRAP_CLASSIFICATION_THRESHOLD")]
    pub classification_threshold: Option<f32>,

    /// Classification batch size.
    #[arg(short, long, env = "CAMTRAP_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// Number of predictions to keep per detection.
    #[arg(long, env = "CAMTRAP_TOPN")]
    pub topn: Option<usize>,

    /// Enable CUDA GPU acceleration.
    #[arg(long, conflicts_with = "cpu")]
    pub gpu: bool,

    /// Force CPU inference.
    #[arg(long, conflicts_with = "gpu")]
    pub cpu: bool,

    /// Disable progress bar.
    #[arg(long)]
    pub no_progress: bool,

    /// Do not prefix CSV output with a UTF-8 BOM.
    #[arg(long)]
    pub no_csv_bom: bool,

    /// Stop on the first image that cannot be read.
    #[arg(long)]
    pub fail_fast: bool,

    /// Only show warnings and errors on the console.
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace+ORT info, -vvv: full trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parse and validate confidence value.
fn parse_confidence(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !(0.0..=1.0).contains(&value) {
        return Err(format!(
            "confidence must be between 0.0 and 1.0, got {value}"
        ));
    }

    Ok(value)
}
