//! Camtrap - camera trap image detection and species classification CLI tool.
//!
//! This crate runs a `MegaDetector` object detector over a folder of images and
//! classifies every animal crop with an ONNX species classifier.

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod inference;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod utils;

use clap::Parser;
use cli::Cli;
use config::{Config, InferenceDevice, classifier_preset, load_config, validate_config};
use constants::{IMAGE_EXTENSIONS, logging::RULE_WIDTH};
use inference::{DetectorSettings, MegaDetector, OnnxClassifier, SessionOptions};
use output::{json_info, progress::format_elapsed};
use pipeline::{
    DetectAndClassify, PredictOptions, PredictSummary, collect_image_files, resolve_output_base,
    validate_image_folder,
};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};
use utils::read_labels;

pub use error::{Error, Result};

/// Main entry point for camtrap CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let log_path = cli
        .log_file
        .clone()
        .unwrap_or_else(logging::default_log_path);
    logging::init_logging(&log_path, cli.analyze.verbose, cli.analyze.quiet);

    let cancel = install_interrupt_handler();

    let result = analyze(&cli, cancel);
    if let Err(e) = &result {
        report_failure(e);
    }
    result
}

/// Log a failure under its category.
fn report_failure(err: &Error) {
    if err.is_not_found() {
        error!("File not found: {err}");
    } else if err.is_configuration() {
        error!("Configuration error: {err}");
    } else {
        error!("Unexpected error: {}", err.chain());
    }
}

/// Set a flag on the first Ctrl+C so the run can stop after the current image.
///
/// A second Ctrl+C exits immediately. The handler itself stays quiet; `predict`
/// logs the interruption between images.
fn install_interrupt_handler() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);

    if let Err(e) = ctrlc::set_handler(move || {
        if handler_flag.swap(true, Ordering::SeqCst) {
            std::process::exit(130); // 128 + SIGINT(2)
        }
    }) {
        warn!("Failed to install Ctrl+C handler: {e}");
    }

    flag
}

/// Apply command line overrides on top of the config file.
fn apply_overrides(config: &mut Config, cli: &Cli) {
    let args = &cli.analyze;

    if let Some(output) = cli.output.as_deref().filter(|o| !o.trim().is_empty()) {
        config.output_name = output.to_string();
    }
    if let Some(threshold) = args.detection_threshold {
        config.detection_threshold = threshold;
    }
    if let Some(threshold) = args.classification_threshold {
        config.classification_threshold = threshold;
    }
    if let Some(batch_size) = args.batch_size {
        config.classification_batch_size = batch_size;
    }
    if let Some(topn) = args.topn {
        config.topn = topn;
    }
    if args.gpu {
        config.device = InferenceDevice::Gpu;
    } else if args.cpu {
        config.device = InferenceDevice::Cpu;
    }
    if args.no_csv_bom {
        config.csv_bom = false;
    }
}

/// Run detection and classification over the image folder.
fn analyze(cli: &Cli, cancel: Arc<AtomicBool>) -> Result<()> {
    info!("Loading config from: {}", cli.config.display());
    let mut config = load_config(&cli.config)?;
    apply_overrides(&mut config, cli);

    info!("Loading labels from: {}", config.label_path.display());
    let labels = read_labels(&config.label_path)?;
    info!("Loaded {} species labels", labels.len());

    validate_config(&config, labels.len())?;
    let preset = classifier_preset(&config.classifier_base)?;

    validate_image_folder(&cli.image_folder)?;
    info!("Scanning for images in: {}", cli.image_folder.display());
    let images = collect_image_files(&cli.image_folder)?;
    if images.is_empty() {
        let formats: Vec<String> = IMAGE_EXTENSIONS.iter().map(|e| format!(".{e}")).collect();
        warn!("No images found! Supported formats: {}", formats.join(", "));
        return Ok(());
    }
    info!("Found {} images to process", images.len());

    log_configuration(&config, &cli.image_folder, labels.len());

    let output_base = resolve_output_base(&config.output_name, &cli.image_folder)?;

    info!("Loading models (this may take a moment)...");
    let session_options = SessionOptions {
        device: config.device,
        intra_threads: config.intra_threads,
    };
    let detector = MegaDetector::new(
        &config.detector_path,
        &session_options,
        DetectorSettings {
            input_size: config.detector_input_size,
            confidence_threshold: config.detection_threshold,
            iou_threshold: config.nms_iou_threshold,
        },
    )?;
    let classifier = OnnxClassifier::new(
        &config.classifier_path,
        &session_options,
        preset,
        labels.len(),
        config.classifier_softmax,
    )?;
    let mut pipeline = DetectAndClassify::new(
        detector,
        classifier,
        labels,
        config.detection_threshold,
        config.classification_threshold,
    )?
    .with_cancel_flag(cancel);
    info!("Models loaded successfully!");

    info!("Starting detection and classification...");
    info!("{}", "-".repeat(RULE_WIDTH));

    let options = PredictOptions {
        batch_size: config.classification_batch_size,
        topn: config.topn,
        output_base,
        image_root: Some(cli.image_folder.clone()),
        show_progress: !cli.analyze.quiet && !cli.analyze.no_progress,
        csv_bom: config.csv_bom,
        fail_fast: cli.analyze.fail_fast,
        json_info: json_info(
            &config.detector_path,
            &config.classifier_path,
            &config.classifier_base,
            config.detection_threshold,
            config.classification_threshold,
        ),
    };
    let summary = pipeline.predict(&images, &options)?;

    log_summary(&summary, images.len());
    info!(
        "Results saved to: {} and {}",
        summary.csv_path.display(),
        summary.json_path.display()
    );
    info!("Done!");

    Ok(())
}

fn log_configuration(config: &Config, image_folder: &Path, label_count: usize) {
    let rule = "=".repeat(RULE_WIDTH);
    info!("{rule}");
    info!("Configuration:");
    info!("  Image folder: {}", image_folder.display());
    info!("  Detector: {}", config.detector_path.display());
    info!(
        "  Classifier: {} ({})",
        config.classifier_path.display(),
        config.classifier_base
    );
    info!(
        "  Labels: {} ({label_count} classes)",
        config.label_path.display()
    );
    info!("  Detection threshold: {}", config.detection_threshold);
    info!(
        "  Classification threshold: {}",
        config.classification_threshold
    );
    info!("  Batch size: {}", config.classification_batch_size);
    info!("  Top-n: {}", config.topn);
    info!("  Device: {}", config.device);
    info!("  Output name: {}", config.output_name);
    info!("{rule}");
}

fn log_summary(summary: &PredictSummary, total_images: usize) {
    info!("{}", "-".repeat(RULE_WIDTH));

    if summary.interrupted {
        warn!(
            "Run interrupted: results cover {} of {total_images} images",
            summary.images
        );
    }

    #[allow(clippy::cast_precision_loss)]
    let images_per_sec = if summary.duration_secs > 0.0 {
        summary.images as f64 / summary.duration_secs
    } else {
        0.0
    };
    info!(
        "Processed {} images in {} ({images_per_sec:.2} images/sec)",
        summary.images,
        format_elapsed(summary.duration_secs)
    );
    info!(
        "Detections: {}, classified crops: {}",
        summary.detections, summary.classified
    );
    if summary.failed > 0 {
        warn!("{} image(s) could not be read", summary.failed);
    }

    if !summary.label_counts.is_empty() {
        info!("Predictions:");
        for (label, count) in &summary.label_counts {
            info!("  {label}: {count}");
        }
    }
}
