//! Configuration type definitions.

use crate::constants::{
    DEFAULT_CLASSIFICATION_BATCH_SIZE, DEFAULT_CLASSIFICATION_THRESHOLD, DEFAULT_CLASSIFIER_BASE,
    DEFAULT_DETECTION_THRESHOLD, DEFAULT_OUTPUT_NAME, DEFAULT_TOPN, detector,
};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Complete run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the detector ONNX model.
    pub detector_path: PathBuf,

    /// Path to the classifier ONNX model.
    pub classifier_path: PathBuf,

    /// Path to the species labels file.
    pub label_path: PathBuf,

    /// Classifier backbone name, selects preprocessing.
    pub classifier_base: String,

    /// Minimum detector confidence.
    pub detection_threshold: f32,

    /// Minimum classifier confidence for a named prediction.
    pub classification_threshold: f32,

    /// Number of crops per classifier batch.
    pub classification_batch_size: usize,

    /// Number of predictions kept per crop.
    pub topn: usize,

    /// Output name, without extension.
    pub output_name: String,

    /// Device to use for inference.
    pub device: InferenceDevice,

    /// Square detector input size in pixels.
    pub detector_input_size: u32,

    /// IoU threshold for non-maximum suppression.
    pub nms_iou_threshold: f32,

    /// Apply softmax to classifier outputs.
    pub classifier_softmax: bool,

    /// Intra-op thread count for ONNX Runtime.
    pub intra_threads: Option<usize>,

    /// Prefix the CSV with a UTF-8 BOM.
    pub csv_bom: bool,
}

/// Configuration as written in the file, before the required-field check.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawConfig {
    detector_path: Option<PathBuf>,
    classifier_path: Option<PathBuf>,
    label_path: Option<PathBuf>,
    classifier_base: Option<String>,
    detection_threshold: Option<f32>,
    classification_threshold: Option<f32>,
    classification_batch_size: Option<usize>,
    topn: Option<usize>,
    output_name: Option<String>,
    #[serde(default)]
    device: InferenceDevice,
    detector_input_size: Option<u32>,
    nms_iou_threshold: Option<f32>,
    classifier_softmax: Option<bool>,
    intra_threads: Option<usize>,
    csv_bom: Option<bool>,
}

impl TryFrom<RawConfig> for Config {
    type Error = Error;

    fn try_from(raw: RawConfig) -> Result<Self> {
        let mut missing = Vec::new();
        if raw.detector_path.is_none() {
            missing.push("detector_path");
        }
        if raw.classifier_path.is_none() {
            missing.push("classifier_path");
        }
        if raw.label_path.is_none() {
            missing.push("label_path");
        }

        let (Some(detector_path), Some(classifier_path), Some(label_path)) =
            (raw.detector_path, raw.classifier_path, raw.label_path)
        else {
            return Err(Error::MissingConfigFields { fields: missing });
        };

        Ok(Self {
            detector_path,
            classifier_path,
            label_path,
            classifier_base: raw
                .classifier_base
                .unwrap_or_else(|| DEFAULT_CLASSIFIER_BASE.to_string()),
            detection_threshold: raw
                .detection_threshold
                .unwrap_or(DEFAULT_DETECTION_THRESHOLD),
            classification_threshold: raw
                .classification_threshold
                .unwrap_or(DEFAULT_CLASSIFICATION_THRESHOLD),
            classification_batch_size: raw
                .classification_batch_size
                .unwrap_or(DEFAULT_CLASSIFICATION_BATCH_SIZE),
            topn: raw.topn.unwrap_or(DEFAULT_TOPN),
            output_name: raw
                .output_name
                .unwrap_or_else(|| DEFAULT_OUTPUT_NAME.to_string()),
            device: raw.device,
            detector_input_size: raw
                .detector_input_size
                .unwrap_or(detector::DEFAULT_INPUT_SIZE),
            nms_iou_threshold: raw
                .nms_iou_threshold
                .unwrap_or(detector::DEFAULT_NMS_IOU_THRESHOLD),
            classifier_softmax: raw.classifier_softmax.unwrap_or(true),
            intra_threads: raw.intra_threads,
            csv_bom: raw.csv_bom.unwrap_or(true),
        })
    }
}

/// Inference device configuration.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InferenceDevice {
    /// Use CUDA when available, else CPU.
    #[default]
    Auto,
    /// Request CUDA, warn and fall back to CPU if unavailable.
    Gpu,
    /// Force CPU inference.
    Cpu,
}

impl std::fmt::Display for InferenceDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Gpu => write!(f, "gpu"),
            Self::Cpu => write!(f, "cpu"),
        }
    }
}
