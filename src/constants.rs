//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Default classifier backbone.
pub const DEFAULT_CLASSIFIER_BASE: &str = "tf_efficientnet_b5.ns_jft_in1k";

/// Default minimum detector confidence.
pub const DEFAULT_DETECTION_THRESHOLD: f32 = 0.1;

/// Default minimum classifier confidence before a prediction is reported as unknown.
pub const DEFAULT_CLASSIFICATION_THRESHOLD: f32 = 0.5;

/// Default number of crops per classifier batch.
pub const DEFAULT_CLASSIFICATION_BATCH_SIZE: usize = 4;

/// Maximum allowed classification batch size.
///
/// Classifier inputs are large (456x456 for the default backbone), so a
/// batch of this size already needs roughly 1 GB of input tensor memory.
pub const MAX_BATCH_SIZE: usize = 512;

/// Default number of predictions kept per crop.
pub const DEFAULT_TOPN: usize = 1;

/// Default output name (without extension).
pub const DEFAULT_OUTPUT_NAME: &str = "results";

/// Supported image file extensions (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Label used when the best classification is below the threshold.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Label used for images without detections.
pub const EMPTY_LABEL: &str = "Empty";

/// Detector constants.
pub mod detector {
    /// Default square input size of the detector (`MegaDetector` v5 is exported at 1280).
    pub const DEFAULT_INPUT_SIZE: u32 = 1280;

    /// Input size granularity required by the YOLOv5 stride.
    pub const INPUT_STRIDE: u32 = 32;

    /// Default IoU threshold for non-maximum suppression.
    pub const DEFAULT_NMS_IOU_THRESHOLD: f32 = 0.45;

    /// Gray value used to pad letterboxed images.
    pub const LETTERBOX_FILL: u8 = 114;

    /// Number of leading box values in each output row (cx, cy, w, h, objectness).
    pub const BOX_FIELDS: usize = 5;
}

/// Detection category identifiers, as used by the `MegaDetector` output format.
pub mod categories {
    /// Animal category id.
    pub const ANIMAL: &str = "1";
    /// Person category id.
    pub const PERSON: &str = "2";
    /// Vehicle category id.
    pub const VEHICLE: &str = "3";
}

/// Output file constants.
pub mod output {
    /// CSV output extension.
    pub const CSV_EXTENSION: &str = ".csv";
    /// JSON output extension.
    pub const JSON_EXTENSION: &str = ".json";
    /// Version of the batch output JSON layout.
    pub const JSON_FORMAT_VERSION: &str = "1.4";
    /// Decimal places for confidence formatting in CSV.
    pub const CONFIDENCE_DECIMALS: usize = 4;
    /// Decimal places for normalized bounding boxes in CSV.
    pub const BBOX_DECIMALS: usize = 4;
    /// Category written for images without detections.
    pub const EMPTY_CATEGORY: &str = "empty";
    /// Category written for images that could not be processed.
    pub const FAILED_CATEGORY: &str = "failed";
}

/// Logging constants.
pub mod logging {
    /// Prefix of the default log file name.
    pub const LOG_FILE_PREFIX: &str = "inference_";
    /// Timestamp format embedded in the default log file name.
    pub const LOG_FILE_TIMESTAMP: &str = "%Y%m%d_%H%M%S";
    /// Timestamp format of each log line.
    pub const LOG_LINE_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";
    /// Width of the separator rules in the log.
    pub const RULE_WIDTH: usize = 50;
}

/// Confidence value bounds.
pub mod confidence {
    /// Minimum valid confidence value.
    pub const MIN: f32 = 0.0;
    /// Maximum valid confidence value.
    pub const MAX: f32 = 1.0;
}

/// `ImageNet` normalization statistics used by most classifier backbones.
pub mod imagenet {
    /// Per-channel mean (RGB).
    pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
    /// Per-channel standard deviation (RGB).
    pub const STD: [f32; 3] = [0.229, 0.224, 0.225];
}

/// UTF-8 Byte Order Mark for Excel compatibility in CSV files.
pub const UTF8_BOM: &[u8; 3] = b"\xEF\xBB\xBF";
