//! Configuration validation.

use crate::config::{Config, classifier_preset};
use crate::constants::{MAX_BATCH_SIZE, confidence, detector};
use crate::error::{Error, Result};

/// Validate the configuration against the loaded label count.
pub fn validate_config(config: &Config, label_count: usize) -> Result<()> {
    validate_threshold("detection_threshold", config.detection_threshold)?;
    validate_threshold("classification_threshold", config.classification_threshold)?;

    if !(1..=MAX_BATCH_SIZE).contains(&config.classification_batch_size) {
        return Err(Error::ConfigValidation {
            message: format!(
                "classification_batch_size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                config.classification_batch_size
            ),
        });
    }

    if config.topn == 0 {
        return Err(Error::ConfigValidation {
            message: "topn must be at least 1".to_string(),
        });
    }

    if config.topn > label_count {
        return Err(Error::ConfigValidation {
            message: format!(
                "topn ({}) exceeds the number of labels ({label_count})",
                config.topn
            ),
        });
    }

    if config.detector_input_size == 0
        || config.detector_input_size % detector::INPUT_STRIDE != 0
    {
        return Err(Error::ConfigValidation {
            message: format!(
                "detector_input_size must be a positive multiple of {}, got {}",
                detector::INPUT_STRIDE,
                config.detector_input_size
            ),
        });
    }

    if !(config.nms_iou_threshold > 0.0 && config.nms_iou_threshold <= 1.0) {
        return Err(Error::ConfigValidation {
            message: format!(
                "nms_iou_threshold must be in (0, 1], got {}",
                config.nms_iou_threshold
            ),
        });
    }

    if config.intra_threads == Some(0) {
        return Err(Error::ConfigValidation {
            message: "intra_threads must be at least 1".to_string(),
        });
    }

    if config.output_name.trim().is_empty() {
        return Err(Error::ConfigValidation {
            message: "output_name must not be empty".to_string(),
        });
    }

    classifier_preset(&config.classifier_base)?;

    Ok(())
}

fn validate_threshold(name: &str, value: f32) -> Result<()> {
    if !(confidence::MIN..=confidence::MAX).contains(&value) {
        return Err(Error::ConfigValidation {
            message: format!(
                "{name} must be between {} and {}, got {value}",
                confidence::MIN,
                confidence::MAX
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::InferenceDevice;
    use std::path::PathBuf;

    fn config() -> Config {
        Config {
            detector_path: PathBuf::from("md.onnx"),
            classifier_path: PathBuf::from("cls.onnx"),
            label_path: PathBuf::from("labels.txt"),
            classifier_base: "tf_efficientnet_b5.ns_jft_in1k".to_string(),
            detection_threshold: 0.1,
            classification_threshold: 0.5,
            classification_batch_size: 4,
            topn: 1,
            output_name: "results".to_string(),
            device: InferenceDevice::Auto,
            detector_input_size: 1280,
            nms_iou_threshold: 0.45,
            classifier_softmax: true,
            intra_threads: None,
            csv_bom: true,
        }
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&config(), 10).is_ok());
    }

    #[test]
    fn test_validate_invalid_thresholds() {
        let mut c = config();
        c.detection_threshold = 1.5;
        assert!(validate_config(&c, 10).is_err());

        let mut c = config();
        c.classification_threshold = -0.1;
        assert!(validate_config(&c, 10).is_err());
    }

    #[test]
    fn test_validate_batch_size_bounds() {
        let mut c = config();
        c.classification_batch_size = 0;
        assert!(validate_config(&c, 10).is_err());

        c.classification_batch_size = MAX_BATCH_SIZE + 1;
        assert!(validate_config(&c, 10).is_err());
    }

    #[test]
    fn test_validate_topn_against_labels() {
        let mut c = config();
        c.topn = 0;
        assert!(validate_config(&c, 10).is_err());

        c.topn = 5;
        assert!(validate_config(&c, 5).is_ok());
        assert!(validate_config(&c, 4).is_err());
    }

    #[test]
    fn test_validate_detector_input_size() {
        let mut c = config();
        c.detector_input_size = 1000;
        assert!(validate_config(&c, 10).is_err());

        c.detector_input_size = 640;
        assert!(validate_config(&c, 10).is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_output_name() {
        let mut c = config();
        c.output_name = "  ".to_string();
        let err = validate_config(&c, 10).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_validate_unknown_backbone() {
        let mut c = config();
        c.classifier_base = "mystery_net".to_string();
        let err = validate_config(&c, 10).unwrap_err();
        assert!(matches!(err, Error::UnknownClassifierBase { .. }));
    }
}
