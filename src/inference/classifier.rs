//! Species classifier over detection crops.

use crate::config::ClassifierPreset;
use crate::error::{Error, Result};
use crate::inference::Classifier;
use crate::inference::preprocess::classifier_input;
use crate::inference::session::{SessionOptions, build_session, inference_error};
use image::DynamicImage;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use tracing::debug;

/// ONNX image classifier with timm-style evaluation preprocessing.
pub struct OnnxClassifier {
    session: Session,
    preset: ClassifierPreset,
    num_classes: usize,
    softmax: bool,
}

impl OnnxClassifier {
    /// Load the classifier model.
    ///
    /// # Arguments
    ///
    /// * `model_path` - Path to the ONNX model
    /// * `options` - Session options shared with the detector
    /// * `preset` - Preprocessing for the model's backbone
    /// * `num_classes` - Expected output width (number of labels)
    /// * `softmax` - Whether the model outputs logits that need a softmax
    pub fn new(
        model_path: &Path,
        options: &SessionOptions,
        preset: ClassifierPreset,
        num_classes: usize,
        softmax: bool,
    ) -> Result<Self> {
        let session = build_session(model_path, options, "classifier")?;
        debug!(
            "Classifier preprocessing: {} (input {}, resize {})",
            preset.name,
            preset.input_size,
            preset.resize_size()
        );

        Ok(Self {
            session,
            preset,
            num_classes,
            softmax,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&mut self, crops: &[DynamicImage]) -> Result<Vec<Vec<f32>>> {
        if crops.is_empty() {
            return Ok(Vec::new());
        }

        let size = self.preset.input_size as usize;
        let mut batch = Vec::with_capacity(crops.len() * 3 * size * size);
        for crop in crops {
            classifier_input(crop, &self.preset, &mut batch);
        }

        let tensor = Tensor::from_array(([crops.len(), 3, size, size], batch))
            .map_err(inference_error)?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .map_err(inference_error)?;
        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(inference_error)?;

        if raw.len() != crops.len() * self.num_classes {
            return Err(Error::LabelMismatch {
                outputs: raw.len() / crops.len(),
                labels: self.num_classes,
            });
        }

        Ok(raw
            .chunks_exact(self.num_classes)
            .map(|scores| {
                if self.softmax {
                    softmax(scores)
                } else {
                    scores.to_vec()
                }
            })
            .collect())
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 {
        exps.into_iter().map(|e| e / sum).collect()
    } else {
        exps
    }
}

/// The `n` highest scores as `(index, score)`, best first, ties by lower index.
pub fn top_n(scores: &[f32], n: usize) -> Vec<(usize, f32)> {
    let mut indexed: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    indexed.truncate(n);
    indexed
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_softmax_handles_large_logits() {
        let probs = softmax(&[1000.0, 1000.0]);
        assert!((probs[0] - 0.5).abs() < 1e-6);
        assert!(probs.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_top_n_orders_by_score_then_index() {
        let top = top_n(&[0.1, 0.4, 0.4, 0.1], 3);
        assert_eq!(top, vec![(1, 0.4), (2, 0.4), (0, 0.1)]);
    }

    #[test]
    fn test_top_n_larger_than_scores() {
        assert_eq!(top_n(&[0.3, 0.7], 5).len(), 2);
        assert!(top_n(&[], 1).is_empty());
    }
}
