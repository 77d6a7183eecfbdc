//! `MegaDetector` (YOLOv5 export) object detector.

use crate::constants::detector::BOX_FIELDS;
use crate::error::{Error, Result};
use crate::inference::Detector;
use crate::inference::preprocess::{Letterbox, letterbox};
use crate::inference::session::{SessionOptions, build_session, inference_error};
use crate::output::{BBox, Detection, DetectionCategory};
use image::DynamicImage;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use tracing::debug;

/// Detector post-processing settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorSettings {
    /// Square model input size.
    pub input_size: u32,
    /// Minimum score (objectness x class score) to keep a box.
    pub confidence_threshold: f32,
    /// IoU above which the weaker of two same-class boxes is suppressed.
    pub iou_threshold: f32,
}

/// ONNX `MegaDetector` v5.
pub struct MegaDetector {
    session: Session,
    settings: DetectorSettings,
}

impl MegaDetector {
    /// Load the detector model.
    pub fn new(
        model_path: &Path,
        options: &SessionOptions,
        settings: DetectorSettings,
    ) -> Result<Self> {
        let session = build_session(model_path, options, "detector")?;
        Ok(Self { session, settings })
    }
}

impl Detector for MegaDetector {
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<Detection>> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(Vec::new());
        }

        let size = self.settings.input_size;
        let (data, geometry) = letterbox(image, size);
        let side = size as usize;
        let tensor =
            Tensor::from_array(([1usize, 3, side, side], data)).map_err(inference_error)?;

        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .map_err(inference_error)?;
        let (shape, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(inference_error)?;

        let row_len = shape
            .last()
            .and_then(|&n| usize::try_from(n).ok())
            .filter(|&n| n > BOX_FIELDS)
            .ok_or_else(|| Error::Inference {
                reason: format!("unexpected detector output shape {shape:?}"),
            })?;

        let candidates =
            decode_predictions(raw, row_len, self.settings.confidence_threshold, &geometry);
        let count = candidates.len();
        let detections = non_max_suppression(candidates, self.settings.iou_threshold);
        debug!(
            "Detector kept {} of {count} candidate boxes after NMS",
            detections.len()
        );

        Ok(detections)
    }
}

/// Decode raw YOLOv5 rows into detections above `threshold`.
///
/// Each row is `cx, cy, w, h, objectness, class scores...` in letterboxed
/// model pixels. Boxes are mapped back to normalized source coordinates.
pub fn decode_predictions(
    data: &[f32],
    row_len: usize,
    threshold: f32,
    geometry: &Letterbox,
) -> Vec<Detection> {
    data.chunks_exact(row_len)
        .filter_map(|row| {
            let objectness = row[4];
            let (class_index, class_score) = row[BOX_FIELDS..]
                .iter()
                .copied()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(&b.1))?;
            let score = objectness * class_score;
            if score < threshold {
                return None;
            }
            let category = DetectionCategory::from_class_index(class_index)?;

            let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
            let (x0, y0) = geometry.to_normalized(cx - w / 2.0, cy - h / 2.0);
            let (x1, y1) = geometry.to_normalized(cx + w / 2.0, cy + h / 2.0);
            if x1 <= x0 || y1 <= y0 {
                return None;
            }

            Some(Detection {
                category,
                confidence: score,
                bbox: BBox {
                    x: x0,
                    y: y0,
                    width: x1 - x0,
                    height: y1 - y0,
                },
                classifications: Vec::new(),
            })
        })
        .collect()
}

/// Class-aware non-maximum suppression; output is sorted by confidence.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let suppressed = kept.iter().any(|k| {
            k.category == candidate.category && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}
