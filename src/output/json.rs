//! JSON output format writer.
//!
//! The layout follows the `MegaDetector` batch output format so results can be
//! loaded by existing camera trap review tools.

use crate::constants::output::JSON_FORMAT_VERSION;
use crate::error::{Error, Result};
use crate::output::writer::display_path;
use crate::output::{DetectionCategory, ImageResult, OutputWriter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// JSON result file structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonResultFile {
    /// Run metadata.
    pub info: JsonInfo,
    /// Detection category id to name.
    pub detection_categories: BTreeMap<String, String>,
    /// Classification label index (as string) to label.
    pub classification_categories: BTreeMap<String, String>,
    /// Per-image results.
    pub images: Vec<JsonImage>,
}

/// Run metadata for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonInfo {
    /// Layout version.
    pub format_version: String,
    /// Detector model file name.
    pub detector: String,
    /// Classifier model file name.
    pub classifier: String,
    /// Classifier backbone name.
    pub classifier_base: String,
    /// Minimum detector confidence used.
    pub detection_threshold: f32,
    /// Minimum classifier confidence used for named predictions.
    pub classification_threshold: f32,
    /// When the run finished.
    pub detection_completion_time: DateTime<Utc>,
}

/// Results for one image in JSON format.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonImage {
    /// Image path, relative to the image folder when possible.
    pub file: String,
    /// Highest detection confidence (absent for failed images).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_detection_conf: Option<f32>,
    /// Detections (absent for failed images).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detections: Option<Vec<JsonDetection>>,
    /// Failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// Single detection in JSON format.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonDetection {
    /// Detection category id.
    pub category: String,
    /// Detector confidence.
    pub conf: f32,
    /// Normalized `[x_min, y_min, width, height]`.
    pub bbox: [f32; 4],
    /// `[label_index, score]` pairs, best first.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub classifications: Vec<(String, f32)>,
}

/// Writer for JSON result files.
pub struct JsonResultWriter {
    output_path: PathBuf,
    image_root: Option<PathBuf>,
    info: JsonInfo,
    labels: Vec<String>,
    images: Vec<JsonImage>,
}

impl JsonResultWriter {
    /// Create a new JSON result writer.
    ///
    /// # Arguments
    ///
    /// * `output_path` - Path to write the JSON file
    /// * `image_root` - Folder that image paths are written relative to
    /// * `info` - Run metadata; the completion time is refreshed at finalize
    /// * `labels` - Classifier labels, in output index order
    pub fn new(
        output_path: &Path,
        image_root: Option<&Path>,
        info: JsonInfo,
        labels: &[String],
    ) -> Self {
        Self {
            output_path: output_path.to_path_buf(),
            image_root: image_root.map(Path::to_path_buf),
            info,
            labels: labels.to_vec(),
            images: Vec::new(),
        }
    }

    fn to_json_image(&self, result: &ImageResult) -> JsonImage {
        let file = display_path(&result.file, self.image_root.as_deref());

        if let Some(reason) = &result.failure {
            return JsonImage {
                file,
                max_detection_conf: None,
                detections: None,
                failure: Some(reason.clone()),
            };
        }

        let detections = result
            .detections
            .iter()
            .map(|d| JsonDetection {
                category: d.category.id().to_string(),
                conf: d.confidence,
                bbox: [d.bbox.x, d.bbox.y, d.bbox.width, d.bbox.height],
                classifications: d
                    .classifications
                    .iter()
                    .map(|c| (c.label_index.to_string(), c.confidence))
                    .collect(),
            })
            .collect();

        JsonImage {
            file,
            max_detection_conf: Some(result.max_detection_conf()),
            detections: Some(detections),
            failure: None,
        }
    }
}

impl OutputWriter for JsonResultWriter {
    fn write_header(&mut self) -> Result<()> {
        // No header for JSON - written at finalize
        Ok(())
    }

    fn write_image(&mut self, result: &ImageResult) -> Result<()> {
        let image = self.to_json_image(result);
        self.images.push(image);
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        let detection_categories = DetectionCategory::ALL
            .iter()
            .map(|c| (c.id().to_string(), c.name().to_string()))
            .collect();

        let classification_categories = self
            .labels
            .iter()
            .enumerate()
            .map(|(i, label)| (i.to_string(), label.clone()))
            .collect();

        let mut info = self.info.clone();
        info.detection_completion_time = Utc::now();

        let result = JsonResultFile {
            info,
            detection_categories,
            classification_categories,
            images: std::mem::take(&mut self.images),
        };

        let file = File::create(&self.output_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &result).map_err(|e| Error::JsonWrite {
            path: self.output_path.clone(),
            source: e,
        })?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        Ok(())
    }
}

/// Build run metadata for the JSON header.
pub fn json_info(
    detector_path: &Path,
    classifier_path: &Path,
    classifier_base: &str,
    detection_threshold: f32,
    classification_threshold: f32,
) -> JsonInfo {
    let file_name = |p: &Path| {
        p.file_name()
            .map_or_else(|| p.to_string_lossy(), |n| n.to_string_lossy())
            .into_owned()
    };

    JsonInfo {
        format_version: JSON_FORMAT_VERSION.to_string(),
        detector: file_name(detector_path),
        classifier: file_name(classifier_path),
        classifier_base: classifier_base.to_string(),
        detection_threshold,
        classification_threshold,
        detection_completion_time: Utc::now(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::output::{BBox, Classification, Detection};
    use tempfile::NamedTempFile;

    fn info() -> JsonInfo {
        json_info(
            Path::new("models/md_v5a.0.0.onnx"),
            Path::new("models/awc_species.onnx"),
            "tf_efficientnet_b5.ns_jft_in1k",
            0.1,
            0.5,
        )
    }

    #[test]
    fn test_json_info_uses_file_names() {
        let info = info();
        assert_eq!(info.detector, "md_v5a.0.0.onnx");
        assert_eq!(info.classifier, "awc_species.onnx");
        assert_eq!(info.format_version, "1.4");
    }

    #[test]
    fn test_json_writer_layout() {
        let file = NamedTempFile::new().unwrap();
        let labels = vec!["Dingo".to_string(), "Red Fox".to_string()];
        let mut writer =
            JsonResultWriter::new(file.path(), Some(Path::new("/survey")), info(), &labels);

        writer.write_header().unwrap();
        writer
            .write_image(&ImageResult {
                file: PathBuf::from("/survey/cam01/IMG_0001.JPG"),
                detections: vec![Detection {
                    category: DetectionCategory::Animal,
                    confidence: 0.75,
                    bbox: BBox {
                        x: 0.25,
                        y: 0.5,
                        width: 0.125,
                        height: 0.25,
                    },
                    classifications: vec![Classification {
                        label_index: 1,
                        label: "Red Fox".to_string(),
                        confidence: 0.5,
                    }],
                }],
                failure: None,
            })
            .unwrap();
        writer
            .write_image(&ImageResult::failed(
                PathBuf::from("/survey/cam01/IMG_0002.JPG"),
                "failed to decode image".to_string(),
            ))
            .unwrap();
        writer.finalize().unwrap();

        let contents = std::fs::read_to_string(file.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&contents).unwrap();

        assert_eq!(value["detection_categories"]["1"], "animal");
        assert_eq!(value["detection_categories"]["3"], "vehicle");
        assert_eq!(value["classification_categories"]["1"], "Red Fox");

        let first = &value["images"][0];
        assert_eq!(first["file"], "cam01/IMG_0001.JPG");
        assert_eq!(first["max_detection_conf"], 0.75);
        assert_eq!(first["detections"][0]["category"], "1");
        assert_eq!(
            first["detections"][0]["bbox"],
            serde_json::json!([0.25, 0.5, 0.125, 0.25])
        );
        assert_eq!(
            first["detections"][0]["classifications"],
            serde_json::json!([["1", 0.5]])
        );

        let second = &value["images"][1];
        assert_eq!(second["failure"], "failed to decode image");
        assert!(second.get("detections").is_none());
    }

    #[test]
    fn test_json_round_trips_through_types() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = JsonResultWriter::new(file.path(), None, info(), &[]);
        writer
            .write_image(&ImageResult {
                file: PathBuf::from("empty.jpg"),
                detections: Vec::new(),
                failure: None,
            })
            .unwrap();
        writer.finalize().unwrap();

        let contents = std::fs::read_to_string(file.path()).unwrap();
        let parsed: JsonResultFile = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.images.len(), 1);
        assert_eq!(parsed.images[0].max_detection_conf, Some(0.0));
        assert!(parsed.images[0].detections.as_ref().unwrap().is_empty());
    }
}
