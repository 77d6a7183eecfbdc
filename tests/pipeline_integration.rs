//! End-to-end tests of the detect-and-classify pipeline with in-test models.

use camtrap::Result;
use camtrap::inference::{Classifier, Detector};
use camtrap::output::{BBox, Detection, DetectionCategory, json_info};
use camtrap::pipeline::{
    DetectAndClassify, PredictOptions, collect_image_files, resolve_output_base,
};
use image::{DynamicImage, Rgb, RgbImage};
use std::path::Path;
use tempfile::TempDir;

/// Finds an animal in bright images and nothing in dark ones.
struct BrightnessDetector;

impl Detector for BrightnessDetector {
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let pixel = image.to_rgb8().get_pixel(0, 0).0;
        if pixel[0] < 128 {
            return Ok(Vec::new());
        }
        Ok(vec![
            Detection {
                category: DetectionCategory::Animal,
                confidence: 0.8,
                bbox: BBox {
                    x: 0.0,
                    y: 0.0,
                    width: 0.5,
                    height: 0.5,
                },
                classifications: Vec::new(),
            },
            Detection {
                category: DetectionCategory::Vehicle,
                confidence: 0.4,
                bbox: BBox {
                    x: 0.5,
                    y: 0.5,
                    width: 0.5,
                    height: 0.5,
                },
                classifications: Vec::new(),
            },
        ])
    }
}

/// Scores crops by their green channel: green crops are wombats, others are dingoes.
struct ColorClassifier;

impl Classifier for ColorClassifier {
    fn classify(&mut self, crops: &[DynamicImage]) -> Result<Vec<Vec<f32>>> {
        Ok(crops
            .iter()
            .map(|crop| {
                let [_, g, _] = crop.to_rgb8().get_pixel(0, 0).0;
                if g > 128 {
                    vec![0.1, 0.3, 0.6]
                } else {
                    vec![0.7, 0.2, 0.1]
                }
            })
            .collect())
    }

    fn num_classes(&self) -> usize {
        3
    }
}

fn labels() -> Vec<String> {
    ["Dingo", "Red Fox", "Common Wombat"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn save(dir: &Path, name: &str, color: [u8; 3]) {
    RgbImage::from_pixel(64, 48, Rgb(color))
        .save(dir.join(name))
        .unwrap();
}

#[test]
fn test_pipeline_writes_csv_and_json() {
    let dir = TempDir::new().unwrap();
    let images_dir = dir.path().join("survey");
    let cam = images_dir.join("cam01");
    std::fs::create_dir_all(&cam).unwrap();

    save(&cam, "IMG_0001.png", [200, 200, 50]);
    save(&cam, "IMG_0002.png", [200, 20, 50]);
    save(&images_dir, "night.png", [10, 10, 10]);
    std::fs::write(images_dir.join("corrupt.jpg"), b"\xFF\xD8 truncated").unwrap();

    let images = collect_image_files(&images_dir).unwrap();
    assert_eq!(images.len(), 4);

    let output_base = resolve_output_base("results", &images_dir).unwrap();
    let options = PredictOptions {
        batch_size: 4,
        topn: 2,
        output_base,
        image_root: Some(images_dir.clone()),
        show_progress: false,
        csv_bom: true,
        fail_fast: false,
        json_info: json_info(
            Path::new("models/md_v5a.0.0.onnx"),
            Path::new("models/species.onnx"),
            "tf_efficientnet_b5.ns_jft_in1k",
            0.1,
            0.5,
        ),
    };

    let mut pipeline =
        DetectAndClassify::new(BrightnessDetector, ColorClassifier, labels(), 0.1, 0.5).unwrap();
    let summary = pipeline.predict(&images, &options).unwrap();

    assert_eq!(summary.images, 4);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.detections, 4);
    assert_eq!(summary.classified, 2);
    assert_eq!(summary.label_counts.get("Common Wombat"), Some(&1));
    assert_eq!(summary.label_counts.get("Dingo"), Some(&1));
    assert_eq!(summary.label_counts.get("vehicle"), Some(&2));
    assert_eq!(summary.label_counts.get("Empty"), Some(&1));
    assert_eq!(summary.csv_path, images_dir.join("results.csv"));

    let csv_bytes = std::fs::read(&summary.csv_path).unwrap();
    assert!(csv_bytes.starts_with(b"\xEF\xBB\xBF"));
    let csv = String::from_utf8(csv_bytes[3..].to_vec()).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 1 + 6);
    assert_eq!(
        lines[0],
        "file,detection_category,detection_conf,bbox_x,bbox_y,bbox_w,bbox_h,\
         prediction_1,prediction_1_conf,prediction_2,prediction_2_conf"
    );
    assert!(lines.contains(
        &"cam01/IMG_0001.png,animal,0.8000,0.0000,0.0000,0.5000,0.5000,\
          Common Wombat,0.6000,Red Fox,0.3000"
    ));
    assert!(lines.contains(&"cam01/IMG_0001.png,vehicle,0.4000,0.5000,0.5000,0.5000,0.5000,vehicle,,,"));
    assert!(lines.contains(&"night.png,empty,,,,,,Empty,,,"));
    assert!(lines.contains(&"corrupt.jpg,failed,,,,,,,,,"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&summary.json_path).unwrap()).unwrap();
    assert_eq!(json["info"]["detector"], "md_v5a.0.0.onnx");
    assert_eq!(json["classification_categories"]["2"], "Common Wombat");

    let images = json["images"].as_array().unwrap();
    assert_eq!(images.len(), 4);
    let first = images
        .iter()
        .find(|i| i["file"] == "cam01/IMG_0001.png")
        .unwrap();
    assert_eq!(
        first["detections"][0]["classifications"],
        serde_json::json!([["2", 0.6], ["1", 0.3]])
    );
    let corrupt = images.iter().find(|i| i["file"] == "corrupt.jpg").unwrap();
    assert!(corrupt["failure"].is_string());
}

#[test]
fn test_output_name_with_directory() {
    let dir = TempDir::new().unwrap();
    let name = dir.path().join("reports").join("site.a.csv");

    let base = resolve_output_base(name.to_str().unwrap(), Path::new("/unused")).unwrap();
    assert_eq!(base, dir.path().join("reports").join("site.a"));
    assert!(dir.path().join("reports").is_dir());
}
