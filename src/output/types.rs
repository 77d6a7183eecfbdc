//! Output type definitions.

use crate::constants::{EMPTY_LABEL, UNKNOWN_LABEL, categories};
use std::path::PathBuf;

/// Object category reported by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DetectionCategory {
    /// Any animal.
    Animal,
    /// A person.
    Person,
    /// A vehicle.
    Vehicle,
}

impl DetectionCategory {
    /// All categories in id order.
    pub const ALL: [Self; 3] = [Self::Animal, Self::Person, Self::Vehicle];

    /// Map a detector class index to a category.
    pub const fn from_class_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Animal),
            1 => Some(Self::Person),
            2 => Some(Self::Vehicle),
            _ => None,
        }
    }

    /// Category id as used in the JSON output.
    pub const fn id(self) -> &'static str {
        match self {
            Self::Animal => categories::ANIMAL,
            Self::Person => categories::PERSON,
            Self::Vehicle => categories::VEHICLE,
        }
    }

    /// Human-readable category name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Animal => "animal",
            Self::Person => "person",
            Self::Vehicle => "vehicle",
        }
    }
}

impl std::fmt::Display for DetectionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Bounding box normalized to the image size, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BBox {
    /// Left edge (0.0 - 1.0).
    pub x: f32,
    /// Top edge (0.0 - 1.0).
    pub y: f32,
    /// Width (0.0 - 1.0).
    pub width: f32,
    /// Height (0.0 - 1.0).
    pub height: f32,
}

impl BBox {
    /// Box area in normalized units.
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Intersection over union with another box.
    pub fn iou(&self, other: &Self) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }

    /// Pixel rectangle `(x, y, width, height)` inside an image of the given size.
    ///
    /// The rectangle is clamped to the image and is at least one pixel wide and tall.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn to_pixels(&self, image_width: u32, image_height: u32) -> (u32, u32, u32, u32) {
        let w = image_width as f32;
        let h = image_height as f32;

        let x0 = (self.x * w).floor().clamp(0.0, w - 1.0) as u32;
        let y0 = (self.y * h).floor().clamp(0.0, h - 1.0) as u32;
        let x1 = ((self.x + self.width) * w).ceil().clamp(0.0, w) as u32;
        let y1 = ((self.y + self.height) * h).ceil().clamp(0.0, h) as u32;

        (x0, y0, x1.saturating_sub(x0).max(1), y1.saturating_sub(y0).max(1))
    }
}

/// A single species prediction for a crop.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Index into the label list.
    pub label_index: usize,
    /// Label text.
    pub label: String,
    /// Classifier confidence (0.0 - 1.0).
    pub confidence: f32,
}

/// A detected object with its classifications.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Detector category.
    pub category: DetectionCategory,
    /// Detector confidence (0.0 - 1.0).
    pub confidence: f32,
    /// Normalized bounding box.
    pub bbox: BBox,
    /// Top-n classifications, best first. Empty for non-animal detections.
    pub classifications: Vec<Classification>,
}

impl Detection {
    /// Prediction to report for this detection.
    ///
    /// Animals report their best label, or `Unknown` when it scores below
    /// `threshold` or no classification is available. Other categories
    /// report their category name.
    pub fn prediction(&self, threshold: f32) -> &str {
        if self.category != DetectionCategory::Animal {
            return self.category.name();
        }
        match self.classifications.first() {
            Some(best) if best.confidence >= threshold => &best.label,
            _ => UNKNOWN_LABEL,
        }
    }
}

/// Everything produced for a single image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageResult {
    /// Path to the source image.
    pub file: PathBuf,
    /// Detections above the detection threshold.
    pub detections: Vec<Detection>,
    /// Failure description if the image could not be processed.
    pub failure: Option<String>,
}

impl ImageResult {
    /// Result for an image that could not be processed.
    pub fn failed(file: PathBuf, reason: String) -> Self {
        Self {
            file,
            detections: Vec::new(),
            failure: Some(reason),
        }
    }

    /// Highest detection confidence, 0.0 for empty images.
    pub fn max_detection_conf(&self) -> f32 {
        self.detections
            .iter()
            .map(|d| d.confidence)
            .fold(0.0, f32::max)
    }

    /// Labels to count for this image: one per detection, or `Empty`.
    pub fn predictions(&self, threshold: f32) -> Vec<&str> {
        if self.failure.is_some() {
            return Vec::new();
        }
        if self.detections.is_empty() {
            return vec![EMPTY_LABEL];
        }
        self.detections
            .iter()
            .map(|d| d.prediction(threshold))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    fn bbox(x: f32, y: f32, width: f32, height: f32) -> BBox {
        BBox {
            x,
            y,
            width,
            height,
        }
    }

    fn animal(classifications: Vec<Classification>) -> Detection {
        Detection {
            category: DetectionCategory::Animal,
            confidence: 0.9,
            bbox: BBox::default(),
            classifications,
        }
    }

    #[test]
    fn test_category_ids() {
        assert_eq!(
            DetectionCategory::from_class_index(0),
            Some(DetectionCategory::Animal)
        );
        assert_eq!(
            DetectionCategory::from_class_index(2),
            Some(DetectionCategory::Vehicle)
        );
        assert_eq!(DetectionCategory::from_class_index(3), None);
        assert_eq!(DetectionCategory::Person.id(), "2");
        assert_eq!(DetectionCategory::Vehicle.to_string(), "vehicle");
    }

    #[test]
    fn test_iou() {
        let a = bbox(0.0, 0.0, 0.5, 0.5);
        let b = bbox(0.25, 0.0, 0.5, 0.5);
        let c = bbox(0.6, 0.6, 0.2, 0.2);

        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
        assert!((a.iou(&b) - (0.125 / 0.375)).abs() < 1e-6);
        assert_eq!(a.iou(&c), 0.0);
    }

    #[test]
    fn test_to_pixels_clamps_and_has_minimum_size() {
        let inside = bbox(0.5, 0.25, 0.25, 0.5);
        assert_eq!(inside.to_pixels(200, 100), (100, 25, 50, 50));

        let outside = bbox(0.995, 0.995, 0.5, 0.5);
        let (x, y, w, h) = outside.to_pixels(100, 100);
        assert_eq!((x, y), (99, 99));
        assert_eq!((w, h), (1, 1));

        let degenerate = bbox(0.1, 0.1, 0.0, 0.0);
        let (_, _, w, h) = degenerate.to_pixels(100, 100);
        assert!(w >= 1 && h >= 1);
    }

    #[test]
    fn test_prediction_thresholding() {
        let confident = animal(vec![Classification {
            label_index: 0,
            label: "Dingo".to_string(),
            confidence: 0.8,
        }]);
        assert_eq!(confident.prediction(0.5), "Dingo");
        assert_eq!(confident.prediction(0.9), "Unknown");

        assert_eq!(animal(Vec::new()).prediction(0.5), "Unknown");

        let person = Detection {
            category: DetectionCategory::Person,
            ..animal(Vec::new())
        };
        assert_eq!(person.prediction(0.5), "person");
    }

    #[test]
    fn test_image_predictions() {
        let empty = ImageResult {
            file: PathBuf::from("a.jpg"),
            detections: Vec::new(),
            failure: None,
        };
        assert_eq!(empty.predictions(0.5), vec!["Empty"]);
        assert_eq!(empty.max_detection_conf(), 0.0);

        let failed = ImageResult::failed(PathBuf::from("b.jpg"), "truncated".to_string());
        assert!(failed.predictions(0.5).is_empty());
    }
}
