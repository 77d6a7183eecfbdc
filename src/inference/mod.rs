//! Detector and classifier inference.

mod classifier;
mod detector;
pub mod preprocess;
mod session;

pub use classifier::{OnnxClassifier, softmax, top_n};
pub use detector::{DetectorSettings, MegaDetector, decode_predictions, non_max_suppression};
pub use preprocess::open_image;
pub use session::{SessionOptions, build_session, cuda_available};

use crate::error::Result;
use crate::output::Detection;
use image::DynamicImage;

/// Finds objects in an image.
pub trait Detector {
    /// Detect objects, returning boxes normalized to the image size.
    ///
    /// Returned detections carry no classifications.
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<Detection>>;
}

/// Scores image crops against a fixed label set.
pub trait Classifier {
    /// Return one score vector per crop, each `num_classes()` long.
    fn classify(&mut self, crops: &[DynamicImage]) -> Result<Vec<Vec<f32>>>;

    /// Width of each score vector.
    fn num_classes(&self) -> usize;
}
