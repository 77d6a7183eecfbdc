//! Result types and output format writers.

mod csv;
mod json;
pub mod progress;
mod types;
mod writer;

pub use csv::CsvWriter;
pub use json::{JsonDetection, JsonImage, JsonInfo, JsonResultFile, JsonResultWriter, json_info};
pub use types::{BBox, Classification, Detection, DetectionCategory, ImageResult};
pub use writer::{OutputWriter, display_path};
