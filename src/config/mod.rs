//! Configuration loading and management.

mod file;
mod presets;
mod types;
mod validate;

pub use file::load_config;
pub use presets::{ClassifierPreset, classifier_preset};
pub use types::{Config, InferenceDevice};
pub use validate::validate_config;
