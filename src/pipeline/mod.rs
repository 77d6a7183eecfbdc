//! Processing pipeline components.

mod coordinator;
mod processor;

pub use coordinator::{
    collect_image_files, is_image_file, resolve_output_base, validate_image_folder,
    with_appended_extension,
};
pub use processor::{DetectAndClassify, PredictOptions, PredictSummary};
