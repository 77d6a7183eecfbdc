//! Output writer trait definition.

use crate::error::Result;
use crate::output::ImageResult;
use std::path::Path;

/// Trait for writing per-image results.
pub trait OutputWriter {
    /// Write the file header (if applicable).
    fn write_header(&mut self) -> Result<()>;

    /// Write the results for a single image.
    fn write_image(&mut self, result: &ImageResult) -> Result<()>;

    /// Finalize the output (flush, close, etc.).
    fn finalize(&mut self) -> Result<()>;
}

/// Path of an image as written to output files.
///
/// Relative to `root` when the image lives under it, otherwise unchanged.
/// Separators are normalized to `/` so results are portable.
pub fn display_path(file: &Path, root: Option<&Path>) -> String {
    let relative = root
        .and_then(|r| file.strip_prefix(r).ok())
        .unwrap_or(file);
    relative.to_string_lossy().replace('\\', "/")
}
