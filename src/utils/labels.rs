//! Species label file reading utilities.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Read species labels from file.
///
/// # File Format
/// - One label per line, in classifier output order
/// - Surrounding whitespace is trimmed
/// - Blank lines and lines starting with `#` are ignored
///
/// # Errors
/// - `LabelsFileNotFound` if the file does not exist
/// - `LabelsRead` if the file cannot be read or is not valid UTF-8
/// - `NoLabels` if no labels remain after filtering
pub fn read_labels(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(Error::LabelsFileNotFound {
            path: path.to_path_buf(),
        });
    }

    let file = File::open(path).map_err(|e| Error::LabelsRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let reader = BufReader::new(file);
    let mut labels = Vec::new();

    for line in reader.lines() {
        let line = line.map_err(|e| Error::LabelsRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let trimmed = line.trim();
        if !trimmed.is_empty() && !trimmed.starts_with('#') {
            labels.push(trimmed.to_string());
        }
    }

    if labels.is_empty() {
        return Err(Error::NoLabels {
            path: path.to_path_buf(),
        });
    }

    Ok(labels)
}
