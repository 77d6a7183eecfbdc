//! Input discovery and output placement.

use crate::constants::IMAGE_EXTENSIONS;
use crate::error::{Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Check that the image folder exists and is a directory.
pub fn validate_image_folder(folder: &Path) -> Result<()> {
    if !folder.exists() {
        return Err(Error::ImageFolderNotFound {
            path: folder.to_path_buf(),
        });
    }
    if !folder.is_dir() {
        return Err(Error::NotADirectory {
            path: folder.to_path_buf(),
        });
    }
    Ok(())
}

/// Collect supported images below `folder`, sorted by path.
///
/// Directory symlinks are not followed. Subfolders that cannot be read are
/// skipped with a warning.
pub fn collect_image_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(std::io::Error::from(e).into()),
            Err(e) => {
                let path = e.path().unwrap_or(folder);
                warn!("Skipping unreadable path {}: {e}", path.display());
                continue;
            }
        };

        let path = entry.path();
        let is_file =
            entry.file_type().is_file() || (entry.path_is_symlink() && path.is_file());
        if is_file && is_image_file(path) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

/// Check if a file has a supported image extension.
pub fn is_image_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| {
        IMAGE_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
    })
}

/// Resolve the output base path (without extension) for a run.
///
/// A bare name such as `results` lands inside the image folder; a name with
/// a directory component is used as given and its parent is created.
pub fn resolve_output_base(output_name: &str, image_folder: &Path) -> Result<PathBuf> {
    let base = Path::new(output_name).with_extension("");

    let parent = base.parent().filter(|p| {
        let p = p.as_os_str();
        !p.is_empty() && p != "."
    });

    match parent {
        None => {
            let name = base
                .file_name()
                .map_or_else(|| OsString::from(output_name), ToOwned::to_owned);
            Ok(image_folder.join(name))
        }
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| Error::OutputDirCreateFailed {
                path: dir.to_path_buf(),
                source: e,
            })?;
            Ok(base)
        }
    }
}

/// Append an extension such as `.csv` to a path, keeping any dots already in the name.
pub fn with_appended_extension(base: &Path, extension: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(extension);
    PathBuf::from(name)
}
