//! Reading media from disk.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lookout_core::media::{is_supported_image, NamedBlob};

/// Read a file into a [`NamedBlob`] named after its final path component.
pub fn read_blob(path: &Path) -> Result<NamedBlob> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))?;
    Ok(NamedBlob::new(filename, bytes))
}

/// Expand batch arguments into files.
///
/// Files are kept as given, in argument order. A directory is replaced by
/// the supported images directly inside it, sorted by name; other entries
/// and subdirectories are skipped.
pub fn expand_images(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }

        let entries =
            fs::read_dir(path).with_context(|| format!("failed to list {}", path.display()))?;
        let mut images: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_supported_image(p))
            .collect();
        images.sort();

        tracing::debug!(dir = %path.display(), images = images.len(), "Expanded directory");
        files.extend(images);
    }
    Ok(files)
}
