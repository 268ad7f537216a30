//! Local file checks: skip condition and destination paths

use std::path::{Component, Path, PathBuf};

use crate::error::FetchError;

/// Suffix of the in-progress file a transfer writes before renaming
const PARTIAL_SUFFIX: &str = ".partial";

/// Whether a blob can be skipped because its target file is already present.
///
/// Zero-length files count as not yet downloaded. Metadata errors are treated
/// as a missing file.
pub async fn should_skip(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata.len() > 0,
        Err(_) => false,
    }
}

/// Target path for `name` inside `dest_dir`.
///
/// The name is used unmodified as the file name and must be a single normal
/// path component.
pub fn destination_path(dest_dir: &Path, name: &str) -> Result<PathBuf, FetchError> {
    validate_name(name)?;
    Ok(dest_dir.join(name))
}

/// Hidden sibling of the destination that receives bytes until the transfer succeeds
pub fn partial_path(dest_dir: &Path, name: &str) -> PathBuf {
    dest_dir.join(format!(".{}{}", name, PARTIAL_SUFFIX))
}

fn validate_name(name: &str) -> Result<(), FetchError> {
    let invalid = |reason| FetchError::InvalidName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(invalid("name contains a path separator"));
    }

    if name.starts_with('.') && name.ends_with(PARTIAL_SUFFIX) {
        return Err(invalid("name collides with in-progress download files"));
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid("name is not a plain file name")),
    }
}
