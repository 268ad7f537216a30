//! Blob list file parsing

use std::io;
use std::path::Path;

/// Read blob names from a newline-delimited list file
pub async fn read_blob_names(path: &Path) -> io::Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(parse_blob_names(&content))
}

/// One name per line, trimmed; blank lines are ignored
pub fn parse_blob_names(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
