use std::path::{Path, PathBuf};

use crate::error::Result;

/// Name used when a snippet has no usable title.
pub const DEFAULT_SNIPPET_NAME: &str = "code_snippet";

/// Name offered for the original archive download.
pub const DEFAULT_ARCHIVE_NAME: &str = "project.zip";

/// Turn a snippet title into a file stem: punctuation dropped, runs of
/// whitespace collapsed to `_`, lower-cased.
pub fn file_stem_from_title(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    let stem = kept
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase();

    if stem.is_empty() {
        DEFAULT_SNIPPET_NAME.to_string()
    } else {
        stem
    }
}

/// Keep only the final component of a suggested name, so it can never
/// point outside the destination directory.
fn safe_file_name<'a>(suggested: &'a str, fallback: &'a str) -> &'a str {
    Path::new(suggested)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(fallback)
}

/// Write `data` into `dir` under the suggested name.
pub fn save_download(dir: &Path, suggested: &str, fallback: &str, data: &[u8]) -> Result<PathBuf> {
    let path = dir.join(safe_file_name(suggested, fallback));
    std::fs::write(&path, data)?;
    tracing::info!(path = %path.display(), bytes = data.len(), "saved download");
    Ok(path)
}
