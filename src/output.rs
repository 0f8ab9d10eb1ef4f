use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::Builder;

/// Replaces `path` with `content` so readers see either the old or the new document.
///
/// The temporary file lives next to the destination and is removed if any
/// step fails, leaving the previous document untouched.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create output directory {}", parent.display()))?;

    let mut tmp = Builder::new()
        .prefix(".workspace-monitor-")
        .suffix(".md")
        .tempfile_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
    tmp.write_all(content.as_bytes())
        .context("failed to write output temp file")?;
    tmp.flush().context("failed to flush output temp file")?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("failed to move output into place at {}", path.display()))?;
    Ok(())
}
