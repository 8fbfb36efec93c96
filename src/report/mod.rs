//! Report rendering and output.

pub mod availability;
pub mod boxplot;

pub use availability::{render_availability, AvailabilityReport};
pub use boxplot::{render_boxplot, BoxplotReport};

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Write `content` to `path`, replacing it atomically.
pub fn write_output(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    file.write_all(content.as_bytes())?;
    file.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_output_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");

        write_output(&path, "first").unwrap();
        write_output(&path, "second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_output_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.md");
        assert!(write_output(&path, "x").is_err());
    }
}
