//! File write helpers shared by backup export and settings.
//!
//! # Invariants
//! - A failed write never truncates or replaces the existing target file.

use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Writes `contents` to `path` through a sibling temp file and rename.
///
/// Creates the parent directory when missing.
pub(crate) fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut staged = NamedTempFile::new_in(parent)?;
    staged.write_all(contents)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|err| err.error)?;
    Ok(())
}
