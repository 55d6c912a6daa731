//! # Octo Filesystem I/O
//!
//! File: cli/src/common/fs/io.rs
//!
//! ## Overview
//!
//! The only files Octo writes are log exports. This module provides the two
//! operations they need:
//!
//! - **`ensure_dir_exists`**: creates a directory and its parents (mode
//!   `0755` on Unix) unless it already exists, and rejects paths that exist
//!   but are not directories.
//! - **`write_lines`**: writes one line per entry, overwriting the file,
//!   after ensuring the parent directory exists.
//!
//! Failures are reported as `OctoError::Export` so the log viewer can show
//! them as a status message without aborting.
//!
//! ```rust
//! use crate::common::fs::io;
//! # fn run_example() -> crate::core::error::Result<()> {
//! let written = io::write_lines(std::path::Path::new("/tmp/octo/web.log"), &["a".into()])?;
//! assert_eq!(written, 1);
//! # Ok(())
//! # }
//! ```
//!
use crate::core::error::{OctoError, Result};
use anyhow::anyhow;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// Permissions for directories created on export.
#[cfg(unix)]
const DIR_MODE: u32 = 0o755;

fn export_error(action: &str, path: &Path, err: std::io::Error) -> anyhow::Error {
    anyhow!(OctoError::Export(format!("{} {:?}: {}", action, path, err)))
}

/// Ensures that a directory exists at `path`, creating parents as needed.
///
/// # Errors
///
/// `OctoError::Export` if the path exists but is not a directory, or if
/// creation fails (e.g., permissions).
pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(DIR_MODE);
        }
        builder
            .create(path)
            .map_err(|e| export_error("Failed to create directory", path, e))?;
        info!("Created directory: {:?}", path);
    } else if !path.is_dir() {
        anyhow::bail!(OctoError::Export(format!(
            "Path exists but is not a directory: {:?}",
            path
        )));
    } else {
        debug!("Directory already exists: {:?}", path);
    }
    Ok(())
}

/// Writes `lines` to `path`, newline-terminated, replacing any existing file.
///
/// Returns the number of lines written.
pub fn write_lines(path: &Path, lines: &[String]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        ensure_dir_exists(parent)?;
    }
    let file = fs::File::create(path).map_err(|e| export_error("Failed to create", path, e))?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writeln!(writer, "{}", line).map_err(|e| export_error("Failed to write", path, e))?;
    }
    writer
        .flush()
        .map_err(|e| export_error("Failed to write", path, e))?;
    info!("Wrote {} lines to {:?}", lines.len(), path);
    Ok(lines.len())
}
