//! File-level instrumentation with backup and restore.
//!
//! In-place instrumentation copies the original to `<file>.debug_backup`
//! before the target is touched. Restore moves the backup back atomically.

use super::{instrument_source, InstrumentOptions, Instrumented, Language};
use crate::utils::config::BACKUP_SUFFIX;
use crate::utils::error::InstrumentError;
use log::{debug, info};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Outcome of instrumenting one file
#[derive(Debug, Clone)]
pub struct InstrumentReport {
    pub source_path: PathBuf,
    /// Where the instrumented code was written
    pub output_path: PathBuf,
    /// Backup of the original; `None` when writing to another file
    pub backup_path: Option<PathBuf>,
    pub session_id: String,
    pub result: Instrumented,
}

/// Sibling backup path: `app.py` -> `app.py.debug_backup`
pub fn backup_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

pub fn has_backup(path: &Path) -> bool {
    backup_path_for(path).is_file()
}

/// Copy `path` to its backup location and sync it to disk
///
/// An existing backup is kept as-is so repeated instrumentation never
/// replaces the pristine original.
///
/// # Returns
/// The backup path
pub fn create_backup(path: &Path) -> Result<PathBuf, InstrumentError> {
    let backup = backup_path_for(path);

    if backup.exists() {
        info!("Keeping existing backup: {}", backup.display());
        return Ok(backup);
    }

    fs::copy(path, &backup)?;
    File::open(&backup)?.sync_all()?;

    debug!("Backup created: {}", backup.display());
    Ok(backup)
}

/// Put the backup back in place of `path` and delete the backup
///
/// # Errors
/// * `InstrumentError::BackupNotFound` - nothing to restore; `path` untouched
pub fn restore_backup(path: &Path) -> Result<(), InstrumentError> {
    let backup = backup_path_for(path);

    if !backup.is_file() {
        return Err(InstrumentError::BackupNotFound(path.to_path_buf()));
    }

    let original = fs::read(&backup)?;
    write_atomic(path, &original)?;
    fs::remove_file(&backup)?;

    info!("Restored {} from backup", path.display());
    Ok(())
}

/// Replace `path` with `contents` through a temporary sibling and a rename
///
/// **Public** - used for both instrumented output and restore
///
/// Permissions of an existing target are carried over to the new file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), InstrumentError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions())?;
    }

    temp.persist(path).map_err(|e| InstrumentError::Io(e.error))?;
    Ok(())
}

/// Instrument a source file
///
/// **Public** - main entry point for file instrumentation
///
/// # Arguments
/// * `path` - Source file to instrument
/// * `options` - Session id, function filter and STATE lines
/// * `output` - Alternate output file; `None` rewrites `path` in place
///
/// # Errors
/// * `InstrumentError::NotFound` - `path` does not exist
/// * `InstrumentError::UnsupportedLanguage` - extension not recognised
///
/// Neither error touches the file system.
pub fn instrument_file(
    path: &Path,
    options: &InstrumentOptions,
    output: Option<&Path>,
) -> Result<InstrumentReport, InstrumentError> {
    if !path.is_file() {
        return Err(InstrumentError::NotFound(path.to_path_buf()));
    }

    let language = Language::from_path(path)
        .ok_or_else(|| InstrumentError::UnsupportedLanguage(path.to_path_buf()))?;

    info!("Instrumenting {} as {}", path.display(), language);

    let source = fs::read_to_string(path)?;
    let result = instrument_source(&source, language, options);

    let in_place = output.map_or(true, |out| out == path);
    let output_path = output.unwrap_or(path).to_path_buf();

    let backup_path = if in_place {
        Some(create_backup(path)?)
    } else {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directories: {}", parent.display());
                fs::create_dir_all(parent)?;
            }
        }
        None
    };

    write_atomic(&output_path, result.code.as_bytes())?;

    info!(
        "Wrote instrumented code to {} ({} functions, {} lines)",
        output_path.display(),
        result.functions.len(),
        result.lines.len()
    );

    Ok(InstrumentReport {
        source_path: path.to_path_buf(),
        output_path,
        backup_path,
        session_id: options.session_id.clone(),
        result,
    })
}
