//! File import/export and background images.
//!
//! Export always writes the session's working copy, unsaved edits included.
//! Import only stages; a save is still needed to persist the result.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use starlane_core::FormatError;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::prompt::Confirm;
use crate::application::session::{EditorSession, ImportOutcome};

/// File name used when exporting into a directory.
pub const DEFAULT_EXPORT_NAME: &str = "config.json";

/// Background images above this size are accepted with a warning, since the
/// embedded data URL inflates every saved document.
pub const LARGE_BACKGROUND_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("I/O error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("unsupported image type for {0}")]
    UnsupportedImage(PathBuf),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> FileError + '_ {
    move |source| FileError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Writes the working copy to `target`.  When `target` is an existing
/// directory the file is named [`DEFAULT_EXPORT_NAME`] inside it.
///
/// # Errors
///
/// [`FileError::Io`] or [`FileError::Format`].
pub fn export_to_file(session: &EditorSession, target: &Path) -> Result<PathBuf, FileError> {
    let path = if target.is_dir() {
        target.join(DEFAULT_EXPORT_NAME)
    } else {
        target.to_path_buf()
    };
    let text = session.export()?;
    std::fs::write(&path, text).map_err(io_error(&path))?;
    info!(path = %path.display(), "configuration exported");
    Ok(path)
}

/// Reads `path` and stages it into `session` after confirmation.
///
/// # Errors
///
/// [`FileError::Io`] when the file cannot be read, [`FileError::Format`] when
/// it is not a JSON object.  The working copy is untouched in both cases.
pub fn import_from_file(
    session: &mut EditorSession,
    path: &Path,
    confirm: &dyn Confirm,
) -> Result<ImportOutcome, FileError> {
    let text = std::fs::read_to_string(path).map_err(io_error(path))?;
    Ok(session.import(&text, confirm)?)
}

/// Reads an image file and returns it as an embedded `data:` URL.
///
/// # Errors
///
/// [`FileError::Io`] or [`FileError::UnsupportedImage`] for unknown extensions.
pub fn background_from_file(path: &Path) -> Result<String, FileError> {
    let mime = image_mime(path).ok_or_else(|| FileError::UnsupportedImage(path.to_path_buf()))?;
    let bytes = std::fs::read(path).map_err(io_error(path))?;
    if bytes.len() > LARGE_BACKGROUND_BYTES {
        warn!(
            path = %path.display(),
            bytes = bytes.len(),
            "background image is larger than 2 MiB; saving and loading will be slow"
        );
    }
    Ok(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
}

fn image_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "avif" => "image/avif",
        _ => return None,
    })
}
