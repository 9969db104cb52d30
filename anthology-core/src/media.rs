//! Image validation, storage, and transport encoding.
//!
//! Validation is structural: the bytes must actually decode as an image,
//! not just carry an allowed extension. Stored images are namespaced per
//! user and renamed to `<mtime>_<original-name>`.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageReader;

use crate::error::MediaError;

/// A validated image encoded for inclusion in a provider request.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    /// `data:<mime>;base64,<payload>` URL carried in the image content block.
    pub data_url: String,
}

/// Validate an image file: it must exist, fit the size limit, carry an
/// allowed extension, and decode as an image.
pub fn validate(path: &Path, max_size: u64, allowed_formats: &[String]) -> Result<(), MediaError> {
    let metadata = fs::metadata(path)
        .map_err(|_| MediaError::NotFound(path.display().to_string()))?;

    let size = metadata.len();
    if size > max_size {
        return Err(MediaError::TooLarge {
            size,
            max: max_size,
        });
    }

    let ext = extension(path);
    if !allowed_formats.iter().any(|f| f == &ext) {
        return Err(MediaError::UnsupportedFormat {
            ext,
            allowed: allowed_formats.join(", "),
        });
    }

    let data = fs::read(path)?;
    ImageReader::new(Cursor::new(&data))
        .with_guessed_format()
        .map_err(|e| MediaError::Corrupt(e.to_string()))?
        .decode()
        .map_err(|e| MediaError::Corrupt(e.to_string()))?;

    Ok(())
}

/// Encode an image file as a data URL for a multi-modal request.
pub fn encode(path: &Path) -> Result<ImagePayload, MediaError> {
    let data = fs::read(path)?;
    let encoded = STANDARD.encode(&data);
    Ok(ImagePayload {
        data_url: format!("data:{};base64,{}", mime_type(path), encoded),
    })
}

/// Copy a validated image into the upload tree and return the stored path.
///
/// Images land in `<upload_dir>/<user_id|default>/<mtime>_<original-name>`;
/// the stored path is what gets persisted with the outcome record.
pub fn store(path: &Path, user_id: Option<i64>, upload_dir: &Path) -> Result<PathBuf, MediaError> {
    let subdir = match user_id {
        Some(id) => upload_dir.join(id.to_string()),
        None => upload_dir.join("default"),
    };
    fs::create_dir_all(&subdir)?;

    let original_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    let mtime = fs::metadata(path)?
        .modified()?
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let target = subdir.join(format!("{}_{}", mtime, original_name));
    fs::copy(path, &target)?;

    tracing::info!(path = %target.display(), "image stored");
    Ok(target)
}

/// MIME type for the data-URL prefix, derived from the file extension.
pub fn mime_type(path: &Path) -> &'static str {
    match extension(path).as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
