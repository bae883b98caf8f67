//! Product image uploads.
//!
//! Uploaded files are renamed to `<token>_<sanitized name>` and written under
//! the configured images directory, which is also served at `/static/images`.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// Extensions accepted for product images (lowercase).
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// Placeholder recorded for products without an uploaded image.
pub const DEFAULT_IMAGE: &str = "default.svg";

const TOKEN_LENGTH: usize = 8;

/// Errors from storing an uploaded image.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Nothing usable remains of the filename after sanitizing.
    #[error("upload has no usable filename")]
    MissingFilename,

    #[error("file type not allowed; use one of: {}", ALLOWED_EXTENSIONS.join(", "))]
    DisallowedExtension,

    #[error("could not store image: {0}")]
    Io(#[from] std::io::Error),
}

/// Reduce an uploaded filename to a safe basename.
///
/// Path separators become word breaks, whitespace runs become `_`, anything
/// outside `[A-Za-z0-9_.-]` is dropped, and leading or trailing dots and
/// underscores are stripped, so `../../etc/passwd` becomes `etc_passwd`.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let spaced = name.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_owned()
}

/// Sanitize a filename and check its extension.
///
/// # Errors
///
/// Returns `ImageError::MissingFilename` if nothing remains after sanitizing,
/// `ImageError::DisallowedExtension` if the extension is not an image type.
pub fn validate_filename(name: &str) -> Result<String, ImageError> {
    let sanitized = sanitize_filename(name);
    if sanitized.is_empty() {
        return Err(ImageError::MissingFilename);
    }

    let allowed = sanitized
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
    if !allowed {
        return Err(ImageError::DisallowedExtension);
    }

    Ok(sanitized)
}

/// Writes product images to disk.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Validate and store an upload, returning the stored filename.
    ///
    /// The directory is created if missing.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`validate_filename`], or `ImageError::Io` if the
    /// file cannot be written.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String, ImageError> {
        let sanitized = validate_filename(original_name)?;
        let token: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(TOKEN_LENGTH)
            .collect();
        let stored = format!("{token}_{sanitized}");

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&stored), bytes).await?;

        debug!(file = %stored, size = bytes.len(), "Stored product image");
        Ok(stored)
    }

    /// Best-effort removal of a stored image. The placeholder is never removed.
    pub async fn remove(&self, stored_name: &str) {
        if stored_name == DEFAULT_IMAGE || sanitize_filename(stored_name) != stored_name {
            return;
        }
        if let Err(e) = tokio::fs::remove_file(self.dir.join(stored_name)).await {
            warn!(file = %stored_name, error = %e, "Failed to remove product image");
        }
    }
}
