//! Cover image storage service.
//!
//! Covers are plain files under the configured upload directory, named with
//! a timestamp prefix so replacements never collide. Removal failures are
//! reported to the caller as an ignorable error, never silently swallowed.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::{
    config::CatalogConfig,
    error::{AppError, AppResult},
    models::book::DEFAULT_COVER,
};

const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Clone)]
pub struct CoversService {
    upload_dir: PathBuf,
}

impl CoversService {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            upload_dir: PathBuf::from(&config.upload_dir),
        }
    }

    /// Store an uploaded cover image, returning the stored filename.
    /// Only jpg/jpeg/png uploads are accepted.
    pub async fn store(&self, original_name: &str, data: &[u8]) -> AppResult<String> {
        let sanitized = sanitize_filename(original_name);

        let extension = Path::new(&sanitized)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(AppError::Validation(
                "Cover image must be a jpg, jpeg or png file".to_string(),
            ));
        }

        let filename = format!("{}_{}", Utc::now().format("%Y%m%d%H%M%S"), sanitized);

        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create upload directory: {}", e)))?;

        tokio::fs::write(self.upload_dir.join(&filename), data)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store cover image: {}", e)))?;

        Ok(filename)
    }

    /// Remove a stored cover file. The default cover sentinel is never
    /// deleted. The result is ignorable: a failure must not block the book
    /// mutation that triggered the cleanup, but the caller decides that.
    pub async fn remove(&self, filename: &str) -> std::io::Result<()> {
        if filename == DEFAULT_COVER {
            return Ok(());
        }
        tokio::fs::remove_file(self.upload_dir.join(filename)).await
    }

    /// Remove a stored cover, logging and discarding any failure
    pub async fn remove_best_effort(&self, filename: &str) {
        if let Err(e) = self.remove(filename).await {
            tracing::warn!("Failed to remove cover image {}: {}", filename, e);
        }
    }
}

/// Keep only path-safe characters from a client-supplied filename
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "cover".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_path_separators() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_filename("my cover.jpg"), "my_cover.jpg");
        assert_eq!(sanitize_filename("///"), "cover");
    }
}
