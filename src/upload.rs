//! Input files: load local paths into named byte buffers for the multipart body.
//!
//! Files are read fully before the request is built. The service stores
//! uploads whole anyway, and an in-memory part can be re-sent when a
//! caller retries after a rate-limit rejection.

use crate::error::ClientError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One file to upload.
#[derive(Clone)]
pub struct UploadFile {
    /// Name sent as the part's `filename`; the service stores the file under it.
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadFile")
            .field("filename", &self.filename)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl UploadFile {
    /// Wrap an in-memory buffer.
    pub fn from_bytes(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a local file, keeping its base name.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| ClientError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());
        debug!("Loaded {} ({} bytes)", path.display(), bytes.len());
        Ok(Self { filename, bytes })
    }

    /// Read several files in order, failing on the first unreadable one.
    pub async fn from_paths(paths: &[PathBuf]) -> Result<Vec<Self>, ClientError> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            files.push(Self::from_path(path).await?);
        }
        Ok(files)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// MIME type guessed from the file extension.
    pub fn mime_type(&self) -> &'static str {
        let ext = Path::new(&self.filename)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => "application/pdf",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "tif" | "tiff" => "image/tiff",
            "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "doc" => "application/msword",
            "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            _ => "application/octet-stream",
        }
    }

    /// Build the multipart part for this file.
    pub(crate) fn to_part(&self) -> reqwest::multipart::Part {
        let part = reqwest::multipart::Part::bytes(self.bytes.clone()).file_name(self.filename.clone());
        // Every MIME string above is well-formed.
        match part.mime_str(self.mime_type()) {
            Ok(part) => part,
            Err(_) => reqwest::multipart::Part::bytes(self.bytes.clone()).file_name(self.filename.clone()),
        }
    }
}
