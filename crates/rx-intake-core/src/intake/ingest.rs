//! Upload validation and image storage.
//!
//! Validation runs against the whole batch before any byte is stored, so a
//! rejected submission leaves nothing behind in the store.

use thiserror::Error;

use crate::error::{CoreError, CoreResult};
use crate::models::PrescriptionImage;

/// An uploaded file as received from the transport layer.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Per-upload-profile limits. Each intake surface gets its own profile.
#[derive(Debug, Clone)]
pub struct IngestLimits {
    pub max_files: usize,
    pub max_bytes: usize,
    pub allowed_mime: &'static [&'static str],
}

impl IngestLimits {
    /// Prescription uploads: up to 5 files, 10 MiB each, images or PDF.
    pub fn prescriptions() -> Self {
        Self {
            max_files: 5,
            max_bytes: 10 * 1024 * 1024,
            allowed_mime: &["image/jpeg", "image/png", "application/pdf"],
        }
    }

    /// Profile avatars: a single small image.
    pub fn avatars() -> Self {
        Self {
            max_files: 1,
            max_bytes: 2 * 1024 * 1024,
            allowed_mime: &["image/jpeg", "image/png"],
        }
    }

    /// Catalog product photos.
    pub fn products() -> Self {
        Self {
            max_files: 8,
            max_bytes: 5 * 1024 * 1024,
            allowed_mime: &["image/jpeg", "image/png", "image/webp"],
        }
    }

    /// Reject the whole batch on the first violation.
    pub fn validate(&self, files: &[UploadedFile]) -> CoreResult<()> {
        if files.len() > self.max_files {
            return Err(CoreError::Validation(format!(
                "at most {} files per upload, got {}",
                self.max_files,
                files.len()
            )));
        }
        for file in files {
            if !self.allowed_mime.contains(&file.mime_type.as_str()) {
                return Err(CoreError::Validation(format!(
                    "unsupported file type {} for {}",
                    file.mime_type, file.filename
                )));
            }
            if file.bytes.len() > self.max_bytes {
                return Err(CoreError::Validation(format!(
                    "{} exceeds the {} byte limit",
                    file.filename, self.max_bytes
                )));
            }
            if file.bytes.is_empty() {
                return Err(CoreError::Validation(format!(
                    "{} is empty",
                    file.filename
                )));
            }
        }
        Ok(())
    }
}

/// Durable image storage failure.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("image store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for CoreError {
    fn from(e: StoreError) -> Self {
        CoreError::Dependency(e.to_string())
    }
}

/// Durable image storage collaborator. The record keeps only the URL it
/// hands back.
pub trait ImageStore: Send + Sync {
    fn put(&self, file: &UploadedFile) -> Result<PrescriptionImage, StoreError>;
}

/// In-process store issuing `mem://` URLs. Backing bytes are kept so tests
/// and local runs can read them back.
#[derive(Default)]
pub struct MemoryStore {
    objects: std::sync::Mutex<std::collections::HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<Vec<u8>> {
        self.objects.lock().ok()?.get(url).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ImageStore for MemoryStore {
    fn put(&self, file: &UploadedFile) -> Result<PrescriptionImage, StoreError> {
        let url = format!("mem://{}/{}", uuid::Uuid::new_v4(), file.filename);
        let mut objects = self
            .objects
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        objects.insert(url.clone(), file.bytes.clone());
        Ok(PrescriptionImage {
            url,
            original_filename: file.filename.clone(),
            byte_size: file.bytes.len() as u64,
            mime_type: file.mime_type.clone(),
        })
    }
}
