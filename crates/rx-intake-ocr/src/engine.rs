//! OCR engine trait and output types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Extraction errors.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("OCR engine failure: {0}")]
    EngineFailure(String),

    #[error("Image unreachable: {0}")]
    UnreachableImage(String),

    #[error("Engine produced no output for: {0}")]
    EmptyOutput(String),
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// Raw extraction result for a single image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OcrOutput {
    /// Full extracted text, line breaks preserved.
    pub text: String,
    /// Engine confidence, 0-100.
    pub confidence: u8,
}

impl OcrOutput {
    /// Build an output from raw engine values, rounding confidence to the
    /// nearest integer and clamping into 0..=100.
    pub fn from_raw(text: String, confidence: f64) -> Self {
        let confidence = confidence.round().clamp(0.0, 100.0) as u8;
        Self { text, confidence }
    }
}

/// Progress callback, invoked with 0..=100. Purely advisory: engines may
/// call it at any granularity or not at all.
pub type ProgressFn<'a> = &'a dyn Fn(u8);

/// An OCR engine that turns one stored image into text.
pub trait OcrEngine: Send + Sync {
    /// Extract text from the image at `image_url`.
    ///
    /// `progress` receives 0..=100 updates when the engine supports them.
    fn extract(
        &self,
        image_url: &str,
        progress: Option<ProgressFn<'_>>,
    ) -> ExtractionResult<OcrOutput>;
}
