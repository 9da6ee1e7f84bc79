//! Tesseract-backed engine, compiled only with the `tesseract` feature.
//!
//! Expects `image_url` to resolve to a local path (the server downloads
//! remote objects before handing them to the engine).

use leptess::LepTess;

use crate::engine::{ExtractionError, ExtractionResult, OcrEngine, OcrOutput, ProgressFn};

pub struct TesseractEngine {
    lang: String,
}

impl TesseractEngine {
    pub fn new(lang: &str) -> Self {
        Self {
            lang: lang.to_string(),
        }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("eng")
    }
}

impl OcrEngine for TesseractEngine {
    fn extract(
        &self,
        image_url: &str,
        progress: Option<ProgressFn<'_>>,
    ) -> ExtractionResult<OcrOutput> {
        let mut tess = LepTess::new(None, &self.lang)
            .map_err(|e| ExtractionError::EngineFailure(e.to_string()))?;

        tess.set_image(image_url)
            .map_err(|e| ExtractionError::UnreachableImage(e.to_string()))?;

        if let Some(report) = progress {
            report(50);
        }

        let text = tess
            .get_utf8_text()
            .map_err(|e| ExtractionError::EngineFailure(e.to_string()))?;

        if let Some(report) = progress {
            report(100);
        }

        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyOutput(image_url.to_string()));
        }

        let confidence = tess.mean_text_conf();
        Ok(OcrOutput::from_raw(text, f64::from(confidence)))
    }
}
