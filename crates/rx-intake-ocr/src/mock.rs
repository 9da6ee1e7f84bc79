//! Mock engines for testing without a real OCR backend.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::engine::{ExtractionError, ExtractionResult, OcrEngine, OcrOutput, ProgressFn};

/// Deterministic engine returning canned text per URL.
#[derive(Default)]
pub struct MockEngine {
    responses: HashMap<String, OcrOutput>,
    fallback: Option<OcrOutput>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that answers every URL with the same output.
    pub fn with_fallback(text: &str, confidence: u8) -> Self {
        Self {
            responses: HashMap::new(),
            fallback: Some(OcrOutput {
                text: text.to_string(),
                confidence,
            }),
        }
    }

    /// Register a canned response for a specific URL.
    pub fn respond(mut self, url: &str, text: &str, confidence: u8) -> Self {
        self.responses.insert(
            url.to_string(),
            OcrOutput {
                text: text.to_string(),
                confidence,
            },
        );
        self
    }
}

impl OcrEngine for MockEngine {
    fn extract(
        &self,
        image_url: &str,
        progress: Option<ProgressFn<'_>>,
    ) -> ExtractionResult<OcrOutput> {
        if let Some(report) = progress {
            report(0);
            report(100);
        }

        self.responses
            .get(image_url)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| ExtractionError::UnreachableImage(image_url.to_string()))
    }
}

/// Engine that always fails, for degradation tests.
pub struct FailingEngine;

impl OcrEngine for FailingEngine {
    fn extract(
        &self,
        image_url: &str,
        _progress: Option<ProgressFn<'_>>,
    ) -> ExtractionResult<OcrOutput> {
        Err(ExtractionError::EngineFailure(format!(
            "simulated failure for {image_url}"
        )))
    }
}

/// Engine that records every URL it was asked to extract.
#[derive(Default)]
pub struct RecordingEngine {
    pub calls: Mutex<Vec<String>>,
    inner: MockEngine,
}

impl RecordingEngine {
    pub fn new(text: &str, confidence: u8) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            inner: MockEngine::with_fallback(text, confidence),
        }
    }
}

impl OcrEngine for RecordingEngine {
    fn extract(
        &self,
        image_url: &str,
        progress: Option<ProgressFn<'_>>,
    ) -> ExtractionResult<OcrOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(image_url.to_string());
        }
        self.inner.extract(image_url, progress)
    }
}
