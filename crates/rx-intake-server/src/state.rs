use std::sync::{Arc, Mutex};

use anyhow::Context;

use rx_intake_core::{Database, IntakeService, MemoryStore, NullNotifier};
use rx_intake_ocr::OcrEngine;

use crate::config::Config;

pub struct AppState {
    pub service: IntakeService,
    pub config: Config,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<SharedState> {
        let db = Database::open(&config.database_path)
            .with_context(|| format!("opening database at {}", config.database_path))?;

        let service = IntakeService::new(
            Arc::new(Mutex::new(db)),
            Arc::new(MemoryStore::new()),
            ocr_engine(),
            Arc::new(NullNotifier),
        );

        Ok(Arc::new(Self { service, config }))
    }
}

#[cfg(feature = "tesseract")]
fn ocr_engine() -> Arc<dyn OcrEngine> {
    Arc::new(rx_intake_ocr::tesseract::TesseractEngine::new("eng"))
}

/// Without the `tesseract` feature every scan extracts to empty text and
/// records go through manual review.
#[cfg(not(feature = "tesseract"))]
fn ocr_engine() -> Arc<dyn OcrEngine> {
    Arc::new(rx_intake_ocr::MockEngine::with_fallback("", 0))
}
