//! OCR wrapper for prescription image text extraction.
//!
//! This crate isolates the optical-character-recognition engine behind the
//! [`OcrEngine`] trait so the intake pipeline never depends on a concrete
//! engine. The real Tesseract-backed engine is gated behind the `tesseract`
//! feature; [`MockEngine`] serves tests and offline development.

pub mod engine;
pub mod mock;

#[cfg(feature = "tesseract")]
pub mod tesseract;

pub use engine::*;
pub use mock::*;
