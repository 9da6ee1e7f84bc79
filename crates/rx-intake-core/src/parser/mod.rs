//! Heuristic field parser for raw OCR text.
//!
//! Pure and infallible: it turns messy extracted text into a draft of
//! candidate fields for a human to correct. It never throws and its output
//! is never trusted by the order-gate; only the confirmed medication list
//! on the record is.

mod fields;
mod medications;

pub use fields::*;
pub use medications::*;

use serde::{Deserialize, Serialize};

/// Candidate fields extracted from raw text. `None` means "not detected".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedPrescription {
    pub doctor: Option<String>,
    pub patient: Option<String>,
    pub date: Option<String>,
    pub diagnosis: Option<String>,
    pub instructions: Option<String>,
    pub medications: Vec<MedicationDraft>,
}

impl ParsedPrescription {
    /// True when nothing at all was recognized.
    pub fn is_empty(&self) -> bool {
        self.doctor.is_none()
            && self.patient.is_none()
            && self.date.is_none()
            && self.diagnosis.is_none()
            && self.instructions.is_none()
            && self.medications.is_empty()
    }
}

/// Parse raw OCR text into candidate fields.
pub fn parse(raw: &str) -> ParsedPrescription {
    let lines: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    ParsedPrescription {
        doctor: find_field(&lines, DOCTOR_KEYWORDS),
        patient: find_field(&lines, PATIENT_KEYWORDS),
        date: find_field(&lines, DATE_KEYWORDS),
        diagnosis: find_field(&lines, DIAGNOSIS_KEYWORDS),
        instructions: find_field(&lines, INSTRUCTION_KEYWORDS),
        medications: parse_medication_lines(&lines),
    }
}
