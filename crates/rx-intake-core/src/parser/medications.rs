//! Medication line extraction.
//!
//! Any line carrying a dosage/form keyword is treated as a medication line.
//! Per-line fields that fail to match yield empty strings, not errors - the
//! draft goes to a human reviewer either way.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Dosage/form keywords marking a medication line.
const MEDICATION_KEYWORDS: &[&str] = &[
    "tablet", "capsule", "syrup", "mg", "ml", "dose", "tab", "cap",
];

static DOSAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\d+(?:\.\d+)?\s*(?:mg|ml|g|mcg|iu)\b").unwrap());

static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:for\s+)?(\d+\s+(?:day|week|month)s?)\b").unwrap());

/// Numeric frequency form, e.g. "3 times a day".
static NUMERIC_FREQ_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+)\s*times?\s*(?:a\s+day|per\s+day|daily)\b").unwrap());

/// Named and abbreviated frequency forms, tried in order after the numeric
/// form. First matching pattern wins.
static NAMED_FREQS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"(?i)\bonce\s+(?:a\s+day|daily)\b").unwrap(),
            "Once daily",
        ),
        (
            Regex::new(r"(?i)\btwice\s+(?:a\s+day|daily)\b").unwrap(),
            "Twice daily",
        ),
        (
            Regex::new(r"(?i)\bthrice\s+(?:a\s+day|daily)\b").unwrap(),
            "Three times daily",
        ),
        (Regex::new(r"(?i)\bbid\b").unwrap(), "Twice daily"),
        (Regex::new(r"(?i)\btid\b").unwrap(), "Three times daily"),
        (Regex::new(r"(?i)\bqid\b").unwrap(), "Four times daily"),
    ]
});

/// A medication candidate parsed from one line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicationDraft {
    /// First whitespace token of the line.
    pub name: String,
    /// e.g. "250mg"; empty when not detected.
    pub dosage: String,
    /// e.g. "Twice daily"; empty when not detected.
    pub frequency: String,
    /// e.g. "7 days"; empty when not detected.
    pub duration: String,
    /// The source line, kept for the reviewer.
    pub line: String,
}

/// Extract medication drafts from non-blank lines.
pub(crate) fn parse_medication_lines(lines: &[&str]) -> Vec<MedicationDraft> {
    lines
        .iter()
        .filter(|line| is_medication_line(line))
        .map(|line| parse_medication_line(line))
        .collect()
}

fn is_medication_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    MEDICATION_KEYWORDS
        .iter()
        .any(|keyword| lower.contains(keyword))
}

fn parse_medication_line(line: &str) -> MedicationDraft {
    let name = line
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string();

    let dosage = DOSAGE_RE
        .find(line)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    let duration = DURATION_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    MedicationDraft {
        name,
        dosage,
        frequency: parse_frequency(line),
        duration,
        line: line.to_string(),
    }
}

/// Match frequency forms in priority order: explicit numeric first, then
/// named forms, then clinical abbreviations.
fn parse_frequency(line: &str) -> String {
    if let Some(caps) = NUMERIC_FREQ_RE.captures(line) {
        return format!("{} times daily", &caps[1]);
    }
    for (pattern, canonical) in NAMED_FREQS.iter() {
        if pattern.is_match(line) {
            return (*canonical).to_string();
        }
    }
    String::new()
}
