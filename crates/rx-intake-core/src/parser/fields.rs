//! Named-field extraction by keyword scan.
//!
//! For each field, the first line (document order) whose lowercase content
//! contains any keyword wins. No scoring. An optional leading `label:`
//! prefix is stripped from the winner.

pub(crate) const DOCTOR_KEYWORDS: &[&str] = &["dr", "doctor", "physician", "md"];
pub(crate) const PATIENT_KEYWORDS: &[&str] = &["patient", "name"];
pub(crate) const DATE_KEYWORDS: &[&str] = &["date"];
pub(crate) const DIAGNOSIS_KEYWORDS: &[&str] = &["diagnosis", "condition", "symptoms"];
pub(crate) const INSTRUCTION_KEYWORDS: &[&str] = &["instructions", "advice", "note"];

/// Scan lines for the first one containing any of the keywords.
pub(crate) fn find_field(lines: &[&str], keywords: &[&str]) -> Option<String> {
    lines
        .iter()
        .find(|line| {
            let lower = line.to_lowercase();
            keywords.iter().any(|keyword| lower.contains(keyword))
        })
        .map(|line| strip_label(line))
}

/// Strip everything up to and including a leading `label:` prefix.
fn strip_label(line: &str) -> String {
    match line.split_once(':') {
        Some((_, value)) => value.trim().to_string(),
        None => line.trim().to_string(),
    }
}
