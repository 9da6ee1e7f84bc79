//! Order-gate: no prescription-required product ships without a covering
//! prescription.
//!
//! Matching is deliberately lenient - case-insensitive substring containment
//! in either direction is the authoritative rule, with a fuzzy tier below it
//! for OCR/handwriting variance. It is best-effort linkage, not exact SKU
//! matching.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strsim::{jaro_winkler, normalized_levenshtein};
use thiserror::Error;

use crate::db::{Database, DbResult};
use crate::models::{PrescriptionRecord, Product};

/// Gate behavior knobs.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Only `verified`, unexpired prescriptions satisfy the gate. Disable
    /// to reproduce the legacy presence-only check.
    pub require_verified: bool,
    /// Minimum fuzzy similarity for the second matching tier.
    pub fuzzy_threshold: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            require_verified: true,
            fuzzy_threshold: 0.85,
        }
    }
}

/// One line of the cart being checked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub sku: String,
    pub product_name: String,
    pub prescription_required: bool,
}

/// Which prescription covered each required line, for audit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CoverageEntry {
    pub sku: String,
    pub prescription_id: String,
    pub medication: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GateReport {
    pub coverage: Vec<CoverageEntry>,
}

/// Gate failure: the whole order-creation attempt is rejected, never a
/// partial order.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum GateError {
    #[error("no approved prescription covers {product}")]
    Uncovered { product: String },
}

/// The order-gate check itself.
pub struct OrderGate {
    config: GateConfig,
}

impl Default for OrderGate {
    fn default() -> Self {
        Self::new(GateConfig::default())
    }
}

impl OrderGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Check every prescription-required cart line against the supplied
    /// prescriptions. All-or-nothing.
    pub fn check(
        &self,
        cart: &[CartLine],
        prescriptions: &[PrescriptionRecord],
        now: DateTime<Utc>,
    ) -> Result<GateReport, GateError> {
        let mut coverage = Vec::new();

        for line in cart.iter().filter(|line| line.prescription_required) {
            let entry = prescriptions
                .iter()
                .filter(|rx| self.is_eligible(rx, now))
                .find_map(|rx| {
                    rx.medications
                        .iter()
                        .find(|med| self.names_match(&med.name, &line.product_name))
                        .map(|med| CoverageEntry {
                            sku: line.sku.clone(),
                            prescription_id: rx.id.clone(),
                            medication: med.name.clone(),
                        })
                });

            match entry {
                Some(entry) => coverage.push(entry),
                None => {
                    return Err(GateError::Uncovered {
                        product: line.product_name.clone(),
                    })
                }
            }
        }

        Ok(GateReport { coverage })
    }

    fn is_eligible(&self, rx: &PrescriptionRecord, now: DateTime<Utc>) -> bool {
        if !self.config.require_verified {
            return true;
        }
        rx.status().is_verified() && !rx.is_expired(now)
    }

    /// Tier 1: substring containment either direction (case-insensitive).
    /// Tier 2: fuzzy similarity against the whole name and its tokens.
    fn names_match(&self, medication: &str, product: &str) -> bool {
        let med = medication.trim().to_lowercase();
        let prod = product.trim().to_lowercase();
        if med.is_empty() || prod.is_empty() {
            return false;
        }

        if med.contains(&prod) || prod.contains(&med) {
            return true;
        }

        let best = prod
            .split_whitespace()
            .map(|token| fuzzy_match(&med, token))
            .fold(fuzzy_match(&med, &prod), f64::max);

        best >= self.config.fuzzy_threshold
    }
}

/// Compute fuzzy string similarity using combined metrics.
fn fuzzy_match(a: &str, b: &str) -> f64 {
    // Jaro-Winkler favors shared prefixes, Levenshtein overall shape.
    let jw = jaro_winkler(a, b);
    let lev = normalized_levenshtein(a, b);

    jw * 0.6 + lev * 0.4
}

/// Best catalog product for a confirmed medication name, used to attach
/// `product_sku` links after approval.
pub fn best_product_match(
    db: &Database,
    medication_name: &str,
    threshold: f64,
) -> DbResult<Option<Product>> {
    let candidates = db.search_products(medication_name, 10)?;
    let query = medication_name.to_lowercase();

    let best = candidates
        .into_iter()
        .map(|product| {
            let name_score = fuzzy_match(&query, &product.name.to_lowercase());
            let alias_score = product
                .aliases
                .iter()
                .map(|alias| fuzzy_match(&query, &alias.to_lowercase()))
                .fold(0.0, f64::max);
            let token_score = product
                .name
                .split_whitespace()
                .map(|token| fuzzy_match(&query, &token.to_lowercase()))
                .fold(0.0, f64::max);
            (name_score.max(alias_score).max(token_score), product)
        })
        .filter(|(score, _)| *score >= threshold)
        .max_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    Ok(best.map(|(_, product)| product))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DoctorInfo, Medication, NewPrescription};

    fn make_rx(medication_names: &[&str], verified: bool) -> PrescriptionRecord {
        let now = Utc::now();
        let mut record = PrescriptionRecord::create(
            "patient-1".into(),
            NewPrescription {
                doctor: DoctorInfo::new("Dr. Jane Doe", "LIC-12345"),
                medications: medication_names
                    .iter()
                    .map(|name| Medication::new(name, "250mg", "Twice daily", "7 days", 14))
                    .collect(),
                diagnosis: None,
                symptoms: vec![],
                allergies: vec![],
                instructions: None,
                prescription_date: now,
                expiry_date: None,
                priority: None,
            },
            now,
        )
        .unwrap();
        record.mark_uploaded().unwrap();
        record.queue_for_verification().unwrap();
        if verified {
            record.approve("pharm-1".into(), None, now).unwrap();
        }
        record
    }

    fn required(sku: &str, name: &str) -> CartLine {
        CartLine {
            sku: sku.into(),
            product_name: name.into(),
            prescription_required: true,
        }
    }

    #[test]
    fn test_substring_match_covers_line() {
        let gate = OrderGate::default();
        let rx = make_rx(&["Amoxicillin"], true);

        let report = gate
            .check(
                &[required("AMOX-250", "Amoxicillin 250mg")],
                &[rx.clone()],
                Utc::now(),
            )
            .unwrap();
        assert_eq!(report.coverage.len(), 1);
        assert_eq!(report.coverage[0].prescription_id, rx.id);
        assert_eq!(report.coverage[0].medication, "Amoxicillin");
    }

    #[test]
    fn test_uncovered_line_fails_whole_order() {
        let gate = OrderGate::default();
        let rx = make_rx(&["Amoxicillin"], true);

        let cart = [
            required("AMOX-250", "Amoxicillin 250mg"),
            required("OXY-10", "Oxycodone 10mg"),
        ];
        let err = gate.check(&cart, &[rx], Utc::now()).unwrap_err();
        assert_eq!(
            err,
            GateError::Uncovered {
                product: "Oxycodone 10mg".into()
            }
        );
    }

    #[test]
    fn test_no_matching_medication_fails() {
        let gate = OrderGate::default();
        let rx = make_rx(&["Paracetamol"], true);

        let result = gate.check(&[required("AMOX-250", "Amoxicillin 250mg")], &[rx], Utc::now());
        assert!(result.is_err());
    }

    #[test]
    fn test_non_required_lines_ignored() {
        let gate = OrderGate::default();
        let cart = [CartLine {
            sku: "VITC-1".into(),
            product_name: "Vitamin C".into(),
            prescription_required: false,
        }];
        let report = gate.check(&cart, &[], Utc::now()).unwrap();
        assert!(report.coverage.is_empty());
    }

    #[test]
    fn test_unverified_prescription_does_not_satisfy_gate() {
        let gate = OrderGate::default();
        let rx = make_rx(&["Amoxicillin"], false);

        let result = gate.check(&[required("AMOX-250", "Amoxicillin 250mg")], &[rx], Utc::now());
        assert!(result.is_err());
    }

    #[test]
    fn test_presence_only_mode_accepts_pending() {
        let gate = OrderGate::new(GateConfig {
            require_verified: false,
            ..GateConfig::default()
        });
        let rx = make_rx(&["Amoxicillin"], false);

        let report = gate
            .check(&[required("AMOX-250", "Amoxicillin 250mg")], &[rx], Utc::now())
            .unwrap();
        assert_eq!(report.coverage.len(), 1);
    }

    #[test]
    fn test_expired_prescription_does_not_satisfy_gate() {
        let gate = OrderGate::default();
        let rx = make_rx(&["Amoxicillin"], true);
        let far_future = Utc::now() + chrono::Duration::days(800);

        let result = gate.check(
            &[required("AMOX-250", "Amoxicillin 250mg")],
            &[rx],
            far_future,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_fuzzy_tier_accepts_ocr_typo() {
        let gate = OrderGate::default();
        // Dropped letter, the classic handwriting-OCR artifact.
        let rx = make_rx(&["Amoxicilin"], true);

        let report = gate
            .check(&[required("AMOX-250", "Amoxicillin 250mg")], &[rx], Utc::now())
            .unwrap();
        assert_eq!(report.coverage.len(), 1);
    }

    #[test]
    fn test_fuzzy_match_behavior() {
        assert!(fuzzy_match("amoxicillin", "amoxicillin") > 0.99);
        assert!(fuzzy_match("amoxicillin", "amoxicilin") > 0.9);
        assert!(fuzzy_match("amoxicillin", "oxycodone") < 0.6);
    }

    #[test]
    fn test_best_product_match() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_product(
            &Product::new("AMOX-250".into(), "Amoxicillin 250mg Capsules".into())
                .requiring_prescription(),
        )
        .unwrap();
        db.upsert_product(&Product::new("PARA-500".into(), "Paracetamol 500mg".into()))
            .unwrap();

        let best = best_product_match(&db, "Amoxicillin", 0.85).unwrap();
        assert_eq!(best.unwrap().sku, "AMOX-250");

        let none = best_product_match(&db, "Zzyzx", 0.85).unwrap();
        assert!(none.is_none());
    }
}
