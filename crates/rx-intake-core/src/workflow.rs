//! Pharmacist verification workflow.
//!
//! Pending records are served urgent-first, oldest-first within the same
//! priority. A decision is final: approving or rejecting a record that has
//! already been decided is a conflict.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::Caller;
use crate::error::{CoreError, CoreResult};
use crate::gate;
use crate::intake::IntakeService;
use crate::models::PrescriptionRecord;

/// Pharmacist decision on a pending record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Approve {
        #[serde(default)]
        notes: Option<String>,
    },
    Reject {
        reason: String,
    },
}

/// What happened to the patient notification for a decision. Notification
/// failure never rolls the decision back.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NotifyOutcome {
    Sent,
    Skipped,
    Failed { reason: String },
}

/// Patient notification collaborator.
pub trait Notifier: Send + Sync {
    fn notify_decision(&self, record: &PrescriptionRecord) -> NotifyOutcome;
}

/// No-op notifier for deployments without an email channel.
#[derive(Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify_decision(&self, _record: &PrescriptionRecord) -> NotifyOutcome {
        NotifyOutcome::Skipped
    }
}

impl IntakeService {
    /// Verification queue, urgent-first then oldest-first.
    pub fn pending_queue(&self, caller: &Caller) -> CoreResult<Vec<PrescriptionRecord>> {
        caller.ensure_staff()?;
        let mut queue = self
            .db()?
            .list_prescriptions_by_status("pending_verification")?;
        queue.sort_by(|a, b| {
            b.priority
                .rank()
                .cmp(&a.priority.rank())
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(queue)
    }

    /// Apply a pharmacist decision and notify the patient best-effort.
    pub fn decide(
        &self,
        caller: &Caller,
        id: &str,
        decision: Decision,
    ) -> CoreResult<(PrescriptionRecord, NotifyOutcome)> {
        caller.ensure_staff()?;
        let mut record = self.load(id)?;
        let now = Utc::now();

        match decision {
            Decision::Approve { notes } => {
                record.approve(caller.user_id.clone(), notes, now)?;
                self.link_catalog_products(&mut record);
            }
            Decision::Reject { reason } => {
                if reason.trim().is_empty() {
                    return Err(CoreError::Validation(
                        "a rejection reason is required".into(),
                    ));
                }
                record.reject(caller.user_id.clone(), reason, now)?;
            }
        }

        record.touch();
        self.db()?.update_prescription(&record)?;
        info!(
            prescription = %record.id,
            status = record.status().kind(),
            reviewer = %caller.user_id,
            "verification decision recorded"
        );

        let notify = self.notifier.notify_decision(&record);
        if let NotifyOutcome::Failed { reason } = &notify {
            warn!(prescription = %record.id, reason = %reason, "decision notification failed");
        }
        Ok((record, notify))
    }

    /// Attach catalog SKUs to approved medications when the catalog has a
    /// confident match. Best-effort; lookup failures are logged and skipped.
    fn link_catalog_products(&self, record: &mut PrescriptionRecord) {
        let db = match self.db() {
            Ok(db) => db,
            Err(err) => {
                warn!(prescription = %record.id, error = %err, "catalog lookup unavailable");
                return;
            }
        };
        let threshold = self.gate.config().fuzzy_threshold;
        for med in record.medications.iter_mut().filter(|m| m.product_sku.is_none()) {
            match gate::best_product_match(&db, &med.name, threshold) {
                Ok(Some(product)) => med.product_sku = Some(product.sku),
                Ok(None) => {}
                Err(err) => {
                    warn!(medication = %med.name, error = %err, "catalog lookup failed");
                }
            }
        }
    }
}
