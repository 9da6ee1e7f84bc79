//! Prescription lifecycle state machine.
//!
//! The status is a tagged variant and the transition methods below are the
//! only mutators. Every path to `Verified` or `Rejected` passes through
//! `PendingVerification` - human sign-off is mandatory regardless of OCR
//! confidence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::prescription::PrescriptionRecord;

/// Lifecycle status of a prescription record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PrescriptionStatus {
    /// Record object exists but has not passed creation validation yet.
    PendingUpload,
    /// Created with doctor info, medications and prescription date.
    Uploaded,
    /// OCR extraction in flight (records with at least one image).
    Processing,
    /// Awaiting pharmacist decision.
    PendingVerification,
    /// Pharmacist approved.
    Verified {
        by: String,
        at: DateTime<Utc>,
        notes: Option<String>,
    },
    /// Pharmacist rejected.
    Rejected {
        by: String,
        at: DateTime<Utc>,
        reason: String,
    },
    /// Expiry date passed (time-based terminal state).
    Expired,
    /// All linked orders completed (terminal state).
    Fulfilled,
}

impl PrescriptionStatus {
    /// Scalar tag used for DB queries and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            PrescriptionStatus::PendingUpload => "pending_upload",
            PrescriptionStatus::Uploaded => "uploaded",
            PrescriptionStatus::Processing => "processing",
            PrescriptionStatus::PendingVerification => "pending_verification",
            PrescriptionStatus::Verified { .. } => "verified",
            PrescriptionStatus::Rejected { .. } => "rejected",
            PrescriptionStatus::Expired => "expired",
            PrescriptionStatus::Fulfilled => "fulfilled",
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, PrescriptionStatus::Verified { .. })
    }

    /// Statuses the owning patient may still edit. Once a pharmacist has
    /// decided, and in every terminal state, the record is read-only.
    pub fn is_editable(&self) -> bool {
        matches!(
            self,
            PrescriptionStatus::PendingUpload
                | PrescriptionStatus::Uploaded
                | PrescriptionStatus::Processing
                | PrescriptionStatus::PendingVerification
        )
    }
}

/// Illegal state transition.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StatusError {
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}

pub type StatusResult = Result<(), StatusError>;

impl PrescriptionRecord {
    fn transition(
        &mut self,
        allowed: bool,
        to: PrescriptionStatus,
    ) -> StatusResult {
        if !allowed {
            return Err(StatusError::InvalidTransition {
                from: self.status().kind(),
                to: to.kind(),
            });
        }
        self.set_status(to);
        Ok(())
    }

    /// `pending_upload -> uploaded`, on successful creation validation.
    pub fn mark_uploaded(&mut self) -> StatusResult {
        let ok = matches!(self.status(), PrescriptionStatus::PendingUpload);
        self.transition(ok, PrescriptionStatus::Uploaded)
    }

    /// `uploaded -> processing`, when at least one image is attached.
    pub fn begin_processing(&mut self) -> StatusResult {
        let ok = matches!(self.status(), PrescriptionStatus::Uploaded);
        self.transition(ok, PrescriptionStatus::Processing)
    }

    /// `uploaded|processing -> pending_verification`. Records without
    /// images skip `processing`; OCR failure does not block this move.
    pub fn queue_for_verification(&mut self) -> StatusResult {
        let ok = matches!(
            self.status(),
            PrescriptionStatus::Uploaded | PrescriptionStatus::Processing
        );
        self.transition(ok, PrescriptionStatus::PendingVerification)
    }

    /// `pending_verification -> verified`. Re-approving an already
    /// verified record is a conflict, not a no-op.
    pub fn approve(&mut self, by: String, notes: Option<String>, at: DateTime<Utc>) -> StatusResult {
        let ok = matches!(self.status(), PrescriptionStatus::PendingVerification);
        self.transition(ok, PrescriptionStatus::Verified { by, at, notes })
    }

    /// `pending_verification -> rejected`. A reason is required; empty
    /// reasons are rejected upstream as validation errors.
    pub fn reject(&mut self, by: String, reason: String, at: DateTime<Utc>) -> StatusResult {
        let ok = matches!(self.status(), PrescriptionStatus::PendingVerification);
        self.transition(ok, PrescriptionStatus::Rejected { by, at, reason })
    }

    /// Time-based terminal move once the expiry date has passed.
    pub fn mark_expired(&mut self) -> StatusResult {
        let ok = matches!(
            self.status(),
            PrescriptionStatus::PendingUpload
                | PrescriptionStatus::Uploaded
                | PrescriptionStatus::Processing
                | PrescriptionStatus::PendingVerification
                | PrescriptionStatus::Verified { .. }
        );
        self.transition(ok, PrescriptionStatus::Expired)
    }

    /// `verified -> fulfilled`, once every linked order completed.
    pub fn mark_fulfilled(&mut self) -> StatusResult {
        let ok = self.status().is_verified();
        self.transition(ok, PrescriptionStatus::Fulfilled)
    }
}
