//! Prescription intake service.
//!
//! Orchestrates upload validation, image storage, OCR extraction and the
//! record lifecycle over a shared database handle. Extraction failure during
//! submission degrades to an empty draft; the record still reaches the
//! verification queue.

pub mod ingest;

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::{info, warn};

use crate::auth::Caller;
use crate::db::Database;
use crate::error::{CoreError, CoreResult};
use crate::gate::{CartLine, GateConfig, GateReport, OrderGate};
use crate::models::{NewPrescription, PrescriptionRecord, PrescriptionStatus, UpdatePrescription};
use crate::parser::{self, ParsedPrescription};
use crate::workflow::Notifier;
use rx_intake_ocr::OcrEngine;

pub use ingest::{ImageStore, IngestLimits, MemoryStore, StoreError, UploadedFile};

/// Result of a submission: the persisted record plus the parser's draft of
/// the extracted text, for client-side prefill.
#[derive(Debug)]
pub struct SubmitOutcome {
    pub record: PrescriptionRecord,
    pub draft: Option<ParsedPrescription>,
}

pub struct IntakeService {
    pub(crate) db: Arc<Mutex<Database>>,
    pub(crate) limits: IngestLimits,
    pub(crate) store: Arc<dyn ImageStore>,
    pub(crate) engine: Arc<dyn OcrEngine>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) gate: OrderGate,
}

impl IntakeService {
    pub fn new(
        db: Arc<Mutex<Database>>,
        store: Arc<dyn ImageStore>,
        engine: Arc<dyn OcrEngine>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            db,
            limits: IngestLimits::prescriptions(),
            store,
            engine,
            notifier,
            gate: OrderGate::default(),
        }
    }

    pub fn with_gate_config(mut self, config: GateConfig) -> Self {
        self.gate = OrderGate::new(config);
        self
    }

    pub(crate) fn db(&self) -> CoreResult<MutexGuard<'_, Database>> {
        Ok(self.db.lock()?)
    }

    /// Shared handle to the underlying database, for catalog seeding and
    /// maintenance jobs.
    pub fn db_handle(&self) -> Arc<Mutex<Database>> {
        Arc::clone(&self.db)
    }

    /// Submit a prescription: validate, store images, run OCR on the first
    /// image, and queue the record for pharmacist verification.
    pub fn submit(
        &self,
        caller: &Caller,
        input: NewPrescription,
        files: Vec<UploadedFile>,
    ) -> CoreResult<SubmitOutcome> {
        self.limits.validate(&files)?;

        let now = Utc::now();
        let mut record = PrescriptionRecord::create(caller.user_id.clone(), input, now)?;

        for file in &files {
            record.images.push(self.store.put(file)?);
        }
        record.mark_uploaded()?;

        let draft = if record.images.is_empty() {
            None
        } else {
            record.begin_processing()?;
            self.extract_first_image(&mut record)
        };
        record.queue_for_verification()?;

        self.db()?.insert_prescription(&record)?;
        info!(
            prescription = %record.id,
            rx_number = %record.rx_number,
            images = record.images.len(),
            "prescription submitted"
        );
        Ok(SubmitOutcome { record, draft })
    }

    /// OCR the first attached image. Failure is logged and degrades to no
    /// draft; the record moves on regardless.
    fn extract_first_image(&self, record: &mut PrescriptionRecord) -> Option<ParsedPrescription> {
        let url = &record.images[0].url;
        match self.engine.extract(url, None) {
            Ok(output) => {
                record.extracted_text = output.text;
                record.ocr_confidence = output.confidence;
                let draft = parser::parse(&record.extracted_text);
                (!draft.is_empty()).then_some(draft)
            }
            Err(err) => {
                warn!(prescription = %record.id, error = %err, "OCR extraction failed");
                record.extracted_text.clear();
                record.ocr_confidence = 0;
                None
            }
        }
    }

    pub fn get(&self, caller: &Caller, id: &str) -> CoreResult<PrescriptionRecord> {
        let record = self.load(id)?;
        caller.ensure_owner_or_staff(&record.patient_id)?;
        Ok(record)
    }

    /// All prescriptions of a patient, newest first.
    pub fn list_for_patient(
        &self,
        caller: &Caller,
        patient_id: &str,
    ) -> CoreResult<Vec<PrescriptionRecord>> {
        caller.ensure_owner_or_staff(patient_id)?;
        Ok(self.db()?.list_prescriptions_for_patient(patient_id)?)
    }

    /// Patient edit. Blocked once a pharmacist has verified the record.
    pub fn update(
        &self,
        caller: &Caller,
        id: &str,
        update: UpdatePrescription,
    ) -> CoreResult<PrescriptionRecord> {
        let mut record = self.load(id)?;
        caller.ensure_owner(&record.patient_id)?;
        if !record.status().is_editable() {
            return Err(CoreError::Conflict(format!(
                "prescription in {} state cannot be edited",
                record.status().kind()
            )));
        }

        record.apply_update(update)?;
        record.touch();
        self.db()?.update_prescription(&record)?;
        Ok(record)
    }

    /// Patient delete. Refused once the record is verified or fulfilled, or
    /// while any order references it.
    pub fn delete(&self, caller: &Caller, id: &str) -> CoreResult<()> {
        let record = self.load(id)?;
        caller.ensure_owner(&record.patient_id)?;
        if matches!(
            record.status(),
            PrescriptionStatus::Verified { .. } | PrescriptionStatus::Fulfilled
        ) {
            return Err(CoreError::Conflict(format!(
                "prescription in {} state cannot be deleted",
                record.status().kind()
            )));
        }
        if !record.linked_orders.is_empty() {
            return Err(CoreError::Conflict(format!(
                "prescription is linked to {} order(s)",
                record.linked_orders.len()
            )));
        }

        self.db()?.delete_prescription(id)?;
        info!(prescription = %id, "prescription deleted");
        Ok(())
    }

    /// Staff-triggered re-extraction. Unlike submission, engine failure
    /// surfaces to the caller here. Status is left untouched.
    pub fn reprocess(&self, caller: &Caller, id: &str) -> CoreResult<ParsedPrescription> {
        caller.ensure_staff()?;
        let mut record = self.load(id)?;
        if record.images.is_empty() {
            return Err(CoreError::Validation(
                "prescription has no images to reprocess".into(),
            ));
        }

        let output = self.engine.extract(&record.images[0].url, None)?;
        record.extracted_text = output.text;
        record.ocr_confidence = output.confidence;
        record.touch();
        self.db()?.update_prescription(&record)?;

        Ok(parser::parse(&record.extracted_text))
    }

    /// Attach an order reference. Idempotent per order id.
    pub fn link_order(&self, caller: &Caller, id: &str, order_id: &str) -> CoreResult<()> {
        caller.ensure_staff()?;
        let mut record = self.load(id)?;
        if record.linked_orders.iter().any(|o| o == order_id) {
            return Ok(());
        }
        record.linked_orders.push(order_id.to_string());
        record.touch();
        self.db()?.update_prescription(&record)?;
        Ok(())
    }

    /// Consume one refill. Conflict when none remain.
    pub fn use_refill(&self, caller: &Caller, id: &str) -> CoreResult<PrescriptionRecord> {
        caller.ensure_staff()?;
        let mut record = self.load(id)?;
        if record.remaining_refills() == 0 {
            return Err(CoreError::Conflict("no refills remaining".into()));
        }
        record.refills_used += 1;
        record.touch();
        self.db()?.update_prescription(&record)?;
        Ok(record)
    }

    /// `verified -> fulfilled` once every linked order completed.
    pub fn mark_fulfilled(&self, caller: &Caller, id: &str) -> CoreResult<PrescriptionRecord> {
        caller.ensure_staff()?;
        let mut record = self.load(id)?;
        record.mark_fulfilled()?;
        record.touch();
        self.db()?.update_prescription(&record)?;
        Ok(record)
    }

    /// Sweep every non-terminal record whose expiry date has passed.
    /// Returns the number of records expired.
    pub fn expire_overdue(&self) -> CoreResult<usize> {
        let now = Utc::now();
        let db = self.db()?;
        let mut expired = 0;

        for kind in [
            "pending_upload",
            "uploaded",
            "processing",
            "pending_verification",
            "verified",
        ] {
            for mut record in db.list_prescriptions_by_status(kind)? {
                if record.is_expired(now) {
                    record.mark_expired()?;
                    record.touch();
                    db.update_prescription(&record)?;
                    expired += 1;
                }
            }
        }

        if expired > 0 {
            info!(count = expired, "expired overdue prescriptions");
        }
        Ok(expired)
    }

    /// Order-gate check for a cart of catalog SKUs against the caller's own
    /// prescriptions. All-or-nothing: one uncovered line fails the order.
    pub fn check_order(&self, caller: &Caller, skus: &[String]) -> CoreResult<GateReport> {
        let (cart, prescriptions) = {
            let db = self.db()?;
            let mut cart = Vec::with_capacity(skus.len());
            for sku in skus {
                let product = db
                    .get_product(sku)?
                    .ok_or_else(|| CoreError::NotFound(format!("product {sku}")))?;
                cart.push(CartLine {
                    sku: product.sku,
                    product_name: product.name,
                    prescription_required: product.prescription_required,
                });
            }
            let prescriptions = db.list_prescriptions_for_patient(&caller.user_id)?;
            (cart, prescriptions)
        };

        self.gate
            .check(&cart, &prescriptions, Utc::now())
            .map_err(|e| CoreError::Validation(e.to_string()))
    }

    pub(crate) fn load(&self, id: &str) -> CoreResult<PrescriptionRecord> {
        self.db()?
            .get_prescription(id)?
            .ok_or_else(|| CoreError::NotFound(format!("prescription {id}")))
    }
}
