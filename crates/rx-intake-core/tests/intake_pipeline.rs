//! End-to-end pipeline tests: submission through verification and the
//! order-gate, against an in-memory database.

use std::sync::{Arc, Mutex};

use rx_intake_core::workflow::{Decision, Notifier, NotifyOutcome};
use rx_intake_core::{
    Caller, Database, DoctorInfo, GateConfig, IntakeService, Medication, MemoryStore,
    NewPrescription, NullNotifier, PrescriptionRecord, Priority, Product, UploadedFile,
};
use rx_intake_ocr::{FailingEngine, MockEngine, OcrEngine};

const SCAN_TEXT: &str = "\
Dr. John Smith
Patient: Jane Doe
Date: 2026-01-15
Diagnosis: Bacterial infection
Amoxicillin 250mg tablet twice daily for 7 days
Instructions: Take after meals";

struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify_decision(&self, _record: &PrescriptionRecord) -> NotifyOutcome {
        NotifyOutcome::Failed {
            reason: "smtp unreachable".into(),
        }
    }
}

fn service_with(engine: Arc<dyn OcrEngine>, notifier: Arc<dyn Notifier>) -> IntakeService {
    let db = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
    IntakeService::new(db, Arc::new(MemoryStore::new()), engine, notifier)
}

fn service() -> IntakeService {
    service_with(
        Arc::new(MockEngine::with_fallback(SCAN_TEXT, 91)),
        Arc::new(NullNotifier),
    )
}

fn rx_input() -> NewPrescription {
    NewPrescription {
        doctor: DoctorInfo::new("Dr. John Smith", "LIC-98765"),
        medications: vec![Medication::new(
            "Amoxicillin",
            "250mg",
            "Twice daily",
            "7 days",
            14,
        )],
        diagnosis: Some("Bacterial infection".into()),
        symptoms: vec!["fever".into()],
        allergies: vec![],
        instructions: None,
        prescription_date: chrono::Utc::now(),
        expiry_date: None,
        priority: None,
    }
}

fn scan(name: &str) -> UploadedFile {
    UploadedFile {
        filename: name.into(),
        mime_type: "image/jpeg".into(),
        bytes: vec![0u8; 512],
    }
}

#[test]
fn test_submit_runs_full_pipeline() {
    let service = service();
    let patient = Caller::patient("patient-1");

    let outcome = service
        .submit(&patient, rx_input(), vec![scan("front.jpg"), scan("back.jpg")])
        .unwrap();

    let record = &outcome.record;
    assert_eq!(record.status().kind(), "pending_verification");
    assert_eq!(record.images.len(), 2);
    assert_eq!(record.extracted_text, SCAN_TEXT);
    assert_eq!(record.ocr_confidence, 91);

    let draft = outcome.draft.expect("draft expected from scan text");
    assert_eq!(draft.doctor.as_deref(), Some("Dr. John Smith"));
    assert_eq!(draft.medications.len(), 1);
    assert_eq!(draft.medications[0].name, "Amoxicillin");

    // Persisted, readable by its owner.
    let loaded = service.get(&patient, &record.id).unwrap();
    assert_eq!(&loaded, record);
}

#[test]
fn test_submit_without_images_skips_extraction() {
    let service = service();
    let outcome = service
        .submit(&Caller::patient("patient-1"), rx_input(), vec![])
        .unwrap();

    assert_eq!(outcome.record.status().kind(), "pending_verification");
    assert!(outcome.record.extracted_text.is_empty());
    assert!(outcome.draft.is_none());
}

#[test]
fn test_ocr_failure_degrades_to_manual_review() {
    let service = service_with(Arc::new(FailingEngine), Arc::new(NullNotifier));
    let outcome = service
        .submit(&Caller::patient("patient-1"), rx_input(), vec![scan("a.jpg")])
        .unwrap();

    // Extraction failed but the record still reaches the queue.
    assert_eq!(outcome.record.status().kind(), "pending_verification");
    assert!(outcome.record.extracted_text.is_empty());
    assert_eq!(outcome.record.ocr_confidence, 0);
    assert!(outcome.draft.is_none());
}

#[test]
fn test_submit_rejects_invalid_upload() {
    let service = service();
    let mut bad = scan("notes.txt");
    bad.mime_type = "text/plain".into();

    let result = service.submit(&Caller::patient("patient-1"), rx_input(), vec![bad]);
    assert!(result.is_err());
}

#[test]
fn test_patient_cannot_read_others_record() {
    let service = service();
    let outcome = service
        .submit(&Caller::patient("patient-1"), rx_input(), vec![])
        .unwrap();

    assert!(service.get(&Caller::patient("patient-2"), &outcome.record.id).is_err());
    // Staff can.
    assert!(service
        .get(&Caller::pharmacist("pharm-1"), &outcome.record.id)
        .is_ok());
}

#[test]
fn test_queue_orders_by_priority_then_age() {
    let service = service();
    let patient = Caller::patient("patient-1");

    let mut low = rx_input();
    low.priority = Some(Priority::Low);
    let low = service.submit(&patient, low, vec![]).unwrap().record;

    let first_normal = service.submit(&patient, rx_input(), vec![]).unwrap().record;

    let mut urgent = rx_input();
    urgent.priority = Some(Priority::Urgent);
    let urgent = service.submit(&patient, urgent, vec![]).unwrap().record;

    let second_normal = service.submit(&patient, rx_input(), vec![]).unwrap().record;

    let queue = service.pending_queue(&Caller::pharmacist("pharm-1")).unwrap();
    let ids: Vec<_> = queue.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            urgent.id.as_str(),
            first_normal.id.as_str(),
            second_normal.id.as_str(),
            low.id.as_str()
        ]
    );
}

#[test]
fn test_queue_requires_staff() {
    let service = service();
    assert!(service.pending_queue(&Caller::patient("patient-1")).is_err());
}

#[test]
fn test_approve_then_double_approve_conflicts() {
    let service = service();
    let pharmacist = Caller::pharmacist("pharm-1");
    let record = service
        .submit(&Caller::patient("patient-1"), rx_input(), vec![])
        .unwrap()
        .record;

    let (approved, notify) = service
        .decide(
            &pharmacist,
            &record.id,
            Decision::Approve {
                notes: Some("legible, dosage plausible".into()),
            },
        )
        .unwrap();
    assert!(approved.status().is_verified());
    assert_eq!(notify, NotifyOutcome::Skipped);

    let err = service
        .decide(&pharmacist, &record.id, Decision::Approve { notes: None })
        .unwrap_err();
    assert!(err.to_string().contains("conflict"));
}

#[test]
fn test_reject_requires_reason() {
    let service = service();
    let record = service
        .submit(&Caller::patient("patient-1"), rx_input(), vec![])
        .unwrap()
        .record;

    let err = service
        .decide(
            &Caller::pharmacist("pharm-1"),
            &record.id,
            Decision::Reject { reason: "  ".into() },
        )
        .unwrap_err();
    assert!(err.to_string().contains("validation"));

    // Record untouched by the failed decision.
    let loaded = service.get(&Caller::pharmacist("pharm-1"), &record.id).unwrap();
    assert_eq!(loaded.status().kind(), "pending_verification");
}

#[test]
fn test_notification_failure_keeps_decision() {
    let service = service_with(
        Arc::new(MockEngine::with_fallback(SCAN_TEXT, 91)),
        Arc::new(FailingNotifier),
    );
    let record = service
        .submit(&Caller::patient("patient-1"), rx_input(), vec![])
        .unwrap()
        .record;

    let (decided, notify) = service
        .decide(
            &Caller::pharmacist("pharm-1"),
            &record.id,
            Decision::Approve { notes: None },
        )
        .unwrap();

    assert!(decided.status().is_verified());
    assert!(matches!(notify, NotifyOutcome::Failed { .. }));

    // And the verified status survived the failed notification.
    let loaded = service
        .get(&Caller::pharmacist("pharm-1"), &record.id)
        .unwrap();
    assert!(loaded.status().is_verified());
}

#[test]
fn test_update_blocked_after_verification() {
    let service = service();
    let patient = Caller::patient("patient-1");
    let record = service.submit(&patient, rx_input(), vec![]).unwrap().record;

    service
        .decide(
            &Caller::pharmacist("pharm-1"),
            &record.id,
            Decision::Approve { notes: None },
        )
        .unwrap();

    let update = rx_intake_core::UpdatePrescription {
        diagnosis: Some("revised".into()),
        ..Default::default()
    };
    let err = service.update(&patient, &record.id, update).unwrap_err();
    assert!(err.to_string().contains("conflict"));
}

#[test]
fn test_fulfilled_record_is_read_only() {
    let service = service();
    let patient = Caller::patient("patient-1");
    let pharmacist = Caller::pharmacist("pharm-1");
    let record = service.submit(&patient, rx_input(), vec![]).unwrap().record;

    service
        .decide(&pharmacist, &record.id, Decision::Approve { notes: None })
        .unwrap();
    service.mark_fulfilled(&pharmacist, &record.id).unwrap();

    // The approved medication list must survive any later patient edit.
    let update = rx_intake_core::UpdatePrescription {
        medications: Some(vec![Medication::new(
            "Oxycodone",
            "10mg",
            "Once daily",
            "1 day",
            99,
        )]),
        ..Default::default()
    };
    let err = service.update(&patient, &record.id, update).unwrap_err();
    assert!(err.to_string().contains("conflict"));

    // And the record itself cannot be removed, linked orders or not.
    let err = service.delete(&patient, &record.id).unwrap_err();
    assert!(err.to_string().contains("conflict"));

    let loaded = service.get(&patient, &record.id).unwrap();
    assert_eq!(loaded.status().kind(), "fulfilled");
    assert_eq!(loaded.medications[0].name, "Amoxicillin");
}

#[test]
fn test_rejected_record_not_editable() {
    let service = service();
    let patient = Caller::patient("patient-1");
    let record = service.submit(&patient, rx_input(), vec![]).unwrap().record;

    service
        .decide(
            &Caller::pharmacist("pharm-1"),
            &record.id,
            Decision::Reject {
                reason: "illegible".into(),
            },
        )
        .unwrap();

    let update = rx_intake_core::UpdatePrescription {
        diagnosis: Some("revised".into()),
        ..Default::default()
    };
    let err = service.update(&patient, &record.id, update).unwrap_err();
    assert!(err.to_string().contains("conflict"));
}

#[test]
fn test_delete_blocked_by_linked_order() {
    let service = service();
    let patient = Caller::patient("patient-1");
    let record = service.submit(&patient, rx_input(), vec![]).unwrap().record;

    service
        .link_order(&Caller::pharmacist("pharm-1"), &record.id, "order-77")
        .unwrap();

    let err = service.delete(&patient, &record.id).unwrap_err();
    assert!(err.to_string().contains("conflict"));
}

#[test]
fn test_delete_unlinked_record() {
    let service = service();
    let patient = Caller::patient("patient-1");
    let record = service.submit(&patient, rx_input(), vec![]).unwrap().record;

    service.delete(&patient, &record.id).unwrap();
    assert!(service.get(&patient, &record.id).is_err());
}

#[test]
fn test_reprocess_overwrites_extraction() {
    let service = service_with(Arc::new(FailingEngine), Arc::new(NullNotifier));
    let patient = Caller::patient("patient-1");
    let record = service
        .submit(&patient, rx_input(), vec![scan("a.jpg")])
        .unwrap()
        .record;
    assert!(record.extracted_text.is_empty());

    // Reprocess is a staff operation.
    assert!(service.reprocess(&patient, &record.id).is_err());

    // A failing engine surfaces the error here, unlike during submission.
    let err = service
        .reprocess(&Caller::pharmacist("pharm-1"), &record.id)
        .unwrap_err();
    assert!(err.to_string().contains("extraction"));
}

#[test]
fn test_reprocess_requires_images() {
    let service = service();
    let record = service
        .submit(&Caller::patient("patient-1"), rx_input(), vec![])
        .unwrap()
        .record;

    let err = service
        .reprocess(&Caller::pharmacist("pharm-1"), &record.id)
        .unwrap_err();
    assert!(err.to_string().contains("validation"));
}

#[test]
fn test_use_refill_until_exhausted() {
    let service = service();
    let pharmacist = Caller::pharmacist("pharm-1");

    let mut input = rx_input();
    input.medications =
        vec![Medication::new("Amoxicillin", "250mg", "Twice daily", "7 days", 14).with_refills(2)];
    let record = service
        .submit(&Caller::patient("patient-1"), input, vec![])
        .unwrap()
        .record;

    assert_eq!(record.remaining_refills(), 2);
    service.use_refill(&pharmacist, &record.id).unwrap();
    let after = service.use_refill(&pharmacist, &record.id).unwrap();
    assert_eq!(after.remaining_refills(), 0);

    let err = service.use_refill(&pharmacist, &record.id).unwrap_err();
    assert!(err.to_string().contains("conflict"));
}

#[test]
fn test_expire_overdue_sweep() {
    let service = service();
    let patient = Caller::patient("patient-1");

    let mut stale = rx_input();
    stale.prescription_date = chrono::Utc::now() - chrono::Duration::days(400);
    let stale = service.submit(&patient, stale, vec![]).unwrap().record;
    let fresh = service.submit(&patient, rx_input(), vec![]).unwrap().record;

    assert_eq!(service.expire_overdue().unwrap(), 1);

    let stale = service.get(&patient, &stale.id).unwrap();
    assert_eq!(stale.status().kind(), "expired");
    let fresh = service.get(&patient, &fresh.id).unwrap();
    assert_eq!(fresh.status().kind(), "pending_verification");
}

#[test]
fn test_order_gate_requires_verified_coverage() {
    let service = service();
    let patient = Caller::patient("patient-1");

    {
        let db = service_db(&service);
        let db = db.lock().unwrap();
        db.upsert_product(
            &Product::new("AMOX-250".into(), "Amoxicillin 250mg Capsules".into())
                .requiring_prescription(),
        )
        .unwrap();
        db.upsert_product(&Product::new("VITC-1".into(), "Vitamin C 500mg".into()))
            .unwrap();
    }

    let record = service.submit(&patient, rx_input(), vec![]).unwrap().record;
    let cart = vec!["AMOX-250".to_string(), "VITC-1".to_string()];

    // Pending prescription does not satisfy the gate.
    assert!(service.check_order(&patient, &cart).is_err());

    service
        .decide(
            &Caller::pharmacist("pharm-1"),
            &record.id,
            Decision::Approve { notes: None },
        )
        .unwrap();

    let report = service.check_order(&patient, &cart).unwrap();
    assert_eq!(report.coverage.len(), 1);
    assert_eq!(report.coverage[0].sku, "AMOX-250");
    assert_eq!(report.coverage[0].prescription_id, record.id);

    // Unknown SKU is a lookup failure, not a gate failure.
    assert!(service
        .check_order(&patient, &["NOPE-0".to_string()])
        .is_err());
}

#[test]
fn test_approval_links_catalog_products() {
    let service = service();
    {
        let db = service_db(&service);
        let db = db.lock().unwrap();
        db.upsert_product(
            &Product::new("AMOX-250".into(), "Amoxicillin 250mg Capsules".into())
                .requiring_prescription(),
        )
        .unwrap();
    }

    let record = service
        .submit(&Caller::patient("patient-1"), rx_input(), vec![])
        .unwrap()
        .record;
    let (approved, _) = service
        .decide(
            &Caller::pharmacist("pharm-1"),
            &record.id,
            Decision::Approve { notes: None },
        )
        .unwrap();

    assert_eq!(approved.medications[0].product_sku.as_deref(), Some("AMOX-250"));
}

#[test]
fn test_catalog_linking_uses_gate_threshold() {
    let service = service().with_gate_config(GateConfig {
        fuzzy_threshold: 0.99,
        ..GateConfig::default()
    });
    {
        let db = service_db(&service);
        let db = db.lock().unwrap();
        db.upsert_product(
            &Product::new("AMOX-FR".into(), "Amoxicilline 250".into()).requiring_prescription(),
        )
        .unwrap();
    }

    let record = service
        .submit(&Caller::patient("patient-1"), rx_input(), vec![])
        .unwrap()
        .record;
    let (approved, _) = service
        .decide(
            &Caller::pharmacist("pharm-1"),
            &record.id,
            Decision::Approve { notes: None },
        )
        .unwrap();

    // The brand spelling scores around 0.96, under the configured cutoff;
    // the default 0.85 would have linked it.
    assert!(approved.medications[0].product_sku.is_none());
}

fn service_db(service: &IntakeService) -> Arc<Mutex<Database>> {
    service.db_handle()
}
