//! Rx-Intake Core Library
//!
//! Prescription intake pipeline for an online pharmacy: image ingestion,
//! OCR extraction, heuristic parsing and the pharmacist verification
//! workflow, backed by SQLite.
//!
//! # Architecture
//!
//! ```text
//! Upload → Validation → Image Store → OCR → Heuristic Parser
//!                                                  │
//!                               [RECORD: pending_verification]
//!                                                  │
//!                                   Pharmacist Review Queue
//!                                    (urgent first, FIFO)
//!                                                  │
//!                                  Pharmacist approves/rejects
//!                                                  │
//!                              ┌───────────────────▼───────────────────┐
//!                              │        verified  /  rejected          │
//!                              │   (decision + reviewer + timestamp)   │
//!                              └───────────────────┬───────────────────┘
//!                                                  │
//!                                             Order Gate
//!                              (no Rx-required product ships uncovered)
//! ```
//!
//! # Core Principle
//!
//! **Every prescription requires pharmacist review.** No auto-approval
//! regardless of OCR confidence.
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer with FTS5 catalog search
//! - [`models`]: Domain types (PrescriptionRecord, Medication, Product, ...)
//! - [`parser`]: Heuristic field parser over raw OCR text
//! - [`intake`]: Ingestion and record lifecycle operations
//! - [`workflow`]: Pharmacist verification queue and decisions
//! - [`gate`]: Order-gate coverage check

pub mod auth;
pub mod db;
pub mod error;
pub mod gate;
pub mod intake;
pub mod models;
pub mod parser;
pub mod workflow;

pub use auth::{Caller, Role};
pub use db::Database;
pub use error::{CoreError, CoreResult};
pub use gate::{CartLine, GateConfig, GateReport, OrderGate};
pub use intake::{
    ImageStore, IngestLimits, IntakeService, MemoryStore, SubmitOutcome, UploadedFile,
};
pub use models::{
    DoctorInfo, Medication, NewPrescription, PrescriptionImage, PrescriptionRecord,
    PrescriptionStatus, Priority, Product, UpdatePrescription,
};
pub use parser::ParsedPrescription;
pub use workflow::{Decision, Notifier, NotifyOutcome, NullNotifier};
