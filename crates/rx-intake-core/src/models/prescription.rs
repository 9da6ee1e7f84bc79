//! Prescription record and its nested models.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::PrescriptionStatus;
use crate::error::{CoreError, CoreResult};

/// A stored prescription image. Immutable once attached to a record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionImage {
    /// Durable URL from the external storage collaborator.
    pub url: String,
    pub original_filename: String,
    pub byte_size: u64,
    pub mime_type: String,
}

/// Prescribing doctor info.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DoctorInfo {
    pub name: String,
    pub license_number: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub clinic: Option<String>,
}

impl DoctorInfo {
    pub fn new(name: &str, license_number: &str) -> Self {
        Self {
            name: name.to_string(),
            license_number: license_number.to_string(),
            phone: None,
            email: None,
            clinic: None,
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::Validation("doctor name is required".into()));
        }
        if self.license_number.trim().is_empty() {
            return Err(CoreError::Validation(
                "doctor license number is required".into(),
            ));
        }
        Ok(())
    }
}

/// A confirmed medication line on a prescription.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub name: String,
    /// e.g. "500mg"
    pub dosage: String,
    /// e.g. "Twice daily"
    pub frequency: String,
    /// e.g. "7 days"
    pub duration: String,
    #[serde(default)]
    pub instructions: Option<String>,
    pub quantity: u32,
    #[serde(default)]
    pub refills: u32,
    /// Optional link into the product catalog.
    #[serde(default)]
    pub product_sku: Option<String>,
}

impl Medication {
    pub fn new(name: &str, dosage: &str, frequency: &str, duration: &str, quantity: u32) -> Self {
        Self {
            name: name.to_string(),
            dosage: dosage.to_string(),
            frequency: frequency.to_string(),
            duration: duration.to_string(),
            instructions: None,
            quantity,
            refills: 0,
            product_sku: None,
        }
    }

    pub fn with_refills(mut self, refills: u32) -> Self {
        self.refills = refills;
        self
    }

    /// Invariant check: text fields non-empty, quantity at least one.
    pub fn validate(&self) -> CoreResult<()> {
        for (field, value) in [
            ("name", &self.name),
            ("dosage", &self.dosage),
            ("frequency", &self.frequency),
            ("duration", &self.duration),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::Validation(format!(
                    "medication {field} must not be empty"
                )));
            }
        }
        if self.quantity < 1 {
            return Err(CoreError::Validation(
                "medication quantity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Review-queue priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    /// Queue ordering weight, higher is served first.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Low => 0,
            Priority::Normal => 1,
            Priority::High => 2,
            Priority::Urgent => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "normal" => Some(Priority::Normal),
            "high" => Some(Priority::High),
            "urgent" => Some(Priority::Urgent),
            _ => None,
        }
    }
}

/// Input for creating a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPrescription {
    pub doctor: DoctorInfo,
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    pub prescription_date: DateTime<Utc>,
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

/// Partial update applied by the owning patient.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePrescription {
    #[serde(default)]
    pub doctor: Option<DoctorInfo>,
    #[serde(default)]
    pub medications: Option<Vec<Medication>>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub symptoms: Option<Vec<String>>,
    #[serde(default)]
    pub allergies: Option<Vec<String>>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
}

/// A prescription record with its verification lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionRecord {
    pub id: String,
    /// Human-readable prescription number, generated when absent.
    pub rx_number: String,
    /// Owning patient.
    pub patient_id: String,
    pub doctor: DoctorInfo,
    /// Ordered, confirmed medication list (at least one entry).
    pub medications: Vec<Medication>,
    pub diagnosis: Option<String>,
    pub symptoms: Vec<String>,
    pub allergies: Vec<String>,
    pub instructions: Option<String>,
    pub images: Vec<PrescriptionImage>,
    /// Raw OCR text of the first image; empty when extraction failed or
    /// the record was entered manually.
    pub extracted_text: String,
    /// OCR confidence 0-100.
    pub ocr_confidence: u8,
    /// Only the transition methods in `models::status` mutate this.
    pub(crate) status: PrescriptionStatus,
    pub prescription_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub refills_used: u32,
    pub linked_orders: Vec<String>,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PrescriptionRecord {
    /// Validate input and build a record in `pending_upload`.
    pub fn create(patient_id: String, input: NewPrescription, now: DateTime<Utc>) -> CoreResult<Self> {
        input.doctor.validate()?;
        if input.medications.is_empty() {
            return Err(CoreError::Validation(
                "at least one medication is required".into(),
            ));
        }
        for med in &input.medications {
            med.validate()?;
        }
        if input.prescription_date > now {
            return Err(CoreError::Validation(
                "prescription date must not be in the future".into(),
            ));
        }

        let expiry_date = match input.expiry_date {
            Some(expiry) => expiry,
            // One calendar year, not 365 days: stable across leap years.
            None => input
                .prescription_date
                .checked_add_months(Months::new(12))
                .ok_or_else(|| {
                    CoreError::Validation("prescription date out of range".into())
                })?,
        };
        if expiry_date < input.prescription_date {
            return Err(CoreError::Validation(
                "expiry date must not precede prescription date".into(),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            rx_number: Self::generate_rx_number(now),
            patient_id,
            doctor: input.doctor,
            medications: input.medications,
            diagnosis: input.diagnosis,
            symptoms: input.symptoms,
            allergies: input.allergies,
            instructions: input.instructions,
            images: Vec::new(),
            extracted_text: String::new(),
            ocr_confidence: 0,
            status: PrescriptionStatus::PendingUpload,
            prescription_date: input.prescription_date,
            expiry_date,
            refills_used: 0,
            linked_orders: Vec::new(),
            priority: input.priority.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        })
    }

    /// e.g. "RX-20260831-4F21A0"
    pub fn generate_rx_number(now: DateTime<Utc>) -> String {
        let token = Uuid::new_v4().simple().to_string();
        format!(
            "RX-{}-{}",
            now.format("%Y%m%d"),
            token[..6].to_uppercase()
        )
    }

    pub fn status(&self) -> &PrescriptionStatus {
        &self.status
    }

    pub(crate) fn set_status(&mut self, status: PrescriptionStatus) {
        self.status = status;
    }

    /// Refills still available. Never negative regardless of
    /// `refills_used` growth.
    pub fn remaining_refills(&self) -> u32 {
        let total: u32 = self.medications.iter().map(|m| m.refills).sum();
        total.saturating_sub(self.refills_used)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date < now
    }

    /// Apply a patient edit. Caller enforces ownership and editability.
    pub fn apply_update(&mut self, update: UpdatePrescription) -> CoreResult<()> {
        if let Some(doctor) = update.doctor {
            doctor.validate()?;
            self.doctor = doctor;
        }
        if let Some(medications) = update.medications {
            if medications.is_empty() {
                return Err(CoreError::Validation(
                    "at least one medication is required".into(),
                ));
            }
            for med in &medications {
                med.validate()?;
            }
            self.medications = medications;
        }
        if let Some(expiry) = update.expiry_date {
            if expiry < self.prescription_date {
                return Err(CoreError::Validation(
                    "expiry date must not precede prescription date".into(),
                ));
            }
            self.expiry_date = expiry;
        }
        if update.diagnosis.is_some() {
            self.diagnosis = update.diagnosis;
        }
        if let Some(symptoms) = update.symptoms {
            self.symptoms = symptoms;
        }
        if let Some(allergies) = update.allergies {
            self.allergies = allergies;
        }
        if update.instructions.is_some() {
            self.instructions = update.instructions;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        Ok(())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
