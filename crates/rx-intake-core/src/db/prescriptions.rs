//! Prescription record database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{
    DoctorInfo, Medication, PrescriptionImage, PrescriptionRecord, PrescriptionStatus, Priority,
};

const SELECT_COLUMNS: &str = r#"
    id, rx_number, patient_id, doctor, medications, diagnosis,
    symptoms, allergies, instructions, images, extracted_text,
    ocr_confidence, status, prescription_date, expiry_date,
    refills_used, linked_orders, priority, created_at, updated_at
"#;

impl Database {
    /// Insert a new prescription record.
    pub fn insert_prescription(&self, record: &PrescriptionRecord) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO prescriptions (
                id, rx_number, patient_id, doctor, medications, diagnosis,
                symptoms, allergies, instructions, images, extracted_text,
                ocr_confidence, status, status_kind, prescription_date,
                expiry_date, refills_used, linked_orders, priority,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21
            )
            "#,
            params![
                record.id,
                record.rx_number,
                record.patient_id,
                serde_json::to_string(&record.doctor)?,
                serde_json::to_string(&record.medications)?,
                record.diagnosis,
                serde_json::to_string(&record.symptoms)?,
                serde_json::to_string(&record.allergies)?,
                record.instructions,
                serde_json::to_string(&record.images)?,
                record.extracted_text,
                record.ocr_confidence,
                serde_json::to_string(record.status())?,
                record.status().kind(),
                record.prescription_date.to_rfc3339(),
                record.expiry_date.to_rfc3339(),
                record.refills_used,
                serde_json::to_string(&record.linked_orders)?,
                record.priority.as_str(),
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Persist the current state of an existing record.
    pub fn update_prescription(&self, record: &PrescriptionRecord) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE prescriptions SET
                doctor = ?2,
                medications = ?3,
                diagnosis = ?4,
                symptoms = ?5,
                allergies = ?6,
                instructions = ?7,
                images = ?8,
                extracted_text = ?9,
                ocr_confidence = ?10,
                status = ?11,
                status_kind = ?12,
                prescription_date = ?13,
                expiry_date = ?14,
                refills_used = ?15,
                linked_orders = ?16,
                priority = ?17,
                updated_at = ?18
            WHERE id = ?1
            "#,
            params![
                record.id,
                serde_json::to_string(&record.doctor)?,
                serde_json::to_string(&record.medications)?,
                record.diagnosis,
                serde_json::to_string(&record.symptoms)?,
                serde_json::to_string(&record.allergies)?,
                record.instructions,
                serde_json::to_string(&record.images)?,
                record.extracted_text,
                record.ocr_confidence,
                serde_json::to_string(record.status())?,
                record.status().kind(),
                record.prescription_date.to_rfc3339(),
                record.expiry_date.to_rfc3339(),
                record.refills_used,
                serde_json::to_string(&record.linked_orders)?,
                record.priority.as_str(),
                record.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a record by ID.
    pub fn get_prescription(&self, id: &str) -> DbResult<Option<PrescriptionRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM prescriptions WHERE id = ?"),
                [id],
                map_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// All records owned by a patient, most recent first.
    pub fn list_prescriptions_for_patient(
        &self,
        patient_id: &str,
    ) -> DbResult<Vec<PrescriptionRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM prescriptions WHERE patient_id = ? ORDER BY created_at DESC"
        ))?;

        let rows = stmt.query_map([patient_id], map_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.try_into()?);
        }
        Ok(records)
    }

    /// All records in a given status, oldest first.
    pub fn list_prescriptions_by_status(&self, kind: &str) -> DbResult<Vec<PrescriptionRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM prescriptions WHERE status_kind = ? ORDER BY created_at ASC"
        ))?;

        let rows = stmt.query_map([kind], map_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.try_into()?);
        }
        Ok(records)
    }

    /// Delete a record. The service layer enforces ownership and the
    /// linked-order rule before calling this.
    pub fn delete_prescription(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM prescriptions WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct PrescriptionRow {
    id: String,
    rx_number: String,
    patient_id: String,
    doctor: String,
    medications: String,
    diagnosis: Option<String>,
    symptoms: String,
    allergies: String,
    instructions: Option<String>,
    images: String,
    extracted_text: String,
    ocr_confidence: u8,
    status: String,
    prescription_date: String,
    expiry_date: String,
    refills_used: u32,
    linked_orders: String,
    priority: String,
    created_at: String,
    updated_at: String,
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PrescriptionRow> {
    Ok(PrescriptionRow {
        id: row.get(0)?,
        rx_number: row.get(1)?,
        patient_id: row.get(2)?,
        doctor: row.get(3)?,
        medications: row.get(4)?,
        diagnosis: row.get(5)?,
        symptoms: row.get(6)?,
        allergies: row.get(7)?,
        instructions: row.get(8)?,
        images: row.get(9)?,
        extracted_text: row.get(10)?,
        ocr_confidence: row.get(11)?,
        status: row.get(12)?,
        prescription_date: row.get(13)?,
        expiry_date: row.get(14)?,
        refills_used: row.get(15)?,
        linked_orders: row.get(16)?,
        priority: row.get(17)?,
        created_at: row.get(18)?,
        updated_at: row.get(19)?,
    })
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::Constraint(format!("invalid timestamp {s}: {e}")))
}

impl TryFrom<PrescriptionRow> for PrescriptionRecord {
    type Error = DbError;

    fn try_from(row: PrescriptionRow) -> Result<Self, Self::Error> {
        let doctor: DoctorInfo = serde_json::from_str(&row.doctor)?;
        let medications: Vec<Medication> = serde_json::from_str(&row.medications)?;
        let symptoms: Vec<String> = serde_json::from_str(&row.symptoms)?;
        let allergies: Vec<String> = serde_json::from_str(&row.allergies)?;
        let images: Vec<PrescriptionImage> = serde_json::from_str(&row.images)?;
        let status: PrescriptionStatus = serde_json::from_str(&row.status)?;
        let linked_orders: Vec<String> = serde_json::from_str(&row.linked_orders)?;
        let priority = Priority::parse(&row.priority)
            .ok_or_else(|| DbError::Constraint(format!("unknown priority: {}", row.priority)))?;

        Ok(PrescriptionRecord {
            id: row.id,
            rx_number: row.rx_number,
            patient_id: row.patient_id,
            doctor,
            medications,
            diagnosis: row.diagnosis,
            symptoms,
            allergies,
            instructions: row.instructions,
            images,
            extracted_text: row.extracted_text,
            ocr_confidence: row.ocr_confidence,
            status,
            prescription_date: parse_ts(&row.prescription_date)?,
            expiry_date: parse_ts(&row.expiry_date)?,
            refills_used: row.refills_used,
            linked_orders,
            priority,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPrescription;
    use chrono::Utc;

    fn make_record(patient: &str, priority: Priority) -> PrescriptionRecord {
        let now = Utc::now();
        let mut record = PrescriptionRecord::create(
            patient.into(),
            NewPrescription {
                doctor: DoctorInfo::new("Dr. Jane Doe", "LIC-12345"),
                medications: vec![Medication::new(
                    "Amoxicillin",
                    "250mg",
                    "Twice daily",
                    "7 days",
                    14,
                )],
                diagnosis: Some("Bacterial infection".into()),
                symptoms: vec!["fever".into()],
                allergies: vec!["penicillin-adjacent".into()],
                instructions: None,
                prescription_date: now,
                expiry_date: None,
                priority: Some(priority),
            },
            now,
        )
        .unwrap();
        record.mark_uploaded().unwrap();
        record
    }

    #[test]
    fn test_insert_and_get_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let record = make_record("patient-1", Priority::Normal);
        db.insert_prescription(&record).unwrap();

        let retrieved = db.get_prescription(&record.id).unwrap().unwrap();
        assert_eq!(retrieved, record);
        assert_eq!(retrieved.status().kind(), "uploaded");
        assert_eq!(retrieved.medications[0].name, "Amoxicillin");
    }

    #[test]
    fn test_get_missing_returns_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_prescription("nope").unwrap().is_none());
    }

    #[test]
    fn test_update_persists_status_payload() {
        let db = Database::open_in_memory().unwrap();
        let mut record = make_record("patient-1", Priority::Normal);
        db.insert_prescription(&record).unwrap();

        record.queue_for_verification().unwrap();
        record
            .approve("pharm-1".into(), Some("ok".into()), Utc::now())
            .unwrap();
        record.touch();
        assert!(db.update_prescription(&record).unwrap());

        let retrieved = db.get_prescription(&record.id).unwrap().unwrap();
        match retrieved.status() {
            PrescriptionStatus::Verified { by, notes, .. } => {
                assert_eq!(by, "pharm-1");
                assert_eq!(notes.as_deref(), Some("ok"));
            }
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn test_list_for_patient() {
        let db = Database::open_in_memory().unwrap();
        db.insert_prescription(&make_record("patient-1", Priority::Normal))
            .unwrap();
        db.insert_prescription(&make_record("patient-1", Priority::High))
            .unwrap();
        db.insert_prescription(&make_record("patient-2", Priority::Normal))
            .unwrap();

        let records = db.list_prescriptions_for_patient("patient-1").unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.patient_id == "patient-1"));
    }

    #[test]
    fn test_list_by_status() {
        let db = Database::open_in_memory().unwrap();
        let mut pending = make_record("patient-1", Priority::Normal);
        pending.queue_for_verification().unwrap();
        db.insert_prescription(&pending).unwrap();
        db.insert_prescription(&make_record("patient-1", Priority::Normal))
            .unwrap();

        let records = db
            .list_prescriptions_by_status("pending_verification")
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, pending.id);
    }

    #[test]
    fn test_delete() {
        let db = Database::open_in_memory().unwrap();
        let record = make_record("patient-1", Priority::Normal);
        db.insert_prescription(&record).unwrap();

        assert!(db.delete_prescription(&record.id).unwrap());
        assert!(db.get_prescription(&record.id).unwrap().is_none());
        assert!(!db.delete_prescription(&record.id).unwrap());
    }
}
