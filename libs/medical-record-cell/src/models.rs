use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::FieldError;

/// A medical record row. The doctor reference is the ownership key: it is
/// set to the creating practitioner and never changed by updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct MedicalRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub visit_date: DateTime<Utc>,
    pub chief_complaint: String,
    pub diagnosis: String,
    #[serde(default)]
    pub symptoms: Vec<String>,
    pub vital_signs: Option<VitalSigns>,
    #[serde(default)]
    pub prescriptions: Vec<Prescription>,
    #[serde(default)]
    pub lab_tests: Vec<LabTest>,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Stored as jsonb; one casing both ways.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalSigns {
    pub blood_pressure: Option<String>,
    pub heart_rate: Option<i32>,
    pub temperature: Option<f32>,
    pub respiratory_rate: Option<i32>,
    pub oxygen_saturation: Option<i32>,
    pub weight: Option<f32>,
    pub height: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub medication: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: Option<String>,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabTest {
    pub test_name: Option<String>,
    pub result: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct PatientSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct DoctorSummary {
    pub id: Uuid,
    pub name: String,
    pub specialization: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
}

/// A record joined with its patient and doctor summaries. Replaces the
/// source system's ORM population with an explicitly composed view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecordView {
    pub id: Uuid,
    pub patient: Option<PatientSummary>,
    pub doctor: Option<DoctorSummary>,
    pub visit_date: DateTime<Utc>,
    pub chief_complaint: String,
    pub diagnosis: String,
    pub symptoms: Vec<String>,
    pub vital_signs: Option<VitalSigns>,
    pub prescriptions: Vec<Prescription>,
    pub lab_tests: Vec<LabTest>,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MedicalRecordView {
    pub fn compose(
        record: MedicalRecord,
        patient: Option<PatientSummary>,
        doctor: Option<DoctorSummary>,
    ) -> Self {
        Self {
            id: record.id,
            patient,
            doctor,
            visit_date: record.visit_date,
            chief_complaint: record.chief_complaint,
            diagnosis: record.diagnosis,
            symptoms: record.symptoms,
            vital_signs: record.vital_signs,
            prescriptions: record.prescriptions,
            lab_tests: record.lab_tests,
            notes: record.notes,
            follow_up_date: record.follow_up_date,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMedicalRecordRequest {
    pub patient: Option<String>,
    pub visit_date: Option<DateTime<Utc>>,
    pub chief_complaint: Option<String>,
    pub diagnosis: Option<String>,
    pub symptoms: Option<Vec<String>>,
    pub vital_signs: Option<VitalSigns>,
    pub prescriptions: Option<Vec<Prescription>>,
    pub lab_tests: Option<Vec<LabTest>>,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
}

/// Record input after the field validation pass.
#[derive(Debug, Clone)]
pub struct NewMedicalRecord {
    pub patient_id: Uuid,
    pub visit_date: Option<DateTime<Utc>>,
    pub chief_complaint: String,
    pub diagnosis: String,
    pub symptoms: Vec<String>,
    pub vital_signs: Option<VitalSigns>,
    pub prescriptions: Vec<Prescription>,
    pub lab_tests: Vec<LabTest>,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
}

impl CreateMedicalRecordRequest {
    pub fn validate(self) -> Result<NewMedicalRecord, Vec<FieldError>> {
        let mut errors = Vec::new();

        let patient_id = match self.patient.as_deref().map(|v| Uuid::parse_str(v.trim())) {
            Some(Ok(id)) => Some(id),
            Some(Err(_)) => {
                errors.push(FieldError::new("patient", "Invalid ID format"));
                None
            }
            None => {
                errors.push(FieldError::new("patient", "Patient ID is required"));
                None
            }
        };

        let chief_complaint = match self.chief_complaint.map(|v| v.trim().to_string()) {
            Some(v) if !v.is_empty() => Some(v),
            _ => {
                errors.push(FieldError::new("chiefComplaint", "Chief complaint is required"));
                None
            }
        };

        let diagnosis = match self.diagnosis.map(|v| v.trim().to_string()) {
            Some(v) if !v.is_empty() => Some(v),
            _ => {
                errors.push(FieldError::new("diagnosis", "Diagnosis is required"));
                None
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(NewMedicalRecord {
            patient_id: patient_id.unwrap(),
            visit_date: self.visit_date,
            chief_complaint: chief_complaint.unwrap(),
            diagnosis: diagnosis.unwrap(),
            symptoms: self.symptoms.unwrap_or_default(),
            vital_signs: self.vital_signs,
            prescriptions: self.prescriptions.unwrap_or_default(),
            lab_tests: self.lab_tests.unwrap_or_default(),
            notes: self.notes,
            follow_up_date: self.follow_up_date,
        })
    }
}

/// Partial update of the clinical fields. The patient and doctor
/// references are deliberately not patchable.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMedicalRecordRequest {
    pub visit_date: Option<DateTime<Utc>>,
    pub chief_complaint: Option<String>,
    pub diagnosis: Option<String>,
    pub symptoms: Option<Vec<String>>,
    pub vital_signs: Option<VitalSigns>,
    pub prescriptions: Option<Vec<Prescription>>,
    pub lab_tests: Option<Vec<LabTest>>,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
}

impl UpdateMedicalRecordRequest {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if let Some(value) = &self.chief_complaint {
            if value.trim().is_empty() {
                errors.push(FieldError::new("chiefComplaint", "Chief complaint is required"));
            }
        }
        if let Some(value) = &self.diagnosis {
            if value.trim().is_empty() {
                errors.push(FieldError::new("diagnosis", "Diagnosis is required"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordQueryParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub patient: Option<Uuid>,
    pub doctor: Option<Uuid>,
}

#[derive(Debug, thiserror::Error)]
pub enum MedicalRecordError {
    #[error("Medical record not found")]
    RecordNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Database error: {0}")]
    Database(String),
}
