use std::collections::HashMap;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{
    DoctorSummary, MedicalRecord, MedicalRecordError, MedicalRecordView, NewMedicalRecord,
    PatientSummary, RecordQueryParams, UpdateMedicalRecordRequest,
};

const PATIENT_SUMMARY_COLUMNS: &str = "id,first_name,last_name,date_of_birth,gender,phone";
const DOCTOR_SUMMARY_COLUMNS: &str = "id,name,specialization,license_number";

pub struct MedicalRecordService {
    postgrest: PostgrestClient,
}

impl MedicalRecordService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            postgrest: PostgrestClient::new(config),
        }
    }

    pub async fn create_record(
        &self,
        new: NewMedicalRecord,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<MedicalRecordView, MedicalRecordError> {
        debug!(
            "Creating medical record for patient {} by doctor {}",
            new.patient_id, doctor_id
        );

        let patient = self
            .fetch_patient_summary(new.patient_id, auth_token)
            .await?
            .ok_or(MedicalRecordError::PatientNotFound)?;

        let body = json!({
            "patient_id": new.patient_id,
            "doctor_id": doctor_id,
            "visit_date": new.visit_date.unwrap_or_else(Utc::now).to_rfc3339(),
            "chief_complaint": new.chief_complaint,
            "diagnosis": new.diagnosis,
            "symptoms": new.symptoms,
            "vital_signs": new.vital_signs,
            "prescriptions": new.prescriptions,
            "lab_tests": new.lab_tests,
            "notes": new.notes,
            "follow_up_date": new.follow_up_date,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<MedicalRecord> = self
            .postgrest
            .request_with_headers(
                Method::POST,
                "/rest/v1/medical_records",
                Some(auth_token),
                Some(body),
                Some(headers),
            )
            .await
            .map_err(|e| MedicalRecordError::Database(e.to_string()))?;

        let record = result
            .into_iter()
            .next()
            .ok_or_else(|| MedicalRecordError::Database("Insert returned no row".to_string()))?;

        let doctor = self.fetch_doctor_summary(doctor_id, auth_token).await?;
        Ok(MedicalRecordView::compose(record, Some(patient), doctor))
    }

    pub async fn list_records(
        &self,
        params: &RecordQueryParams,
        auth_token: &str,
    ) -> Result<(Vec<MedicalRecordView>, i64), MedicalRecordError> {
        let page = params.page.unwrap_or(1).max(1);
        let limit = params.limit.unwrap_or(10).max(1);
        let offset = (page - 1) * limit;

        let mut query_parts = Vec::new();
        if let Some(patient) = params.patient {
            query_parts.push(format!("patient_id=eq.{}", patient));
        }
        if let Some(doctor) = params.doctor {
            query_parts.push(format!("doctor_id=eq.{}", doctor));
        }
        query_parts.push("order=visit_date.desc".to_string());
        query_parts.push(format!("limit={}", limit));
        query_parts.push(format!("offset={}", offset));

        let path = format!("/rest/v1/medical_records?{}", query_parts.join("&"));

        let (records, total): (Vec<MedicalRecord>, i64) = self
            .postgrest
            .select_with_count(&path, Some(auth_token))
            .await
            .map_err(|e| MedicalRecordError::Database(e.to_string()))?;

        let views = self.compose_views(records, auth_token).await?;
        Ok((views, total))
    }

    /// Raw row lookup, used both for the detail endpoint and for the
    /// ownership check before updates.
    pub async fn get_record_row(
        &self,
        record_id: Uuid,
        auth_token: &str,
    ) -> Result<MedicalRecord, MedicalRecordError> {
        let path = format!("/rest/v1/medical_records?id=eq.{}", record_id);
        let result: Vec<MedicalRecord> = self
            .postgrest
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| MedicalRecordError::Database(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or(MedicalRecordError::RecordNotFound)
    }

    pub async fn get_record(
        &self,
        record_id: Uuid,
        auth_token: &str,
    ) -> Result<MedicalRecordView, MedicalRecordError> {
        let record = self.get_record_row(record_id, auth_token).await?;
        let patient = self
            .fetch_patient_summary(record.patient_id, auth_token)
            .await?;
        let doctor = self
            .fetch_doctor_summary(record.doctor_id, auth_token)
            .await?;
        Ok(MedicalRecordView::compose(record, patient, doctor))
    }

    pub async fn update_record(
        &self,
        record_id: Uuid,
        request: UpdateMedicalRecordRequest,
        auth_token: &str,
    ) -> Result<MedicalRecordView, MedicalRecordError> {
        let mut update_data = serde_json::Map::new();

        if let Some(visit_date) = request.visit_date {
            update_data.insert("visit_date".to_string(), json!(visit_date.to_rfc3339()));
        }
        if let Some(chief_complaint) = request.chief_complaint {
            update_data.insert("chief_complaint".to_string(), json!(chief_complaint));
        }
        if let Some(diagnosis) = request.diagnosis {
            update_data.insert("diagnosis".to_string(), json!(diagnosis));
        }
        if let Some(symptoms) = request.symptoms {
            update_data.insert("symptoms".to_string(), json!(symptoms));
        }
        if let Some(vital_signs) = request.vital_signs {
            update_data.insert("vital_signs".to_string(), json!(vital_signs));
        }
        if let Some(prescriptions) = request.prescriptions {
            update_data.insert("prescriptions".to_string(), json!(prescriptions));
        }
        if let Some(lab_tests) = request.lab_tests {
            update_data.insert("lab_tests".to_string(), json!(lab_tests));
        }
        if let Some(notes) = request.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }
        if let Some(follow_up_date) = request.follow_up_date {
            update_data.insert("follow_up_date".to_string(), json!(follow_up_date));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/medical_records?id=eq.{}", record_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<MedicalRecord> = self
            .postgrest
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(headers),
            )
            .await
            .map_err(|e| MedicalRecordError::Database(e.to_string()))?;

        let record = result
            .into_iter()
            .next()
            .ok_or(MedicalRecordError::RecordNotFound)?;

        let patient = self
            .fetch_patient_summary(record.patient_id, auth_token)
            .await?;
        let doctor = self
            .fetch_doctor_summary(record.doctor_id, auth_token)
            .await?;
        Ok(MedicalRecordView::compose(record, patient, doctor))
    }

    pub async fn delete_record(
        &self,
        record_id: Uuid,
        auth_token: &str,
    ) -> Result<(), MedicalRecordError> {
        self.get_record_row(record_id, auth_token).await?;

        let path = format!("/rest/v1/medical_records?id=eq.{}", record_id);
        self.postgrest
            .request_no_content(Method::DELETE, &path, Some(auth_token), None)
            .await
            .map_err(|e| MedicalRecordError::Database(e.to_string()))
    }

    /// Full visit history for one patient, newest visits first, with the
    /// patient header returned alongside the records.
    pub async fn patient_history(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<(Value, Vec<MedicalRecordView>), MedicalRecordError> {
        let path = format!(
            "/rest/v1/patients?id=eq.{}&select=id,first_name,last_name,date_of_birth,gender,blood_group,allergies,chronic_conditions",
            patient_id
        );
        let patients: Vec<Value> = self
            .postgrest
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| MedicalRecordError::Database(e.to_string()))?;
        let patient = patients
            .into_iter()
            .next()
            .ok_or(MedicalRecordError::PatientNotFound)?;

        let path = format!(
            "/rest/v1/medical_records?patient_id=eq.{}&order=visit_date.desc",
            patient_id
        );
        let records: Vec<MedicalRecord> = self
            .postgrest
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| MedicalRecordError::Database(e.to_string()))?;

        let views = self.compose_views(records, auth_token).await?;

        let name = format!(
            "{} {}",
            patient["first_name"].as_str().unwrap_or_default(),
            patient["last_name"].as_str().unwrap_or_default()
        );
        let header = json!({
            "id": patient["id"],
            "name": name,
            "dateOfBirth": patient["date_of_birth"],
            "gender": patient["gender"],
            "bloodGroup": patient["blood_group"],
            "allergies": patient["allergies"],
            "chronicConditions": patient["chronic_conditions"],
        });

        Ok((header, views))
    }

    async fn fetch_patient_summary(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<PatientSummary>, MedicalRecordError> {
        let path = format!(
            "/rest/v1/patients?id=eq.{}&select={}",
            patient_id, PATIENT_SUMMARY_COLUMNS
        );
        let result: Vec<PatientSummary> = self
            .postgrest
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| MedicalRecordError::Database(e.to_string()))?;
        Ok(result.into_iter().next())
    }

    async fn fetch_doctor_summary(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<DoctorSummary>, MedicalRecordError> {
        let path = format!(
            "/rest/v1/doctors?id=eq.{}&select={}",
            doctor_id, DOCTOR_SUMMARY_COLUMNS
        );
        let result: Vec<DoctorSummary> = self
            .postgrest
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| MedicalRecordError::Database(e.to_string()))?;
        Ok(result.into_iter().next())
    }

    /// Batch fetch of referenced patients and doctors, then join in memory.
    async fn compose_views(
        &self,
        records: Vec<MedicalRecord>,
        auth_token: &str,
    ) -> Result<Vec<MedicalRecordView>, MedicalRecordError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut patient_ids: Vec<Uuid> = records.iter().map(|r| r.patient_id).collect();
        patient_ids.sort_unstable();
        patient_ids.dedup();

        let mut doctor_ids: Vec<Uuid> = records.iter().map(|r| r.doctor_id).collect();
        doctor_ids.sort_unstable();
        doctor_ids.dedup();

        let patients = self.fetch_patient_summaries(&patient_ids, auth_token).await?;
        let doctors = self.fetch_doctor_summaries(&doctor_ids, auth_token).await?;

        Ok(records
            .into_iter()
            .map(|record| {
                let patient = patients.get(&record.patient_id).cloned();
                let doctor = doctors.get(&record.doctor_id).cloned();
                MedicalRecordView::compose(record, patient, doctor)
            })
            .collect())
    }

    async fn fetch_patient_summaries(
        &self,
        ids: &[Uuid],
        auth_token: &str,
    ) -> Result<HashMap<Uuid, PatientSummary>, MedicalRecordError> {
        let id_list = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let path = format!(
            "/rest/v1/patients?id=in.({})&select={}",
            id_list, PATIENT_SUMMARY_COLUMNS
        );
        let result: Vec<PatientSummary> = self
            .postgrest
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| MedicalRecordError::Database(e.to_string()))?;
        Ok(result.into_iter().map(|p| (p.id, p)).collect())
    }

    async fn fetch_doctor_summaries(
        &self,
        ids: &[Uuid],
        auth_token: &str,
    ) -> Result<HashMap<Uuid, DoctorSummary>, MedicalRecordError> {
        let id_list = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let path = format!(
            "/rest/v1/doctors?id=in.({})&select={}",
            id_list, DOCTOR_SUMMARY_COLUMNS
        );
        let result: Vec<DoctorSummary> = self
            .postgrest
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| MedicalRecordError::Database(e.to_string()))?;
        Ok(result.into_iter().map(|d| (d.id, d)).collect())
    }
}
