use std::collections::HashMap;

use chrono::{Duration, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::{PostgrestClient, PostgrestError};

use crate::models::{
    Appointment, AppointmentError, AppointmentPatch, AppointmentQueryParams, AppointmentView,
    CreatorSummary, DoctorSummary, NewAppointment, PatientSummary,
};
use crate::services::conflict::ConflictService;

const PATIENT_SUMMARY_COLUMNS: &str = "id,first_name,last_name,phone,email";
const DOCTOR_SUMMARY_COLUMNS: &str = "id,name,specialization";

pub struct SchedulingService {
    postgrest: PostgrestClient,
    conflicts: ConflictService,
}

impl SchedulingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            postgrest: PostgrestClient::new(config),
            conflicts: ConflictService::new(config),
        }
    }

    /// Books a slot. Existence of the patient and doctor is checked before
    /// the conflict probe so a dangling reference reports as 404 rather
    /// than a misleading conflict.
    pub async fn create_appointment(
        &self,
        new: NewAppointment,
        created_by: Uuid,
        auth_token: &str,
    ) -> Result<AppointmentView, AppointmentError> {
        debug!(
            "Booking doctor {} on {} at {}",
            new.doctor_id, new.appointment_date, new.appointment_time
        );

        let patient = self
            .fetch_patient_summary(new.patient_id, auth_token)
            .await?
            .ok_or(AppointmentError::PatientNotFound)?;
        let doctor = self
            .fetch_doctor_summary(new.doctor_id, auth_token)
            .await?
            .ok_or(AppointmentError::DoctorNotFound)?;

        if self
            .conflicts
            .has_conflict(
                new.doctor_id,
                new.appointment_date,
                &new.appointment_time,
                None,
                auth_token,
            )
            .await?
        {
            return Err(AppointmentError::SlotTaken);
        }

        let body = json!({
            "patient_id": new.patient_id,
            "doctor_id": new.doctor_id,
            "appointment_date": new.appointment_date.format("%Y-%m-%d").to_string(),
            "appointment_time": new.appointment_time,
            "duration": new.duration,
            "reason": new.reason,
            "status": "scheduled",
            "notes": new.notes,
            "created_by": created_by,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Appointment> = self
            .postgrest
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(body),
                Some(headers),
            )
            .await
            .map_err(map_storage_error)?;

        let appointment = result
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::Database("Insert returned no row".to_string()))?;

        let created_by = self.fetch_creator_summary(created_by, auth_token).await?;
        Ok(AppointmentView::compose(
            appointment,
            Some(patient),
            Some(doctor),
            created_by,
        ))
    }

    pub async fn list_appointments(
        &self,
        params: &AppointmentQueryParams,
        auth_token: &str,
    ) -> Result<(Vec<AppointmentView>, i64), AppointmentError> {
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
        if let Some(status) = params.status.as_deref().filter(|s| !s.is_empty()) {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(date) = params.date {
            // Half-open day range keeps the filter correct for date-typed
            // and timestamp-typed columns alike.
            let next = date + Duration::days(1);
            query_parts.push(format!("appointment_date=gte.{}", date.format("%Y-%m-%d")));
            query_parts.push(format!("appointment_date=lt.{}", next.format("%Y-%m-%d")));
        }
        query_parts.push("order=appointment_date.asc,appointment_time.asc".to_string());
        query_parts.push(format!("limit={}", limit));
        query_parts.push(format!("offset={}", offset));

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));

        let (appointments, total): (Vec<Appointment>, i64) = self
            .postgrest
            .select_with_count(&path, Some(auth_token))
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        let views = self.compose_views(appointments, auth_token).await?;
        Ok((views, total))
    }

    pub async fn get_appointment_row(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Appointment> = self
            .postgrest
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        result.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<AppointmentView, AppointmentError> {
        let appointment = self.get_appointment_row(appointment_id, auth_token).await?;
        self.compose_view(appointment, auth_token).await
    }

    /// Applies a partial update. When any of the doctor, date, or time
    /// change, the effective slot after the patch is re-checked against
    /// every other active appointment.
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        patch: AppointmentPatch,
        auth_token: &str,
    ) -> Result<AppointmentView, AppointmentError> {
        let existing = self.get_appointment_row(appointment_id, auth_token).await?;

        if let Some(doctor_id) = patch.doctor_id {
            self.fetch_doctor_summary(doctor_id, auth_token)
                .await?
                .ok_or(AppointmentError::DoctorNotFound)?;
        }

        let reschedules = patch.doctor_id.is_some()
            || patch.appointment_date.is_some()
            || patch.appointment_time.is_some();
        let reactivates = patch
            .status
            .map(|s| s.holds_slot() && !existing.status.holds_slot())
            .unwrap_or(false);

        if reschedules || reactivates {
            let doctor_id = patch.doctor_id.unwrap_or(existing.doctor_id);
            let date = patch.appointment_date.unwrap_or(existing.appointment_date);
            let time = patch
                .appointment_time
                .as_deref()
                .unwrap_or(&existing.appointment_time);

            if self
                .conflicts
                .has_conflict(doctor_id, date, time, Some(appointment_id), auth_token)
                .await?
            {
                return Err(AppointmentError::SlotTaken);
            }
        }

        let mut update_data = serde_json::Map::new();
        if let Some(doctor_id) = patch.doctor_id {
            update_data.insert("doctor_id".to_string(), json!(doctor_id));
        }
        if let Some(date) = patch.appointment_date {
            update_data.insert(
                "appointment_date".to_string(),
                json!(date.format("%Y-%m-%d").to_string()),
            );
        }
        if let Some(time) = patch.appointment_time {
            update_data.insert("appointment_time".to_string(), json!(time));
        }
        if let Some(duration) = patch.duration {
            update_data.insert("duration".to_string(), json!(duration));
        }
        if let Some(reason) = patch.reason {
            update_data.insert("reason".to_string(), json!(reason));
        }
        if let Some(status) = patch.status {
            update_data.insert("status".to_string(), json!(status.as_str()));
        }
        if let Some(notes) = patch.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Appointment> = self
            .postgrest
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(headers),
            )
            .await
            .map_err(map_storage_error)?;

        let appointment = result.into_iter().next().ok_or(AppointmentError::NotFound)?;
        self.compose_view(appointment, auth_token).await
    }

    pub async fn delete_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        self.get_appointment_row(appointment_id, auth_token).await?;

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        self.postgrest
            .request_no_content(Method::DELETE, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))
    }

    async fn compose_view(
        &self,
        appointment: Appointment,
        auth_token: &str,
    ) -> Result<AppointmentView, AppointmentError> {
        let patient = self
            .fetch_patient_summary(appointment.patient_id, auth_token)
            .await?;
        let doctor = self
            .fetch_doctor_summary(appointment.doctor_id, auth_token)
            .await?;
        let created_by = self
            .fetch_creator_summary(appointment.created_by, auth_token)
            .await?;
        Ok(AppointmentView::compose(
            appointment,
            patient,
            doctor,
            created_by,
        ))
    }

    pub(crate) async fn compose_views(
        &self,
        appointments: Vec<Appointment>,
        auth_token: &str,
    ) -> Result<Vec<AppointmentView>, AppointmentError> {
        if appointments.is_empty() {
            return Ok(Vec::new());
        }

        let mut patient_ids: Vec<Uuid> = appointments.iter().map(|a| a.patient_id).collect();
        patient_ids.sort_unstable();
        patient_ids.dedup();

        let mut doctor_ids: Vec<Uuid> = appointments
            .iter()
            .flat_map(|a| [a.doctor_id, a.created_by])
            .collect();
        doctor_ids.sort_unstable();
        doctor_ids.dedup();

        let id_list = patient_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let path = format!(
            "/rest/v1/patients?id=in.({})&select={}",
            id_list, PATIENT_SUMMARY_COLUMNS
        );
        let patients: Vec<PatientSummary> = self
            .postgrest
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;
        let patients: HashMap<Uuid, PatientSummary> =
            patients.into_iter().map(|p| (p.id, p)).collect();

        let id_list = doctor_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let path = format!(
            "/rest/v1/doctors?id=in.({})&select={}",
            id_list, DOCTOR_SUMMARY_COLUMNS
        );
        let doctors: Vec<DoctorSummary> = self
            .postgrest
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;
        let doctors: HashMap<Uuid, DoctorSummary> =
            doctors.into_iter().map(|d| (d.id, d)).collect();

        Ok(appointments
            .into_iter()
            .map(|appointment| {
                let patient = patients.get(&appointment.patient_id).cloned();
                let doctor = doctors.get(&appointment.doctor_id).cloned();
                let created_by = doctors.get(&appointment.created_by).map(|d| CreatorSummary {
                    id: d.id,
                    name: d.name.clone(),
                });
                AppointmentView::compose(appointment, patient, doctor, created_by)
            })
            .collect())
    }

    async fn fetch_patient_summary(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<PatientSummary>, AppointmentError> {
        let path = format!(
            "/rest/v1/patients?id=eq.{}&select={}",
            patient_id, PATIENT_SUMMARY_COLUMNS
        );
        let result: Vec<PatientSummary> = self
            .postgrest
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;
        Ok(result.into_iter().next())
    }

    pub(crate) async fn fetch_doctor_summary(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<DoctorSummary>, AppointmentError> {
        let path = format!(
            "/rest/v1/doctors?id=eq.{}&select={}",
            doctor_id, DOCTOR_SUMMARY_COLUMNS
        );
        let result: Vec<DoctorSummary> = self
            .postgrest
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;
        Ok(result.into_iter().next())
    }

    async fn fetch_creator_summary(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<CreatorSummary>, AppointmentError> {
        let path = format!("/rest/v1/doctors?id=eq.{}&select=id,name", doctor_id);
        let result: Vec<CreatorSummary> = self
            .postgrest
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;
        Ok(result.into_iter().next())
    }
}

/// A 409 from storage means the partial unique index rejected a double
/// booking that slipped past the advisory check.
fn map_storage_error(e: PostgrestError) -> AppointmentError {
    match e {
        PostgrestError::Conflict(_) => AppointmentError::SlotTaken,
        other => AppointmentError::Database(other.to_string()),
    }
}
