use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::FieldError;

/// Appointment lifecycle states. Only `scheduled` and `confirmed` hold a
/// slot; the terminal states release it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    #[serde(rename = "no-show")]
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no-show",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(AppointmentStatus::Scheduled),
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            "no-show" => Some(AppointmentStatus::NoShow),
            _ => None,
        }
    }

    /// True for states that occupy the doctor's slot.
    pub fn holds_slot(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Scheduled | AppointmentStatus::Confirmed
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    /// Canonical "HH:MM". Conflict detection compares this token exactly.
    pub appointment_time: String,
    pub duration: i32,
    pub reason: String,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct PatientSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct DoctorSummary {
    pub id: Uuid,
    pub name: String,
    pub specialization: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct CreatorSummary {
    pub id: Uuid,
    pub name: String,
}

/// An appointment joined with its referenced parties.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentView {
    pub id: Uuid,
    pub patient: Option<PatientSummary>,
    pub doctor: Option<DoctorSummary>,
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    pub duration: i32,
    pub reason: String,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_by: Option<CreatorSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppointmentView {
    pub fn compose(
        appointment: Appointment,
        patient: Option<PatientSummary>,
        doctor: Option<DoctorSummary>,
        created_by: Option<CreatorSummary>,
    ) -> Self {
        Self {
            id: appointment.id,
            patient,
            doctor,
            appointment_date: appointment.appointment_date,
            appointment_time: appointment.appointment_time,
            duration: appointment.duration,
            reason: appointment.reason,
            status: appointment.status,
            notes: appointment.notes,
            created_by,
            created_at: appointment.created_at,
            updated_at: appointment.updated_at,
        }
    }
}

/// Parses and canonicalizes a clock time to "HH:MM". Accepts "9:00" and
/// "09:00" alike so the stored token is always comparable by equality.
pub fn canonicalize_time(value: &str) -> Option<String> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .ok()
        .map(|t| t.format("%H:%M").to_string())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub patient: Option<String>,
    pub doctor: Option<String>,
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
    pub duration: Option<i32>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    pub duration: i32,
    pub reason: String,
    pub notes: Option<String>,
}

impl CreateAppointmentRequest {
    pub fn validate(self) -> Result<NewAppointment, Vec<FieldError>> {
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

        let doctor_id = match self.doctor.as_deref().map(|v| Uuid::parse_str(v.trim())) {
            Some(Ok(id)) => Some(id),
            Some(Err(_)) => {
                errors.push(FieldError::new("doctor", "Invalid ID format"));
                None
            }
            None => {
                errors.push(FieldError::new("doctor", "Doctor ID is required"));
                None
            }
        };

        let appointment_date = match self
            .appointment_date
            .as_deref()
            .map(|v| NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d"))
        {
            Some(Ok(date)) => Some(date),
            _ => {
                errors.push(FieldError::new(
                    "appointmentDate",
                    "Valid appointment date is required",
                ));
                None
            }
        };

        let appointment_time = match self.appointment_time.as_deref().map(canonicalize_time) {
            Some(Some(time)) => Some(time),
            Some(None) => {
                errors.push(FieldError::new(
                    "appointmentTime",
                    "Appointment time must be in HH:MM format",
                ));
                None
            }
            None => {
                errors.push(FieldError::new(
                    "appointmentTime",
                    "Appointment time is required",
                ));
                None
            }
        };

        let reason = match self.reason.map(|v| v.trim().to_string()) {
            Some(v) if !v.is_empty() => Some(v),
            _ => {
                errors.push(FieldError::new("reason", "Reason is required"));
                None
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(NewAppointment {
            patient_id: patient_id.unwrap(),
            doctor_id: doctor_id.unwrap(),
            appointment_date: appointment_date.unwrap(),
            appointment_time: appointment_time.unwrap(),
            duration: self.duration.unwrap_or(30),
            reason: reason.unwrap(),
            notes: self.notes,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentRequest {
    pub doctor: Option<String>,
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
    pub duration: Option<i32>,
    pub reason: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// Validated partial update. Reschedule fields are canonicalized here so
/// the conflict re-check and the stored row always agree.
#[derive(Debug, Clone, Default)]
pub struct AppointmentPatch {
    pub doctor_id: Option<Uuid>,
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time: Option<String>,
    pub duration: Option<i32>,
    pub reason: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
}

impl UpdateAppointmentRequest {
    pub fn validate(self) -> Result<AppointmentPatch, Vec<FieldError>> {
        let mut errors = Vec::new();
        let mut patch = AppointmentPatch::default();

        if let Some(doctor) = self.doctor.as_deref() {
            match Uuid::parse_str(doctor.trim()) {
                Ok(id) => patch.doctor_id = Some(id),
                Err(_) => errors.push(FieldError::new("doctor", "Invalid ID format")),
            }
        }

        if let Some(date) = self.appointment_date.as_deref() {
            match NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d") {
                Ok(date) => patch.appointment_date = Some(date),
                Err(_) => errors.push(FieldError::new(
                    "appointmentDate",
                    "Valid appointment date is required",
                )),
            }
        }

        if let Some(time) = self.appointment_time.as_deref() {
            match canonicalize_time(time) {
                Some(time) => patch.appointment_time = Some(time),
                None => errors.push(FieldError::new(
                    "appointmentTime",
                    "Appointment time must be in HH:MM format",
                )),
            }
        }

        if let Some(status) = self.status.as_deref() {
            match AppointmentStatus::parse(status) {
                Some(status) => patch.status = Some(status),
                None => errors.push(FieldError::new("status", "Invalid status value")),
            }
        }

        if let Some(reason) = self.reason {
            if reason.trim().is_empty() {
                errors.push(FieldError::new("reason", "Reason is required"));
            } else {
                patch.reason = Some(reason.trim().to_string());
            }
        }

        patch.duration = self.duration;
        patch.notes = self.notes;

        if errors.is_empty() {
            Ok(patch)
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AppointmentQueryParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub patient: Option<Uuid>,
    pub doctor: Option<Uuid>,
    pub status: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleQueryParams {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("This time slot is already booked")]
    SlotTaken,

    #[error("Database error: {0}")]
    Database(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request() -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            patient: Some(Uuid::new_v4().to_string()),
            doctor: Some(Uuid::new_v4().to_string()),
            appointment_date: Some("2026-09-15".to_string()),
            appointment_time: Some("9:00".to_string()),
            duration: None,
            reason: Some("Annual checkup".to_string()),
            notes: None,
        }
    }

    #[test]
    fn create_canonicalizes_time_and_defaults_duration() {
        let new = create_request().validate().unwrap();
        assert_eq!(new.appointment_time, "09:00");
        assert_eq!(new.duration, 30);
    }

    #[test]
    fn create_collects_all_missing_fields() {
        let request = CreateAppointmentRequest {
            patient: None,
            doctor: None,
            appointment_date: Some("not-a-date".to_string()),
            appointment_time: None,
            duration: None,
            reason: None,
            notes: None,
        };

        let errors = request.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "patient",
                "doctor",
                "appointmentDate",
                "appointmentTime",
                "reason"
            ]
        );
    }

    #[test]
    fn update_rejects_unknown_status() {
        let request = UpdateAppointmentRequest {
            status: Some("rescheduled".to_string()),
            ..Default::default()
        };

        let errors = request.validate().unwrap_err();
        assert_eq!(errors[0].field, "status");
    }

    #[test]
    fn update_canonicalizes_reschedule_time() {
        let request = UpdateAppointmentRequest {
            appointment_time: Some("7:30".to_string()),
            ..Default::default()
        };

        let patch = request.validate().unwrap();
        assert_eq!(patch.appointment_time.as_deref(), Some("07:30"));
    }

    #[test]
    fn only_scheduled_and_confirmed_hold_slots() {
        assert!(AppointmentStatus::Scheduled.holds_slot());
        assert!(AppointmentStatus::Confirmed.holds_slot());
        assert!(!AppointmentStatus::Completed.holds_slot());
        assert!(!AppointmentStatus::Cancelled.holds_slot());
        assert!(!AppointmentStatus::NoShow.holds_slot());
    }

    #[test]
    fn no_show_serializes_with_hyphen() {
        let json = serde_json::to_string(&AppointmentStatus::NoShow).unwrap();
        assert_eq!(json, "\"no-show\"");
    }
}
