use chrono::{Duration, NaiveDate};
use reqwest::Method;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{Appointment, AppointmentError, AppointmentView, DoctorSummary};
use crate::services::scheduling::SchedulingService;

pub struct AgendaService {
    postgrest: PostgrestClient,
    scheduling: SchedulingService,
}

impl AgendaService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            postgrest: PostgrestClient::new(config),
            scheduling: SchedulingService::new(config),
        }
    }

    /// A doctor's agenda, chronological. Defaults to the full book; a
    /// `date` narrows it to that day.
    pub async fn get_doctor_schedule(
        &self,
        doctor_id: Uuid,
        date: Option<NaiveDate>,
        auth_token: &str,
    ) -> Result<(DoctorSummary, Vec<AppointmentView>), AppointmentError> {
        let doctor = self
            .scheduling
            .fetch_doctor_summary(doctor_id, auth_token)
            .await?
            .ok_or(AppointmentError::DoctorNotFound)?;

        let mut query_parts = vec![format!("doctor_id=eq.{}", doctor_id)];
        if let Some(date) = date {
            let next = date + Duration::days(1);
            query_parts.push(format!("appointment_date=gte.{}", date.format("%Y-%m-%d")));
            query_parts.push(format!("appointment_date=lt.{}", next.format("%Y-%m-%d")));
        }

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));
        let mut appointments: Vec<Appointment> = self
            .postgrest
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        // Canonical "HH:MM" sorts lexicographically, so the pair orders
        // the agenda chronologically regardless of storage order.
        appointments.sort_by(|a, b| {
            (a.appointment_date, a.appointment_time.as_str())
                .cmp(&(b.appointment_date, b.appointment_time.as_str()))
        });

        let views = self
            .scheduling
            .compose_views(appointments, auth_token)
            .await?;
        Ok((doctor, views))
    }
}
