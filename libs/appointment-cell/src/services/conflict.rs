//! Slot conflict detection. A doctor's slot is a (date, time) pair; two
//! bookings conflict only when both tokens match exactly and the existing
//! appointment still holds the slot. Interval overlap is not considered.
//!
//! This check is advisory. The authoritative guard is the partial unique
//! index on active appointments, which turns a lost race into a 409 from
//! storage.

use chrono::NaiveDate;
use reqwest::Method;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::AppointmentError;

#[derive(Debug, Deserialize)]
struct SlotRow {
    #[allow(dead_code)]
    id: Uuid,
}

pub struct ConflictService {
    postgrest: PostgrestClient,
}

impl ConflictService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            postgrest: PostgrestClient::new(config),
        }
    }

    /// Returns true when an active appointment already occupies the slot.
    /// `exclude` skips the appointment being rescheduled so it never
    /// conflicts with itself.
    pub async fn has_conflict(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: &str,
        exclude: Option<Uuid>,
        auth_token: &str,
    ) -> Result<bool, AppointmentError> {
        let mut path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&appointment_date=eq.{}&appointment_time=eq.{}&status=in.(scheduled,confirmed)&select=id&limit=1",
            doctor_id,
            date.format("%Y-%m-%d"),
            time
        );
        if let Some(exclude) = exclude {
            path.push_str(&format!("&id=neq.{}", exclude));
        }

        let rows: Vec<SlotRow> = self
            .postgrest
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        let taken = !rows.is_empty();
        if taken {
            debug!(
                "Slot conflict for doctor {} on {} at {}",
                doctor_id, date, time
            );
        }
        Ok(taken)
    }
}
