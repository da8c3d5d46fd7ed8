use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{NewPatient, Patient, PatientError, PatientPatch, PatientQueryParams};

pub struct PatientCellService {
    postgrest: PostgrestClient,
}

impl PatientCellService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            postgrest: PostgrestClient::new(config),
        }
    }

    pub async fn create_patient(
        &self,
        new: NewPatient,
        registered_by: Uuid,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Creating patient {} {}", new.first_name, new.last_name);

        let body = json!({
            "first_name": new.first_name,
            "last_name": new.last_name,
            "date_of_birth": new.date_of_birth.format("%Y-%m-%d").to_string(),
            "gender": new.gender,
            "email": new.email,
            "phone": new.phone,
            "address": new.address,
            "emergency_contact": new.emergency_contact,
            "blood_group": new.blood_group,
            "allergies": new.allergies,
            "chronic_conditions": new.chronic_conditions,
            "is_active": true,
            "registered_by": registered_by,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Patient> = self
            .postgrest
            .request_with_headers(
                Method::POST,
                "/rest/v1/patients",
                Some(auth_token),
                Some(body),
                Some(headers),
            )
            .await
            .map_err(|e| PatientError::Database(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| PatientError::Database("Insert returned no row".to_string()))
    }

    pub async fn search_patients(
        &self,
        params: &PatientQueryParams,
        auth_token: &str,
    ) -> Result<(Vec<Patient>, i64), PatientError> {
        let page = params.page.unwrap_or(1).max(1);
        let limit = params.limit.unwrap_or(10).max(1);
        let offset = (page - 1) * limit;

        let mut query_parts = Vec::new();

        if let Some(search) = params.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = format!("*{}*", search);
            let encoded = urlencoding::encode(&pattern).into_owned();
            query_parts.push(format!(
                "or=(first_name.ilike.{0},last_name.ilike.{0},phone.ilike.{0})",
                encoded
            ));
        }

        if let Some(is_active) = params.is_active {
            query_parts.push(format!("is_active=eq.{}", is_active));
        }

        query_parts.push("order=created_at.desc".to_string());
        query_parts.push(format!("limit={}", limit));
        query_parts.push(format!("offset={}", offset));

        let path = format!("/rest/v1/patients?{}", query_parts.join("&"));

        self.postgrest
            .select_with_count(&path, Some(auth_token))
            .await
            .map_err(|e| PatientError::Database(e.to_string()))
    }

    pub async fn get_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Patient> = self
            .postgrest
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PatientError::Database(e.to_string()))?;

        result.into_iter().next().ok_or(PatientError::NotFound)
    }

    pub async fn update_patient(
        &self,
        patient_id: Uuid,
        patch: PatientPatch,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        // Existence check first so a missing row surfaces as 404, not as an
        // empty PATCH result.
        self.get_patient(patient_id, auth_token).await?;

        let mut update_data = serde_json::Map::new();

        if let Some(first_name) = patch.first_name {
            update_data.insert("first_name".to_string(), json!(first_name));
        }
        if let Some(last_name) = patch.last_name {
            update_data.insert("last_name".to_string(), json!(last_name));
        }
        if let Some(date_of_birth) = patch.date_of_birth {
            update_data.insert(
                "date_of_birth".to_string(),
                json!(date_of_birth.format("%Y-%m-%d").to_string()),
            );
        }
        if let Some(gender) = patch.gender {
            update_data.insert("gender".to_string(), json!(gender));
        }
        if let Some(email) = patch.email {
            update_data.insert("email".to_string(), json!(email));
        }
        if let Some(phone) = patch.phone {
            update_data.insert("phone".to_string(), json!(phone));
        }
        if let Some(address) = patch.address {
            update_data.insert("address".to_string(), json!(address));
        }
        if let Some(blood_group) = patch.blood_group {
            update_data.insert("blood_group".to_string(), json!(blood_group));
        }
        if let Some(allergies) = patch.allergies {
            update_data.insert("allergies".to_string(), json!(allergies));
        }
        if let Some(chronic_conditions) = patch.chronic_conditions {
            update_data.insert("chronic_conditions".to_string(), json!(chronic_conditions));
        }
        if let Some(is_active) = patch.is_active {
            update_data.insert("is_active".to_string(), json!(is_active));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Patient> = self
            .postgrest
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(headers),
            )
            .await
            .map_err(|e| PatientError::Database(e.to_string()))?;

        result.into_iter().next().ok_or(PatientError::NotFound)
    }

    pub async fn delete_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<(), PatientError> {
        self.get_patient(patient_id, auth_token).await?;

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        self.postgrest
            .request_no_content(Method::DELETE, &path, Some(auth_token), None)
            .await
            .map_err(|e| PatientError::Database(e.to_string()))
    }
}
