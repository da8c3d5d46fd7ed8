use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::{PostgrestClient, PostgrestError};
use shared_utils::jwt::sign_token;

use crate::models::{AuthCellError, Doctor, NewDoctor};

pub struct DoctorDirectoryService {
    postgrest: PostgrestClient,
    jwt_secret: String,
    token_ttl_hours: i64,
}

impl DoctorDirectoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            postgrest: PostgrestClient::new(config),
            jwt_secret: config.jwt_secret.clone(),
            token_ttl_hours: config.token_ttl_hours,
        }
    }

    /// Registers a practitioner and issues a token. Email uniqueness is
    /// checked up front and also guaranteed by the unique index on
    /// doctors.email, so a racing duplicate registration fails on insert.
    pub async fn register(&self, new: NewDoctor) -> Result<(Doctor, String), AuthCellError> {
        debug!("Registering doctor with email {}", new.email);

        let existing_path = format!(
            "/rest/v1/doctors?email=eq.{}&select=id",
            urlencoding::encode(&new.email)
        );
        let existing: Vec<Value> = self
            .postgrest
            .request(Method::GET, &existing_path, None, None)
            .await
            .map_err(|e| AuthCellError::Database(e.to_string()))?;

        if !existing.is_empty() {
            return Err(AuthCellError::EmailTaken);
        }

        let password_hash = hash_password(&new.password)?;

        let body = json!({
            "name": new.name,
            "email": new.email,
            "password_hash": password_hash,
            "specialization": new.specialization,
            "license_number": new.license_number,
            "phone": new.phone,
            "role": new.role,
            "is_active": true,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Doctor> = self
            .postgrest
            .request_with_headers(Method::POST, "/rest/v1/doctors", None, Some(body), Some(headers))
            .await
            .map_err(|e| match e {
                PostgrestError::Conflict(_) => AuthCellError::EmailTaken,
                other => AuthCellError::Database(other.to_string()),
            })?;

        let doctor = result
            .into_iter()
            .next()
            .ok_or_else(|| AuthCellError::Database("Insert returned no row".to_string()))?;

        let token = self.issue_token(&doctor)?;
        info!("Doctor {} registered", doctor.id);

        Ok((doctor, token))
    }

    /// Verifies credentials and the active flag, then issues a token.
    pub async fn login(&self, email: &str, password: &str) -> Result<(Doctor, String), AuthCellError> {
        debug!("Login attempt for {}", email);

        let path = format!(
            "/rest/v1/doctors?email=eq.{}&select=*",
            urlencoding::encode(email)
        );
        let result: Vec<Doctor> = self
            .postgrest
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| AuthCellError::Database(e.to_string()))?;

        let doctor = result
            .into_iter()
            .next()
            .ok_or(AuthCellError::InvalidCredentials)?;

        let stored_hash = doctor
            .password_hash
            .as_deref()
            .ok_or(AuthCellError::InvalidCredentials)?;

        verify_password(password, stored_hash)?;

        if !doctor.is_active {
            return Err(AuthCellError::AccountInactive);
        }

        let token = self.issue_token(&doctor)?;
        info!("Doctor {} logged in", doctor.id);

        Ok((doctor, token))
    }

    pub async fn get_doctor(&self, doctor_id: Uuid, auth_token: &str) -> Result<Doctor, AuthCellError> {
        let path = format!(
            "/rest/v1/doctors?id=eq.{}&select=id,name,email,specialization,license_number,phone,role,is_active,created_at,updated_at",
            doctor_id
        );
        let result: Vec<Doctor> = self
            .postgrest
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AuthCellError::Database(e.to_string()))?;

        result.into_iter().next().ok_or(AuthCellError::NotFound)
    }

    fn issue_token(&self, doctor: &Doctor) -> Result<String, AuthCellError> {
        sign_token(
            doctor.id,
            &doctor.email,
            doctor.role,
            &self.jwt_secret,
            self.token_ttl_hours,
        )
        .map_err(AuthCellError::Token)
    }
}

fn hash_password(password: &str) -> Result<String, AuthCellError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthCellError::Hash(e.to_string()))
}

fn verify_password(password: &str, stored_hash: &str) -> Result<(), AuthCellError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| AuthCellError::Hash(e.to_string()))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthCellError::InvalidCredentials)
}
