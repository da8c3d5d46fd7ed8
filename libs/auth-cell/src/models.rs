use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::auth::Role;
use shared_models::error::FieldError;

/// A practitioner account. Deserialized from storage rows (snake_case) and
/// serialized to the API surface (camelCase). The credential hash never
/// leaves this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub specialization: String,
    pub license_number: String,
    pub phone: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterDoctorRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub specialization: Option<String>,
    #[serde(rename = "licenseNumber")]
    pub license_number: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
}

/// Registration input after the field validation pass.
#[derive(Debug, Clone)]
pub struct NewDoctor {
    pub name: String,
    pub email: String,
    pub password: String,
    pub specialization: String,
    pub license_number: String,
    pub phone: String,
    pub role: Role,
}

impl RegisterDoctorRequest {
    pub fn validate(self) -> Result<NewDoctor, Vec<FieldError>> {
        let mut errors = Vec::new();

        let name = non_empty(self.name, "name", "Name is required", &mut errors);
        let email = match self.email.as_deref().map(str::trim) {
            Some(value) if value.contains('@') && value.contains('.') => {
                Some(value.to_lowercase())
            }
            _ => {
                errors.push(FieldError::new("email", "Please provide a valid email"));
                None
            }
        };
        let password = match self.password {
            Some(value) if value.len() >= 6 => Some(value),
            _ => {
                errors.push(FieldError::new(
                    "password",
                    "Password must be at least 6 characters",
                ));
                None
            }
        };
        let specialization = non_empty(
            self.specialization,
            "specialization",
            "Specialization is required",
            &mut errors,
        );
        let license_number = non_empty(
            self.license_number,
            "licenseNumber",
            "License number is required",
            &mut errors,
        );
        let phone = non_empty(self.phone, "phone", "Phone number is required", &mut errors);

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(NewDoctor {
            name: name.unwrap(),
            email: email.unwrap(),
            password: password.unwrap(),
            specialization: specialization.unwrap(),
            license_number: license_number.unwrap(),
            phone: phone.unwrap(),
            role: self.role.unwrap_or(Role::Doctor),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    pub fn validate(self) -> Result<(String, String), Vec<FieldError>> {
        let mut errors = Vec::new();

        let email = match self.email.as_deref().map(str::trim) {
            Some(value) if value.contains('@') && value.contains('.') => {
                Some(value.to_lowercase())
            }
            _ => {
                errors.push(FieldError::new("email", "Please provide a valid email"));
                None
            }
        };
        let password = match self.password {
            Some(value) if !value.is_empty() => Some(value),
            _ => {
                errors.push(FieldError::new("password", "Password is required"));
                None
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok((email.unwrap(), password.unwrap()))
    }
}

fn non_empty(
    value: Option<String>,
    field: &str,
    message: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            errors.push(FieldError::new(field, message));
            None
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthCellError {
    #[error("Doctor with this email already exists")]
    EmailTaken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is inactive")]
    AccountInactive,

    #[error("Doctor not found")]
    NotFound,

    #[error("Credential hashing error: {0}")]
    Hash(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Database error: {0}")]
    Database(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_validation_collects_field_errors() {
        let request = RegisterDoctorRequest {
            name: Some("".to_string()),
            email: Some("not-an-email".to_string()),
            password: Some("short".to_string()),
            specialization: None,
            license_number: None,
            phone: None,
            role: None,
        };

        let errors = request.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["name", "email", "password", "specialization", "licenseNumber", "phone"]
        );
    }

    #[test]
    fn registration_lowercases_email_and_defaults_role() {
        let request = RegisterDoctorRequest {
            name: Some("Dr. Test".to_string()),
            email: Some("Doc@Hospital.COM".to_string()),
            password: Some("password123".to_string()),
            specialization: Some("General".to_string()),
            license_number: Some("LIC999".to_string()),
            phone: Some("+1111111111".to_string()),
            role: None,
        };

        let doctor = request.validate().unwrap();
        assert_eq!(doctor.email, "doc@hospital.com");
        assert_eq!(doctor.role, Role::Doctor);
    }
}
