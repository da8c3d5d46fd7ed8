use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use shared_models::error::FieldError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub email: Option<String>,
    pub phone: String,
    pub address: Option<Address>,
    pub emergency_contact: EmergencyContact,
    pub blood_group: Option<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub chronic_conditions: Vec<String>,
    pub is_active: bool,
    pub registered_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "male"),
            Gender::Female => write!(f, "female"),
            Gender::Other => write!(f, "other"),
        }
    }
}

// Stored as jsonb; one casing both ways.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: Option<String>,
    pub phone: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContactInput {
    pub name: Option<String>,
    pub relationship: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatientRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub emergency_contact: Option<EmergencyContactInput>,
    pub blood_group: Option<String>,
    pub allergies: Option<Vec<String>>,
    pub chronic_conditions: Option<Vec<String>>,
}

/// Patient input after the field validation pass.
#[derive(Debug, Clone)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub email: Option<String>,
    pub phone: String,
    pub address: Option<Address>,
    pub emergency_contact: EmergencyContact,
    pub blood_group: Option<String>,
    pub allergies: Vec<String>,
    pub chronic_conditions: Vec<String>,
}

impl CreatePatientRequest {
    pub fn validate(self) -> Result<NewPatient, Vec<FieldError>> {
        let mut errors = Vec::new();

        let first_name = require_text(self.first_name, "firstName", "First name is required", &mut errors);
        let last_name = require_text(self.last_name, "lastName", "Last name is required", &mut errors);

        let date_of_birth = match self.date_of_birth.as_deref().map(parse_date) {
            Some(Some(date)) => Some(date),
            _ => {
                errors.push(FieldError::new(
                    "dateOfBirth",
                    "Valid date of birth is required",
                ));
                None
            }
        };

        let gender = match self.gender.as_deref().map(parse_gender) {
            Some(Some(g)) => Some(g),
            _ => {
                errors.push(FieldError::new(
                    "gender",
                    "Gender must be male, female, or other",
                ));
                None
            }
        };

        let phone = require_text(self.phone, "phone", "Phone number is required", &mut errors);

        let contact_name = require_text(
            self.emergency_contact.as_ref().and_then(|c| c.name.clone()),
            "emergencyContact.name",
            "Emergency contact name is required",
            &mut errors,
        );
        let contact_phone = require_text(
            self.emergency_contact.as_ref().and_then(|c| c.phone.clone()),
            "emergencyContact.phone",
            "Emergency contact phone is required",
            &mut errors,
        );

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(NewPatient {
            first_name: first_name.unwrap(),
            last_name: last_name.unwrap(),
            date_of_birth: date_of_birth.unwrap(),
            gender: gender.unwrap(),
            email: self.email,
            phone: phone.unwrap(),
            address: self.address,
            emergency_contact: EmergencyContact {
                name: contact_name.unwrap(),
                relationship: self
                    .emergency_contact
                    .and_then(|c| c.relationship),
                phone: contact_phone.unwrap(),
            },
            blood_group: self.blood_group,
            allergies: self.allergies.unwrap_or_default(),
            chronic_conditions: self.chronic_conditions.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePatientRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub emergency_contact: Option<EmergencyContactInput>,
    pub blood_group: Option<String>,
    pub allergies: Option<Vec<String>>,
    pub chronic_conditions: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

/// Validated partial update; only supplied fields are present.
#[derive(Debug, Clone, Default)]
pub struct PatientPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub blood_group: Option<String>,
    pub allergies: Option<Vec<String>>,
    pub chronic_conditions: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

impl UpdatePatientRequest {
    pub fn validate(self) -> Result<PatientPatch, Vec<FieldError>> {
        let mut errors = Vec::new();
        let mut patch = PatientPatch::default();

        if let Some(value) = self.first_name {
            patch.first_name =
                require_text(Some(value), "firstName", "First name is required", &mut errors);
        }
        if let Some(value) = self.last_name {
            patch.last_name =
                require_text(Some(value), "lastName", "Last name is required", &mut errors);
        }
        if let Some(value) = self.date_of_birth {
            match parse_date(&value) {
                Some(date) => patch.date_of_birth = Some(date),
                None => errors.push(FieldError::new(
                    "dateOfBirth",
                    "Valid date of birth is required",
                )),
            }
        }
        if let Some(value) = self.gender {
            match parse_gender(&value) {
                Some(g) => patch.gender = Some(g),
                None => errors.push(FieldError::new(
                    "gender",
                    "Gender must be male, female, or other",
                )),
            }
        }
        if let Some(value) = self.phone {
            patch.phone = require_text(Some(value), "phone", "Phone number is required", &mut errors);
        }

        patch.email = self.email;
        patch.address = self.address;
        patch.blood_group = self.blood_group;
        patch.allergies = self.allergies;
        patch.chronic_conditions = self.chronic_conditions;
        patch.is_active = self.is_active;

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(patch)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientQueryParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),
}

fn require_text(
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

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

fn parse_gender(value: &str) -> Option<Gender> {
    match value.trim() {
        "male" => Some(Gender::Male),
        "female" => Some(Gender::Female),
        "other" => Some(Gender::Other),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> CreatePatientRequest {
        CreatePatientRequest {
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
            date_of_birth: Some("1990-05-15".to_string()),
            gender: Some("female".to_string()),
            email: None,
            phone: Some("+1234567890".to_string()),
            address: None,
            emergency_contact: Some(EmergencyContactInput {
                name: Some("John Doe".to_string()),
                relationship: None,
                phone: Some("+0987654321".to_string()),
            }),
            blood_group: None,
            allergies: None,
            chronic_conditions: None,
        }
    }

    #[test]
    fn valid_request_passes() {
        let patient = base_request().validate().unwrap();
        assert_eq!(patient.first_name, "Jane");
        assert_eq!(patient.gender, Gender::Female);
    }

    #[test]
    fn missing_emergency_contact_is_reported_per_field() {
        let mut request = base_request();
        request.emergency_contact = None;

        let errors = request.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["emergencyContact.name", "emergencyContact.phone"]);
    }

    #[test]
    fn invalid_gender_is_rejected() {
        let mut request = base_request();
        request.gender = Some("unknown".to_string());

        let errors = request.validate().unwrap_err();
        assert_eq!(errors[0].message, "Gender must be male, female, or other");
    }

    #[test]
    fn update_validates_only_supplied_fields() {
        let request = UpdatePatientRequest {
            first_name: None,
            last_name: None,
            date_of_birth: Some("not-a-date".to_string()),
            gender: None,
            email: None,
            phone: None,
            address: None,
            emergency_contact: None,
            blood_group: None,
            allergies: None,
            chronic_conditions: None,
            is_active: None,
        };

        let errors = request.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "dateOfBirth");
    }
}
