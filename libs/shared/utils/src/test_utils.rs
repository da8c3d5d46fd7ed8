use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{AuthUser, Role};

use crate::jwt::sign_token;

pub struct TestConfig {
    pub jwt_secret: String,
    pub database_url: String,
    pub database_api_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            database_url: "http://localhost:3001".to_string(),
            database_api_key: "test-api-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_database_url(url: &str) -> Self {
        Self {
            database_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            database_url: self.database_url.clone(),
            database_api_key: self.database_api_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            token_ttl_hours: 24,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl TestUser {
    pub fn doctor(email: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: "Dr. Test".to_string(),
            email: email.to_string(),
            role: Role::Doctor,
        }
    }

    pub fn admin(email: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: "Dr. Admin".to_string(),
            email: email.to_string(),
            role: Role::Admin,
        }
    }

    pub fn to_auth_user(&self) -> AuthUser {
        AuthUser {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            created_at: Some(chrono::Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        sign_token(user.id, &user.email, user.role, secret, exp_hours.unwrap_or(24))
            .expect("test token signing")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned storage rows in the snake_case shape PostgREST returns. Used to
/// drive wiremock responses in cell tests.
pub struct MockRows;

impl MockRows {
    pub fn doctor_row(id: Uuid, name: &str, email: &str, specialization: &str) -> Value {
        Self::doctor_row_with_role(id, name, email, specialization, "doctor", true)
    }

    pub fn doctor_row_with_role(
        id: Uuid,
        name: &str,
        email: &str,
        specialization: &str,
        role: &str,
        is_active: bool,
    ) -> Value {
        json!({
            "id": id,
            "name": name,
            "email": email,
            "specialization": specialization,
            "license_number": "LIC999",
            "phone": "+1111111111",
            "role": role,
            "is_active": is_active,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn patient_row(id: Uuid, first_name: &str, last_name: &str) -> Value {
        json!({
            "id": id,
            "first_name": first_name,
            "last_name": last_name,
            "date_of_birth": "1990-05-15",
            "gender": "female",
            "email": "patient@example.com",
            "phone": "+1234567890",
            "address": null,
            "emergency_contact": {
                "name": "John Doe",
                "relationship": null,
                "phone": "+0987654321"
            },
            "blood_group": null,
            "allergies": [],
            "chronic_conditions": [],
            "is_active": true,
            "registered_by": Uuid::new_v4(),
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_row(
        id: Uuid,
        patient_id: Uuid,
        doctor_id: Uuid,
        date: &str,
        time: &str,
        status: &str,
    ) -> Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "appointment_date": date,
            "appointment_time": time,
            "duration": 30,
            "reason": "Regular checkup",
            "status": status,
            "notes": null,
            "created_by": doctor_id,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn medical_record_row(id: Uuid, patient_id: Uuid, doctor_id: Uuid) -> Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "visit_date": "2024-06-01T09:30:00Z",
            "chief_complaint": "Persistent cough",
            "diagnosis": "Acute bronchitis",
            "symptoms": ["cough", "fatigue"],
            "vital_signs": null,
            "prescriptions": [],
            "lab_tests": [],
            "notes": null,
            "follow_up_date": null,
            "created_at": "2024-06-01T09:45:00Z",
            "updated_at": "2024-06-01T09:45:00Z"
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::validate_token;

    #[test]
    fn test_token_roundtrip() {
        let config = TestConfig::default();
        let user = TestUser::doctor("doc@example.com");
        let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

        let claims = validate_token(&token, &config.jwt_secret).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Some(Role::Doctor));
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = TestConfig::default();
        let user = TestUser::doctor("doc@example.com");
        let token = JwtTestUtils::create_expired_token(&user, &config.jwt_secret);

        assert!(validate_token(&token, &config.jwt_secret).is_err());
    }
}
