use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::{AuthCellError, LoginRequest, RegisterDoctorRequest};
use crate::services::directory::DoctorDirectoryService;

fn map_auth_error(e: AuthCellError) -> AppError {
    match e {
        AuthCellError::EmailTaken => {
            AppError::BadRequest("Doctor with this email already exists".to_string())
        }
        AuthCellError::InvalidCredentials => AppError::Auth("Invalid credentials".to_string()),
        AuthCellError::AccountInactive => AppError::Auth("Account is inactive".to_string()),
        AuthCellError::NotFound => AppError::NotFound("Doctor not found".to_string()),
        other => AppError::Internal(other.to_string()),
    }
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<RegisterDoctorRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let new_doctor = request.validate().map_err(AppError::Validation)?;

    let directory = DoctorDirectoryService::new(&state);
    let (doctor, token) = directory
        .register(new_doctor)
        .await
        .map_err(map_auth_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Doctor registered successfully",
            "data": {
                "id": doctor.id,
                "name": doctor.name,
                "email": doctor.email,
                "specialization": doctor.specialization,
                "licenseNumber": doctor.license_number,
                "phone": doctor.phone,
                "role": doctor.role,
            },
            "token": token,
        })),
    ))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let (email, password) = request.validate().map_err(AppError::Validation)?;

    let directory = DoctorDirectoryService::new(&state);
    let (doctor, token) = directory
        .login(&email, &password)
        .await
        .map_err(map_auth_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "data": {
            "id": doctor.id,
            "name": doctor.name,
            "email": doctor.email,
            "specialization": doctor.specialization,
            "role": doctor.role,
        },
        "token": token,
    })))
}

#[axum::debug_handler]
pub async fn me(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let directory = DoctorDirectoryService::new(&state);
    let doctor = directory
        .get_doctor(user.id, auth.token())
        .await
        .map_err(map_auth_error)?;

    Ok(Json(json!({
        "success": true,
        "data": doctor,
    })))
}

/// Tokens are stateless and expire on their own schedule, so logout only
/// acknowledges the client-side token discard.
#[axum::debug_handler]
pub async fn logout(Extension(_user): Extension<AuthUser>) -> Result<Json<Value>, AppError> {
    Ok(Json(json!({
        "success": true,
        "message": "Logout successful",
    })))
}
