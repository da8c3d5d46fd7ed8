use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::{CreatePatientRequest, PatientError, PatientQueryParams, UpdatePatientRequest};
use crate::services::patient::PatientCellService;

fn map_patient_error(e: PatientError) -> AppError {
    match e {
        PatientError::NotFound => AppError::NotFound("Patient not found".to_string()),
        PatientError::Database(msg) => AppError::Internal(msg),
    }
}

#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let new_patient = request.validate().map_err(AppError::Validation)?;

    let service = PatientCellService::new(&state);
    let patient = service
        .create_patient(new_patient, user.id, auth.token())
        .await
        .map_err(map_patient_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Patient created successfully",
            "data": patient,
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_patients(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<PatientQueryParams>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let service = PatientCellService::new(&state);
    let (patients, total) = service
        .search_patients(&params, auth.token())
        .await
        .map_err(map_patient_error)?;

    let limit = params.limit.unwrap_or(10).max(1);
    let page = params.page.unwrap_or(1).max(1);

    Ok(Json(json!({
        "success": true,
        "count": patients.len(),
        "total": total,
        "totalPages": (total + limit - 1) / limit,
        "currentPage": page,
        "data": patients,
    })))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let service = PatientCellService::new(&state);
    let patient = service
        .get_patient(patient_id, auth.token())
        .await
        .map_err(map_patient_error)?;

    Ok(Json(json!({
        "success": true,
        "data": patient,
    })))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<AuthUser>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let patch = request.validate().map_err(AppError::Validation)?;

    let service = PatientCellService::new(&state);
    let patient = service
        .update_patient(patient_id, patch, auth.token())
        .await
        .map_err(map_patient_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Patient updated successfully",
        "data": patient,
    })))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let service = PatientCellService::new(&state);
    service
        .delete_patient(patient_id, auth.token())
        .await
        .map_err(map_patient_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Patient deleted successfully",
        "data": {},
    })))
}
