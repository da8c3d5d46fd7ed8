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
use shared_models::auth::{AuthUser, Role};
use shared_models::error::AppError;
use shared_utils::authz;

use crate::models::{
    CreateMedicalRecordRequest, MedicalRecordError, RecordQueryParams, UpdateMedicalRecordRequest,
};
use crate::services::record::MedicalRecordService;

fn map_record_error(e: MedicalRecordError) -> AppError {
    match e {
        MedicalRecordError::RecordNotFound => {
            AppError::NotFound("Medical record not found".to_string())
        }
        MedicalRecordError::PatientNotFound => AppError::NotFound("Patient not found".to_string()),
        MedicalRecordError::Database(msg) => AppError::Internal(msg),
    }
}

#[axum::debug_handler]
pub async fn create_record(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateMedicalRecordRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let new_record = request.validate().map_err(AppError::Validation)?;

    let service = MedicalRecordService::new(&state);
    let record = service
        .create_record(new_record, user.id, auth.token())
        .await
        .map_err(map_record_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Medical record created successfully",
            "data": record,
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_records(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<RecordQueryParams>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let service = MedicalRecordService::new(&state);
    let (records, total) = service
        .list_records(&params, auth.token())
        .await
        .map_err(map_record_error)?;

    let limit = params.limit.unwrap_or(10).max(1);
    let page = params.page.unwrap_or(1).max(1);

    Ok(Json(json!({
        "success": true,
        "count": records.len(),
        "total": total,
        "totalPages": (total + limit - 1) / limit,
        "currentPage": page,
        "data": records,
    })))
}

#[axum::debug_handler]
pub async fn get_record(
    State(state): State<Arc<AppConfig>>,
    Path(record_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let service = MedicalRecordService::new(&state);
    let record = service
        .get_record(record_id, auth.token())
        .await
        .map_err(map_record_error)?;

    Ok(Json(json!({
        "success": true,
        "data": record,
    })))
}

/// Updates are restricted to the doctor who authored the record, or an
/// admin. The ownership check runs against the stored row before any
/// patch is sent.
#[axum::debug_handler]
pub async fn update_record(
    State(state): State<Arc<AppConfig>>,
    Path(record_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<UpdateMedicalRecordRequest>,
) -> Result<Json<Value>, AppError> {
    request.validate().map_err(AppError::Validation)?;

    let service = MedicalRecordService::new(&state);
    let existing = service
        .get_record_row(record_id, auth.token())
        .await
        .map_err(map_record_error)?;

    authz::require_owner_or_admin(
        &user,
        existing.doctor_id,
        "Not authorized to update this medical record",
    )?;

    let record = service
        .update_record(record_id, request, auth.token())
        .await
        .map_err(map_record_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Medical record updated successfully",
        "data": record,
    })))
}

#[axum::debug_handler]
pub async fn delete_record(
    State(state): State<Arc<AppConfig>>,
    Path(record_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    authz::require_role(&user, Role::Admin)?;

    let service = MedicalRecordService::new(&state);
    service
        .delete_record(record_id, auth.token())
        .await
        .map_err(map_record_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Medical record deleted successfully",
        "data": {},
    })))
}

#[axum::debug_handler]
pub async fn get_patient_history(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let service = MedicalRecordService::new(&state);
    let (patient, records) = service
        .patient_history(patient_id, auth.token())
        .await
        .map_err(map_record_error)?;

    Ok(Json(json!({
        "success": true,
        "count": records.len(),
        "data": {
            "patient": patient,
            "records": records,
        },
    })))
}
