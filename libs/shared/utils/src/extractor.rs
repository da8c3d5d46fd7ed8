use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;
use shared_models::auth::{AuthUser, Role};
use shared_models::error::AppError;

use crate::jwt::validate_token;

#[derive(Debug, Deserialize)]
struct DoctorAccountRow {
    id: Uuid,
    name: String,
    email: String,
    role: Role,
    is_active: bool,
    created_at: Option<DateTime<Utc>>,
}

/// Authentication middleware. Verifies the bearer token, loads the
/// practitioner account and rejects inactive accounts before any handler
/// runs. The resulting [`AuthUser`] is attached to request extensions.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    if !auth_value.starts_with("Bearer ") {
        return Err(AppError::Auth("Invalid authorization header format".to_string()));
    }

    let token = &auth_value[7..];

    let claims = validate_token(token, &config.jwt_secret).map_err(AppError::Auth)?;

    // The token alone is not enough: the account must still exist and be
    // active at request time.
    let client = PostgrestClient::new(&config);
    let path = format!(
        "/rest/v1/doctors?id=eq.{}&select=id,name,email,role,is_active,created_at",
        claims.sub
    );

    let rows: Vec<DoctorAccountRow> = client
        .request(Method::GET, &path, Some(token), None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let account = rows
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Auth("Account not found".to_string()))?;

    if !account.is_active {
        return Err(AppError::Auth("Account is inactive".to_string()));
    }

    request.extensions_mut().insert(AuthUser {
        id: account.id,
        name: account.name,
        email: account.email,
        role: account.role,
        created_at: account.created_at,
    });

    Ok(next.run(request).await)
}
