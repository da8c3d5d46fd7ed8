use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn medical_record_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::create_record))
        .route("/", get(handlers::get_records))
        .route("/{record_id}", get(handlers::get_record))
        .route("/{record_id}", put(handlers::update_record))
        .route("/{record_id}", delete(handlers::delete_record))
        .route(
            "/patient/{patient_id}/history",
            get(handlers::get_patient_history),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
