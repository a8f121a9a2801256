use std::sync::Arc;
use axum::{middleware, routing::{get, post, put, delete}, Router};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn create_consultation_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(create_consultation))
        .route("/", get(list_consultations))
        .route("/{id}", get(get_consultation))
        .route("/{id}", put(update_consultation))
        .route("/{id}", delete(delete_consultation))
        .route("/{id}/status", post(update_consultation_status))
        .route("/{id}/prescription", post(attach_prescription))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
