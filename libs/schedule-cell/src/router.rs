use std::sync::Arc;
use axum::{middleware, routing::{get, post, delete}, Router};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn create_schedule_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/slots", get(list_slots))
        .route("/slots/generate", post(generate_slots))
        .route("/slots/{id}", delete(delete_slot))
        .route("/slots/{id}/book", post(book_slot))
        .route("/slots/{id}/release", post(release_slot))
        .route("/slots/{id}/block", post(block_slot))
        .route("/slots/{id}/unblock", post(unblock_slot))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
