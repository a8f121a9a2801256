use std::sync::Arc;
use axum::{middleware, routing::{get, post}, Router};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn create_whatsapp_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/connections", post(start_connection).get(list_connections))
        .route("/connections/{id}", get(get_connection))
        .route("/connections/{id}/connected", post(mark_connected))
        .route("/connections/{id}/disconnect", post(disconnect))
        .route("/messages", post(send_message).get(list_messages))
        .route("/messages/{id}/receipt", post(apply_message_receipt))
        .route("/reminders", post(create_reminder).get(list_reminders))
        .route("/reminders/due", get(list_due_reminders))
        .route("/reminders/dispatch", post(dispatch_due_reminders))
        .route("/reminders/{id}/cancel", post(cancel_reminder))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
