use std::sync::Arc;
use axum::{middleware, routing::{get, post, delete}, Router};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn create_billing_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/transactions", post(create_transaction).get(list_transactions))
        .route("/transactions/summary", get(monthly_summary))
        .route("/transactions/{id}", get(get_transaction).delete(delete_transaction))
        .route("/transactions/{id}/status", post(update_transaction_status))
        .route("/recurring", post(create_recurring).get(list_recurring))
        .route("/recurring/materialize", post(materialize_recurring))
        .route("/recurring/{id}", delete(delete_recurring))
        .route("/recurring/{id}/active", post(set_recurring_active))
        .route("/bills", post(create_bill).get(list_bills))
        .route("/bills/refresh-overdue", post(refresh_overdue_bills))
        .route("/bills/{id}", get(get_bill).delete(delete_bill))
        .route("/bills/{id}/pay", post(pay_bill))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
