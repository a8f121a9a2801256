use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use patient_cell::router::create_patient_router;
use consultation_cell::router::create_consultation_router;
use medical_record_cell::router::create_medical_record_router;
use schedule_cell::router::create_schedule_router;
use billing_cell::router::create_billing_router;
use whatsapp_cell::router::create_whatsapp_router;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Practice API is running!" }))
        .nest("/patients", create_patient_router(state.clone()))
        .nest("/consultations", create_consultation_router(state.clone()))
        .nest("/records", create_medical_record_router(state.clone()))
        .nest("/schedule", create_schedule_router(state.clone()))
        .nest("/billing", create_billing_router(state.clone()))
        .nest("/whatsapp", create_whatsapp_router(state))
}
