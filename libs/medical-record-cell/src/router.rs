use std::sync::Arc;
use axum::{middleware, routing::{get, post, put, delete}, Router};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn create_medical_record_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/anamneses", post(create_anamnesis))
        .route("/anamneses/{id}", get(get_anamnesis))
        .route("/anamneses/{id}", put(update_anamnesis))
        .route("/anamneses/{id}", delete(delete_anamnesis))
        .route("/patients/{patient_id}/anamneses", get(list_patient_anamneses))
        .route("/notes", post(create_note))
        .route("/notes/{id}", put(update_note))
        .route("/notes/{id}", delete(delete_note))
        .route("/patients/{patient_id}/notes", get(list_patient_notes))
        .route("/exams", post(create_exam))
        .route("/exams", get(list_exams))
        .route("/exams/{id}", get(get_exam))
        .route("/exams/{id}", put(update_exam))
        .route("/exams/{id}", delete(delete_exam))
        .route("/prescriptions", post(create_prescription))
        .route("/prescriptions", get(list_prescriptions))
        .route("/prescriptions/{id}", get(get_prescription))
        .route("/prescriptions/{id}", delete(delete_prescription))
        .route("/patients/{patient_id}/record", get(get_medical_record))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
