use std::sync::Arc;
use axum::{
    extract::{Path, Query, State, Extension},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    CreateConsultationRequest, UpdateConsultationRequest, UpdateStatusRequest,
    AttachPrescriptionRequest, ConsultationQuery,
};
use crate::services::ConsultationService;

#[axum::debug_handler]
pub async fn create_consultation(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateConsultationRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = ConsultationService::new(&config);

    let consultation = service.create_consultation(&user.id, request, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((StatusCode::CREATED, Json(json!(consultation))))
}

#[axum::debug_handler]
pub async fn get_consultation(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(consultation_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = ConsultationService::new(&config);

    let consultation = service.get_consultation(&user.id, &consultation_id, auth.token())
        .await
        .map_err(|e| AppError::NotFound(e.to_string()))?;

    Ok(Json(json!(consultation)))
}

#[axum::debug_handler]
pub async fn list_consultations(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ConsultationQuery>,
) -> Result<Json<Value>, AppError> {
    let service = ConsultationService::new(&config);

    let consultations = service.list_consultations(&user.id, query, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "consultations": consultations,
        "total": consultations.len()
    })))
}

#[axum::debug_handler]
pub async fn update_consultation(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(consultation_id): Path<String>,
    Json(request): Json<UpdateConsultationRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ConsultationService::new(&config);

    let consultation = service
        .update_consultation(&user.id, &consultation_id, request, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!(consultation)))
}

#[axum::debug_handler]
pub async fn update_consultation_status(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(consultation_id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ConsultationService::new(&config);

    let consultation = service
        .update_status(&user.id, &consultation_id, request.status, auth.token())
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("Illegal status transition") {
                AppError::Conflict(msg)
            } else {
                AppError::Internal(msg)
            }
        })?;

    Ok(Json(json!(consultation)))
}

#[axum::debug_handler]
pub async fn attach_prescription(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(consultation_id): Path<String>,
    Json(request): Json<AttachPrescriptionRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ConsultationService::new(&config);

    let consultation = service
        .attach_prescription(&user.id, &consultation_id, request.prescription_id, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!(consultation)))
}

#[axum::debug_handler]
pub async fn delete_consultation(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(consultation_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = ConsultationService::new(&config);

    service.delete_consultation(&user.id, &consultation_id, auth.token())
        .await
        .map_err(|e| AppError::NotFound(e.to_string()))?;

    Ok(Json(json!({ "deleted": true })))
}
