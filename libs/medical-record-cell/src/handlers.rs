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
    CreateAnamnesisRequest, UpdateAnamnesisRequest,
    CreateNoteRequest, UpdateNoteRequest,
    CreateExamRequest, UpdateExamRequest, ExamQuery,
    CreatePrescriptionRequest, PrescriptionQuery,
};
use crate::services::{
    AnamnesisService, NoteService, ExamService, PrescriptionService, RecordService,
};

// ==============================================================================
// ANAMNESIS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_anamnesis(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAnamnesisRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = AnamnesisService::new(&config);

    let anamnesis = service.create_anamnesis(&user.id, request, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((StatusCode::CREATED, Json(json!(anamnesis))))
}

#[axum::debug_handler]
pub async fn get_anamnesis(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(anamnesis_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = AnamnesisService::new(&config);

    let anamnesis = service.get_anamnesis(&user.id, &anamnesis_id, auth.token())
        .await
        .map_err(|e| AppError::NotFound(e.to_string()))?;

    Ok(Json(json!(anamnesis)))
}

#[axum::debug_handler]
pub async fn list_patient_anamneses(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = AnamnesisService::new(&config);

    let anamneses = service.list_by_patient(&user.id, &patient_id, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "anamneses": anamneses,
        "total": anamneses.len()
    })))
}

#[axum::debug_handler]
pub async fn update_anamnesis(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(anamnesis_id): Path<String>,
    Json(request): Json<UpdateAnamnesisRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AnamnesisService::new(&config);

    let anamnesis = service.update_anamnesis(&user.id, &anamnesis_id, request, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!(anamnesis)))
}

#[axum::debug_handler]
pub async fn delete_anamnesis(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(anamnesis_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = AnamnesisService::new(&config);

    service.delete_anamnesis(&user.id, &anamnesis_id, auth.token())
        .await
        .map_err(|e| AppError::NotFound(e.to_string()))?;

    Ok(Json(json!({ "deleted": true })))
}

// ==============================================================================
// CLINICAL NOTES
// ==============================================================================

#[axum::debug_handler]
pub async fn create_note(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = NoteService::new(&config);

    let note = service.create_note(&user.id, request, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((StatusCode::CREATED, Json(json!(note))))
}

#[axum::debug_handler]
pub async fn list_patient_notes(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = NoteService::new(&config);

    let notes = service.list_by_patient(&user.id, &patient_id, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "notes": notes,
        "total": notes.len()
    })))
}

#[axum::debug_handler]
pub async fn update_note(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(note_id): Path<String>,
    Json(request): Json<UpdateNoteRequest>,
) -> Result<Json<Value>, AppError> {
    let service = NoteService::new(&config);

    let note = service.update_note(&user.id, &note_id, request, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!(note)))
}

#[axum::debug_handler]
pub async fn delete_note(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(note_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = NoteService::new(&config);

    service.delete_note(&user.id, &note_id, auth.token())
        .await
        .map_err(|e| AppError::NotFound(e.to_string()))?;

    Ok(Json(json!({ "deleted": true })))
}

// ==============================================================================
// EXAMS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_exam(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateExamRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = ExamService::new(&config);

    let exam = service.create_exam(&user.id, request, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((StatusCode::CREATED, Json(json!(exam))))
}

#[axum::debug_handler]
pub async fn get_exam(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(exam_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = ExamService::new(&config);

    let exam = service.get_exam(&user.id, &exam_id, auth.token())
        .await
        .map_err(|e| AppError::NotFound(e.to_string()))?;

    Ok(Json(json!(exam)))
}

#[axum::debug_handler]
pub async fn list_exams(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ExamQuery>,
) -> Result<Json<Value>, AppError> {
    let service = ExamService::new(&config);

    let patient_id = query.patient_id.map(|id| id.to_string());
    let consultation_id = query.consultation_id.map(|id| id.to_string());

    let exams = service.list_exams(
        &user.id,
        patient_id.as_deref(),
        consultation_id.as_deref(),
        auth.token(),
    )
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "exams": exams,
        "total": exams.len()
    })))
}

#[axum::debug_handler]
pub async fn update_exam(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(exam_id): Path<String>,
    Json(request): Json<UpdateExamRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ExamService::new(&config);

    let exam = service.update_exam(&user.id, &exam_id, request, auth.token())
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("Illegal status transition") {
                AppError::Conflict(msg)
            } else {
                AppError::Internal(msg)
            }
        })?;

    Ok(Json(json!(exam)))
}

#[axum::debug_handler]
pub async fn delete_exam(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(exam_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = ExamService::new(&config);

    service.delete_exam(&user.id, &exam_id, auth.token())
        .await
        .map_err(|e| AppError::NotFound(e.to_string()))?;

    Ok(Json(json!({ "deleted": true })))
}

// ==============================================================================
// PRESCRIPTIONS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_prescription(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePrescriptionRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = PrescriptionService::new(&config);

    let prescription = service.create_prescription(&user.id, request, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((StatusCode::CREATED, Json(json!(prescription))))
}

#[axum::debug_handler]
pub async fn get_prescription(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(prescription_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = PrescriptionService::new(&config);

    let prescription = service.get_prescription(&user.id, &prescription_id, auth.token())
        .await
        .map_err(|e| AppError::NotFound(e.to_string()))?;

    Ok(Json(json!(prescription)))
}

#[axum::debug_handler]
pub async fn list_prescriptions(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<PrescriptionQuery>,
) -> Result<Json<Value>, AppError> {
    let service = PrescriptionService::new(&config);

    let prescriptions = service.list_prescriptions(&user.id, query, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "prescriptions": prescriptions,
        "total": prescriptions.len()
    })))
}

#[axum::debug_handler]
pub async fn delete_prescription(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(prescription_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = PrescriptionService::new(&config);

    service.delete_prescription(&user.id, &prescription_id, auth.token())
        .await
        .map_err(|e| AppError::NotFound(e.to_string()))?;

    Ok(Json(json!({ "deleted": true })))
}

// ==============================================================================
// AGGREGATED RECORD
// ==============================================================================

#[axum::debug_handler]
pub async fn get_medical_record(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = RecordService::new(&config);

    let record = service.get_record(&user.id, &patient_id, auth.token())
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("not found") {
                AppError::NotFound(msg)
            } else {
                AppError::Internal(msg)
            }
        })?;

    Ok(Json(json!(record)))
}
