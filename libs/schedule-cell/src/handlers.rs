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

use crate::models::{GenerateSlotsRequest, BookSlotRequest, SlotQuery};
use crate::services::ScheduleService;

#[axum::debug_handler]
pub async fn generate_slots(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<GenerateSlotsRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = ScheduleService::new(&config);

    let slots = service.generate_slots(&user.id, request, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((StatusCode::CREATED, Json(json!({
        "slots": slots,
        "created": slots.len()
    }))))
}

#[axum::debug_handler]
pub async fn list_slots(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(&config);

    let slots = service.list_slots(&user.id, query, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "slots": slots,
        "total": slots.len()
    })))
}

#[axum::debug_handler]
pub async fn book_slot(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(slot_id): Path<String>,
    Json(request): Json<BookSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(&config);

    let slot = service.book_slot(&user.id, &slot_id, request.consultation_id, auth.token())
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("not available") {
                AppError::Conflict(msg)
            } else if msg.contains("not found") {
                AppError::NotFound(msg)
            } else {
                AppError::Internal(msg)
            }
        })?;

    Ok(Json(json!(slot)))
}

#[axum::debug_handler]
pub async fn release_slot(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(slot_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(&config);

    let slot = service.release_slot(&user.id, &slot_id, auth.token())
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("not booked") {
                AppError::Conflict(msg)
            } else {
                AppError::Internal(msg)
            }
        })?;

    Ok(Json(json!(slot)))
}

#[axum::debug_handler]
pub async fn block_slot(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(slot_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(&config);

    let slot = service.block_slot(&user.id, &slot_id, auth.token())
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("can be blocked") {
                AppError::Conflict(msg)
            } else {
                AppError::Internal(msg)
            }
        })?;

    Ok(Json(json!(slot)))
}

#[axum::debug_handler]
pub async fn unblock_slot(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(slot_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(&config);

    let slot = service.unblock_slot(&user.id, &slot_id, auth.token())
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("not blocked") {
                AppError::Conflict(msg)
            } else {
                AppError::Internal(msg)
            }
        })?;

    Ok(Json(json!(slot)))
}

#[axum::debug_handler]
pub async fn delete_slot(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(slot_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(&config);

    service.delete_slot(&user.id, &slot_id, auth.token())
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("booked slot") {
                AppError::Conflict(msg)
            } else {
                AppError::NotFound(msg)
            }
        })?;

    Ok(Json(json!({ "deleted": true })))
}
