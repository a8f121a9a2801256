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
    StartConnectionRequest, MarkConnectedRequest,
    SendMessageRequest, MessageQuery, MessageReceiptRequest,
    CreateReminderRequest, ReminderQuery,
};
use crate::services::{ConnectionService, MessageService, ReminderService};

fn map_service_error(e: anyhow::Error) -> AppError {
    let msg = e.to_string();
    if msg.contains("not found") {
        AppError::NotFound(msg)
    } else if msg.contains("Illegal status transition")
        || msg.contains("not active")
        || msg.contains("can be cancelled")
    {
        AppError::Conflict(msg)
    } else if msg.contains("is required") || msg.contains("must be positive") {
        AppError::ValidationError(msg)
    } else if msg.contains("Gateway error") || msg.contains("gateway is not configured") {
        AppError::ExternalService(msg)
    } else {
        AppError::Internal(msg)
    }
}

// ==============================================================================
// CONNECTIONS
// ==============================================================================

#[axum::debug_handler]
pub async fn start_connection(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<StartConnectionRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = ConnectionService::new(&config);

    let connection = service.start_connection(&config, &user.id, request, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok((StatusCode::CREATED, Json(json!(connection))))
}

#[axum::debug_handler]
pub async fn list_connections(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = ConnectionService::new(&config);

    let connections = service.list_connections(&user.id, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "connections": connections,
        "total": connections.len()
    })))
}

#[axum::debug_handler]
pub async fn get_connection(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(connection_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = ConnectionService::new(&config);

    let connection = service.get_connection(&user.id, &connection_id, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!(connection)))
}

#[axum::debug_handler]
pub async fn mark_connected(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(connection_id): Path<String>,
    Json(request): Json<MarkConnectedRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ConnectionService::new(&config);

    let connection = service.mark_connected(&user.id, &connection_id, &request.phone_number, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!(connection)))
}

#[axum::debug_handler]
pub async fn disconnect(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(connection_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = ConnectionService::new(&config);

    let connection = service.disconnect(&config, &user.id, &connection_id, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!(connection)))
}

// ==============================================================================
// MESSAGES
// ==============================================================================

#[axum::debug_handler]
pub async fn send_message(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = MessageService::new(&config);

    let message = service.send_message(&config, &user.id, request, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok((StatusCode::CREATED, Json(json!(message))))
}

#[axum::debug_handler]
pub async fn list_messages(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<MessageQuery>,
) -> Result<Json<Value>, AppError> {
    let service = MessageService::new(&config);

    let messages = service.list_messages(&user.id, query, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "messages": messages,
        "total": messages.len()
    })))
}

#[axum::debug_handler]
pub async fn apply_message_receipt(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(message_id): Path<String>,
    Json(request): Json<MessageReceiptRequest>,
) -> Result<Json<Value>, AppError> {
    let service = MessageService::new(&config);

    let message = service.apply_receipt(&user.id, &message_id, request.status, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!(message)))
}

// ==============================================================================
// REMINDERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_reminder(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateReminderRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = ReminderService::new(&config);

    let reminder = service.create_reminder(&user.id, request, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok((StatusCode::CREATED, Json(json!(reminder))))
}

#[axum::debug_handler]
pub async fn list_reminders(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ReminderQuery>,
) -> Result<Json<Value>, AppError> {
    let service = ReminderService::new(&config);

    let reminders = service.list_reminders(&user.id, query, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "reminders": reminders,
        "total": reminders.len()
    })))
}

#[axum::debug_handler]
pub async fn list_due_reminders(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = ReminderService::new(&config);

    let reminders = service.list_due(&user.id, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "reminders": reminders,
        "total": reminders.len()
    })))
}

#[axum::debug_handler]
pub async fn dispatch_due_reminders(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = ReminderService::new(&config);

    let sent = service.dispatch_due(&config, &user.id, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "reminders": sent,
        "sent": sent.len()
    })))
}

#[axum::debug_handler]
pub async fn cancel_reminder(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(reminder_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = ReminderService::new(&config);

    let reminder = service.cancel_reminder(&user.id, &reminder_id, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!(reminder)))
}
