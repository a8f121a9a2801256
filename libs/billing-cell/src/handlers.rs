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
    CreateTransactionRequest, TransactionQuery, UpdateTransactionStatusRequest,
    SummaryQuery, CreateRecurringRequest, SetActiveRequest,
    CreateBillRequest, BillQuery,
};
use crate::services::{TransactionService, RecurringService, BillService};

fn map_service_error(e: anyhow::Error) -> AppError {
    let msg = e.to_string();
    if msg.contains("not found") {
        AppError::NotFound(msg)
    } else if msg.contains("Illegal status transition") || msg.contains("already paid") {
        AppError::Conflict(msg)
    } else if msg.contains("is required") || msg.contains("must be positive") || msg.contains("Invalid") {
        AppError::ValidationError(msg)
    } else {
        AppError::Internal(msg)
    }
}

// ==============================================================================
// TRANSACTIONS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_transaction(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = TransactionService::new(&config);

    let transaction = service.create_transaction(&user.id, request, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok((StatusCode::CREATED, Json(json!(transaction))))
}

#[axum::debug_handler]
pub async fn list_transactions(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Value>, AppError> {
    let service = TransactionService::new(&config);

    let transactions = service.list_transactions(&user.id, query, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "transactions": transactions,
        "total": transactions.len()
    })))
}

#[axum::debug_handler]
pub async fn get_transaction(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(transaction_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = TransactionService::new(&config);

    let transaction = service.get_transaction(&user.id, &transaction_id, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!(transaction)))
}

#[axum::debug_handler]
pub async fn update_transaction_status(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(transaction_id): Path<String>,
    Json(request): Json<UpdateTransactionStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let service = TransactionService::new(&config);

    let transaction = service.update_status(&user.id, &transaction_id, request.status, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!(transaction)))
}

#[axum::debug_handler]
pub async fn delete_transaction(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(transaction_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = TransactionService::new(&config);

    service.delete_transaction(&user.id, &transaction_id, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!({ "deleted": true })))
}

#[axum::debug_handler]
pub async fn monthly_summary(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<Value>, AppError> {
    let service = TransactionService::new(&config);

    let summary = service.monthly_summary(&user.id, query.year, query.month, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!(summary)))
}

// ==============================================================================
// RECURRING TRANSACTIONS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_recurring(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateRecurringRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = RecurringService::new(&config);

    let recurring = service.create_recurring(&user.id, request, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok((StatusCode::CREATED, Json(json!(recurring))))
}

#[axum::debug_handler]
pub async fn list_recurring(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = RecurringService::new(&config);

    let entries = service.list_recurring(&user.id, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "recurring": entries,
        "total": entries.len()
    })))
}

#[axum::debug_handler]
pub async fn set_recurring_active(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(recurring_id): Path<String>,
    Json(request): Json<SetActiveRequest>,
) -> Result<Json<Value>, AppError> {
    let service = RecurringService::new(&config);

    let recurring = service.set_active(&user.id, &recurring_id, request.active, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!(recurring)))
}

#[axum::debug_handler]
pub async fn delete_recurring(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(recurring_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = RecurringService::new(&config);

    service.delete_recurring(&user.id, &recurring_id, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!({ "deleted": true })))
}

#[axum::debug_handler]
pub async fn materialize_recurring(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = RecurringService::new(&config);

    let created = service.materialize_due(&user.id, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok((StatusCode::CREATED, Json(json!({
        "transactions": created,
        "created": created.len()
    }))))
}

// ==============================================================================
// BILLS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_bill(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateBillRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = BillService::new(&config);

    let bill = service.create_bill(&user.id, request, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok((StatusCode::CREATED, Json(json!(bill))))
}

#[axum::debug_handler]
pub async fn list_bills(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<BillQuery>,
) -> Result<Json<Value>, AppError> {
    let service = BillService::new(&config);

    let bills = service.list_bills(&user.id, query, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "bills": bills,
        "total": bills.len()
    })))
}

#[axum::debug_handler]
pub async fn get_bill(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(bill_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = BillService::new(&config);

    let bill = service.get_bill(&user.id, &bill_id, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!(bill)))
}

#[axum::debug_handler]
pub async fn pay_bill(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(bill_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = BillService::new(&config);

    let bill = service.mark_as_paid(&user.id, &bill_id, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!(bill)))
}

#[axum::debug_handler]
pub async fn refresh_overdue_bills(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = BillService::new(&config);

    let bills = service.refresh_overdue(&user.id, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "bills": bills,
        "flagged": bills.len()
    })))
}

#[axum::debug_handler]
pub async fn delete_bill(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(bill_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = BillService::new(&config);

    service.delete_bill(&user.id, &bill_id, auth.token())
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!({ "deleted": true })))
}
