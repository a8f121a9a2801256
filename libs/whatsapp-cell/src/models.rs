use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Duration, Utc};
use std::fmt;

// ==============================================================================
// CONNECTIONS
// ==============================================================================

/// One gateway session per tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConnection {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_name: String,
    pub status: ConnectionStatus,
    pub qr_code: Option<String>,
    pub phone_number: Option<String>,
    pub connected_at: Option<DateTime<Utc>>,
    pub disconnected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    WaitingForQrScan,
    Connected,
    Disconnected,
}

impl ConnectionStatus {
    pub fn can_transition_to(&self, next: ConnectionStatus) -> bool {
        use ConnectionStatus::*;
        matches!(
            (self, next),
            (WaitingForQrScan, Connected)
                | (WaitingForQrScan, Disconnected)
                | (Connected, Disconnected)
        )
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::WaitingForQrScan => write!(f, "waiting_for_qr_scan"),
            ConnectionStatus::Connected => write!(f, "connected"),
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartConnectionRequest {
    pub session_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkConnectedRequest {
    pub phone_number: String,
}

// ==============================================================================
// MESSAGES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppMessage {
    pub id: Uuid,
    pub user_id: Uuid,
    pub connection_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub to_phone: String,
    pub body: String,
    pub status: MessageStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl MessageStatus {
    /// Delivery receipts only ever move a message forward.
    pub fn can_transition_to(&self, next: MessageStatus) -> bool {
        use MessageStatus::*;
        matches!(
            (self, next),
            (Pending, Sent)
                | (Pending, Failed)
                | (Sent, Delivered)
                | (Sent, Failed)
                | (Delivered, Read)
        )
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageStatus::Pending => write!(f, "pending"),
            MessageStatus::Sent => write!(f, "sent"),
            MessageStatus::Delivered => write!(f, "delivered"),
            MessageStatus::Read => write!(f, "read"),
            MessageStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub connection_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub to_phone: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageQuery {
    pub patient_id: Option<Uuid>,
    pub status: Option<MessageStatus>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReceiptRequest {
    pub status: MessageStatus,
}

// ==============================================================================
// REMINDERS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppReminder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub patient_id: Uuid,
    pub consultation_id: Uuid,
    pub message: String,
    pub consultation_date: DateTime<Utc>,
    pub hours_before: i64,
    pub scheduled_for: DateTime<Utc>,
    pub status: ReminderStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    Pending,
    Sent,
    Cancelled,
}

impl fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReminderStatus::Pending => write!(f, "pending"),
            ReminderStatus::Sent => write!(f, "sent"),
            ReminderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Fixed at creation time; rescheduling a consultation does not move it.
pub fn compute_scheduled_for(consultation_date: DateTime<Utc>, hours_before: i64) -> DateTime<Utc> {
    consultation_date - Duration::hours(hours_before)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReminderRequest {
    pub patient_id: Uuid,
    pub consultation_id: Uuid,
    pub message: Option<String>,
    pub consultation_date: DateTime<Utc>,
    pub hours_before: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderQuery {
    pub status: Option<ReminderStatus>,
    pub patient_id: Option<Uuid>,
}

// ==============================================================================
// GATEWAY WIRE TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct GatewaySessionRequest {
    pub session_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySessionResponse {
    pub qr_code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayMessageRequest {
    pub session_name: String,
    pub to: String,
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayMessageResponse {
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum WhatsAppError {
    #[error("WhatsApp gateway is not configured")]
    NotConfigured,

    #[error("Gateway error: {message}")]
    GatewayError { message: String },

    #[error("Record not found")]
    NotFound,

    #[error("Illegal status transition")]
    IllegalTransition,
}
