use anyhow::{Result, anyhow};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use chrono::Utc;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    WhatsAppMessage, MessageStatus, ConnectionStatus,
    SendMessageRequest, MessageQuery,
};
use crate::services::{WhatsAppGatewayClient, ConnectionService};

pub struct MessageService {
    supabase: SupabaseClient,
}

impl MessageService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Logs the message as pending, hands it to the gateway, then records
    /// the outcome. A gateway failure leaves a failed row behind.
    pub async fn send_message(
        &self,
        config: &AppConfig,
        user_id: &str,
        request: SendMessageRequest,
        auth_token: &str,
    ) -> Result<WhatsAppMessage> {
        if request.to_phone.trim().is_empty() {
            return Err(anyhow!("Recipient phone is required"));
        }
        if request.body.trim().is_empty() {
            return Err(anyhow!("Message body is required"));
        }

        let connections = ConnectionService::new(config);
        let connection = connections
            .get_connection(user_id, &request.connection_id.to_string(), auth_token)
            .await?;

        if connection.status != ConnectionStatus::Connected {
            return Err(anyhow!("Connection is not active"));
        }

        let message_id = Uuid::new_v4();
        let now = Utc::now();

        let row = json!({
            "id": message_id.to_string(),
            "user_id": user_id,
            "connection_id": request.connection_id.to_string(),
            "patient_id": request.patient_id.map(|id| id.to_string()),
            "to_phone": request.to_phone,
            "body": request.body,
            "status": MessageStatus::Pending.to_string(),
            "sent_at": null,
            "delivered_at": null,
            "read_at": null,
            "error_message": null,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/whatsapp_messages",
            Some(auth_token),
            Some(row),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to log message"));
        }
        let message: WhatsAppMessage = serde_json::from_value(result[0].clone())?;

        let gateway = WhatsAppGatewayClient::new(config)
            .map_err(|e| anyhow!(e.to_string()))?;

        match gateway.send_message(&connection.session_name, &message.to_phone, &message.body).await {
            Ok(_) => {
                debug!("Message {} handed to gateway", message_id);
                self.set_message_state(
                    user_id,
                    &message_id.to_string(),
                    MessageStatus::Sent,
                    None,
                    auth_token,
                ).await
            }
            Err(e) => {
                warn!("Gateway rejected message {}: {}", message_id, e);
                self.set_message_state(
                    user_id,
                    &message_id.to_string(),
                    MessageStatus::Failed,
                    Some(e.to_string()),
                    auth_token,
                ).await?;
                Err(anyhow!("Gateway error: {}", e))
            }
        }
    }

    pub async fn list_messages(
        &self,
        user_id: &str,
        query: MessageQuery,
        auth_token: &str,
    ) -> Result<Vec<WhatsAppMessage>> {
        let mut query_parts = vec![format!("user_id=eq.{}", user_id)];

        if let Some(patient_id) = query.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }

        let limit = query.limit.unwrap_or(50).clamp(1, 200);
        let offset = query.offset.unwrap_or(0).max(0);

        let path = format!(
            "/rest/v1/whatsapp_messages?{}&order=created_at.desc&limit={}&offset={}",
            query_parts.join("&"), limit, offset
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let messages: Vec<WhatsAppMessage> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(messages)
    }

    pub async fn get_message(
        &self,
        user_id: &str,
        message_id: &str,
        auth_token: &str,
    ) -> Result<WhatsAppMessage> {
        let path = format!(
            "/rest/v1/whatsapp_messages?id=eq.{}&user_id=eq.{}",
            message_id, user_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Message not found"));
        }

        let message: WhatsAppMessage = serde_json::from_value(result[0].clone())?;
        Ok(message)
    }

    /// Gateway webhook path: delivery and read receipts.
    pub async fn apply_receipt(
        &self,
        user_id: &str,
        message_id: &str,
        next: MessageStatus,
        auth_token: &str,
    ) -> Result<WhatsAppMessage> {
        let message = self.get_message(user_id, message_id, auth_token).await?;

        if !message.status.can_transition_to(next) {
            return Err(anyhow!(
                "Illegal status transition: {} -> {}",
                message.status, next
            ));
        }

        self.set_message_state(user_id, message_id, next, None, auth_token).await
    }

    async fn set_message_state(
        &self,
        user_id: &str,
        message_id: &str,
        status: MessageStatus,
        error_message: Option<String>,
        auth_token: &str,
    ) -> Result<WhatsAppMessage> {
        let now = Utc::now();
        let mut update = json!({
            "status": status.to_string(),
            "updated_at": now.to_rfc3339()
        });

        match status {
            MessageStatus::Sent => update["sent_at"] = json!(now.to_rfc3339()),
            MessageStatus::Delivered => update["delivered_at"] = json!(now.to_rfc3339()),
            MessageStatus::Read => update["read_at"] = json!(now.to_rfc3339()),
            MessageStatus::Failed => update["error_message"] = json!(error_message),
            MessageStatus::Pending => {}
        }

        let path = format!(
            "/rest/v1/whatsapp_messages?id=eq.{}&user_id=eq.{}",
            message_id, user_id
        );

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Message not found"));
        }

        let message: WhatsAppMessage = serde_json::from_value(result[0].clone())?;
        Ok(message)
    }
}
