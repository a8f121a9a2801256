use anyhow::{Result, anyhow};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use chrono::Utc;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{WhatsAppConnection, ConnectionStatus, StartConnectionRequest};
use crate::services::WhatsAppGatewayClient;

pub struct ConnectionService {
    supabase: SupabaseClient,
}

impl ConnectionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Starts a gateway session and records it waiting for its QR scan.
    pub async fn start_connection(
        &self,
        config: &AppConfig,
        user_id: &str,
        request: StartConnectionRequest,
        auth_token: &str,
    ) -> Result<WhatsAppConnection> {
        let session_name = request.session_name.unwrap_or_else(|| format!("practice-{}", user_id));

        let gateway = WhatsAppGatewayClient::new(config)
            .map_err(|e| anyhow!(e.to_string()))?;
        let session = gateway.start_session(&session_name).await
            .map_err(|e| anyhow!(e.to_string()))?;

        let connection_id = Uuid::new_v4();
        let now = Utc::now();

        debug!("Recording connection {} for practice {}", connection_id, user_id);

        let row = json!({
            "id": connection_id.to_string(),
            "user_id": user_id,
            "session_name": session_name,
            "status": ConnectionStatus::WaitingForQrScan.to_string(),
            "qr_code": session.qr_code,
            "phone_number": null,
            "connected_at": null,
            "disconnected_at": null,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/whatsapp_connections",
            Some(auth_token),
            Some(row),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to record connection"));
        }

        let connection: WhatsAppConnection = serde_json::from_value(result[0].clone())?;
        Ok(connection)
    }

    pub async fn get_connection(
        &self,
        user_id: &str,
        connection_id: &str,
        auth_token: &str,
    ) -> Result<WhatsAppConnection> {
        let path = format!(
            "/rest/v1/whatsapp_connections?id=eq.{}&user_id=eq.{}",
            connection_id, user_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Connection not found"));
        }

        let connection: WhatsAppConnection = serde_json::from_value(result[0].clone())?;
        Ok(connection)
    }

    pub async fn list_connections(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> Result<Vec<WhatsAppConnection>> {
        let path = format!(
            "/rest/v1/whatsapp_connections?user_id=eq.{}&order=created_at.desc",
            user_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let connections: Vec<WhatsAppConnection> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(connections)
    }

    /// Gateway webhook path: the QR code was scanned and the session paired.
    pub async fn mark_connected(
        &self,
        user_id: &str,
        connection_id: &str,
        phone_number: &str,
        auth_token: &str,
    ) -> Result<WhatsAppConnection> {
        let connection = self.get_connection(user_id, connection_id, auth_token).await?;

        if !connection.status.can_transition_to(ConnectionStatus::Connected) {
            return Err(anyhow!(
                "Illegal status transition: {} -> connected",
                connection.status
            ));
        }

        let now = Utc::now();
        let path = format!(
            "/rest/v1/whatsapp_connections?id=eq.{}&user_id=eq.{}",
            connection_id, user_id
        );
        let update = json!({
            "status": ConnectionStatus::Connected.to_string(),
            "phone_number": phone_number,
            "qr_code": null,
            "connected_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Connection not found"));
        }

        let connection: WhatsAppConnection = serde_json::from_value(result[0].clone())?;
        Ok(connection)
    }

    /// Tears down the gateway session, then marks the row disconnected.
    pub async fn disconnect(
        &self,
        config: &AppConfig,
        user_id: &str,
        connection_id: &str,
        auth_token: &str,
    ) -> Result<WhatsAppConnection> {
        let connection = self.get_connection(user_id, connection_id, auth_token).await?;

        if !connection.status.can_transition_to(ConnectionStatus::Disconnected) {
            return Err(anyhow!(
                "Illegal status transition: {} -> disconnected",
                connection.status
            ));
        }

        let gateway = WhatsAppGatewayClient::new(config)
            .map_err(|e| anyhow!(e.to_string()))?;
        gateway.delete_session(&connection.session_name).await
            .map_err(|e| anyhow!(e.to_string()))?;

        let now = Utc::now();
        let path = format!(
            "/rest/v1/whatsapp_connections?id=eq.{}&user_id=eq.{}",
            connection_id, user_id
        );
        let update = json!({
            "status": ConnectionStatus::Disconnected.to_string(),
            "disconnected_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Connection not found"));
        }

        let connection: WhatsAppConnection = serde_json::from_value(result[0].clone())?;
        Ok(connection)
    }
}
