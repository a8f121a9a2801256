use reqwest::Client;
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::models::{
    GatewaySessionRequest, GatewaySessionResponse,
    GatewayMessageRequest, GatewayMessageResponse, WhatsAppError,
};

/// HTTP client for the external WhatsApp gateway (a Baileys-style bridge).
/// The gateway owns the actual WhatsApp protocol; this side only drives
/// sessions and hands off outbound messages.
pub struct WhatsAppGatewayClient {
    client: Client,
    base_url: String,
    api_token: String,
}

impl WhatsAppGatewayClient {
    pub fn new(config: &AppConfig) -> Result<Self, WhatsAppError> {
        if !config.is_whatsapp_configured() {
            return Err(WhatsAppError::NotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            base_url: config.whatsapp_gateway_url.clone(),
            api_token: config.whatsapp_gateway_token.clone(),
        })
    }

    /// POST /sessions — starts a session and returns the pairing QR code.
    pub async fn start_session(
        &self,
        session_name: &str,
    ) -> Result<GatewaySessionResponse, WhatsAppError> {
        info!("Starting WhatsApp gateway session: {}", session_name);

        let url = format!("{}/sessions", self.base_url);
        let request_body = GatewaySessionRequest {
            session_name: session_name.to_string(),
        };

        debug!("Sending session request to: {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| WhatsAppError::GatewayError { message: e.to_string() })?;

        let status = response.status();
        let response_text = response.text().await
            .map_err(|e| WhatsAppError::GatewayError { message: e.to_string() })?;

        if !status.is_success() {
            error!("Gateway session start failed: {} - {}", status, response_text);
            return Err(WhatsAppError::GatewayError {
                message: format!("HTTP {}: {}", status, response_text),
            });
        }

        let session: GatewaySessionResponse = serde_json::from_str(&response_text)
            .map_err(|e| WhatsAppError::GatewayError {
                message: format!("Failed to parse session response: {}", e),
            })?;

        Ok(session)
    }

    /// DELETE /sessions/{name} — tears the session down on the gateway side.
    pub async fn delete_session(&self, session_name: &str) -> Result<(), WhatsAppError> {
        info!("Deleting WhatsApp gateway session: {}", session_name);

        let url = format!("{}/sessions/{}", self.base_url, session_name);

        let response = self
            .client
            .delete(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .send()
            .await
            .map_err(|e| WhatsAppError::GatewayError { message: e.to_string() })?;

        let status = response.status();

        if !status.is_success() {
            let response_text = response.text().await.unwrap_or_default();
            error!("Gateway session delete failed: {} - {}", status, response_text);
            return Err(WhatsAppError::GatewayError {
                message: format!("HTTP {}: {}", status, response_text),
            });
        }

        Ok(())
    }

    /// POST /messages — hands one outbound message to the gateway.
    pub async fn send_message(
        &self,
        session_name: &str,
        to_phone: &str,
        body: &str,
    ) -> Result<GatewayMessageResponse, WhatsAppError> {
        debug!("Sending WhatsApp message via session {}", session_name);

        let url = format!("{}/messages", self.base_url);
        let request_body = GatewayMessageRequest {
            session_name: session_name.to_string(),
            to: to_phone.to_string(),
            body: body.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| WhatsAppError::GatewayError { message: e.to_string() })?;

        let status = response.status();
        let response_text = response.text().await
            .map_err(|e| WhatsAppError::GatewayError { message: e.to_string() })?;

        if !status.is_success() {
            error!("Gateway message send failed: {} - {}", status, response_text);
            return Err(WhatsAppError::GatewayError {
                message: format!("HTTP {}: {}", status, response_text),
            });
        }

        let message: GatewayMessageResponse = serde_json::from_str(&response_text)
            .map_err(|e| WhatsAppError::GatewayError {
                message: format!("Failed to parse message response: {}", e),
            })?;

        Ok(message)
    }
}
