use anyhow::{Result, anyhow};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use chrono::Utc;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    WhatsAppReminder, ReminderStatus, ConnectionStatus,
    CreateReminderRequest, ReminderQuery, SendMessageRequest,
    compute_scheduled_for,
};
use crate::services::{ConnectionService, MessageService};

pub struct ReminderService {
    supabase: SupabaseClient,
}

impl ReminderService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// The send time is fixed here; rescheduling the consultation afterwards
    /// does not move an existing reminder.
    pub async fn create_reminder(
        &self,
        user_id: &str,
        request: CreateReminderRequest,
        auth_token: &str,
    ) -> Result<WhatsAppReminder> {
        if request.hours_before <= 0 {
            return Err(anyhow!("hours_before must be positive"));
        }

        let patient = self.fetch_patient(user_id, &request.patient_id.to_string(), auth_token).await?;

        let message = match request.message {
            Some(message) if !message.trim().is_empty() => message,
            _ => {
                let first_name = patient["full_name"]
                    .as_str()
                    .unwrap_or("")
                    .split_whitespace()
                    .next()
                    .unwrap_or("")
                    .to_string();
                format!(
                    "Hello {}, this is a reminder of your consultation on {}.",
                    first_name,
                    request.consultation_date.format("%d/%m/%Y at %H:%M")
                )
            }
        };

        let scheduled_for = compute_scheduled_for(request.consultation_date, request.hours_before);
        let reminder_id = Uuid::new_v4();
        let now = Utc::now();

        debug!(
            "Reminder {} scheduled for {} ({}h before consultation)",
            reminder_id, scheduled_for, request.hours_before
        );

        let row = json!({
            "id": reminder_id.to_string(),
            "user_id": user_id,
            "patient_id": request.patient_id.to_string(),
            "consultation_id": request.consultation_id.to_string(),
            "message": message,
            "consultation_date": request.consultation_date.to_rfc3339(),
            "hours_before": request.hours_before,
            "scheduled_for": scheduled_for.to_rfc3339(),
            "status": ReminderStatus::Pending.to_string(),
            "sent_at": null,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/whatsapp_reminders",
            Some(auth_token),
            Some(row),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create reminder"));
        }

        let reminder: WhatsAppReminder = serde_json::from_value(result[0].clone())?;
        Ok(reminder)
    }

    pub async fn list_reminders(
        &self,
        user_id: &str,
        query: ReminderQuery,
        auth_token: &str,
    ) -> Result<Vec<WhatsAppReminder>> {
        let mut query_parts = vec![format!("user_id=eq.{}", user_id)];

        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(patient_id) = query.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }

        let path = format!(
            "/rest/v1/whatsapp_reminders?{}&order=scheduled_for.asc",
            query_parts.join("&")
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let reminders: Vec<WhatsAppReminder> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(reminders)
    }

    /// Pending reminders whose send time has passed.
    pub async fn list_due(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> Result<Vec<WhatsAppReminder>> {
        let path = format!(
            "/rest/v1/whatsapp_reminders?user_id=eq.{}&status=eq.{}&scheduled_for=lte.{}&order=scheduled_for.asc",
            user_id,
            ReminderStatus::Pending,
            Utc::now().to_rfc3339(),
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let reminders: Vec<WhatsAppReminder> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(reminders)
    }

    /// Sends every due reminder through the tenant's active connection. A
    /// reminder whose send fails stays pending for the next run.
    pub async fn dispatch_due(
        &self,
        config: &AppConfig,
        user_id: &str,
        auth_token: &str,
    ) -> Result<Vec<WhatsAppReminder>> {
        let due = self.list_due(user_id, auth_token).await?;
        if due.is_empty() {
            return Ok(vec![]);
        }

        let connections = ConnectionService::new(config);
        let connection = connections
            .list_connections(user_id, auth_token)
            .await?
            .into_iter()
            .find(|c| c.status == ConnectionStatus::Connected)
            .ok_or_else(|| anyhow!("No active WhatsApp connection"))?;

        let messages = MessageService::new(config);
        let mut sent = Vec::new();

        for reminder in due {
            // A missing or since-deleted patient must not wedge the batch.
            let patient = match self
                .fetch_patient(user_id, &reminder.patient_id.to_string(), auth_token)
                .await
            {
                Ok(patient) => patient,
                Err(e) => {
                    warn!("Reminder {} skipped: {}", reminder.id, e);
                    continue;
                }
            };
            let to_phone = patient["phone"].as_str().unwrap_or_default().to_string();

            let send_result = messages.send_message(
                config,
                user_id,
                SendMessageRequest {
                    connection_id: connection.id,
                    patient_id: Some(reminder.patient_id),
                    to_phone,
                    body: reminder.message.clone(),
                },
                auth_token,
            ).await;

            match send_result {
                Ok(_) => {
                    let reminder = self
                        .set_reminder_state(user_id, &reminder.id.to_string(), ReminderStatus::Sent, auth_token)
                        .await?;
                    sent.push(reminder);
                }
                Err(e) => {
                    warn!("Reminder {} not sent: {}", reminder.id, e);
                }
            }
        }

        info!("Dispatched {} reminders for practice {}", sent.len(), user_id);
        Ok(sent)
    }

    pub async fn cancel_reminder(
        &self,
        user_id: &str,
        reminder_id: &str,
        auth_token: &str,
    ) -> Result<WhatsAppReminder> {
        let reminder = self.get_reminder(user_id, reminder_id, auth_token).await?;

        if reminder.status != ReminderStatus::Pending {
            return Err(anyhow!("Only pending reminders can be cancelled"));
        }

        self.set_reminder_state(user_id, reminder_id, ReminderStatus::Cancelled, auth_token).await
    }

    pub async fn get_reminder(
        &self,
        user_id: &str,
        reminder_id: &str,
        auth_token: &str,
    ) -> Result<WhatsAppReminder> {
        let path = format!(
            "/rest/v1/whatsapp_reminders?id=eq.{}&user_id=eq.{}",
            reminder_id, user_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Reminder not found"));
        }

        let reminder: WhatsAppReminder = serde_json::from_value(result[0].clone())?;
        Ok(reminder)
    }

    async fn fetch_patient(
        &self,
        user_id: &str,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<Value> {
        let path = format!(
            "/rest/v1/patients?id=eq.{}&user_id=eq.{}&deleted_at=is.null",
            patient_id, user_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Patient not found"));
        }

        Ok(result[0].clone())
    }

    async fn set_reminder_state(
        &self,
        user_id: &str,
        reminder_id: &str,
        status: ReminderStatus,
        auth_token: &str,
    ) -> Result<WhatsAppReminder> {
        let now = Utc::now();
        let mut update = json!({
            "status": status.to_string(),
            "updated_at": now.to_rfc3339()
        });
        if status == ReminderStatus::Sent {
            update["sent_at"] = json!(now.to_rfc3339());
        }

        let path = format!(
            "/rest/v1/whatsapp_reminders?id=eq.{}&user_id=eq.{}",
            reminder_id, user_id
        );

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Reminder not found"));
        }

        let reminder: WhatsAppReminder = serde_json::from_value(result[0].clone())?;
        Ok(reminder)
    }
}
