use anyhow::{Result, anyhow};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use chrono::Utc;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{ClinicalNote, CreateNoteRequest, UpdateNoteRequest};

pub struct NoteService {
    supabase: SupabaseClient,
}

impl NoteService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_note(
        &self,
        user_id: &str,
        request: CreateNoteRequest,
        auth_token: &str,
    ) -> Result<ClinicalNote> {
        if request.title.trim().is_empty() {
            return Err(anyhow!("title is required"));
        }

        let note_data = json!({
            "id": Uuid::new_v4().to_string(),
            "user_id": user_id,
            "patient_id": request.patient_id,
            "title": request.title,
            "content": request.content,
            "pinned": request.pinned.unwrap_or(false),
            "deleted_at": null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/clinical_notes",
            Some(auth_token),
            Some(note_data),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create note"));
        }

        let note: ClinicalNote = serde_json::from_value(result[0].clone())?;
        debug!("Clinical note created with ID: {}", note.id);

        Ok(note)
    }

    pub async fn list_by_patient(
        &self,
        user_id: &str,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<Vec<ClinicalNote>> {
        // Pinned notes surface first
        let path = format!(
            "/rest/v1/clinical_notes?patient_id=eq.{}&user_id=eq.{}&deleted_at=is.null&order=pinned.desc,created_at.desc",
            patient_id, user_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let notes: Vec<ClinicalNote> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(notes)
    }

    pub async fn update_note(
        &self,
        user_id: &str,
        note_id: &str,
        request: UpdateNoteRequest,
        auth_token: &str,
    ) -> Result<ClinicalNote> {
        let mut update_data = serde_json::Map::new();

        if let Some(title) = request.title {
            if title.trim().is_empty() {
                return Err(anyhow!("title cannot be empty"));
            }
            update_data.insert("title".to_string(), json!(title));
        }
        if let Some(content) = request.content {
            update_data.insert("content".to_string(), json!(content));
        }
        if let Some(pinned) = request.pinned {
            update_data.insert("pinned".to_string(), json!(pinned));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!(
            "/rest/v1/clinical_notes?id=eq.{}&user_id=eq.{}&deleted_at=is.null",
            note_id, user_id
        );

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Note not found"));
        }

        let updated: ClinicalNote = serde_json::from_value(result[0].clone())?;
        Ok(updated)
    }

    pub async fn delete_note(
        &self,
        user_id: &str,
        note_id: &str,
        auth_token: &str,
    ) -> Result<()> {
        let path = format!(
            "/rest/v1/clinical_notes?id=eq.{}&user_id=eq.{}&deleted_at=is.null",
            note_id, user_id
        );
        let update = json!({
            "deleted_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Note not found"));
        }

        Ok(())
    }
}
