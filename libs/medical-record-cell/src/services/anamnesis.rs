use anyhow::{Result, anyhow};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use chrono::Utc;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Anamnesis, CreateAnamnesisRequest, UpdateAnamnesisRequest};

pub struct AnamnesisService {
    supabase: SupabaseClient,
}

impl AnamnesisService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_anamnesis(
        &self,
        user_id: &str,
        request: CreateAnamnesisRequest,
        auth_token: &str,
    ) -> Result<Anamnesis> {
        debug!("Creating anamnesis for patient {}", request.patient_id);

        let anamnesis_data = json!({
            "id": Uuid::new_v4().to_string(),
            "user_id": user_id,
            "patient_id": request.patient_id,
            "chief_complaint": request.chief_complaint,
            "history_of_present_illness": request.history_of_present_illness,
            "past_medical_history": request.past_medical_history,
            "family_history": request.family_history,
            "surgical_history": request.surgical_history,
            "medications": request.medications,
            "allergies": request.allergies,
            "lifestyle": request.lifestyle,
            "deleted_at": null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/anamneses",
            Some(auth_token),
            Some(anamnesis_data),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create anamnesis"));
        }

        let anamnesis: Anamnesis = serde_json::from_value(result[0].clone())?;
        Ok(anamnesis)
    }

    pub async fn get_anamnesis(
        &self,
        user_id: &str,
        anamnesis_id: &str,
        auth_token: &str,
    ) -> Result<Anamnesis> {
        let path = format!(
            "/rest/v1/anamneses?id=eq.{}&user_id=eq.{}&deleted_at=is.null",
            anamnesis_id, user_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Anamnesis not found"));
        }

        let anamnesis: Anamnesis = serde_json::from_value(result[0].clone())?;
        Ok(anamnesis)
    }

    pub async fn list_by_patient(
        &self,
        user_id: &str,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<Vec<Anamnesis>> {
        let path = format!(
            "/rest/v1/anamneses?patient_id=eq.{}&user_id=eq.{}&deleted_at=is.null&order=created_at.desc",
            patient_id, user_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let anamneses: Vec<Anamnesis> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(anamneses)
    }

    pub async fn update_anamnesis(
        &self,
        user_id: &str,
        anamnesis_id: &str,
        request: UpdateAnamnesisRequest,
        auth_token: &str,
    ) -> Result<Anamnesis> {
        debug!("Updating anamnesis: {}", anamnesis_id);

        let mut update_data = serde_json::Map::new();

        if let Some(chief_complaint) = request.chief_complaint {
            update_data.insert("chief_complaint".to_string(), json!(chief_complaint));
        }
        if let Some(hpi) = request.history_of_present_illness {
            update_data.insert("history_of_present_illness".to_string(), json!(hpi));
        }
        if let Some(pmh) = request.past_medical_history {
            update_data.insert("past_medical_history".to_string(), json!(pmh));
        }
        if let Some(family_history) = request.family_history {
            update_data.insert("family_history".to_string(), json!(family_history));
        }
        if let Some(surgical_history) = request.surgical_history {
            update_data.insert("surgical_history".to_string(), json!(surgical_history));
        }
        if let Some(medications) = request.medications {
            update_data.insert("medications".to_string(), json!(medications));
        }
        if let Some(allergies) = request.allergies {
            update_data.insert("allergies".to_string(), json!(allergies));
        }
        if let Some(lifestyle) = request.lifestyle {
            update_data.insert("lifestyle".to_string(), json!(lifestyle));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!(
            "/rest/v1/anamneses?id=eq.{}&user_id=eq.{}&deleted_at=is.null",
            anamnesis_id, user_id
        );

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Anamnesis not found"));
        }

        let updated: Anamnesis = serde_json::from_value(result[0].clone())?;
        Ok(updated)
    }

    pub async fn delete_anamnesis(
        &self,
        user_id: &str,
        anamnesis_id: &str,
        auth_token: &str,
    ) -> Result<()> {
        let path = format!(
            "/rest/v1/anamneses?id=eq.{}&user_id=eq.{}&deleted_at=is.null",
            anamnesis_id, user_id
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
            return Err(anyhow!("Anamnesis not found"));
        }

        Ok(())
    }
}
