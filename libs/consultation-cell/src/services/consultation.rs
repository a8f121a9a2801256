use anyhow::{Result, anyhow};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use chrono::Utc;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Consultation, ConsultationStatus, CreateConsultationRequest,
    UpdateConsultationRequest, ConsultationQuery,
};

pub struct ConsultationService {
    supabase: SupabaseClient,
}

impl ConsultationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_consultation(
        &self,
        user_id: &str,
        request: CreateConsultationRequest,
        auth_token: &str,
    ) -> Result<Consultation> {
        debug!("Creating consultation for patient {}", request.patient_id);

        let duration = request.duration_minutes.unwrap_or(30);
        if duration <= 0 {
            return Err(anyhow!("duration_minutes must be positive"));
        }

        // The patient must exist in this practice
        let patient_path = format!(
            "/rest/v1/patients?id=eq.{}&user_id=eq.{}&deleted_at=is.null&select=id",
            request.patient_id, user_id
        );
        let patients: Vec<Value> = self.supabase.request(
            Method::GET,
            &patient_path,
            Some(auth_token),
            None,
        ).await?;

        if patients.is_empty() {
            return Err(anyhow!("Patient not found"));
        }

        let consultation_data = json!({
            "id": Uuid::new_v4().to_string(),
            "user_id": user_id,
            "patient_id": request.patient_id,
            "scheduled_at": request.scheduled_at.to_rfc3339(),
            "duration_minutes": duration,
            "status": ConsultationStatus::Scheduled.to_string(),
            "reason": request.reason,
            "notes": null,
            "vital_signs": null,
            "prescription_id": null,
            "deleted_at": null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/consultations",
            Some(auth_token),
            Some(consultation_data),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create consultation"));
        }

        let consultation: Consultation = serde_json::from_value(result[0].clone())?;
        debug!("Consultation created with ID: {}", consultation.id);

        Ok(consultation)
    }

    pub async fn get_consultation(
        &self,
        user_id: &str,
        consultation_id: &str,
        auth_token: &str,
    ) -> Result<Consultation> {
        let path = format!(
            "/rest/v1/consultations?id=eq.{}&user_id=eq.{}&deleted_at=is.null",
            consultation_id, user_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Consultation not found"));
        }

        let consultation: Consultation = serde_json::from_value(result[0].clone())?;
        Ok(consultation)
    }

    pub async fn list_consultations(
        &self,
        user_id: &str,
        query: ConsultationQuery,
        auth_token: &str,
    ) -> Result<Vec<Consultation>> {
        let mut query_parts = vec![
            format!("user_id=eq.{}", user_id),
            "deleted_at=is.null".to_string(),
        ];

        if let Some(patient_id) = query.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(from) = query.from {
            query_parts.push(format!("scheduled_at=gte.{}", from.to_rfc3339()));
        }
        if let Some(to) = query.to {
            query_parts.push(format!("scheduled_at=lte.{}", to.to_rfc3339()));
        }

        let limit = query.limit.unwrap_or(50);
        let offset = query.offset.unwrap_or(0);
        let path = format!(
            "/rest/v1/consultations?{}&order=scheduled_at.asc&limit={}&offset={}",
            query_parts.join("&"), limit, offset
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let consultations: Vec<Consultation> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(consultations)
    }

    pub async fn update_consultation(
        &self,
        user_id: &str,
        consultation_id: &str,
        request: UpdateConsultationRequest,
        auth_token: &str,
    ) -> Result<Consultation> {
        debug!("Updating consultation: {}", consultation_id);

        // Rescheduling a terminal consultation makes no sense
        let current = self.get_consultation(user_id, consultation_id, auth_token).await?;
        if request.scheduled_at.is_some() && current.status.is_terminal() {
            return Err(anyhow!(
                "Cannot reschedule a consultation in status {}", current.status
            ));
        }

        let mut update_data = serde_json::Map::new();

        if let Some(scheduled_at) = request.scheduled_at {
            update_data.insert("scheduled_at".to_string(), json!(scheduled_at.to_rfc3339()));
        }
        if let Some(duration) = request.duration_minutes {
            if duration <= 0 {
                return Err(anyhow!("duration_minutes must be positive"));
            }
            update_data.insert("duration_minutes".to_string(), json!(duration));
        }
        if let Some(reason) = request.reason {
            update_data.insert("reason".to_string(), json!(reason));
        }
        if let Some(notes) = request.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }
        if let Some(vital_signs) = request.vital_signs {
            update_data.insert("vital_signs".to_string(), json!(vital_signs));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!(
            "/rest/v1/consultations?id=eq.{}&user_id=eq.{}&deleted_at=is.null",
            consultation_id, user_id
        );

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Consultation not found"));
        }

        let updated: Consultation = serde_json::from_value(result[0].clone())?;
        Ok(updated)
    }

    pub async fn update_status(
        &self,
        user_id: &str,
        consultation_id: &str,
        next: ConsultationStatus,
        auth_token: &str,
    ) -> Result<Consultation> {
        let current = self.get_consultation(user_id, consultation_id, auth_token).await?;

        if !current.status.can_transition_to(next) {
            return Err(anyhow!(
                "Illegal status transition from {} to {}", current.status, next
            ));
        }

        debug!(
            "Consultation {} transitioning {} -> {}",
            consultation_id, current.status, next
        );

        let path = format!(
            "/rest/v1/consultations?id=eq.{}&user_id=eq.{}&deleted_at=is.null",
            consultation_id, user_id
        );
        let update = json!({
            "status": next.to_string(),
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
            return Err(anyhow!("Consultation not found"));
        }

        let updated: Consultation = serde_json::from_value(result[0].clone())?;
        Ok(updated)
    }

    pub async fn attach_prescription(
        &self,
        user_id: &str,
        consultation_id: &str,
        prescription_id: Uuid,
        auth_token: &str,
    ) -> Result<Consultation> {
        debug!(
            "Attaching prescription {} to consultation {}",
            prescription_id, consultation_id
        );

        let path = format!(
            "/rest/v1/consultations?id=eq.{}&user_id=eq.{}&deleted_at=is.null",
            consultation_id, user_id
        );
        let update = json!({
            "prescription_id": prescription_id.to_string(),
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
            return Err(anyhow!("Consultation not found"));
        }

        let updated: Consultation = serde_json::from_value(result[0].clone())?;
        Ok(updated)
    }

    pub async fn delete_consultation(
        &self,
        user_id: &str,
        consultation_id: &str,
        auth_token: &str,
    ) -> Result<()> {
        debug!("Soft-deleting consultation: {}", consultation_id);

        let path = format!(
            "/rest/v1/consultations?id=eq.{}&user_id=eq.{}&deleted_at=is.null",
            consultation_id, user_id
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
            return Err(anyhow!("Consultation not found"));
        }

        Ok(())
    }
}
