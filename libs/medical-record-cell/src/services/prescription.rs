use anyhow::{Result, anyhow};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use chrono::{Utc, Duration};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Prescription, CreatePrescriptionRequest, PrescriptionQuery};

pub struct PrescriptionService {
    supabase: SupabaseClient,
}

impl PrescriptionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_prescription(
        &self,
        user_id: &str,
        request: CreatePrescriptionRequest,
        auth_token: &str,
    ) -> Result<Prescription> {
        if request.medications.is_empty() {
            return Err(anyhow!("A prescription needs at least one medication"));
        }

        debug!(
            "Issuing prescription with {} medications for patient {}",
            request.medications.len(),
            request.patient_id
        );

        let issued_at = Utc::now().date_naive();
        let valid_until = request.valid_days.map(|days| issued_at + Duration::days(days));

        let prescription_data = json!({
            "id": Uuid::new_v4().to_string(),
            "user_id": user_id,
            "patient_id": request.patient_id,
            "consultation_id": request.consultation_id,
            "medications": request.medications,
            "general_instructions": request.general_instructions,
            "issued_at": issued_at.format("%Y-%m-%d").to_string(),
            "valid_until": valid_until.map(|d| d.format("%Y-%m-%d").to_string()),
            "deleted_at": null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/prescriptions",
            Some(auth_token),
            Some(prescription_data),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create prescription"));
        }

        let prescription: Prescription = serde_json::from_value(result[0].clone())?;

        // The circular FK: once the prescription row exists, patch the
        // consultation to point back at it.
        if let Some(consultation_id) = request.consultation_id {
            let path = format!(
                "/rest/v1/consultations?id=eq.{}&user_id=eq.{}&deleted_at=is.null",
                consultation_id, user_id
            );
            let update = json!({
                "prescription_id": prescription.id.to_string(),
                "updated_at": Utc::now().to_rfc3339()
            });
            let _: Vec<Value> = self.supabase.request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(update),
                Some(SupabaseClient::representation_headers()),
            ).await?;
        }

        Ok(prescription)
    }

    pub async fn get_prescription(
        &self,
        user_id: &str,
        prescription_id: &str,
        auth_token: &str,
    ) -> Result<Prescription> {
        let path = format!(
            "/rest/v1/prescriptions?id=eq.{}&user_id=eq.{}&deleted_at=is.null",
            prescription_id, user_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Prescription not found"));
        }

        let prescription: Prescription = serde_json::from_value(result[0].clone())?;
        Ok(prescription)
    }

    pub async fn list_prescriptions(
        &self,
        user_id: &str,
        query: PrescriptionQuery,
        auth_token: &str,
    ) -> Result<Vec<Prescription>> {
        let mut query_parts = vec![
            format!("user_id=eq.{}", user_id),
            "deleted_at=is.null".to_string(),
        ];

        if let Some(patient_id) = query.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(consultation_id) = query.consultation_id {
            query_parts.push(format!("consultation_id=eq.{}", consultation_id));
        }
        // Expired scope: valid_until strictly before today
        if let Some(expired) = query.expired {
            let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
            if expired {
                query_parts.push(format!("valid_until=lt.{}", today));
            } else {
                query_parts.push(format!("or=(valid_until.is.null,valid_until.gte.{})", today));
            }
        }

        let limit = query.limit.unwrap_or(50);
        let offset = query.offset.unwrap_or(0);
        let path = format!(
            "/rest/v1/prescriptions?{}&order=issued_at.desc&limit={}&offset={}",
            query_parts.join("&"), limit, offset
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let prescriptions: Vec<Prescription> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(prescriptions)
    }

    pub async fn delete_prescription(
        &self,
        user_id: &str,
        prescription_id: &str,
        auth_token: &str,
    ) -> Result<()> {
        let path = format!(
            "/rest/v1/prescriptions?id=eq.{}&user_id=eq.{}&deleted_at=is.null",
            prescription_id, user_id
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
            return Err(anyhow!("Prescription not found"));
        }

        Ok(())
    }
}
