use anyhow::{Result, anyhow};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{MedicalRecord, Anamnesis, ClinicalNote, Exam, Prescription};

/// Assembles the aggregated chart for one patient. The source schema kept a
/// row of referenced IDs per patient; here the aggregate is built at read
/// time so it can never drift from its parts.
pub struct RecordService {
    supabase: SupabaseClient,
}

impl RecordService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_record(
        &self,
        user_id: &str,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<MedicalRecord> {
        debug!("Assembling medical record for patient {}", patient_id);

        // The patient must exist in this practice
        let patient_path = format!(
            "/rest/v1/patients?id=eq.{}&user_id=eq.{}&deleted_at=is.null&select=id",
            patient_id, user_id
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

        let scope = format!(
            "patient_id=eq.{}&user_id=eq.{}&deleted_at=is.null",
            patient_id, user_id
        );

        let anamneses: Vec<Anamnesis> = self.fetch(
            &format!("/rest/v1/anamneses?{}&order=created_at.desc", scope),
            auth_token,
        ).await?;

        let notes: Vec<ClinicalNote> = self.fetch(
            &format!("/rest/v1/clinical_notes?{}&order=pinned.desc,created_at.desc", scope),
            auth_token,
        ).await?;

        let exams: Vec<Exam> = self.fetch(
            &format!("/rest/v1/exams?{}&order=requested_at.desc", scope),
            auth_token,
        ).await?;

        let prescriptions: Vec<Prescription> = self.fetch(
            &format!("/rest/v1/prescriptions?{}&order=issued_at.desc", scope),
            auth_token,
        ).await?;

        let consultation_rows: Vec<Value> = self.supabase.request(
            Method::GET,
            &format!("/rest/v1/consultations?{}&select=id&order=scheduled_at.desc", scope),
            Some(auth_token),
            None,
        ).await?;

        let consultation_ids: Vec<Uuid> = consultation_rows
            .iter()
            .filter_map(|row| row["id"].as_str())
            .filter_map(|id| id.parse().ok())
            .collect();

        Ok(MedicalRecord {
            patient_id: patient_id.parse()?,
            anamneses,
            notes,
            exams,
            prescriptions,
            consultation_ids,
        })
    }

    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<T>> {
        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            Some(auth_token),
            None,
        ).await?;

        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(Into::into))
            .collect()
    }
}
