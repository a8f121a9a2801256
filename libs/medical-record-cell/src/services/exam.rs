use anyhow::{Result, anyhow};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use chrono::Utc;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Exam, ExamStatus, CreateExamRequest, UpdateExamRequest};

pub struct ExamService {
    supabase: SupabaseClient,
}

impl ExamService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_exam(
        &self,
        user_id: &str,
        request: CreateExamRequest,
        auth_token: &str,
    ) -> Result<Exam> {
        if request.name.trim().is_empty() {
            return Err(anyhow!("exam name is required"));
        }

        debug!("Requesting exam '{}' for patient {}", request.name, request.patient_id);

        let exam_data = json!({
            "id": Uuid::new_v4().to_string(),
            "user_id": user_id,
            "patient_id": request.patient_id,
            "consultation_id": request.consultation_id,
            "name": request.name,
            "category": request.category,
            "status": ExamStatus::Requested.to_string(),
            "requested_at": Utc::now().to_rfc3339(),
            "performed_at": null,
            "result_summary": null,
            "deleted_at": null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/exams",
            Some(auth_token),
            Some(exam_data),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create exam"));
        }

        let exam: Exam = serde_json::from_value(result[0].clone())?;
        Ok(exam)
    }

    pub async fn get_exam(
        &self,
        user_id: &str,
        exam_id: &str,
        auth_token: &str,
    ) -> Result<Exam> {
        let path = format!(
            "/rest/v1/exams?id=eq.{}&user_id=eq.{}&deleted_at=is.null",
            exam_id, user_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Exam not found"));
        }

        let exam: Exam = serde_json::from_value(result[0].clone())?;
        Ok(exam)
    }

    pub async fn list_exams(
        &self,
        user_id: &str,
        patient_id: Option<&str>,
        consultation_id: Option<&str>,
        auth_token: &str,
    ) -> Result<Vec<Exam>> {
        let mut query_parts = vec![
            format!("user_id=eq.{}", user_id),
            "deleted_at=is.null".to_string(),
        ];
        if let Some(patient_id) = patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(consultation_id) = consultation_id {
            query_parts.push(format!("consultation_id=eq.{}", consultation_id));
        }

        let path = format!(
            "/rest/v1/exams?{}&order=requested_at.desc",
            query_parts.join("&")
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let exams: Vec<Exam> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(exams)
    }

    pub async fn update_exam(
        &self,
        user_id: &str,
        exam_id: &str,
        request: UpdateExamRequest,
        auth_token: &str,
    ) -> Result<Exam> {
        let current = self.get_exam(user_id, exam_id, auth_token).await?;

        let mut update_data = serde_json::Map::new();

        if let Some(status) = request.status {
            if !current.status.can_transition_to(status) {
                return Err(anyhow!(
                    "Illegal status transition from {} to {}", current.status, status
                ));
            }
            update_data.insert("status".to_string(), json!(status.to_string()));
            if status == ExamStatus::Completed && request.performed_at.is_none() {
                update_data.insert("performed_at".to_string(), json!(Utc::now().to_rfc3339()));
            }
        }
        if let Some(name) = request.name {
            update_data.insert("name".to_string(), json!(name));
        }
        if let Some(category) = request.category {
            update_data.insert("category".to_string(), json!(category));
        }
        if let Some(performed_at) = request.performed_at {
            update_data.insert("performed_at".to_string(), json!(performed_at.to_rfc3339()));
        }
        if let Some(result_summary) = request.result_summary {
            update_data.insert("result_summary".to_string(), json!(result_summary));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!(
            "/rest/v1/exams?id=eq.{}&user_id=eq.{}&deleted_at=is.null",
            exam_id, user_id
        );

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Exam not found"));
        }

        let updated: Exam = serde_json::from_value(result[0].clone())?;
        Ok(updated)
    }

    pub async fn delete_exam(
        &self,
        user_id: &str,
        exam_id: &str,
        auth_token: &str,
    ) -> Result<()> {
        let path = format!(
            "/rest/v1/exams?id=eq.{}&user_id=eq.{}&deleted_at=is.null",
            exam_id, user_id
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
            return Err(anyhow!("Exam not found"));
        }

        Ok(())
    }
}
