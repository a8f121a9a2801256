use anyhow::{Result, anyhow};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use chrono::Utc;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Patient, CreatePatientRequest, UpdatePatientRequest, PatientSearchQuery};

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_patient(
        &self,
        user_id: &str,
        request: CreatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient> {
        debug!("Creating patient record for practice {}", user_id);

        request.validate()?;

        // Email is unique per tenant, not globally
        if let Some(email) = &request.email {
            let existing_check_path = format!(
                "/rest/v1/patients?user_id=eq.{}&email=eq.{}&deleted_at=is.null",
                user_id,
                urlencoding::encode(email)
            );
            let existing: Vec<Value> = self.supabase.request(
                Method::GET,
                &existing_check_path,
                Some(auth_token),
                None,
            ).await?;

            if !existing.is_empty() {
                return Err(anyhow!("Patient with email {} already exists", email));
            }
        }

        let patient_data = json!({
            "id": Uuid::new_v4().to_string(),
            "user_id": user_id,
            "full_name": request.full_name,
            "email": request.email,
            "phone": request.phone,
            "cpf": request.cpf,
            "birth_date": request.birth_date.map(|d| d.format("%Y-%m-%d").to_string()),
            "gender": request.gender,
            "address": request.address,
            "cep": request.cep,
            "city": request.city,
            "state": request.state,
            "allergies": request.allergies,
            "chronic_conditions": request.chronic_conditions,
            "current_medications": request.current_medications,
            "emergency_contact_name": request.emergency_contact_name,
            "emergency_contact_phone": request.emergency_contact_phone,
            "notes": request.notes,
            "deleted_at": null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/patients",
            Some(auth_token),
            Some(patient_data),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create patient record"));
        }

        let patient: Patient = serde_json::from_value(result[0].clone())?;
        debug!("Patient record created with ID: {}", patient.id);

        Ok(patient)
    }

    pub async fn get_patient(
        &self,
        user_id: &str,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<Patient> {
        debug!("Fetching patient record: {}", patient_id);

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

        let patient: Patient = serde_json::from_value(result[0].clone())?;
        Ok(patient)
    }

    pub async fn list_patients(
        &self,
        user_id: &str,
        limit: i32,
        offset: i32,
        auth_token: &str,
    ) -> Result<Vec<Patient>> {
        let path = format!(
            "/rest/v1/patients?user_id=eq.{}&deleted_at=is.null&order=full_name.asc&limit={}&offset={}",
            user_id, limit, offset
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let patients: Vec<Patient> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(patients)
    }

    pub async fn update_patient(
        &self,
        user_id: &str,
        patient_id: &str,
        request: UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient> {
        debug!("Updating patient record: {}", patient_id);

        request.validate()?;

        let mut update_data = serde_json::Map::new();

        if let Some(full_name) = request.full_name {
            update_data.insert("full_name".to_string(), json!(full_name));
        }
        if let Some(email) = request.email {
            update_data.insert("email".to_string(), json!(email));
        }
        if let Some(phone) = request.phone {
            update_data.insert("phone".to_string(), json!(phone));
        }
        if let Some(cpf) = request.cpf {
            update_data.insert("cpf".to_string(), json!(cpf));
        }
        if let Some(birth_date) = request.birth_date {
            update_data.insert("birth_date".to_string(), json!(birth_date.format("%Y-%m-%d").to_string()));
        }
        if let Some(gender) = request.gender {
            update_data.insert("gender".to_string(), json!(gender));
        }
        if let Some(address) = request.address {
            update_data.insert("address".to_string(), json!(address));
        }
        if let Some(cep) = request.cep {
            update_data.insert("cep".to_string(), json!(cep));
        }
        if let Some(city) = request.city {
            update_data.insert("city".to_string(), json!(city));
        }
        if let Some(state) = request.state {
            update_data.insert("state".to_string(), json!(state));
        }
        if let Some(allergies) = request.allergies {
            update_data.insert("allergies".to_string(), json!(allergies));
        }
        if let Some(chronic_conditions) = request.chronic_conditions {
            update_data.insert("chronic_conditions".to_string(), json!(chronic_conditions));
        }
        if let Some(current_medications) = request.current_medications {
            update_data.insert("current_medications".to_string(), json!(current_medications));
        }
        if let Some(name) = request.emergency_contact_name {
            update_data.insert("emergency_contact_name".to_string(), json!(name));
        }
        if let Some(phone) = request.emergency_contact_phone {
            update_data.insert("emergency_contact_phone".to_string(), json!(phone));
        }
        if let Some(notes) = request.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!(
            "/rest/v1/patients?id=eq.{}&user_id=eq.{}&deleted_at=is.null",
            patient_id, user_id
        );

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Patient not found"));
        }

        let updated_patient: Patient = serde_json::from_value(result[0].clone())?;
        Ok(updated_patient)
    }

    /// Soft delete: rows keep their history but drop out of default reads.
    pub async fn delete_patient(
        &self,
        user_id: &str,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<()> {
        debug!("Soft-deleting patient record: {}", patient_id);

        let path = format!(
            "/rest/v1/patients?id=eq.{}&user_id=eq.{}&deleted_at=is.null",
            patient_id, user_id
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
            return Err(anyhow!("Patient not found"));
        }

        Ok(())
    }

    pub async fn search_patients(
        &self,
        user_id: &str,
        query: PatientSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Patient>> {
        debug!("Searching patients with query: {:?}", query);

        let mut query_parts = vec![
            format!("user_id=eq.{}", user_id),
            "deleted_at=is.null".to_string(),
        ];

        if let Some(name) = query.name {
            query_parts.push(format!("full_name=ilike.%{}%", urlencoding::encode(&name)));
        }
        if let Some(email) = query.email {
            query_parts.push(format!("email=ilike.%{}%", urlencoding::encode(&email)));
        }
        if let Some(phone) = query.phone {
            query_parts.push(format!("phone=ilike.%{}%", urlencoding::encode(&phone)));
        }
        if let Some(cpf) = query.cpf {
            query_parts.push(format!("cpf=eq.{}", urlencoding::encode(&cpf)));
        }

        let limit = query.limit.unwrap_or(50);
        let offset = query.offset.unwrap_or(0);
        let path = format!(
            "/rest/v1/patients?{}&limit={}&offset={}",
            query_parts.join("&"), limit, offset
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let patients: Vec<Patient> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(patients)
    }
}
