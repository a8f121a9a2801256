use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub whatsapp_gateway_url: String,
    pub whatsapp_gateway_token: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            whatsapp_gateway_url: "http://localhost:8466".to_string(),
            whatsapp_gateway_token: "test-gateway-token".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            whatsapp_gateway_url: self.whatsapp_gateway_url.clone(),
            whatsapp_gateway_token: self.whatsapp_gateway_token.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "doctor".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn secretary(email: &str) -> Self {
        Self::new(email, "secretary")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }
}

/// Canned PostgREST rows for wiremock-backed integration tests.
pub struct MockRows;

impl MockRows {
    pub fn patient(user_id: &str) -> Value {
        json!({
            "id": Uuid::new_v4().to_string(),
            "user_id": user_id,
            "full_name": "Maria Souza",
            "email": "maria.souza@example.com",
            "phone": "11987654321",
            "cpf": "390.533.447-05",
            "birth_date": "1985-04-12",
            "gender": "female",
            "address": "Rua das Flores, 120",
            "cep": "01310-100",
            "city": "São Paulo",
            "state": "SP",
            "allergies": ["dipyrone"],
            "chronic_conditions": ["hypertension"],
            "current_medications": ["losartan 50mg"],
            "emergency_contact_name": "João Souza",
            "emergency_contact_phone": "11912345678",
            "notes": null,
            "deleted_at": null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        })
    }

    pub fn consultation(user_id: &str, patient_id: &str) -> Value {
        json!({
            "id": Uuid::new_v4().to_string(),
            "user_id": user_id,
            "patient_id": patient_id,
            "scheduled_at": (Utc::now() + Duration::days(2)).to_rfc3339(),
            "duration_minutes": 30,
            "status": "scheduled",
            "reason": "routine follow-up",
            "notes": null,
            "vital_signs": null,
            "prescription_id": null,
            "deleted_at": null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        })
    }

    pub fn anamnesis(user_id: &str, patient_id: &str) -> Value {
        json!({
            "id": Uuid::new_v4().to_string(),
            "user_id": user_id,
            "patient_id": patient_id,
            "chief_complaint": "recurring headaches",
            "history_of_present_illness": "two months of evening headaches",
            "past_medical_history": null,
            "family_history": "father hypertensive",
            "surgical_history": null,
            "medications": ["losartan 50mg"],
            "allergies": ["dipyrone"],
            "lifestyle": {
                "smoking": "never",
                "alcohol": "social",
                "physical_activity": "sedentary",
                "diet": null
            },
            "deleted_at": null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        })
    }

    pub fn clinical_note(user_id: &str, patient_id: &str) -> Value {
        json!({
            "id": Uuid::new_v4().to_string(),
            "user_id": user_id,
            "patient_id": patient_id,
            "title": "Post-visit note",
            "content": "Patient responded well to treatment.",
            "pinned": false,
            "deleted_at": null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        })
    }

    pub fn exam(user_id: &str, patient_id: &str) -> Value {
        json!({
            "id": Uuid::new_v4().to_string(),
            "user_id": user_id,
            "patient_id": patient_id,
            "consultation_id": null,
            "name": "Complete blood count",
            "category": "laboratory",
            "status": "requested",
            "requested_at": Utc::now().to_rfc3339(),
            "performed_at": null,
            "result_summary": null,
            "deleted_at": null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        })
    }

    pub fn prescription(user_id: &str, patient_id: &str) -> Value {
        json!({
            "id": Uuid::new_v4().to_string(),
            "user_id": user_id,
            "patient_id": patient_id,
            "consultation_id": null,
            "medications": [{
                "name": "amoxicillin",
                "dosage": "500mg",
                "frequency": "8/8h",
                "duration": "7 days",
                "instructions": "take with food"
            }],
            "general_instructions": null,
            "issued_at": Utc::now().date_naive().to_string(),
            "valid_until": (Utc::now().date_naive() + Duration::days(30)).to_string(),
            "deleted_at": null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        })
    }

    pub fn schedule_slot(user_id: &str) -> Value {
        json!({
            "id": Uuid::new_v4().to_string(),
            "user_id": user_id,
            "date": (Utc::now().date_naive() + Duration::days(1)).to_string(),
            "start_time": "09:00:00",
            "end_time": "09:30:00",
            "status": "available",
            "consultation_id": null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        })
    }

    pub fn financial_transaction(user_id: &str) -> Value {
        json!({
            "id": Uuid::new_v4().to_string(),
            "user_id": user_id,
            "patient_id": null,
            "description": "Consultation fee",
            "amount": 250.0,
            "kind": "income",
            "category": "consultation",
            "status": "pending",
            "occurred_on": Utc::now().date_naive().to_string(),
            "deleted_at": null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        })
    }

    pub fn recurring_transaction(user_id: &str) -> Value {
        json!({
            "id": Uuid::new_v4().to_string(),
            "user_id": user_id,
            "description": "Office rent",
            "amount": 3200.0,
            "kind": "expense",
            "category": "rent",
            "frequency": "monthly",
            "start_date": "2026-01-05",
            "next_execution_date": "2026-09-05",
            "active": true,
            "deleted_at": null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        })
    }

    pub fn bill(user_id: &str) -> Value {
        json!({
            "id": Uuid::new_v4().to_string(),
            "user_id": user_id,
            "description": "Electricity",
            "amount": 430.55,
            "due_date": (Utc::now().date_naive() + Duration::days(10)).to_string(),
            "status": "pending",
            "paid_at": null,
            "category": "utilities",
            "deleted_at": null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        })
    }

    pub fn whatsapp_connection(user_id: &str) -> Value {
        json!({
            "id": Uuid::new_v4().to_string(),
            "user_id": user_id,
            "session_name": "default",
            "status": "waiting_for_qr_scan",
            "qr_code": "2@abcdef==",
            "phone_number": null,
            "connected_at": null,
            "disconnected_at": null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        })
    }

    pub fn whatsapp_message(user_id: &str, connection_id: &str) -> Value {
        json!({
            "id": Uuid::new_v4().to_string(),
            "user_id": user_id,
            "connection_id": connection_id,
            "patient_id": null,
            "to_phone": "5511987654321",
            "body": "Your consultation is tomorrow at 9am.",
            "status": "pending",
            "sent_at": null,
            "delivered_at": null,
            "read_at": null,
            "error_message": null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        })
    }

    pub fn whatsapp_reminder(user_id: &str, patient_id: &str, consultation_id: &str) -> Value {
        let consultation_date = Utc::now() + Duration::days(1);
        json!({
            "id": Uuid::new_v4().to_string(),
            "user_id": user_id,
            "patient_id": patient_id,
            "consultation_id": consultation_id,
            "message": "Reminder: consultation tomorrow.",
            "consultation_date": consultation_date.to_rfc3339(),
            "hours_before": 24,
            "scheduled_for": (consultation_date - Duration::hours(24)).to_rfc3339(),
            "status": "pending",
            "sent_at": null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        })
    }
}
