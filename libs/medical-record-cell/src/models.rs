use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate};
use std::fmt;

// ==============================================================================
// ANAMNESIS
// ==============================================================================

/// Structured patient intake/history record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anamnesis {
    pub id: Uuid,
    pub user_id: Uuid,
    pub patient_id: Uuid,
    pub chief_complaint: Option<String>,
    pub history_of_present_illness: Option<String>,
    pub past_medical_history: Option<String>,
    pub family_history: Option<String>,
    pub surgical_history: Option<String>,
    pub medications: Option<Vec<String>>,
    pub allergies: Option<Vec<String>>,
    pub lifestyle: Option<Lifestyle>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lifestyle {
    pub smoking: Option<String>,
    pub alcohol: Option<String>,
    pub physical_activity: Option<String>,
    pub diet: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAnamnesisRequest {
    pub patient_id: Uuid,
    pub chief_complaint: Option<String>,
    pub history_of_present_illness: Option<String>,
    pub past_medical_history: Option<String>,
    pub family_history: Option<String>,
    pub surgical_history: Option<String>,
    pub medications: Option<Vec<String>>,
    pub allergies: Option<Vec<String>>,
    pub lifestyle: Option<Lifestyle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAnamnesisRequest {
    pub chief_complaint: Option<String>,
    pub history_of_present_illness: Option<String>,
    pub past_medical_history: Option<String>,
    pub family_history: Option<String>,
    pub surgical_history: Option<String>,
    pub medications: Option<Vec<String>>,
    pub allergies: Option<Vec<String>>,
    pub lifestyle: Option<Lifestyle>,
}

// ==============================================================================
// CLINICAL NOTES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalNote {
    pub id: Uuid,
    pub user_id: Uuid,
    pub patient_id: Uuid,
    pub title: String,
    pub content: String,
    pub pinned: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNoteRequest {
    pub patient_id: Uuid,
    pub title: String,
    pub content: String,
    pub pinned: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub pinned: Option<bool>,
}

// ==============================================================================
// EXAMS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    pub id: Uuid,
    pub user_id: Uuid,
    pub patient_id: Uuid,
    pub consultation_id: Option<Uuid>,
    pub name: String,
    pub category: Option<String>,
    pub status: ExamStatus,
    pub requested_at: DateTime<Utc>,
    pub performed_at: Option<DateTime<Utc>>,
    pub result_summary: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExamStatus {
    Requested,
    Scheduled,
    Completed,
    Cancelled,
}

impl ExamStatus {
    pub fn can_transition_to(&self, next: ExamStatus) -> bool {
        use ExamStatus::*;
        matches!(
            (self, next),
            (Requested, Scheduled)
                | (Requested, Completed)
                | (Requested, Cancelled)
                | (Scheduled, Completed)
                | (Scheduled, Cancelled)
        )
    }
}

impl fmt::Display for ExamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExamStatus::Requested => write!(f, "requested"),
            ExamStatus::Scheduled => write!(f, "scheduled"),
            ExamStatus::Completed => write!(f, "completed"),
            ExamStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExamRequest {
    pub patient_id: Uuid,
    pub consultation_id: Option<Uuid>,
    pub name: String,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamQuery {
    pub patient_id: Option<Uuid>,
    pub consultation_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateExamRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub status: Option<ExamStatus>,
    pub performed_at: Option<DateTime<Utc>>,
    pub result_summary: Option<String>,
}

// ==============================================================================
// PRESCRIPTIONS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub patient_id: Uuid,
    pub consultation_id: Option<Uuid>,
    pub medications: Vec<MedicationItem>,
    pub general_instructions: Option<String>,
    pub issued_at: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Prescription {
    pub fn is_expired_at(&self, today: NaiveDate) -> bool {
        self.valid_until.map(|valid| valid < today).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationItem {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: Option<String>,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePrescriptionRequest {
    pub patient_id: Uuid,
    pub consultation_id: Option<Uuid>,
    pub medications: Vec<MedicationItem>,
    pub general_instructions: Option<String>,
    pub valid_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionQuery {
    pub patient_id: Option<Uuid>,
    pub consultation_id: Option<Uuid>,
    pub expired: Option<bool>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

// ==============================================================================
// AGGREGATED MEDICAL RECORD
// ==============================================================================

/// The patient's full chart, assembled at read time from its parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub patient_id: Uuid,
    pub anamneses: Vec<Anamnesis>,
    pub notes: Vec<ClinicalNote>,
    pub exams: Vec<Exam>,
    pub prescriptions: Vec<Prescription>,
    pub consultation_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordQuery {
    pub patient_id: Option<Uuid>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum MedicalRecordError {
    #[error("Record not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
