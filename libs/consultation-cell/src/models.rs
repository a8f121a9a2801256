use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consultation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub patient_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: ConsultationStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub vital_signs: Option<VitalSigns>,
    // Circular FK with prescriptions: patched in after the prescription
    // row exists, mirroring the deferred migration in the schema.
    pub prescription_id: Option<Uuid>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Consultation {
    pub fn scheduled_end_time(&self) -> DateTime<Utc> {
        self.scheduled_at + chrono::Duration::minutes(self.duration_minutes as i64)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl ConsultationStatus {
    /// Legal lifecycle edges. Completed, cancelled and no_show are terminal.
    pub fn can_transition_to(&self, next: ConsultationStatus) -> bool {
        use ConsultationStatus::*;
        matches!(
            (self, next),
            (Scheduled, Confirmed)
                | (Scheduled, InProgress)
                | (Scheduled, Cancelled)
                | (Scheduled, NoShow)
                | (Confirmed, InProgress)
                | (Confirmed, Cancelled)
                | (Confirmed, NoShow)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        use ConsultationStatus::*;
        matches!(self, Completed | Cancelled | NoShow)
    }
}

impl fmt::Display for ConsultationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsultationStatus::Scheduled => write!(f, "scheduled"),
            ConsultationStatus::Confirmed => write!(f, "confirmed"),
            ConsultationStatus::InProgress => write!(f, "in_progress"),
            ConsultationStatus::Completed => write!(f, "completed"),
            ConsultationStatus::Cancelled => write!(f, "cancelled"),
            ConsultationStatus::NoShow => write!(f, "no_show"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalSigns {
    pub systolic_bp: Option<i32>,
    pub diastolic_bp: Option<i32>,
    pub heart_rate: Option<i32>,
    pub temperature_celsius: Option<f64>,
    pub respiratory_rate: Option<i32>,
    pub oxygen_saturation: Option<i32>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConsultationRequest {
    pub patient_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: Option<i32>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConsultationRequest {
    pub scheduled_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub vital_signs: Option<VitalSigns>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: ConsultationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachPrescriptionRequest {
    pub prescription_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationQuery {
    pub patient_id: Option<Uuid>,
    pub status: Option<ConsultationStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum ConsultationError {
    #[error("Consultation not found")]
    NotFound,

    #[error("Illegal status transition from {from} to {to}")]
    IllegalTransition { from: String, to: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConsultationStatus::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(Scheduled.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for terminal in [Completed, Cancelled, NoShow] {
            assert!(terminal.is_terminal());
            for next in [Scheduled, Confirmed, InProgress, Completed, Cancelled, NoShow] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_no_backward_transitions() {
        assert!(!Confirmed.can_transition_to(Scheduled));
        assert!(!InProgress.can_transition_to(Confirmed));
        assert!(!Completed.can_transition_to(InProgress));
    }

    #[test]
    fn test_walk_in_can_start_without_confirmation() {
        assert!(Scheduled.can_transition_to(InProgress));
    }

    #[test]
    fn test_scheduled_end_time() {
        let consultation = Consultation {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            scheduled_at: "2026-09-01T14:00:00Z".parse().unwrap(),
            duration_minutes: 45,
            status: Scheduled,
            reason: None,
            notes: None,
            vital_signs: None,
            prescription_id: None,
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(
            consultation.scheduled_end_time(),
            "2026-09-01T14:45:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&NoShow).unwrap(), "\"no_show\"");
        assert_eq!(NoShow.to_string(), "no_show");
    }
}
