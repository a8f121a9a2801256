use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub cpf: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub cep: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub allergies: Option<Vec<String>>,
    pub chronic_conditions: Option<Vec<String>>,
    pub current_medications: Option<Vec<String>>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub notes: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    pub fn age(&self) -> Option<i32> {
        let today = chrono::Utc::now().date_naive();
        self.birth_date
            .and_then(|birth| today.years_since(birth))
            .map(|years| years as i32)
    }

    pub fn first_name(&self) -> &str {
        self.full_name.split_whitespace().next().unwrap_or(&self.full_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub cpf: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub cep: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub allergies: Option<Vec<String>>,
    pub chronic_conditions: Option<Vec<String>>,
    pub current_medications: Option<Vec<String>>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub notes: Option<String>,
}

impl CreatePatientRequest {
    pub fn validate(&self) -> Result<(), PatientError> {
        if self.full_name.trim().is_empty() {
            return Err(PatientError::ValidationError("full_name is required".to_string()));
        }
        validate_phone(&self.phone)?;
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(cep) = &self.cep {
            validate_cep(cep)?;
        }
        if let Some(phone) = &self.emergency_contact_phone {
            validate_phone(phone)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePatientRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub cpf: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub cep: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub allergies: Option<Vec<String>>,
    pub chronic_conditions: Option<Vec<String>>,
    pub current_medications: Option<Vec<String>>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub notes: Option<String>,
}

impl UpdatePatientRequest {
    pub fn validate(&self) -> Result<(), PatientError> {
        if let Some(name) = &self.full_name {
            if name.trim().is_empty() {
                return Err(PatientError::ValidationError("full_name cannot be empty".to_string()));
            }
        }
        if let Some(phone) = &self.phone {
            validate_phone(phone)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(cep) = &self.cep {
            validate_cep(cep)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientSearchQuery {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub cpf: Option<String>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Patient with email {email} already exists")]
    EmailAlreadyExists { email: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Brazilian landline or mobile number: 10 or 11 digits after stripping
/// formatting characters.
pub fn validate_phone(phone: &str) -> Result<(), PatientError> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 10 || digits.len() > 11 {
        return Err(PatientError::ValidationError(format!(
            "invalid phone number: {}", phone
        )));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), PatientError> {
    let re = regex::Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    if !re.is_match(email) {
        return Err(PatientError::ValidationError(format!("invalid email: {}", email)));
    }
    Ok(())
}

/// CEP: 8 digits, optional dash (01310-100 or 01310100).
pub fn validate_cep(cep: &str) -> Result<(), PatientError> {
    let re = regex::Regex::new(r"^\d{5}-?\d{3}$").unwrap();
    if !re.is_match(cep) {
        return Err(PatientError::ValidationError(format!("invalid CEP: {}", cep)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> CreatePatientRequest {
        CreatePatientRequest {
            full_name: "Maria Souza".to_string(),
            email: Some("maria@example.com".to_string()),
            phone: "(11) 98765-4321".to_string(),
            cpf: None,
            birth_date: None,
            gender: None,
            address: None,
            cep: Some("01310-100".to_string()),
            city: None,
            state: None,
            allergies: None,
            chronic_conditions: None,
            current_medications: None,
            emergency_contact_name: None,
            emergency_contact_phone: None,
            notes: None,
        }
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(base_request().validate().is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut request = base_request();
        request.full_name = "  ".to_string();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_short_phone_rejected() {
        let mut request = base_request();
        request.phone = "12345".to_string();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_phone_with_formatting_accepted() {
        assert!(validate_phone("(11) 3456-7890").is_ok());
        assert!(validate_phone("11987654321").is_ok());
    }

    #[test]
    fn test_long_phone_rejected() {
        assert!(validate_phone("123456789012").is_err());
        assert!(validate_phone("+55 11 98765-4321").is_err());
    }

    #[test]
    fn test_cep_formats() {
        assert!(validate_cep("01310-100").is_ok());
        assert!(validate_cep("01310100").is_ok());
        assert!(validate_cep("0131-0100").is_err());
        assert!(validate_cep("abcde-fgh").is_err());
    }

    #[test]
    fn test_email_shape() {
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("two@@signs.com").is_err());
    }

    #[test]
    fn test_first_name() {
        let patient = Patient {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            full_name: "Maria Souza Lima".to_string(),
            email: None,
            phone: "11987654321".to_string(),
            cpf: None,
            birth_date: Some(NaiveDate::from_ymd_opt(1985, 4, 12).unwrap()),
            gender: None,
            address: None,
            cep: None,
            city: None,
            state: None,
            allergies: None,
            chronic_conditions: None,
            current_medications: None,
            emergency_contact_name: None,
            emergency_contact_phone: None,
            notes: None,
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(patient.first_name(), "Maria");
        assert!(patient.age().unwrap() >= 40);
    }
}
