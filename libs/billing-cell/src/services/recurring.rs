use anyhow::{Result, anyhow};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use chrono::Utc;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    RecurringTransaction, FinancialTransaction, TransactionStatus,
    CreateRecurringRequest,
};

pub struct RecurringService {
    supabase: SupabaseClient,
}

impl RecurringService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_recurring(
        &self,
        user_id: &str,
        request: CreateRecurringRequest,
        auth_token: &str,
    ) -> Result<RecurringTransaction> {
        if request.description.trim().is_empty() {
            return Err(anyhow!("Description is required"));
        }
        if request.amount <= 0.0 {
            return Err(anyhow!("Amount must be positive"));
        }

        let recurring_id = Uuid::new_v4();
        let now = Utc::now();

        debug!(
            "Creating {} recurring entry {} for practice {}",
            request.frequency, recurring_id, user_id
        );

        // The first execution is the start date itself.
        let row = json!({
            "id": recurring_id.to_string(),
            "user_id": user_id,
            "description": request.description,
            "amount": request.amount,
            "kind": request.kind.to_string(),
            "category": request.category,
            "frequency": request.frequency.to_string(),
            "start_date": request.start_date.format("%Y-%m-%d").to_string(),
            "next_execution_date": request.start_date.format("%Y-%m-%d").to_string(),
            "active": true,
            "deleted_at": null,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/recurring_transactions",
            Some(auth_token),
            Some(row),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create recurring transaction"));
        }

        let recurring: RecurringTransaction = serde_json::from_value(result[0].clone())?;
        Ok(recurring)
    }

    pub async fn list_recurring(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> Result<Vec<RecurringTransaction>> {
        let path = format!(
            "/rest/v1/recurring_transactions?user_id=eq.{}&deleted_at=is.null&order=next_execution_date.asc",
            user_id
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let entries: Vec<RecurringTransaction> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    pub async fn get_recurring(
        &self,
        user_id: &str,
        recurring_id: &str,
        auth_token: &str,
    ) -> Result<RecurringTransaction> {
        let path = format!(
            "/rest/v1/recurring_transactions?id=eq.{}&user_id=eq.{}&deleted_at=is.null",
            recurring_id, user_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Recurring transaction not found"));
        }

        let recurring: RecurringTransaction = serde_json::from_value(result[0].clone())?;
        Ok(recurring)
    }

    pub async fn set_active(
        &self,
        user_id: &str,
        recurring_id: &str,
        active: bool,
        auth_token: &str,
    ) -> Result<RecurringTransaction> {
        self.get_recurring(user_id, recurring_id, auth_token).await?;

        let path = format!(
            "/rest/v1/recurring_transactions?id=eq.{}&user_id=eq.{}",
            recurring_id, user_id
        );
        let update = json!({
            "active": active,
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
            return Err(anyhow!("Recurring transaction not found"));
        }

        let recurring: RecurringTransaction = serde_json::from_value(result[0].clone())?;
        Ok(recurring)
    }

    pub async fn delete_recurring(
        &self,
        user_id: &str,
        recurring_id: &str,
        auth_token: &str,
    ) -> Result<()> {
        self.get_recurring(user_id, recurring_id, auth_token).await?;

        let path = format!(
            "/rest/v1/recurring_transactions?id=eq.{}&user_id=eq.{}",
            recurring_id, user_id
        );
        let update = json!({
            "deleted_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let _: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        Ok(())
    }

    /// Creates pending ledger entries for every execution that has come due,
    /// then advances each template's next execution date past today. A
    /// template that was paused and reactivated catches up on missed runs.
    pub async fn materialize_due(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> Result<Vec<FinancialTransaction>> {
        let today = Utc::now().date_naive();

        let path = format!(
            "/rest/v1/recurring_transactions?user_id=eq.{}&deleted_at=is.null&active=is.true&next_execution_date=lte.{}",
            user_id,
            today.format("%Y-%m-%d"),
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let due: Vec<RecurringTransaction> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        let mut created = Vec::new();

        for template in due {
            let mut execution_date = template.next_execution_date;
            let mut rows = Vec::new();
            let now = Utc::now();

            while execution_date <= today {
                rows.push(json!({
                    "id": Uuid::new_v4().to_string(),
                    "user_id": user_id,
                    "patient_id": null,
                    "description": template.description,
                    "amount": template.amount,
                    "kind": template.kind.to_string(),
                    "category": template.category,
                    "status": TransactionStatus::Pending.to_string(),
                    "occurred_on": execution_date.format("%Y-%m-%d").to_string(),
                    "deleted_at": null,
                    "created_at": now.to_rfc3339(),
                    "updated_at": now.to_rfc3339()
                }));
                execution_date = template.frequency.next_execution(execution_date);
            }

            if rows.is_empty() {
                continue;
            }

            let inserted: Vec<Value> = self.supabase.request_with_headers(
                Method::POST,
                "/rest/v1/financial_transactions",
                Some(auth_token),
                Some(Value::Array(rows)),
                Some(SupabaseClient::representation_headers()),
            ).await?;

            for row in inserted {
                created.push(serde_json::from_value(row)?);
            }

            let path = format!(
                "/rest/v1/recurring_transactions?id=eq.{}&user_id=eq.{}",
                template.id, user_id
            );
            let update = json!({
                "next_execution_date": execution_date.format("%Y-%m-%d").to_string(),
                "updated_at": now.to_rfc3339()
            });
            let _: Vec<Value> = self.supabase.request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(update),
                Some(SupabaseClient::representation_headers()),
            ).await?;
        }

        info!("Materialized {} recurring transactions for practice {}", created.len(), user_id);
        Ok(created)
    }
}
