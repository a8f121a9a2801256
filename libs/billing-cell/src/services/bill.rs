use anyhow::{Result, anyhow};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use chrono::Utc;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Bill, BillStatus, CreateBillRequest, BillQuery};

pub struct BillService {
    supabase: SupabaseClient,
}

impl BillService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_bill(
        &self,
        user_id: &str,
        request: CreateBillRequest,
        auth_token: &str,
    ) -> Result<Bill> {
        if request.description.trim().is_empty() {
            return Err(anyhow!("Description is required"));
        }
        if request.amount <= 0.0 {
            return Err(anyhow!("Amount must be positive"));
        }

        let bill_id = Uuid::new_v4();
        let now = Utc::now();

        debug!("Creating bill {} for practice {}", bill_id, user_id);

        let row = json!({
            "id": bill_id.to_string(),
            "user_id": user_id,
            "description": request.description,
            "amount": request.amount,
            "due_date": request.due_date.format("%Y-%m-%d").to_string(),
            "status": BillStatus::Pending.to_string(),
            "paid_at": null,
            "category": request.category,
            "deleted_at": null,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/bills",
            Some(auth_token),
            Some(row),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create bill"));
        }

        let bill: Bill = serde_json::from_value(result[0].clone())?;
        Ok(bill)
    }

    pub async fn list_bills(
        &self,
        user_id: &str,
        query: BillQuery,
        auth_token: &str,
    ) -> Result<Vec<Bill>> {
        let mut query_parts = vec![
            format!("user_id=eq.{}", user_id),
            "deleted_at=is.null".to_string(),
        ];

        // overdue=true narrows to pending bills past their due date
        if query.overdue == Some(true) {
            let today = Utc::now().date_naive();
            query_parts.push(format!("status=eq.{}", BillStatus::Pending));
            query_parts.push(format!("due_date=lt.{}", today.format("%Y-%m-%d")));
        } else if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }

        let limit = query.limit.unwrap_or(50).clamp(1, 200);
        let offset = query.offset.unwrap_or(0).max(0);

        let path = format!(
            "/rest/v1/bills?{}&order=due_date.asc&limit={}&offset={}",
            query_parts.join("&"), limit, offset
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let bills: Vec<Bill> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(bills)
    }

    pub async fn get_bill(
        &self,
        user_id: &str,
        bill_id: &str,
        auth_token: &str,
    ) -> Result<Bill> {
        let path = format!(
            "/rest/v1/bills?id=eq.{}&user_id=eq.{}&deleted_at=is.null",
            bill_id, user_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Bill not found"));
        }

        let bill: Bill = serde_json::from_value(result[0].clone())?;
        Ok(bill)
    }

    pub async fn mark_as_paid(
        &self,
        user_id: &str,
        bill_id: &str,
        auth_token: &str,
    ) -> Result<Bill> {
        let bill = self.get_bill(user_id, bill_id, auth_token).await?;

        if bill.status == BillStatus::Paid {
            return Err(anyhow!("Bill is already paid"));
        }

        debug!("Marking bill {} as paid", bill_id);

        let now = Utc::now();
        let path = format!(
            "/rest/v1/bills?id=eq.{}&user_id=eq.{}",
            bill_id, user_id
        );
        let update = json!({
            "status": BillStatus::Paid.to_string(),
            "paid_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Bill not found"));
        }

        let bill: Bill = serde_json::from_value(result[0].clone())?;
        Ok(bill)
    }

    /// Flags every pending bill past its due date as overdue.
    pub async fn refresh_overdue(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> Result<Vec<Bill>> {
        let today = Utc::now().date_naive();
        let path = format!(
            "/rest/v1/bills?user_id=eq.{}&deleted_at=is.null&status=eq.{}&due_date=lt.{}",
            user_id,
            BillStatus::Pending,
            today.format("%Y-%m-%d"),
        );
        let update = json!({
            "status": BillStatus::Overdue.to_string(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let bills: Vec<Bill> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(bills)
    }

    pub async fn delete_bill(
        &self,
        user_id: &str,
        bill_id: &str,
        auth_token: &str,
    ) -> Result<()> {
        self.get_bill(user_id, bill_id, auth_token).await?;

        let path = format!(
            "/rest/v1/bills?id=eq.{}&user_id=eq.{}",
            bill_id, user_id
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
}
