use anyhow::{Result, anyhow};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use chrono::{Utc, NaiveDate, Datelike};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    FinancialTransaction, TransactionKind, TransactionStatus,
    CreateTransactionRequest, TransactionQuery, MonthlySummary,
};

pub struct TransactionService {
    supabase: SupabaseClient,
}

impl TransactionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_transaction(
        &self,
        user_id: &str,
        request: CreateTransactionRequest,
        auth_token: &str,
    ) -> Result<FinancialTransaction> {
        if request.description.trim().is_empty() {
            return Err(anyhow!("Description is required"));
        }
        if request.amount <= 0.0 {
            return Err(anyhow!("Amount must be positive"));
        }

        let transaction_id = Uuid::new_v4();
        let now = Utc::now();
        let occurred_on = request.occurred_on.unwrap_or_else(|| now.date_naive());

        debug!(
            "Creating {} transaction {} for practice {}",
            request.kind, transaction_id, user_id
        );

        let row = json!({
            "id": transaction_id.to_string(),
            "user_id": user_id,
            "patient_id": request.patient_id.map(|id| id.to_string()),
            "description": request.description,
            "amount": request.amount,
            "kind": request.kind.to_string(),
            "category": request.category,
            "status": TransactionStatus::Pending.to_string(),
            "occurred_on": occurred_on.format("%Y-%m-%d").to_string(),
            "deleted_at": null,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/financial_transactions",
            Some(auth_token),
            Some(row),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create transaction"));
        }

        let transaction: FinancialTransaction = serde_json::from_value(result[0].clone())?;
        Ok(transaction)
    }

    pub async fn list_transactions(
        &self,
        user_id: &str,
        query: TransactionQuery,
        auth_token: &str,
    ) -> Result<Vec<FinancialTransaction>> {
        let mut query_parts = vec![
            format!("user_id=eq.{}", user_id),
            "deleted_at=is.null".to_string(),
        ];

        if let Some(kind) = query.kind {
            query_parts.push(format!("kind=eq.{}", kind));
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(category) = &query.category {
            query_parts.push(format!("category=eq.{}", urlencoding::encode(category)));
        }
        if let Some(from) = query.from {
            query_parts.push(format!("occurred_on=gte.{}", from.format("%Y-%m-%d")));
        }
        if let Some(to) = query.to {
            query_parts.push(format!("occurred_on=lte.{}", to.format("%Y-%m-%d")));
        }

        let limit = query.limit.unwrap_or(50).clamp(1, 200);
        let offset = query.offset.unwrap_or(0).max(0);

        let path = format!(
            "/rest/v1/financial_transactions?{}&order=occurred_on.desc,created_at.desc&limit={}&offset={}",
            query_parts.join("&"), limit, offset
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let transactions: Vec<FinancialTransaction> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    pub async fn get_transaction(
        &self,
        user_id: &str,
        transaction_id: &str,
        auth_token: &str,
    ) -> Result<FinancialTransaction> {
        let path = format!(
            "/rest/v1/financial_transactions?id=eq.{}&user_id=eq.{}&deleted_at=is.null",
            transaction_id, user_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Transaction not found"));
        }

        let transaction: FinancialTransaction = serde_json::from_value(result[0].clone())?;
        Ok(transaction)
    }

    pub async fn update_status(
        &self,
        user_id: &str,
        transaction_id: &str,
        next: TransactionStatus,
        auth_token: &str,
    ) -> Result<FinancialTransaction> {
        let transaction = self.get_transaction(user_id, transaction_id, auth_token).await?;

        if !transaction.status.can_transition_to(next) {
            return Err(anyhow!(
                "Illegal status transition: {} -> {}",
                transaction.status, next
            ));
        }

        debug!("Transaction {} moves {} -> {}", transaction_id, transaction.status, next);

        let path = format!(
            "/rest/v1/financial_transactions?id=eq.{}&user_id=eq.{}",
            transaction_id, user_id
        );
        let update = json!({
            "status": next.to_string(),
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
            return Err(anyhow!("Transaction not found"));
        }

        let transaction: FinancialTransaction = serde_json::from_value(result[0].clone())?;
        Ok(transaction)
    }

    pub async fn delete_transaction(
        &self,
        user_id: &str,
        transaction_id: &str,
        auth_token: &str,
    ) -> Result<()> {
        self.get_transaction(user_id, transaction_id, auth_token).await?;

        let path = format!(
            "/rest/v1/financial_transactions?id=eq.{}&user_id=eq.{}",
            transaction_id, user_id
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

    /// Sums confirmed transactions inside one calendar month.
    pub async fn monthly_summary(
        &self,
        user_id: &str,
        year: i32,
        month: u32,
        auth_token: &str,
    ) -> Result<MonthlySummary> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| anyhow!("Invalid year/month"))?;
        let next_first = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }.ok_or_else(|| anyhow!("Invalid year/month"))?;

        let path = format!(
            "/rest/v1/financial_transactions?user_id=eq.{}&deleted_at=is.null&status=eq.{}&occurred_on=gte.{}&occurred_on=lt.{}",
            user_id,
            TransactionStatus::Confirmed,
            first.format("%Y-%m-%d"),
            next_first.format("%Y-%m-%d"),
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let transactions: Vec<FinancialTransaction> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        let income: f64 = transactions.iter()
            .filter(|t| t.kind == TransactionKind::Income)
            .map(|t| t.amount)
            .sum();
        let expense: f64 = transactions.iter()
            .filter(|t| t.kind == TransactionKind::Expense)
            .map(|t| t.amount)
            .sum();

        Ok(MonthlySummary {
            year: first.year(),
            month: first.month(),
            income,
            expense,
            balance: income - expense,
        })
    }
}
