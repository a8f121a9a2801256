use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate, Datelike};
use std::fmt;

// ==============================================================================
// FINANCIAL TRANSACTIONS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub description: String,
    pub amount: f64,
    pub kind: TransactionKind,
    pub category: Option<String>,
    pub status: TransactionStatus,
    pub occurred_on: NaiveDate,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Income => write!(f, "income"),
            TransactionKind::Expense => write!(f, "expense"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl TransactionStatus {
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!((self, next), (Pending, Confirmed) | (Pending, Cancelled))
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Confirmed => write!(f, "confirmed"),
            TransactionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransactionRequest {
    pub patient_id: Option<Uuid>,
    pub description: String,
    pub amount: f64,
    pub kind: TransactionKind,
    pub category: Option<String>,
    pub occurred_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionQuery {
    pub kind: Option<TransactionKind>,
    pub status: Option<TransactionStatus>,
    pub category: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTransactionStatusRequest {
    pub status: TransactionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryQuery {
    pub year: i32,
    pub month: u32,
}

/// Confirmed income/expense totals for one month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

// ==============================================================================
// RECURRING TRANSACTIONS
// ==============================================================================

/// A ledger entry template that implies future entries at a fixed cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub description: String,
    pub amount: f64,
    pub kind: TransactionKind,
    pub category: Option<String>,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub next_execution_date: NaiveDate,
    pub active: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// The execution date after `from`. Month and year steps clamp the
    /// day-of-month (Jan 31 -> Feb 28, Feb 29 -> Feb 28 next year).
    pub fn next_execution(&self, from: NaiveDate) -> NaiveDate {
        match self {
            Frequency::Daily => from + chrono::Duration::days(1),
            Frequency::Weekly => from + chrono::Duration::days(7),
            Frequency::Monthly => {
                let (year, month) = if from.month() == 12 {
                    (from.year() + 1, 1)
                } else {
                    (from.year(), from.month() + 1)
                };
                clamped_date(year, month, from.day())
            }
            Frequency::Yearly => clamped_date(from.year() + 1, from.month(), from.day()),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::Monthly => write!(f, "monthly"),
            Frequency::Yearly => write!(f, "yearly"),
        }
    }
}

fn clamped_date(year: i32, month: u32, day: u32) -> NaiveDate {
    (0..4)
        .filter_map(|back| {
            day.checked_sub(back)
                .and_then(|d| NaiveDate::from_ymd_opt(year, month, d))
        })
        .next()
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, month, 1).unwrap())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecurringRequest {
    pub description: String,
    pub amount: f64,
    pub kind: TransactionKind,
    pub category: Option<String>,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
}

// ==============================================================================
// BILLS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    pub id: Uuid,
    pub user_id: Uuid,
    pub description: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub status: BillStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bill {
    /// A pending bill past its due date is overdue.
    pub fn is_overdue_at(&self, today: NaiveDate) -> bool {
        self.status == BillStatus::Pending && self.due_date < today
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    Pending,
    Paid,
    Overdue,
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillStatus::Pending => write!(f, "pending"),
            BillStatus::Paid => write!(f, "paid"),
            BillStatus::Overdue => write!(f, "overdue"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBillRequest {
    pub description: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillQuery {
    pub status: Option<BillStatus>,
    pub overdue: Option<bool>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum BillingError {
    #[error("Record not found")]
    NotFound,

    #[error("Illegal status transition")]
    IllegalTransition,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_daily_and_weekly_steps() {
        assert_eq!(Frequency::Daily.next_execution(d(2026, 8, 23)), d(2026, 8, 24));
        assert_eq!(Frequency::Weekly.next_execution(d(2026, 8, 23)), d(2026, 8, 30));
    }

    #[test]
    fn test_monthly_step_plain() {
        assert_eq!(Frequency::Monthly.next_execution(d(2026, 3, 15)), d(2026, 4, 15));
    }

    #[test]
    fn test_monthly_step_clamps_short_months() {
        assert_eq!(Frequency::Monthly.next_execution(d(2026, 1, 31)), d(2026, 2, 28));
        assert_eq!(Frequency::Monthly.next_execution(d(2028, 1, 31)), d(2028, 2, 29));
        assert_eq!(Frequency::Monthly.next_execution(d(2026, 3, 31)), d(2026, 4, 30));
    }

    #[test]
    fn test_monthly_step_rolls_year() {
        assert_eq!(Frequency::Monthly.next_execution(d(2026, 12, 5)), d(2027, 1, 5));
    }

    #[test]
    fn test_yearly_step_clamps_leap_day() {
        assert_eq!(Frequency::Yearly.next_execution(d(2028, 2, 29)), d(2029, 2, 28));
        assert_eq!(Frequency::Yearly.next_execution(d(2026, 7, 4)), d(2027, 7, 4));
    }

    #[test]
    fn test_bill_overdue_classification() {
        let bill = Bill {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            description: "Electricity".to_string(),
            amount: 430.55,
            due_date: d(2026, 8, 20),
            status: BillStatus::Pending,
            paid_at: None,
            category: None,
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(bill.is_overdue_at(d(2026, 8, 21)));
        assert!(!bill.is_overdue_at(d(2026, 8, 20)));

        let paid = Bill { status: BillStatus::Paid, ..bill };
        assert!(!paid.is_overdue_at(d(2026, 8, 21)));
    }

    #[test]
    fn test_transaction_transitions() {
        use TransactionStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Confirmed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
    }
}
