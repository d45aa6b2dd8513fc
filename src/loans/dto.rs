use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::loans::engine::Frequency;
use crate::loans::repo::{Loan, LoanStatus};
use crate::loans::schedule::UpcomingInstallment;
use crate::payments::ledger::LoanProgress;

#[derive(Debug, Deserialize)]
pub struct RequestLoanRequest {
    pub principal: i64,
    pub installment_count: i32,
    #[serde(default = "default_frequency")]
    pub frequency: Frequency,
}

fn default_frequency() -> Frequency {
    Frequency::Monthly
}

#[derive(Debug, Serialize)]
pub struct LoanResponse {
    pub id: Uuid,
    pub principal: i64,
    pub installment_count: i32,
    pub frequency: Frequency,
    pub interest_rate: f64,
    pub installment_value: i64,
    pub outstanding: i64,
    pub status: LoanStatus,
    pub requested_at: OffsetDateTime,
    pub approved_at: Option<OffsetDateTime>,
}

impl From<&Loan> for LoanResponse {
    fn from(loan: &Loan) -> Self {
        Self {
            id: loan.id,
            principal: loan.principal,
            installment_count: loan.installment_count,
            frequency: loan.frequency,
            interest_rate: loan.interest_rate,
            installment_value: loan.installment_value,
            outstanding: loan.outstanding,
            status: loan.status,
            requested_at: loan.requested_at,
            approved_at: loan.approved_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActiveLoanView {
    #[serde(flatten)]
    pub loan: LoanResponse,
    pub progress: LoanProgress,
    pub upcoming: Vec<UpcomingInstallment>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub today: Date,
    pub credit_ceiling: i64,
    pub profile_complete: bool,
    pub active_loan: Option<ActiveLoanView>,
    pub pending_loan: Option<LoanResponse>,
    pub history: Vec<LoanResponse>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub decision: Decision,
    /// Collector to assign when the borrower has none yet.
    pub collector_email: Option<String>,
}

/// Row in the admin loan-management table.
#[derive(Debug, Serialize)]
pub struct AdminLoanRow {
    #[serde(flatten)]
    pub loan: LoanResponse,
    pub borrower_name: String,
    pub borrower_email: Option<String>,
    pub total_paid: i64,
    pub balance: i64,
}
