use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::loans::engine::{Frequency, LoanQuote};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "loan_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Pending,
    Active,
    Paid,
    Rejected,
}

/// Loan record. `outstanding` is a cached balance; progress metrics are
/// always recomputed from the payment ledger.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Loan {
    pub id: Uuid,
    pub borrower_id: Uuid,
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

const LOAN_COLUMNS: &str = "id, borrower_id, principal, installment_count, frequency, \
     interest_rate, installment_value, outstanding, status, requested_at, approved_at";

impl Loan {
    /// Schedule anchor: approval date, falling back to the request date.
    pub fn anchor_date(&self) -> Date {
        self.approved_at.unwrap_or(self.requested_at).date()
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Loan>> {
        let sql = format!("SELECT {LOAN_COLUMNS} FROM loans WHERE id = $1");
        sqlx::query_as::<_, Loan>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// The borrower's loan in {Pending, Active}, if any. At most one exists.
    pub async fn find_live_by_borrower(
        db: &PgPool,
        borrower_id: Uuid,
    ) -> sqlx::Result<Option<Loan>> {
        let sql = format!(
            "SELECT {LOAN_COLUMNS} FROM loans \
             WHERE borrower_id = $1 AND status IN ('pending', 'active')"
        );
        sqlx::query_as::<_, Loan>(&sql)
            .bind(borrower_id)
            .fetch_optional(db)
            .await
    }

    pub async fn find_active_by_borrower(
        db: &PgPool,
        borrower_id: Uuid,
    ) -> sqlx::Result<Option<Loan>> {
        let sql = format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE borrower_id = $1 AND status = 'active'"
        );
        sqlx::query_as::<_, Loan>(&sql)
            .bind(borrower_id)
            .fetch_optional(db)
            .await
    }

    pub async fn list_paid_by_borrower(db: &PgPool, borrower_id: Uuid) -> sqlx::Result<Vec<Loan>> {
        let sql = format!(
            "SELECT {LOAN_COLUMNS} FROM loans \
             WHERE borrower_id = $1 AND status = 'paid' ORDER BY requested_at DESC"
        );
        sqlx::query_as::<_, Loan>(&sql)
            .bind(borrower_id)
            .fetch_all(db)
            .await
    }

    pub async fn list(db: &PgPool) -> sqlx::Result<Vec<Loan>> {
        let sql = format!("SELECT {LOAN_COLUMNS} FROM loans ORDER BY requested_at DESC");
        sqlx::query_as::<_, Loan>(&sql).fetch_all(db).await
    }

    /// Persist a priced request as a Pending loan owing the full obligation.
    pub async fn create(db: &PgPool, borrower_id: Uuid, quote: &LoanQuote) -> sqlx::Result<Loan> {
        let sql = format!(
            "INSERT INTO loans (borrower_id, principal, installment_count, frequency, \
             interest_rate, installment_value, outstanding, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending') \
             RETURNING {LOAN_COLUMNS}"
        );
        sqlx::query_as::<_, Loan>(&sql)
            .bind(borrower_id)
            .bind(quote.principal)
            .bind(quote.installment_count)
            .bind(quote.frequency)
            .bind(quote.rate)
            .bind(quote.installment_value)
            .bind(quote.total_obligation)
            .fetch_one(db)
            .await
    }

    pub async fn approve(db: &PgPool, id: Uuid, at: OffsetDateTime) -> sqlx::Result<Loan> {
        let sql = format!(
            "UPDATE loans SET status = 'active', approved_at = $2 \
             WHERE id = $1 RETURNING {LOAN_COLUMNS}"
        );
        sqlx::query_as::<_, Loan>(&sql)
            .bind(id)
            .bind(at)
            .fetch_one(db)
            .await
    }

    pub async fn set_status(db: &PgPool, id: Uuid, status: LoanStatus) -> sqlx::Result<()> {
        sqlx::query("UPDATE loans SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn set_outstanding(db: &PgPool, id: Uuid, outstanding: i64) -> sqlx::Result<()> {
        sqlx::query("UPDATE loans SET outstanding = $2 WHERE id = $1")
            .bind(id)
            .bind(outstanding)
            .execute(db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn loan(approved: Option<OffsetDateTime>) -> Loan {
        Loan {
            id: Uuid::new_v4(),
            borrower_id: Uuid::new_v4(),
            principal: 1_000_000,
            installment_count: 10,
            frequency: Frequency::Monthly,
            interest_rate: 0.025,
            installment_value: 125_000,
            outstanding: 1_250_000,
            status: LoanStatus::Active,
            requested_at: datetime!(2024-01-01 09:30 UTC),
            approved_at: approved,
        }
    }

    #[test]
    fn anchor_prefers_approval_date() {
        let l = loan(Some(datetime!(2024-02-10 12:00 UTC)));
        assert_eq!(l.anchor_date(), time::macros::date!(2024 - 02 - 10));
    }

    #[test]
    fn anchor_falls_back_to_request_date() {
        let l = loan(None);
        assert_eq!(l.anchor_date(), time::macros::date!(2024 - 01 - 01));
    }
}
