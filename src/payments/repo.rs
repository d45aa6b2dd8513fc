use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Transfer,
}

/// Immutable capture record: who paid, how much, and which collector took it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub borrower_id: Uuid,
    pub collector_id: Option<Uuid>,
    pub amount: i64,
    pub method: PaymentMethod,
    pub notes: Option<String>,
    pub paid_at: OffsetDateTime,
}

#[derive(Debug)]
pub struct NewPayment {
    pub loan_id: Uuid,
    pub borrower_id: Uuid,
    pub collector_id: Option<Uuid>,
    pub amount: i64,
    pub method: PaymentMethod,
    pub notes: Option<String>,
}

const PAYMENT_COLUMNS: &str =
    "id, loan_id, borrower_id, collector_id, amount, method, notes, paid_at";

impl Payment {
    pub async fn create(db: &PgPool, new: &NewPayment) -> sqlx::Result<Payment> {
        let sql = format!(
            "INSERT INTO payments (loan_id, borrower_id, collector_id, amount, method, notes) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {PAYMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&sql)
            .bind(new.loan_id)
            .bind(new.borrower_id)
            .bind(new.collector_id)
            .bind(new.amount)
            .bind(new.method)
            .bind(&new.notes)
            .fetch_one(db)
            .await
    }

    pub async fn list_for_loan(db: &PgPool, loan_id: Uuid) -> sqlx::Result<Vec<Payment>> {
        let sql =
            format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE loan_id = $1 ORDER BY paid_at");
        sqlx::query_as::<_, Payment>(&sql)
            .bind(loan_id)
            .fetch_all(db)
            .await
    }

    /// Cumulative amount paid against a loan.
    pub async fn total_for_loan(db: &PgPool, loan_id: Uuid) -> sqlx::Result<i64> {
        let row = sqlx::query(
            "SELECT CAST(COALESCE(SUM(amount), 0) AS BIGINT) AS total \
             FROM payments WHERE loan_id = $1",
        )
        .bind(loan_id)
        .fetch_one(db)
        .await?;
        row.try_get("total")
    }

    /// Payment totals for every loan, keyed by loan id. Loans with no
    /// payments are absent.
    pub async fn totals_by_loan(db: &PgPool) -> sqlx::Result<HashMap<Uuid, i64>> {
        let rows = sqlx::query(
            "SELECT loan_id, CAST(SUM(amount) AS BIGINT) AS total \
             FROM payments GROUP BY loan_id",
        )
        .fetch_all(db)
        .await?;
        let mut totals = HashMap::with_capacity(rows.len());
        for row in rows {
            totals.insert(row.try_get("loan_id")?, row.try_get("total")?);
        }
        Ok(totals)
    }
}
