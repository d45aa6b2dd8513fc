use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::loans::repo::{Loan, LoanStatus};
use crate::loans::schedule::installments_covered;
use crate::payments::repo::{NewPayment, Payment, PaymentMethod};

/// Repayment state derived from cumulative payments. Never stored; the
/// ledger recomputes it from fresh reads on every application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoanProgress {
    pub total_paid: i64,
    pub total_obligation: i64,
    pub outstanding: i64,
    pub installments_covered: i64,
    pub progress_percent: i64,
    pub settled: bool,
}

pub fn progress(installment_value: i64, installment_count: i32, total_paid: i64) -> LoanProgress {
    let total_obligation = installment_value * installment_count as i64;
    let progress_percent = if total_obligation > 0 {
        ((total_paid as f64 / total_obligation as f64) * 100.0).round() as i64
    } else {
        0
    };
    LoanProgress {
        total_paid,
        total_obligation,
        outstanding: total_obligation - total_paid,
        installments_covered: installments_covered(installment_value, total_paid),
        progress_percent,
        settled: total_obligation > 0 && total_paid >= total_obligation,
    }
}

/// Payments apply to Active loans only.
pub fn ensure_payable(loan: &Loan) -> Result<(), ApiError> {
    if loan.status != LoanStatus::Active {
        return Err(ApiError::NoActiveLoan);
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct PaymentReceipt {
    pub payment_id: Uuid,
    pub paid: bool,
    pub progress: LoanProgress,
}

/// Record a payment against an Active loan and transition it to Paid once
/// cumulative payments cover the total obligation. Overpayment is accepted;
/// the completion check runs only at the moment the payment is recorded.
pub async fn apply_payment(
    db: &PgPool,
    loan: &Loan,
    collector_id: Option<Uuid>,
    amount: i64,
    method: PaymentMethod,
    notes: Option<String>,
) -> Result<PaymentReceipt, ApiError> {
    ensure_payable(loan)?;
    if amount <= 0 {
        return Err(ApiError::Validation("amount must be positive".into()));
    }

    let payment = Payment::create(
        db,
        &NewPayment {
            loan_id: loan.id,
            borrower_id: loan.borrower_id,
            collector_id,
            amount,
            method,
            notes,
        },
    )
    .await?;

    let total_paid = Payment::total_for_loan(db, loan.id).await?;
    let progress = progress(loan.installment_value, loan.installment_count, total_paid);

    Loan::set_outstanding(db, loan.id, progress.outstanding).await?;
    if progress.settled {
        Loan::set_status(db, loan.id, LoanStatus::Paid).await?;
        info!(loan_id = %loan.id, total_paid, "loan fully repaid");
    }

    info!(
        loan_id = %loan.id,
        payment_id = %payment.id,
        amount,
        covered = progress.installments_covered,
        "payment recorded"
    );

    Ok(PaymentReceipt {
        payment_id: payment.id,
        paid: progress.settled,
        progress,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loans::engine::Frequency;
    use time::macros::datetime;

    fn active_loan(status: LoanStatus) -> Loan {
        Loan {
            id: Uuid::new_v4(),
            borrower_id: Uuid::new_v4(),
            principal: 1_000_000,
            installment_count: 10,
            frequency: Frequency::Monthly,
            interest_rate: 0.025,
            installment_value: 125_000,
            outstanding: 1_250_000,
            status,
            requested_at: datetime!(2024-01-01 09:30 UTC),
            approved_at: Some(datetime!(2024-01-02 10:00 UTC)),
        }
    }

    #[test]
    fn partial_payments_floor_covered_and_round_percent() {
        let p = progress(125_000, 10, 260_000);
        assert_eq!(p.installments_covered, 2);
        assert_eq!(p.progress_percent, 21);
        assert_eq!(p.outstanding, 990_000);
        assert!(!p.settled);
    }

    #[test]
    fn full_repayment_settles_the_loan() {
        assert!(progress(125_000, 10, 1_250_000).settled);
        // Overpayment stays settled; the balance goes negative, not hidden.
        let over = progress(125_000, 10, 1_300_000);
        assert!(over.settled);
        assert_eq!(over.outstanding, -50_000);
    }

    #[test]
    fn zero_obligation_yields_zero_metrics() {
        let p = progress(0, 10, 5_000);
        assert_eq!(p.progress_percent, 0);
        assert_eq!(p.installments_covered, 0);
        assert!(!p.settled);
    }

    #[test]
    fn covered_is_monotone_in_total_paid() {
        let mut last = 0;
        for paid in [0i64, 50_000, 125_000, 260_000, 600_000, 1_250_000] {
            let covered = progress(125_000, 10, paid).installments_covered;
            assert!(covered >= last);
            last = covered;
        }
    }

    #[test]
    fn only_active_loans_accept_payments() {
        assert!(ensure_payable(&active_loan(LoanStatus::Active)).is_ok());
        for status in [LoanStatus::Pending, LoanStatus::Paid, LoanStatus::Rejected] {
            assert!(matches!(
                ensure_payable(&active_loan(status)),
                Err(ApiError::NoActiveLoan)
            ));
        }
    }
}
