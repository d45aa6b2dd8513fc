use serde::{Deserialize, Serialize};

use crate::config::CreditPolicy;
use crate::error::ApiError;

/// Installment cadence. The per-period factor converts the nominal monthly
/// rate into equivalent monthly periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "loan_frequency", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

impl Frequency {
    pub fn monthly_factor(self) -> f64 {
        match self {
            Frequency::Daily => 1.0 / 30.0,
            Frequency::Weekly => 1.0 / 4.0,
            Frequency::Biweekly => 1.0 / 2.0,
            Frequency::Monthly => 1.0,
        }
    }
}

/// Priced loan request: a flat simple-interest charge spread over equal
/// installments, rounded to whole currency units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanQuote {
    pub principal: i64,
    pub installment_count: i32,
    pub frequency: Frequency,
    pub rate: f64,
    pub total_interest: i64,
    pub total_obligation: i64,
    pub installment_value: i64,
}

/// Price a loan request against the borrower's credit ceiling.
///
/// Interest is flat, not compound: `principal * rate * equivalent_months`,
/// where sub-monthly frequencies scale the installment count down by the
/// period factor.
pub fn quote(
    policy: &CreditPolicy,
    employed: bool,
    principal: i64,
    installment_count: i32,
    frequency: Frequency,
) -> Result<LoanQuote, ApiError> {
    if principal <= 0 {
        return Err(ApiError::Validation("principal must be positive".into()));
    }
    if installment_count <= 0 {
        return Err(ApiError::Validation(
            "installment count must be positive".into(),
        ));
    }

    let ceiling = policy.ceiling_for(employed);
    if principal > ceiling {
        return Err(ApiError::LimitExceeded {
            requested: principal,
            ceiling,
        });
    }

    let factor = frequency.monthly_factor();
    let equivalent_months = if factor < 1.0 {
        installment_count as f64 * factor
    } else {
        installment_count as f64
    };
    let total_interest = (principal as f64 * policy.monthly_rate * equivalent_months).round() as i64;
    let total_obligation = principal + total_interest;
    let installment_value =
        (total_obligation as f64 / installment_count as f64).round() as i64;

    Ok(LoanQuote {
        principal,
        installment_count,
        frequency,
        rate: policy.monthly_rate,
        total_interest,
        total_obligation,
        installment_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CreditPolicy {
        CreditPolicy::default()
    }

    #[test]
    fn monthly_ten_installments_on_a_million() {
        let q = quote(&policy(), true, 1_000_000, 10, Frequency::Monthly).unwrap();
        assert_eq!(q.total_interest, 250_000);
        assert_eq!(q.total_obligation, 1_250_000);
        assert_eq!(q.installment_value, 125_000);
    }

    #[test]
    fn weekly_installments_scale_interest_down() {
        // Four weekly installments span one equivalent month.
        let q = quote(&policy(), false, 400_000, 4, Frequency::Weekly).unwrap();
        assert_eq!(q.total_interest, 10_000);
        assert_eq!(q.installment_value, 102_500);
    }

    #[test]
    fn thirty_daily_installments_equal_one_month_of_interest() {
        let q = quote(&policy(), false, 300_000, 30, Frequency::Daily).unwrap();
        assert_eq!(q.total_interest, 7_500);
    }

    #[test]
    fn principal_above_ceiling_is_rejected() {
        let err = quote(&policy(), false, 1_500_001, 10, Frequency::Monthly).unwrap_err();
        assert!(matches!(
            err,
            ApiError::LimitExceeded {
                requested: 1_500_001,
                ceiling: 1_500_000
            }
        ));
        // The employed tier accepts the same principal.
        assert!(quote(&policy(), true, 1_500_001, 10, Frequency::Monthly).is_ok());
    }

    #[test]
    fn non_positive_inputs_are_invalid() {
        assert!(matches!(
            quote(&policy(), true, 0, 10, Frequency::Monthly),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            quote(&policy(), true, -5, 10, Frequency::Monthly),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            quote(&policy(), true, 100_000, 0, Frequency::Monthly),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn obligation_always_covers_principal() {
        for &(principal, count, freq) in &[
            (1_000i64, 1, Frequency::Monthly),
            (50_000, 6, Frequency::Weekly),
            (1_500_000, 24, Frequency::Biweekly),
            (900_000, 15, Frequency::Daily),
            (5_000_000, 36, Frequency::Monthly),
        ] {
            let q = quote(&policy(), true, principal, count, freq).unwrap();
            assert!(q.total_interest >= 0);
            assert!(
                q.installment_value * q.installment_count as i64 >= principal,
                "installments must cover principal for {principal}/{count}"
            );
        }
    }
}
