use serde::Serialize;
use time::{Date, Duration, Month};

use crate::loans::engine::Frequency;

/// How many upcoming installments the dashboard surfaces.
pub const DEFAULT_PROJECTION: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpcomingInstallment {
    pub number: i32,
    pub due_date: Date,
    pub amount_due: i64,
}

/// Whole installments already covered by cumulative payments.
pub fn installments_covered(installment_value: i64, total_paid: i64) -> i64 {
    if installment_value > 0 {
        total_paid / installment_value
    } else {
        0
    }
}

/// Due date of installment `n`, anchored at the loan's approval date.
/// Monthly cadence uses calendar months, not fixed 30-day blocks.
pub fn due_date(anchor: Date, frequency: Frequency, n: i32) -> Date {
    match frequency {
        Frequency::Daily => anchor + Duration::days(n as i64),
        Frequency::Weekly => anchor + Duration::weeks(n as i64),
        Frequency::Biweekly => anchor + Duration::days(15 * n as i64),
        Frequency::Monthly => add_months(anchor, n),
    }
}

fn add_months(date: Date, months: i32) -> Date {
    let total = date.year() * 12 + (date.month() as i32 - 1) + months;
    let year = total.div_euclid(12);
    let month = Month::try_from((total.rem_euclid(12) + 1) as u8).expect("month index in 1..=12");
    let day = date.day().min(time::util::days_in_year_month(year, month));
    Date::from_calendar_date(year, month, day).expect("clamped day is valid")
}

/// Read-only projection of the next due installments. A partial payment is
/// carried forward as a reduced amount on the first entry only.
pub fn project_upcoming(
    installment_value: i64,
    installment_count: i32,
    frequency: Frequency,
    anchor: Date,
    total_paid: i64,
    max_count: usize,
) -> Vec<UpcomingInstallment> {
    let covered = installments_covered(installment_value, total_paid);
    let first = covered + 1;

    let mut upcoming = Vec::new();
    let mut number = first;
    while upcoming.len() < max_count && number <= installment_count as i64 {
        let amount_due = if number == first && installment_value > 0 {
            installment_value - total_paid % installment_value
        } else {
            installment_value
        };
        upcoming.push(UpcomingInstallment {
            number: number as i32,
            due_date: due_date(anchor, frequency, number as i32),
            amount_due,
        });
        number += 1;
    }
    upcoming
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn first_weekly_installment_falls_a_week_after_approval() {
        let upcoming = project_upcoming(
            100_000,
            10,
            Frequency::Weekly,
            date!(2024 - 01 - 01),
            0,
            DEFAULT_PROJECTION,
        );
        assert_eq!(upcoming[0].number, 1);
        assert_eq!(upcoming[0].due_date, date!(2024 - 01 - 08));
        assert_eq!(upcoming[1].due_date, date!(2024 - 01 - 15));
        assert_eq!(upcoming.len(), 3);
    }

    #[test]
    fn biweekly_uses_fifteen_day_blocks() {
        assert_eq!(
            due_date(date!(2024 - 03 - 01), Frequency::Biweekly, 2),
            date!(2024 - 03 - 31)
        );
    }

    #[test]
    fn monthly_arithmetic_is_calendar_based_with_day_clamp() {
        assert_eq!(
            due_date(date!(2024 - 01 - 31), Frequency::Monthly, 1),
            date!(2024 - 02 - 29)
        );
        assert_eq!(
            due_date(date!(2023 - 01 - 31), Frequency::Monthly, 1),
            date!(2023 - 02 - 28)
        );
        assert_eq!(
            due_date(date!(2024 - 11 - 30), Frequency::Monthly, 3),
            date!(2025 - 02 - 28)
        );
    }

    #[test]
    fn partial_payment_reduces_only_the_next_amount() {
        // 260,000 paid on 125,000 installments: two covered, 10,000 carried.
        let upcoming = project_upcoming(
            125_000,
            10,
            Frequency::Monthly,
            date!(2024 - 01 - 15),
            260_000,
            DEFAULT_PROJECTION,
        );
        assert_eq!(upcoming[0].number, 3);
        assert_eq!(upcoming[0].amount_due, 115_000);
        assert_eq!(upcoming[1].amount_due, 125_000);
        assert_eq!(upcoming[2].amount_due, 125_000);
    }

    #[test]
    fn exact_coverage_shows_a_full_next_installment() {
        let upcoming = project_upcoming(
            125_000,
            10,
            Frequency::Monthly,
            date!(2024 - 01 - 15),
            250_000,
            DEFAULT_PROJECTION,
        );
        assert_eq!(upcoming[0].number, 3);
        assert_eq!(upcoming[0].amount_due, 125_000);
    }

    #[test]
    fn projection_stops_at_the_last_installment() {
        let upcoming = project_upcoming(
            50_000,
            4,
            Frequency::Monthly,
            date!(2024 - 06 - 01),
            150_000,
            DEFAULT_PROJECTION,
        );
        // Three covered, only installment 4 remains.
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].number, 4);
    }

    #[test]
    fn fully_paid_loan_projects_nothing() {
        let upcoming = project_upcoming(
            50_000,
            4,
            Frequency::Monthly,
            date!(2024 - 06 - 01),
            200_000,
            DEFAULT_PROJECTION,
        );
        assert!(upcoming.is_empty());
    }

    #[test]
    fn projection_is_idempotent() {
        let run = || {
            project_upcoming(
                125_000,
                10,
                Frequency::Weekly,
                date!(2024 - 01 - 01),
                260_000,
                DEFAULT_PROJECTION,
            )
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn zero_installment_value_does_not_divide() {
        let upcoming = project_upcoming(
            0,
            5,
            Frequency::Monthly,
            date!(2024 - 01 - 01),
            10_000,
            DEFAULT_PROJECTION,
        );
        // Covered treated as zero, no modulo adjustment.
        assert_eq!(upcoming[0].number, 1);
        assert_eq!(upcoming[0].amount_due, 0);
    }
}
