use chrono::{Months, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use premia_core::ContractDuration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub period: u32,
    pub due_date: NaiveDate,
    pub amount: Decimal,
}

/// The contract's total commission at monetary precision.
pub fn commission_for(total_amount: Decimal, rate: Decimal) -> Decimal {
    (total_amount * rate).round_dp(2)
}

/// Splits a contract's commission into one installment per month of its
/// duration. The first `n - 1` periods each receive the commission divided
/// by the period count and floored to the cent; the final period receives
/// whatever remains, so the schedule always sums to the rounded commission
/// exactly. Period 1 falls one calendar month after the sign date.
///
/// Deterministic and allocation-only: it is run once when a contract is
/// created and never re-run against an existing schedule.
pub fn allocate(
    total_amount: Decimal,
    rate: Decimal,
    duration: ContractDuration,
    sign_date: NaiveDate,
) -> Vec<ScheduleEntry> {
    let commission = commission_for(total_amount, rate);
    if commission <= Decimal::ZERO {
        return Vec::new();
    }

    let periods = duration.months();
    let base = (commission / Decimal::from(periods))
        .round_dp_with_strategy(2, RoundingStrategy::ToNegativeInfinity);

    (1..=periods)
        .map(|period| {
            let amount = if period == periods {
                commission - base * Decimal::from(periods - 1)
            } else {
                base
            };
            ScheduleEntry {
                period,
                due_date: due_date_for(sign_date, period),
                amount,
            }
        })
        .collect()
}

fn due_date_for(sign_date: NaiveDate, period: u32) -> NaiveDate {
    sign_date
        .checked_add_months(Months::new(period))
        .unwrap_or(NaiveDate::MAX)
}
