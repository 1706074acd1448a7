use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use premia_core::store::{ContractStore, InstallmentStore};
use premia_core::{Contract, ContractStatus, Installment, InstallmentStatus, Result};

/// How many nearest-due pending installments the dashboard previews.
pub const UPCOMING_PREVIEW_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub expected_this_month: Decimal,
    pub paid_this_month: Decimal,
    pub active_contracts: usize,
}

/// Reporting snapshot over the current state of the book.
///
/// `active_contracts` counts the persisted status field, not the
/// date-derived display status: a contract past its end date that was never
/// explicitly terminated still counts here while reading as Completed in
/// list views.
pub fn compute_stats(
    contracts: &[Contract],
    installments: &[Installment],
    today: NaiveDate,
) -> DashboardStats {
    let in_current_month = |installment: &&Installment| {
        installment.due_date.year() == today.year()
            && installment.due_date.month() == today.month()
            && installment.status != InstallmentStatus::Cancelled
    };

    let expected_this_month = installments
        .iter()
        .filter(in_current_month)
        .map(|installment| installment.amount)
        .sum();
    let paid_this_month = installments
        .iter()
        .filter(in_current_month)
        .filter(|installment| installment.status == InstallmentStatus::Paid)
        .map(|installment| installment.amount)
        .sum();
    let active_contracts = contracts
        .iter()
        .filter(|contract| contract.status == ContractStatus::Active)
        .count();

    DashboardStats {
        expected_this_month,
        paid_this_month,
        active_contracts,
    }
}

/// The nearest-due pending installments, earliest first, capped at `limit`.
pub fn upcoming_pending(installments: &[Installment], limit: usize) -> Vec<Installment> {
    let mut pending: Vec<Installment> = installments
        .iter()
        .filter(|installment| installment.status == InstallmentStatus::Pending)
        .cloned()
        .collect();
    pending.sort_by_key(|installment| (installment.due_date, installment.period_number));
    pending.truncate(limit);
    pending
}

#[derive(Clone)]
pub struct StatsService {
    contracts: Arc<dyn ContractStore>,
    installments: Arc<dyn InstallmentStore>,
}

impl StatsService {
    pub fn new(contracts: Arc<dyn ContractStore>, installments: Arc<dyn InstallmentStore>) -> Self {
        Self {
            contracts,
            installments,
        }
    }

    pub async fn snapshot(&self, today: NaiveDate) -> Result<(DashboardStats, Vec<Installment>)> {
        let contracts = self.contracts.list().await?;
        let installments = self.installments.list_active().await?;
        let stats = compute_stats(&contracts, &installments, today);
        let upcoming = upcoming_pending(&installments, UPCOMING_PREVIEW_LIMIT);
        Ok((stats, upcoming))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use premia_core::ContractDuration;
    use uuid::Uuid;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn contract(status: ContractStatus, sign_date: NaiveDate) -> Contract {
        Contract {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            policy_no: None,
            total_amount: Decimal::new(1000, 0),
            commission_rate: Decimal::new(24, 2),
            duration: ContractDuration::Twelve,
            sign_date,
            termination_penalty: Decimal::ZERO,
            status,
            created_at: Utc::now(),
        }
    }

    fn installment(due: NaiveDate, amount: i64, status: InstallmentStatus) -> Installment {
        Installment {
            id: Uuid::new_v4(),
            contract_id: Uuid::new_v4(),
            period_number: 1,
            due_date: due,
            amount: Decimal::new(amount, 2),
            status,
        }
    }

    #[test]
    fn month_window_sums_expected_and_paid() {
        let today = date(2025, 7, 15);
        let rows = vec![
            installment(date(2025, 7, 1), 40_00, InstallmentStatus::Pending),
            installment(date(2025, 7, 20), 35_00, InstallmentStatus::Paid),
            installment(date(2025, 7, 25), 10_00, InstallmentStatus::Cancelled),
            installment(date(2025, 6, 30), 99_00, InstallmentStatus::Paid),
            installment(date(2025, 8, 1), 12_00, InstallmentStatus::Pending),
        ];

        let stats = compute_stats(&[], &rows, today);
        // Cancelled and out-of-month rows are excluded from both figures.
        assert_eq!(stats.expected_this_month, Decimal::new(75_00, 2));
        assert_eq!(stats.paid_this_month, Decimal::new(35_00, 2));
    }

    #[test]
    fn active_count_uses_persisted_status_not_derived() {
        // Signed 13 months ago against today: the 12-month term has lapsed
        // but nobody terminated it.
        let today = date(2025, 7, 2);
        let lapsed = contract(ContractStatus::Active, date(2024, 6, 1));
        let terminated = contract(ContractStatus::Terminated, date(2025, 1, 1));
        let contracts = vec![lapsed.clone(), terminated];

        let stats = compute_stats(&contracts, &[], today);

        // Both facts hold at once: the display query derives Completed...
        assert_eq!(lapsed.effective_status(today), ContractStatus::Completed);
        // ...and the dashboard still counts the persisted Active row.
        assert_eq!(stats.active_contracts, 1);
    }

    #[test]
    fn upcoming_preview_sorts_and_caps() {
        let rows = vec![
            installment(date(2025, 9, 1), 10_00, InstallmentStatus::Pending),
            installment(date(2025, 7, 1), 10_00, InstallmentStatus::Pending),
            installment(date(2025, 6, 1), 10_00, InstallmentStatus::Paid),
            installment(date(2025, 8, 1), 10_00, InstallmentStatus::Pending),
            installment(date(2025, 10, 1), 10_00, InstallmentStatus::Pending),
        ];

        let preview = upcoming_pending(&rows, UPCOMING_PREVIEW_LIMIT);

        assert_eq!(preview.len(), 3);
        assert_eq!(preview[0].due_date, date(2025, 7, 1));
        assert_eq!(preview[1].due_date, date(2025, 8, 1));
        assert_eq!(preview[2].due_date, date(2025, 9, 1));
        assert!(
            preview
                .iter()
                .all(|row| row.status == InstallmentStatus::Pending)
        );
    }

    #[test]
    fn empty_book_reports_zeroes() {
        let stats = compute_stats(&[], &[], date(2025, 7, 1));
        assert_eq!(stats.expected_this_month, Decimal::ZERO);
        assert_eq!(stats.paid_this_month, Decimal::ZERO);
        assert_eq!(stats.active_contracts, 0);
    }
}
