use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use premia_core::store::InstallmentStore;
use premia_core::{Error, Installment, InstallmentStatus, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthGroup {
    pub month_label: String,
    pub total_amount: Decimal,
    pub items: Vec<Installment>,
}

/// Groups installments by the calendar month of their due date. Group order
/// follows first appearance in the input; callers wanting chronological
/// groups pre-sort by due date.
pub fn group_by_month(installments: &[Installment]) -> Vec<MonthGroup> {
    let mut groups: Vec<MonthGroup> = Vec::new();
    for installment in installments {
        let label = installment.due_date.format("%Y-%m").to_string();
        match groups.iter_mut().find(|group| group.month_label == label) {
            Some(group) => {
                group.total_amount += installment.amount;
                group.items.push(installment.clone());
            }
            None => groups.push(MonthGroup {
                month_label: label,
                total_amount: installment.amount,
                items: vec![installment.clone()],
            }),
        }
    }
    groups
}

/// A snapshot of the active installments plus the store behind it. Every
/// mutation except `toggle` follows read-after-write: callers re-issue
/// `refresh` instead of patching the snapshot. `toggle` is the one
/// optimistic path and reverts exactly on a failed confirm.
pub struct InstallmentLedger {
    store: Arc<dyn InstallmentStore>,
    items: Vec<Installment>,
}

impl InstallmentLedger {
    pub fn new(store: Arc<dyn InstallmentStore>) -> Self {
        Self {
            store,
            items: Vec::new(),
        }
    }

    pub async fn refresh(&mut self) -> Result<()> {
        self.items = self.store.list_active().await?;
        Ok(())
    }

    pub fn items(&self) -> &[Installment] {
        &self.items
    }

    /// Flips `Pending <-> Paid` in the snapshot immediately, then confirms
    /// against the store. On a store failure the snapshot entry is restored
    /// to its prior status and the failure is surfaced.
    pub async fn toggle(&mut self, id: Uuid) -> Result<InstallmentStatus> {
        let position = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or(Error::NotFound {
                entity: "installment",
                id,
            })?;

        let previous = self.items[position].status;
        let next = match previous {
            InstallmentStatus::Pending => InstallmentStatus::Paid,
            InstallmentStatus::Paid => InstallmentStatus::Pending,
            InstallmentStatus::Cancelled => {
                return Err(Error::TerminalState {
                    entity: "installment",
                    id,
                    status: previous.to_string(),
                });
            }
        };

        self.items[position].status = next;

        if let Err(err) = self.store.update_status(id, next).await {
            self.items[position].status = previous;
            error!(installment = %id, "status update failed: {err:#}");
            return Err(Error::Persistence(err));
        }

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use premia_store::InMemoryStore;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn installment(period: u32, due: NaiveDate, amount: Decimal) -> Installment {
        Installment {
            id: Uuid::new_v4(),
            contract_id: Uuid::new_v4(),
            period_number: period,
            due_date: due,
            amount,
            status: InstallmentStatus::Pending,
        }
    }

    #[test]
    fn groups_preserve_first_seen_order_and_sum() {
        let rows = vec![
            installment(1, date(2025, 3, 5), Decimal::new(4000, 2)),
            installment(2, date(2025, 2, 5), Decimal::new(1050, 2)),
            installment(3, date(2025, 3, 20), Decimal::new(999, 2)),
        ];

        let groups = group_by_month(&rows);

        assert_eq!(groups.len(), 2);
        // March first: group order follows the input, not the calendar.
        assert_eq!(groups[0].month_label, "2025-03");
        assert_eq!(groups[0].total_amount, Decimal::new(4999, 2));
        assert_eq!(groups[0].items.len(), 2);
        assert_eq!(groups[1].month_label, "2025-02");
        assert_eq!(groups[1].total_amount, Decimal::new(1050, 2));
    }

    #[test]
    fn group_sums_round_trip_against_flat_total() {
        let rows: Vec<Installment> = (1..=9)
            .map(|period| {
                installment(
                    period,
                    date(2025, 1 + (period % 4), 10),
                    Decimal::new(333 * i64::from(period), 2),
                )
            })
            .collect();

        let flat: Decimal = rows.iter().map(|row| row.amount).sum();
        let grouped: Decimal = group_by_month(&rows)
            .iter()
            .map(|group| group.total_amount)
            .sum();
        let item_count: usize = group_by_month(&rows)
            .iter()
            .map(|group| group.items.len())
            .sum();

        assert_eq!(grouped, flat);
        assert_eq!(item_count, rows.len());
    }

    #[test]
    fn empty_input_groups_to_nothing() {
        assert!(group_by_month(&[]).is_empty());
    }

    async fn seeded_ledger(rows: Vec<Installment>) -> (InstallmentLedger, Arc<InMemoryStore>) {
        use premia_core::store::ContractStore;
        use premia_core::{Contract, ContractDuration, ContractStatus};

        let store = Arc::new(InMemoryStore::new());
        let contract = Contract {
            id: rows.first().map(|r| r.contract_id).unwrap_or_else(Uuid::new_v4),
            client_id: Uuid::new_v4(),
            policy_no: None,
            total_amount: Decimal::new(1000, 0),
            commission_rate: Decimal::new(24, 2),
            duration: ContractDuration::Six,
            sign_date: date(2025, 1, 1),
            termination_penalty: Decimal::ZERO,
            status: ContractStatus::Active,
            created_at: chrono::Utc::now(),
        };
        store
            .insert_with_installments(contract, rows)
            .await
            .unwrap();

        let mut ledger = InstallmentLedger::new(store.clone());
        ledger.refresh().await.unwrap();
        (ledger, store)
    }

    #[tokio::test]
    async fn toggle_pair_restores_original_state() {
        let row = installment(1, date(2025, 2, 1), Decimal::new(4000, 2));
        let id = row.id;
        let (mut ledger, store) = seeded_ledger(vec![row]).await;

        let before: Decimal = ledger.items().iter().map(|i| i.amount).sum();

        assert_eq!(ledger.toggle(id).await.unwrap(), InstallmentStatus::Paid);
        assert_eq!(ledger.toggle(id).await.unwrap(), InstallmentStatus::Pending);

        let stored = store.get(id).await.unwrap().unwrap();
        assert_eq!(stored.status, InstallmentStatus::Pending);
        let after: Decimal = ledger.items().iter().map(|i| i.amount).sum();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn toggle_unknown_id_reports_not_found() {
        let (mut ledger, _) =
            seeded_ledger(vec![installment(1, date(2025, 2, 1), Decimal::ONE)]).await;
        assert!(matches!(
            ledger.toggle(Uuid::new_v4()).await,
            Err(Error::NotFound { .. })
        ));
    }

    /// Store double whose confirms always fail.
    struct FailingStore;

    #[async_trait]
    impl InstallmentStore for FailingStore {
        async fn list_active(&self) -> anyhow::Result<Vec<Installment>> {
            Ok(Vec::new())
        }
        async fn list_for_contract(&self, _: Uuid) -> anyhow::Result<Vec<Installment>> {
            Ok(Vec::new())
        }
        async fn get(&self, _: Uuid) -> anyhow::Result<Option<Installment>> {
            Ok(None)
        }
        async fn update_status(&self, _: Uuid, _: InstallmentStatus) -> anyhow::Result<()> {
            anyhow::bail!("store unavailable")
        }
        async fn delete_for_contract(&self, _: Uuid) -> anyhow::Result<()> {
            anyhow::bail!("store unavailable")
        }
    }

    #[tokio::test]
    async fn failed_confirm_reverts_the_snapshot() {
        let row = installment(1, date(2025, 2, 1), Decimal::new(4000, 2));
        let id = row.id;

        let mut ledger = InstallmentLedger::new(Arc::new(FailingStore));
        ledger.items = vec![row];

        let result = ledger.toggle(id).await;
        assert!(matches!(result, Err(Error::Persistence(_))));
        // Exact revert: the optimistic flip did not stick.
        assert_eq!(ledger.items()[0].status, InstallmentStatus::Pending);
    }
}
