//! In-memory record store. Backs the engine in tests and embedded use; the
//! gateway swaps in the Postgres implementation behind the same traits.

use std::collections::HashMap;

use anyhow::bail;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use premia_core::store::{ClientStore, ContractStore, InstallmentStore, RewardPatch, RewardStore};
use premia_core::{Client, Contract, ContractStatus, Installment, InstallmentStatus, Reward};

/// All four collections behind one lockset, so the contract-plus-schedule
/// batch insert is atomic the same way a database transaction would be.
#[derive(Default)]
pub struct InMemoryStore {
    clients: RwLock<HashMap<Uuid, Client>>,
    contracts: RwLock<HashMap<Uuid, Contract>>,
    installments: RwLock<HashMap<Uuid, Installment>>,
    rewards: RwLock<HashMap<Uuid, Reward>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientStore for InMemoryStore {
    async fn list(&self) -> anyhow::Result<Vec<Client>> {
        let clients = self.clients.read().await;
        let mut rows: Vec<Client> = clients.values().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Client>> {
        let clients = self.clients.read().await;
        Ok(clients.get(&id).cloned())
    }

    async fn insert(&self, client: Client) -> anyhow::Result<Uuid> {
        let id = client.id;
        let mut clients = self.clients.write().await;
        clients.insert(id, client);
        Ok(id)
    }
}

#[async_trait]
impl ContractStore for InMemoryStore {
    async fn list(&self) -> anyhow::Result<Vec<Contract>> {
        let contracts = self.contracts.read().await;
        let mut rows: Vec<Contract> = contracts.values().cloned().collect();
        rows.sort_by(|a, b| b.sign_date.cmp(&a.sign_date));
        Ok(rows)
    }

    async fn list_for_client(&self, client_id: Uuid) -> anyhow::Result<Vec<Contract>> {
        let contracts = self.contracts.read().await;
        let mut rows: Vec<Contract> = contracts
            .values()
            .filter(|contract| contract.client_id == client_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.sign_date.cmp(&a.sign_date));
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Contract>> {
        let contracts = self.contracts.read().await;
        Ok(contracts.get(&id).cloned())
    }

    async fn insert_with_installments(
        &self,
        contract: Contract,
        installments: Vec<Installment>,
    ) -> anyhow::Result<Uuid> {
        let id = contract.id;
        let mut contract_rows = self.contracts.write().await;
        let mut installment_rows = self.installments.write().await;
        contract_rows.insert(id, contract);
        for installment in installments {
            installment_rows.insert(installment.id, installment);
        }
        Ok(id)
    }

    async fn set_status(&self, id: Uuid, status: ContractStatus) -> anyhow::Result<()> {
        let mut contracts = self.contracts.write().await;
        match contracts.get_mut(&id) {
            Some(contract) => {
                contract.status = status;
                Ok(())
            }
            None => bail!("contract {id} not found"),
        }
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        let mut contracts = self.contracts.write().await;
        if contracts.remove(&id).is_none() {
            bail!("contract {id} not found");
        }
        Ok(())
    }
}

#[async_trait]
impl InstallmentStore for InMemoryStore {
    async fn list_active(&self) -> anyhow::Result<Vec<Installment>> {
        let installments = self.installments.read().await;
        let mut rows: Vec<Installment> = installments
            .values()
            .filter(|installment| installment.status != InstallmentStatus::Cancelled)
            .cloned()
            .collect();
        rows.sort_by_key(|installment| (installment.due_date, installment.period_number));
        Ok(rows)
    }

    async fn list_for_contract(&self, contract_id: Uuid) -> anyhow::Result<Vec<Installment>> {
        let installments = self.installments.read().await;
        let mut rows: Vec<Installment> = installments
            .values()
            .filter(|installment| installment.contract_id == contract_id)
            .cloned()
            .collect();
        rows.sort_by_key(|installment| installment.period_number);
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Installment>> {
        let installments = self.installments.read().await;
        Ok(installments.get(&id).cloned())
    }

    async fn update_status(&self, id: Uuid, status: InstallmentStatus) -> anyhow::Result<()> {
        let mut installments = self.installments.write().await;
        match installments.get_mut(&id) {
            Some(installment) => {
                installment.status = status;
                Ok(())
            }
            None => bail!("installment {id} not found"),
        }
    }

    async fn delete_for_contract(&self, contract_id: Uuid) -> anyhow::Result<()> {
        let mut installments = self.installments.write().await;
        installments.retain(|_, installment| installment.contract_id != contract_id);
        Ok(())
    }
}

#[async_trait]
impl RewardStore for InMemoryStore {
    async fn list(&self) -> anyhow::Result<Vec<Reward>> {
        let rewards = self.rewards.read().await;
        let mut rows: Vec<Reward> = rewards.values().cloned().collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Reward>> {
        let rewards = self.rewards.read().await;
        Ok(rewards.get(&id).cloned())
    }

    async fn insert(&self, reward: Reward) -> anyhow::Result<Uuid> {
        let id = reward.id;
        let mut rewards = self.rewards.write().await;
        rewards.insert(id, reward);
        Ok(id)
    }

    async fn update(&self, id: Uuid, patch: RewardPatch) -> anyhow::Result<()> {
        let mut rewards = self.rewards.write().await;
        match rewards.get_mut(&id) {
            Some(reward) => {
                if let Some(amount) = patch.amount {
                    reward.amount = amount;
                }
                if let Some(date) = patch.date {
                    reward.date = date;
                }
                if let Some(description) = patch.description {
                    reward.description = description;
                }
                Ok(())
            }
            None => bail!("reward {id} not found"),
        }
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        let mut rewards = self.rewards.write().await;
        if rewards.remove(&id).is_none() {
            bail!("reward {id} not found");
        }
        Ok(())
    }

    async fn detach_contract(&self, contract_id: Uuid) -> anyhow::Result<()> {
        let mut rewards = self.rewards.write().await;
        for reward in rewards.values_mut() {
            if reward.contract_id == Some(contract_id) {
                reward.contract_id = None;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use super::*;

    fn installment(contract_id: Uuid, period: u32, due: NaiveDate) -> Installment {
        Installment {
            id: Uuid::new_v4(),
            contract_id,
            period_number: period,
            due_date: due,
            amount: Decimal::new(100, 0),
            status: InstallmentStatus::Pending,
        }
    }

    fn contract(id: Uuid) -> Contract {
        Contract {
            id,
            client_id: Uuid::new_v4(),
            policy_no: None,
            total_amount: Decimal::new(1000, 0),
            commission_rate: Decimal::new(24, 2),
            duration: premia_core::ContractDuration::Six,
            sign_date: date(2025, 1, 1),
            termination_penalty: Decimal::ZERO,
            status: ContractStatus::Active,
            created_at: Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn list_active_excludes_cancelled_and_sorts_by_due_date() {
        let store = InMemoryStore::new();
        let contract_id = Uuid::new_v4();

        let late = installment(contract_id, 2, date(2025, 3, 1));
        let early = installment(contract_id, 1, date(2025, 2, 1));
        let cancelled = installment(contract_id, 3, date(2025, 4, 1));

        store
            .insert_with_installments(
                contract(contract_id),
                vec![late.clone(), early.clone(), cancelled.clone()],
            )
            .await
            .unwrap();
        store
            .update_status(cancelled.id, InstallmentStatus::Cancelled)
            .await
            .unwrap();

        let rows = store.list_active().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, early.id);
        assert_eq!(rows[1].id, late.id);
    }

    #[tokio::test]
    async fn update_status_on_missing_row_fails() {
        let store = InMemoryStore::new();
        let result = store
            .update_status(Uuid::new_v4(), InstallmentStatus::Paid)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn detach_contract_nulls_only_matching_rewards() {
        let store = InMemoryStore::new();
        let contract_id = Uuid::new_v4();
        let other_contract = Uuid::new_v4();

        for linked in [Some(contract_id), Some(other_contract), None] {
            RewardStore::insert(
                &store,
                Reward {
                    id: Uuid::new_v4(),
                    contract_id: linked,
                    amount: Decimal::new(50, 0),
                    date: date(2025, 1, 10),
                    description: "bonus".to_string(),
                    kind: premia_core::RewardKind::Manual,
                    created_at: Utc::now(),
                },
            )
            .await
            .unwrap();
        }

        store.detach_contract(contract_id).await.unwrap();

        let rows = RewardStore::list(&store).await.unwrap();
        assert!(rows.iter().all(|r| r.contract_id != Some(contract_id)));
        assert!(rows.iter().any(|r| r.contract_id == Some(other_contract)));
    }
}
