use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Client, Contract, ContractStatus, Installment, InstallmentStatus, Reward};

/// Partial-field update for a reward. `None` leaves the field as stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewardPatch {
    pub amount: Option<Decimal>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
}

#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Ordered by creation time, newest first.
    async fn list(&self) -> anyhow::Result<Vec<Client>>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Client>>;
    async fn insert(&self, client: Client) -> anyhow::Result<Uuid>;
}

#[async_trait]
pub trait ContractStore: Send + Sync {
    /// Ordered by sign date, newest first.
    async fn list(&self) -> anyhow::Result<Vec<Contract>>;
    async fn list_for_client(&self, client_id: Uuid) -> anyhow::Result<Vec<Contract>>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Contract>>;
    /// The contract and its whole schedule are one logical batch: a backend
    /// that cannot apply every row must fail the call wholesale.
    async fn insert_with_installments(
        &self,
        contract: Contract,
        installments: Vec<Installment>,
    ) -> anyhow::Result<Uuid>;
    async fn set_status(&self, id: Uuid, status: ContractStatus) -> anyhow::Result<()>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<()>;
}

#[async_trait]
pub trait InstallmentStore: Send + Sync {
    /// Everything except cancelled rows, ordered by due date ascending.
    async fn list_active(&self) -> anyhow::Result<Vec<Installment>>;
    async fn list_for_contract(&self, contract_id: Uuid) -> anyhow::Result<Vec<Installment>>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Installment>>;
    async fn update_status(&self, id: Uuid, status: InstallmentStatus) -> anyhow::Result<()>;
    async fn delete_for_contract(&self, contract_id: Uuid) -> anyhow::Result<()>;
}

#[async_trait]
pub trait RewardStore: Send + Sync {
    /// Ordered by reward date, newest first.
    async fn list(&self) -> anyhow::Result<Vec<Reward>>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Reward>>;
    async fn insert(&self, reward: Reward) -> anyhow::Result<Uuid>;
    async fn update(&self, id: Uuid, patch: RewardPatch) -> anyhow::Result<()>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<()>;
    /// Null out the contract reference on every reward pointing at
    /// `contract_id`. Used by the delete cascade so reward history survives
    /// contract removal.
    async fn detach_contract(&self, contract_id: Uuid) -> anyhow::Result<()>;
}
