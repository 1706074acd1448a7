use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use premia_core::store::{RewardPatch, RewardStore};
use premia_core::{Error, Result, Reward, RewardKind};

/// All-time accrual across both reward kinds.
pub fn total_accrued(rewards: &[Reward]) -> Decimal {
    rewards.iter().map(|reward| reward.amount).sum()
}

/// Accrual restricted to rewards dated in the given calendar month.
pub fn accrued_in_month(rewards: &[Reward], year: i32, month: u32) -> Decimal {
    rewards
        .iter()
        .filter(|reward| reward.date.year() == year && reward.date.month() == month)
        .map(|reward| reward.amount)
        .sum()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardSummary {
    pub total: Decimal,
    pub this_month: Decimal,
}

#[derive(Clone)]
pub struct RewardService {
    rewards: Arc<dyn RewardStore>,
}

impl RewardService {
    pub fn new(rewards: Arc<dyn RewardStore>) -> Self {
        Self { rewards }
    }

    /// Freestanding reward entered by hand; not attached to any contract.
    pub async fn add_manual(
        &self,
        description: &str,
        amount: Decimal,
        date: NaiveDate,
    ) -> Result<Reward> {
        let description = description.trim();
        if description.is_empty() {
            return Err(Error::Validation("description is required".into()));
        }
        if amount <= Decimal::ZERO {
            return Err(Error::Validation("amount must be positive".into()));
        }

        let reward = Reward {
            id: Uuid::new_v4(),
            contract_id: None,
            amount,
            date,
            description: description.to_string(),
            kind: RewardKind::Manual,
            created_at: Utc::now(),
        };
        self.rewards.insert(reward.clone()).await?;
        info!(reward = %reward.id, "manual reward recorded");
        Ok(reward)
    }

    /// Insert path for the external payment trigger that credits commission
    /// on installment payment events.
    pub async fn record_automatic(
        &self,
        contract_id: Uuid,
        amount: Decimal,
        date: NaiveDate,
        description: &str,
    ) -> Result<Reward> {
        if amount <= Decimal::ZERO {
            return Err(Error::Validation("amount must be positive".into()));
        }

        let reward = Reward {
            id: Uuid::new_v4(),
            contract_id: Some(contract_id),
            amount,
            date,
            description: description.trim().to_string(),
            kind: RewardKind::Automatic,
            created_at: Utc::now(),
        };
        self.rewards.insert(reward.clone()).await?;
        info!(reward = %reward.id, contract = %contract_id, "automatic reward recorded");
        Ok(reward)
    }

    pub async fn update(&self, id: Uuid, patch: RewardPatch) -> Result<()> {
        if self.rewards.get(id).await?.is_none() {
            return Err(Error::NotFound {
                entity: "reward",
                id,
            });
        }
        if let Some(amount) = patch.amount {
            if amount <= Decimal::ZERO {
                return Err(Error::Validation("amount must be positive".into()));
            }
        }
        if let Some(description) = &patch.description {
            if description.trim().is_empty() {
                return Err(Error::Validation("description is required".into()));
            }
        }

        self.rewards.update(id, patch).await?;
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if self.rewards.get(id).await?.is_none() {
            return Err(Error::NotFound {
                entity: "reward",
                id,
            });
        }
        self.rewards.delete(id).await?;
        info!(reward = %id, "reward deleted");
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<Reward>> {
        Ok(self.rewards.list().await?)
    }

    pub async fn summary(&self, today: NaiveDate) -> Result<RewardSummary> {
        let rewards = self.rewards.list().await?;
        Ok(RewardSummary {
            total: total_accrued(&rewards),
            this_month: accrued_in_month(&rewards, today.year(), today.month()),
        })
    }
}
