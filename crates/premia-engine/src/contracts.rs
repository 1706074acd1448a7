use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use premia_allocation::allocate;
use premia_core::store::{ClientStore, ContractStore, InstallmentStore, RewardStore};
use premia_core::{
    Contract, ContractDuration, ContractStatus, Error, Installment, InstallmentStatus, Result,
};

#[derive(Debug, Clone)]
pub struct NewContract {
    pub client_id: Uuid,
    pub policy_no: Option<String>,
    pub total_amount: Decimal,
    pub commission_rate: Decimal,
    pub duration: ContractDuration,
    pub sign_date: NaiveDate,
    pub termination_penalty: Decimal,
}

/// Contract lifecycle: creation with its installment schedule, termination,
/// deletion with cascade. All reads go back to the store; nothing is cached
/// here.
#[derive(Clone)]
pub struct ContractService {
    clients: Arc<dyn ClientStore>,
    contracts: Arc<dyn ContractStore>,
    installments: Arc<dyn InstallmentStore>,
    rewards: Arc<dyn RewardStore>,
}

impl ContractService {
    pub fn new(
        clients: Arc<dyn ClientStore>,
        contracts: Arc<dyn ContractStore>,
        installments: Arc<dyn InstallmentStore>,
        rewards: Arc<dyn RewardStore>,
    ) -> Self {
        Self {
            clients,
            contracts,
            installments,
            rewards,
        }
    }

    /// Validates the request, allocates the schedule, and submits the
    /// contract plus all of its installments as one batch.
    pub async fn create(&self, request: NewContract) -> Result<(Contract, Vec<Installment>)> {
        if request.total_amount <= Decimal::ZERO {
            return Err(Error::Validation("total_amount must be positive".into()));
        }
        if request.commission_rate < Decimal::ZERO {
            return Err(Error::Validation(
                "commission_rate must be non-negative".into(),
            ));
        }
        if self.clients.get(request.client_id).await?.is_none() {
            return Err(Error::Validation(format!(
                "client {} does not exist",
                request.client_id
            )));
        }

        let contract_id = Uuid::new_v4();
        let schedule = allocate(
            request.total_amount,
            request.commission_rate,
            request.duration,
            request.sign_date,
        );
        let installments: Vec<Installment> = schedule
            .into_iter()
            .map(|entry| Installment {
                id: Uuid::new_v4(),
                contract_id,
                period_number: entry.period,
                due_date: entry.due_date,
                amount: entry.amount,
                status: InstallmentStatus::Pending,
            })
            .collect();

        let contract = Contract {
            id: contract_id,
            client_id: request.client_id,
            policy_no: request.policy_no,
            total_amount: request.total_amount,
            commission_rate: request.commission_rate,
            duration: request.duration,
            sign_date: request.sign_date,
            termination_penalty: request.termination_penalty,
            status: ContractStatus::Active,
            created_at: Utc::now(),
        };

        self.contracts
            .insert_with_installments(contract.clone(), installments.clone())
            .await?;

        info!(
            contract = %contract_id,
            periods = installments.len(),
            "contract created"
        );
        Ok((contract, installments))
    }

    /// `Active -> Terminated`, irreversible. Still-pending installments of
    /// the contract are cancelled here; paid rows are history and stay.
    pub async fn terminate(&self, id: Uuid) -> Result<Contract> {
        let Some(mut contract) = self.contracts.get(id).await? else {
            return Err(Error::NotFound {
                entity: "contract",
                id,
            });
        };
        if contract.status.is_terminal() {
            return Err(Error::TerminalState {
                entity: "contract",
                id,
                status: contract.status.to_string(),
            });
        }

        self.contracts
            .set_status(id, ContractStatus::Terminated)
            .await?;
        for installment in self.installments.list_for_contract(id).await? {
            if installment.status == InstallmentStatus::Pending {
                self.installments
                    .update_status(installment.id, InstallmentStatus::Cancelled)
                    .await?;
            }
        }

        contract.status = ContractStatus::Terminated;
        info!(contract = %id, "contract terminated");
        Ok(contract)
    }

    /// Removes the contract and everything it owns: installments are
    /// hard-deleted, reward references are nulled so reward history
    /// survives.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if self.contracts.get(id).await?.is_none() {
            return Err(Error::NotFound {
                entity: "contract",
                id,
            });
        }

        self.installments.delete_for_contract(id).await?;
        self.rewards.detach_contract(id).await?;
        self.contracts.delete(id).await?;

        info!(contract = %id, "contract deleted");
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Contract> {
        self.contracts
            .get(id)
            .await?
            .ok_or(Error::NotFound {
                entity: "contract",
                id,
            })
    }

    pub async fn list(&self) -> Result<Vec<Contract>> {
        Ok(self.contracts.list().await?)
    }

    pub async fn list_for_client(&self, client_id: Uuid) -> Result<Vec<Contract>> {
        Ok(self.contracts.list_for_client(client_id).await?)
    }
}
