use anyhow::Result;
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use premia_core::store::{ClientStore, ContractStore, InstallmentStore, RewardPatch, RewardStore};
use premia_core::{
    Client, Contract, ContractDuration, ContractStatus, Installment, InstallmentStatus, Reward,
    RewardKind,
};

/// Postgres-backed record store. One struct serves all four collections so
/// a single pool handle travels through the engine services.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_contract_status(value: &str) -> Result<ContractStatus> {
    match value {
        "active" => Ok(ContractStatus::Active),
        "terminated" => Ok(ContractStatus::Terminated),
        "completed" => Ok(ContractStatus::Completed),
        other => anyhow::bail!("unknown contract status: {other}"),
    }
}

fn parse_installment_status(value: &str) -> Result<InstallmentStatus> {
    match value {
        "pending" => Ok(InstallmentStatus::Pending),
        "paid" => Ok(InstallmentStatus::Paid),
        "cancelled" => Ok(InstallmentStatus::Cancelled),
        other => anyhow::bail!("unknown installment status: {other}"),
    }
}

fn parse_reward_kind(value: &str) -> Result<RewardKind> {
    match value {
        "automatic" => Ok(RewardKind::Automatic),
        "manual" => Ok(RewardKind::Manual),
        other => anyhow::bail!("unknown reward kind: {other}"),
    }
}

fn client_from_row(row: &PgRow) -> Result<Client> {
    Ok(Client {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        id_number: row.try_get("id_number")?,
        note: row.try_get("note")?,
        created_at: row.try_get("created_at")?,
    })
}

fn contract_from_row(row: &PgRow) -> Result<Contract> {
    let status: String = row.try_get("status")?;
    let duration_months: i32 = row.try_get("duration_months")?;
    let duration = ContractDuration::from_months(u32::try_from(duration_months)?)
        .ok_or_else(|| anyhow::anyhow!("unsupported duration: {duration_months} months"))?;

    Ok(Contract {
        id: row.try_get("id")?,
        client_id: row.try_get("client_id")?,
        policy_no: row.try_get("policy_no")?,
        total_amount: row.try_get("total_amount")?,
        commission_rate: row.try_get("commission_rate")?,
        duration,
        sign_date: row.try_get("sign_date")?,
        termination_penalty: row.try_get("termination_penalty")?,
        status: parse_contract_status(&status)?,
        created_at: row.try_get("created_at")?,
    })
}

fn installment_from_row(row: &PgRow) -> Result<Installment> {
    let status: String = row.try_get("status")?;
    let period_number: i32 = row.try_get("period_number")?;

    Ok(Installment {
        id: row.try_get("id")?,
        contract_id: row.try_get("contract_id")?,
        period_number: u32::try_from(period_number)?,
        due_date: row.try_get("due_date")?,
        amount: row.try_get("amount")?,
        status: parse_installment_status(&status)?,
    })
}

fn reward_from_row(row: &PgRow) -> Result<Reward> {
    let kind: String = row.try_get("kind")?;

    Ok(Reward {
        id: row.try_get("id")?,
        contract_id: row.try_get("contract_id")?,
        amount: row.try_get("amount")?,
        date: row.try_get("reward_date")?,
        description: row.try_get("description")?,
        kind: parse_reward_kind(&kind)?,
        created_at: row.try_get("created_at")?,
    })
}

const CONTRACT_COLUMNS: &str = "id, client_id, policy_no, total_amount, commission_rate, \
     duration_months, sign_date, termination_penalty, status, created_at";

const INSTALLMENT_COLUMNS: &str = "id, contract_id, period_number, due_date, amount, status";

const REWARD_COLUMNS: &str = "id, contract_id, amount, reward_date, description, kind, created_at";

#[async_trait]
impl ClientStore for PgStore {
    async fn list(&self) -> Result<Vec<Client>> {
        let rows = sqlx::query(
            "SELECT id, name, phone, id_number, note, created_at FROM clients ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(client_from_row).collect()
    }

    async fn get(&self, id: Uuid) -> Result<Option<Client>> {
        let row = sqlx::query(
            "SELECT id, name, phone, id_number, note, created_at FROM clients WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(client_from_row).transpose()
    }

    async fn insert(&self, client: Client) -> Result<Uuid> {
        sqlx::query(
            r#"
            INSERT INTO clients (id, name, phone, id_number, note, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(client.id)
        .bind(&client.name)
        .bind(&client.phone)
        .bind(&client.id_number)
        .bind(&client.note)
        .bind(client.created_at)
        .execute(&self.pool)
        .await?;
        Ok(client.id)
    }
}

#[async_trait]
impl ContractStore for PgStore {
    async fn list(&self) -> Result<Vec<Contract>> {
        let rows = sqlx::query(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts ORDER BY sign_date DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(contract_from_row).collect()
    }

    async fn list_for_client(&self, client_id: Uuid) -> Result<Vec<Contract>> {
        let rows = sqlx::query(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE client_id = $1 ORDER BY sign_date DESC"
        ))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(contract_from_row).collect()
    }

    async fn get(&self, id: Uuid) -> Result<Option<Contract>> {
        let row = sqlx::query(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(contract_from_row).transpose()
    }

    async fn insert_with_installments(
        &self,
        contract: Contract,
        installments: Vec<Installment>,
    ) -> Result<Uuid> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO contracts (
                id, client_id, policy_no, total_amount, commission_rate,
                duration_months, sign_date, termination_penalty, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(contract.id)
        .bind(contract.client_id)
        .bind(&contract.policy_no)
        .bind(contract.total_amount)
        .bind(contract.commission_rate)
        .bind(i32::try_from(contract.duration.months())?)
        .bind(contract.sign_date)
        .bind(contract.termination_penalty)
        .bind(contract.status.as_str())
        .bind(contract.created_at)
        .execute(&mut *tx)
        .await?;

        for installment in &installments {
            sqlx::query(
                r#"
                INSERT INTO installments (
                    id, contract_id, period_number, due_date, amount, status
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(installment.id)
            .bind(installment.contract_id)
            .bind(i32::try_from(installment.period_number)?)
            .bind(installment.due_date)
            .bind(installment.amount)
            .bind(installment.status.as_str())
            .execute(&mut *tx)
            .await?;
        }

        // Whole batch or nothing.
        tx.commit().await?;
        Ok(contract.id)
    }

    async fn set_status(&self, id: Uuid, status: ContractStatus) -> Result<()> {
        let result = sqlx::query("UPDATE contracts SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            anyhow::bail!("contract {id} not found");
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM contracts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            anyhow::bail!("contract {id} not found");
        }
        Ok(())
    }
}

#[async_trait]
impl InstallmentStore for PgStore {
    async fn list_active(&self) -> Result<Vec<Installment>> {
        let rows = sqlx::query(&format!(
            "SELECT {INSTALLMENT_COLUMNS} FROM installments WHERE status <> 'cancelled' \
             ORDER BY due_date ASC, period_number ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(installment_from_row).collect()
    }

    async fn list_for_contract(&self, contract_id: Uuid) -> Result<Vec<Installment>> {
        let rows = sqlx::query(&format!(
            "SELECT {INSTALLMENT_COLUMNS} FROM installments WHERE contract_id = $1 \
             ORDER BY period_number ASC"
        ))
        .bind(contract_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(installment_from_row).collect()
    }

    async fn get(&self, id: Uuid) -> Result<Option<Installment>> {
        let row = sqlx::query(&format!(
            "SELECT {INSTALLMENT_COLUMNS} FROM installments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(installment_from_row).transpose()
    }

    async fn update_status(&self, id: Uuid, status: InstallmentStatus) -> Result<()> {
        let result = sqlx::query("UPDATE installments SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            anyhow::bail!("installment {id} not found");
        }
        Ok(())
    }

    async fn delete_for_contract(&self, contract_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM installments WHERE contract_id = $1")
            .bind(contract_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RewardStore for PgStore {
    async fn list(&self) -> Result<Vec<Reward>> {
        let rows = sqlx::query(&format!(
            "SELECT {REWARD_COLUMNS} FROM agent_rewards ORDER BY reward_date DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(reward_from_row).collect()
    }

    async fn get(&self, id: Uuid) -> Result<Option<Reward>> {
        let row = sqlx::query(&format!(
            "SELECT {REWARD_COLUMNS} FROM agent_rewards WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(reward_from_row).transpose()
    }

    async fn insert(&self, reward: Reward) -> Result<Uuid> {
        sqlx::query(
            r#"
            INSERT INTO agent_rewards (
                id, contract_id, amount, reward_date, description, kind, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(reward.id)
        .bind(reward.contract_id)
        .bind(reward.amount)
        .bind(reward.date)
        .bind(&reward.description)
        .bind(reward.kind.as_str())
        .bind(reward.created_at)
        .execute(&self.pool)
        .await?;
        Ok(reward.id)
    }

    async fn update(&self, id: Uuid, patch: RewardPatch) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE agent_rewards
            SET amount = COALESCE($2, amount),
                reward_date = COALESCE($3, reward_date),
                description = COALESCE($4, description)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(patch.amount)
        .bind(patch.date)
        .bind(patch.description)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            anyhow::bail!("reward {id} not found");
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM agent_rewards WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            anyhow::bail!("reward {id} not found");
        }
        Ok(())
    }

    async fn detach_contract(&self, contract_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE agent_rewards SET contract_id = NULL WHERE contract_id = $1")
            .bind(contract_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
