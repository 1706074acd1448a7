use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateClientRequest {
    pub name: String,
    pub phone: Option<String>,
    pub id_number: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContractRequest {
    pub client_id: Uuid,
    pub policy_no: Option<String>,
    pub sign_date: NaiveDate,
    pub total_amount: Decimal,
    #[serde(default = "default_commission_rate")]
    pub commission_rate: Decimal,
    pub duration_months: u32,
    #[serde(default)]
    pub termination_penalty: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationPreviewQuery {
    pub total_amount: Decimal,
    pub commission_rate: Decimal,
    pub duration_months: u32,
    pub sign_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRewardRequest {
    pub description: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    /// Present only when an external payment trigger credits a contract.
    pub contract_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRewardRequest {
    pub amount: Option<Decimal>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
}

fn default_commission_rate() -> Decimal {
    // The product's standard commission rate, prefilled like the intake form.
    Decimal::new(24, 2)
}
