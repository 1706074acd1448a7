use chrono::{DateTime, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    Active,
    Terminated,
    Completed,
}

impl ContractStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContractStatus::Active => "active",
            ContractStatus::Terminated => "terminated",
            ContractStatus::Completed => "completed",
        }
    }

    /// Terminated and Completed admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, ContractStatus::Terminated | ContractStatus::Completed)
    }
}

impl std::fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The only contract terms the product sells.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "u32", into = "u32")]
pub enum ContractDuration {
    Six,
    Twelve,
}

impl ContractDuration {
    pub fn months(self) -> u32 {
        match self {
            ContractDuration::Six => 6,
            ContractDuration::Twelve => 12,
        }
    }

    pub fn from_months(months: u32) -> Option<Self> {
        match months {
            6 => Some(ContractDuration::Six),
            12 => Some(ContractDuration::Twelve),
            _ => None,
        }
    }
}

impl TryFrom<u32> for ContractDuration {
    type Error = String;

    fn try_from(months: u32) -> Result<Self, Self::Error> {
        ContractDuration::from_months(months)
            .ok_or_else(|| format!("unsupported duration: {months} months"))
    }
}

impl From<ContractDuration> for u32 {
    fn from(duration: ContractDuration) -> u32 {
        duration.months()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: Uuid,
    pub client_id: Uuid,
    pub policy_no: Option<String>,
    pub total_amount: Decimal,
    pub commission_rate: Decimal,
    pub duration: ContractDuration,
    pub sign_date: NaiveDate,
    pub termination_penalty: Decimal,
    pub status: ContractStatus,
    pub created_at: DateTime<Utc>,
}

impl Contract {
    pub fn end_date(&self) -> NaiveDate {
        self.sign_date
            .checked_add_months(Months::new(self.duration.months()))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Date-derived display status. The stored field is never written from
    /// here: an Active contract past its end date reads as Completed while
    /// the store still says Active.
    pub fn effective_status(&self, today: NaiveDate) -> ContractStatus {
        if self.status == ContractStatus::Active && today > self.end_date() {
            ContractStatus::Completed
        } else {
            self.status
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InstallmentStatus {
    Pending,
    Paid,
    Cancelled,
}

impl InstallmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InstallmentStatus::Pending => "pending",
            InstallmentStatus::Paid => "paid",
            InstallmentStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for InstallmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installment {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub period_number: u32,
    pub due_date: NaiveDate,
    pub amount: Decimal,
    pub status: InstallmentStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RewardKind {
    Automatic,
    Manual,
}

impl RewardKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RewardKind::Automatic => "automatic",
            RewardKind::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reward {
    pub id: Uuid,
    pub contract_id: Option<Uuid>,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub description: String,
    pub kind: RewardKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub id_number: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(sign_date: NaiveDate, duration: ContractDuration) -> Contract {
        Contract {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            policy_no: None,
            total_amount: Decimal::new(100_000, 2),
            commission_rate: Decimal::new(24, 2),
            duration,
            sign_date,
            termination_penalty: Decimal::ZERO,
            status: ContractStatus::Active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn end_date_adds_calendar_months() {
        let c = contract(
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            ContractDuration::Six,
        );
        assert_eq!(c.end_date(), NaiveDate::from_ymd_opt(2025, 7, 15).unwrap());
    }

    #[test]
    fn end_date_clamps_to_shorter_months() {
        let c = contract(
            NaiveDate::from_ymd_opt(2024, 8, 31).unwrap(),
            ContractDuration::Six,
        );
        assert_eq!(c.end_date(), NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
    }

    #[test]
    fn active_contract_past_end_reads_completed() {
        let c = contract(
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            ContractDuration::Twelve,
        );
        let today = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        assert_eq!(c.effective_status(today), ContractStatus::Completed);
        // Stored field untouched.
        assert_eq!(c.status, ContractStatus::Active);
    }

    #[test]
    fn active_contract_on_end_date_still_active() {
        let c = contract(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            ContractDuration::Six,
        );
        assert_eq!(
            c.effective_status(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()),
            ContractStatus::Active
        );
    }

    #[test]
    fn terminated_contract_never_reads_completed() {
        let mut c = contract(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            ContractDuration::Six,
        );
        c.status = ContractStatus::Terminated;
        assert_eq!(
            c.effective_status(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()),
            ContractStatus::Terminated
        );
    }

    #[test]
    fn duration_round_trips_through_months() {
        assert_eq!(ContractDuration::from_months(6), Some(ContractDuration::Six));
        assert_eq!(
            ContractDuration::from_months(12),
            Some(ContractDuration::Twelve)
        );
        assert_eq!(ContractDuration::from_months(9), None);
    }
}
