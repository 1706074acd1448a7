pub mod contracts;
pub mod installments;
pub mod rewards;
pub mod stats;

pub use contracts::{ContractService, NewContract};
pub use installments::{InstallmentLedger, MonthGroup, group_by_month};
pub use rewards::{RewardService, RewardSummary, accrued_in_month, total_accrued};
pub use stats::{
    DashboardStats, StatsService, UPCOMING_PREVIEW_LIMIT, compute_stats, upcoming_pending,
};
