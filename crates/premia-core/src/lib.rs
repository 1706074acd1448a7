pub mod error;
pub mod models;
pub mod store;

pub use error::{Error, Result};
pub use models::{
    Client, Contract, ContractDuration, ContractStatus, Installment, InstallmentStatus, Reward,
    RewardKind,
};
pub use store::{ClientStore, ContractStore, InstallmentStore, RewardPatch, RewardStore};
