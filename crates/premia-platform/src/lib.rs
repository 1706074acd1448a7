pub mod config;
pub mod contracts;
pub mod db;

pub use config::ServiceConfig;
pub use contracts::{
    AllocationPreviewQuery, CreateClientRequest, CreateContractRequest, CreateRewardRequest,
    UpdateRewardRequest,
};
pub use db::connect_database;
