mod pg;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Result as AnyResult;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use premia_allocation::{ScheduleEntry, allocate, commission_for};
use premia_core::store::{ClientStore, ContractStore, InstallmentStore, RewardPatch, RewardStore};
use premia_core::{
    Client, Contract, ContractDuration, ContractStatus, Error, Installment, Reward,
};
use premia_engine::{
    ContractService, InstallmentLedger, MonthGroup, NewContract, RewardService, StatsService,
    group_by_month,
};
use premia_platform::{
    AllocationPreviewQuery, CreateClientRequest, CreateContractRequest, CreateRewardRequest,
    ServiceConfig, UpdateRewardRequest, connect_database,
};

use crate::pg::PgStore;

#[derive(Clone)]
struct AppState {
    clients: Arc<dyn ClientStore>,
    installments: Arc<dyn InstallmentStore>,
    contracts: ContractService,
    rewards: RewardService,
    stats: StatsService,
}

#[derive(Debug, Clone, Serialize)]
struct ContractView {
    id: Uuid,
    client_id: Uuid,
    policy_no: Option<String>,
    sign_date: NaiveDate,
    total_amount: Decimal,
    commission_rate: Decimal,
    duration_months: u32,
    termination_penalty: Decimal,
    status: ContractStatus,
    effective_status: ContractStatus,
    end_date: NaiveDate,
    created_at: DateTime<Utc>,
}

fn contract_view(contract: Contract, today: NaiveDate) -> ContractView {
    ContractView {
        effective_status: contract.effective_status(today),
        end_date: contract.end_date(),
        id: contract.id,
        client_id: contract.client_id,
        policy_no: contract.policy_no,
        sign_date: contract.sign_date,
        total_amount: contract.total_amount,
        commission_rate: contract.commission_rate,
        duration_months: contract.duration.months(),
        termination_penalty: contract.termination_penalty,
        status: contract.status,
        created_at: contract.created_at,
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateContractResponse {
    contract: ContractView,
    installments: Vec<Installment>,
}

#[derive(Debug, Clone, Serialize)]
struct AllocationPreviewResponse {
    commission: Decimal,
    entries: Vec<ScheduleEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct ContractListQuery {
    client_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
struct ToggleInstallmentResponse {
    id: Uuid,
    status: premia_core::InstallmentStatus,
}

#[derive(Debug, Clone, Serialize)]
struct RewardListResponse {
    items: Vec<Reward>,
    total: Decimal,
    this_month: Decimal,
}

#[derive(Debug, Clone, Serialize)]
struct DashboardStatsResponse {
    expected_this_month: Decimal,
    paid_this_month: Decimal,
    active_contracts: usize,
    upcoming: Vec<Installment>,
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "premia_gateway=info".to_string()),
        )
        .init();

    let config = ServiceConfig::from_env("0.0.0.0:8080")?;
    let pool = connect_database(&config.database_url).await?;

    let store = Arc::new(PgStore::new(pool));
    let clients: Arc<dyn ClientStore> = store.clone();
    let contract_store: Arc<dyn ContractStore> = store.clone();
    let installments: Arc<dyn InstallmentStore> = store.clone();
    let reward_store: Arc<dyn RewardStore> = store.clone();

    let state = AppState {
        contracts: ContractService::new(
            clients.clone(),
            contract_store.clone(),
            installments.clone(),
            reward_store.clone(),
        ),
        rewards: RewardService::new(reward_store),
        stats: StatsService::new(contract_store, installments.clone()),
        clients,
        installments,
    };

    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/clients", get(list_clients).post(create_client))
        .route("/contracts", get(list_contracts).post(create_contract))
        .route("/contracts/preview", get(preview_allocation))
        .route("/contracts/{contract_id}/terminate", post(terminate_contract))
        .route("/contracts/{contract_id}", delete(delete_contract))
        .route("/installments", get(list_installments))
        .route("/installments/by-month", get(list_installments_by_month))
        .route("/installments/{installment_id}/toggle", post(toggle_installment))
        .route("/rewards", get(list_rewards).post(create_reward))
        .route(
            "/rewards/{reward_id}",
            axum::routing::patch(update_reward).delete(delete_reward),
        )
        .route("/dashboard/stats", get(dashboard_stats))
        .with_state(state);

    let addr: SocketAddr = config.http_addr.parse()?;
    info!("gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

fn error_response(err: Error) -> (StatusCode, String) {
    let status = match &err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::TerminalState { .. } => StatusCode::CONFLICT,
        Error::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

fn store_error(err: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

async fn list_clients(
    State(state): State<AppState>,
) -> Result<Json<Vec<Client>>, (StatusCode, String)> {
    let clients = state.clients.list().await.map_err(store_error)?;
    Ok(Json(clients))
}

async fn create_client(
    State(state): State<AppState>,
    Json(payload): Json<CreateClientRequest>,
) -> Result<Json<Client>, (StatusCode, String)> {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "name is required".to_string()));
    }

    let client = Client {
        id: Uuid::new_v4(),
        name,
        phone: payload.phone,
        id_number: payload.id_number,
        note: payload.note,
        created_at: Utc::now(),
    };
    state
        .clients
        .insert(client.clone())
        .await
        .map_err(store_error)?;
    Ok(Json(client))
}

async fn list_contracts(
    State(state): State<AppState>,
    Query(query): Query<ContractListQuery>,
) -> Result<Json<Vec<ContractView>>, (StatusCode, String)> {
    let contracts = match query.client_id {
        Some(client_id) => state.contracts.list_for_client(client_id).await,
        None => state.contracts.list().await,
    }
    .map_err(error_response)?;

    let today = Utc::now().date_naive();
    Ok(Json(
        contracts
            .into_iter()
            .map(|contract| contract_view(contract, today))
            .collect(),
    ))
}

async fn create_contract(
    State(state): State<AppState>,
    Json(payload): Json<CreateContractRequest>,
) -> Result<Json<CreateContractResponse>, (StatusCode, String)> {
    let duration = ContractDuration::from_months(payload.duration_months).ok_or((
        StatusCode::BAD_REQUEST,
        format!("unsupported duration: {} months", payload.duration_months),
    ))?;

    let (contract, installments) = state
        .contracts
        .create(NewContract {
            client_id: payload.client_id,
            policy_no: payload.policy_no.filter(|p| !p.trim().is_empty()),
            total_amount: payload.total_amount,
            commission_rate: payload.commission_rate,
            duration,
            sign_date: payload.sign_date,
            termination_penalty: payload.termination_penalty,
        })
        .await
        .map_err(error_response)?;

    Ok(Json(CreateContractResponse {
        contract: contract_view(contract, Utc::now().date_naive()),
        installments,
    }))
}

async fn preview_allocation(
    Query(query): Query<AllocationPreviewQuery>,
) -> Result<Json<AllocationPreviewResponse>, (StatusCode, String)> {
    let duration = ContractDuration::from_months(query.duration_months).ok_or((
        StatusCode::BAD_REQUEST,
        format!("unsupported duration: {} months", query.duration_months),
    ))?;

    let entries = allocate(
        query.total_amount,
        query.commission_rate,
        duration,
        query.sign_date,
    );
    Ok(Json(AllocationPreviewResponse {
        commission: commission_for(query.total_amount, query.commission_rate),
        entries,
    }))
}

async fn terminate_contract(
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
) -> Result<Json<ContractView>, (StatusCode, String)> {
    let contract = state
        .contracts
        .terminate(contract_id)
        .await
        .map_err(error_response)?;
    Ok(Json(contract_view(contract, Utc::now().date_naive())))
}

async fn delete_contract(
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .contracts
        .delete(contract_id)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_installments(
    State(state): State<AppState>,
) -> Result<Json<Vec<Installment>>, (StatusCode, String)> {
    let installments = state.installments.list_active().await.map_err(store_error)?;
    Ok(Json(installments))
}

async fn list_installments_by_month(
    State(state): State<AppState>,
) -> Result<Json<Vec<MonthGroup>>, (StatusCode, String)> {
    // list_active comes back due-date ascending, so group order is
    // chronological here.
    let installments = state.installments.list_active().await.map_err(store_error)?;
    Ok(Json(group_by_month(&installments)))
}

async fn toggle_installment(
    State(state): State<AppState>,
    Path(installment_id): Path<Uuid>,
) -> Result<Json<ToggleInstallmentResponse>, (StatusCode, String)> {
    let mut ledger = InstallmentLedger::new(state.installments.clone());
    ledger.refresh().await.map_err(error_response)?;
    let status = ledger
        .toggle(installment_id)
        .await
        .map_err(error_response)?;
    Ok(Json(ToggleInstallmentResponse {
        id: installment_id,
        status,
    }))
}

async fn list_rewards(
    State(state): State<AppState>,
) -> Result<Json<RewardListResponse>, (StatusCode, String)> {
    let items = state.rewards.list().await.map_err(error_response)?;
    let summary = state
        .rewards
        .summary(Utc::now().date_naive())
        .await
        .map_err(error_response)?;
    Ok(Json(RewardListResponse {
        items,
        total: summary.total,
        this_month: summary.this_month,
    }))
}

async fn create_reward(
    State(state): State<AppState>,
    Json(payload): Json<CreateRewardRequest>,
) -> Result<Json<Reward>, (StatusCode, String)> {
    let reward = match payload.contract_id {
        Some(contract_id) => {
            state
                .rewards
                .record_automatic(
                    contract_id,
                    payload.amount,
                    payload.date,
                    &payload.description,
                )
                .await
        }
        None => {
            state
                .rewards
                .add_manual(&payload.description, payload.amount, payload.date)
                .await
        }
    }
    .map_err(error_response)?;
    Ok(Json(reward))
}

async fn update_reward(
    State(state): State<AppState>,
    Path(reward_id): Path<Uuid>,
    Json(payload): Json<UpdateRewardRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .rewards
        .update(
            reward_id,
            RewardPatch {
                amount: payload.amount,
                date: payload.date,
                description: payload.description,
            },
        )
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_reward(
    State(state): State<AppState>,
    Path(reward_id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .rewards
        .delete(reward_id)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn dashboard_stats(
    State(state): State<AppState>,
) -> Result<Json<DashboardStatsResponse>, (StatusCode, String)> {
    let (stats, upcoming) = state
        .stats
        .snapshot(Utc::now().date_naive())
        .await
        .map_err(error_response)?;
    Ok(Json(DashboardStatsResponse {
        expected_this_month: stats.expected_this_month,
        paid_this_month: stats.paid_this_month,
        active_contracts: stats.active_contracts,
        upcoming,
    }))
}
