use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;

use crate::domain::{Contract, ContractId, ContractStatus, TenantId};
use crate::error::AppError;
use crate::http::ApiResponse;
use crate::store::RecordStore;

use super::service::{ContractService, NewContract, UpdateContract};

#[derive(Debug, Deserialize)]
struct StatusChange {
    status: ContractStatus,
}

pub fn contract_router<S>(service: Arc<ContractService<S>>) -> Router
where
    S: RecordStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/contracts",
            get(list_contracts::<S>).post(create_contract::<S>),
        )
        .route(
            "/api/v1/contracts/:contract_id",
            get(get_contract::<S>)
                .put(update_contract::<S>)
                .delete(delete_contract::<S>),
        )
        .route(
            "/api/v1/contracts/tenant/:tenant_id",
            get(contracts_for_tenant::<S>),
        )
        .route(
            "/api/v1/contracts/:contract_id/sign-admin",
            put(sign_by_admin::<S>),
        )
        .route(
            "/api/v1/contracts/:contract_id/sign-tenant",
            put(sign_by_tenant::<S>),
        )
        .route("/api/v1/contracts/:contract_id/status", put(set_status::<S>))
        .with_state(service)
}

async fn list_contracts<S: RecordStore>(
    State(service): State<Arc<ContractService<S>>>,
) -> Result<Json<ApiResponse<Vec<Contract>>>, AppError> {
    let contracts = service.list()?;
    Ok(Json(ApiResponse::list(contracts)))
}

async fn get_contract<S: RecordStore>(
    State(service): State<Arc<ContractService<S>>>,
    Path(contract_id): Path<String>,
) -> Result<Json<ApiResponse<Contract>>, AppError> {
    let contract = service.get(&ContractId(contract_id))?;
    Ok(Json(ApiResponse::ok(contract)))
}

async fn contracts_for_tenant<S: RecordStore>(
    State(service): State<Arc<ContractService<S>>>,
    Path(tenant_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Contract>>>, AppError> {
    let contracts = service.list_for_tenant(&TenantId(tenant_id))?;
    Ok(Json(ApiResponse::list(contracts)))
}

async fn create_contract<S: RecordStore>(
    State(service): State<Arc<ContractService<S>>>,
    Json(input): Json<NewContract>,
) -> Result<Json<ApiResponse<Contract>>, AppError> {
    let contract = service.create(input)?;
    Ok(Json(ApiResponse::ok(contract)))
}

async fn update_contract<S: RecordStore>(
    State(service): State<Arc<ContractService<S>>>,
    Path(contract_id): Path<String>,
    Json(input): Json<UpdateContract>,
) -> Result<Json<ApiResponse<Contract>>, AppError> {
    let contract = service.update(&ContractId(contract_id), input)?;
    Ok(Json(ApiResponse::ok(contract)))
}

async fn delete_contract<S: RecordStore>(
    State(service): State<Arc<ContractService<S>>>,
    Path(contract_id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    service.delete(&ContractId(contract_id))?;
    Ok(Json(ApiResponse::message("contract deleted")))
}

async fn sign_by_admin<S: RecordStore>(
    State(service): State<Arc<ContractService<S>>>,
    Path(contract_id): Path<String>,
) -> Result<Json<ApiResponse<Contract>>, AppError> {
    let contract = service.sign_by_admin(&ContractId(contract_id))?;
    Ok(Json(ApiResponse::ok(contract)))
}

async fn sign_by_tenant<S: RecordStore>(
    State(service): State<Arc<ContractService<S>>>,
    Path(contract_id): Path<String>,
) -> Result<Json<ApiResponse<Contract>>, AppError> {
    let contract = service.sign_by_tenant(&ContractId(contract_id))?;
    Ok(Json(ApiResponse::ok(contract)))
}

async fn set_status<S: RecordStore>(
    State(service): State<Arc<ContractService<S>>>,
    Path(contract_id): Path<String>,
    Json(change): Json<StatusChange>,
) -> Result<Json<ApiResponse<Contract>>, AppError> {
    let contract = service.set_status(&ContractId(contract_id), change.status)?;
    Ok(Json(ApiResponse::ok(contract)))
}
