use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::domain::{Tenant, TenantId};
use crate::error::AppError;
use crate::http::ApiResponse;
use crate::mailer::Mailer;
use crate::store::RecordStore;

use super::service::{NewTenant, TenantDirectory, UpdateTenant};

pub fn tenant_router<S, M>(directory: Arc<TenantDirectory<S, M>>) -> Router
where
    S: RecordStore + 'static,
    M: Mailer + 'static,
{
    Router::new()
        .route(
            "/api/v1/tenants",
            get(list_tenants::<S, M>).post(create_tenant::<S, M>),
        )
        .route(
            "/api/v1/tenants/:tenant_id",
            get(get_tenant::<S, M>)
                .put(update_tenant::<S, M>)
                .delete(delete_tenant::<S, M>),
        )
        .with_state(directory)
}

async fn list_tenants<S: RecordStore + 'static, M: Mailer + 'static>(
    State(directory): State<Arc<TenantDirectory<S, M>>>,
) -> Result<Json<ApiResponse<Vec<Tenant>>>, AppError> {
    let tenants = directory.list()?;
    Ok(Json(ApiResponse::list(tenants)))
}

async fn get_tenant<S: RecordStore + 'static, M: Mailer + 'static>(
    State(directory): State<Arc<TenantDirectory<S, M>>>,
    Path(tenant_id): Path<String>,
) -> Result<Json<ApiResponse<Tenant>>, AppError> {
    let tenant = directory.get(&TenantId(tenant_id))?;
    Ok(Json(ApiResponse::ok(tenant)))
}

async fn create_tenant<S: RecordStore + 'static, M: Mailer + 'static>(
    State(directory): State<Arc<TenantDirectory<S, M>>>,
    Json(input): Json<NewTenant>,
) -> Result<Json<ApiResponse<Tenant>>, AppError> {
    let tenant = directory.create(input)?;
    Ok(Json(ApiResponse::ok(tenant)))
}

async fn update_tenant<S: RecordStore + 'static, M: Mailer + 'static>(
    State(directory): State<Arc<TenantDirectory<S, M>>>,
    Path(tenant_id): Path<String>,
    Json(input): Json<UpdateTenant>,
) -> Result<Json<ApiResponse<Tenant>>, AppError> {
    let tenant = directory.update(&TenantId(tenant_id), input)?;
    Ok(Json(ApiResponse::ok(tenant)))
}

async fn delete_tenant<S: RecordStore + 'static, M: Mailer + 'static>(
    State(directory): State<Arc<TenantDirectory<S, M>>>,
    Path(tenant_id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    directory.delete(&TenantId(tenant_id))?;
    Ok(Json(ApiResponse::message("tenant deleted")))
}
