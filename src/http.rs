use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use serde_json::json;

use crate::mailer::Mailer;
use crate::store::RecordStore;
use crate::workflows::billing::{invoice_router, BillingService};
use crate::workflows::contracts::{contract_router, ContractService};
use crate::workflows::moderation::{request_router, ModerationService};
use crate::workflows::occupancy::{room_router, OccupancyLedger};
use crate::workflows::tenants::{tenant_router, TenantDirectory};

/// Uniform envelope for every API payload: `success` always, `data` on
/// success, `message` for confirmations and errors, `count` on list
/// responses.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            count: None,
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            count: None,
        }
    }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn list(items: Vec<T>) -> Self {
        let count = items.len();
        Self {
            success: true,
            data: Some(items),
            message: None,
            count: Some(count),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub readiness: Arc<AtomicBool>,
    pub metrics: Arc<PrometheusHandle>,
}

/// Assemble the full API surface over one shared store and mailer. Billing
/// takes the configured default due day; everything else derives its
/// collaborators from the store.
pub fn app_router<S, M>(store: Arc<S>, mailer: Arc<M>, due_day: u8) -> Router
where
    S: RecordStore + 'static,
    M: Mailer + 'static,
{
    let ledger = Arc::new(OccupancyLedger::new(store.clone()));
    let directory = Arc::new(TenantDirectory::new(store.clone(), mailer.clone()));
    let contracts = Arc::new(ContractService::new(store.clone()));
    let billing = Arc::new(BillingService::with_due_day(
        store.clone(),
        mailer,
        due_day,
    ));
    let moderation = Arc::new(ModerationService::new(store));

    Router::new()
        .merge(room_router(ledger))
        .merge(tenant_router(directory))
        .merge(contract_router(contracts))
        .merge(invoice_router(billing))
        .merge(request_router(moderation))
}

pub async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_envelope_carries_the_count() {
        let response = ApiResponse::list(vec![1, 2, 3]);
        assert!(response.success);
        assert_eq!(response.count, Some(3));
    }

    #[test]
    fn message_envelope_has_no_data() {
        let response: ApiResponse<()> = ApiResponse::message("done");
        assert!(response.success);
        assert!(response.data.is_none());
        assert_eq!(response.message.as_deref(), Some("done"));
    }
}
