use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{Local, NaiveDate};
use serde::Deserialize;

use crate::domain::{Invoice, InvoiceId, TenantId};
use crate::error::AppError;
use crate::http::ApiResponse;
use crate::mailer::Mailer;
use crate::store::RecordStore;

use super::service::{
    BillingService, BulkDraftReport, NewInvoice, SendOutcome, UpdateInvoice,
};

#[derive(Debug, Default, Deserialize)]
struct BulkDraftRequest {
    /// Billing date for the run; defaults to the server's current date.
    #[serde(default)]
    today: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
struct PaymentRequest {
    #[serde(default)]
    payment_method: Option<String>,
}

pub fn invoice_router<S, M>(service: Arc<BillingService<S, M>>) -> Router
where
    S: RecordStore + 'static,
    M: Mailer + 'static,
{
    Router::new()
        .route(
            "/api/v1/invoices",
            get(list_invoices::<S, M>).post(create_invoice::<S, M>),
        )
        .route(
            "/api/v1/invoices/:invoice_id",
            get(get_invoice::<S, M>)
                .put(update_invoice::<S, M>)
                .delete(delete_invoice::<S, M>),
        )
        .route(
            "/api/v1/invoices/tenant/:tenant_id",
            get(invoices_for_tenant::<S, M>),
        )
        .route("/api/v1/invoices/bulk-draft", post(bulk_draft::<S, M>))
        .route("/api/v1/invoices/:invoice_id/pay", put(pay_invoice::<S, M>))
        .route(
            "/api/v1/invoices/:invoice_id/unpay",
            put(unpay_invoice::<S, M>),
        )
        .route(
            "/api/v1/invoices/:invoice_id/send",
            post(send_invoice::<S, M>),
        )
        .with_state(service)
}

async fn list_invoices<S: RecordStore + 'static, M: Mailer + 'static>(
    State(service): State<Arc<BillingService<S, M>>>,
) -> Result<Json<ApiResponse<Vec<Invoice>>>, AppError> {
    let invoices = service.list()?;
    Ok(Json(ApiResponse::list(invoices)))
}

async fn get_invoice<S: RecordStore + 'static, M: Mailer + 'static>(
    State(service): State<Arc<BillingService<S, M>>>,
    Path(invoice_id): Path<String>,
) -> Result<Json<ApiResponse<Invoice>>, AppError> {
    let invoice = service.get(&InvoiceId(invoice_id))?;
    Ok(Json(ApiResponse::ok(invoice)))
}

async fn invoices_for_tenant<S: RecordStore + 'static, M: Mailer + 'static>(
    State(service): State<Arc<BillingService<S, M>>>,
    Path(tenant_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Invoice>>>, AppError> {
    let invoices = service.list_for_tenant(&TenantId(tenant_id))?;
    Ok(Json(ApiResponse::list(invoices)))
}

async fn create_invoice<S: RecordStore + 'static, M: Mailer + 'static>(
    State(service): State<Arc<BillingService<S, M>>>,
    Json(input): Json<NewInvoice>,
) -> Result<Json<ApiResponse<Invoice>>, AppError> {
    let invoice = service.create_invoice(input)?;
    Ok(Json(ApiResponse::ok(invoice)))
}

async fn update_invoice<S: RecordStore + 'static, M: Mailer + 'static>(
    State(service): State<Arc<BillingService<S, M>>>,
    Path(invoice_id): Path<String>,
    Json(input): Json<UpdateInvoice>,
) -> Result<Json<ApiResponse<Invoice>>, AppError> {
    let invoice = service.update(&InvoiceId(invoice_id), input)?;
    Ok(Json(ApiResponse::ok(invoice)))
}

async fn delete_invoice<S: RecordStore + 'static, M: Mailer + 'static>(
    State(service): State<Arc<BillingService<S, M>>>,
    Path(invoice_id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    service.delete(&InvoiceId(invoice_id))?;
    Ok(Json(ApiResponse::message("invoice deleted")))
}

async fn bulk_draft<S: RecordStore + 'static, M: Mailer + 'static>(
    State(service): State<Arc<BillingService<S, M>>>,
    request: Option<Json<BulkDraftRequest>>,
) -> Result<Json<ApiResponse<BulkDraftReport>>, AppError> {
    let request = request.map(|Json(inner)| inner).unwrap_or_default();
    let today = request.today.unwrap_or_else(|| Local::now().date_naive());
    let report = service.generate_bulk_drafts(today)?;
    Ok(Json(ApiResponse::ok(report)))
}

async fn pay_invoice<S: RecordStore + 'static, M: Mailer + 'static>(
    State(service): State<Arc<BillingService<S, M>>>,
    Path(invoice_id): Path<String>,
    request: Option<Json<PaymentRequest>>,
) -> Result<Json<ApiResponse<Invoice>>, AppError> {
    let request = request.map(|Json(inner)| inner).unwrap_or_default();
    let invoice = service.pay(&InvoiceId(invoice_id), request.payment_method)?;
    Ok(Json(ApiResponse::ok(invoice)))
}

async fn unpay_invoice<S: RecordStore + 'static, M: Mailer + 'static>(
    State(service): State<Arc<BillingService<S, M>>>,
    Path(invoice_id): Path<String>,
) -> Result<Json<ApiResponse<Invoice>>, AppError> {
    let invoice = service.mark_unpaid(&InvoiceId(invoice_id))?;
    Ok(Json(ApiResponse::ok(invoice)))
}

async fn send_invoice<S: RecordStore + 'static, M: Mailer + 'static>(
    State(service): State<Arc<BillingService<S, M>>>,
    Path(invoice_id): Path<String>,
) -> Result<Json<ApiResponse<SendOutcome>>, AppError> {
    let outcome = service.send_invoice(&InvoiceId(invoice_id))?;
    Ok(Json(ApiResponse::ok(outcome)))
}
