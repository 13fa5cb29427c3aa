use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};

use crate::domain::{RequestId, UpdateRequest};
use crate::error::AppError;
use crate::http::ApiResponse;
use crate::store::RecordStore;

use super::service::{ModerationService, NewUpdateRequest, ReviewInput};

pub fn request_router<S>(service: Arc<ModerationService<S>>) -> Router
where
    S: RecordStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/update-requests",
            get(list_requests::<S>).post(submit_request::<S>),
        )
        .route(
            "/api/v1/update-requests/:request_id",
            get(get_request::<S>).delete(delete_request::<S>),
        )
        .route(
            "/api/v1/update-requests/:request_id/approve",
            put(approve_request::<S>),
        )
        .route(
            "/api/v1/update-requests/:request_id/reject",
            put(reject_request::<S>),
        )
        .with_state(service)
}

async fn list_requests<S: RecordStore>(
    State(service): State<Arc<ModerationService<S>>>,
) -> Result<Json<ApiResponse<Vec<UpdateRequest>>>, AppError> {
    let requests = service.list()?;
    Ok(Json(ApiResponse::list(requests)))
}

async fn get_request<S: RecordStore>(
    State(service): State<Arc<ModerationService<S>>>,
    Path(request_id): Path<String>,
) -> Result<Json<ApiResponse<UpdateRequest>>, AppError> {
    let request = service.get(&RequestId(request_id))?;
    Ok(Json(ApiResponse::ok(request)))
}

async fn submit_request<S: RecordStore>(
    State(service): State<Arc<ModerationService<S>>>,
    Json(input): Json<NewUpdateRequest>,
) -> Result<Json<ApiResponse<UpdateRequest>>, AppError> {
    let request = service.submit(input)?;
    Ok(Json(ApiResponse::ok(request)))
}

async fn approve_request<S: RecordStore>(
    State(service): State<Arc<ModerationService<S>>>,
    Path(request_id): Path<String>,
    review: Option<Json<ReviewInput>>,
) -> Result<Json<ApiResponse<UpdateRequest>>, AppError> {
    let review = review.map(|Json(inner)| inner).unwrap_or_default();
    let request = service.approve(&RequestId(request_id), review)?;
    Ok(Json(ApiResponse::ok(request)))
}

async fn reject_request<S: RecordStore>(
    State(service): State<Arc<ModerationService<S>>>,
    Path(request_id): Path<String>,
    review: Option<Json<ReviewInput>>,
) -> Result<Json<ApiResponse<UpdateRequest>>, AppError> {
    let review = review.map(|Json(inner)| inner).unwrap_or_default();
    let request = service.reject(&RequestId(request_id), review)?;
    Ok(Json(ApiResponse::ok(request)))
}

async fn delete_request<S: RecordStore>(
    State(service): State<Arc<ModerationService<S>>>,
    Path(request_id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    service.delete(&RequestId(request_id))?;
    Ok(Json(ApiResponse::message("update request deleted")))
}
