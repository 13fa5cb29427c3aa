use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::domain::{Room, RoomId};
use crate::error::AppError;
use crate::http::ApiResponse;
use crate::store::RecordStore;

use super::service::{NewRoom, OccupancyLedger, UpdateRoom};

/// Operator surface for rooms. Assignment changes never come through here;
/// they ride on the tenant endpoints and reach the ledger as side effects.
pub fn room_router<S>(ledger: Arc<OccupancyLedger<S>>) -> Router
where
    S: RecordStore + 'static,
{
    Router::new()
        .route("/api/v1/rooms", get(list_rooms::<S>).post(create_room::<S>))
        .route(
            "/api/v1/rooms/:room_id",
            get(get_room::<S>)
                .put(update_room::<S>)
                .delete(delete_room::<S>),
        )
        .with_state(ledger)
}

async fn list_rooms<S: RecordStore>(
    State(ledger): State<Arc<OccupancyLedger<S>>>,
) -> Result<Json<ApiResponse<Vec<Room>>>, AppError> {
    let rooms = ledger.rooms()?;
    Ok(Json(ApiResponse::list(rooms)))
}

async fn get_room<S: RecordStore>(
    State(ledger): State<Arc<OccupancyLedger<S>>>,
    Path(room_id): Path<String>,
) -> Result<Json<ApiResponse<Room>>, AppError> {
    let room = ledger.room(&RoomId(room_id))?;
    Ok(Json(ApiResponse::ok(room)))
}

async fn create_room<S: RecordStore>(
    State(ledger): State<Arc<OccupancyLedger<S>>>,
    Json(input): Json<NewRoom>,
) -> Result<Json<ApiResponse<Room>>, AppError> {
    let room = ledger.create_room(input)?;
    Ok(Json(ApiResponse::ok(room)))
}

async fn update_room<S: RecordStore>(
    State(ledger): State<Arc<OccupancyLedger<S>>>,
    Path(room_id): Path<String>,
    Json(input): Json<UpdateRoom>,
) -> Result<Json<ApiResponse<Room>>, AppError> {
    let room = ledger.update_room(&RoomId(room_id), input)?;
    Ok(Json(ApiResponse::ok(room)))
}

async fn delete_room<S: RecordStore>(
    State(ledger): State<Arc<OccupancyLedger<S>>>,
    Path(room_id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    ledger.delete_room(&RoomId(room_id))?;
    Ok(Json(ApiResponse::message("room deleted")))
}
