use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::domain::{Room, RoomId, RoomStatus, TenantId};
use crate::store::{RecordStore, StoreError};

static ROOM_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_room_id() -> RoomId {
    let id = ROOM_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RoomId(format!("rm-{id:06}"))
}

/// Error raised by the occupancy ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    RoomOccupied(String),
}

#[derive(Debug, Deserialize)]
pub struct NewRoom {
    pub number: String,
    pub floor: i32,
    pub area_m2: f64,
    pub monthly_price: i64,
    pub capacity: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRoom {
    pub floor: Option<i32>,
    pub area_m2: Option<f64>,
    pub monthly_price: Option<i64>,
    pub capacity: Option<u32>,
    /// Operator maintenance toggle. Clearing maintenance recomputes the
    /// occupied/available status from the assigned set.
    pub maintenance: Option<bool>,
}

/// Single authority reconciling `Room.status` and `Room.current_tenants`
/// with tenant assignments. Every tenant create/update/delete flow routes
/// room mutation through here; nothing else writes those fields.
pub struct OccupancyLedger<S> {
    store: Arc<S>,
}

impl<S: RecordStore> OccupancyLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Record a tenant moving into a room. The tenant side is written first;
    /// a missing room leaves the tenant pointing at it and is only logged,
    /// matching how imports with stale references are handled.
    pub fn assign(&self, tenant_id: &TenantId, room_id: &RoomId) -> Result<(), LedgerError> {
        let mut tenant = self
            .store
            .tenant(tenant_id)?
            .ok_or_else(|| StoreError::NotFound(format!("tenant {tenant_id} not found")))?;
        tenant.room = Some(room_id.clone());
        self.store.update_tenant(tenant)?;

        match self.store.room(room_id)? {
            Some(mut room) => {
                if !room.is_occupied_by(tenant_id) {
                    room.current_tenants.push(tenant_id.clone());
                }
                if room.status != RoomStatus::Maintenance {
                    room.status = RoomStatus::Occupied;
                }
                self.store.update_room(room)?;
                info!(%tenant_id, %room_id, "tenant assigned to room");
            }
            None => {
                warn!(%tenant_id, %room_id, "assignment to missing room, tenant side updated only");
            }
        }
        Ok(())
    }

    /// Record a tenant moving out of a room.
    pub fn unassign(&self, tenant_id: &TenantId, room_id: &RoomId) -> Result<(), LedgerError> {
        let mut tenant = self
            .store
            .tenant(tenant_id)?
            .ok_or_else(|| StoreError::NotFound(format!("tenant {tenant_id} not found")))?;
        tenant.room = None;
        self.store.update_tenant(tenant)?;

        match self.store.room(room_id)? {
            Some(mut room) => {
                room.current_tenants.retain(|occupant| occupant != tenant_id);
                if room.current_tenants.is_empty() && room.status != RoomStatus::Maintenance {
                    room.status = RoomStatus::Available;
                }
                self.store.update_room(room)?;
                info!(%tenant_id, %room_id, "tenant unassigned from room");
            }
            None => {
                warn!(%tenant_id, %room_id, "unassignment from missing room, tenant side updated only");
            }
        }
        Ok(())
    }

    /// Move a tenant between rooms in one logical operation. Identical rooms
    /// are a no-op.
    pub fn reassign(
        &self,
        tenant_id: &TenantId,
        old_room: &RoomId,
        new_room: &RoomId,
    ) -> Result<(), LedgerError> {
        if old_room == new_room {
            return Ok(());
        }
        self.unassign(tenant_id, old_room)?;
        self.assign(tenant_id, new_room)
    }

    pub fn create_room(&self, input: NewRoom) -> Result<Room, LedgerError> {
        let room = Room {
            id: next_room_id(),
            number: input.number,
            floor: input.floor,
            area_m2: input.area_m2,
            monthly_price: input.monthly_price,
            capacity: input.capacity,
            status: RoomStatus::Available,
            current_tenants: Vec::new(),
        };
        Ok(self.store.insert_room(room)?)
    }

    pub fn update_room(&self, id: &RoomId, input: UpdateRoom) -> Result<Room, LedgerError> {
        let mut room = self
            .store
            .room(id)?
            .ok_or_else(|| StoreError::NotFound(format!("room {id} not found")))?;

        if let Some(floor) = input.floor {
            room.floor = floor;
        }
        if let Some(area) = input.area_m2 {
            room.area_m2 = area;
        }
        if let Some(price) = input.monthly_price {
            room.monthly_price = price;
        }
        if let Some(capacity) = input.capacity {
            room.capacity = capacity;
        }
        if let Some(maintenance) = input.maintenance {
            room.status = if maintenance {
                RoomStatus::Maintenance
            } else if room.current_tenants.is_empty() {
                RoomStatus::Available
            } else {
                RoomStatus::Occupied
            };
        }

        self.store.update_room(room.clone())?;
        Ok(room)
    }

    /// Rooms still housing tenants cannot be removed.
    pub fn delete_room(&self, id: &RoomId) -> Result<(), LedgerError> {
        if let Some(room) = self.store.room(id)? {
            if !room.current_tenants.is_empty() {
                return Err(LedgerError::RoomOccupied(format!(
                    "room {} still has {} assigned tenant(s)",
                    room.number,
                    room.current_tenants.len()
                )));
            }
        }
        Ok(self.store.delete_room(id)?)
    }

    pub fn room(&self, id: &RoomId) -> Result<Room, LedgerError> {
        self.store
            .room(id)?
            .ok_or_else(|| StoreError::NotFound(format!("room {id} not found")).into())
    }

    pub fn rooms(&self) -> Result<Vec<Room>, LedgerError> {
        Ok(self.store.rooms()?)
    }
}
