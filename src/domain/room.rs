use serde::{Deserialize, Serialize};

use super::{RoomId, TenantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Available,
    Occupied,
    Maintenance,
}

impl RoomStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Occupied => "Occupied",
            Self::Maintenance => "Maintenance",
        }
    }
}

/// A rentable room. `status` and `current_tenants` are maintained exclusively
/// by the occupancy ledger; the operator surface may only toggle maintenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub number: String,
    pub floor: i32,
    pub area_m2: f64,
    pub monthly_price: i64,
    pub capacity: u32,
    pub status: RoomStatus,
    pub current_tenants: Vec<TenantId>,
}

impl Room {
    pub fn is_occupied_by(&self, tenant: &TenantId) -> bool {
        self.current_tenants.contains(tenant)
    }
}
