use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{RoomId, TenantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Pending,
    Active,
    Inactive,
}

impl TenantStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Active => "Active",
            Self::Inactive => "Inactive",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub account_id: Option<String>,
    pub full_name: String,
    pub national_id: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    /// Mirror of the room's `current_tenants` membership. Written only by the
    /// occupancy ledger.
    pub room: Option<RoomId>,
    pub move_in: Option<NaiveDate>,
    pub move_out: Option<NaiveDate>,
    pub status: TenantStatus,
}
