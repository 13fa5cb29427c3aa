use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{ContractId, RoomId, TenantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Active,
    Expired,
    Terminated,
}

impl ContractStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Expired => "Expired",
            Self::Terminated => "Terminated",
        }
    }

    /// Transition table for explicit status changes. Expired and terminated
    /// are terminal.
    pub const fn allows(self, next: ContractStatus) -> bool {
        matches!(
            (self, next),
            (ContractStatus::Active, ContractStatus::Expired)
                | (ContractStatus::Active, ContractStatus::Terminated)
        )
    }
}

/// A lease between one room and one tenant. Signature completeness and status
/// are tracked independently: a contract can be active without either
/// signature, and fully signed without leaving the active state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub number: String,
    pub room: RoomId,
    pub tenant: TenantId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monthly_rent: i64,
    pub deposit: i64,
    pub payment_due_day: u8,
    pub status: ContractStatus,
    pub file_ref: Option<String>,
    pub admin_signed: bool,
    pub admin_signed_at: Option<NaiveDateTime>,
    pub tenant_signed: bool,
    pub tenant_signed_at: Option<NaiveDateTime>,
}

impl Contract {
    pub fn fully_signed(&self) -> bool {
        self.admin_signed && self.tenant_signed
    }
}
