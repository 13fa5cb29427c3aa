use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{RequestId, TenantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

/// One requested edit: the portal label plus the value transition the tenant
/// wants applied to their record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldChange {
    pub label: String,
    pub old_value: Option<String>,
    pub new_value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub date: NaiveDateTime,
    pub note: Option<String>,
    pub reviewer: Option<String>,
}

/// Tenant-initiated profile edit awaiting an admin decision. Once approved or
/// rejected the request is immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub id: RequestId,
    pub tenant: TenantId,
    pub submitted: NaiveDateTime,
    pub status: RequestStatus,
    pub changes: Vec<FieldChange>,
    pub note: Option<String>,
    pub review: Option<Review>,
}
