use serde::{Deserialize, Serialize};

use super::ServiceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Electricity,
    Water,
    Internet,
    Parking,
    Cleaning,
    Other,
}

impl ServiceKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Electricity => "Electricity",
            Self::Water => "Water",
            Self::Internet => "Internet",
            Self::Parking => "Parking",
            Self::Cleaning => "Cleaning",
            Self::Other => "Other",
        }
    }
}

/// Catalog entry for a billable service. Read-only input to the billing
/// engine; readings are operator-entered when an invoice draft is enriched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub kind: ServiceKind,
    pub unit_price: i64,
    pub unit: String,
    pub active: bool,
}
