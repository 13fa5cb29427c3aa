pub mod contract;
pub mod invoice;
pub mod room;
pub mod service;
pub mod tenant;
pub mod update_request;

pub use contract::{Contract, ContractStatus};
pub use invoice::{Invoice, InvoiceStatus, ServiceLine};
pub use room::{Room, RoomStatus};
pub use service::{Service, ServiceKind};
pub use tenant::{Tenant, TenantStatus};
pub use update_request::{FieldChange, RequestStatus, Review, UpdateRequest};

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! record_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

record_id!(RoomId);
record_id!(TenantId);
record_id!(ContractId);
record_id!(InvoiceId);
record_id!(ServiceId);
record_id!(RequestId);

impl RoomId {
    /// Whether the identifier has the shape the ledger mints (`rm-` plus six
    /// digits). Tenant rows imported from older exports sometimes carry
    /// truncated references, and the billing batch must be able to tell those
    /// apart from rooms that were merely deleted.
    pub fn is_well_formed(&self) -> bool {
        match self.0.strip_prefix("rm-") {
            Some(digits) => digits.len() == 6 && digits.bytes().all(|b| b.is_ascii_digit()),
            None => false,
        }
    }
}
