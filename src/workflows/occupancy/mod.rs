mod router;
mod service;

pub use router::room_router;
pub use service::{LedgerError, NewRoom, OccupancyLedger, UpdateRoom};
