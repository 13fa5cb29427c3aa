mod router;
mod service;

pub use router::contract_router;
pub use service::{ContractError, ContractService, NewContract, UpdateContract};
