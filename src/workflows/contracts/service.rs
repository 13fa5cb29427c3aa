use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;

use crate::domain::{Contract, ContractId, ContractStatus, RoomId, TenantId};
use crate::store::{RecordStore, StoreError};

static CONTRACT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_contract_id() -> ContractId {
    let id = CONTRACT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ContractId(format!("ct-{id:06}"))
}

/// Error raised by contract lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("{0}")]
    Validation(String),
    #[error("contract status cannot change from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Deserialize)]
pub struct NewContract {
    pub number: String,
    pub room: RoomId,
    pub tenant: TenantId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Defaults to the room's monthly price when omitted.
    #[serde(default)]
    pub monthly_rent: Option<i64>,
    #[serde(default)]
    pub deposit: Option<i64>,
    #[serde(default)]
    pub payment_due_day: Option<u8>,
    #[serde(default)]
    pub file_ref: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateContract {
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub monthly_rent: Option<i64>,
    #[serde(default)]
    pub deposit: Option<i64>,
    #[serde(default)]
    pub payment_due_day: Option<u8>,
    #[serde(default)]
    pub file_ref: Option<String>,
}

/// Contract lifecycle: creation with referential checks, dual-party
/// signature flags, and the explicit status transition table. Signature
/// completeness never forces a status change.
pub struct ContractService<S> {
    store: Arc<S>,
}

impl<S: RecordStore> ContractService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn create(&self, input: NewContract) -> Result<Contract, ContractError> {
        if input.number.trim().is_empty() {
            return Err(ContractError::Validation(
                "contract number is required".to_string(),
            ));
        }
        if input.start_date >= input.end_date {
            return Err(ContractError::Validation(
                "start date must fall before end date".to_string(),
            ));
        }
        let room = self
            .store
            .room(&input.room)?
            .ok_or_else(|| StoreError::NotFound(format!("room {} not found", input.room)))?;
        if self.store.tenant(&input.tenant)?.is_none() {
            return Err(StoreError::NotFound(format!("tenant {} not found", input.tenant)).into());
        }

        let due_day = input.payment_due_day.unwrap_or(5);
        if !(1..=28).contains(&due_day) {
            return Err(ContractError::Validation(
                "payment due day must fall between 1 and 28".to_string(),
            ));
        }

        let contract = Contract {
            id: next_contract_id(),
            number: input.number,
            room: input.room,
            tenant: input.tenant,
            start_date: input.start_date,
            end_date: input.end_date,
            monthly_rent: input.monthly_rent.unwrap_or(room.monthly_price),
            deposit: input.deposit.unwrap_or(0),
            payment_due_day: due_day,
            status: ContractStatus::Active,
            file_ref: input.file_ref,
            admin_signed: false,
            admin_signed_at: None,
            tenant_signed: false,
            tenant_signed_at: None,
        };
        let stored = self.store.insert_contract(contract)?;
        info!(contract = %stored.id, number = %stored.number, "contract created");
        Ok(stored)
    }

    /// Idempotent: re-signing an already signed contract succeeds with the
    /// original timestamp untouched.
    pub fn sign_by_admin(&self, id: &ContractId) -> Result<Contract, ContractError> {
        let mut contract = self.fetch(id)?;
        if !contract.admin_signed {
            contract.admin_signed = true;
            contract.admin_signed_at = Some(Utc::now().naive_utc());
            self.store.update_contract(contract.clone())?;
        }
        Ok(contract)
    }

    pub fn sign_by_tenant(&self, id: &ContractId) -> Result<Contract, ContractError> {
        let mut contract = self.fetch(id)?;
        if !contract.tenant_signed {
            contract.tenant_signed = true;
            contract.tenant_signed_at = Some(Utc::now().naive_utc());
            self.store.update_contract(contract.clone())?;
        }
        Ok(contract)
    }

    pub fn set_status(
        &self,
        id: &ContractId,
        next: ContractStatus,
    ) -> Result<Contract, ContractError> {
        let mut contract = self.fetch(id)?;
        if contract.status == next {
            return Ok(contract);
        }
        if !contract.status.allows(next) {
            return Err(ContractError::InvalidTransition {
                from: contract.status.label(),
                to: next.label(),
            });
        }
        contract.status = next;
        self.store.update_contract(contract.clone())?;
        info!(contract = %contract.id, status = next.label(), "contract status changed");
        Ok(contract)
    }

    pub fn update(&self, id: &ContractId, input: UpdateContract) -> Result<Contract, ContractError> {
        let mut contract = self.fetch(id)?;
        if let Some(end_date) = input.end_date {
            if contract.start_date >= end_date {
                return Err(ContractError::Validation(
                    "start date must fall before end date".to_string(),
                ));
            }
            contract.end_date = end_date;
        }
        if let Some(rent) = input.monthly_rent {
            contract.monthly_rent = rent;
        }
        if let Some(deposit) = input.deposit {
            contract.deposit = deposit;
        }
        if let Some(due_day) = input.payment_due_day {
            if !(1..=28).contains(&due_day) {
                return Err(ContractError::Validation(
                    "payment due day must fall between 1 and 28".to_string(),
                ));
            }
            contract.payment_due_day = due_day;
        }
        if let Some(file_ref) = input.file_ref {
            contract.file_ref = Some(file_ref);
        }
        self.store.update_contract(contract.clone())?;
        Ok(contract)
    }

    pub fn delete(&self, id: &ContractId) -> Result<(), ContractError> {
        Ok(self.store.delete_contract(id)?)
    }

    pub fn get(&self, id: &ContractId) -> Result<Contract, ContractError> {
        self.fetch(id)
    }

    pub fn list(&self) -> Result<Vec<Contract>, ContractError> {
        Ok(self.store.contracts()?)
    }

    pub fn list_for_tenant(&self, tenant: &TenantId) -> Result<Vec<Contract>, ContractError> {
        Ok(self.store.contracts_for_tenant(tenant)?)
    }

    fn fetch(&self, id: &ContractId) -> Result<Contract, ContractError> {
        self.store
            .contract(id)?
            .ok_or_else(|| StoreError::NotFound(format!("contract {id} not found")).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Room, RoomStatus, Tenant, TenantStatus};
    use crate::store::InMemoryStore;

    fn service() -> (Arc<InMemoryStore>, ContractService<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        (store.clone(), ContractService::new(store))
    }

    fn seed_refs(store: &InMemoryStore) -> (RoomId, TenantId) {
        let room = Room {
            id: RoomId("rm-000901".to_string()),
            number: "901".to_string(),
            floor: 9,
            area_m2: 30.0,
            monthly_price: 4_000_000,
            capacity: 2,
            status: RoomStatus::Available,
            current_tenants: Vec::new(),
        };
        let tenant = Tenant {
            id: TenantId("tn-000901".to_string()),
            account_id: None,
            full_name: "Le Thi D".to_string(),
            national_id: "200000000001".to_string(),
            phone: None,
            email: None,
            address: None,
            emergency_contact: None,
            emergency_phone: None,
            room: None,
            move_in: None,
            move_out: None,
            status: TenantStatus::Active,
        };
        let room_id = store.insert_room(room).expect("room seeds").id;
        let tenant_id = store.insert_tenant(tenant).expect("tenant seeds").id;
        (room_id, tenant_id)
    }

    fn new_contract(number: &str, room: RoomId, tenant: TenantId) -> NewContract {
        NewContract {
            number: number.to_string(),
            room,
            tenant,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid start"),
            end_date: NaiveDate::from_ymd_opt(2026, 12, 31).expect("valid end"),
            monthly_rent: None,
            deposit: None,
            payment_due_day: None,
            file_ref: None,
        }
    }

    #[test]
    fn create_prefills_rent_from_room_price() {
        let (store, service) = service();
        let (room, tenant) = seed_refs(&store);

        let contract = service
            .create(new_contract("HD-2026-01", room, tenant))
            .expect("contract creates");

        assert_eq!(contract.monthly_rent, 4_000_000);
        assert_eq!(contract.status, ContractStatus::Active);
        assert!(!contract.fully_signed());
    }

    #[test]
    fn duplicate_number_conflicts() {
        let (store, service) = service();
        let (room, tenant) = seed_refs(&store);
        service
            .create(new_contract("HD-2026-02", room.clone(), tenant.clone()))
            .expect("first contract creates");

        let err = service
            .create(new_contract("HD-2026-02", room, tenant))
            .expect_err("duplicate number rejected");
        assert!(matches!(err, ContractError::Store(StoreError::Conflict(_))));
    }

    #[test]
    fn create_with_unknown_tenant_is_not_found() {
        let (store, service) = service();
        let (room, _) = seed_refs(&store);

        let err = service
            .create(new_contract(
                "HD-2026-03",
                room,
                TenantId("tn-999999".to_string()),
            ))
            .expect_err("unknown tenant rejected");
        assert!(matches!(err, ContractError::Store(StoreError::NotFound(_))));
    }

    #[test]
    fn inverted_dates_fail_validation() {
        let (store, service) = service();
        let (room, tenant) = seed_refs(&store);
        let mut input = new_contract("HD-2026-04", room, tenant);
        input.end_date = input.start_date;

        let err = service.create(input).expect_err("inverted dates rejected");
        assert!(matches!(err, ContractError::Validation(_)));
    }

    #[test]
    fn double_sign_is_idempotent() {
        let (store, service) = service();
        let (room, tenant) = seed_refs(&store);
        let contract = service
            .create(new_contract("HD-2026-05", room, tenant))
            .expect("contract creates");

        let first = service.sign_by_admin(&contract.id).expect("first sign");
        let second = service.sign_by_admin(&contract.id).expect("second sign");

        assert!(second.admin_signed);
        assert_eq!(first.admin_signed_at, second.admin_signed_at);
    }

    #[test]
    fn both_signatures_mark_fully_signed_without_status_change() {
        let (store, service) = service();
        let (room, tenant) = seed_refs(&store);
        let contract = service
            .create(new_contract("HD-2026-06", room, tenant))
            .expect("contract creates");

        service.sign_by_admin(&contract.id).expect("admin signs");
        let signed = service.sign_by_tenant(&contract.id).expect("tenant signs");

        assert!(signed.fully_signed());
        assert_eq!(signed.status, ContractStatus::Active);
    }

    #[test]
    fn terminal_status_rejects_further_transitions() {
        let (store, service) = service();
        let (room, tenant) = seed_refs(&store);
        let contract = service
            .create(new_contract("HD-2026-07", room, tenant))
            .expect("contract creates");

        service
            .set_status(&contract.id, ContractStatus::Terminated)
            .expect("termination allowed");
        let err = service
            .set_status(&contract.id, ContractStatus::Expired)
            .expect_err("terminated is terminal");
        assert!(matches!(err, ContractError::InvalidTransition { .. }));
    }

    #[test]
    fn setting_current_status_is_idempotent() {
        let (store, service) = service();
        let (room, tenant) = seed_refs(&store);
        let contract = service
            .create(new_contract("HD-2026-08", room, tenant))
            .expect("contract creates");

        let unchanged = service
            .set_status(&contract.id, ContractStatus::Active)
            .expect("same status accepted");
        assert_eq!(unchanged.status, ContractStatus::Active);
    }
}
