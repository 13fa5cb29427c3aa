use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::domain::{
    Contract, ContractId, Invoice, InvoiceId, RequestId, Room, RoomId, Service, ServiceId, Tenant,
    TenantId, UpdateRequest,
};

use super::{RecordStore, StoreError};

/// In-memory record store. Each entity map sits behind its own mutex, and the
/// invoice uniqueness checks run inside the invoice critical section, so the
/// check-then-create sequence of the billing batch cannot interleave with a
/// concurrent insert for the same period.
#[derive(Default)]
pub struct InMemoryStore {
    rooms: Mutex<HashMap<String, Room>>,
    tenants: Mutex<HashMap<String, Tenant>>,
    contracts: Mutex<HashMap<String, Contract>>,
    invoices: Mutex<HashMap<String, Invoice>>,
    services: Mutex<HashMap<String, Service>>,
    requests: Mutex<HashMap<String, UpdateRequest>>,
    invoice_sequence: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by_id<T, F>(map: &HashMap<String, T>, key: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> &str,
{
    let mut items: Vec<T> = map.values().cloned().collect();
    items.sort_by(|a, b| key(a).cmp(key(b)));
    items
}

impl RecordStore for InMemoryStore {
    fn insert_room(&self, room: Room) -> Result<Room, StoreError> {
        let mut guard = self.rooms.lock().expect("room mutex poisoned");
        if guard.values().any(|existing| existing.number == room.number) {
            return Err(StoreError::Conflict(format!(
                "room number {} already exists",
                room.number
            )));
        }
        guard.insert(room.id.0.clone(), room.clone());
        Ok(room)
    }

    fn room(&self, id: &RoomId) -> Result<Option<Room>, StoreError> {
        let guard = self.rooms.lock().expect("room mutex poisoned");
        Ok(guard.get(&id.0).cloned())
    }

    fn update_room(&self, room: Room) -> Result<(), StoreError> {
        let mut guard = self.rooms.lock().expect("room mutex poisoned");
        if guard
            .values()
            .any(|existing| existing.id != room.id && existing.number == room.number)
        {
            return Err(StoreError::Conflict(format!(
                "room number {} already exists",
                room.number
            )));
        }
        match guard.get_mut(&room.id.0) {
            Some(slot) => {
                *slot = room;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("room {} not found", room.id))),
        }
    }

    fn delete_room(&self, id: &RoomId) -> Result<(), StoreError> {
        let mut guard = self.rooms.lock().expect("room mutex poisoned");
        guard
            .remove(&id.0)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("room {id} not found")))
    }

    fn rooms(&self) -> Result<Vec<Room>, StoreError> {
        let guard = self.rooms.lock().expect("room mutex poisoned");
        Ok(sorted_by_id(&guard, |room| &room.id.0))
    }

    fn insert_tenant(&self, tenant: Tenant) -> Result<Tenant, StoreError> {
        let mut guard = self.tenants.lock().expect("tenant mutex poisoned");
        if guard
            .values()
            .any(|existing| existing.national_id == tenant.national_id)
        {
            return Err(StoreError::Conflict(format!(
                "national ID {} already registered",
                tenant.national_id
            )));
        }
        guard.insert(tenant.id.0.clone(), tenant.clone());
        Ok(tenant)
    }

    fn tenant(&self, id: &TenantId) -> Result<Option<Tenant>, StoreError> {
        let guard = self.tenants.lock().expect("tenant mutex poisoned");
        Ok(guard.get(&id.0).cloned())
    }

    fn update_tenant(&self, tenant: Tenant) -> Result<(), StoreError> {
        let mut guard = self.tenants.lock().expect("tenant mutex poisoned");
        if guard
            .values()
            .any(|existing| existing.id != tenant.id && existing.national_id == tenant.national_id)
        {
            return Err(StoreError::Conflict(format!(
                "national ID {} already registered",
                tenant.national_id
            )));
        }
        match guard.get_mut(&tenant.id.0) {
            Some(slot) => {
                *slot = tenant;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!(
                "tenant {} not found",
                tenant.id
            ))),
        }
    }

    fn delete_tenant(&self, id: &TenantId) -> Result<(), StoreError> {
        let mut guard = self.tenants.lock().expect("tenant mutex poisoned");
        guard
            .remove(&id.0)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("tenant {id} not found")))
    }

    fn tenants(&self) -> Result<Vec<Tenant>, StoreError> {
        let guard = self.tenants.lock().expect("tenant mutex poisoned");
        Ok(sorted_by_id(&guard, |tenant| &tenant.id.0))
    }

    fn tenants_with_room(&self) -> Result<Vec<Tenant>, StoreError> {
        let guard = self.tenants.lock().expect("tenant mutex poisoned");
        let mut tenants: Vec<Tenant> = guard
            .values()
            .filter(|tenant| tenant.room.is_some())
            .cloned()
            .collect();
        tenants.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(tenants)
    }

    fn insert_contract(&self, contract: Contract) -> Result<Contract, StoreError> {
        let mut guard = self.contracts.lock().expect("contract mutex poisoned");
        if guard
            .values()
            .any(|existing| existing.number == contract.number)
        {
            return Err(StoreError::Conflict(format!(
                "contract number {} already exists",
                contract.number
            )));
        }
        guard.insert(contract.id.0.clone(), contract.clone());
        Ok(contract)
    }

    fn contract(&self, id: &ContractId) -> Result<Option<Contract>, StoreError> {
        let guard = self.contracts.lock().expect("contract mutex poisoned");
        Ok(guard.get(&id.0).cloned())
    }

    fn update_contract(&self, contract: Contract) -> Result<(), StoreError> {
        let mut guard = self.contracts.lock().expect("contract mutex poisoned");
        match guard.get_mut(&contract.id.0) {
            Some(slot) => {
                *slot = contract;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!(
                "contract {} not found",
                contract.id
            ))),
        }
    }

    fn delete_contract(&self, id: &ContractId) -> Result<(), StoreError> {
        let mut guard = self.contracts.lock().expect("contract mutex poisoned");
        guard
            .remove(&id.0)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("contract {id} not found")))
    }

    fn contracts(&self) -> Result<Vec<Contract>, StoreError> {
        let guard = self.contracts.lock().expect("contract mutex poisoned");
        Ok(sorted_by_id(&guard, |contract| &contract.id.0))
    }

    fn contracts_for_tenant(&self, tenant: &TenantId) -> Result<Vec<Contract>, StoreError> {
        let guard = self.contracts.lock().expect("contract mutex poisoned");
        let mut contracts: Vec<Contract> = guard
            .values()
            .filter(|contract| &contract.tenant == tenant)
            .cloned()
            .collect();
        contracts.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(contracts)
    }

    fn insert_invoice(&self, invoice: Invoice) -> Result<Invoice, StoreError> {
        let mut guard = self.invoices.lock().expect("invoice mutex poisoned");
        if guard
            .values()
            .any(|existing| existing.number == invoice.number)
        {
            return Err(StoreError::Conflict(format!(
                "invoice number {} already exists",
                invoice.number
            )));
        }
        if invoice.status.is_open()
            && guard
                .values()
                .any(|existing| existing.status.is_open() && existing.fingerprint() == invoice.fingerprint())
        {
            return Err(StoreError::Conflict(format!(
                "tenant {} already has an open invoice for {:02}/{}",
                invoice.tenant, invoice.month, invoice.year
            )));
        }
        guard.insert(invoice.id.0.clone(), invoice.clone());
        Ok(invoice)
    }

    fn invoice(&self, id: &InvoiceId) -> Result<Option<Invoice>, StoreError> {
        let guard = self.invoices.lock().expect("invoice mutex poisoned");
        Ok(guard.get(&id.0).cloned())
    }

    fn update_invoice(&self, invoice: Invoice) -> Result<(), StoreError> {
        let mut guard = self.invoices.lock().expect("invoice mutex poisoned");
        if guard
            .values()
            .any(|existing| existing.id != invoice.id && existing.number == invoice.number)
        {
            return Err(StoreError::Conflict(format!(
                "invoice number {} already exists",
                invoice.number
            )));
        }
        if invoice.status.is_open()
            && guard.values().any(|existing| {
                existing.id != invoice.id
                    && existing.status.is_open()
                    && existing.fingerprint() == invoice.fingerprint()
            })
        {
            return Err(StoreError::Conflict(format!(
                "tenant {} already has an open invoice for {:02}/{}",
                invoice.tenant, invoice.month, invoice.year
            )));
        }
        match guard.get_mut(&invoice.id.0) {
            Some(slot) => {
                *slot = invoice;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!(
                "invoice {} not found",
                invoice.id
            ))),
        }
    }

    fn delete_invoice(&self, id: &InvoiceId) -> Result<(), StoreError> {
        let mut guard = self.invoices.lock().expect("invoice mutex poisoned");
        guard
            .remove(&id.0)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("invoice {id} not found")))
    }

    fn invoices(&self) -> Result<Vec<Invoice>, StoreError> {
        let guard = self.invoices.lock().expect("invoice mutex poisoned");
        Ok(sorted_by_id(&guard, |invoice| &invoice.id.0))
    }

    fn invoices_for_tenant(&self, tenant: &TenantId) -> Result<Vec<Invoice>, StoreError> {
        let guard = self.invoices.lock().expect("invoice mutex poisoned");
        let mut invoices: Vec<Invoice> = guard
            .values()
            .filter(|invoice| &invoice.tenant == tenant)
            .cloned()
            .collect();
        invoices.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(invoices)
    }

    fn invoice_for_period(
        &self,
        tenant: &TenantId,
        month: u32,
        year: i32,
    ) -> Result<Option<Invoice>, StoreError> {
        let guard = self.invoices.lock().expect("invoice mutex poisoned");
        Ok(guard
            .values()
            .find(|invoice| {
                invoice.status.is_open() && invoice.fingerprint() == (tenant, month, year)
            })
            .cloned())
    }

    fn invoice_number_exists(&self, number: &str) -> Result<bool, StoreError> {
        let guard = self.invoices.lock().expect("invoice mutex poisoned");
        Ok(guard.values().any(|invoice| invoice.number == number))
    }

    fn next_invoice_sequence(&self) -> u64 {
        self.invoice_sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn insert_service(&self, service: Service) -> Result<Service, StoreError> {
        let mut guard = self.services.lock().expect("service mutex poisoned");
        guard.insert(service.id.0.clone(), service.clone());
        Ok(service)
    }

    fn service(&self, id: &ServiceId) -> Result<Option<Service>, StoreError> {
        let guard = self.services.lock().expect("service mutex poisoned");
        Ok(guard.get(&id.0).cloned())
    }

    fn services(&self) -> Result<Vec<Service>, StoreError> {
        let guard = self.services.lock().expect("service mutex poisoned");
        Ok(sorted_by_id(&guard, |service| &service.id.0))
    }

    fn insert_request(&self, request: UpdateRequest) -> Result<UpdateRequest, StoreError> {
        let mut guard = self.requests.lock().expect("request mutex poisoned");
        guard.insert(request.id.0.clone(), request.clone());
        Ok(request)
    }

    fn request(&self, id: &RequestId) -> Result<Option<UpdateRequest>, StoreError> {
        let guard = self.requests.lock().expect("request mutex poisoned");
        Ok(guard.get(&id.0).cloned())
    }

    fn update_request(&self, request: UpdateRequest) -> Result<(), StoreError> {
        let mut guard = self.requests.lock().expect("request mutex poisoned");
        match guard.get_mut(&request.id.0) {
            Some(slot) => {
                *slot = request;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!(
                "update request {} not found",
                request.id
            ))),
        }
    }

    fn delete_request(&self, id: &RequestId) -> Result<(), StoreError> {
        let mut guard = self.requests.lock().expect("request mutex poisoned");
        guard
            .remove(&id.0)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("update request {id} not found")))
    }

    fn requests(&self) -> Result<Vec<UpdateRequest>, StoreError> {
        let guard = self.requests.lock().expect("request mutex poisoned");
        Ok(sorted_by_id(&guard, |request| &request.id.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InvoiceStatus, RoomStatus, TenantStatus};
    use chrono::NaiveDate;

    fn sample_room(id: &str, number: &str) -> Room {
        Room {
            id: RoomId(id.to_string()),
            number: number.to_string(),
            floor: 1,
            area_m2: 20.0,
            monthly_price: 3_000_000,
            capacity: 2,
            status: RoomStatus::Available,
            current_tenants: Vec::new(),
        }
    }

    fn sample_tenant(id: &str, national_id: &str) -> Tenant {
        Tenant {
            id: TenantId(id.to_string()),
            account_id: None,
            full_name: "Tran Thi B".to_string(),
            national_id: national_id.to_string(),
            phone: Some("0911222333".to_string()),
            email: None,
            address: None,
            emergency_contact: None,
            emergency_phone: None,
            room: None,
            move_in: None,
            move_out: None,
            status: TenantStatus::Active,
        }
    }

    fn sample_invoice(id: &str, number: &str, tenant: &str, month: u32) -> Invoice {
        Invoice {
            id: InvoiceId(id.to_string()),
            number: number.to_string(),
            room: RoomId("rm-000001".to_string()),
            tenant: TenantId(tenant.to_string()),
            contract: None,
            month,
            year: 2026,
            room_rent: 3_000_000,
            services: Vec::new(),
            total: 3_000_000,
            due_date: NaiveDate::from_ymd_opt(2026, 9, 5).expect("valid due date"),
            paid_date: None,
            status: InvoiceStatus::Pending,
            payment_method: None,
            email_sent: None,
            draft: true,
            note: None,
        }
    }

    #[test]
    fn duplicate_room_number_is_rejected() {
        let store = InMemoryStore::new();
        store
            .insert_room(sample_room("rm-000001", "101"))
            .expect("first room inserts");
        let err = store
            .insert_room(sample_room("rm-000002", "101"))
            .expect_err("duplicate number rejected");
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn duplicate_national_id_is_rejected() {
        let store = InMemoryStore::new();
        store
            .insert_tenant(sample_tenant("tn-000001", "012345678901"))
            .expect("first tenant inserts");
        let err = store
            .insert_tenant(sample_tenant("tn-000002", "012345678901"))
            .expect_err("duplicate national ID rejected");
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn second_open_invoice_for_same_period_is_rejected() {
        let store = InMemoryStore::new();
        store
            .insert_invoice(sample_invoice("iv-000001", "INV2026080001", "tn-000001", 8))
            .expect("first invoice inserts");
        let err = store
            .insert_invoice(sample_invoice("iv-000002", "INV2026080002", "tn-000001", 8))
            .expect_err("fingerprint collision rejected");
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn cancelled_invoice_does_not_block_the_period() {
        let store = InMemoryStore::new();
        let mut cancelled = sample_invoice("iv-000001", "INV2026080001", "tn-000001", 8);
        cancelled.status = InvoiceStatus::Cancelled;
        store.insert_invoice(cancelled).expect("cancelled inserts");
        store
            .insert_invoice(sample_invoice("iv-000002", "INV2026080002", "tn-000001", 8))
            .expect("replacement invoice accepted");
        let open = store
            .invoice_for_period(&TenantId("tn-000001".to_string()), 8, 2026)
            .expect("lookup succeeds")
            .expect("open invoice found");
        assert_eq!(open.number, "INV2026080002");
    }

    #[test]
    fn invoice_sequence_is_monotonic() {
        let store = InMemoryStore::new();
        let first = store.next_invoice_sequence();
        let second = store.next_invoice_sequence();
        assert!(second > first);
    }
}
