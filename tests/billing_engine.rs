use std::sync::Arc;

use chrono::NaiveDate;
use rentroll::domain::{
    Contract, ContractId, Invoice, InvoiceId, RequestId, Room, RoomId, RoomStatus, Service,
    ServiceId, Tenant, TenantId, TenantStatus, UpdateRequest,
};
use rentroll::mailer::RecordingMailer;
use rentroll::store::{InMemoryStore, RecordStore, StoreError};
use rentroll::workflows::billing::BillingService;

/// Store wrapper that refuses invoice inserts for one chosen tenant, to
/// exercise the batch's per-tenant failure isolation.
struct FlakyStore {
    inner: InMemoryStore,
    fail_invoice_for: TenantId,
}

impl RecordStore for FlakyStore {
    fn insert_room(&self, room: Room) -> Result<Room, StoreError> {
        self.inner.insert_room(room)
    }
    fn room(&self, id: &RoomId) -> Result<Option<Room>, StoreError> {
        self.inner.room(id)
    }
    fn update_room(&self, room: Room) -> Result<(), StoreError> {
        self.inner.update_room(room)
    }
    fn delete_room(&self, id: &RoomId) -> Result<(), StoreError> {
        self.inner.delete_room(id)
    }
    fn rooms(&self) -> Result<Vec<Room>, StoreError> {
        self.inner.rooms()
    }

    fn insert_tenant(&self, tenant: Tenant) -> Result<Tenant, StoreError> {
        self.inner.insert_tenant(tenant)
    }
    fn tenant(&self, id: &TenantId) -> Result<Option<Tenant>, StoreError> {
        self.inner.tenant(id)
    }
    fn update_tenant(&self, tenant: Tenant) -> Result<(), StoreError> {
        self.inner.update_tenant(tenant)
    }
    fn delete_tenant(&self, id: &TenantId) -> Result<(), StoreError> {
        self.inner.delete_tenant(id)
    }
    fn tenants(&self) -> Result<Vec<Tenant>, StoreError> {
        self.inner.tenants()
    }
    fn tenants_with_room(&self) -> Result<Vec<Tenant>, StoreError> {
        self.inner.tenants_with_room()
    }

    fn insert_contract(&self, contract: Contract) -> Result<Contract, StoreError> {
        self.inner.insert_contract(contract)
    }
    fn contract(&self, id: &ContractId) -> Result<Option<Contract>, StoreError> {
        self.inner.contract(id)
    }
    fn update_contract(&self, contract: Contract) -> Result<(), StoreError> {
        self.inner.update_contract(contract)
    }
    fn delete_contract(&self, id: &ContractId) -> Result<(), StoreError> {
        self.inner.delete_contract(id)
    }
    fn contracts(&self) -> Result<Vec<Contract>, StoreError> {
        self.inner.contracts()
    }
    fn contracts_for_tenant(&self, tenant: &TenantId) -> Result<Vec<Contract>, StoreError> {
        self.inner.contracts_for_tenant(tenant)
    }

    fn insert_invoice(&self, invoice: Invoice) -> Result<Invoice, StoreError> {
        if invoice.tenant == self.fail_invoice_for {
            return Err(StoreError::Unavailable(
                "write rejected by storage".to_string(),
            ));
        }
        self.inner.insert_invoice(invoice)
    }
    fn invoice(&self, id: &InvoiceId) -> Result<Option<Invoice>, StoreError> {
        self.inner.invoice(id)
    }
    fn update_invoice(&self, invoice: Invoice) -> Result<(), StoreError> {
        self.inner.update_invoice(invoice)
    }
    fn delete_invoice(&self, id: &InvoiceId) -> Result<(), StoreError> {
        self.inner.delete_invoice(id)
    }
    fn invoices(&self) -> Result<Vec<Invoice>, StoreError> {
        self.inner.invoices()
    }
    fn invoices_for_tenant(&self, tenant: &TenantId) -> Result<Vec<Invoice>, StoreError> {
        self.inner.invoices_for_tenant(tenant)
    }
    fn invoice_for_period(
        &self,
        tenant: &TenantId,
        month: u32,
        year: i32,
    ) -> Result<Option<Invoice>, StoreError> {
        self.inner.invoice_for_period(tenant, month, year)
    }
    fn invoice_number_exists(&self, number: &str) -> Result<bool, StoreError> {
        self.inner.invoice_number_exists(number)
    }
    fn next_invoice_sequence(&self) -> u64 {
        self.inner.next_invoice_sequence()
    }

    fn insert_service(&self, service: Service) -> Result<Service, StoreError> {
        self.inner.insert_service(service)
    }
    fn service(&self, id: &ServiceId) -> Result<Option<Service>, StoreError> {
        self.inner.service(id)
    }
    fn services(&self) -> Result<Vec<Service>, StoreError> {
        self.inner.services()
    }

    fn insert_request(&self, request: UpdateRequest) -> Result<UpdateRequest, StoreError> {
        self.inner.insert_request(request)
    }
    fn request(&self, id: &RequestId) -> Result<Option<UpdateRequest>, StoreError> {
        self.inner.request(id)
    }
    fn update_request(&self, request: UpdateRequest) -> Result<(), StoreError> {
        self.inner.update_request(request)
    }
    fn delete_request(&self, id: &RequestId) -> Result<(), StoreError> {
        self.inner.delete_request(id)
    }
    fn requests(&self) -> Result<Vec<UpdateRequest>, StoreError> {
        self.inner.requests()
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn seed_occupied_room(store: &dyn RecordStore, suffix: u32) -> RoomId {
    let id = RoomId(format!("rm-{suffix:06}"));
    store
        .insert_room(Room {
            id: id.clone(),
            number: format!("C{suffix}"),
            floor: 2,
            area_m2: 25.0,
            monthly_price: 3_000_000,
            capacity: 2,
            status: RoomStatus::Occupied,
            current_tenants: Vec::new(),
        })
        .expect("room seeds");
    id
}

fn seed_tenant(store: &dyn RecordStore, suffix: u32, room: RoomId) -> TenantId {
    store
        .insert_tenant(Tenant {
            id: TenantId(format!("tn-{suffix:06}")),
            account_id: None,
            full_name: format!("Tenant {suffix}"),
            national_id: format!("5000000{suffix:05}"),
            phone: None,
            email: None,
            address: None,
            emergency_contact: None,
            emergency_phone: None,
            room: Some(room),
            move_in: Some(date(2026, 8, 1)),
            move_out: None,
            status: TenantStatus::Active,
        })
        .expect("tenant seeds")
        .id
}

#[test]
fn one_failing_tenant_does_not_stop_the_batch() {
    let store = Arc::new(FlakyStore {
        inner: InMemoryStore::new(),
        fail_invoice_for: TenantId("tn-000202".to_string()),
    });
    for suffix in [201, 202, 203] {
        let room = seed_occupied_room(store.as_ref(), suffix);
        seed_tenant(store.as_ref(), suffix, room);
    }

    let billing = BillingService::new(store.clone(), Arc::new(RecordingMailer::default()));
    let report = billing
        .generate_bulk_drafts(date(2026, 8, 20))
        .expect("batch runs to completion");

    assert_eq!(report.summary.created, 2);
    assert_eq!(report.summary.errors, 1);
    assert_eq!(report.errors[0].tenant, TenantId("tn-000202".to_string()));
    assert!(report.errors[0].error.contains("write rejected"));

    let persisted = store.invoices().expect("invoices list");
    assert_eq!(persisted.len(), 2);
    assert!(persisted
        .iter()
        .all(|invoice| invoice.tenant != TenantId("tn-000202".to_string())));
}

#[test]
fn new_month_opens_a_fresh_billing_period() {
    let store = Arc::new(InMemoryStore::new());
    let room = seed_occupied_room(store.as_ref(), 301);
    seed_tenant(store.as_ref(), 301, room);

    let billing = BillingService::new(store.clone(), Arc::new(RecordingMailer::default()));
    let today = date(2026, 8, 20);

    let first = billing.generate_bulk_drafts(today).expect("first run");
    assert_eq!(first.summary.created, 1);

    // September: the August invoice does not occupy the new period.
    let second = billing
        .generate_bulk_drafts(date(2026, 9, 10))
        .expect("second run");
    assert_eq!(second.summary.created, 1);
    assert_eq!(second.created[0].invoice.month, 9);
}
