pub mod memory;

pub use memory::InMemoryStore;

use crate::domain::{
    Contract, ContractId, Invoice, InvoiceId, RequestId, Room, RoomId, Service, ServiceId, Tenant,
    TenantId, UpdateRequest,
};

/// Error enumeration for record store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence abstraction for the back office. Implementations own the
/// uniqueness constraints the workflows rely on: room number, national ID,
/// contract number, invoice number, and the at-most-one-open-invoice-per-
/// (tenant, month, year) fingerprint.
pub trait RecordStore: Send + Sync {
    fn insert_room(&self, room: Room) -> Result<Room, StoreError>;
    fn room(&self, id: &RoomId) -> Result<Option<Room>, StoreError>;
    fn update_room(&self, room: Room) -> Result<(), StoreError>;
    fn delete_room(&self, id: &RoomId) -> Result<(), StoreError>;
    fn rooms(&self) -> Result<Vec<Room>, StoreError>;

    fn insert_tenant(&self, tenant: Tenant) -> Result<Tenant, StoreError>;
    fn tenant(&self, id: &TenantId) -> Result<Option<Tenant>, StoreError>;
    fn update_tenant(&self, tenant: Tenant) -> Result<(), StoreError>;
    fn delete_tenant(&self, id: &TenantId) -> Result<(), StoreError>;
    fn tenants(&self) -> Result<Vec<Tenant>, StoreError>;
    /// Tenants carrying any room reference, in stored order. The reference is
    /// not checked for validity here; the billing batch classifies it.
    fn tenants_with_room(&self) -> Result<Vec<Tenant>, StoreError>;

    fn insert_contract(&self, contract: Contract) -> Result<Contract, StoreError>;
    fn contract(&self, id: &ContractId) -> Result<Option<Contract>, StoreError>;
    fn update_contract(&self, contract: Contract) -> Result<(), StoreError>;
    fn delete_contract(&self, id: &ContractId) -> Result<(), StoreError>;
    fn contracts(&self) -> Result<Vec<Contract>, StoreError>;
    fn contracts_for_tenant(&self, tenant: &TenantId) -> Result<Vec<Contract>, StoreError>;

    fn insert_invoice(&self, invoice: Invoice) -> Result<Invoice, StoreError>;
    fn invoice(&self, id: &InvoiceId) -> Result<Option<Invoice>, StoreError>;
    fn update_invoice(&self, invoice: Invoice) -> Result<(), StoreError>;
    fn delete_invoice(&self, id: &InvoiceId) -> Result<(), StoreError>;
    fn invoices(&self) -> Result<Vec<Invoice>, StoreError>;
    fn invoices_for_tenant(&self, tenant: &TenantId) -> Result<Vec<Invoice>, StoreError>;
    /// The non-cancelled invoice for a billing period, if any.
    fn invoice_for_period(
        &self,
        tenant: &TenantId,
        month: u32,
        year: i32,
    ) -> Result<Option<Invoice>, StoreError>;
    fn invoice_number_exists(&self, number: &str) -> Result<bool, StoreError>;
    /// Monotonic counter backing invoice numbering. Never reused, even when
    /// an insert is later rejected.
    fn next_invoice_sequence(&self) -> u64;

    fn insert_service(&self, service: Service) -> Result<Service, StoreError>;
    fn service(&self, id: &ServiceId) -> Result<Option<Service>, StoreError>;
    fn services(&self) -> Result<Vec<Service>, StoreError>;

    fn insert_request(&self, request: UpdateRequest) -> Result<UpdateRequest, StoreError>;
    fn request(&self, id: &RequestId) -> Result<Option<UpdateRequest>, StoreError>;
    fn update_request(&self, request: UpdateRequest) -> Result<(), StoreError>;
    fn delete_request(&self, id: &RequestId) -> Result<(), StoreError>;
    fn requests(&self) -> Result<Vec<UpdateRequest>, StoreError>;
}
