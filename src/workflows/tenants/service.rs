use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::warn;

use crate::domain::{RoomId, Tenant, TenantId, TenantStatus};
use crate::mailer::Mailer;
use crate::store::{RecordStore, StoreError};
use crate::workflows::occupancy::{LedgerError, OccupancyLedger};

static TENANT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_tenant_id() -> TenantId {
    let id = TENANT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    TenantId(format!("tn-{id:06}"))
}

/// Error raised by tenant management.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Deserialize)]
pub struct NewTenant {
    pub full_name: String,
    pub national_id: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub emergency_contact: Option<String>,
    #[serde(default)]
    pub emergency_phone: Option<String>,
    #[serde(default)]
    pub room: Option<RoomId>,
    #[serde(default)]
    pub move_in: Option<NaiveDate>,
    /// When set alongside an email, a portal account invitation is mailed.
    /// Delivery failure never fails the creation.
    #[serde(default)]
    pub account_password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTenant {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub emergency_contact: Option<String>,
    #[serde(default)]
    pub emergency_phone: Option<String>,
    #[serde(default)]
    pub move_in: Option<NaiveDate>,
    #[serde(default)]
    pub move_out: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<TenantStatus>,
    /// New room assignment; combined with the current assignment this turns
    /// into an assign, unassign, or reassign on the ledger.
    #[serde(default)]
    pub room: Option<RoomId>,
    /// Explicitly clear the room assignment.
    #[serde(default)]
    pub vacate: bool,
}

/// Tenant management. All room side effects go through the occupancy ledger
/// so the room invariant stays centralized.
pub struct TenantDirectory<S, M> {
    store: Arc<S>,
    mailer: Arc<M>,
    ledger: OccupancyLedger<S>,
}

impl<S, M> TenantDirectory<S, M>
where
    S: RecordStore + 'static,
    M: Mailer + 'static,
{
    pub fn new(store: Arc<S>, mailer: Arc<M>) -> Self {
        let ledger = OccupancyLedger::new(store.clone());
        Self {
            store,
            mailer,
            ledger,
        }
    }

    pub fn create(&self, input: NewTenant) -> Result<Tenant, DirectoryError> {
        if input.full_name.trim().is_empty() {
            return Err(DirectoryError::Validation(
                "full name is required".to_string(),
            ));
        }
        if input.national_id.trim().is_empty() {
            return Err(DirectoryError::Validation(
                "national ID is required".to_string(),
            ));
        }

        let tenant = Tenant {
            id: next_tenant_id(),
            account_id: None,
            full_name: input.full_name,
            national_id: input.national_id,
            phone: input.phone,
            email: input.email,
            address: input.address,
            emergency_contact: input.emergency_contact,
            emergency_phone: input.emergency_phone,
            room: None,
            move_in: input.move_in,
            move_out: None,
            status: TenantStatus::Pending,
        };
        let stored = self.store.insert_tenant(tenant)?;

        if let Some(room) = &input.room {
            self.ledger.assign(&stored.id, room)?;
        }

        if let (Some(email), Some(password)) = (&stored.email, &input.account_password) {
            let receipt = self
                .mailer
                .send_account_email(email, &stored.full_name, password);
            if !receipt.delivered {
                warn!(tenant = %stored.id, error = ?receipt.error, "account email not delivered");
            }
        }

        self.get(&stored.id)
    }

    pub fn update(&self, id: &TenantId, input: UpdateTenant) -> Result<Tenant, DirectoryError> {
        let mut tenant = self
            .store
            .tenant(id)?
            .ok_or_else(|| StoreError::NotFound(format!("tenant {id} not found")))?;
        let previous_room = tenant.room.clone();

        if let Some(full_name) = input.full_name {
            tenant.full_name = full_name;
        }
        if let Some(phone) = input.phone {
            tenant.phone = Some(phone);
        }
        if let Some(email) = input.email {
            tenant.email = Some(email);
        }
        if let Some(address) = input.address {
            tenant.address = Some(address);
        }
        if let Some(contact) = input.emergency_contact {
            tenant.emergency_contact = Some(contact);
        }
        if let Some(phone) = input.emergency_phone {
            tenant.emergency_phone = Some(phone);
        }
        if let Some(move_in) = input.move_in {
            tenant.move_in = Some(move_in);
        }
        if let Some(move_out) = input.move_out {
            tenant.move_out = Some(move_out);
        }
        if let Some(status) = input.status {
            tenant.status = status;
        }
        self.store.update_tenant(tenant)?;

        if input.vacate {
            if let Some(old) = &previous_room {
                self.ledger.unassign(id, old)?;
            }
        } else if let Some(new_room) = &input.room {
            match &previous_room {
                Some(old) => self.ledger.reassign(id, old, new_room)?,
                None => self.ledger.assign(id, new_room)?,
            }
        }

        self.get(id)
    }

    pub fn delete(&self, id: &TenantId) -> Result<(), DirectoryError> {
        let tenant = self
            .store
            .tenant(id)?
            .ok_or_else(|| StoreError::NotFound(format!("tenant {id} not found")))?;
        if let Some(room) = &tenant.room {
            self.ledger.unassign(id, room)?;
        }
        Ok(self.store.delete_tenant(id)?)
    }

    pub fn get(&self, id: &TenantId) -> Result<Tenant, DirectoryError> {
        self.store
            .tenant(id)?
            .ok_or_else(|| StoreError::NotFound(format!("tenant {id} not found")).into())
    }

    pub fn list(&self) -> Result<Vec<Tenant>, DirectoryError> {
        Ok(self.store.tenants()?)
    }
}
