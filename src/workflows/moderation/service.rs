use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::domain::{
    FieldChange, RequestId, RequestStatus, Review, Tenant, TenantId, UpdateRequest,
};
use crate::store::{RecordStore, StoreError};

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> RequestId {
    let id = REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RequestId(format!("req-{id:06}"))
}

/// Error raised by the profile-change moderation workflow.
#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    #[error("request already processed")]
    AlreadyProcessed,
    #[error("field label {0:?} is not editable")]
    UnknownLabel(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The closed set of tenant attributes the portal may ask to change. Labels
/// arrive in English or Vietnamese depending on which portal build submitted
/// the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditableField {
    Phone,
    Email,
    Address,
    EmergencyContact,
    EmergencyPhone,
}

impl EditableField {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Phone number" | "Số điện thoại" => Some(Self::Phone),
            "Email" => Some(Self::Email),
            "Address" | "Địa chỉ" => Some(Self::Address),
            "Emergency contact" | "Người liên hệ khẩn cấp" => Some(Self::EmergencyContact),
            "Emergency phone" | "SĐT khẩn cấp" => Some(Self::EmergencyPhone),
            _ => None,
        }
    }

    /// Writes the new value onto the tenant, but only into attributes the
    /// record already carries. A field the tenant never filled in stays empty
    /// rather than being populated through the side door of a profile edit.
    fn apply(self, tenant: &mut Tenant, value: &str) -> bool {
        let slot = match self {
            Self::Phone => &mut tenant.phone,
            Self::Email => &mut tenant.email,
            Self::Address => &mut tenant.address,
            Self::EmergencyContact => &mut tenant.emergency_contact,
            Self::EmergencyPhone => &mut tenant.emergency_phone,
        };
        if slot.is_some() {
            *slot = Some(value.to_string());
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewUpdateRequest {
    pub tenant: TenantId,
    pub changes: Vec<FieldChange>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewInput {
    #[serde(default)]
    pub review_note: Option<String>,
    #[serde(default)]
    pub reviewer: Option<String>,
}

/// Moderation queue for tenant profile edits: submission validates the field
/// labels up front, approval applies the changes to the tenant record, and a
/// decided request never changes again.
pub struct ModerationService<S> {
    store: Arc<S>,
}

impl<S: RecordStore> ModerationService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn submit(&self, input: NewUpdateRequest) -> Result<UpdateRequest, ModerationError> {
        if self.store.tenant(&input.tenant)?.is_none() {
            return Err(StoreError::NotFound(format!("tenant {} not found", input.tenant)).into());
        }
        if input.changes.is_empty() {
            return Err(ModerationError::Validation(
                "an update request needs at least one change".to_string(),
            ));
        }
        for change in &input.changes {
            if EditableField::from_label(&change.label).is_none() {
                return Err(ModerationError::UnknownLabel(change.label.clone()));
            }
        }

        let request = UpdateRequest {
            id: next_request_id(),
            tenant: input.tenant,
            submitted: Utc::now().naive_utc(),
            status: RequestStatus::Pending,
            changes: input.changes,
            note: input.note,
            review: None,
        };
        let stored = self.store.insert_request(request)?;
        info!(request = %stored.id, tenant = %stored.tenant, changes = stored.changes.len(), "update request submitted");
        Ok(stored)
    }

    /// Apply every requested change to the tenant record and close the
    /// request. The tenant is persisted once, after all changes.
    pub fn approve(
        &self,
        id: &RequestId,
        review: ReviewInput,
    ) -> Result<UpdateRequest, ModerationError> {
        let mut request = self.fetch_pending(id)?;
        let mut tenant = self
            .store
            .tenant(&request.tenant)?
            .ok_or_else(|| StoreError::NotFound(format!("tenant {} not found", request.tenant)))?;

        for change in &request.changes {
            let field = EditableField::from_label(&change.label)
                .ok_or_else(|| ModerationError::UnknownLabel(change.label.clone()))?;
            field.apply(&mut tenant, &change.new_value);
        }
        self.store.update_tenant(tenant)?;

        request.status = RequestStatus::Approved;
        request.review = Some(Review {
            date: Utc::now().naive_utc(),
            note: review.review_note,
            reviewer: review.reviewer,
        });
        self.store.update_request(request.clone())?;
        info!(request = %request.id, tenant = %request.tenant, "update request approved");
        Ok(request)
    }

    pub fn reject(
        &self,
        id: &RequestId,
        review: ReviewInput,
    ) -> Result<UpdateRequest, ModerationError> {
        let mut request = self.fetch_pending(id)?;
        request.status = RequestStatus::Rejected;
        request.review = Some(Review {
            date: Utc::now().naive_utc(),
            note: review.review_note,
            reviewer: review.reviewer,
        });
        self.store.update_request(request.clone())?;
        info!(request = %request.id, tenant = %request.tenant, "update request rejected");
        Ok(request)
    }

    pub fn delete(&self, id: &RequestId) -> Result<(), ModerationError> {
        Ok(self.store.delete_request(id)?)
    }

    pub fn get(&self, id: &RequestId) -> Result<UpdateRequest, ModerationError> {
        self.fetch(id)
    }

    pub fn list(&self) -> Result<Vec<UpdateRequest>, ModerationError> {
        Ok(self.store.requests()?)
    }

    fn fetch(&self, id: &RequestId) -> Result<UpdateRequest, ModerationError> {
        self.store
            .request(id)?
            .ok_or_else(|| StoreError::NotFound(format!("update request {id} not found")).into())
    }

    fn fetch_pending(&self, id: &RequestId) -> Result<UpdateRequest, ModerationError> {
        let request = self.fetch(id)?;
        if request.status.is_terminal() {
            return Err(ModerationError::AlreadyProcessed);
        }
        Ok(request)
    }
}
