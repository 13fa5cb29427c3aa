use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::{
    ContractId, Invoice, InvoiceId, InvoiceStatus, RoomId, ServiceId, ServiceLine, Tenant,
    TenantId,
};
use crate::mailer::{InvoiceEmail, Mailer};
use crate::store::{RecordStore, StoreError};

use super::proration::{self, AnchorRule, Proration};

static INVOICE_ID_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_invoice_id() -> InvoiceId {
    let id = INVOICE_ID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    InvoiceId(format!("iv-{id:06}"))
}

const NUMBER_ATTEMPTS: u32 = 5;

/// Error raised by the billing engine.
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("{0}")]
    Validation(String),
    #[error("invoice status cannot change from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },
    #[error("{0}")]
    UnpayBlocked(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Operator-entered service charge. Quantity falls back to the difference of
/// the meter readings, then to 1; the unit price falls back to the catalog
/// price.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceLineInput {
    pub service: ServiceId,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub previous_reading: Option<f64>,
    #[serde(default)]
    pub current_reading: Option<f64>,
    #[serde(default)]
    pub unit_price: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct NewInvoice {
    /// Omit to let the engine allocate the next number.
    #[serde(default)]
    pub number: Option<String>,
    pub room: RoomId,
    pub tenant: TenantId,
    #[serde(default)]
    pub contract: Option<ContractId>,
    pub month: u32,
    pub year: i32,
    pub room_rent: i64,
    #[serde(default)]
    pub services: Vec<ServiceLineInput>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateInvoice {
    #[serde(default)]
    pub room_rent: Option<i64>,
    #[serde(default)]
    pub services: Option<Vec<ServiceLineInput>>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub draft: Option<bool>,
    /// Only overdue/cancelled may be reached this way; payment transitions
    /// have dedicated endpoints with their own stamps and guards.
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
}

#[derive(Debug, Serialize)]
pub struct CreatedDraft {
    pub invoice: Invoice,
    pub elapsed_days: i64,
    pub anchor_date: NaiveDate,
    pub anchor_rule: AnchorRule,
}

#[derive(Debug, Serialize)]
pub struct SkippedTenant {
    pub tenant: TenantId,
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct FailedTenant {
    pub tenant: TenantId,
    pub name: String,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct BulkSummary {
    pub created: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Result of one bulk draft run. Per-tenant failures land in `errors`; the
/// run itself only fails when the tenant listing cannot be read at all.
#[derive(Debug, Serialize)]
pub struct BulkDraftReport {
    pub month: u32,
    pub year: i32,
    pub created: Vec<CreatedDraft>,
    pub skipped: Vec<SkippedTenant>,
    pub errors: Vec<FailedTenant>,
    pub summary: BulkSummary,
}

#[derive(Debug, Serialize)]
pub struct SendOutcome {
    pub invoice: InvoiceId,
    pub delivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

enum DraftOutcome {
    Created(CreatedDraft),
    Skipped(String),
}

/// The billing engine: prorated draft generation, invoice numbering, payment
/// transitions, and outbound invoice mail. Reads rooms and tenants, never
/// writes them.
pub struct BillingService<S, M> {
    store: Arc<S>,
    mailer: Arc<M>,
    due_day: u8,
}

impl<S, M> BillingService<S, M>
where
    S: RecordStore + 'static,
    M: Mailer + 'static,
{
    pub fn new(store: Arc<S>, mailer: Arc<M>) -> Self {
        Self::with_due_day(store, mailer, 5)
    }

    pub fn with_due_day(store: Arc<S>, mailer: Arc<M>, due_day: u8) -> Self {
        Self {
            store,
            mailer,
            due_day,
        }
    }

    /// Compute the prorated room rent for a tenant as of `today`.
    pub fn prorate_for_tenant(
        &self,
        tenant: &Tenant,
        monthly_price: i64,
        today: NaiveDate,
    ) -> Result<Proration, BillingError> {
        let last_paid = self.last_paid_date(&tenant.id)?;
        let (anchor, rule) = proration::resolve_anchor(last_paid, tenant.move_in, today);
        Ok(proration::prorate(monthly_price, anchor, rule, today))
    }

    fn last_paid_date(&self, tenant: &TenantId) -> Result<Option<NaiveDate>, BillingError> {
        let invoices = self.store.invoices_for_tenant(tenant)?;
        Ok(invoices
            .iter()
            .filter(|invoice| invoice.status == InvoiceStatus::Paid)
            .filter_map(|invoice| invoice.paid_date)
            .max())
    }

    fn mint_number(&self, month: u32, year: i32) -> Result<String, BillingError> {
        for _ in 0..NUMBER_ATTEMPTS {
            let seq = self.store.next_invoice_sequence();
            let number = format!("INV{year}{month:02}{seq:04}");
            if !self.store.invoice_number_exists(&number)? {
                return Ok(number);
            }
        }
        Err(StoreError::Conflict("could not allocate an unused invoice number".to_string()).into())
    }

    fn resolve_lines(&self, inputs: &[ServiceLineInput]) -> Result<Vec<ServiceLine>, BillingError> {
        let mut lines = Vec::with_capacity(inputs.len());
        for input in inputs {
            let service = self
                .store
                .service(&input.service)?
                .ok_or_else(|| StoreError::NotFound(format!("service {} not found", input.service)))?;
            let quantity = match (input.quantity, input.previous_reading, input.current_reading) {
                (Some(quantity), _, _) => quantity,
                (None, Some(previous), Some(current)) => current - previous,
                _ => 1.0,
            };
            if quantity < 0.0 {
                return Err(BillingError::Validation(format!(
                    "service {} readings decrease",
                    service.name
                )));
            }
            let unit_price = input.unit_price.unwrap_or(service.unit_price);
            lines.push(ServiceLine {
                service: input.service.clone(),
                quantity,
                previous_reading: input.previous_reading,
                current_reading: input.current_reading,
                unit_price,
                amount: (quantity * unit_price as f64).round() as i64,
            });
        }
        Ok(lines)
    }

    /// Persist a caller-supplied invoice verbatim; no proration is applied.
    /// Referential integrity, number uniqueness, and the one-open-invoice-
    /// per-period constraint still hold.
    pub fn create_invoice(&self, input: NewInvoice) -> Result<Invoice, BillingError> {
        if !(1..=12).contains(&input.month) {
            return Err(BillingError::Validation(
                "billing month must fall between 1 and 12".to_string(),
            ));
        }
        if self.store.room(&input.room)?.is_none() {
            return Err(StoreError::NotFound(format!("room {} not found", input.room)).into());
        }
        if self.store.tenant(&input.tenant)?.is_none() {
            return Err(StoreError::NotFound(format!("tenant {} not found", input.tenant)).into());
        }
        if let Some(contract) = &input.contract {
            if self.store.contract(contract)?.is_none() {
                return Err(StoreError::NotFound(format!("contract {contract} not found")).into());
            }
        }

        let number = match input.number {
            Some(number) if !number.trim().is_empty() => number,
            _ => self.mint_number(input.month, input.year)?,
        };
        let services = self.resolve_lines(&input.services)?;
        let mut invoice = Invoice {
            id: next_invoice_id(),
            number,
            room: input.room,
            tenant: input.tenant,
            contract: input.contract,
            month: input.month,
            year: input.year,
            room_rent: input.room_rent,
            services,
            total: 0,
            due_date: input
                .due_date
                .unwrap_or_else(|| proration::due_date_after(input.month, input.year, self.due_day)),
            paid_date: None,
            status: InvoiceStatus::Pending,
            payment_method: None,
            email_sent: None,
            draft: false,
            note: input.note,
        };
        invoice.recompute_total();
        Ok(self.store.insert_invoice(invoice)?)
    }

    /// Generate draft invoices for every tenant currently assigned to a room,
    /// for the month containing `today`. One tenant's failure never stops the
    /// rest of the batch; every non-billed candidate appears in the report
    /// with a reason.
    pub fn generate_bulk_drafts(&self, today: NaiveDate) -> Result<BulkDraftReport, BillingError> {
        let month = today.month();
        let year = today.year();
        let candidates = self.store.tenants_with_room()?;

        let mut report = BulkDraftReport {
            month,
            year,
            created: Vec::new(),
            skipped: Vec::new(),
            errors: Vec::new(),
            summary: BulkSummary::default(),
        };

        for tenant in candidates {
            let Some(room_ref) = tenant.room.clone() else {
                continue;
            };
            if !room_ref.is_well_formed() {
                report.skipped.push(SkippedTenant {
                    tenant: tenant.id.clone(),
                    name: tenant.full_name.clone(),
                    reason: format!("invalid room reference {room_ref}"),
                });
                continue;
            }
            match self.draft_for_tenant(&tenant, &room_ref, today, month, year) {
                Ok(DraftOutcome::Created(created)) => report.created.push(created),
                Ok(DraftOutcome::Skipped(reason)) => report.skipped.push(SkippedTenant {
                    tenant: tenant.id.clone(),
                    name: tenant.full_name.clone(),
                    reason,
                }),
                Err(err) => {
                    warn!(tenant = %tenant.id, error = %err, "draft generation failed for tenant");
                    report.errors.push(FailedTenant {
                        tenant: tenant.id.clone(),
                        name: tenant.full_name.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        report.summary = BulkSummary {
            created: report.created.len(),
            skipped: report.skipped.len(),
            errors: report.errors.len(),
        };
        info!(
            month,
            year,
            created = report.summary.created,
            skipped = report.summary.skipped,
            errors = report.summary.errors,
            "bulk draft run finished"
        );
        Ok(report)
    }

    fn draft_for_tenant(
        &self,
        tenant: &Tenant,
        room_ref: &RoomId,
        today: NaiveDate,
        month: u32,
        year: i32,
    ) -> Result<DraftOutcome, BillingError> {
        if self
            .store
            .invoice_for_period(&tenant.id, month, year)?
            .is_some()
        {
            return Ok(DraftOutcome::Skipped(
                "already has invoice this month".to_string(),
            ));
        }
        let Some(room) = self.store.room(room_ref)? else {
            return Ok(DraftOutcome::Skipped(format!("room {room_ref} not found")));
        };

        let proration = self.prorate_for_tenant(tenant, room.monthly_price, today)?;
        let number = self.mint_number(month, year)?;
        let invoice = Invoice {
            id: next_invoice_id(),
            number,
            room: room.id,
            tenant: tenant.id.clone(),
            contract: None,
            month,
            year,
            room_rent: proration.amount,
            services: Vec::new(),
            total: proration.amount,
            due_date: proration::due_date_after(month, year, self.due_day),
            paid_date: None,
            status: InvoiceStatus::Pending,
            payment_method: None,
            email_sent: None,
            draft: true,
            note: Some(proration.note()),
        };
        let stored = self.store.insert_invoice(invoice)?;
        Ok(DraftOutcome::Created(CreatedDraft {
            invoice: stored,
            elapsed_days: proration.elapsed_days,
            anchor_date: proration.anchor,
            anchor_rule: proration.rule,
        }))
    }

    pub fn pay(&self, id: &InvoiceId, method: Option<String>) -> Result<Invoice, BillingError> {
        let mut invoice = self.fetch(id)?;
        if !invoice.status.allows(InvoiceStatus::Paid) {
            return Err(BillingError::InvalidTransition {
                from: invoice.status.label(),
                to: InvoiceStatus::Paid.label(),
            });
        }
        invoice.status = InvoiceStatus::Paid;
        invoice.paid_date = Some(Utc::now().date_naive());
        invoice.payment_method = Some(method.unwrap_or_else(|| "cash".to_string()));
        self.store.update_invoice(invoice.clone())?;
        info!(invoice = %invoice.id, number = %invoice.number, "invoice paid");
        Ok(invoice)
    }

    /// Revert a paid invoice to pending. Refused once a later invoice exists
    /// for the tenant, because that invoice's prorated amount may have been
    /// measured from this payment date.
    pub fn mark_unpaid(&self, id: &InvoiceId) -> Result<Invoice, BillingError> {
        let mut invoice = self.fetch(id)?;
        if !invoice.status.allows(InvoiceStatus::Pending) {
            return Err(BillingError::InvalidTransition {
                from: invoice.status.label(),
                to: InvoiceStatus::Pending.label(),
            });
        }
        let later_exists = self
            .store
            .invoices_for_tenant(&invoice.tenant)?
            .iter()
            .any(|other| {
                other.id != invoice.id
                    && other.status.is_open()
                    && (other.year, other.month) > (invoice.year, invoice.month)
            });
        if later_exists {
            return Err(BillingError::UnpayBlocked(format!(
                "invoice {} cannot be reverted: a later invoice for tenant {} already exists",
                invoice.number, invoice.tenant
            )));
        }
        invoice.status = InvoiceStatus::Pending;
        invoice.paid_date = None;
        invoice.payment_method = None;
        self.store.update_invoice(invoice.clone())?;
        Ok(invoice)
    }

    /// Hand the invoice to the mailer. A failed delivery is reported back,
    /// never escalated: the invoice record stays exactly as it was.
    pub fn send_invoice(&self, id: &InvoiceId) -> Result<SendOutcome, BillingError> {
        let mut invoice = self.fetch(id)?;
        let tenant = self
            .store
            .tenant(&invoice.tenant)?
            .ok_or_else(|| StoreError::NotFound(format!("tenant {} not found", invoice.tenant)))?;
        let Some(address) = tenant.email.as_deref() else {
            return Err(BillingError::Validation(format!(
                "tenant {} has no email address",
                tenant.id
            )));
        };

        let email = InvoiceEmail {
            number: invoice.number.clone(),
            period: format!("{:02}/{}", invoice.month, invoice.year),
            total: invoice.total,
            due_date: invoice.due_date,
        };
        let receipt = self.mailer.send_invoice_email(address, &tenant.full_name, &email);
        if receipt.delivered {
            invoice.email_sent = Some(Utc::now().naive_utc());
            self.store.update_invoice(invoice.clone())?;
        } else {
            warn!(invoice = %invoice.id, error = ?receipt.error, "invoice email not delivered");
        }
        Ok(SendOutcome {
            invoice: invoice.id,
            delivered: receipt.delivered,
            error: receipt.error,
        })
    }

    /// Draft enrichment: recompute each line and the total from the inputs.
    pub fn update(&self, id: &InvoiceId, input: UpdateInvoice) -> Result<Invoice, BillingError> {
        let mut invoice = self.fetch(id)?;
        if let Some(rent) = input.room_rent {
            invoice.room_rent = rent;
        }
        if let Some(lines) = &input.services {
            invoice.services = self.resolve_lines(lines)?;
        }
        if let Some(due_date) = input.due_date {
            invoice.due_date = due_date;
        }
        if let Some(note) = input.note {
            invoice.note = Some(note);
        }
        if let Some(draft) = input.draft {
            invoice.draft = draft;
        }
        if let Some(next) = input.status {
            if next != invoice.status {
                if matches!(next, InvoiceStatus::Paid | InvoiceStatus::Pending) {
                    return Err(BillingError::Validation(
                        "payment status changes go through the pay/unpay endpoints".to_string(),
                    ));
                }
                if !invoice.status.allows(next) {
                    return Err(BillingError::InvalidTransition {
                        from: invoice.status.label(),
                        to: next.label(),
                    });
                }
                invoice.status = next;
            }
        }
        invoice.recompute_total();
        self.store.update_invoice(invoice.clone())?;
        Ok(invoice)
    }

    pub fn delete(&self, id: &InvoiceId) -> Result<(), BillingError> {
        Ok(self.store.delete_invoice(id)?)
    }

    pub fn get(&self, id: &InvoiceId) -> Result<Invoice, BillingError> {
        self.fetch(id)
    }

    pub fn list(&self) -> Result<Vec<Invoice>, BillingError> {
        Ok(self.store.invoices()?)
    }

    pub fn list_for_tenant(&self, tenant: &TenantId) -> Result<Vec<Invoice>, BillingError> {
        Ok(self.store.invoices_for_tenant(tenant)?)
    }

    fn fetch(&self, id: &InvoiceId) -> Result<Invoice, BillingError> {
        self.store
            .invoice(id)?
            .ok_or_else(|| StoreError::NotFound(format!("invoice {id} not found")).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Room, RoomStatus, Service, ServiceKind, TenantStatus};
    use crate::mailer::RecordingMailer;
    use crate::store::InMemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn billing() -> (
        Arc<InMemoryStore>,
        RecordingMailer,
        BillingService<InMemoryStore, RecordingMailer>,
    ) {
        let store = Arc::new(InMemoryStore::new());
        let mailer = RecordingMailer::default();
        let service = BillingService::new(store.clone(), Arc::new(mailer.clone()));
        (store, mailer, service)
    }

    fn seed_room(store: &InMemoryStore, suffix: u32, price: i64) -> RoomId {
        let id = RoomId(format!("rm-{suffix:06}"));
        let room = Room {
            id: id.clone(),
            number: format!("B{suffix}"),
            floor: 1,
            area_m2: 22.0,
            monthly_price: price,
            capacity: 2,
            status: RoomStatus::Occupied,
            current_tenants: Vec::new(),
        };
        store.insert_room(room).expect("room seeds");
        id
    }

    fn seed_tenant(
        store: &InMemoryStore,
        suffix: u32,
        room: Option<RoomId>,
        move_in: Option<NaiveDate>,
    ) -> Tenant {
        let tenant = Tenant {
            id: TenantId(format!("tn-{suffix:06}")),
            account_id: None,
            full_name: format!("Tenant {suffix}"),
            national_id: format!("3000000{suffix:05}"),
            phone: None,
            email: Some(format!("tenant{suffix}@example.com")),
            address: None,
            emergency_contact: None,
            emergency_phone: None,
            room,
            move_in,
            move_out: None,
            status: TenantStatus::Active,
        };
        store.insert_tenant(tenant).expect("tenant seeds")
    }

    #[test]
    fn bulk_prorates_from_move_in_date() {
        let (store, _, service) = billing();
        let today = date(2026, 8, 20);
        let room = seed_room(&store, 1, 3_000_000);
        seed_tenant(&store, 1, Some(room), Some(date(2026, 8, 10)));

        let report = service.generate_bulk_drafts(today).expect("batch runs");

        assert_eq!(report.summary.created, 1);
        let created = &report.created[0];
        assert_eq!(created.elapsed_days, 10);
        assert_eq!(created.anchor_rule, AnchorRule::MoveInDate);
        assert_eq!(created.invoice.room_rent, 1_000_000);
        assert_eq!(created.invoice.total, 1_000_000);
        assert!(created.invoice.draft);
        assert_eq!(created.invoice.due_date, date(2026, 9, 5));
        assert_eq!(created.invoice.status, InvoiceStatus::Pending);
    }

    #[test]
    fn bulk_anchors_on_last_paid_date_when_present() {
        let (store, _, service) = billing();
        let today = date(2026, 8, 20);
        let room = seed_room(&store, 2, 3_000_000);
        let tenant = seed_tenant(&store, 2, Some(room.clone()), Some(date(2026, 1, 1)));

        let mut prior = Invoice {
            id: InvoiceId("iv-prior".to_string()),
            number: "INV2026070001".to_string(),
            room,
            tenant: tenant.id.clone(),
            contract: None,
            month: 7,
            year: 2026,
            room_rent: 3_000_000,
            services: Vec::new(),
            total: 3_000_000,
            due_date: date(2026, 8, 5),
            paid_date: Some(date(2026, 8, 5)),
            status: InvoiceStatus::Paid,
            payment_method: Some("cash".to_string()),
            email_sent: None,
            draft: false,
            note: None,
        };
        prior.recompute_total();
        store.insert_invoice(prior).expect("prior invoice seeds");

        let report = service.generate_bulk_drafts(today).expect("batch runs");

        assert_eq!(report.summary.created, 1);
        let created = &report.created[0];
        assert_eq!(created.anchor_rule, AnchorRule::LastPaidDate);
        assert_eq!(created.anchor_date, date(2026, 8, 5));
        assert_eq!(created.elapsed_days, 15);
    }

    #[test]
    fn bulk_run_is_idempotent_within_a_month() {
        let (store, _, service) = billing();
        let today = date(2026, 8, 20);
        let room = seed_room(&store, 3, 3_000_000);
        seed_tenant(&store, 3, Some(room), Some(date(2026, 8, 1)));

        let first = service.generate_bulk_drafts(today).expect("first run");
        assert_eq!(first.summary.created, 1);

        let second = service.generate_bulk_drafts(today).expect("second run");
        assert_eq!(second.summary.created, 0);
        assert_eq!(second.summary.skipped, 1);
        assert_eq!(second.skipped[0].reason, "already has invoice this month");
    }

    #[test]
    fn malformed_room_reference_is_reported_not_dropped() {
        let (store, _, service) = billing();
        seed_tenant(&store, 4, Some(RoomId("P5".to_string())), None);

        let report = service
            .generate_bulk_drafts(date(2026, 8, 20))
            .expect("batch runs");

        assert_eq!(report.summary.created, 0);
        assert_eq!(report.summary.skipped, 1);
        assert!(report.skipped[0].reason.contains("invalid room reference"));
    }

    #[test]
    fn missing_room_is_a_skip_not_an_error() {
        let (store, _, service) = billing();
        seed_tenant(&store, 5, Some(RoomId("rm-424242".to_string())), None);

        let report = service
            .generate_bulk_drafts(date(2026, 8, 20))
            .expect("batch runs");

        assert_eq!(report.summary.skipped, 1);
        assert!(report.skipped[0].reason.contains("not found"));
        assert_eq!(report.summary.errors, 0);
    }

    #[test]
    fn invoice_numbers_embed_period_and_sequence() {
        let (store, _, service) = billing();
        let room = seed_room(&store, 6, 2_000_000);
        seed_tenant(&store, 6, Some(room), Some(date(2026, 8, 1)));

        let report = service
            .generate_bulk_drafts(date(2026, 8, 20))
            .expect("batch runs");

        let number = &report.created[0].invoice.number;
        assert!(number.starts_with("INV202608"), "got {number}");
        assert_eq!(number.len(), "INV2026080001".len());
    }

    #[test]
    fn unpay_is_refused_once_a_later_invoice_exists() {
        let (store, _, service) = billing();
        let room = seed_room(&store, 7, 3_000_000);
        let tenant = seed_tenant(&store, 7, Some(room.clone()), Some(date(2026, 7, 1)));

        let july = service
            .create_invoice(NewInvoice {
                number: None,
                room: room.clone(),
                tenant: tenant.id.clone(),
                contract: None,
                month: 7,
                year: 2026,
                room_rent: 3_000_000,
                services: Vec::new(),
                due_date: None,
                note: None,
            })
            .expect("july invoice creates");
        service.pay(&july.id, None).expect("july pays");

        service
            .create_invoice(NewInvoice {
                number: None,
                room,
                tenant: tenant.id.clone(),
                contract: None,
                month: 8,
                year: 2026,
                room_rent: 3_000_000,
                services: Vec::new(),
                due_date: None,
                note: None,
            })
            .expect("august invoice creates");

        let err = service.mark_unpaid(&july.id).expect_err("unpay refused");
        assert!(matches!(err, BillingError::UnpayBlocked(_)));
    }

    #[test]
    fn unpay_without_later_invoice_reverts_to_pending() {
        let (store, _, service) = billing();
        let room = seed_room(&store, 8, 3_000_000);
        let tenant = seed_tenant(&store, 8, Some(room.clone()), None);

        let invoice = service
            .create_invoice(NewInvoice {
                number: None,
                room,
                tenant: tenant.id,
                contract: None,
                month: 8,
                year: 2026,
                room_rent: 3_000_000,
                services: Vec::new(),
                due_date: None,
                note: None,
            })
            .expect("invoice creates");
        service.pay(&invoice.id, Some("transfer".to_string())).expect("pays");

        let reverted = service.mark_unpaid(&invoice.id).expect("unpay allowed");
        assert_eq!(reverted.status, InvoiceStatus::Pending);
        assert_eq!(reverted.paid_date, None);
        assert_eq!(reverted.payment_method, None);
    }

    #[test]
    fn pay_stamps_utc_date_and_defaults_to_cash() {
        let (store, _, service) = billing();
        let room = seed_room(&store, 15, 3_000_000);
        let tenant = seed_tenant(&store, 15, Some(room.clone()), None);
        let invoice = service
            .create_invoice(NewInvoice {
                number: None,
                room,
                tenant: tenant.id,
                contract: None,
                month: 8,
                year: 2026,
                room_rent: 3_000_000,
                services: Vec::new(),
                due_date: None,
                note: None,
            })
            .expect("invoice creates");

        let paid = service.pay(&invoice.id, None).expect("payment succeeds");

        assert_eq!(paid.paid_date, Some(Utc::now().date_naive()));
        assert_eq!(paid.payment_method.as_deref(), Some("cash"));
    }

    #[test]
    fn paying_a_paid_invoice_is_rejected() {
        let (store, _, service) = billing();
        let room = seed_room(&store, 9, 3_000_000);
        let tenant = seed_tenant(&store, 9, Some(room.clone()), None);
        let invoice = service
            .create_invoice(NewInvoice {
                number: None,
                room,
                tenant: tenant.id,
                contract: None,
                month: 8,
                year: 2026,
                room_rent: 3_000_000,
                services: Vec::new(),
                due_date: None,
                note: None,
            })
            .expect("invoice creates");

        service.pay(&invoice.id, None).expect("first payment");
        let err = service.pay(&invoice.id, None).expect_err("second rejected");
        assert!(matches!(err, BillingError::InvalidTransition { .. }));
    }

    #[test]
    fn failed_delivery_leaves_invoice_untouched() {
        let (store, mailer, service) = billing();
        let room = seed_room(&store, 10, 3_000_000);
        let tenant = seed_tenant(&store, 10, Some(room.clone()), None);
        let invoice = service
            .create_invoice(NewInvoice {
                number: None,
                room,
                tenant: tenant.id,
                contract: None,
                month: 8,
                year: 2026,
                room_rent: 3_000_000,
                services: Vec::new(),
                due_date: None,
                note: None,
            })
            .expect("invoice creates");

        mailer.reject_deliveries(true);
        let outcome = service.send_invoice(&invoice.id).expect("send reports");

        assert!(!outcome.delivered);
        assert!(outcome.error.is_some());
        let fetched = service.get(&invoice.id).expect("invoice fetches");
        assert_eq!(fetched.email_sent, None);
    }

    #[test]
    fn successful_delivery_stamps_email_sent() {
        let (store, mailer, service) = billing();
        let room = seed_room(&store, 11, 3_000_000);
        let tenant = seed_tenant(&store, 11, Some(room.clone()), None);
        let invoice = service
            .create_invoice(NewInvoice {
                number: None,
                room,
                tenant: tenant.id,
                contract: None,
                month: 8,
                year: 2026,
                room_rent: 3_000_000,
                services: Vec::new(),
                due_date: None,
                note: None,
            })
            .expect("invoice creates");

        let outcome = service.send_invoice(&invoice.id).expect("send succeeds");

        assert!(outcome.delivered);
        assert_eq!(mailer.sent().len(), 1);
        let fetched = service.get(&invoice.id).expect("invoice fetches");
        assert!(fetched.email_sent.is_some());
    }

    #[test]
    fn enrichment_recomputes_line_amounts_and_total() {
        let (store, _, service) = billing();
        let room = seed_room(&store, 12, 3_000_000);
        let tenant = seed_tenant(&store, 12, Some(room.clone()), None);
        store
            .insert_service(Service {
                id: ServiceId("svc-electric".to_string()),
                name: "Electricity".to_string(),
                kind: ServiceKind::Electricity,
                unit_price: 3_500,
                unit: "kWh".to_string(),
                active: true,
            })
            .expect("service seeds");

        let invoice = service
            .create_invoice(NewInvoice {
                number: None,
                room,
                tenant: tenant.id,
                contract: None,
                month: 8,
                year: 2026,
                room_rent: 2_000_000,
                services: Vec::new(),
                due_date: None,
                note: None,
            })
            .expect("invoice creates");

        let updated = service
            .update(
                &invoice.id,
                UpdateInvoice {
                    services: Some(vec![ServiceLineInput {
                        service: ServiceId("svc-electric".to_string()),
                        quantity: None,
                        previous_reading: Some(120.0),
                        current_reading: Some(170.0),
                        unit_price: None,
                    }]),
                    ..UpdateInvoice::default()
                },
            )
            .expect("enrichment succeeds");

        assert_eq!(updated.services.len(), 1);
        assert_eq!(updated.services[0].quantity, 50.0);
        assert_eq!(updated.services[0].amount, 175_000);
        assert_eq!(updated.total, 2_175_000);
    }

    #[test]
    fn update_cannot_sneak_payment_status_changes() {
        let (store, _, service) = billing();
        let room = seed_room(&store, 13, 3_000_000);
        let tenant = seed_tenant(&store, 13, Some(room.clone()), None);
        let invoice = service
            .create_invoice(NewInvoice {
                number: None,
                room,
                tenant: tenant.id,
                contract: None,
                month: 8,
                year: 2026,
                room_rent: 3_000_000,
                services: Vec::new(),
                due_date: None,
                note: None,
            })
            .expect("invoice creates");

        let err = service
            .update(
                &invoice.id,
                UpdateInvoice {
                    status: Some(InvoiceStatus::Paid),
                    ..UpdateInvoice::default()
                },
            )
            .expect_err("paid via update rejected");
        assert!(matches!(err, BillingError::Validation(_)));

        let cancelled = service
            .update(
                &invoice.id,
                UpdateInvoice {
                    status: Some(InvoiceStatus::Cancelled),
                    ..UpdateInvoice::default()
                },
            )
            .expect("cancellation allowed");
        assert_eq!(cancelled.status, InvoiceStatus::Cancelled);
    }

    #[test]
    fn cancelled_invoice_frees_the_period_for_regeneration() {
        let (store, _, service) = billing();
        let today = date(2026, 8, 20);
        let room = seed_room(&store, 14, 3_000_000);
        seed_tenant(&store, 14, Some(room), Some(date(2026, 8, 1)));

        let first = service.generate_bulk_drafts(today).expect("first run");
        let id = first.created[0].invoice.id.clone();
        service
            .update(
                &id,
                UpdateInvoice {
                    status: Some(InvoiceStatus::Cancelled),
                    ..UpdateInvoice::default()
                },
            )
            .expect("cancel draft");

        let second = service.generate_bulk_drafts(today).expect("second run");
        assert_eq!(second.summary.created, 1);
    }
}
