use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{ContractId, InvoiceId, RoomId, ServiceId, TenantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Paid => "Paid",
            Self::Overdue => "Overdue",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Transition table for invoice status changes. Cancelled is terminal,
    /// and a paid invoice can only go back to pending (the un-pay path, which
    /// carries its own anchor guard in the billing service).
    pub const fn allows(self, next: InvoiceStatus) -> bool {
        matches!(
            (self, next),
            (InvoiceStatus::Pending, InvoiceStatus::Paid)
                | (InvoiceStatus::Pending, InvoiceStatus::Overdue)
                | (InvoiceStatus::Pending, InvoiceStatus::Cancelled)
                | (InvoiceStatus::Overdue, InvoiceStatus::Paid)
                | (InvoiceStatus::Overdue, InvoiceStatus::Cancelled)
                | (InvoiceStatus::Paid, InvoiceStatus::Pending)
        )
    }

    pub const fn is_open(self) -> bool {
        !matches!(self, InvoiceStatus::Cancelled)
    }
}

/// One metered or flat service charge on an invoice. `amount` is always
/// `quantity * unit_price` rounded to whole minor units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceLine {
    pub service: ServiceId,
    pub quantity: f64,
    pub previous_reading: Option<f64>,
    pub current_reading: Option<f64>,
    pub unit_price: i64,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub number: String,
    pub room: RoomId,
    pub tenant: TenantId,
    pub contract: Option<ContractId>,
    pub month: u32,
    pub year: i32,
    pub room_rent: i64,
    pub services: Vec<ServiceLine>,
    pub total: i64,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
    pub status: InvoiceStatus,
    pub payment_method: Option<String>,
    pub email_sent: Option<NaiveDateTime>,
    pub draft: bool,
    pub note: Option<String>,
}

impl Invoice {
    /// The (tenant, month, year) fingerprint used to detect a second invoice
    /// for the same billing period.
    pub fn fingerprint(&self) -> (&TenantId, u32, i32) {
        (&self.tenant, self.month, self.year)
    }

    pub fn recompute_total(&mut self) {
        let services: i64 = self.services.iter().map(|line| line.amount).sum();
        self.total = self.room_rent + services;
    }
}
