use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

/// Condensed invoice content handed to the mailer; formatting and transport
/// stay on the mailer's side of the boundary.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceEmail {
    pub number: String,
    pub period: String,
    pub total: i64,
    pub due_date: NaiveDate,
}

/// Outcome of a delivery attempt. The mailer never fails the calling
/// operation: a failed send comes back as `delivered: false` plus a message,
/// and the caller decides what to record.
#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
    pub delivered: bool,
    pub error: Option<String>,
}

impl DeliveryReceipt {
    pub fn delivered() -> Self {
        Self {
            delivered: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            delivered: false,
            error: Some(error.into()),
        }
    }
}

/// Outbound e-mail boundary (invoice notices and account credentials).
pub trait Mailer: Send + Sync {
    fn send_invoice_email(&self, address: &str, name: &str, invoice: &InvoiceEmail)
        -> DeliveryReceipt;
    fn send_account_email(&self, address: &str, name: &str, password: &str) -> DeliveryReceipt;
}

/// Default adapter for the demo server: logs the outbound message and reports
/// it delivered. Real SMTP wiring lives outside this service.
#[derive(Default)]
pub struct LoggingMailer;

impl Mailer for LoggingMailer {
    fn send_invoice_email(
        &self,
        address: &str,
        name: &str,
        invoice: &InvoiceEmail,
    ) -> DeliveryReceipt {
        info!(%address, %name, number = %invoice.number, period = %invoice.period, "invoice email dispatched");
        DeliveryReceipt::delivered()
    }

    fn send_account_email(&self, address: &str, name: &str, _password: &str) -> DeliveryReceipt {
        info!(%address, %name, "account email dispatched");
        DeliveryReceipt::delivered()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEmail {
    Invoice {
        address: String,
        name: String,
        number: String,
    },
    Account {
        address: String,
        name: String,
    },
}

/// Recording mailer used by tests: captures every send and can be switched
/// into a rejecting mode to exercise the non-fatal delivery-failure paths.
#[derive(Default, Clone)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutboundEmail>>>,
    reject: Arc<AtomicBool>,
}

impl RecordingMailer {
    pub fn reject_deliveries(&self, reject: bool) {
        self.reject.store(reject, Ordering::Relaxed);
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }
}

impl Mailer for RecordingMailer {
    fn send_invoice_email(
        &self,
        address: &str,
        name: &str,
        invoice: &InvoiceEmail,
    ) -> DeliveryReceipt {
        if self.reject.load(Ordering::Relaxed) {
            return DeliveryReceipt::failed("smtp relay refused the message");
        }
        let mut guard = self.sent.lock().expect("mailer mutex poisoned");
        guard.push(OutboundEmail::Invoice {
            address: address.to_string(),
            name: name.to_string(),
            number: invoice.number.clone(),
        });
        DeliveryReceipt::delivered()
    }

    fn send_account_email(&self, address: &str, name: &str, _password: &str) -> DeliveryReceipt {
        if self.reject.load(Ordering::Relaxed) {
            return DeliveryReceipt::failed("smtp relay refused the message");
        }
        let mut guard = self.sent.lock().expect("mailer mutex poisoned");
        guard.push(OutboundEmail::Account {
            address: address.to_string(),
            name: name.to_string(),
        });
        DeliveryReceipt::delivered()
    }
}
