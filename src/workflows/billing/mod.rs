pub mod proration;
mod router;
mod service;

pub use proration::{AnchorRule, Proration};
pub use router::invoice_router;
pub use service::{
    BillingError, BillingService, BulkDraftReport, CreatedDraft, FailedTenant, NewInvoice,
    SendOutcome, ServiceLineInput, SkippedTenant, UpdateInvoice,
};
