mod router;
mod service;

pub use router::tenant_router;
pub use service::{DirectoryError, NewTenant, TenantDirectory, UpdateTenant};
