mod router;
mod service;

pub use router::request_router;
pub use service::{
    EditableField, ModerationError, ModerationService, NewUpdateRequest, ReviewInput,
};
