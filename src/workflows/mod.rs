pub mod billing;
pub mod contracts;
pub mod moderation;
pub mod occupancy;
pub mod tenants;
