// handlers/protected/mod.rs - Endpoints behind the JWT layer

pub mod audit_logs;
pub mod contracts;
pub mod finance;
pub mod leads;
