//! Storage-backed state transition guards.
//!
//! Each guard issues one conditional write. When that write changes nothing,
//! a follow-up read decides between "missing" and "already past this state".
//! There is no in-process locking; concurrent writers are reconciled by the
//! store.

pub mod finance;
pub mod guard;
pub mod lead;

use thiserror::Error;

use crate::database::DatabaseError;
use lead::LeadStatus;

pub use finance::{approve_commission, mark_paid};
pub use lead::advance;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("resource not found")]
    NotFound,

    #[error("invalid transition to '{target}'")]
    InvalidTransition { target: LeadStatus },

    #[error("receivable already paid")]
    AlreadyPaid,

    #[error("commission already approved")]
    AlreadyApproved,

    #[error(transparent)]
    Storage(#[from] DatabaseError),
}
