// Storage seams used by handlers and workflow guards.
//
// The compare-and-set methods are the only place entity status changes. Each
// one is a single conditional write whose predicate includes the expected
// prior state and returns the number of rows it changed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::models::{
    AccountReceivable, Commission, Contract, ContractChanges, ContractStatus, Lead, LeadChanges,
    ReceivableStatus, User,
};
use super::DatabaseError;
use crate::workflow::lead::LeadStatus;

#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn list(&self, status: Option<LeadStatus>) -> Result<Vec<Lead>, DatabaseError>;

    async fn create(&self, lead: &Lead) -> Result<(), DatabaseError>;

    /// NotFound when the lead is missing or soft-deleted
    async fn update(&self, id: &str, changes: &LeadChanges) -> Result<(), DatabaseError>;

    async fn soft_delete(&self, id: &str) -> Result<(), DatabaseError>;

    /// Set `next` where the live lead is currently `expected`
    async fn compare_and_set_status(
        &self,
        id: &str,
        expected: LeadStatus,
        next: LeadStatus,
    ) -> Result<u64, DatabaseError>;

    /// Current status of a live lead
    async fn status_of(&self, id: &str) -> Result<Option<LeadStatus>, DatabaseError>;
}

#[async_trait]
pub trait ContractRepository: Send + Sync {
    async fn list(&self, status: Option<ContractStatus>) -> Result<Vec<Contract>, DatabaseError>;

    /// NotFound when the referenced customer or service does not exist
    async fn create(&self, contract: &Contract) -> Result<(), DatabaseError>;

    async fn update(&self, id: &str, changes: &ContractChanges) -> Result<(), DatabaseError>;

    async fn soft_delete(&self, id: &str) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait FinanceRepository: Send + Sync {
    async fn list_receivables(
        &self,
        status: Option<ReceivableStatus>,
    ) -> Result<Vec<AccountReceivable>, DatabaseError>;

    /// open -> paid, stamping `paid_at` in the same write
    async fn pay_if_open(&self, id: &str, paid_at: DateTime<Utc>) -> Result<u64, DatabaseError>;

    async fn receivable_status(&self, id: &str) -> Result<Option<ReceivableStatus>, DatabaseError>;

    async fn list_commissions(&self, only_pending: bool) -> Result<Vec<Commission>, DatabaseError>;

    /// unapproved -> approved, recording approver and time in the same write
    async fn approve_if_pending(
        &self,
        id: &str,
        approver_id: &str,
        approved_at: DateTime<Utc>,
    ) -> Result<u64, DatabaseError>;

    async fn commission_approved(&self, id: &str) -> Result<Option<bool>, DatabaseError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Live user with this email, together with their role name
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;
}
