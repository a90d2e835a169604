use chrono::Utc;
use tracing::info;

use super::guard::guarded;
use super::WorkflowError;
use crate::database::FinanceRepository;

/// Flip an open receivable to paid, exactly once
pub async fn mark_paid(finance: &dyn FinanceRepository, id: &str) -> Result<(), WorkflowError> {
    guarded(
        finance.pay_if_open(id, Utc::now()),
        || finance.receivable_status(id),
        |_| WorkflowError::AlreadyPaid,
    )
    .await?;

    info!("Receivable {} marked paid", id);
    Ok(())
}

/// Approve a pending commission, recording who approved it
pub async fn approve_commission(
    finance: &dyn FinanceRepository,
    id: &str,
    approver_id: &str,
) -> Result<(), WorkflowError> {
    guarded(
        finance.approve_if_pending(id, approver_id, Utc::now()),
        || finance.commission_approved(id),
        |_| WorkflowError::AlreadyApproved,
    )
    .await?;

    info!("Commission {} approved by {}", id, approver_id);
    Ok(())
}
