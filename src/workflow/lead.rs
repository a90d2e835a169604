use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use super::guard::guarded;
use super::WorkflowError;
use crate::database::models::UnknownStatus;
use crate::database::LeadRepository;

/// Stage of the sales pipeline. Each stage has at most one successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    Lead,
    Qualified,
    Proposal,
    Contract,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Lead => "lead",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Proposal => "proposal",
            LeadStatus::Contract => "contract",
        }
    }

    /// The only stage this one may move to. `Contract` is terminal.
    pub fn successor(self) -> Option<LeadStatus> {
        match self {
            LeadStatus::Lead => Some(LeadStatus::Qualified),
            LeadStatus::Qualified => Some(LeadStatus::Proposal),
            LeadStatus::Proposal => Some(LeadStatus::Contract),
            LeadStatus::Contract => None,
        }
    }

    /// The only stage from which this one is reachable
    pub fn predecessor(self) -> Option<LeadStatus> {
        match self {
            LeadStatus::Lead => None,
            LeadStatus::Qualified => Some(LeadStatus::Lead),
            LeadStatus::Proposal => Some(LeadStatus::Qualified),
            LeadStatus::Contract => Some(LeadStatus::Proposal),
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lead" => Ok(LeadStatus::Lead),
            "qualified" => Ok(LeadStatus::Qualified),
            "proposal" => Ok(LeadStatus::Proposal),
            "contract" => Ok(LeadStatus::Contract),
            other => Err(UnknownStatus {
                kind: "lead",
                value: other.to_string(),
            }),
        }
    }
}

/// Move a lead to `target`, accepted only when the stored stage is the
/// target's predecessor. The check and the write are one conditional update,
/// so two concurrent requests for the same step cannot both succeed.
pub async fn advance(leads: &dyn LeadRepository, id: &str, target: LeadStatus) -> Result<(), WorkflowError> {
    let write = async {
        match target.predecessor() {
            Some(expected) => leads.compare_and_set_status(id, expected, target).await,
            None => Ok(0),
        }
    };

    guarded(write, || leads.status_of(id), |_| WorkflowError::InvalidTransition { target }).await?;

    info!("Lead {} moved to {}", id, target);
    Ok(())
}
