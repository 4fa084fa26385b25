//! Incident ledger types
//!
//! An incident records a discrepancy found while counting or reviewing a
//! transaction: a shortage, an overage, damaged pieces, or anything else
//! worth a signed monetary adjustment. Incidents attach to exactly one
//! container or one value detail, and only approved incidents contribute
//! their signed effect to the transaction's difference.

use super::container::{ContainerId, DetailId};
use super::transaction::{ActorId, TransactionId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Incident identifier assigned by the incident store
pub type IncidentId = u32;

/// What the incident attaches to (exactly one)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncidentOwner {
    /// The whole container
    Container(ContainerId),

    /// A single priced line
    Detail(DetailId),
}

/// Discrepancy category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentCategory {
    /// Less cash than declared; effect is negative
    Shortage,

    /// More cash than declared; effect is positive
    Overage,

    /// Pieces unfit for circulation; effect is negative
    Damaged,

    /// Anything else; the recorded amount is taken as-is, sign included
    Other,
}

impl fmt::Display for IncidentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncidentCategory::Shortage => write!(f, "shortage"),
            IncidentCategory::Overage => write!(f, "overage"),
            IncidentCategory::Damaged => write!(f, "damaged"),
            IncidentCategory::Other => write!(f, "other"),
        }
    }
}

/// Approval state of an incident
///
/// Transitions are one-way: `Reported` moves to `Approved` or `Rejected`
/// once, and a decided incident is never reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    /// Recorded, awaiting a decision; no effect on totals yet
    Reported,

    /// Accepted; contributes its signed effect to the difference
    Approved,

    /// Dismissed; never contributes
    Rejected,
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncidentStatus::Reported => write!(f, "reported"),
            IncidentStatus::Approved => write!(f, "approved"),
            IncidentStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Affected amount of an incident, as reported
///
/// The amount can be given directly or as a denomination times a piece
/// count (e.g. "three 50,000 bills short").
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IncidentAmount {
    /// The affected amount itself
    Direct(Decimal),

    /// Denomination face value times piece count
    Denominated {
        /// Face value of the affected denomination
        denomination: Decimal,
        /// Number of affected pieces
        quantity: u32,
    },
}

impl IncidentAmount {
    /// Resolve to a single monetary amount
    pub fn resolve(self) -> Decimal {
        match self {
            IncidentAmount::Direct(amount) => amount,
            IncidentAmount::Denominated {
                denomination,
                quantity,
            } => denomination * Decimal::from(quantity),
        }
    }
}

/// A recorded discrepancy
#[derive(Debug, Clone, PartialEq)]
pub struct Incident {
    /// Incident identifier
    pub id: IncidentId,

    /// Transaction the discrepancy belongs to
    pub transaction_id: TransactionId,

    /// Container or value detail the discrepancy attaches to
    pub owner: IncidentOwner,

    /// Discrepancy category
    pub category: IncidentCategory,

    /// Affected amount (always non-negative for shortage/overage/damaged;
    /// sign-carrying for `Other`)
    pub amount: Decimal,

    /// Free-text description of what was found
    pub description: String,

    /// Who reported the discrepancy
    pub reported_by: ActorId,

    /// When it was reported
    pub reported_at: DateTime<Utc>,

    /// Approval state
    pub status: IncidentStatus,

    /// Who decided, once decided
    pub reviewed_by: Option<ActorId>,
}

impl Incident {
    /// The signed contribution of this incident to the transaction's
    /// difference, regardless of approval state
    ///
    /// Shortages and damaged pieces subtract, overages add, and `Other`
    /// incidents carry their amount as recorded. Whether the effect actually
    /// applies is the aggregation engine's concern: it only sums approved
    /// incidents.
    pub fn signed_effect(&self) -> Decimal {
        match self.category {
            IncidentCategory::Shortage | IncidentCategory::Damaged => -self.amount.abs(),
            IncidentCategory::Overage => self.amount.abs(),
            IncidentCategory::Other => self.amount,
        }
    }
}
