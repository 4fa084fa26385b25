//! Collaborator contracts for the orchestrator
//!
//! The engine is an in-process library: persistence, audit transport and
//! service-order bookkeeping live behind these narrow seams, and every use
//! case must be testable against in-memory doubles. Store methods take
//! `&self`; implementations are expected to serialize conflicting writes to
//! the same transaction internally (row versioning, a transactional store,
//! or a concurrent map in the in-memory case).

use crate::types::{
    ActorId, Container, ContainerDraft, EngineError, Incident, IncidentAmount, IncidentCategory,
    IncidentOwner, Transaction, TransactionId, TransactionStatus,
};
use rust_decimal::Decimal;

/// Arguments for creating a provision transaction row
#[derive(Debug, Clone)]
pub struct NewProvision {
    /// Service order the provision belongs to
    pub order_id: String,

    /// ISO 4217 currency code
    pub currency: String,

    /// Slip number from the paper trail
    pub slip_number: Option<String>,

    /// Declared bill portion
    pub declared_bill: Decimal,

    /// Declared coin portion
    pub declared_coin: Decimal,

    /// Declared document portion (informational)
    pub declared_document: Decimal,

    /// Who is registering the provision
    pub registered_by: ActorId,
}

/// Arguments for recording an incident
#[derive(Debug, Clone)]
pub struct NewIncident {
    /// Transaction the discrepancy belongs to
    pub transaction_id: TransactionId,

    /// Container or value detail the discrepancy attaches to
    pub owner: IncidentOwner,

    /// Discrepancy category
    pub category: IncidentCategory,

    /// Affected amount, direct or denomination x quantity
    pub amount: IncidentAmount,

    /// What was found
    pub description: String,

    /// Who reported it
    pub reported_by: ActorId,
}

/// Transaction persistence seam
pub trait TransactionStore {
    /// Load a transaction by id
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::TransactionNotFound`] for unknown ids.
    fn get(&self, tx: TransactionId) -> Result<Transaction, EngineError>;

    /// Apply a mutation to a transaction and return the updated row
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::TransactionNotFound`] for unknown ids, or the
    /// error produced by the mutation closure.
    fn update<F>(&self, tx: TransactionId, f: F) -> Result<Transaction, EngineError>
    where
        F: FnOnce(&mut Transaction) -> Result<(), EngineError>;

    /// Create a provision transaction row in its pre-operational status
    fn add_provision(&self, args: NewProvision) -> Result<TransactionId, EngineError>;
}

/// Container-tree persistence seam
///
/// Trees are replaced wholesale: every save throws away the previous batch
/// for the transaction and persists the new one atomically.
pub trait ContainerStore {
    /// Replace the transaction's container tree with a validated batch
    ///
    /// Assigns container and detail ids, resolves parent codes to ids and
    /// derives each container's counted value. The batch must already have
    /// passed policy and invariant validation.
    fn replace_tree(
        &self,
        tx: TransactionId,
        batch: Vec<ContainerDraft>,
        actor: ActorId,
    ) -> Result<Vec<Container>, EngineError>;

    /// Load the transaction's container tree (empty if never saved)
    fn load_tree(&self, tx: TransactionId) -> Result<Vec<Container>, EngineError>;

    /// Sum of all value-detail amounts across the tree
    fn sum_counted(&self, tx: TransactionId) -> Result<Decimal, EngineError>;

    /// Number of value details across the tree
    fn detail_count(&self, tx: TransactionId) -> Result<usize, EngineError>;
}

/// Incident-ledger persistence seam
pub trait IncidentStore {
    /// Record a new incident in `Reported` status
    fn record(&self, incident: NewIncident) -> Result<Incident, EngineError>;

    /// Apply a mutation to an incident and return the updated row
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::IncidentNotFound`] for unknown ids, or the
    /// error produced by the mutation closure.
    fn update<F>(&self, incident: crate::types::IncidentId, f: F) -> Result<Incident, EngineError>
    where
        F: FnOnce(&mut Incident) -> Result<(), EngineError>;

    /// Signed sum of approved incident effects for a transaction
    fn sum_approved_effect(&self, tx: TransactionId) -> Result<Decimal, EngineError>;

    /// All incidents of a transaction
    fn incidents_for(&self, tx: TransactionId) -> Result<Vec<Incident>, EngineError>;
}

/// Unit-of-work seam
///
/// Each orchestrator use case commits exactly once; all mutations within the
/// use case become durable together or not at all.
pub trait UnitOfWork {
    /// Commit all pending mutations
    fn commit(&self) -> Result<(), EngineError>;
}

/// One audit event emitted by the orchestrator
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Stable event code, e.g. "tx.containers_saved"
    pub code: &'static str,

    /// Human-readable description
    pub message: String,

    /// Transaction status after the operation, when one applies
    pub resulting_state: Option<TransactionStatus>,

    /// Entity type the event is about
    pub entity_type: &'static str,

    /// Entity id the event is about
    pub entity_id: u32,

    /// Correlation id, usually the service order reference
    pub correlation_id: Option<String>,
}

/// Audit transport seam
///
/// Fire-and-forget from the engine's perspective: implementations must not
/// fail the business operation, whatever happens to the event.
pub trait AuditSink {
    /// Emit one informational audit event
    fn info(&self, event: AuditEvent);
}

/// Service-order status bookkeeping seam
///
/// Best-effort and advance-only: implementations may move the parent order's
/// status forward when a transaction reaches a decision, must never regress
/// it, and must never fail the business operation.
pub trait ServiceOrderSync {
    /// Nudge the parent order after the transaction reached `status`
    fn advance(&self, order_id: &str, status: TransactionStatus);
}

// Forwarding impls so an orchestrator can borrow stores owned elsewhere
// (tests inspect the same stores the orchestrator writes through).

impl<S: TransactionStore> TransactionStore for &S {
    fn get(&self, tx: TransactionId) -> Result<Transaction, EngineError> {
        (**self).get(tx)
    }

    fn update<F>(&self, tx: TransactionId, f: F) -> Result<Transaction, EngineError>
    where
        F: FnOnce(&mut Transaction) -> Result<(), EngineError>,
    {
        (**self).update(tx, f)
    }

    fn add_provision(&self, args: NewProvision) -> Result<TransactionId, EngineError> {
        (**self).add_provision(args)
    }
}

impl<S: ContainerStore> ContainerStore for &S {
    fn replace_tree(
        &self,
        tx: TransactionId,
        batch: Vec<ContainerDraft>,
        actor: ActorId,
    ) -> Result<Vec<Container>, EngineError> {
        (**self).replace_tree(tx, batch, actor)
    }

    fn load_tree(&self, tx: TransactionId) -> Result<Vec<Container>, EngineError> {
        (**self).load_tree(tx)
    }

    fn sum_counted(&self, tx: TransactionId) -> Result<Decimal, EngineError> {
        (**self).sum_counted(tx)
    }

    fn detail_count(&self, tx: TransactionId) -> Result<usize, EngineError> {
        (**self).detail_count(tx)
    }
}

impl<S: IncidentStore> IncidentStore for &S {
    fn record(&self, incident: NewIncident) -> Result<Incident, EngineError> {
        (**self).record(incident)
    }

    fn update<F>(&self, incident: crate::types::IncidentId, f: F) -> Result<Incident, EngineError>
    where
        F: FnOnce(&mut Incident) -> Result<(), EngineError>,
    {
        (**self).update(incident, f)
    }

    fn sum_approved_effect(&self, tx: TransactionId) -> Result<Decimal, EngineError> {
        (**self).sum_approved_effect(tx)
    }

    fn incidents_for(&self, tx: TransactionId) -> Result<Vec<Incident>, EngineError> {
        (**self).incidents_for(tx)
    }
}

impl<U: UnitOfWork> UnitOfWork for &U {
    fn commit(&self) -> Result<(), EngineError> {
        (**self).commit()
    }
}

impl<A: AuditSink> AuditSink for &A {
    fn info(&self, event: AuditEvent) {
        (**self).info(event)
    }
}

impl<O: ServiceOrderSync> ServiceOrderSync for &O {
    fn advance(&self, order_id: &str, status: TransactionStatus) {
        (**self).advance(order_id, status)
    }
}
