//! Engine core
//!
//! The storage seams ([`traits`]), the transaction lifecycle
//! ([`state_machine`]), the totals pipeline ([`aggregation`]), the use-case
//! layer ([`orchestrator`]) and the in-memory store implementations
//! ([`memory`]). [`audit`] holds the tracing-backed audit sink and the
//! logging order-sync stub.

pub mod aggregation;
pub mod audit;
pub mod memory;
pub mod orchestrator;
pub mod state_machine;
pub mod traits;

pub use audit::{LoggingOrderSync, TracingAudit};
pub use memory::{
    MemoryContainerStore, MemoryIncidentStore, MemoryTransactionStore, MemoryUnitOfWork,
};
pub use orchestrator::{CreateCollection, IncidentDecision, Orchestrator};
pub use traits::{
    AuditEvent, AuditSink, ContainerStore, IncidentStore, NewIncident, NewProvision,
    ServiceOrderSync, TransactionStore, UnitOfWork,
};
