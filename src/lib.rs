//! Cash Transaction Reconciliation Engine
//! # Overview
//!
//! This library reconciles cash-in-transit transactions: it takes what a
//! client or branch declared, what the counting desk actually found in the
//! bags and envelopes, and the incidents reported along the way, and keeps
//! the transaction's derived totals and lifecycle status consistent through
//! the whole back-office flow.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Transaction, Container, Incident, Totals,
//!   EngineError)
//! - [`policy`] - Pure admissibility rules consulted before any mutation:
//!   - [`policy::counting`] - Creation and finalization admissibility
//!   - [`policy::tolerance`] - Acceptable counted-vs-declared gap
//!   - [`policy::envelope`] - Envelope nesting and content rules
//!   - [`policy::value_types`] - Value types admitted per transaction kind
//! - [`core`] - Business logic components:
//!   - [`core::orchestrator`] - Use-case orchestration
//!   - [`core::state_machine`] - Transaction lifecycle transitions
//!   - [`core::aggregation`] - Totals recomputation pipeline
//!   - [`core::memory`] - In-memory store implementations
//! - [`io`] - Counting-sheet CSV input and totals output
//! - [`cli`] - CLI argument parsing
//!
//! # Transaction Kinds
//!
//! The engine handles two kinds of transaction:
//!
//! - **Collection**: cash picked up from a client, declared as one total,
//!   counted, reviewed and approved or rejected
//! - **Provision**: cash prepared for delivery to a client, declared as
//!   separate bill and coin totals, counted, reviewed and physically
//!   handed over
//!
//! # Derived Totals
//!
//! Each transaction maintains:
//! - `counted_total`: bills plus coins found across all containers
//! - `overall_total`: counted cash plus checks and documents
//! - `incident_adjustment`: signed sum of approved incident effects
//! - `value_difference`: counted minus declared cash, plus the adjustment

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod policy;
pub mod types;

pub use core::{CreateCollection, IncidentDecision, Orchestrator};
pub use io::write_totals_csv;
pub use policy::{PolicySet, TolerancePolicy};
pub use types::{
    Container, ContainerDraft, EngineError, Incident, Totals, Transaction, TransactionId,
    TransactionKind, TransactionStatus,
};
