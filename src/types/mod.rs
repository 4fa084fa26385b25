//! Core data types for the reconciliation engine
//!
//! This module contains the domain entities (transactions, containers,
//! value details, incidents), the derived totals structure and the error
//! types shared by every component.

pub mod container;
pub mod error;
pub mod incident;
pub mod totals;
pub mod transaction;

pub use container::{
    Container, ContainerDraft, ContainerId, ContainerKind, ContainerStatus, DetailId,
    EnvelopeKind, ValueDetail, ValueDetailDraft, ValueType,
};
pub use error::{EngineError, ErrorKind};
pub use incident::{
    Incident, IncidentAmount, IncidentCategory, IncidentId, IncidentOwner, IncidentStatus,
};
pub use totals::Totals;
pub use transaction::{ActorId, Transaction, TransactionId, TransactionKind, TransactionStatus};
