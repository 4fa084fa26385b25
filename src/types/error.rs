//! Error types for the reconciliation engine
//!
//! Every failure surfaces synchronously to the orchestrator's caller as a
//! typed error; nothing is swallowed and nothing is retried inside the
//! engine. Each variant carries the offending values so a caller can report
//! the exact rule and numbers involved.
//!
//! # Error Categories
//!
//! - **NotFound**: a referenced transaction, container or incident does not
//!   exist; always fatal to the current use case.
//! - **PolicyViolation**: a policy predicate rejected the input; reported
//!   with the violated rule's name, never silently coerced.
//! - **IllegalTransition**: the requested status change is not a valid edge,
//!   or the current status is terminal.
//! - **InvariantViolation**: a computed amount mismatch, a nesting bound
//!   breach or an orphaned parent reference; the engine refuses to persist
//!   rather than repair the data.
//! - **Io / Parse**: counting-sheet reader failures (CLI only).

use super::container::{EnvelopeKind, ValueType};
use super::incident::{IncidentId, IncidentStatus};
use super::transaction::{ActorId, TransactionId, TransactionKind, TransactionStatus};
use rust_decimal::Decimal;
use thiserror::Error;

/// Coarse classification of an [`EngineError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Referenced entity does not exist
    NotFound,
    /// A policy predicate rejected the input
    PolicyViolation,
    /// Requested status change is not a valid edge
    IllegalTransition,
    /// Stored-data invariant would be broken
    InvariantViolation,
    /// Underlying I/O failure
    Io,
    /// Malformed counting-sheet input
    Parse,
}

/// Main error type for the reconciliation engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Referenced transaction does not exist
    #[error("Transaction {tx} not found")]
    TransactionNotFound {
        /// Transaction ID that was not found
        tx: TransactionId,
    },

    /// Referenced incident does not exist
    #[error("Incident {incident} not found")]
    IncidentNotFound {
        /// Incident ID that was not found
        incident: IncidentId,
    },

    /// A transaction must reference a service order
    #[error("Transaction {tx} has an empty service order reference")]
    EmptyOrderReference {
        /// Transaction ID with the missing reference
        tx: TransactionId,
    },

    /// Currency code is not in the configured supported set
    #[error("Currency '{currency}' is not supported")]
    UnsupportedCurrency {
        /// The rejected currency code
        currency: String,
    },

    /// Declared totals must be positive to start counting
    #[error("Declared total {declared} for transaction {tx} must be positive")]
    NonPositiveDeclared {
        /// Transaction ID
        tx: TransactionId,
        /// The rejected declared total
        declared: Decimal,
    },

    /// Finalize requires at least one value detail across all containers
    #[error("Transaction {tx} has no value details to finalize")]
    EmptyCount {
        /// Transaction ID
        tx: TransactionId,
    },

    /// The counted-vs-declared gap exceeds the configured tolerance
    #[error("Tolerance exceeded for transaction {tx}: declared {declared}, counted {counted}, gap {gap}, threshold {threshold}")]
    ToleranceExceeded {
        /// Transaction ID
        tx: TransactionId,
        /// Declared cash baseline
        declared: Decimal,
        /// Counted cash total
        counted: Decimal,
        /// Absolute gap between the two
        gap: Decimal,
        /// The effective threshold that was exceeded
        threshold: Decimal,
    },

    /// The value type is not admitted for this transaction kind
    #[error("Value type {value_type} is not allowed for {kind} transactions")]
    ValueTypeNotAllowed {
        /// The rejected value type
        value_type: ValueType,
        /// The transaction kind doing the rejecting
        kind: TransactionKind,
    },

    /// Envelopes are disabled by configuration
    #[error("Envelope '{code}' rejected: envelopes are not allowed")]
    EnvelopesDisabled {
        /// Code of the offending envelope
        code: String,
    },

    /// An envelope draft arrived without a subtype
    #[error("Envelope '{code}' is missing a subtype")]
    MissingEnvelopeKind {
        /// Code of the offending envelope
        code: String,
    },

    /// The envelope subtype does not admit this value type
    #[error("Envelope '{code}' of subtype {subtype} cannot hold {value_type} details")]
    EnvelopeContentRejected {
        /// Code of the offending envelope
        code: String,
        /// The envelope subtype
        subtype: EnvelopeKind,
        /// The rejected value type
        value_type: ValueType,
    },

    /// Requested status change is not a valid edge from the current status
    #[error("Illegal transition for transaction {tx}: {current} -> {target}")]
    IllegalTransition {
        /// Transaction ID
        tx: TransactionId,
        /// Current status
        current: TransactionStatus,
        /// Requested target status
        target: TransactionStatus,
    },

    /// The current status is terminal; no transition is ever accepted
    #[error("Transaction {tx} is in terminal status {status}")]
    TerminalStatus {
        /// Transaction ID
        tx: TransactionId,
        /// The terminal status
        status: TransactionStatus,
    },

    /// Container batches may only be saved while the count is open
    #[error("Containers of transaction {tx} are frozen in status {status}")]
    ContainersFrozen {
        /// Transaction ID
        tx: TransactionId,
        /// The status that froze the tree
        status: TransactionStatus,
    },

    /// A submitted line amount does not match what it must compute to
    #[error("Amount mismatch in container '{code}': submitted {submitted}, computed {computed}")]
    AmountMismatch {
        /// Code of the owning container
        code: String,
        /// Amount as submitted
        submitted: Decimal,
        /// Amount the line computes to
        computed: Decimal,
    },

    /// A submitted quantity does not match its bundle breakdown
    #[error("Quantity mismatch in container '{code}': quantity {quantity}, bundles compute {computed}")]
    QuantityMismatch {
        /// Code of the owning container
        code: String,
        /// Quantity as submitted
        quantity: u32,
        /// Quantity the bundle breakdown computes to
        computed: u32,
    },

    /// Two containers in one batch share a code
    #[error("Duplicate container code '{code}' in batch")]
    DuplicateContainerCode {
        /// The duplicated code
        code: String,
    },

    /// A parent reference points at a code missing from the batch
    #[error("Container '{code}' references missing parent '{parent}'")]
    OrphanParent {
        /// Code of the child container
        code: String,
        /// The unresolved parent code
        parent: String,
    },

    /// Parent containers must be bags
    #[error("Container '{code}' has non-bag parent '{parent}'")]
    ParentNotBag {
        /// Code of the child container
        code: String,
        /// Code of the non-bag parent
        parent: String,
    },

    /// Maximum nesting depth is two: a parent may not itself have a parent
    #[error("Container '{code}' exceeds the nesting bound via parent '{parent}'")]
    NestingTooDeep {
        /// Code of the child container
        code: String,
        /// Code of the already-nested parent
        parent: String,
    },

    /// Declared values belong on bags only
    #[error("Envelope '{code}' cannot carry a declared value")]
    DeclaredValueOnEnvelope {
        /// Code of the offending envelope
        code: String,
    },

    /// Delivery requires two distinct identities
    #[error("Transaction {tx}: receiver must differ from deliverer {actor}")]
    ReceiverIsDeliverer {
        /// Transaction ID
        tx: TransactionId,
        /// The actor trying to play both roles
        actor: ActorId,
    },

    /// Incident decisions are one-way; a decided incident is never reopened
    #[error("Incident {incident} was already decided ({status})")]
    IncidentAlreadyDecided {
        /// Incident ID
        incident: IncidentId,
        /// The decision already taken
        status: IncidentStatus,
    },

    /// Incidents may only be recorded while counting or reviewing
    #[error("Transaction {tx} does not accept incidents in status {status}")]
    IncidentsClosed {
        /// Transaction ID
        tx: TransactionId,
        /// The status rejecting the incident
        status: TransactionStatus,
    },

    /// I/O error while reading or writing counting sheets
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
    },

    /// Malformed counting-sheet record
    #[error("Sheet parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    Parse {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },
}

impl From<std::io::Error> for EngineError {
    fn from(error: std::io::Error) -> Self {
        EngineError::Io {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for EngineError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());
        EngineError::Parse {
            line,
            message: error.to_string(),
        }
    }
}

impl EngineError {
    /// Classify this error into the taxonomy used by callers
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::TransactionNotFound { .. } | EngineError::IncidentNotFound { .. } => {
                ErrorKind::NotFound
            }
            EngineError::EmptyOrderReference { .. }
            | EngineError::UnsupportedCurrency { .. }
            | EngineError::NonPositiveDeclared { .. }
            | EngineError::EmptyCount { .. }
            | EngineError::ToleranceExceeded { .. }
            | EngineError::ValueTypeNotAllowed { .. }
            | EngineError::EnvelopesDisabled { .. }
            | EngineError::MissingEnvelopeKind { .. }
            | EngineError::EnvelopeContentRejected { .. } => ErrorKind::PolicyViolation,
            EngineError::IllegalTransition { .. }
            | EngineError::TerminalStatus { .. }
            | EngineError::ContainersFrozen { .. }
            | EngineError::IncidentAlreadyDecided { .. }
            | EngineError::IncidentsClosed { .. } => ErrorKind::IllegalTransition,
            EngineError::AmountMismatch { .. }
            | EngineError::QuantityMismatch { .. }
            | EngineError::DuplicateContainerCode { .. }
            | EngineError::OrphanParent { .. }
            | EngineError::ParentNotBag { .. }
            | EngineError::NestingTooDeep { .. }
            | EngineError::DeclaredValueOnEnvelope { .. }
            | EngineError::ReceiverIsDeliverer { .. } => ErrorKind::InvariantViolation,
            EngineError::Io { .. } => ErrorKind::Io,
            EngineError::Parse { .. } => ErrorKind::Parse,
        }
    }

    /// The name of the violated policy rule, for policy violations
    pub fn rule_name(&self) -> Option<&'static str> {
        match self {
            EngineError::EmptyOrderReference { .. }
            | EngineError::UnsupportedCurrency { .. }
            | EngineError::NonPositiveDeclared { .. }
            | EngineError::EmptyCount { .. } => Some("Counting"),
            EngineError::ToleranceExceeded { .. } => Some("Tolerance"),
            EngineError::ValueTypeNotAllowed { .. } => Some("ValueType"),
            EngineError::EnvelopesDisabled { .. }
            | EngineError::MissingEnvelopeKind { .. }
            | EngineError::EnvelopeContentRejected { .. } => Some("EnvelopeContent"),
            _ => None,
        }
    }
}

// Helper functions for creating common errors

impl EngineError {
    /// Create a TransactionNotFound error
    pub fn transaction_not_found(tx: TransactionId) -> Self {
        EngineError::TransactionNotFound { tx }
    }

    /// Create an IncidentNotFound error
    pub fn incident_not_found(incident: IncidentId) -> Self {
        EngineError::IncidentNotFound { incident }
    }

    /// Create an IllegalTransition error
    pub fn illegal_transition(
        tx: TransactionId,
        current: TransactionStatus,
        target: TransactionStatus,
    ) -> Self {
        EngineError::IllegalTransition {
            tx,
            current,
            target,
        }
    }

    /// Create a TerminalStatus error
    pub fn terminal_status(tx: TransactionId, status: TransactionStatus) -> Self {
        EngineError::TerminalStatus { tx, status }
    }

    /// Create a ToleranceExceeded error
    pub fn tolerance_exceeded(
        tx: TransactionId,
        declared: Decimal,
        counted: Decimal,
        threshold: Decimal,
    ) -> Self {
        EngineError::ToleranceExceeded {
            tx,
            declared,
            counted,
            gap: (declared - counted).abs(),
            threshold,
        }
    }

    /// Create a ValueTypeNotAllowed error
    pub fn value_type_not_allowed(value_type: ValueType, kind: TransactionKind) -> Self {
        EngineError::ValueTypeNotAllowed { value_type, kind }
    }

    /// Create an EnvelopeContentRejected error
    pub fn envelope_content_rejected(
        code: &str,
        subtype: EnvelopeKind,
        value_type: ValueType,
    ) -> Self {
        EngineError::EnvelopeContentRejected {
            code: code.to_string(),
            subtype,
            value_type,
        }
    }

    /// Create an AmountMismatch error
    pub fn amount_mismatch(code: &str, submitted: Decimal, computed: Decimal) -> Self {
        EngineError::AmountMismatch {
            code: code.to_string(),
            submitted,
            computed,
        }
    }

    /// Create an OrphanParent error
    pub fn orphan_parent(code: &str, parent: &str) -> Self {
        EngineError::OrphanParent {
            code: code.to_string(),
            parent: parent.to_string(),
        }
    }

    /// Create a NestingTooDeep error
    pub fn nesting_too_deep(code: &str, parent: &str) -> Self {
        EngineError::NestingTooDeep {
            code: code.to_string(),
            parent: parent.to_string(),
        }
    }
}
