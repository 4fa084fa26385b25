//! Containers and value details
//!
//! A container is a physical cash carrier (a bag, or an envelope nested one
//! level inside a bag). Each container owns zero or more value details: one
//! priced line per bill denomination, coin denomination, check or document.
//!
//! Containers are saved wholesale: every "save containers" command replaces
//! the transaction's whole tree, so the input side of this module is the
//! draft form (parent references by code, no ids yet) and the stored side is
//! an arena of rows with plain-id parent references assigned by the store.

use super::transaction::TransactionId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Container identifier assigned by the container store
pub type ContainerId = u32;

/// Value detail identifier assigned by the container store
pub type DetailId = u32;

/// Physical form of a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    /// Top-level carrier; may declare a value and carry client-cashier data
    Bag,

    /// Restricted carrier nested one level inside a bag
    Envelope,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerKind::Bag => write!(f, "bag"),
            ContainerKind::Envelope => write!(f, "envelope"),
        }
    }
}

/// Envelope subtype, deciding which value types the envelope admits
///
/// The admission rule itself lives in
/// [`crate::policy::envelope::EnvelopePolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    /// "Sobre de efectivo": bills and coins only
    Cash,

    /// "Sobre de documento": documents and checks only
    Document,
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvelopeKind::Cash => write!(f, "cash"),
            EnvelopeKind::Document => write!(f, "document"),
        }
    }
}

/// Counting progress of a single container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    /// Saved without any value detail yet
    Registered,

    /// Saved with at least one value detail
    Counted,
}

/// Kind of priced line inside a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Banknote line: denomination x quantity
    Bill,

    /// Coin line: denomination x quantity
    Coin,

    /// Check line: unit value x quantity, plus check metadata
    Check,

    /// Document line: the unit value is the amount; quantity is informational
    Document,
}

impl ValueType {
    /// Whether this value type counts toward the cash baseline
    pub fn is_cash(self) -> bool {
        matches!(self, ValueType::Bill | ValueType::Coin)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bill => write!(f, "bill"),
            ValueType::Coin => write!(f, "coin"),
            ValueType::Check => write!(f, "check"),
            ValueType::Document => write!(f, "document"),
        }
    }
}

/// One priced line of a container batch, as submitted by the counting desk
///
/// The `amount` is submitted by the caller and verified against
/// [`ValueDetailDraft::expected_amount`] before anything is persisted; the
/// engine refuses mismatches rather than silently recomputing them.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueDetailDraft {
    /// Bill, coin, check or document
    pub value_type: ValueType,

    /// Face value of the denomination (bills and coins)
    pub denomination: Option<Decimal>,

    /// Pieces per bundle for this denomination, when the catalog knows it
    pub bundle_size: Option<u32>,

    /// Quality grade reference from the denomination catalog
    pub quality: Option<String>,

    /// Total piece count
    pub quantity: u32,

    /// Number of full bundles counted
    pub bundle_count: u32,

    /// Loose pieces outside bundles
    pub loose_count: u32,

    /// Value of one piece (face value for bills/coins, face amount for
    /// checks, full amount for documents)
    pub unit_value: Decimal,

    /// Computed line amount as submitted; must equal `expected_amount`
    pub amount: Decimal,

    /// High-denomination flag, bills only; set from the externally
    /// configured denomination catalog, not derived from the face value
    pub is_high_denomination: bool,

    /// Check number (checks only)
    pub check_number: Option<String>,

    /// Issuing bank code (checks only)
    pub bank_code: Option<String>,
}

impl ValueDetailDraft {
    /// The amount this line must compute to
    ///
    /// `quantity * unit_value` for bills, coins and checks; for documents
    /// the unit value is the amount and the quantity is informational.
    pub fn expected_amount(&self) -> Decimal {
        match self.value_type {
            ValueType::Bill | ValueType::Coin | ValueType::Check => {
                Decimal::from(self.quantity) * self.unit_value
            }
            ValueType::Document => self.unit_value,
        }
    }

    /// The quantity implied by the bundle breakdown, when the denomination
    /// has a known bundle size
    pub fn expected_quantity(&self) -> Option<u32> {
        self.bundle_size
            .map(|size| self.bundle_count * size + self.loose_count)
    }
}

/// One container of a batch as submitted by the counting desk
///
/// Parent references use the human-legible code of another container in the
/// same batch; the store resolves them to ids when the batch is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerDraft {
    /// Human-legible label, unique within the batch
    pub code: String,

    /// Bag or envelope
    pub kind: ContainerKind,

    /// Envelope subtype; required when `kind` is `Envelope`
    pub envelope_kind: Option<EnvelopeKind>,

    /// Code of the parent bag, envelopes only
    pub parent_code: Option<String>,

    /// Amount declared on the bag's seal slip (bags only, nullable)
    pub declared_value: Option<Decimal>,

    /// Name of the client cashier who sealed the bag (bags only)
    pub cashier_name: Option<String>,

    /// Identity document of the client cashier (bags only)
    pub cashier_document: Option<String>,

    /// Priced lines counted inside this container
    pub details: Vec<ValueDetailDraft>,
}

impl ContainerDraft {
    /// A bag draft with no details yet
    pub fn bag(code: impl Into<String>) -> Self {
        ContainerDraft {
            code: code.into(),
            kind: ContainerKind::Bag,
            envelope_kind: None,
            parent_code: None,
            declared_value: None,
            cashier_name: None,
            cashier_document: None,
            details: Vec::new(),
        }
    }

    /// An envelope draft nested inside the bag with the given code
    pub fn envelope(
        code: impl Into<String>,
        subtype: EnvelopeKind,
        parent_code: impl Into<String>,
    ) -> Self {
        ContainerDraft {
            code: code.into(),
            kind: ContainerKind::Envelope,
            envelope_kind: Some(subtype),
            parent_code: Some(parent_code.into()),
            declared_value: None,
            cashier_name: None,
            cashier_document: None,
            details: Vec::new(),
        }
    }
}

/// A persisted value detail
#[derive(Debug, Clone, PartialEq)]
pub struct ValueDetail {
    /// Detail identifier assigned by the store
    pub id: DetailId,

    /// Owning container
    pub container_id: ContainerId,

    /// Bill, coin, check or document
    pub value_type: ValueType,

    /// Face value of the denomination (bills and coins)
    pub denomination: Option<Decimal>,

    /// Quality grade reference
    pub quality: Option<String>,

    /// Total piece count
    pub quantity: u32,

    /// Number of full bundles counted
    pub bundle_count: u32,

    /// Loose pieces outside bundles
    pub loose_count: u32,

    /// Value of one piece
    pub unit_value: Decimal,

    /// Computed line amount
    pub amount: Decimal,

    /// High-denomination flag, bills only
    pub is_high_denomination: bool,

    /// Check number (checks only)
    pub check_number: Option<String>,

    /// Issuing bank code (checks only)
    pub bank_code: Option<String>,
}

/// A persisted container row
///
/// Rows form an arena indexed by id within a transaction; `parent_id` is a
/// plain id into the same arena, never an owning pointer, so cycles are
/// impossible by construction once the depth bound is enforced on input.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    /// Container identifier assigned by the store
    pub id: ContainerId,

    /// Owning transaction
    pub transaction_id: TransactionId,

    /// Human-legible label
    pub code: String,

    /// Bag or envelope
    pub kind: ContainerKind,

    /// Envelope subtype, envelopes only
    pub envelope_kind: Option<EnvelopeKind>,

    /// Parent bag id, envelopes only
    pub parent_id: Option<ContainerId>,

    /// Counting progress
    pub status: ContainerStatus,

    /// Amount declared on the bag's seal slip (bags only)
    pub declared_value: Option<Decimal>,

    /// Derived: sum of all detail amounts in this container
    pub counted_value: Decimal,

    /// Name of the client cashier who sealed the bag (bags only)
    pub cashier_name: Option<String>,

    /// Identity document of the client cashier (bags only)
    pub cashier_document: Option<String>,

    /// Priced lines counted inside this container
    pub details: Vec<ValueDetail>,
}
