//! Allowed-value-types policy
//!
//! Scopes the admissible value types to the transaction kind: collections
//! may count anything the client sent in, while provisions are assembled
//! from cash only and reject checks and documents entirely.

use crate::types::{EngineError, TransactionKind, ValueType};

/// Value types admissible for one transaction kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowedValueTypesPolicy {
    kind: TransactionKind,
}

impl AllowedValueTypesPolicy {
    /// The policy scoped to a transaction kind
    pub fn for_kind(kind: TransactionKind) -> Self {
        AllowedValueTypesPolicy { kind }
    }

    /// Whether this value type may appear in a container batch
    pub fn is_allowed(&self, value_type: ValueType) -> bool {
        match self.kind {
            TransactionKind::Collection => true,
            TransactionKind::Provision => value_type.is_cash(),
        }
    }

    /// Check one line, naming the value type and kind on rejection
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ValueTypeNotAllowed`] for inadmissible types.
    pub fn check(&self, value_type: ValueType) -> Result<(), EngineError> {
        if self.is_allowed(value_type) {
            Ok(())
        } else {
            Err(EngineError::value_type_not_allowed(value_type, self.kind))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::collection_bill(TransactionKind::Collection, ValueType::Bill, true)]
    #[case::collection_check(TransactionKind::Collection, ValueType::Check, true)]
    #[case::collection_document(TransactionKind::Collection, ValueType::Document, true)]
    #[case::provision_bill(TransactionKind::Provision, ValueType::Bill, true)]
    #[case::provision_coin(TransactionKind::Provision, ValueType::Coin, true)]
    #[case::provision_check(TransactionKind::Provision, ValueType::Check, false)]
    #[case::provision_document(TransactionKind::Provision, ValueType::Document, false)]
    fn test_admission_by_kind(
        #[case] kind: TransactionKind,
        #[case] value_type: ValueType,
        #[case] allowed: bool,
    ) {
        let policy = AllowedValueTypesPolicy::for_kind(kind);
        assert_eq!(policy.is_allowed(value_type), allowed);
        assert_eq!(policy.check(value_type).is_ok(), allowed);
    }
}
