//! Envelope policy
//!
//! Decides whether envelopes are admitted at all, and which value types an
//! envelope of a given subtype may hold. An envelope's allowed set is a
//! strict subset of a bag's: cash envelopes hold bills and coins, document
//! envelopes hold documents and checks. Violations are hard rejections.

use crate::types::{EngineError, EnvelopeKind, ValueType};

/// Envelope admission rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopePolicy {
    /// Whether envelopes are admitted in container batches at all
    pub allow_envelopes: bool,
}

impl Default for EnvelopePolicy {
    fn default() -> Self {
        EnvelopePolicy {
            allow_envelopes: true,
        }
    }
}

impl EnvelopePolicy {
    /// Whether an envelope of this subtype may hold a line of this value type
    pub fn is_valid_envelope(&self, subtype: EnvelopeKind, value_type: ValueType) -> bool {
        match subtype {
            EnvelopeKind::Cash => matches!(value_type, ValueType::Bill | ValueType::Coin),
            EnvelopeKind::Document => {
                matches!(value_type, ValueType::Document | ValueType::Check)
            }
        }
    }

    /// Check one envelope line, naming the envelope on rejection
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EnvelopesDisabled`] when envelopes are turned
    /// off, or [`EngineError::EnvelopeContentRejected`] when the subtype
    /// does not admit the value type.
    pub fn check(
        &self,
        code: &str,
        subtype: EnvelopeKind,
        value_type: ValueType,
    ) -> Result<(), EngineError> {
        if !self.allow_envelopes {
            return Err(EngineError::EnvelopesDisabled {
                code: code.to_string(),
            });
        }
        if !self.is_valid_envelope(subtype, value_type) {
            return Err(EngineError::envelope_content_rejected(
                code, subtype, value_type,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::cash_bill(EnvelopeKind::Cash, ValueType::Bill, true)]
    #[case::cash_coin(EnvelopeKind::Cash, ValueType::Coin, true)]
    #[case::cash_check(EnvelopeKind::Cash, ValueType::Check, false)]
    #[case::cash_document(EnvelopeKind::Cash, ValueType::Document, false)]
    #[case::document_document(EnvelopeKind::Document, ValueType::Document, true)]
    #[case::document_check(EnvelopeKind::Document, ValueType::Check, true)]
    #[case::document_bill(EnvelopeKind::Document, ValueType::Bill, false)]
    #[case::document_coin(EnvelopeKind::Document, ValueType::Coin, false)]
    fn test_subtype_admission(
        #[case] subtype: EnvelopeKind,
        #[case] value_type: ValueType,
        #[case] valid: bool,
    ) {
        let policy = EnvelopePolicy::default();
        assert_eq!(policy.is_valid_envelope(subtype, value_type), valid);
        assert_eq!(policy.check("S-01", subtype, value_type).is_ok(), valid);
    }

    #[test]
    fn test_disabled_envelopes_reject_everything() {
        let policy = EnvelopePolicy {
            allow_envelopes: false,
        };
        let err = policy
            .check("S-01", EnvelopeKind::Cash, ValueType::Bill)
            .unwrap_err();
        assert!(matches!(err, EngineError::EnvelopesDisabled { .. }));
    }
}
