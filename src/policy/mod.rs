//! Policy set
//!
//! Independent, stateless rule objects consulted by the orchestrator before
//! any mutation: counting admissibility, counted-vs-declared tolerance,
//! envelope nesting/content rules and the value types admissible per
//! transaction kind. All policies are pure predicates over already-loaded
//! data; none of them performs I/O.

pub mod counting;
pub mod envelope;
pub mod tolerance;
pub mod value_types;

pub use counting::CountingPolicy;
pub use envelope::EnvelopePolicy;
pub use tolerance::{ToleranceMode, TolerancePolicy};
pub use value_types::AllowedValueTypesPolicy;

/// The policies the orchestrator consults, bundled
///
/// The allowed-value-types policy is not part of the bundle: it is derived
/// per transaction from its kind via
/// [`AllowedValueTypesPolicy::for_kind`].
#[derive(Debug, Clone, Default)]
pub struct PolicySet {
    /// Creation and finalization admissibility
    pub counting: CountingPolicy,

    /// Acceptable counted-vs-declared gap
    pub tolerance: TolerancePolicy,

    /// Envelope admission rules
    pub envelope: EnvelopePolicy,
}
