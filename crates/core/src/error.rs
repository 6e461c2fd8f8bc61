//! Error types for RemoteImage Runtime Core
//!
//! Two disjoint failure classes exist in the negotiation engine. Contract
//! violations (bad arguments, mismatched preference flags, removing a
//! capability that was never added) surface as [`Error`] values. A failed
//! negotiation is not an error: every `negotiate` method reports it as
//! `None`, and callers are expected to treat that as a first-class outcome.

use thiserror::Error;

use crate::capabilities::ValueClass;

/// Result type alias for RemoteImage Runtime Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the RemoteImage Runtime Core
#[derive(Debug, Error)]
pub enum Error {
    /// Preference flag of a capability does not match the set it joins
    #[error("Preference flag mismatch: {0}")]
    FlagMismatch(String),

    /// Parameter name not declared in the capability's schema
    #[error("Unknown parameter: {name}")]
    UnknownParameter {
        /// The undeclared parameter name
        name: String,
    },

    /// Parameter declared twice in one capability schema
    #[error("Duplicate parameter: {name}")]
    DuplicateParameter {
        /// The repeated parameter name
        name: String,
    },

    /// Value supplied for a parameter does not match its declared class
    #[error("Value class mismatch for parameter '{name}': declared {declared}, got {actual}")]
    ClassMismatch {
        /// Parameter name
        name: String,
        /// Class declared in the schema
        declared: ValueClass,
        /// Class of the supplied value
        actual: ValueClass,
    },

    /// Capability was not previously added to the set it is removed from
    #[error("Capability '{category}:{name}' is not a member of this set")]
    NotAMember {
        /// Category of the missing capability
        category: String,
        /// Name of the missing capability
        name: String,
    },

    /// Two element classes mixed inside one negotiable domain
    #[error("Mixed element classes in one domain: {first} and {second}")]
    MixedClasses {
        /// Class of the earlier elements
        first: ValueClass,
        /// Class of the offending element
        second: ValueClass,
    },

    /// Attempt to construct a negotiable domain with no values
    #[error("Empty value domain: {0}")]
    EmptyDomain(String),

    /// Invalid numeric range construction (inverted or non-numeric bounds)
    #[error("Invalid numeric range: {0}")]
    InvalidRange(String),

    /// An API requiring a preference set was given a non-preference set
    #[error("A preference capability set is required: {0}")]
    PreferenceRequired(String),

    /// An API requiring a non-preference set was given a preference set
    #[error("A non-preference capability set is required: {0}")]
    NonPreferenceRequired(String),

    /// Transport failure while fetching remote capabilities
    #[error("Transport error: {0}")]
    Transport(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
