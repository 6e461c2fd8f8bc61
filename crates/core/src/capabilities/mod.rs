//! Capability negotiation engine
//!
//! Two parties of a remote-imaging session — a client and a server, though
//! the algorithm is symmetric — each describe what they can do as named,
//! categorized bundles of typed, constrained parameters. This module agrees
//! on a single mutually-acceptable configuration by intersecting those
//! descriptions.
//!
//! # Architecture
//!
//! The engine is three layers, each negotiating by delegating to the one
//! below:
//!
//! 1. **[`Negotiable`]** - one parameter's value domain (a single value, a
//!    discrete set, or a numeric range) that intersects itself with another
//!    domain of the same shape.
//!
//! 2. **[`Capability`]** - a named bundle of parameter domains, flagged as
//!    a *preference* (partial wishlist) or *non-preference* (complete
//!    supported configuration). Pairwise negotiation runs a four-way case
//!    analysis on the two flags and intersects every shared parameter.
//!
//! 3. **[`CapabilitySet`]** - the priority-ordered aggregation of one
//!    party's capabilities, negotiated category by category as a full cross
//!    product.
//!
//! The free functions in [`negotiation`] compose the three-way
//! server/client/preferences agreement on top.
//!
//! Failure to agree is a first-class outcome: every `negotiate` returns
//! `None` for "nothing mutually acceptable" and reserves errors for caller
//! defects (mismatched preference flags, unknown parameter names). All
//! category, capability and parameter names match case-insensitively while
//! retaining their original spelling, via [`CaselessKey`].

mod capability;
mod caseless;
mod negotiable;
pub mod negotiation;
mod set;

pub use capability::{Capability, CapabilityBuilder, Generator};
pub use caseless::CaselessKey;
pub use negotiable::{Negotiable, NumericRange, ParamValue, ValueClass};
pub use set::CapabilitySet;
