//! RemoteImage Runtime Core
//!
//! Transport-agnostic capability negotiation for remote imaging pipelines.
//! Two parties — typically a rendering client and a tile server — each
//! publish a [`CapabilitySet`](capabilities::CapabilitySet) describing what
//! they support (codecs, transports, color models, ...) as named, typed,
//! constrained parameters. This crate computes the mutually-acceptable
//! configuration, optionally narrowed by user preferences.
//!
//! # Usage
//!
//! ```
//! use remoteimage_core::capabilities::{
//!     negotiation, Capability, CapabilitySet, Negotiable, NumericRange, ValueClass,
//! };
//!
//! # fn main() -> remoteimage_core::Result<()> {
//! let server_jpeg = Capability::non_preference("tileCodec", "jpeg")
//!     .param("quality", ValueClass::Integer)
//!     .value("quality", Negotiable::range(NumericRange::integers(0, 100)?))
//!     .build()?;
//! let client_jpeg = Capability::non_preference("tileCodec", "jpeg")
//!     .param("quality", ValueClass::Integer)
//!     .value("quality", Negotiable::range(NumericRange::integers(50, 100)?))
//!     .build()?;
//!
//! let mut server = CapabilitySet::new(false);
//! server.add(server_jpeg)?;
//! let mut client = CapabilitySet::new(false);
//! client.add(client_jpeg)?;
//!
//! let agreed = negotiation::negotiate(None, &server, &client)?
//!     .expect("jpeg quality ranges overlap");
//! let codec = agreed.negotiated_value("tileCodec").expect("category present");
//! assert_eq!(codec.name(), "jpeg");
//! # Ok(())
//! # }
//! ```
//!
//! Failure to agree is an expected outcome, reported as `None` rather than
//! an error; errors are reserved for caller defects such as mismatched
//! preference flags. See the [`capabilities`] module for the engine and
//! [`remote`] for the session seam used by transport implementations.

pub mod capabilities;
pub mod error;
pub mod remote;

pub use error::{Error, Result};
