//! Threat-matching protocol subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP body + headers
//!     → negotiate.rs (pick inbound / outbound Encoding)
//!     → codec.rs (bytes ⇄ message, JSON or protobuf)
//!     → messages.rs (FindThreatMatches*, ListThreatLists*)
//!     → types.rs (ThreatType / PlatformType / ThreatEntryType, descriptors)
//! ```
//!
//! # Design Decisions
//! - One schema, two encodings: prost for binary, serde for JSON
//! - Enum fields stay `i32` on the wire structs so unknown values survive
//! - Negotiation never guesses; unrecognized selectors are client errors

pub mod codec;
mod json;
pub mod messages;
pub mod negotiate;
pub mod types;

pub use codec::{CodecError, Encoding, WireMessage, MIME_JSON, MIME_PROTO};
pub use messages::{
    ClientInfo, Duration, FindThreatMatchesRequest, FindThreatMatchesResponse,
    ListThreatListsResponse, ThreatEntry, ThreatInfo, ThreatListDescriptor, ThreatMatch,
};
pub use negotiate::NegotiationError;
pub use types::{PlatformType, ThreatDescriptor, ThreatEntryType, ThreatType, DEFAULT_THREAT_LISTS};
