//! Foundation types for tracemark.
//!
//! Every other tracemark crate depends on `tracemark-types`. The types here
//! describe *who* received *what* and *when*; they carry no knowledge of how
//! a code is embedded or where a record is stored.
//!
//! # Key Types
//!
//! - [`TrackingCode`] -- 8-character uppercase hex identifier embedded in a carrier
//! - [`Requester`] -- community member identity that received a download
//! - [`ArtifactReference`] -- (post, file, version) triple of a distributed file
//! - [`IssuanceRecord`] -- immutable ledger row binding a code to its recipient
//! - [`CodecKind`] -- which watermark scheme carried a code

pub mod code;
pub mod error;
pub mod issuance;

pub use code::TrackingCode;
pub use error::TypeError;
pub use issuance::{
    ArtifactReference, CodecKind, IssuanceId, IssuanceRecord, PendingIssuance, Requester,
};
