//! Leak attribution for community-distributed artifacts.
//!
//! [`LeakAttributionService`] ties the pieces together: a [`CodeGenerator`]
//! mints tracking codes, the [`CodecRegistry`] embeds them into carriers,
//! and a [`TrackingLedger`] records who received which code. Verification
//! runs the same pipeline backwards and resolves a recovered code to an
//! [`AttributionResult`].

pub mod clock;
pub mod config;
pub mod error;
pub mod generator;
pub mod service;

pub use clock::{Clock, SystemClock};
pub use config::AttributionConfig;
pub use error::AttributionError;
pub use generator::{CodeGenerator, RandomCodeGenerator};
pub use service::{AttributionResult, Issued, LeakAttributionService, DEFAULT_LIST_LIMIT};

// Re-export key types
pub use tracemark_codec::{CarrierType, CodecRegistry, JsonScheme};
pub use tracemark_ledger::{FileLedger, InMemoryLedger, SyncMode, TrackingLedger};
pub use tracemark_types::{
    ArtifactReference, CodecKind, IssuanceId, IssuanceRecord, Requester, TrackingCode,
};
