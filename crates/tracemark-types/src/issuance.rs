use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::code::TrackingCode;

/// Community member that received a download.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Requester {
    /// Stable platform identifier.
    pub id: String,
    /// Display name at the time of the download, if known.
    pub display_name: Option<String>,
}

impl Requester {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

impl fmt::Display for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.display_name {
            Some(name) => write!(f, "{name} ({})", self.id),
            None => f.write_str(&self.id),
        }
    }
}

/// Logical identity of a distributed file.
///
/// Supplied by the file-storage layer. Tracemark stores and echoes it back
/// but never interprets its parts.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactReference {
    pub post: String,
    pub file_name: String,
    pub version: String,
}

impl ArtifactReference {
    pub fn new(
        post: impl Into<String>,
        file_name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            post: post.into(),
            file_name: file_name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for ArtifactReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.post, self.file_name, self.version)
    }
}

/// Watermark scheme that carried a tracking code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodecKind {
    /// Least-significant-bit embedding in RGB channels.
    ImageLsb,
    /// `tracking_id` field inside a JSON `extensions` object.
    JsonField,
    /// Invisible Unicode characters inserted into JSON text.
    JsonZeroWidth,
    /// No embedding; the artifact was released unchanged.
    Passthrough,
}

impl CodecKind {
    /// Returns `true` if this scheme actually carries the code in the bytes.
    pub fn embeds_code(&self) -> bool {
        !matches!(self, Self::Passthrough)
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageLsb => write!(f, "image-lsb"),
            Self::JsonField => write!(f, "json-field"),
            Self::JsonZeroWidth => write!(f, "json-zero-width"),
            Self::Passthrough => write!(f, "passthrough"),
        }
    }
}

/// Ledger-assigned sequence number of an issuance (starts at 1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IssuanceId(pub u64);

impl fmt::Display for IssuanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An issuance that has been embedded but not yet recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingIssuance {
    pub tracking_code: TrackingCode,
    pub requester: Requester,
    pub artifact: ArtifactReference,
    pub issued_at: DateTime<Utc>,
    pub codec: CodecKind,
}

impl PendingIssuance {
    /// Attach the ledger-assigned id.
    pub fn into_record(self, id: IssuanceId) -> IssuanceRecord {
        IssuanceRecord {
            id,
            tracking_code: self.tracking_code,
            requester: self.requester,
            artifact: self.artifact,
            issued_at: self.issued_at,
            codec: self.codec,
        }
    }
}

/// Immutable ledger row binding a tracking code to its recipient.
///
/// Created exactly once per successful embedding and never mutated or
/// deleted afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceRecord {
    pub id: IssuanceId,
    pub tracking_code: TrackingCode,
    pub requester: Requester,
    pub artifact: ArtifactReference,
    pub issued_at: DateTime<Utc>,
    pub codec: CodecKind,
}
