use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracemark_codec::{CarrierType, CodecRegistry};
use tracemark_ledger::{FileLedger, LedgerError, LedgerReader, LedgerWriter, TrackingLedger};
use tracemark_types::{
    ArtifactReference, CodecKind, IssuanceRecord, PendingIssuance, Requester, TrackingCode,
};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::AttributionConfig;
use crate::error::AttributionError;
use crate::generator::{CodeGenerator, RandomCodeGenerator};

/// Listing limit used when the caller gives none.
pub const DEFAULT_LIST_LIMIT: usize = 50;

const DEFAULT_MAX_CODE_ATTEMPTS: u32 = 16;

/// A watermarked artifact, ready for delivery.
///
/// Only produced after the ledger record is committed.
#[derive(Clone, Debug)]
pub struct Issued {
    pub content: Vec<u8>,
    /// Extension the content must be delivered with, if it changed.
    pub extension: Option<&'static str>,
    pub record: IssuanceRecord,
}

impl Issued {
    /// Delivery file name: `original` with its extension replaced by the
    /// codec's hint, or unchanged when there is no hint.
    pub fn file_name(&self, original: &str) -> String {
        let Some(ext) = self.extension else {
            return original.to_string();
        };
        let stem = Path::new(original)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(original);
        format!("{stem}.{ext}")
    }
}

/// Outcome of verifying a suspected leak.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttributionResult {
    /// The code resolved to an issuance.
    Attributed {
        record: IssuanceRecord,
        /// Scheme that recovered the code.
        recovered_by: CodecKind,
    },
    /// A well-formed code with no ledger record.
    OrphanCode {
        code: TrackingCode,
        recovered_by: CodecKind,
    },
    /// The carrier decoded but held no code.
    NoWatermarkFound,
    /// No watermark scheme exists for the declared type.
    UnsupportedFormat,
}

impl AttributionResult {
    pub fn is_attributed(&self) -> bool {
        matches!(self, Self::Attributed { .. })
    }

    /// The recovered code, if any.
    pub fn tracking_code(&self) -> Option<&TrackingCode> {
        match self {
            Self::Attributed { record, .. } => Some(&record.tracking_code),
            Self::OrphanCode { code, .. } => Some(code),
            Self::NoWatermarkFound | Self::UnsupportedFormat => None,
        }
    }
}

/// Issues watermarked artifacts and attributes leaked ones.
///
/// Holds no state of its own beyond its collaborators, so one instance can
/// be shared across threads. Concurrent issuances coordinate only through
/// the ledger's uniqueness check.
pub struct LeakAttributionService {
    generator: Box<dyn CodeGenerator>,
    codecs: CodecRegistry,
    ledger: Arc<dyn TrackingLedger>,
    clock: Box<dyn Clock>,
    max_code_attempts: u32,
}

impl LeakAttributionService {
    pub fn new(
        generator: impl CodeGenerator + 'static,
        codecs: CodecRegistry,
        ledger: Arc<dyn TrackingLedger>,
    ) -> Self {
        Self {
            generator: Box::new(generator),
            codecs,
            ledger,
            clock: Box::new(SystemClock),
            max_code_attempts: DEFAULT_MAX_CODE_ATTEMPTS,
        }
    }

    /// Build a service over the durable ledger named in `config`.
    pub fn open(config: &AttributionConfig) -> Result<Self, AttributionError> {
        let ledger = FileLedger::open(&config.ledger_path, config.sync_mode)?;
        Ok(Self::new(
            RandomCodeGenerator,
            CodecRegistry::new(config.json_scheme),
            Arc::new(ledger),
        )
        .with_max_code_attempts(config.max_code_attempts))
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_max_code_attempts(mut self, attempts: u32) -> Self {
        self.max_code_attempts = attempts.max(1);
        self
    }

    // ---- Issuance ----

    /// Watermark `content` for `requester` and record the issuance.
    ///
    /// Embed failures abort before anything is written. The watermarked
    /// bytes are returned only once the ledger append has succeeded; a
    /// ledger failure yields [`AttributionError::StorageFailure`] and no
    /// bytes.
    pub fn issue(
        &self,
        content: &[u8],
        carrier: CarrierType,
        requester: &Requester,
        artifact: &ArtifactReference,
    ) -> Result<Issued, AttributionError> {
        let codec = self.codecs.embedder(carrier);
        if !codec.kind().embeds_code() {
            warn!(%artifact, %requester, %carrier, "issuing without an embedded watermark");
        }

        for attempt in 1..=self.max_code_attempts {
            let code = self.generator.generate();
            if self.ledger.contains(&code)? {
                warn!(%code, attempt, "generated code already issued, regenerating");
                continue;
            }

            let watermarked = codec.embed(content, &code)?;
            let pending = PendingIssuance {
                tracking_code: code,
                requester: requester.clone(),
                artifact: artifact.clone(),
                issued_at: self.clock.now(),
                codec: codec.kind(),
            };

            match self.ledger.append(&pending) {
                Ok(id) => {
                    info!(
                        %id,
                        code = %pending.tracking_code,
                        %requester,
                        %artifact,
                        codec = %pending.codec,
                        "issued artifact"
                    );
                    return Ok(Issued {
                        content: watermarked,
                        extension: codec.output_extension(),
                        record: pending.into_record(id),
                    });
                }
                Err(LedgerError::DuplicateCode(code)) => {
                    warn!(%code, attempt, "tracking code collision on append, regenerating");
                }
                Err(e) => return Err(AttributionError::StorageFailure(e)),
            }
        }

        Err(AttributionError::CodeSpaceExhausted {
            attempts: self.max_code_attempts,
        })
    }

    // ---- Verification ----

    /// Attribute a suspected leak of declared type `carrier`.
    ///
    /// Every "nothing found" case is a value, not an error. Only a ledger
    /// read failure returns `Err`.
    pub fn verify(
        &self,
        content: &[u8],
        carrier: CarrierType,
    ) -> Result<AttributionResult, AttributionError> {
        let extractors = self.codecs.extractors(carrier);
        if extractors.is_empty() {
            debug!(%carrier, "no watermark scheme for carrier");
            return Ok(AttributionResult::UnsupportedFormat);
        }

        let recovered = extractors
            .iter()
            .find_map(|codec| codec.extract(content).map(|code| (code, codec.kind())));
        let Some((code, recovered_by)) = recovered else {
            info!(%carrier, "no watermark found");
            return Ok(AttributionResult::NoWatermarkFound);
        };

        match self.ledger.lookup_by_code(&code)? {
            Some(record) => {
                info!(
                    %code,
                    requester = %record.requester,
                    artifact = %record.artifact,
                    %recovered_by,
                    "leak attributed"
                );
                Ok(AttributionResult::Attributed {
                    record,
                    recovered_by,
                })
            }
            None => {
                warn!(%code, %recovered_by, "recovered code has no issuance record");
                Ok(AttributionResult::OrphanCode { code, recovered_by })
            }
        }
    }

    /// [`Self::verify`] with the declared type taken from a file name.
    pub fn verify_file(
        &self,
        content: &[u8],
        file_name: &str,
    ) -> Result<AttributionResult, AttributionError> {
        self.verify(content, CarrierType::from_filename(file_name))
    }

    // ---- Audit ----

    /// Issuances of one artifact, newest first.
    pub fn list_issuances(
        &self,
        artifact: &ArtifactReference,
        limit: usize,
    ) -> Result<Vec<IssuanceRecord>, AttributionError> {
        Ok(self.ledger.lookup_by_artifact(artifact, limit, true)?)
    }

    /// Issuances of every file and version under a post, newest first.
    pub fn list_post_issuances(
        &self,
        post: &str,
        limit: usize,
    ) -> Result<Vec<IssuanceRecord>, AttributionError> {
        Ok(self.ledger.lookup_by_post(post, limit, true)?)
    }

    /// Look up a single issuance by code.
    pub fn show(&self, code: &TrackingCode) -> Result<Option<IssuanceRecord>, AttributionError> {
        Ok(self.ledger.lookup_by_code(code)?)
    }
}
