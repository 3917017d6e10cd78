use tracemark_types::{CodecKind, TrackingCode};

use crate::error::CodecResult;

/// Paired embed/extract algorithm for one carrier format.
///
/// Implementations must satisfy:
/// - `extract(embed(c, code)?) == Some(code)` for every carrier `c` that
///   `embed` accepts (except [`CodecKind::Passthrough`]).
/// - `embed` returns complete bytes or an error, never a partial result.
/// - `extract` never panics on arbitrary input.
pub trait WatermarkCodec: Send + Sync {
    /// The scheme this codec implements.
    fn kind(&self) -> CodecKind;

    /// Embed `code` into `content`, returning the watermarked bytes.
    fn embed(&self, content: &[u8], code: &TrackingCode) -> CodecResult<Vec<u8>>;

    /// Recover a tracking code from `content`, if one is present.
    fn extract(&self, content: &[u8]) -> Option<TrackingCode>;

    /// File extension the embedded output should be delivered with.
    ///
    /// `None` means the caller keeps the original extension.
    fn output_extension(&self) -> Option<&'static str> {
        None
    }
}
