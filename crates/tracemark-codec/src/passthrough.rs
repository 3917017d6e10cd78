use tracemark_types::{CodecKind, TrackingCode};

use crate::error::CodecResult;
use crate::traits::WatermarkCodec;

/// Codec for carriers with no watermark scheme: bytes pass through unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassthroughCodec;

impl WatermarkCodec for PassthroughCodec {
    fn kind(&self) -> CodecKind {
        CodecKind::Passthrough
    }

    fn embed(&self, content: &[u8], _code: &TrackingCode) -> CodecResult<Vec<u8>> {
        Ok(content.to_vec())
    }

    fn extract(&self, _content: &[u8]) -> Option<TrackingCode> {
        None
    }
}
