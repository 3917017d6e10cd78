use tracemark_types::{CodecKind, TrackingCode};
use tracing::debug;

use crate::error::{CodecError, CodecResult};
use crate::traits::WatermarkCodec;

/// Invisible code point for each nibble value, indexed by nibble.
const NIBBLE_CHARS: [char; 16] = [
    '\u{200B}', // zero width space
    '\u{200C}', // zero width non-joiner
    '\u{200D}', // zero width joiner
    '\u{2060}', // word joiner
    '\u{2061}', // function application
    '\u{2062}', // invisible times
    '\u{2063}', // invisible separator
    '\u{2064}', // invisible plus
    '\u{FEFF}', // zero width no-break space
    '\u{200E}', // left-to-right mark
    '\u{200F}', // right-to-left mark
    '\u{202A}', // left-to-right embedding
    '\u{202B}', // right-to-left embedding
    '\u{202C}', // pop directional formatting
    '\u{202D}', // left-to-right override
    '\u{202E}', // right-to-left override
];

/// Legacy JSON watermark made of invisible Unicode characters.
///
/// Each hex nibble of the code maps to one reserved code point. The
/// sequence is inserted right after the first `{` (or prepended when the
/// text has none). Documents issued this way are not valid JSON any more,
/// so new issuance should prefer [`crate::JsonFieldCodec`]; extraction stays
/// supported for artifacts already in circulation.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonZeroWidthCodec;

impl JsonZeroWidthCodec {
    fn nibble_of(c: char) -> Option<u8> {
        NIBBLE_CHARS.iter().position(|&n| n == c).map(|i| i as u8)
    }

    /// Maximal runs of consecutive table characters, keyed by the byte
    /// offset where each run starts.
    fn nibble_runs(text: &str) -> Vec<(usize, Vec<u8>)> {
        let mut runs: Vec<(usize, Vec<u8>)> = Vec::new();
        let mut current: Option<(usize, Vec<u8>)> = None;
        for (offset, c) in text.char_indices() {
            let Some(n) = Self::nibble_of(c) else {
                runs.extend(current.take());
                continue;
            };
            if let Some((_, run)) = current.as_mut() {
                run.push(n);
            } else {
                current = Some((offset, vec![n]));
            }
        }
        runs.extend(current);
        runs
    }
}

impl WatermarkCodec for JsonZeroWidthCodec {
    fn kind(&self) -> CodecKind {
        CodecKind::JsonZeroWidth
    }

    fn embed(&self, content: &[u8], code: &TrackingCode) -> CodecResult<Vec<u8>> {
        let text = std::str::from_utf8(content)
            .map_err(|e| CodecError::MalformedCarrier(format!("not UTF-8: {e}")))?;
        let invisible: String = code.nibbles().map(|n| NIBBLE_CHARS[usize::from(n)]).collect();

        let at = text.find('{').map(|i| i + 1).unwrap_or(0);
        let mut out = String::with_capacity(text.len() + invisible.len());
        out.push_str(&text[..at]);
        out.push_str(&invisible);
        out.push_str(&text[at..]);

        debug!(offset = at, "embedded zero-width watermark");
        Ok(out.into_bytes())
    }

    /// Looks for a run of exactly [`TrackingCode::LEN`] table characters,
    /// first right after the first `{`, then anywhere. Emoji joiners, BOMs
    /// and bidi marks elsewhere in the text do not disturb such a run. Only
    /// when no run fits are all table characters in the text collected.
    fn extract(&self, content: &[u8]) -> Option<TrackingCode> {
        let text = String::from_utf8_lossy(content);
        let runs = Self::nibble_runs(&text);
        if runs.is_empty() {
            return None;
        }

        let after_brace = text.find('{').map(|i| i + 1);
        let exact = |run: &Vec<u8>| run.len() == TrackingCode::LEN;
        let run = runs
            .iter()
            .find(|(start, run)| Some(*start) == after_brace && exact(run))
            .or_else(|| runs.iter().find(|(_, run)| exact(run)));
        if let Some((_, nibbles)) = run {
            return TrackingCode::from_nibbles(nibbles).ok();
        }

        let scattered: Vec<u8> = runs.into_iter().flat_map(|(_, run)| run).collect();
        TrackingCode::from_nibbles(&scattered).ok()
    }

    fn output_extension(&self) -> Option<&'static str> {
        Some("json")
    }
}
