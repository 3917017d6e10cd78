//! Textual metadata carried from an original image into its PNG re-encoding.
//!
//! PNG text chunks (`tEXt`, `zTXt`, `iTXt`) are copied verbatim. JPEG `COM`
//! segments become `tEXt` chunks with the `Comment` keyword. Everything else
//! (colour profiles, EXIF) is dropped by the re-encode.
//!
//! PNG chunk layout:
//! ```text
//! [4 bytes: data length (big-endian u32)]
//! [4 bytes: chunk type]
//! [N bytes: data]
//! [4 bytes: CRC32 over type + data (big-endian u32)]
//! ```

use image::ImageFormat;
use tracing::debug;

use crate::error::{CodecError, CodecResult};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
const TEXT_CHUNK_TYPES: [&[u8; 4]; 3] = [b"tEXt", b"zTXt", b"iTXt"];
const JPEG_COMMENT_KEYWORD: &[u8] = b"Comment";

/// A text chunk ready to be spliced into a PNG stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextChunk {
    pub chunk_type: [u8; 4],
    pub data: Vec<u8>,
}

impl TextChunk {
    /// A `tEXt` chunk: keyword, NUL separator, Latin-1 text.
    pub fn text(keyword: &[u8], text: &[u8]) -> Self {
        let mut data = Vec::with_capacity(keyword.len() + 1 + text.len());
        data.extend_from_slice(keyword);
        data.push(0);
        data.extend(text.iter().copied().filter(|&b| b != 0));
        Self {
            chunk_type: *b"tEXt",
            data,
        }
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.chunk_type);
        hasher.update(&self.data);
        out.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.chunk_type);
        out.extend_from_slice(&self.data);
        out.extend_from_slice(&hasher.finalize().to_be_bytes());
    }
}

/// Collect preservable text metadata from an original image.
///
/// Malformed structure stops the scan; whatever was read so far is kept.
pub fn collect_text_chunks(content: &[u8], format: ImageFormat) -> Vec<TextChunk> {
    match format {
        ImageFormat::Png => png_text_chunks(content),
        ImageFormat::Jpeg => jpeg_comments(content),
        _ => Vec::new(),
    }
}

/// Insert `chunks` immediately before the `IEND` chunk of `png`.
pub fn insert_text_chunks(png: Vec<u8>, chunks: &[TextChunk]) -> CodecResult<Vec<u8>> {
    if chunks.is_empty() {
        return Ok(png);
    }

    let iend = png_chunks(&png)
        .find(|(chunk_type, _, _)| chunk_type == b"IEND")
        .map(|(_, _, offset)| offset)
        .ok_or_else(|| CodecError::MalformedCarrier("encoded PNG has no IEND chunk".into()))?;

    let mut out = Vec::with_capacity(png.len() + chunks.iter().map(|c| c.data.len() + 12).sum::<usize>());
    out.extend_from_slice(&png[..iend]);
    for chunk in chunks {
        chunk.encode_into(&mut out);
    }
    out.extend_from_slice(&png[iend..]);

    debug!(chunks = chunks.len(), "carried text metadata into PNG");
    Ok(out)
}

fn png_text_chunks(content: &[u8]) -> Vec<TextChunk> {
    png_chunks(content)
        .filter(|(chunk_type, _, _)| TEXT_CHUNK_TYPES.contains(&chunk_type))
        .map(|(chunk_type, data, _)| TextChunk {
            chunk_type,
            data: data.to_vec(),
        })
        .collect()
}

/// Iterate `(type, data, chunk_offset)` over a PNG stream, stopping at
/// `IEND` (inclusive) or the first truncated chunk.
fn png_chunks(content: &[u8]) -> impl Iterator<Item = ([u8; 4], &[u8], usize)> {
    let mut offset = if content.starts_with(&PNG_SIGNATURE) {
        PNG_SIGNATURE.len()
    } else {
        content.len()
    };
    let mut done = false;

    std::iter::from_fn(move || {
        if done || offset + 12 > content.len() {
            return None;
        }
        let length = u32::from_be_bytes([
            content[offset],
            content[offset + 1],
            content[offset + 2],
            content[offset + 3],
        ]) as usize;
        let data_start = offset + 8;
        let data_end = data_start.checked_add(length)?;
        if data_end + 4 > content.len() {
            done = true;
            return None;
        }
        let chunk_type = [
            content[offset + 4],
            content[offset + 5],
            content[offset + 6],
            content[offset + 7],
        ];
        let chunk_offset = offset;
        offset = data_end + 4;
        if &chunk_type == b"IEND" {
            done = true;
        }
        Some((chunk_type, &content[data_start..data_end], chunk_offset))
    })
}

fn jpeg_comments(content: &[u8]) -> Vec<TextChunk> {
    let mut comments = Vec::new();
    if !content.starts_with(&[0xff, 0xd8]) {
        return comments;
    }

    let mut pos = 2;
    while pos + 4 <= content.len() {
        if content[pos] != 0xff {
            break;
        }
        let marker = content[pos + 1];
        match marker {
            // Fill byte.
            0xff => {
                pos += 1;
                continue;
            }
            // Standalone markers carry no length.
            0x01 | 0xd0..=0xd8 => {
                pos += 2;
                continue;
            }
            // Start of scan or end of image: no more headers.
            0xda | 0xd9 => break,
            _ => {}
        }

        let segment_len = u16::from_be_bytes([content[pos + 2], content[pos + 3]]) as usize;
        if segment_len < 2 || pos + 2 + segment_len > content.len() {
            break;
        }
        if marker == 0xfe {
            let body = &content[pos + 4..pos + 2 + segment_len];
            comments.push(TextChunk::text(JPEG_COMMENT_KEYWORD, body));
        }
        pos += 2 + segment_len;
    }
    comments
}
