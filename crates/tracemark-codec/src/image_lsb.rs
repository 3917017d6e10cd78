use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use tracemark_types::{CodecKind, TrackingCode};
use tracing::debug;

use crate::error::{CodecError, CodecResult};
use crate::metadata;
use crate::traits::WatermarkCodec;

const OPEN_DELIMITER: &[u8] = b"<<";
const CLOSE_DELIMITER: &[u8] = b">>";

/// Bytes in an embedded message: delimiters, code, terminating zero.
pub const MESSAGE_LEN: usize = OPEN_DELIMITER.len() + TrackingCode::LEN + CLOSE_DELIMITER.len() + 1;

/// Bits an image must hold to carry one code (104).
pub const MESSAGE_BITS: u64 = (MESSAGE_LEN * 8) as u64;

/// Color channels per pixel that carry message bits (R, G, B).
const CARRIER_CHANNELS: usize = 3;

/// Least-significant-bit watermark for raster images.
///
/// The message `<<CODE>>\0` is written MSB-first into the lowest bit of the
/// R, G and B channels, walking pixels in raster order. Alpha is never
/// touched. Output is always PNG because lossy re-encoding destroys LSBs.
///
/// Output samples are always 8-bit RGB, or RGBA when the carrier has alpha.
/// Grayscale, 16-bit and float carriers are converted before embedding.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageLsbCodec;

impl ImageLsbCodec {
    /// Number of message bits an image of `width` x `height` can carry.
    pub fn capacity_bits(width: u32, height: u32) -> u64 {
        u64::from(width) * u64::from(height) * CARRIER_CHANNELS as u64
    }
}

impl WatermarkCodec for ImageLsbCodec {
    fn kind(&self) -> CodecKind {
        CodecKind::ImageLsb
    }

    fn embed(&self, content: &[u8], code: &TrackingCode) -> CodecResult<Vec<u8>> {
        let format = image::guess_format(content)
            .map_err(|e| CodecError::MalformedCarrier(e.to_string()))?;
        let decoded = image::load_from_memory_with_format(content, format)
            .map_err(|e| CodecError::MalformedCarrier(e.to_string()))?;

        let available_bits = Self::capacity_bits(decoded.width(), decoded.height());
        if MESSAGE_BITS > available_bits {
            return Err(CodecError::InsufficientCapacity {
                required_bits: MESSAGE_BITS,
                available_bits,
            });
        }

        let source_color = decoded.color();
        let converted = !matches!(
            source_color,
            image::ColorType::Rgb8 | image::ColorType::Rgba8
        );
        if converted {
            debug!(
                ?source_color,
                "converting carrier to 8-bit {}",
                if source_color.has_alpha() { "RGBA" } else { "RGB" }
            );
        }

        let message = build_message(code);
        let watermarked = if source_color.has_alpha() {
            let mut pixels = decoded.to_rgba8();
            write_lsb(&mut pixels, 4, &message);
            DynamicImage::ImageRgba8(pixels)
        } else {
            let mut pixels = decoded.to_rgb8();
            write_lsb(&mut pixels, 3, &message);
            DynamicImage::ImageRgb8(pixels)
        };

        let mut png = Vec::new();
        watermarked
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| CodecError::MalformedCarrier(format!("PNG re-encode failed: {e}")))?;

        let text = metadata::collect_text_chunks(content, format);
        let png = metadata::insert_text_chunks(png, &text)?;

        debug!(
            source_format = ?format,
            ?source_color,
            converted,
            width = watermarked.width(),
            height = watermarked.height(),
            alpha = watermarked.color().has_alpha(),
            "embedded image watermark"
        );
        Ok(png)
    }

    fn extract(&self, content: &[u8]) -> Option<TrackingCode> {
        let decoded = image::load_from_memory(content).ok()?;
        let pixels = decoded.to_rgb8();
        let text = read_lsb(&pixels, 3);
        find_delimited_code(&text)
    }

    fn output_extension(&self) -> Option<&'static str> {
        Some("png")
    }
}

fn build_message(code: &TrackingCode) -> Vec<u8> {
    let mut message = Vec::with_capacity(MESSAGE_LEN);
    message.extend_from_slice(OPEN_DELIMITER);
    message.extend_from_slice(code.as_str().as_bytes());
    message.extend_from_slice(CLOSE_DELIMITER);
    message.push(0);
    message
}

/// Overwrite channel LSBs with `message` bits, MSB first. `stride` is the
/// number of samples per pixel; only the first three are written.
fn write_lsb(samples: &mut [u8], stride: usize, message: &[u8]) {
    let mut bits = message
        .iter()
        .flat_map(|byte| (0..8).rev().map(move |shift| (byte >> shift) & 1));

    for pixel in samples.chunks_exact_mut(stride) {
        for channel in &mut pixel[..CARRIER_CHANNELS] {
            match bits.next() {
                Some(bit) => *channel = (*channel & !1) | bit,
                None => return,
            }
        }
    }
}

/// Read channel LSBs back into bytes, stopping at the first zero byte or
/// when fewer than eight bits remain.
fn read_lsb(samples: &[u8], stride: usize) -> Vec<u8> {
    let mut bits = samples
        .chunks_exact(stride)
        .flat_map(|pixel| pixel[..CARRIER_CHANNELS].iter().map(|channel| channel & 1));

    let mut text = Vec::new();
    loop {
        let mut byte = 0u8;
        for _ in 0..8 {
            match bits.next() {
                Some(bit) => byte = (byte << 1) | bit,
                None => return text,
            }
        }
        if byte == 0 {
            return text;
        }
        text.push(byte);
    }
}

fn find_delimited_code(text: &[u8]) -> Option<TrackingCode> {
    let start = find(text, OPEN_DELIMITER)? + OPEN_DELIMITER.len();
    let end = start + find(&text[start..], CLOSE_DELIMITER)?;
    let enclosed = std::str::from_utf8(&text[start..end]).ok()?;
    TrackingCode::parse(enclosed).ok()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
