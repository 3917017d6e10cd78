//! Watermark codecs for tracemark.
//!
//! A codec pairs an `embed` and an `extract` algorithm for one carrier
//! format. All codecs implement [`WatermarkCodec`]:
//!
//! - [`ImageLsbCodec`] -- least-significant-bit embedding in RGB channels,
//!   always re-encoded as PNG
//! - [`JsonFieldCodec`] -- `tracking_id` inside an `extensions` object
//! - [`JsonZeroWidthCodec`] -- legacy scheme using invisible Unicode characters
//! - [`PassthroughCodec`] -- unsupported formats, bytes released unchanged
//!
//! # Design Rules
//!
//! 1. `embed` never writes partially: it returns complete watermarked bytes
//!    or an error.
//! 2. `extract` never fails: absence or corruption resolves to `None`.
//! 3. Codecs are pure and stateless; they know nothing of prior issuances.
//!
//! [`CodecRegistry`] maps a declared [`CarrierType`] to the codec used for
//! issuance and the ordered codecs tried during verification.

pub mod carrier;
pub mod error;
pub mod image_lsb;
pub mod json_field;
pub mod metadata;
pub mod passthrough;
pub mod registry;
pub mod traits;
pub mod zero_width;

pub use carrier::CarrierType;
pub use error::{CodecError, CodecResult};
pub use image_lsb::{ImageLsbCodec, MESSAGE_BITS};
pub use json_field::JsonFieldCodec;
pub use passthrough::PassthroughCodec;
pub use registry::{CodecRegistry, JsonScheme};
pub use traits::WatermarkCodec;
pub use zero_width::JsonZeroWidthCodec;
