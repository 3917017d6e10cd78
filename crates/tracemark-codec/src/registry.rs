use serde::{Deserialize, Serialize};
use tracemark_types::CodecKind;

use crate::carrier::CarrierType;
use crate::image_lsb::ImageLsbCodec;
use crate::json_field::JsonFieldCodec;
use crate::passthrough::PassthroughCodec;
use crate::traits::WatermarkCodec;
use crate::zero_width::JsonZeroWidthCodec;

/// JSON scheme used for new issuances.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonScheme {
    /// `extensions.tracking_id` (keeps the document valid JSON).
    #[default]
    Field,
    /// Legacy invisible-character sequence.
    ZeroWidth,
}

/// Dispatch from declared carrier type to codecs.
#[derive(Clone, Debug, Default)]
pub struct CodecRegistry {
    image: ImageLsbCodec,
    json_field: JsonFieldCodec,
    json_zero_width: JsonZeroWidthCodec,
    passthrough: PassthroughCodec,
    json_scheme: JsonScheme,
}

impl CodecRegistry {
    pub fn new(json_scheme: JsonScheme) -> Self {
        Self {
            json_scheme,
            ..Self::default()
        }
    }

    /// Codec used to embed a code into a carrier of the given type.
    pub fn embedder(&self, carrier: CarrierType) -> &dyn WatermarkCodec {
        match carrier {
            CarrierType::Image => &self.image,
            CarrierType::Json => match self.json_scheme {
                JsonScheme::Field => &self.json_field,
                JsonScheme::ZeroWidth => &self.json_zero_width,
            },
            CarrierType::Unsupported => &self.passthrough,
        }
    }

    /// Codecs tried, in order, when extracting from a carrier.
    ///
    /// JSON always tries the canonical field scheme before the legacy one,
    /// whichever scheme is configured for issuance. An empty list means the
    /// type has no watermark scheme at all.
    pub fn extractors(&self, carrier: CarrierType) -> Vec<&dyn WatermarkCodec> {
        match carrier {
            CarrierType::Image => vec![&self.image as &dyn WatermarkCodec],
            CarrierType::Json => vec![
                &self.json_field as &dyn WatermarkCodec,
                &self.json_zero_width,
            ],
            CarrierType::Unsupported => Vec::new(),
        }
    }
}
