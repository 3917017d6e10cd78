use serde_json::{Map, Value};
use tracemark_types::{CodecKind, TrackingCode};
use tracing::debug;

use crate::error::{CodecError, CodecResult};
use crate::traits::WatermarkCodec;

const DATA_KEY: &str = "data";
const EXTENSIONS_KEY: &str = "extensions";
const TRACKING_KEY: &str = "tracking_id";

/// Canonical JSON watermark: `extensions.tracking_id`.
///
/// The `extensions` object lives under `data` when `data` is an object,
/// otherwise at the top level. Key order is preserved and the output keeps
/// the pretty or compact layout of the input.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonFieldCodec;

impl WatermarkCodec for JsonFieldCodec {
    fn kind(&self) -> CodecKind {
        CodecKind::JsonField
    }

    fn embed(&self, content: &[u8], code: &TrackingCode) -> CodecResult<Vec<u8>> {
        let text = std::str::from_utf8(content)
            .map_err(|e| CodecError::MalformedCarrier(format!("not UTF-8: {e}")))?;
        let mut doc: Value = serde_json::from_str(text)
            .map_err(|e| CodecError::MalformedCarrier(format!("invalid JSON: {e}")))?;
        if !doc.is_object() {
            return Err(CodecError::MalformedCarrier(
                "top-level JSON value is not an object".into(),
            ));
        }

        let nested = matches!(doc.get(DATA_KEY), Some(Value::Object(_)));
        let parent = if nested { &mut doc[DATA_KEY] } else { &mut doc };
        let extensions = &mut parent[EXTENSIONS_KEY];
        if !extensions.is_object() {
            *extensions = Value::Object(Map::new());
        }
        extensions[TRACKING_KEY] = Value::String(code.to_string());

        let mut out = if text.contains('\n') {
            serde_json::to_string_pretty(&doc)
        } else {
            serde_json::to_string(&doc)
        }
        .map_err(|e| CodecError::MalformedCarrier(format!("re-serialization failed: {e}")))?;
        if text.ends_with('\n') {
            out.push('\n');
        }

        debug!(nested, "embedded JSON field watermark");
        Ok(out.into_bytes())
    }

    fn extract(&self, content: &[u8]) -> Option<TrackingCode> {
        let doc: Value = serde_json::from_slice(content).ok()?;
        let nested = doc
            .get(DATA_KEY)
            .filter(|data| data.is_object())
            .and_then(tracking_id);
        nested
            .or_else(|| tracking_id(&doc))
            .and_then(|id| TrackingCode::parse(id).ok())
    }

    fn output_extension(&self) -> Option<&'static str> {
        Some("json")
    }
}

fn tracking_id(parent: &Value) -> Option<&str> {
    parent
        .get(EXTENSIONS_KEY)
        .filter(|ext| ext.is_object())
        .and_then(|ext| ext.get(TRACKING_KEY))
        .and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code() -> TrackingCode {
        TrackingCode::parse("AB12CD34").unwrap()
    }

    fn embed_value(input: &str) -> Value {
        let out = JsonFieldCodec.embed(input.as_bytes(), &code()).unwrap();
        serde_json::from_slice(&out).unwrap()
    }

    #[test]
    fn empty_data_object_gets_extensions() {
        let doc = embed_value(r#"{"data":{}}"#);
        assert_eq!(doc["data"]["extensions"]["tracking_id"], "AB12CD34");
        assert!(doc.get("extensions").is_none());

        let out = JsonFieldCodec.embed(br#"{"data":{}}"#, &code()).unwrap();
        assert_eq!(JsonFieldCodec.extract(&out), Some(code()));
    }

    #[test]
    fn existing_extensions_are_extended() {
        let doc = embed_value(r#"{"data":{"name":"Card","extensions":{"talkativeness":"0.5"}}}"#);
        assert_eq!(doc["data"]["extensions"]["talkativeness"], "0.5");
        assert_eq!(doc["data"]["extensions"]["tracking_id"], "AB12CD34");
        assert_eq!(doc["data"]["name"], "Card");
    }

    #[test]
    fn top_level_used_when_data_is_not_object() {
        let doc = embed_value(r#"{"data":"scalar","name":"Card"}"#);
        assert_eq!(doc["extensions"]["tracking_id"], "AB12CD34");
        assert_eq!(doc["data"], "scalar");
    }

    #[test]
    fn non_object_extensions_are_replaced() {
        let doc = embed_value(r#"{"extensions":[1,2,3]}"#);
        assert_eq!(doc["extensions"]["tracking_id"], "AB12CD34");
    }

    #[test]
    fn key_order_and_layout_are_kept() {
        let input = "{\n  \"zeta\": 1,\n  \"alpha\": 2\n}\n";
        let out = JsonFieldCodec.embed(input.as_bytes(), &code()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.find("zeta").unwrap() < text.find("alpha").unwrap());
        assert!(text.contains('\n'));
        assert!(text.ends_with("}\n"));

        let compact = JsonFieldCodec.embed(br#"{"b":1,"a":2}"#, &code()).unwrap();
        assert_eq!(
            String::from_utf8(compact).unwrap(),
            r#"{"b":1,"a":2,"extensions":{"tracking_id":"AB12CD34"}}"#
        );
    }

    #[test]
    fn non_ascii_text_survives() {
        let doc = embed_value(r#"{"data":{"name":"开心果"}}"#);
        assert_eq!(doc["data"]["name"], "开心果");
    }

    #[test]
    fn malformed_carriers_are_rejected() {
        for input in [&b"{not json"[..], b"[1,2,3]", b"\"string\"", b"\xff\xfe{}"] {
            let err = JsonFieldCodec.embed(input, &code()).unwrap_err();
            assert!(matches!(err, CodecError::MalformedCarrier(_)), "{input:?}");
        }
    }

    #[test]
    fn extract_prefers_nested_location() {
        let doc = br#"{"extensions":{"tracking_id":"00000000"},"data":{"extensions":{"tracking_id":"ab12cd34"}}}"#;
        assert_eq!(JsonFieldCodec.extract(doc), Some(code()));
    }

    #[test]
    fn extract_falls_back_to_top_level() {
        let doc = br#"{"data":{"name":"x"},"extensions":{"tracking_id":"AB12CD34"}}"#;
        assert_eq!(JsonFieldCodec.extract(doc), Some(code()));
    }

    #[test]
    fn extract_never_fails() {
        assert_eq!(JsonFieldCodec.extract(b"{broken"), None);
        assert_eq!(JsonFieldCodec.extract(b""), None);
        assert_eq!(JsonFieldCodec.extract(br#"{"data":{}}"#), None);
        assert_eq!(JsonFieldCodec.extract(br#"{"extensions":{"tracking_id":42}}"#), None);
        assert_eq!(JsonFieldCodec.extract(br#"{"extensions":"AB12CD34"}"#), None);
        assert_eq!(JsonFieldCodec.extract(b"[]"), None);
    }
}
