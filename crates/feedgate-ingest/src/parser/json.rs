//! JSON feed decoding
//!
//! Accepts a top-level array of objects, or a top-level object in which
//! case the first value that is an array of objects carries the rows
//! (a lone object decodes as a single row). Scalar values are stringified;
//! nested arrays/objects inside a row are ignored.

use feedgate_common::types::{FeedFormat, FieldMap};
use serde_json::{Map, Value};

use super::{build_row, Decoded, ParseError, RowDecoder};

pub struct JsonDecoder;

impl RowDecoder for JsonDecoder {
    fn format(&self) -> FeedFormat {
        FeedFormat::Json
    }

    fn decode(&self, input: &str, map: &FieldMap) -> Result<Decoded, ParseError> {
        let value: Value = serde_json::from_str(input).map_err(|e| ParseError::Syntax {
            format: FeedFormat::Json,
            message: e.to_string(),
        })?;

        match value {
            Value::Array(items) => Ok(decode_array(items, map)),
            Value::Object(object) => {
                // Feed wrapped in an envelope object: the first array of
                // objects carries the rows
                for (_, candidate) in &object {
                    if let Value::Array(items) = candidate {
                        if items.first().map(Value::is_object).unwrap_or(false) {
                            return Ok(decode_array(items.clone(), map));
                        }
                    }
                }
                Ok(decode_array(vec![Value::Object(object)], map))
            },
            _ => Err(ParseError::Syntax {
                format: FeedFormat::Json,
                message: "expected an array of objects or an object".to_string(),
            }),
        }
    }
}

fn decode_array(items: Vec<Value>, map: &FieldMap) -> Decoded {
    let mut rows = Vec::new();
    let mut skipped = 0u32;

    for item in items {
        let Value::Object(object) = item else {
            skipped += 1;
            continue;
        };
        match build_row(scalar_fields(object), map) {
            Some(row) => rows.push(row),
            None => skipped += 1,
        }
    }

    Decoded { rows, skipped }
}

/// Stringify the scalar members of an object; nested values are dropped
fn scalar_fields(object: Map<String, Value>) -> Vec<(String, String)> {
    object
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null | Value::Array(_) | Value::Object(_) => return None,
            };
            Some((key, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_array_of_objects() {
        let input = r#"[{"code": "A1", "name": "WidgetA", "price": 9.99}]"#;
        let decoded = JsonDecoder.decode(input, &FieldMap::default()).unwrap();
        assert_eq!(decoded.rows.len(), 1);
        assert_eq!(decoded.rows[0].item_code, "A1");
        assert_eq!(
            decoded.rows[0].attributes.get("price").map(String::as_str),
            Some("9.99")
        );
    }

    #[test]
    fn test_decode_enveloped_array() {
        let input = r#"{"generated": "2026-08-24", "products": [{"code": "A1", "name": "W"}]}"#;
        let decoded = JsonDecoder.decode(input, &FieldMap::default()).unwrap();
        assert_eq!(decoded.rows.len(), 1);
        assert_eq!(decoded.rows[0].item_code, "A1");
    }

    #[test]
    fn test_lone_object_is_a_single_row() {
        let input = r#"{"code": "A1", "name": "W"}"#;
        let decoded = JsonDecoder.decode(input, &FieldMap::default()).unwrap();
        assert_eq!(decoded.rows.len(), 1);
    }

    #[test]
    fn test_non_object_members_are_skipped() {
        let input = r#"[{"code": "A1", "name": "W"}, 42, "noise"]"#;
        let decoded = JsonDecoder.decode(input, &FieldMap::default()).unwrap();
        assert_eq!(decoded.rows.len(), 1);
        assert_eq!(decoded.skipped, 2);
    }

    #[test]
    fn test_nested_values_are_dropped() {
        let input = r#"[{"code": "A1", "name": "W", "tags": ["a"], "meta": {"x": 1}, "gone": null}]"#;
        let decoded = JsonDecoder.decode(input, &FieldMap::default()).unwrap();
        assert!(decoded.rows[0].attributes.is_empty());
    }

    #[test]
    fn test_scalars_are_stringified() {
        let input = r#"[{"code": "A1", "name": "W", "stock": 4, "active": true}]"#;
        let decoded = JsonDecoder.decode(input, &FieldMap::default()).unwrap();
        let attrs = &decoded.rows[0].attributes;
        assert_eq!(attrs.get("stock").map(String::as_str), Some("4"));
        assert_eq!(attrs.get("active").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_invalid_document_is_fatal() {
        let err = JsonDecoder
            .decode("{not json", &FieldMap::default())
            .unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }

    #[test]
    fn test_top_level_scalar_is_fatal() {
        let err = JsonDecoder.decode("42", &FieldMap::default()).unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }
}
