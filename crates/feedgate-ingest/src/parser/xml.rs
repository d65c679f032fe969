//! XML feed decoding
//!
//! One record per repeated element: an element named `item` or `product`
//! (any depth), or any direct child of an `items`/`products` container.
//! Within a record, child-element text flattens to `tag` / `parent_child`
//! keys and element attributes to `tag_attr` keys; attributes on the record
//! element itself keep their own name. Documents without a recognizable
//! record element decode to zero rows.

use feedgate_common::types::{FeedFormat, FieldMap};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{build_row, Decoded, ParseError, RowDecoder};

pub struct XmlDecoder;

impl RowDecoder for XmlDecoder {
    fn format(&self) -> FeedFormat {
        FeedFormat::Xml
    }

    fn decode(&self, input: &str, map: &FieldMap) -> Result<Decoded, ParseError> {
        let mut reader = Reader::from_str(input);

        let mut rows = Vec::new();
        let mut skipped = 0u32;

        // Open record, if any, as accumulated (source field, value) pairs
        let mut fields: Option<Vec<(String, String)>> = None;
        // Element path inside the open record
        let mut path: Vec<String> = Vec::new();
        // Container elements outside any record
        let mut outer: Vec<String> = Vec::new();
        let mut pending_text = String::new();

        loop {
            match reader.read_event().map_err(|e| ParseError::Syntax {
                format: FeedFormat::Xml,
                message: e.to_string(),
            })? {
                Event::Start(e) => {
                    let name = local_name(&e);
                    if let Some(ref mut record) = fields {
                        path.push(name);
                        pending_text.clear();
                        let prefix = path.join("_");
                        collect_attributes(&e, &prefix, record)?;
                    } else if is_record_start(&name, &outer) {
                        let mut record = Vec::new();
                        collect_attributes(&e, "", &mut record)?;
                        fields = Some(record);
                    } else {
                        outer.push(name);
                    }
                },
                Event::Empty(e) => {
                    let name = local_name(&e);
                    if let Some(ref mut record) = fields {
                        let prefix = format!("{}{}{}", path.join("_"), sep(&path), name);
                        collect_attributes(&e, &prefix, record)?;
                    } else if is_record_start(&name, &outer) {
                        // Attribute-only record, e.g. <item code="A1" name="W"/>
                        let mut record = Vec::new();
                        collect_attributes(&e, "", &mut record)?;
                        match build_row(record, map) {
                            Some(row) => rows.push(row),
                            None => skipped += 1,
                        }
                    }
                },
                Event::Text(t) => {
                    if fields.is_some() && !path.is_empty() {
                        let text = t.unescape().map_err(|e| ParseError::Syntax {
                            format: FeedFormat::Xml,
                            message: e.to_string(),
                        })?;
                        pending_text = text.trim().to_string();
                    }
                },
                Event::End(_) => {
                    if fields.is_none() {
                        outer.pop();
                    } else if path.is_empty() {
                        // Record element closed
                        if let Some(record) = fields.take() {
                            match build_row(record, map) {
                                Some(row) => rows.push(row),
                                None => skipped += 1,
                            }
                        }
                    } else {
                        if !pending_text.is_empty() {
                            if let Some(ref mut record) = fields {
                                record.push((path.join("_"), std::mem::take(&mut pending_text)));
                            }
                        }
                        path.pop();
                    }
                },
                Event::Eof => break,
                _ => {},
            }
        }

        Ok(Decoded { rows, skipped })
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_string()
}

/// A record begins at `item`/`product`, or at any child of an
/// `items`/`products` container.
fn is_record_start(name: &str, outer: &[String]) -> bool {
    if outer.is_empty() {
        // The document root is never a record
        return false;
    }
    if name.eq_ignore_ascii_case("item") || name.eq_ignore_ascii_case("product") {
        return true;
    }
    outer
        .last()
        .map(|parent| {
            parent.eq_ignore_ascii_case("items") || parent.eq_ignore_ascii_case("products")
        })
        .unwrap_or(false)
}

fn sep(path: &[String]) -> &'static str {
    if path.is_empty() {
        ""
    } else {
        "_"
    }
}

fn collect_attributes(
    e: &BytesStart<'_>,
    prefix: &str,
    record: &mut Vec<(String, String)>,
) -> Result<(), ParseError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| ParseError::Syntax {
            format: FeedFormat::Xml,
            message: e.to_string(),
        })?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| ParseError::Syntax {
                format: FeedFormat::Xml,
                message: e.to_string(),
            })?
            .to_string();
        let key = if prefix.is_empty() {
            key
        } else {
            format!("{prefix}_{key}")
        };
        record.push((key, value));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_item_elements() {
        let input = r#"<feed><item><code>A1</code><name>WidgetA</name><price>9.99</price></item></feed>"#;
        let decoded = XmlDecoder.decode(input, &FieldMap::default()).unwrap();
        assert_eq!(decoded.rows.len(), 1);
        assert_eq!(decoded.rows[0].item_code, "A1");
        assert_eq!(decoded.rows[0].item_name, "WidgetA");
        assert_eq!(
            decoded.rows[0].attributes.get("price").map(String::as_str),
            Some("9.99")
        );
    }

    #[test]
    fn test_decode_products_container_children() {
        let input = r#"<products><prod><code>A1</code><name>W</name></prod><prod><code>B2</code><name>X</name></prod></products>"#;
        let decoded = XmlDecoder.decode(input, &FieldMap::default()).unwrap();
        assert_eq!(decoded.rows.len(), 2);
        assert_eq!(decoded.rows[1].item_code, "B2");
    }

    #[test]
    fn test_element_attributes_are_flattened() {
        let input = r#"<feed><item id="7"><code>A1</code><name>W</name><price currency="EUR">9.99</price></item></feed>"#;
        let decoded = XmlDecoder.decode(input, &FieldMap::default()).unwrap();
        let attrs = &decoded.rows[0].attributes;
        assert_eq!(attrs.get("id").map(String::as_str), Some("7"));
        assert_eq!(attrs.get("price").map(String::as_str), Some("9.99"));
        assert_eq!(attrs.get("price_currency").map(String::as_str), Some("EUR"));
    }

    #[test]
    fn test_nested_elements_use_joined_keys() {
        let input = r#"<feed><item><code>A1</code><name>W</name><dims><w>3</w><h>4</h></dims></item></feed>"#;
        let decoded = XmlDecoder.decode(input, &FieldMap::default()).unwrap();
        let attrs = &decoded.rows[0].attributes;
        assert_eq!(attrs.get("dims_w").map(String::as_str), Some("3"));
        assert_eq!(attrs.get("dims_h").map(String::as_str), Some("4"));
    }

    #[test]
    fn test_attribute_only_records() {
        let input = r#"<products><item code="A1" name="WidgetA"/></products>"#;
        let decoded = XmlDecoder.decode(input, &FieldMap::default()).unwrap();
        assert_eq!(decoded.rows.len(), 1);
        assert_eq!(decoded.rows[0].item_name, "WidgetA");
    }

    #[test]
    fn test_record_without_code_is_skipped() {
        let input = r#"<feed><item><name>NoCode</name></item><item><code>A1</code><name>W</name></item></feed>"#;
        let decoded = XmlDecoder.decode(input, &FieldMap::default()).unwrap();
        assert_eq!(decoded.rows.len(), 1);
        assert_eq!(decoded.skipped, 1);
    }

    #[test]
    fn test_invalid_document_is_fatal() {
        let err = XmlDecoder
            .decode("<feed><item><code>A1</item>", &FieldMap::default())
            .unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }

    #[test]
    fn test_no_record_elements_decodes_empty() {
        let decoded = XmlDecoder
            .decode("<feed><meta>nothing here</meta></feed>", &FieldMap::default())
            .unwrap();
        assert!(decoded.rows.is_empty());
        assert_eq!(decoded.skipped, 0);
    }
}
