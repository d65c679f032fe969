//! Format-specific feed decoding
//!
//! Each supported format decodes into the same canonical row shape so the
//! reconciler never sees the wire format. The contract:
//!
//! - a structurally invalid document (bad syntax, undecodable bytes) fails
//!   the whole parse with [`ParseError`]
//! - a malformed individual entry (no item code, wrong shape) is skipped
//!   and tallied, never fatal
//!
//! Input is treated as UTF-8.

mod csv;
mod json;
mod xml;

pub use csv::CsvDecoder;
pub use json::JsonDecoder;
pub use xml::XmlDecoder;

use std::collections::BTreeMap;

use feedgate_common::types::{CanonicalRow, FeedFormat, FieldMap};
use thiserror::Error;
use tracing::debug;

/// Fatal parse failure for a whole document
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("input is not valid UTF-8")]
    Encoding,

    #[error("invalid {format} document: {message}")]
    Syntax { format: FeedFormat, message: String },

    #[error("feed header has no '{0}' column")]
    MissingColumn(String),
}

/// Result of decoding one feed document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub rows: Vec<CanonicalRow>,
    /// Malformed entries dropped during the parse
    pub skipped: u32,
}

/// Capability to decode one wire format into canonical rows
pub trait RowDecoder {
    fn format(&self) -> FeedFormat;

    fn decode(&self, input: &str, map: &FieldMap) -> Result<Decoded, ParseError>;
}

/// Decode raw feed bytes according to the declared format
pub fn decode_feed(
    format: FeedFormat,
    bytes: &[u8],
    map: &FieldMap,
) -> Result<Decoded, ParseError> {
    let input = std::str::from_utf8(bytes).map_err(|_| ParseError::Encoding)?;

    let decoded = match format {
        FeedFormat::Csv => CsvDecoder.decode(input, map),
        FeedFormat::Xml => XmlDecoder.decode(input, map),
        FeedFormat::Json => JsonDecoder.decode(input, map),
    }?;

    debug!(
        format = %format,
        rows = decoded.rows.len(),
        skipped = decoded.skipped,
        "Feed decoded"
    );
    Ok(decoded)
}

/// Assemble a canonical row from named source fields
///
/// Returns `None` (a skip) when the mapped item code is missing or empty.
pub(crate) fn build_row(
    fields: impl IntoIterator<Item = (String, String)>,
    map: &FieldMap,
) -> Option<CanonicalRow> {
    let mut item_code = None;
    let mut item_name = None;
    let mut attributes = BTreeMap::new();

    for (key, value) in fields {
        let key = key.trim();
        if key == map.item_code_field {
            item_code = Some(value.trim().to_string());
        } else if key == map.item_name_field {
            item_name = Some(value.trim().to_string());
        } else if let Some(attr) = map.attribute_name(key) {
            attributes.insert(attr.to_string(), value);
        }
    }

    let item_code = item_code.filter(|c| !c.is_empty())?;
    Some(CanonicalRow {
        item_code,
        item_name: item_name.unwrap_or_default(),
        attributes,
    })
}
