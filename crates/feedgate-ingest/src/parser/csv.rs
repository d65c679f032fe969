//! CSV feed decoding
//!
//! Header-driven: the first row names the source fields, the field map
//! picks out item code and name. Suppliers disagree on delimiters, so the
//! delimiter is sniffed from the header line (`,`, `;`, tab or `|`).

use ::csv::ReaderBuilder;
use feedgate_common::types::{FeedFormat, FieldMap};
use tracing::trace;

use super::{build_row, Decoded, ParseError, RowDecoder};

pub struct CsvDecoder;

impl RowDecoder for CsvDecoder {
    fn format(&self) -> FeedFormat {
        FeedFormat::Csv
    }

    fn decode(&self, input: &str, map: &FieldMap) -> Result<Decoded, ParseError> {
        let delimiter = sniff_delimiter(input);
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .from_reader(input.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ParseError::Syntax {
                format: FeedFormat::Csv,
                message: e.to_string(),
            })?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if !headers.iter().any(|h| h == &map.item_code_field) {
            return Err(ParseError::MissingColumn(map.item_code_field.clone()));
        }

        let mut rows = Vec::new();
        let mut skipped = 0u32;

        for result in reader.records() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    // Ragged or undecodable line; the document stays usable
                    trace!(error = %e, "Skipping malformed CSV record");
                    skipped += 1;
                    continue;
                },
            };

            let fields = headers
                .iter()
                .cloned()
                .zip(record.iter().map(|v| v.to_string()));
            match build_row(fields, map) {
                Some(row) => rows.push(row),
                None => skipped += 1,
            }
        }

        Ok(Decoded { rows, skipped })
    }
}

/// Pick the most frequent of the common delimiters in the header line
fn sniff_delimiter(input: &str) -> u8 {
    let header = input.lines().next().unwrap_or("");
    let mut best = b',';
    let mut best_count = 0;
    for candidate in [b',', b';', b'\t', b'|'] {
        let count = header.bytes().filter(|&b| b == candidate).count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}
