//! Cross-reference stream parsing (ISO 32000-1 Section 7.5.8).

use super::filters::decode_stream;
use super::xref::{subsection_bounds, XRefSection};
use super::{ParseError, ParseResult};
use crate::objects::{Object, Stream};
use crate::xref::XRefEntry;

/// Field widths from `/W`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldWidths(pub [usize; 3]);

impl FieldWidths {
    pub fn row_len(&self) -> usize {
        self.0.iter().sum()
    }
}

/// Reads a big-endian unsigned field of `width` bytes.
pub fn read_field(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

/// Parses the entries of an xref stream; its dictionary becomes the trailer.
///
/// `position` is the file offset of the stream object, used for errors.
pub fn parse_xref_stream(stream: &Stream, position: usize) -> ParseResult<XRefSection> {
    let dict = stream.dictionary();
    if dict.get_type() != Some("XRef") {
        return Err(ParseError::xref(position, "object is not an XRef stream"));
    }

    let widths = match dict.get("W").and_then(Object::as_array) {
        Some(w) if w.len() == 3 => {
            let mut out = [0usize; 3];
            for (slot, value) in out.iter_mut().zip(w) {
                *slot = value
                    .as_integer()
                    .filter(|&v| (0..=8).contains(&v))
                    .ok_or_else(|| ParseError::xref(position, "invalid /W entry"))?
                    as usize;
            }
            FieldWidths(out)
        }
        _ => return Err(ParseError::xref(position, "missing or malformed /W")),
    };

    let size = dict
        .get_integer("Size")
        .ok_or_else(|| ParseError::MissingKey("Size".to_string()))?;

    let index: Vec<(u32, u32)> = match dict.get("Index").and_then(Object::as_array) {
        Some(arr) => {
            if arr.len() % 2 != 0 {
                return Err(ParseError::xref(position, "/Index has odd length"));
            }
            arr.chunks(2)
                .map(|pair| {
                    pair[0]
                        .as_integer()
                        .zip(pair[1].as_integer())
                        .and_then(|(first, count)| subsection_bounds(first, count))
                        .ok_or_else(|| ParseError::xref(position, "invalid /Index entry"))
                })
                .collect::<ParseResult<_>>()?
        }
        None => vec![subsection_bounds(0, size)
            .ok_or_else(|| ParseError::xref(position, format!("invalid /Size {size}")))?],
    };

    let data = decode_stream(stream.data(), dict)?;
    let row_len = widths.row_len();
    if row_len == 0 {
        return Err(ParseError::xref(position, "/W describes empty rows"));
    }

    let mut entries = Vec::new();
    let mut rows = data.chunks_exact(row_len);
    for (first, count) in index {
        for i in 0..count {
            let row = rows.next().ok_or_else(|| {
                ParseError::corrupt(position, "xref stream shorter than /Index declares")
            })?;
            entries.push(decode_row(row, widths, first + i));
        }
    }
    tracing::debug!(offset = position, entries = entries.len(), "xref stream read");

    Ok(XRefSection {
        entries,
        trailer: dict.clone(),
    })
}

fn decode_row(row: &[u8], widths: FieldWidths, number: u32) -> XRefEntry {
    let [w0, w1, w2] = widths.0;
    // A zero-width type field defaults to type 1.
    let kind = if w0 == 0 { 1 } else { read_field(&row[..w0]) };
    let field2 = read_field(&row[w0..w0 + w1]);
    let field3 = read_field(&row[w0 + w1..w0 + w1 + w2]);

    match kind {
        0 => XRefEntry::free(number, field3.min(u16::MAX as u64) as u16, field2),
        1 => XRefEntry::in_use(number, field3.min(u16::MAX as u64) as u16, field2),
        2 => XRefEntry::compressed(number, field2 as u32, field3),
        other => {
            tracing::warn!(number, kind = other, "unknown xref stream entry type, treated as free");
            XRefEntry::free(number, 0, 0)
        }
    }
}
