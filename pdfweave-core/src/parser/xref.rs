//! PDF Cross-Reference Table Parser
//!
//! Locates `startxref` and parses classic xref sections according to
//! ISO 32000-1 Section 7.5.4.

use super::lexer::{is_whitespace, Lexer, Token};
use super::objects::ObjectParser;
use super::{ParseError, ParseOptions, ParseResult};
use crate::objects::Dictionary;
use crate::xref::XRefEntry;

/// Initial tail chunk searched for `startxref`; doubled until found.
pub const TAIL_CHUNK: usize = 1024;

const STARTXREF: &[u8] = b"startxref";

/// Finds the offset recorded after the last `startxref` keyword.
///
/// The tail is searched backwards in growing chunks so trailing garbage
/// after `%%EOF` is tolerated.
pub fn find_startxref(data: &[u8]) -> ParseResult<usize> {
    let mut chunk = TAIL_CHUNK;
    loop {
        let start = data.len().saturating_sub(chunk);
        let tail = &data[start..];
        if let Some(pos) = tail.windows(STARTXREF.len()).rposition(|w| w == STARTXREF) {
            let keyword_end = start + pos + STARTXREF.len();
            let mut lexer = Lexer::at(data, keyword_end);
            return match lexer.next_token()? {
                Token::Integer(offset) if offset >= 0 && (offset as usize) < data.len() => {
                    Ok(offset as usize)
                }
                other => Err(ParseError::xref(
                    keyword_end,
                    format!("startxref offset invalid: {}", other.describe()),
                )),
            };
        }
        if start == 0 {
            return Err(ParseError::MissingStartXRef);
        }
        chunk *= 2;
    }
}

/// One parsed classic section: its entries and trailer dictionary.
#[derive(Debug, Clone)]
pub struct XRefSection {
    pub entries: Vec<XRefEntry>,
    pub trailer: Dictionary,
}

/// True when `offset` starts with the `xref` keyword.
pub fn is_classic_section(data: &[u8], offset: usize) -> bool {
    let mut lexer = Lexer::at(data, offset);
    lexer.skip_whitespace();
    data[lexer.position()..].starts_with(b"xref")
        && data
            .get(lexer.position() + 4)
            .map_or(true, |&b| is_whitespace(b))
}

/// Parses `xref` subsections and the following `trailer` dictionary.
pub fn parse_xref_table(
    data: &[u8],
    offset: usize,
    options: &ParseOptions,
) -> ParseResult<XRefSection> {
    let mut lexer = Lexer::at(data, offset);
    let position = lexer.position();
    if !lexer.next_token()?.is_keyword("xref") {
        return Err(ParseError::xref(position, "expected 'xref' keyword"));
    }

    let mut entries = Vec::new();
    loop {
        let position = lexer.position();
        match lexer.next_token()? {
            token if token.is_keyword("trailer") => break,
            Token::Integer(first) => {
                let count = match lexer.next_token()? {
                    Token::Integer(count) => count,
                    other => {
                        return Err(ParseError::xref(
                            position,
                            format!("bad subsection count: {}", other.describe()),
                        ))
                    }
                };
                let (first, count) = subsection_bounds(first, count)
                    .ok_or_else(|| ParseError::xref(position, format!("subsection {first} {count} out of range")))?;
                for i in 0..count {
                    entries.push(parse_xref_row(&mut lexer, first + i)?);
                }
            }
            other => {
                return Err(ParseError::xref(
                    position,
                    format!("expected subsection or trailer, found {}", other.describe()),
                ))
            }
        }
    }

    let mut parser = ObjectParser::new(data, lexer.position(), options);
    let position = parser.position();
    let trailer = match parser.parse_object()? {
        crate::objects::Object::Dictionary(dict) => dict,
        other => {
            return Err(ParseError::xref(
                position,
                format!("trailer is a {}", other.type_name()),
            ))
        }
    };
    tracing::debug!(offset, entries = entries.len(), "classic xref section read");
    Ok(XRefSection { entries, trailer })
}

/// Start and length of a subsection, if every number in it fits an
/// object number.
pub(crate) fn subsection_bounds(first: i64, count: i64) -> Option<(u32, u32)> {
    let first = u32::try_from(first).ok()?;
    let count = u32::try_from(count).ok()?;
    if count > 0 {
        first.checked_add(count - 1)?;
    }
    Some((first, count))
}

/// Reads `oooooooooo ggggg n|f`. Rows are nominally 20 bytes but 1-byte
/// EOLs are common enough to tolerate.
fn parse_xref_row(lexer: &mut Lexer<'_>, number: u32) -> ParseResult<XRefEntry> {
    lexer.skip_whitespace();
    let row_start = lexer.position();
    let offset = read_digits(lexer, row_start)?;
    skip_spaces(lexer);
    let generation = read_digits(lexer, row_start)?;
    skip_spaces(lexer);
    let flag = lexer
        .read_byte()
        .ok_or_else(|| ParseError::xref(row_start, "truncated xref row"))?;
    if generation > u16::MAX as u64 {
        return Err(ParseError::xref(row_start, "generation out of range"));
    }
    match flag {
        b'n' => Ok(XRefEntry::in_use(number, generation as u16, offset)),
        b'f' => Ok(XRefEntry::free(number, generation as u16, offset)),
        other => Err(ParseError::xref(
            row_start,
            format!("invalid xref flag {:?}", other as char),
        )),
    }
}

fn read_digits(lexer: &mut Lexer<'_>, row_start: usize) -> ParseResult<u64> {
    let mut value: u64 = 0;
    let mut seen = false;
    while let Some(ch @ b'0'..=b'9') = lexer.peek_byte() {
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add((ch - b'0') as u64))
            .ok_or_else(|| ParseError::xref(row_start, "number overflow in xref row"))?;
        lexer.read_byte();
        seen = true;
    }
    if !seen {
        return Err(ParseError::xref(row_start, "malformed xref row"));
    }
    Ok(value)
}

fn skip_spaces(lexer: &mut Lexer<'_>) {
    while lexer.peek_byte() == Some(b' ') {
        lexer.read_byte();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xref::Usage;

    #[test]
    fn test_find_startxref() {
        let data = b"%PDF-1.4\n...\nstartxref\n1234\n%%EOF\n";
        let mut padded = vec![b' '; 2000];
        padded.extend_from_slice(data);
        // Offset must fall inside the file.
        assert_eq!(find_startxref(&padded).unwrap(), 1234);
    }

    #[test]
    fn test_find_startxref_with_trailing_garbage() {
        let mut data = vec![b' '; 100];
        data.extend_from_slice(b"startxref\n42\n%%EOF\n");
        data.extend(std::iter::repeat(b'x').take(5000));
        assert_eq!(find_startxref(&data).unwrap(), 42);
    }

    #[test]
    fn test_missing_startxref() {
        assert!(matches!(
            find_startxref(&vec![b'a'; 3000]),
            Err(ParseError::MissingStartXRef)
        ));
    }

    #[test]
    fn test_parse_xref_table() {
        let data = b"xref\n0 3\n0000000000 65535 f\r\n0000000017 00000 n\r\n0000000081 00000 n\r\n\
                     7 1\n0000000200 00002 n\n\
                     trailer\n<< /Size 8 /Root 1 0 R >>\nstartxref\n0\n%%EOF";
        let options = ParseOptions::default();
        let section = parse_xref_table(data, 0, &options).unwrap();

        assert_eq!(section.entries.len(), 4);
        assert_eq!(section.entries[0].usage, Usage::Free);
        assert_eq!(section.entries[0].generation, 65535);
        assert_eq!(section.entries[1], XRefEntry::in_use(1, 0, 17));
        assert_eq!(section.entries[3], XRefEntry::in_use(7, 2, 200));
        assert_eq!(section.trailer.get_integer("Size"), Some(8));
    }

    #[test]
    fn test_malformed_row_reports_position() {
        let data = b"xref\n0 1\n00000000zz 65535 f\r\ntrailer<<>>";
        let options = ParseOptions::default();
        match parse_xref_table(data, 0, &options) {
            Err(ParseError::InvalidXRef { position, .. }) => assert_eq!(position, 9),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_subsection_past_last_object_number() {
        let data = b"xref\n4294967295 2\n0000000000 65535 f\r\n0000000017 00000 n\r\ntrailer<<>>";
        let options = ParseOptions::default();
        assert!(matches!(
            parse_xref_table(data, 0, &options),
            Err(ParseError::InvalidXRef { .. })
        ));
        let negative = b"xref\n-1 1\n0000000000 65535 f\r\ntrailer<<>>";
        assert!(matches!(
            parse_xref_table(negative, 0, &options),
            Err(ParseError::InvalidXRef { .. })
        ));
    }

    #[test]
    fn test_subsection_bounds() {
        assert_eq!(subsection_bounds(0, 3), Some((0, 3)));
        assert_eq!(subsection_bounds(4294967295, 1), Some((u32::MAX, 1)));
        assert_eq!(subsection_bounds(4294967295, 2), None);
        assert_eq!(subsection_bounds(4294967296, 0), None);
        assert_eq!(subsection_bounds(0, -1), None);
    }

    #[test]
    fn test_is_classic_section() {
        assert!(is_classic_section(b"\nxref\n0 1", 0));
        assert!(!is_classic_section(b"12 0 obj", 0));
    }
}
