//! PDF Content Stream Parser
//!
//! Turns a content stream into a tree of [`ContentObject`]s. Operands are
//! ordinary PDF objects; container boundaries come from keyword lookahead.

use crate::objects::{Dictionary, Object};
use crate::parser::lexer::{is_whitespace, Token};
use crate::parser::{ObjectParser, ParseError, ParseOptions, ParseResult};

use super::objects::{CompositeKind, CompositeObject, ContentObject, InlineImage};
use super::operation::operators::*;
use super::operation::Operation;

/// Bytes inspected after an `EI` candidate to tell it from image data.
const EI_LOOKAHEAD: usize = 32;

pub struct ContentParser<'a> {
    parser: ObjectParser<'a>,
    options: &'a ParseOptions,
}

impl<'a> ContentParser<'a> {
    pub fn new(input: &'a [u8], options: &'a ParseOptions) -> Self {
        Self {
            parser: ObjectParser::without_references(input, 0, options),
            options,
        }
    }

    pub fn position(&self) -> usize {
        self.parser.position()
    }

    /// Parses the whole stream.
    pub fn parse_content_objects(&mut self) -> ParseResult<Vec<ContentObject>> {
        self.parse_until(None)
    }

    /// Reads operands up to the next operator. `None` at end of input.
    pub fn parse_operation(&mut self) -> ParseResult<Option<Operation>> {
        let mut operands = Vec::new();
        loop {
            let position = self.parser.position();
            match self.parser.lexer_mut().next_token()? {
                Token::Eof => {
                    if !operands.is_empty() {
                        tracing::warn!(
                            position,
                            count = operands.len(),
                            "operands without an operator at end of content"
                        );
                    }
                    return Ok(None);
                }
                Token::Keyword(word) if !matches!(word.as_str(), "true" | "false" | "null") => {
                    return Ok(Some(Operation::new(word, operands)));
                }
                token => operands.push(self.parser.parse_from_token(token, position, 0)?),
            }
        }
    }

    /// Parses objects until the `end` operator (consumed) or end of input.
    fn parse_until(&mut self, end: Option<&str>) -> ParseResult<Vec<ContentObject>> {
        let mut objects = Vec::new();
        while let Some(op) = self.parse_operation()? {
            if end.is_some_and(|end| op.is(end)) {
                return Ok(objects);
            }
            objects.push(self.parse_object(op)?);
        }
        if let Some(end) = end {
            tracing::warn!(missing = end, "content block is not terminated");
        }
        Ok(objects)
    }

    fn parse_object(&mut self, op: Operation) -> ParseResult<ContentObject> {
        let composite = match op.operator.as_str() {
            BEGIN_TEXT => CompositeObject::new(CompositeKind::Text, self.parse_until(Some(END_TEXT))?),
            SAVE_STATE => CompositeObject::new(
                CompositeKind::LocalGraphicsState,
                self.parse_until(Some(RESTORE_STATE))?,
            ),
            BEGIN_MARKED_CONTENT | BEGIN_MARKED_CONTENT_PROPS => {
                let children = self.parse_until(Some(END_MARKED_CONTENT))?;
                CompositeObject::new(CompositeKind::MarkedContent(op), children)
            }
            BEGIN_INLINE_IMAGE => {
                CompositeObject::new(CompositeKind::InlineImage(self.parse_inline_image()?), vec![])
            }
            PAINT_XOBJECT => CompositeObject::new(CompositeKind::XObject(op), vec![]),
            PAINT_SHADING => CompositeObject::new(CompositeKind::Shading(op), vec![]),
            _ if op.starts_path() => CompositeObject::new(CompositeKind::Path, self.parse_path(op)?),
            _ => return Ok(ContentObject::Operation(op)),
        };
        Ok(ContentObject::Composite(composite))
    }

    /// A path has no end operator: it runs until the first operation that
    /// cannot be part of it, which is left for the caller to read again.
    fn parse_path(&mut self, first: Operation) -> ParseResult<Vec<ContentObject>> {
        let mut objects = vec![ContentObject::Operation(first)];
        loop {
            let saved = self.parser.position();
            match self.parse_operation()? {
                Some(op) if op.continues_path() => objects.push(ContentObject::Operation(op)),
                Some(_) => {
                    self.parser.lexer_mut().seek(saved);
                    break;
                }
                None => break,
            }
        }
        Ok(objects)
    }

    /// Parses after `BI`: header pairs up to `ID`, then the raw samples up
    /// to a whitespace-delimited `EI`.
    fn parse_inline_image(&mut self) -> ParseResult<InlineImage> {
        let start = self.parser.position();
        let mut header = Dictionary::new();
        loop {
            let position = self.parser.position();
            match self.parser.lexer_mut().next_token()? {
                token if token.is_keyword(BEGIN_INLINE_IMAGE_DATA) => break,
                Token::Name(key) => {
                    let value = self.parser.parse_object()?;
                    header.set(key, value);
                }
                Token::Eof => return Err(ParseError::UnterminatedInlineImage { position: start }),
                other => {
                    return Err(ParseError::UnexpectedToken {
                        position,
                        expected: "inline image key or ID".to_string(),
                        found: other.describe(),
                    })
                }
            }
        }

        // A single whitespace byte separates ID from the data.
        let lexer = self.parser.lexer_mut();
        if lexer.peek_byte().is_some_and(is_whitespace) {
            lexer.read_byte();
        }
        let input = lexer.input();
        let data_start = lexer.position();
        let (data_end, resume) = find_inline_image_end(input, data_start, self.options.max_inline_image_bytes)
            .map_err(|limited| match limited {
                true => ParseError::corrupt(
                    data_start,
                    "inline image exceeds the size limit without an EI marker",
                ),
                false => ParseError::UnterminatedInlineImage { position: start },
            })?;
        self.parser.lexer_mut().seek(resume);
        Ok(InlineImage {
            header,
            data: input[data_start..data_end].to_vec(),
        })
    }
}

/// Finds the `<ws>EI<ws|eof>` that ends inline image data starting at
/// `start`. Returns the end of the data and the position after `EI`.
///
/// `EI` surrounded by whitespace can occur inside binary samples, so a
/// candidate only counts when the bytes after it look like content stream
/// text. `Err(true)` means `limit` bytes were searched without a match.
fn find_inline_image_end(input: &[u8], start: usize, limit: usize) -> Result<(usize, usize), bool> {
    // Empty data: the separator after ID also delimits EI.
    let rest = &input[start..];
    if rest.starts_with(b"EI")
        && rest.get(2).map_or(true, |&b| is_whitespace(b))
        && followed_by_content(&rest[2..])
    {
        return Ok((start, start + 2));
    }
    let mut i = start;
    while i + 3 <= input.len() {
        if i - start > limit {
            return Err(true);
        }
        let candidate = is_whitespace(input[i])
            && input[i + 1] == b'E'
            && input[i + 2] == b'I'
            && input.get(i + 3).map_or(true, |&b| is_whitespace(b));
        if candidate {
            if followed_by_content(&input[i + 3..]) {
                return Ok((i, i + 3));
            }
            tracing::warn!(position = i + 1, "EI inside inline image data, continuing");
        }
        i += 1;
    }
    Err(false)
}

fn followed_by_content(rest: &[u8]) -> bool {
    rest.iter()
        .take(EI_LOOKAHEAD)
        .all(|&b| is_whitespace(b) || (0x20..0x7F).contains(&b))
}
