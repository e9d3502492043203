//! PDF Object Parser
//!
//! Parses PDF objects from tokens according to ISO 32000-1 Section 7.3,
//! including indirect-object framing (`n g obj ... endobj`) and stream bodies.

use super::lexer::{is_whitespace, Lexer, Token};
use super::{ParseError, ParseOptions, ParseResult};
use crate::objects::{Dictionary, Object, ObjectId, Stream};

/// Nesting limit for arrays and dictionaries.
const MAX_DEPTH: usize = 256;

/// Parser for direct and indirect objects over a byte slice.
pub struct ObjectParser<'a> {
    lexer: Lexer<'a>,
    options: &'a ParseOptions,
    allow_references: bool,
}

impl<'a> ObjectParser<'a> {
    pub fn new(input: &'a [u8], position: usize, options: &'a ParseOptions) -> Self {
        Self {
            lexer: Lexer::at(input, position),
            options,
            allow_references: true,
        }
    }

    /// Parser for content-stream operands, where `n g R` has no meaning.
    pub fn without_references(input: &'a [u8], position: usize, options: &'a ParseOptions) -> Self {
        Self {
            allow_references: false,
            ..Self::new(input, position, options)
        }
    }

    pub fn lexer(&self) -> &Lexer<'a> {
        &self.lexer
    }

    pub fn lexer_mut(&mut self) -> &mut Lexer<'a> {
        &mut self.lexer
    }

    pub fn position(&self) -> usize {
        self.lexer.position()
    }

    /// Parses one direct object.
    pub fn parse_object(&mut self) -> ParseResult<Object> {
        let position = self.lexer.position();
        let token = self.lexer.next_token()?;
        self.parse_from_token(token, position, 0)
    }

    /// Parses the object that starts with an already-read `token`.
    pub fn parse_from_token(&mut self, token: Token, position: usize, depth: usize) -> ParseResult<Object> {
        if depth > MAX_DEPTH {
            return Err(ParseError::corrupt(position, "objects nested too deeply"));
        }
        match token {
            Token::Integer(number) => Ok(self
                .try_reference(number)?
                .unwrap_or(Object::Integer(number))),
            Token::Real(value) => Ok(Object::Real(value)),
            Token::String(s) => Ok(Object::String(s)),
            Token::Name(n) => Ok(Object::Name(n)),
            Token::ArrayStart => self.parse_array(depth),
            Token::DictStart => Ok(Object::Dictionary(self.parse_dictionary_body(depth)?)),
            Token::Keyword(word) => match word.as_str() {
                "true" => Ok(Object::Boolean(true)),
                "false" => Ok(Object::Boolean(false)),
                "null" => Ok(Object::Null),
                _ => Err(ParseError::UnexpectedToken {
                    position,
                    expected: "object".to_string(),
                    found: format!("keyword '{word}'"),
                }),
            },
            other => Err(ParseError::UnexpectedToken {
                position,
                expected: "object".to_string(),
                found: other.describe(),
            }),
        }
    }

    /// Two-token lookahead for `n g R`; seeks back when it is not a reference.
    fn try_reference(&mut self, number: i64) -> ParseResult<Option<Object>> {
        if !self.allow_references || number < 0 || number > u32::MAX as i64 {
            return Ok(None);
        }
        let saved = self.lexer.position();
        if let Ok(Token::Integer(generation)) = self.lexer.next_token() {
            if (0..=u16::MAX as i64).contains(&generation) {
                if let Ok(token) = self.lexer.next_token() {
                    if token.is_keyword("R") {
                        return Ok(Some(Object::Reference(ObjectId::new(
                            number as u32,
                            generation as u16,
                        ))));
                    }
                }
            }
        }
        self.lexer.seek(saved);
        Ok(None)
    }

    fn parse_array(&mut self, depth: usize) -> ParseResult<Object> {
        let mut items = Vec::new();
        loop {
            let position = self.lexer.position();
            match self.lexer.next_token()? {
                Token::ArrayEnd => break,
                Token::Eof => return Err(ParseError::syntax(position, "Unterminated array")),
                token => items.push(self.parse_from_token(token, position, depth + 1)?),
            }
        }
        Ok(Object::Array(items))
    }

    /// Parses dictionary entries after the opening `<<`.
    pub fn parse_dictionary_body(&mut self, depth: usize) -> ParseResult<Dictionary> {
        let mut dict = Dictionary::new();
        loop {
            let position = self.lexer.position();
            let key = match self.lexer.next_token()? {
                Token::DictEnd => break,
                Token::Name(name) => name,
                Token::Eof => return Err(ParseError::syntax(position, "Unterminated dictionary")),
                other => {
                    return Err(ParseError::UnexpectedToken {
                        position,
                        expected: "name".to_string(),
                        found: other.describe(),
                    })
                }
            };
            let value_position = self.lexer.position();
            let value = match self.lexer.next_token()? {
                // "/Key >>" with the value missing
                Token::DictEnd => {
                    tracing::warn!(position = value_position, key, "dictionary key without value");
                    dict.set(key, Object::Null);
                    break;
                }
                token => self.parse_from_token(token, value_position, depth + 1)?,
            };
            dict.set(key, value);
        }
        Ok(dict)
    }

    /// Parses `n g obj <object> endobj`.
    ///
    /// `resolve_length` is consulted when a stream's `Length` is an indirect
    /// reference.
    pub fn parse_indirect_object(
        &mut self,
        resolve_length: &mut dyn FnMut(ObjectId) -> Option<i64>,
    ) -> ParseResult<(ObjectId, Object)> {
        let start = self.lexer.position();
        let number = self.expect_integer("object number")?;
        let generation = self.expect_integer("generation number")?;
        let position = self.lexer.position();
        let token = self.lexer.next_token()?;
        if !token.is_keyword("obj") {
            return Err(ParseError::UnexpectedToken {
                position,
                expected: "obj".to_string(),
                found: token.describe(),
            });
        }
        if number < 0 || generation < 0 || generation > u16::MAX as i64 {
            return Err(ParseError::syntax(start, "Invalid object header"));
        }
        let id = ObjectId::new(number as u32, generation as u16);

        let position = self.lexer.position();
        let object = match self.lexer.next_token()? {
            Token::DictStart => {
                let dict = self.parse_dictionary_body(0)?;
                if self.lexer.peek_token()?.is_keyword("stream") {
                    self.lexer.next_token()?;
                    Object::Stream(self.parse_stream_body(dict, resolve_length)?)
                } else {
                    Object::Dictionary(dict)
                }
            }
            // "n g obj endobj" is an empty object
            Token::Keyword(word) if word == "endobj" => {
                self.lexer.seek(position);
                Object::Null
            }
            token => self.parse_from_token(token, position, 0)?,
        };

        let position = self.lexer.position();
        match self.lexer.next_token()? {
            token if token.is_keyword("endobj") => {}
            other => {
                tracing::warn!(
                    position,
                    object = %id,
                    found = %other.describe(),
                    "missing endobj"
                );
            }
        }
        Ok((id, object))
    }

    fn expect_integer(&mut self, what: &str) -> ParseResult<i64> {
        let position = self.lexer.position();
        match self.lexer.next_token()? {
            Token::Integer(value) => Ok(value),
            other => Err(ParseError::UnexpectedToken {
                position,
                expected: what.to_string(),
                found: other.describe(),
            }),
        }
    }

    fn parse_stream_body(
        &mut self,
        dict: Dictionary,
        resolve_length: &mut dyn FnMut(ObjectId) -> Option<i64>,
    ) -> ParseResult<Stream> {
        self.lexer.skip_eol();
        let data_start = self.lexer.position();
        let input = self.lexer.input();

        let declared = match dict.get("Length") {
            Some(Object::Integer(len)) => Some(*len),
            Some(Object::Reference(id)) => resolve_length(*id),
            _ => None,
        };

        if let Some(len) = declared.filter(|&len| len >= 0) {
            let end = data_start + len as usize;
            if end <= input.len() && endstream_follows(input, end) {
                let mut lexer = Lexer::at(input, end);
                lexer.skip_whitespace();
                lexer.seek(lexer.position() + b"endstream".len());
                self.lexer = lexer;
                return Ok(Stream::with_dictionary(dict, input[data_start..end].to_vec()));
            }
        }

        if !self.options.lenient_stream_length {
            return match declared {
                None => Err(ParseError::MissingKey("Length".to_string())),
                Some(_) => Err(ParseError::syntax(data_start, "Stream Length does not reach endstream")),
            };
        }

        tracing::warn!(position = data_start, ?declared, "recovering stream length by scanning for endstream");
        let keyword = self
            .lexer
            .find(b"endstream")
            .ok_or_else(|| ParseError::corrupt(data_start, "endstream not found"))?;
        let mut end = keyword;
        // The EOL before endstream is not part of the data.
        if end > data_start && input[end - 1] == b'\n' {
            end -= 1;
        }
        if end > data_start && input[end - 1] == b'\r' {
            end -= 1;
        }
        self.lexer.seek(keyword + b"endstream".len());
        Ok(Stream::with_dictionary(dict, input[data_start..end].to_vec()))
    }
}

fn endstream_follows(input: &[u8], mut pos: usize) -> bool {
    while pos < input.len() && is_whitespace(input[pos]) {
        pos += 1;
    }
    input[pos..].starts_with(b"endstream")
}
