//! PDF Lexer
//!
//! Tokenizes PDF syntax according to ISO 32000-1 Section 7.2. The lexer
//! works over an in-memory byte slice and can seek freely, which the object
//! parser uses for `n g R` lookahead and the content parser for implicit
//! path termination.

use super::{ParseError, ParseResult};
use crate::objects::PdfString;

/// PDF Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Integer number
    Integer(i64),

    /// Real number
    Real(f64),

    /// String (literal or hexadecimal)
    String(PdfString),

    /// Name object (e.g., /Type)
    Name(String),

    /// Left square bracket [
    ArrayStart,

    /// Right square bracket ]
    ArrayEnd,

    /// Dictionary start <<
    DictStart,

    /// Dictionary end >>
    DictEnd,

    /// Any bare word: `true`, `null`, `obj`, `R`, content operators...
    Keyword(String),

    /// End of input
    Eof,
}

impl Token {
    pub fn is_keyword(&self, word: &str) -> bool {
        matches!(self, Token::Keyword(k) if k == word)
    }

    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Integer(i) => format!("integer {i}"),
            Token::Real(r) => format!("real {r}"),
            Token::String(_) => "string".to_string(),
            Token::Name(n) => format!("/{n}"),
            Token::ArrayStart => "'['".to_string(),
            Token::ArrayEnd => "']'".to_string(),
            Token::DictStart => "'<<'".to_string(),
            Token::DictEnd => "'>>'".to_string(),
            Token::Keyword(k) => format!("keyword '{k}'"),
            Token::Eof => "end of input".to_string(),
        }
    }
}

pub fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b'\0' | b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

pub fn is_delimiter(ch: u8) -> bool {
    matches!(
        ch,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_regular(ch: u8) -> bool {
    !is_whitespace(ch) && !is_delimiter(ch)
}

/// PDF Lexer over a byte slice
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    input: &'a [u8],
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, position: 0 }
    }

    pub fn at(input: &'a [u8], position: usize) -> Self {
        Self { input, position }
    }

    pub fn input(&self) -> &'a [u8] {
        self.input
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn seek(&mut self, position: usize) {
        self.position = position.min(self.input.len());
    }

    pub fn is_eof(&self) -> bool {
        self.position >= self.input.len()
    }

    pub fn peek_byte(&self) -> Option<u8> {
        self.input.get(self.position).copied()
    }

    pub fn read_byte(&mut self) -> Option<u8> {
        let byte = self.peek_byte()?;
        self.position += 1;
        Some(byte)
    }

    /// Returns `n` raw bytes from the current position.
    pub fn read_bytes(&mut self, n: usize) -> ParseResult<&'a [u8]> {
        let end = self
            .position
            .checked_add(n)
            .filter(|&end| end <= self.input.len())
            .ok_or_else(|| {
                ParseError::corrupt(self.position, format!("expected {n} more bytes"))
            })?;
        let bytes = &self.input[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Offset of the next occurrence of `needle` at or after the cursor.
    pub fn find(&self, needle: &[u8]) -> Option<usize> {
        if needle.is_empty() || self.position >= self.input.len() {
            return None;
        }
        self.input[self.position..]
            .windows(needle.len())
            .position(|w| w == needle)
            .map(|i| self.position + i)
    }

    /// Skips whitespace and comments.
    pub fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_byte() {
            if is_whitespace(ch) {
                self.position += 1;
            } else if ch == b'%' {
                while let Some(c) = self.peek_byte() {
                    if c == b'\r' || c == b'\n' {
                        break;
                    }
                    self.position += 1;
                }
            } else {
                break;
            }
        }
    }

    /// Skips the single EOL marker (`\r\n`, `\n` or `\r`) that follows a
    /// `stream` keyword.
    pub fn skip_eol(&mut self) {
        match self.peek_byte() {
            Some(b'\r') => {
                self.position += 1;
                if self.peek_byte() == Some(b'\n') {
                    self.position += 1;
                }
            }
            Some(b'\n') => self.position += 1,
            _ => {}
        }
    }

    pub fn peek_token(&mut self) -> ParseResult<Token> {
        let saved = self.position;
        let token = self.next_token();
        self.position = saved;
        token
    }

    /// Reads the next token.
    pub fn next_token(&mut self) -> ParseResult<Token> {
        self.skip_whitespace();

        let ch = match self.peek_byte() {
            Some(ch) => ch,
            None => return Ok(Token::Eof),
        };

        match ch {
            b'/' => self.read_name(),
            b'(' => self.read_literal_string(),
            b'<' => {
                if self.input.get(self.position + 1) == Some(&b'<') {
                    self.position += 2;
                    Ok(Token::DictStart)
                } else {
                    self.read_hex_string()
                }
            }
            b'>' => {
                if self.input.get(self.position + 1) == Some(&b'>') {
                    self.position += 2;
                    Ok(Token::DictEnd)
                } else {
                    Err(ParseError::syntax(self.position, "Expected '>' after '>'"))
                }
            }
            b'[' => {
                self.position += 1;
                Ok(Token::ArrayStart)
            }
            b']' => {
                self.position += 1;
                Ok(Token::ArrayEnd)
            }
            b'{' | b'}' | b')' => {
                self.position += 1;
                Ok(Token::Keyword((ch as char).to_string()))
            }
            b'+' | b'-' | b'.' | b'0'..=b'9' => self.read_number(),
            _ => self.read_keyword(),
        }
    }

    fn read_name(&mut self) -> ParseResult<Token> {
        self.position += 1;
        let mut bytes = Vec::new();

        while let Some(ch) = self.peek_byte() {
            if !is_regular(ch) {
                break;
            }
            self.position += 1;
            if ch == b'#' {
                let hi = self.input.get(self.position).copied().and_then(super::filters::hex_digit_value);
                let lo = self
                    .input
                    .get(self.position + 1)
                    .copied()
                    .and_then(super::filters::hex_digit_value);
                if let (Some(hi), Some(lo)) = (hi, lo) {
                    bytes.push((hi << 4) | lo);
                    self.position += 2;
                    continue;
                }
            }
            bytes.push(ch);
        }

        Ok(Token::Name(decode_name_bytes(bytes)))
    }

    fn read_literal_string(&mut self) -> ParseResult<Token> {
        let start = self.position;
        self.position += 1;
        let mut result = Vec::new();
        let mut depth = 1usize;

        loop {
            let ch = self
                .read_byte()
                .ok_or_else(|| ParseError::syntax(start, "Unterminated literal string"))?;
            match ch {
                b'\\' => {
                    let Some(esc) = self.read_byte() else {
                        break;
                    };
                    match esc {
                        b'n' => result.push(b'\n'),
                        b'r' => result.push(b'\r'),
                        b't' => result.push(b'\t'),
                        b'b' => result.push(b'\x08'),
                        b'f' => result.push(b'\x0C'),
                        b'0'..=b'7' => {
                            let mut value = (esc - b'0') as u16;
                            for _ in 0..2 {
                                match self.peek_byte() {
                                    Some(d @ b'0'..=b'7') => {
                                        value = value * 8 + (d - b'0') as u16;
                                        self.position += 1;
                                    }
                                    _ => break,
                                }
                            }
                            result.push(value as u8);
                        }
                        // Line continuation
                        b'\r' => {
                            if self.peek_byte() == Some(b'\n') {
                                self.position += 1;
                            }
                        }
                        b'\n' => {}
                        other => result.push(other),
                    }
                }
                b'(' => {
                    depth += 1;
                    result.push(ch);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    result.push(ch);
                }
                _ => result.push(ch),
            }
        }

        Ok(Token::String(PdfString::new(result)))
    }

    fn read_hex_string(&mut self) -> ParseResult<Token> {
        let start = self.position;
        self.position += 1;
        let mut result = Vec::new();
        let mut nibble: Option<u8> = None;

        loop {
            let ch = self
                .read_byte()
                .ok_or_else(|| ParseError::syntax(start, "Unterminated hex string"))?;
            if ch == b'>' {
                break;
            }
            if is_whitespace(ch) {
                continue;
            }
            let digit = super::filters::hex_digit_value(ch).ok_or_else(|| {
                ParseError::syntax(
                    self.position - 1,
                    format!("Invalid character in hex string: {:?}", ch as char),
                )
            })?;
            match nibble.take() {
                Some(hi) => result.push((hi << 4) | digit),
                None => nibble = Some(digit),
            }
        }
        if let Some(hi) = nibble {
            result.push(hi << 4);
        }

        Ok(Token::String(PdfString::hex(result)))
    }

    fn read_number(&mut self) -> ParseResult<Token> {
        let start = self.position;
        if matches!(self.peek_byte(), Some(b'+') | Some(b'-')) {
            self.position += 1;
        }
        // Some producers emit doubled signs such as "--5".
        while matches!(self.peek_byte(), Some(b'+') | Some(b'-')) {
            self.position += 1;
        }
        let mut has_dot = false;
        let mut has_digit = false;
        while let Some(ch) = self.peek_byte() {
            match ch {
                b'0'..=b'9' => has_digit = true,
                b'.' if !has_dot => has_dot = true,
                _ => break,
            }
            self.position += 1;
        }

        let text = std::str::from_utf8(&self.input[start..self.position])
            .map_err(|_| ParseError::syntax(start, "Invalid number format"))?;
        if !has_digit {
            // A lone sign or dot: treat as zero like most readers do.
            tracing::debug!(position = start, text, "number without digits");
            return Ok(Token::Integer(0));
        }
        let negative = text.starts_with('-');
        let digits = text.trim_start_matches(['+', '-']);

        if has_dot {
            let value: f64 = digits
                .parse()
                .map_err(|_| ParseError::syntax(start, "Invalid real number"))?;
            Ok(Token::Real(if negative { -value } else { value }))
        } else {
            match digits.parse::<i64>() {
                Ok(value) => Ok(Token::Integer(if negative { -value } else { value })),
                Err(_) => {
                    let value: f64 = digits
                        .parse()
                        .map_err(|_| ParseError::syntax(start, "Invalid integer"))?;
                    Ok(Token::Real(if negative { -value } else { value }))
                }
            }
        }
    }

    fn read_keyword(&mut self) -> ParseResult<Token> {
        let start = self.position;
        while let Some(ch) = self.peek_byte() {
            if !is_regular(ch) {
                break;
            }
            self.position += 1;
        }
        if start == self.position {
            return Err(ParseError::syntax(start, "Unexpected delimiter"));
        }
        Ok(Token::Keyword(
            String::from_utf8_lossy(&self.input[start..self.position]).into_owned(),
        ))
    }
}

/// Name bytes are UTF-8 in practice; anything else is kept byte-per-char.
fn decode_name_bytes(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(name) => name,
        Err(err) => err.into_bytes().into_iter().map(char::from).collect(),
    }
}
