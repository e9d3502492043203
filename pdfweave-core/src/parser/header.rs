//! PDF Header Parser
//!
//! Parses the `%PDF-x.y` header according to ISO 32000-1 Section 7.5.2.

use super::{ParseError, ParseResult};
use std::fmt;
use std::str::FromStr;

/// Size of the window the header is read from.
pub const HEADER_WINDOW: usize = 10;

/// PDF Version information
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PdfVersion {
    pub major: u8,
    pub minor: u8,
}

impl PdfVersion {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Reads the version from the first bytes of a file.
    pub fn from_header(data: &[u8]) -> ParseResult<Self> {
        let window = &data[..data.len().min(HEADER_WINDOW)];
        let rest = window
            .strip_prefix(b"%PDF-")
            .ok_or(ParseError::InvalidHeader)?;
        let end = rest
            .iter()
            .position(|&b| !(b.is_ascii_digit() || b == b'.'))
            .unwrap_or(rest.len());
        std::str::from_utf8(&rest[..end])
            .map_err(|_| ParseError::InvalidHeader)?
            .parse()
    }

    /// `%PDF-x.y` line followed by the binary hint comment.
    pub fn header_bytes(&self) -> Vec<u8> {
        let mut bytes = format!("%PDF-{self}\n").into_bytes();
        bytes.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");
        bytes
    }
}

impl Default for PdfVersion {
    fn default() -> Self {
        Self::new(1, 4)
    }
}

impl fmt::Display for PdfVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for PdfVersion {
    type Err = ParseError;

    /// Parses `"1.7"`; also accepts the `/Version` name form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s.trim().split_once('.').ok_or(ParseError::InvalidHeader)?;
        let major = major.parse().map_err(|_| ParseError::InvalidHeader)?;
        let minor = minor.parse().map_err(|_| ParseError::InvalidHeader)?;
        Ok(Self::new(major, minor))
    }
}
