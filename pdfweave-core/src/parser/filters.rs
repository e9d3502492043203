//! PDF Stream Filters
//!
//! Decoding of stream data according to ISO 32000-1 Section 7.4. Image
//! codecs (DCT, JPX, CCITT, JBIG2) are left encoded: their bytes are only
//! meaningful to an image decoder.

use crate::objects::{Dictionary, Object};

use super::{ParseError, ParseResult};

#[cfg(feature = "compression")]
use flate2::read::ZlibDecoder;
#[cfg(feature = "compression")]
use std::io::Read;

/// Supported PDF filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    ASCIIHexDecode,
    ASCII85Decode,
    LZWDecode,
    FlateDecode,
    RunLengthDecode,
    CCITTFaxDecode,
    JBIG2Decode,
    DCTDecode,
    JPXDecode,
    Crypt,
}

impl Filter {
    /// Parse filter from name, accepting the inline-image abbreviations.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ASCIIHexDecode" | "AHx" => Some(Filter::ASCIIHexDecode),
            "ASCII85Decode" | "A85" => Some(Filter::ASCII85Decode),
            "LZWDecode" | "LZW" => Some(Filter::LZWDecode),
            "FlateDecode" | "Fl" => Some(Filter::FlateDecode),
            "RunLengthDecode" | "RL" => Some(Filter::RunLengthDecode),
            "CCITTFaxDecode" | "CCF" => Some(Filter::CCITTFaxDecode),
            "JBIG2Decode" => Some(Filter::JBIG2Decode),
            "DCTDecode" | "DCT" => Some(Filter::DCTDecode),
            "JPXDecode" => Some(Filter::JPXDecode),
            "Crypt" => Some(Filter::Crypt),
            _ => None,
        }
    }

    fn is_image_codec(self) -> bool {
        matches!(
            self,
            Filter::CCITTFaxDecode | Filter::JBIG2Decode | Filter::DCTDecode | Filter::JPXDecode
        )
    }
}

fn filter_names(dict: &Dictionary) -> ParseResult<Vec<(String, Option<&Dictionary>)>> {
    let params = dict.get("DecodeParms").or_else(|| dict.get("DP"));
    let param_at = |i: usize| -> Option<&Dictionary> {
        match params {
            Some(Object::Dictionary(d)) if i == 0 => Some(d),
            Some(Object::Array(arr)) => arr.get(i).and_then(|o| match o {
                Object::Dictionary(d) => Some(d),
                _ => None,
            }),
            _ => None,
        }
    };

    match dict.get("Filter").or_else(|| dict.get("F")) {
        None | Some(Object::Null) => Ok(Vec::new()),
        Some(Object::Name(name)) => Ok(vec![(name.clone(), param_at(0))]),
        Some(Object::Array(array)) => array
            .iter()
            .enumerate()
            .map(|(i, obj)| match obj {
                Object::Name(name) => Ok((name.clone(), param_at(i))),
                _ => Err(ParseError::StreamDecodeError(
                    "Invalid filter in array".to_string(),
                )),
            })
            .collect(),
        Some(other) => Err(ParseError::StreamDecodeError(format!(
            "Invalid Filter type: {}",
            other.type_name()
        ))),
    }
}

/// Decode stream data according to the filters named in its dictionary.
pub fn decode_stream(data: &[u8], dict: &Dictionary) -> ParseResult<Vec<u8>> {
    let mut result = data.to_vec();
    for (name, params) in filter_names(dict)? {
        let filter = Filter::from_name(&name).ok_or_else(|| {
            tracing::warn!(filter = %name, "unknown stream filter");
            ParseError::StreamDecodeError(format!("Unknown filter: {name}"))
        })?;
        if filter.is_image_codec() {
            break;
        }
        result = apply_filter(&result, filter)?;
        if let Some(params) = params {
            result = apply_predictor(result, params)?;
        }
    }
    Ok(result)
}

fn apply_filter(data: &[u8], filter: Filter) -> ParseResult<Vec<u8>> {
    match filter {
        Filter::FlateDecode => decode_flate(data),
        Filter::ASCIIHexDecode => decode_ascii_hex(data),
        Filter::ASCII85Decode => decode_ascii85(data),
        Filter::RunLengthDecode => decode_run_length(data),
        _ => Err(ParseError::StreamDecodeError(format!(
            "Filter {filter:?} not supported"
        ))),
    }
}

#[cfg(feature = "compression")]
fn decode_flate(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut result = Vec::new();
    decoder
        .read_to_end(&mut result)
        .map_err(|e| ParseError::StreamDecodeError(format!("Flate decode error: {e}")))?;
    Ok(result)
}

#[cfg(not(feature = "compression"))]
fn decode_flate(_data: &[u8]) -> ParseResult<Vec<u8>> {
    Err(ParseError::StreamDecodeError(
        "FlateDecode requires 'compression' feature".to_string(),
    ))
}

/// Zlib-compress `data` for a `/FlateDecode` stream.
#[cfg(feature = "compression")]
pub fn encode_flate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// PNG (10..=15) and TIFF (2) predictors from `/DecodeParms`.
fn apply_predictor(data: Vec<u8>, params: &Dictionary) -> ParseResult<Vec<u8>> {
    let predictor = params.get_integer("Predictor").unwrap_or(1);
    if predictor <= 1 {
        return Ok(data);
    }
    let colors = params.get_integer("Colors").unwrap_or(1).max(1) as usize;
    let bits = params.get_integer("BitsPerComponent").unwrap_or(8).max(1) as usize;
    let columns = params.get_integer("Columns").unwrap_or(1).max(1) as usize;
    let bpp = (colors * bits).div_ceil(8);
    let row_len = (colors * bits * columns).div_ceil(8);

    match predictor {
        2 => {
            let mut out = data;
            for row in out.chunks_mut(row_len) {
                for i in bpp..row.len() {
                    row[i] = row[i].wrapping_add(row[i - bpp]);
                }
            }
            Ok(out)
        }
        10..=15 => {
            let mut out = Vec::with_capacity(data.len());
            let mut prev = vec![0u8; row_len];
            for chunk in data.chunks(row_len + 1) {
                let kind = chunk[0];
                let mut row = chunk[1..].to_vec();
                row.resize(row_len, 0);
                for i in 0..row_len {
                    let left = if i >= bpp { row[i - bpp] } else { 0 };
                    let up = prev[i];
                    let up_left = if i >= bpp { prev[i - bpp] } else { 0 };
                    let delta = match kind {
                        0 => 0,
                        1 => left,
                        2 => up,
                        3 => ((left as u16 + up as u16) / 2) as u8,
                        4 => paeth(left, up, up_left),
                        other => {
                            return Err(ParseError::StreamDecodeError(format!(
                                "Invalid PNG row filter {other}"
                            )))
                        }
                    };
                    row[i] = row[i].wrapping_add(delta);
                }
                out.extend_from_slice(&row);
                prev = row;
            }
            Ok(out)
        }
        other => Err(ParseError::StreamDecodeError(format!(
            "Unsupported predictor {other}"
        ))),
    }
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

fn decode_ascii_hex(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut result = Vec::new();
    let mut high: Option<u8> = None;

    for &ch in data.iter().filter(|b| !b.is_ascii_whitespace()) {
        if ch == b'>' {
            break;
        }
        let val = hex_digit_value(ch).ok_or_else(|| {
            ParseError::StreamDecodeError(format!("Invalid hex digit: {}", ch as char))
        })?;
        match high.take() {
            Some(h) => result.push((h << 4) | val),
            None => high = Some(val),
        }
    }
    // Odd digit count: last nibble is padded with 0.
    if let Some(h) = high {
        result.push(h << 4);
    }
    Ok(result)
}

pub(crate) fn hex_digit_value(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        _ => None,
    }
}

fn decode_ascii85(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut result = Vec::new();
    let mut group: Vec<u8> = Vec::with_capacity(5);
    let mut bytes = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .peekable();

    if bytes.peek() == Some(&b'<') {
        bytes.next();
        if bytes.next() != Some(b'~') {
            return Err(ParseError::StreamDecodeError(
                "Invalid ASCII85 prefix".to_string(),
            ));
        }
    }

    while let Some(c) = bytes.next() {
        match c {
            b'~' => {
                if bytes.next() != Some(b'>') {
                    return Err(ParseError::StreamDecodeError(
                        "Invalid ASCII85 end marker".to_string(),
                    ));
                }
                break;
            }
            b'z' if group.is_empty() => result.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group.push(c);
                if group.len() == 5 {
                    result.extend_from_slice(&ascii85_group(&group).to_be_bytes());
                    group.clear();
                }
            }
            _ => {
                return Err(ParseError::StreamDecodeError(format!(
                    "Invalid ASCII85 character: {}",
                    c as char
                )))
            }
        }
    }

    if !group.is_empty() {
        let n = group.len();
        group.resize(5, b'u');
        let value = ascii85_group(&group).to_be_bytes();
        result.extend_from_slice(&value[..n - 1]);
    }
    Ok(result)
}

fn ascii85_group(group: &[u8]) -> u32 {
    group
        .iter()
        .fold(0u32, |acc, &ch| acc.wrapping_mul(85).wrapping_add((ch - b'!') as u32))
}

fn decode_run_length(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut result = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let len = data[i];
        i += 1;
        match len {
            128 => break,
            0..=127 => {
                let count = len as usize + 1;
                let end = (i + count).min(data.len());
                result.extend_from_slice(&data[i..end]);
                i = end;
            }
            _ => {
                let byte = data.get(i).copied().ok_or_else(|| {
                    ParseError::StreamDecodeError("Truncated run-length data".to_string())
                })?;
                result.extend(std::iter::repeat(byte).take(257 - len as usize));
                i += 1;
            }
        }
    }
    Ok(result)
}
