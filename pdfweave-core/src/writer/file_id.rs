//! File identifier and date stamping.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::objects::{Dictionary, Object, PdfString};
use crate::writer::pdf_writer::object_to_bytes;

/// PDF date string (`D:YYYYMMDDHHmmSS+00'00`) for a UTC instant.
pub fn format_pdf_date(date: DateTime<Utc>) -> String {
    let formatted = date.format("D:%Y%m%d%H%M%S");
    format!("{formatted}+00'00")
}

/// Digest for the second (changing) half of the file `ID`.
///
/// Mixes the write time, the target path, the output length so far and
/// every Info entry. Only uniqueness matters here.
pub fn changing_id(
    now: DateTime<Utc>,
    path: Option<&Path>,
    length: u64,
    info: Option<&Dictionary>,
) -> [u8; 16] {
    let mut seed = Vec::with_capacity(128);
    seed.extend_from_slice(now.to_rfc3339().as_bytes());
    if let Some(nanos) = now.timestamp_nanos_opt() {
        seed.extend_from_slice(&nanos.to_be_bytes());
    }
    if let Some(path) = path {
        seed.extend_from_slice(path.to_string_lossy().as_bytes());
    }
    seed.extend_from_slice(&length.to_be_bytes());
    if let Some(info) = info {
        for (key, value) in info.iter() {
            seed.extend_from_slice(key.as_bytes());
            seed.extend_from_slice(&object_to_bytes(value));
        }
    }
    md5::compute(&seed).0
}

/// Sets `trailer[ID]`, keeping an existing permanent half.
pub(crate) fn update_file_id(trailer: &mut Dictionary, changing: [u8; 16]) {
    let permanent = trailer
        .get("ID")
        .and_then(Object::as_array)
        .and_then(|ids| ids.first())
        .and_then(Object::as_string)
        .map(|s| s.as_bytes().to_vec())
        .unwrap_or_else(|| changing.to_vec());
    trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(PdfString::hex(permanent)),
            Object::String(PdfString::hex(changing.to_vec())),
        ]),
    );
}
