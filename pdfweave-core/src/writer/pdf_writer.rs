use std::io::Write;

use crate::error::Result;
use crate::objects::{Object, ObjectId, PdfString, StringMode};
use crate::parser::lexer::{is_delimiter, is_whitespace};

/// Byte sink that tracks how much has been written, so object and xref
/// offsets can be recorded as output is produced.
pub struct PdfWriter<W: Write> {
    writer: W,
    current_position: u64,
}

impl<W: Write> PdfWriter<W> {
    pub fn new_with_writer(writer: W) -> Self {
        Self::with_offset(writer, 0)
    }

    /// Writer whose offsets start at `position`, for output appended to
    /// bytes that were already written elsewhere.
    pub fn with_offset(writer: W, position: u64) -> Self {
        Self {
            writer,
            current_position: position,
        }
    }

    pub fn position(&self) -> u64 {
        self.current_position
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.current_position += data.len() as u64;
        Ok(())
    }

    /// Writes `n g obj ... endobj` and returns the offset of the object.
    pub fn write_object(&mut self, id: ObjectId, object: &Object) -> Result<u64> {
        let offset = self.current_position;
        self.write_bytes(format!("{} {} obj\n", id.number(), id.generation()).as_bytes())?;
        let mut body = Vec::new();
        write_object_value(&mut body, object);
        self.write_bytes(&body)?;
        self.write_bytes(b"\nendobj\n")?;
        Ok(offset)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Serialized form of a single value.
pub fn object_to_bytes(object: &Object) -> Vec<u8> {
    let mut out = Vec::new();
    write_object_value(&mut out, object);
    out
}

/// Appends the PDF syntax for `object` to `out`.
pub fn write_object_value(out: &mut Vec<u8>, object: &Object) {
    match object {
        Object::Null => out.extend_from_slice(b"null"),
        Object::Boolean(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        Object::Integer(i) => out.extend_from_slice(i.to_string().as_bytes()),
        Object::Real(f) => out.extend_from_slice(format_real(*f).as_bytes()),
        Object::String(s) => write_string(out, s),
        Object::Name(n) => write_name(out, n),
        Object::Array(arr) => {
            out.push(b'[');
            for (i, obj) in arr.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_object_value(out, obj);
            }
            out.push(b']');
        }
        Object::Dictionary(dict) => {
            out.extend_from_slice(b"<<");
            for (key, value) in dict.iter() {
                out.push(b'\n');
                write_name(out, key);
                out.push(b' ');
                write_object_value(out, value);
            }
            out.extend_from_slice(b"\n>>");
        }
        Object::Stream(stream) => {
            let mut dict = stream.dictionary().clone();
            dict.set("Length", stream.data().len() as i64);
            write_object_value(out, &Object::Dictionary(dict));
            out.extend_from_slice(b"\nstream\n");
            out.extend_from_slice(stream.data());
            out.extend_from_slice(b"\nendstream");
        }
        Object::Reference(id) => {
            out.extend_from_slice(format!("{} {} R", id.number(), id.generation()).as_bytes())
        }
    }
}

/// Shortest text that reads back as the same `f64`. `Display` never uses
/// an exponent, which PDF does not allow; a `.0` keeps integral values reals.
fn format_real(value: f64) -> String {
    if !value.is_finite() {
        tracing::warn!(value, "non-finite real written as 0");
        return "0.0".to_string();
    }
    let text = value.to_string();
    if text.contains('.') {
        text
    } else {
        text + ".0"
    }
}

fn write_string(out: &mut Vec<u8>, s: &PdfString) {
    match s.mode() {
        StringMode::Hex => {
            out.push(b'<');
            for byte in s.as_bytes() {
                out.extend_from_slice(format!("{byte:02X}").as_bytes());
            }
            out.push(b'>');
        }
        StringMode::Literal => {
            out.push(b'(');
            for &byte in s.as_bytes() {
                match byte {
                    b'\\' | b'(' | b')' => {
                        out.push(b'\\');
                        out.push(byte);
                    }
                    b'\r' => out.extend_from_slice(b"\\r"),
                    _ => out.push(byte),
                }
            }
            out.push(b')');
        }
    }
}

fn write_name(out: &mut Vec<u8>, name: &str) {
    out.push(b'/');
    for &byte in name.as_bytes() {
        if byte == b'#' || !(0x21..=0x7E).contains(&byte) || is_delimiter(byte) || is_whitespace(byte) {
            out.extend_from_slice(format!("#{byte:02X}").as_bytes());
        } else {
            out.push(byte);
        }
    }
}
