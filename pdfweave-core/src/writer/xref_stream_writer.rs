//! XRef Stream Writer for PDF 1.5+
//!
//! Writes cross-reference streams according to ISO 32000-1:2008
//! Section 7.5.8. Field widths are the minimum that fit the largest value
//! in each column.

use crate::error::Result;
use crate::objects::{Dictionary, Object, Stream};
use crate::writer::xref_table::subsections;
use crate::xref::XRefEntry;

/// Encoder for a set of entries sorted by object number.
pub struct XRefStreamWriter<'a> {
    entries: &'a [XRefEntry],
    widths: [usize; 3],
}

impl<'a> XRefStreamWriter<'a> {
    pub fn new(entries: &'a [XRefEntry]) -> Self {
        let mut widths = [1, 1, 1];
        for entry in entries {
            let (second, third) = Self::fields(entry);
            widths[1] = widths[1].max(Self::bytes_needed(second));
            widths[2] = widths[2].max(Self::bytes_needed(third));
        }
        Self { entries, widths }
    }

    pub fn widths(&self) -> [usize; 3] {
        self.widths
    }

    fn fields(entry: &XRefEntry) -> (u64, u64) {
        match entry.stream_number {
            Some(stream) => (stream as u64, entry.offset),
            None => (entry.offset, entry.generation as u64),
        }
    }

    /// Calculate minimum bytes needed to represent a value
    fn bytes_needed(value: u64) -> usize {
        if value == 0 {
            1
        } else {
            ((value.ilog2() / 8) + 1) as usize
        }
    }

    fn write_field(data: &mut Vec<u8>, value: u64, width: usize) {
        for i in (0..width).rev() {
            data.push(((value >> (i * 8)) & 0xFF) as u8);
        }
    }

    /// Packed binary rows.
    pub fn encode_entries(&self) -> Vec<u8> {
        let row = self.widths.iter().sum::<usize>();
        let mut data = Vec::with_capacity(row * self.entries.len());
        for entry in self.entries {
            let (second, third) = Self::fields(entry);
            Self::write_field(&mut data, entry.usage.type_code(), self.widths[0]);
            Self::write_field(&mut data, second, self.widths[1]);
            Self::write_field(&mut data, third, self.widths[2]);
        }
        data
    }

    /// `Index` pairs, one per run of consecutive numbers.
    pub fn index(&self) -> Vec<Object> {
        subsections(self.entries)
            .into_iter()
            .flat_map(|run| {
                [
                    Object::Integer(run[0].number as i64),
                    Object::Integer(run.len() as i64),
                ]
            })
            .collect()
    }

    /// Stream object carrying the entries. `trailer` supplies `Root`,
    /// `Info`, `ID`, `Size` and `Prev`.
    pub fn create_stream(&self, trailer: &Dictionary, compress: bool) -> Result<Stream> {
        let mut dict = trailer.clone();
        dict.set("Type", Object::name("XRef"));
        dict.set(
            "W",
            Object::Array(self.widths.iter().map(|w| Object::Integer(*w as i64)).collect()),
        );
        dict.set("Index", Object::Array(self.index()));

        let mut stream = Stream::with_dictionary(dict, Vec::new());
        stream.set_decoded_data(self.encode_entries(), compress)?;
        Ok(stream)
    }
}
