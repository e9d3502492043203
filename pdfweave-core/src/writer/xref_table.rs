//! Classic `xref` table output.

use crate::error::{PdfError, Result};
use crate::xref::{Usage, XRefEntry};

/// Splits entries sorted by number into runs of consecutive numbers.
pub fn subsections(entries: &[XRefEntry]) -> Vec<&[XRefEntry]> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=entries.len() {
        let breaks = i == entries.len() || entries[i].number != entries[i - 1].number + 1;
        if breaks {
            runs.push(&entries[start..i]);
            start = i;
        }
    }
    runs
}

/// Builds the `xref` keyword section from entries sorted by number.
pub struct XRefTableWriter<'a> {
    entries: &'a [XRefEntry],
}

impl<'a> XRefTableWriter<'a> {
    pub fn new(entries: &'a [XRefEntry]) -> Self {
        Self { entries }
    }

    /// Encoded section, `xref` keyword included. Rows are 20 bytes each.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(8 + self.entries.len() * 20);
        out.extend_from_slice(b"xref\n");
        for run in subsections(self.entries) {
            out.extend_from_slice(format!("{} {}\n", run[0].number, run.len()).as_bytes());
            for entry in run {
                let kind = match entry.usage {
                    Usage::InUse => 'n',
                    Usage::Free => 'f',
                    Usage::InUseCompressed => {
                        return Err(PdfError::InvalidStructure(format!(
                            "object {} lives in an object stream and needs a cross-reference stream",
                            entry.number
                        )))
                    }
                };
                out.extend_from_slice(
                    format!("{:010} {:05} {} \n", entry.offset, entry.generation, kind).as_bytes(),
                );
            }
        }
        Ok(out)
    }
}
