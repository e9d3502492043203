//! Builder for test PDFs with correct xref offsets

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy)]
enum Pending {
    Offset(usize),
    Compressed { stream: u32, index: u32 },
}

/// Appends objects and xref sections, tracking offsets as it goes.
pub struct PdfFixture {
    buf: Vec<u8>,
    pending: BTreeMap<u32, Pending>,
    max_number: u32,
    last_xref: Option<usize>,
}

impl PdfFixture {
    pub fn new(version: &str) -> Self {
        Self {
            buf: format!("%PDF-{version}\n%\u{00E2}\u{00E3}\n").into_bytes(),
            pending: BTreeMap::new(),
            max_number: 0,
            last_xref: None,
        }
    }

    /// Starts a new revision on top of existing bytes.
    pub fn update(previous: Vec<u8>, last_xref: usize, max_number: u32) -> Self {
        Self {
            buf: previous,
            pending: BTreeMap::new(),
            max_number,
            last_xref: Some(last_xref),
        }
    }

    pub fn object(self, number: u32, body: &str) -> Self {
        self.raw_object(number, body.as_bytes())
    }

    pub fn raw_object(mut self, number: u32, body: &[u8]) -> Self {
        self.pending.insert(number, Pending::Offset(self.buf.len()));
        self.max_number = self.max_number.max(number);
        self.buf
            .extend_from_slice(format!("{number} 0 obj\n").as_bytes());
        self.buf.extend_from_slice(body);
        self.buf.extend_from_slice(b"\nendobj\n");
        self
    }

    /// Stream object with a direct `Length`.
    pub fn stream(self, number: u32, dict_entries: &str, data: &[u8]) -> Self {
        let mut body = format!("<< {dict_entries} /Length {} >>\nstream\n", data.len()).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.raw_object(number, &body)
    }

    /// Object stream `number` holding `objects` (uncompressed).
    pub fn object_stream(mut self, number: u32, objects: &[(u32, &str)]) -> Self {
        let mut header = String::new();
        let mut body = String::new();
        for (index, (obj, text)) in objects.iter().enumerate() {
            header.push_str(&format!("{obj} {} ", body.len()));
            body.push_str(text);
            body.push(' ');
            self.pending.insert(
                *obj,
                Pending::Compressed {
                    stream: number,
                    index: index as u32,
                },
            );
            self.max_number = self.max_number.max(*obj);
        }
        let dict = format!("/Type /ObjStm /N {} /First {}", objects.len(), header.len());
        self.stream(number, &dict, format!("{header}{body}").as_bytes())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Offset of the most recent xref section.
    pub fn last_xref(&self) -> Option<usize> {
        self.last_xref
    }

    fn runs(&self, include_zero: bool) -> Vec<(u32, Vec<Option<Pending>>)> {
        let mut numbers: Vec<u32> = self.pending.keys().copied().collect();
        if include_zero {
            numbers.insert(0, 0);
        }
        let mut runs: Vec<(u32, Vec<Option<Pending>>)> = Vec::new();
        for n in numbers {
            let entry = self.pending.get(&n).copied();
            match runs.last_mut() {
                Some((first, items)) if *first + items.len() as u32 == n => items.push(entry),
                _ => runs.push((n, vec![entry])),
            }
        }
        runs
    }

    /// Classic xref table plus trailer covering objects added since the
    /// previous section.
    pub fn xref_table(mut self, trailer_entries: &str) -> Self {
        let offset = self.buf.len();
        let mut out = String::from("xref\n");
        for (first, items) in self.runs(self.last_xref.is_none()) {
            out.push_str(&format!("{first} {}\n", items.len()));
            for item in items {
                match item {
                    Some(Pending::Offset(o)) => out.push_str(&format!("{o:010} 00000 n\r\n")),
                    _ => out.push_str("0000000000 65535 f\r\n"),
                }
            }
        }
        let prev = self
            .last_xref
            .map(|p| format!(" /Prev {p}"))
            .unwrap_or_default();
        out.push_str(&format!(
            "trailer\n<< /Size {}{prev} {trailer_entries} >>\nstartxref\n{offset}\n%%EOF\n",
            self.max_number + 1
        ));
        self.buf.extend_from_slice(out.as_bytes());
        self.pending.clear();
        self.last_xref = Some(offset);
        self
    }

    /// Cross-reference stream object `number` (W [1 4 2], no filter).
    pub fn xref_stream(mut self, number: u32, trailer_entries: &str) -> Self {
        let offset = self.buf.len();
        self.pending.insert(number, Pending::Offset(offset));
        self.max_number = self.max_number.max(number);

        let mut data = Vec::new();
        let mut index = String::new();
        for (first, items) in self.runs(self.last_xref.is_none()) {
            index.push_str(&format!("{first} {} ", items.len()));
            for item in items {
                match item {
                    Some(Pending::Offset(o)) => {
                        data.push(1);
                        data.extend_from_slice(&(o as u32).to_be_bytes());
                        data.extend_from_slice(&0u16.to_be_bytes());
                    }
                    Some(Pending::Compressed { stream, index }) => {
                        data.push(2);
                        data.extend_from_slice(&stream.to_be_bytes());
                        data.extend_from_slice(&(index as u16).to_be_bytes());
                    }
                    None => {
                        data.push(0);
                        data.extend_from_slice(&0u32.to_be_bytes());
                        data.extend_from_slice(&0xFFFFu16.to_be_bytes());
                    }
                }
            }
        }
        let prev = self
            .last_xref
            .map(|p| format!(" /Prev {p}"))
            .unwrap_or_default();
        let dict = format!(
            "/Type /XRef /Size {} /W [1 4 2] /Index [{}]{prev} {trailer_entries}",
            self.max_number + 1,
            index.trim_end()
        );
        self.pending.remove(&number);
        let mut body = format!("<< {dict} /Length {} >>\nstream\n", data.len()).into_bytes();
        body.extend_from_slice(&data);
        body.extend_from_slice(b"\nendstream");
        self.buf
            .extend_from_slice(format!("{number} 0 obj\n").as_bytes());
        self.buf.extend_from_slice(&body);
        self.buf.extend_from_slice(b"\nendobj\n");
        self.buf
            .extend_from_slice(format!("startxref\n{offset}\n%%EOF\n").as_bytes());
        self.pending.clear();
        self.last_xref = Some(offset);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Catalog, empty page tree and one page: the smallest useful document.
pub fn create_minimal_pdf() -> Vec<u8> {
    PdfFixture::new("1.4")
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(3, "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>")
        .xref_table("/Root 1 0 R")
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_pdf_structure() {
        let pdf = create_minimal_pdf();
        assert!(pdf.starts_with(b"%PDF-1.4\n"));
        assert!(pdf.ends_with(b"%%EOF\n"));
        let text = String::from_utf8_lossy(&pdf);
        assert!(text.contains("xref\n0 4\n0000000000 65535 f\r\n"));
    }

    #[test]
    fn test_fixture_offsets_point_at_objects() {
        let fixture = PdfFixture::new("1.5").object(1, "<< >>");
        let pdf = fixture.xref_table("").finish();
        let text = String::from_utf8_lossy(&pdf);
        let row = text.lines().find(|l| l.ends_with(" n")).unwrap();
        let offset: usize = row[..10].parse().unwrap();
        assert!(pdf[offset..].starts_with(b"1 0 obj"));
    }
}
