//! Hand-assembled PDF files for integration tests.
//!
//! Offsets are computed while writing, so sections can be stacked to build
//! files with incremental updates.

#![allow(dead_code)]

pub struct PdfBuilder {
    buf: Vec<u8>,
    /// Objects written since the last xref section.
    pending: Vec<(u32, usize)>,
    last_xref: Option<usize>,
}

impl PdfBuilder {
    pub fn new(version: &str) -> Self {
        Self {
            buf: format!("%PDF-{version}\n%\u{e2}\u{e3}\n").into_bytes(),
            pending: Vec::new(),
            last_xref: None,
        }
    }

    pub fn object(mut self, number: u32, body: &str) -> Self {
        self.pending.push((number, self.buf.len()));
        self.buf
            .extend_from_slice(format!("{number} 0 obj\n{body}\nendobj\n").as_bytes());
        self
    }

    pub fn stream(mut self, number: u32, data: &[u8]) -> Self {
        self.pending.push((number, self.buf.len()));
        self.buf.extend_from_slice(
            format!("{number} 0 obj\n<< /Length {} >>\nstream\n", data.len()).as_bytes(),
        );
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\nendstream\nendobj\n");
        self
    }

    /// Classic xref section for the objects written since the previous one,
    /// linked to it through `Prev`. The first section also covers object 0.
    pub fn xref(mut self, trailer_entries: &str) -> Self {
        let position = self.buf.len();
        let mut rows: Vec<(u32, String)> = self
            .pending
            .drain(..)
            .map(|(number, offset)| (number, format!("{offset:010} 00000 n\r\n")))
            .collect();
        if self.last_xref.is_none() {
            rows.push((0, "0000000000 65535 f\r\n".to_string()));
        }
        rows.sort_by_key(|(number, _)| *number);

        let mut section = String::from("xref\n");
        let mut start = 0;
        while start < rows.len() {
            let mut end = start + 1;
            while end < rows.len() && rows[end].0 == rows[end - 1].0 + 1 {
                end += 1;
            }
            section.push_str(&format!("{} {}\n", rows[start].0, end - start));
            for (_, row) in &rows[start..end] {
                section.push_str(row);
            }
            start = end;
        }

        let prev = self
            .last_xref
            .map(|prev| format!(" /Prev {prev}"))
            .unwrap_or_default();
        section.push_str(&format!(
            "trailer\n<< {trailer_entries}{prev} >>\nstartxref\n{position}\n%%EOF\n"
        ));
        self.buf.extend_from_slice(section.as_bytes());
        self.last_xref = Some(position);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Catalog, page tree with one page, and a content stream.
pub fn one_page_pdf(content: &[u8]) -> Vec<u8> {
    PdfBuilder::new("1.4")
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 612 792] >>")
        .object(
            3,
            "<< /Type /Page /Parent 2 0 R /Resources << /ExtGState << /GS0 5 0 R >> >> /Contents 4 0 R >>",
        )
        .stream(4, content)
        .object(5, "<< /Type /ExtGState /LW 6 /ca 0.5 >>")
        .xref("/Size 6 /Root 1 0 R")
        .finish()
}
