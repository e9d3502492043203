//! PDF writing functionality
//!
//! Serialization runs along two independent axes: [`SerializationMode`]
//! (full rewrite or incremental append) and [`XRefMode`] (classic table or
//! cross-reference stream).

mod file_id;
mod pdf_writer;
mod serializer;
mod xref_stream_writer;
mod xref_table;

pub use file_id::{changing_id, format_pdf_date};
pub use pdf_writer::{object_to_bytes, write_object_value, PdfWriter};
pub use serializer::FileWriter;
pub use xref_stream_writer::XRefStreamWriter;
pub use xref_table::{subsections, XRefTableWriter};

/// How the object graph is laid out in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SerializationMode {
    /// Rewrite every in-use object.
    #[default]
    Standard,
    /// Append changed objects after the original bytes.
    Incremental,
    /// Not supported; writing fails with `UnsupportedFeature`.
    Linearized,
}

/// How cross-reference data is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XRefMode {
    /// `xref` table with 20-byte rows.
    #[default]
    Plain,
    /// Binary cross-reference stream (PDF 1.5+).
    Compressed,
}

/// Options for saving a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterConfig {
    pub serialization: SerializationMode,
    pub xref_mode: XRefMode,
    /// `Producer` stamped into the Info dictionary.
    pub producer: Option<String>,
    /// Stamp `Producer` and `ModDate` before writing.
    pub update_information: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            serialization: SerializationMode::Standard,
            xref_mode: XRefMode::Plain,
            producer: Some(format!("pdfweave {}", env!("CARGO_PKG_VERSION"))),
            update_information: true,
        }
    }
}

impl WriterConfig {
    /// Incremental update with a plain xref table.
    pub fn incremental() -> Self {
        Self {
            serialization: SerializationMode::Incremental,
            ..Self::default()
        }
    }

    /// Full rewrite with a cross-reference stream.
    pub fn compressed() -> Self {
        Self {
            xref_mode: XRefMode::Compressed,
            ..Self::default()
        }
    }

    pub fn with_xref_mode(mut self, xref_mode: XRefMode) -> Self {
        self.xref_mode = xref_mode;
        self
    }

    pub fn without_information_update(mut self) -> Self {
        self.update_information = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_presets() {
        let config = WriterConfig::default();
        assert_eq!(config.serialization, SerializationMode::Standard);
        assert_eq!(config.xref_mode, XRefMode::Plain);
        assert!(config.producer.as_deref().unwrap().starts_with("pdfweave"));

        let incremental = WriterConfig::incremental().with_xref_mode(XRefMode::Compressed);
        assert_eq!(incremental.serialization, SerializationMode::Incremental);
        assert_eq!(incremental.xref_mode, XRefMode::Compressed);

        assert!(!WriterConfig::compressed().without_information_update().update_information);
    }
}
