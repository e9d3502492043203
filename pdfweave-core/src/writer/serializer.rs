//! Whole-file serialization: standard rewrite and incremental update.

use std::io::Write;
use std::path::Path;

use chrono::Utc;

use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object, ObjectId, PdfString};
use crate::parser::xref::find_startxref;
use crate::parser::PdfVersion;
use crate::writer::file_id::{changing_id, format_pdf_date, update_file_id};
use crate::writer::pdf_writer::object_to_bytes;
use crate::writer::{
    PdfWriter, SerializationMode, WriterConfig, XRefMode, XRefStreamWriter, XRefTableWriter,
};
use crate::xref::{IndirectObjects, XRefEntry, GENERATION_UNREUSABLE};

/// Cross-reference streams need at least this version.
const XREF_STREAM_VERSION: PdfVersion = PdfVersion::new(1, 5);

/// Trailer keys that belong to one particular xref section.
const SECTION_KEYS: &[&str] = &[
    "Prev", "XRefStm", "Type", "W", "Index", "Length", "Filter", "DecodeParms", "DL",
];

/// Serializes one file: its registry, trailer and version.
///
/// The trailer is updated in place with the new `ID` (and `Info` when it
/// had to be created), so the caller's view matches what was written.
pub struct FileWriter<'a> {
    objects: &'a mut IndirectObjects,
    trailer: &'a mut Dictionary,
    version: PdfVersion,
    path: Option<&'a Path>,
    config: &'a WriterConfig,
}

impl<'a> FileWriter<'a> {
    pub fn new(
        objects: &'a mut IndirectObjects,
        trailer: &'a mut Dictionary,
        version: PdfVersion,
        config: &'a WriterConfig,
    ) -> Self {
        Self {
            objects,
            trailer,
            version,
            path: None,
            config,
        }
    }

    /// Target path, mixed into the file identifier.
    pub fn with_path(mut self, path: &'a Path) -> Self {
        self.path = Some(path);
        self
    }

    pub fn write<W: Write>(mut self, out: W) -> Result<()> {
        let mut mode = self.config.serialization;
        if mode == SerializationMode::Linearized {
            return Err(PdfError::UnsupportedFeature(
                "linearized writing is not supported".to_string(),
            ));
        }
        if mode == SerializationMode::Incremental && self.objects.reader().is_none() {
            tracing::info!("file was not loaded from bytes, writing a full copy instead of an update");
            mode = SerializationMode::Standard;
        }
        if self.config.update_information {
            self.stamp_information()?;
        }

        let mut writer = PdfWriter::new_with_writer(out);
        match mode {
            SerializationMode::Incremental => self.write_incremental(&mut writer)?,
            _ => self.write_standard(&mut writer)?,
        }
        writer.flush()
    }

    fn effective_version(&self) -> PdfVersion {
        match self.config.xref_mode {
            XRefMode::Compressed => self.version.max(XREF_STREAM_VERSION),
            XRefMode::Plain => self.version,
        }
    }

    /// Sets `Producer` and `ModDate`, creating the Info dictionary if needed.
    fn stamp_information(&mut self) -> Result<()> {
        let now = PdfString::new(format_pdf_date(Utc::now()));
        let producer = self.config.producer.clone();
        let stamp = |info: &mut Dictionary| {
            if let Some(producer) = &producer {
                info.set("Producer", PdfString::new(producer.as_bytes()));
            }
            info.set("ModDate", now.clone());
        };

        if let Some(info) = self.trailer.get_mut("Info").and_then(Object::as_dict_mut) {
            stamp(info);
            return Ok(());
        }
        if let Some(id) = self.trailer.get_reference("Info") {
            let is_dictionary = matches!(
                self.objects.get(id.number())?,
                Some(object) if object.is_in_use() && object.data().as_dict().is_some()
            );
            if is_dictionary {
                if let Some(info) = self
                    .objects
                    .get_mut(id.number())?
                    .and_then(|object| object.data_mut().as_dict_mut())
                {
                    stamp(info);
                }
                return Ok(());
            }
            tracing::warn!(reference = %id, "trailer Info does not point at a dictionary, replacing it");
        }

        let mut info = Dictionary::new();
        info.set("CreationDate", now.clone());
        stamp(&mut info);
        let id = self.objects.add(info);
        self.trailer.set("Info", id);
        Ok(())
    }

    fn write_standard<W: Write>(&mut self, writer: &mut PdfWriter<W>) -> Result<()> {
        writer.write_bytes(&self.effective_version().header_bytes())?;

        let last = self.objects.last_number();
        let mut entries = Vec::with_capacity(last as usize + 2);
        entries.push(XRefEntry::free(0, GENERATION_UNREUSABLE, 0));
        for number in 1..=last {
            let entry = match self.objects.get(number)? {
                Some(object) if object.is_in_use() && !is_section_stream(object.data()) => {
                    let offset = writer.write_object(object.id(), object.data())?;
                    XRefEntry::in_use(number, object.generation(), offset)
                }
                Some(object) if object.is_in_use() => {
                    tracing::debug!(number, "dropping cross-reference or object stream");
                    XRefEntry::free(number, object.generation().saturating_add(1), 0)
                }
                Some(object) => XRefEntry::free(number, object.generation(), 0),
                None => XRefEntry::free(number, 0, 0),
            };
            entries.push(entry);
        }
        link_free_list(&mut entries);
        tracing::debug!(objects = last, "standard body written");

        let mut trailer = section_trailer(self.trailer);
        trailer.set("Size", last as i64 + 1);
        self.write_cross_reference(writer, entries, trailer, last + 1)
    }

    fn write_incremental<W: Write>(&mut self, writer: &mut PdfWriter<W>) -> Result<()> {
        let (original, previous_xref, original_version) = match self.objects.reader() {
            Some(reader) => {
                let data = reader.data();
                (
                    data.to_vec(),
                    find_startxref(data)?,
                    PdfVersion::from_header(data)?,
                )
            }
            None => return Err(PdfError::InvalidStructure("no source file to update".to_string())),
        };

        let version = self.effective_version();
        if version > original_version {
            self.set_catalog_version(version)?;
        }

        writer.write_bytes(&original)?;
        if !matches!(original.last(), Some(b'\n') | Some(b'\r')) {
            writer.write_bytes(b"\n")?;
        }

        let mut entries = Vec::new();
        for object in self.objects.modified() {
            let entry = if object.is_in_use() {
                let offset = writer.write_object(object.id(), object.data())?;
                XRefEntry::in_use(object.number(), object.generation(), offset)
            } else {
                XRefEntry::free(object.number(), object.generation(), 0)
            };
            entries.push(entry);
        }
        tracing::debug!(objects = entries.len(), "incremental body appended");

        let previous_size = self
            .trailer
            .get_integer("Size")
            .and_then(|size| u32::try_from(size).ok())
            .unwrap_or(0);
        let size = previous_size.max(self.objects.last_number() + 1);

        let mut trailer = section_trailer(self.trailer);
        trailer.set("Size", size as i64);
        trailer.set("Prev", previous_xref as i64);
        self.write_cross_reference(writer, entries, trailer, size)
    }

    /// Records a version newer than the header in the catalog.
    fn set_catalog_version(&mut self, version: PdfVersion) -> Result<()> {
        let Some(root) = self.trailer.get_reference("Root") else {
            return Ok(());
        };
        if let Some(catalog) = self
            .objects
            .get_mut(root.number())?
            .and_then(|object| object.data_mut().as_dict_mut())
        {
            catalog.set("Version", Object::name(version.to_string()));
        }
        Ok(())
    }

    /// Writes the xref section (table or stream) and the file tail.
    ///
    /// `stream_number` is the number the xref stream takes in compressed
    /// mode; `trailer[Size]` is bumped to cover it.
    fn write_cross_reference<W: Write>(
        &mut self,
        writer: &mut PdfWriter<W>,
        mut entries: Vec<XRefEntry>,
        mut trailer: Dictionary,
        stream_number: u32,
    ) -> Result<()> {
        let xref_position = writer.position();
        let info = self.information()?;
        let changing = changing_id(Utc::now(), self.path, xref_position, info.as_ref());
        update_file_id(self.trailer, changing);
        if let Some(id) = self.trailer.get("ID") {
            trailer.set("ID", id.clone());
        }

        match self.config.xref_mode {
            XRefMode::Plain => {
                writer.write_bytes(&XRefTableWriter::new(&entries).encode()?)?;
                writer.write_bytes(b"trailer\n")?;
                writer.write_bytes(&object_to_bytes(&Object::Dictionary(trailer)))?;
                writer.write_bytes(b"\n")?;
            }
            XRefMode::Compressed => {
                entries.push(XRefEntry::in_use(stream_number, 0, xref_position));
                trailer.set("Size", stream_number as i64 + 1);
                let stream = XRefStreamWriter::new(&entries)
                    .create_stream(&trailer, cfg!(feature = "compression"))?;
                writer.write_object(ObjectId::new(stream_number, 0), &Object::Stream(stream))?;
            }
        }
        writer.write_bytes(format!("startxref\n{xref_position}\n%%EOF\n").as_bytes())?;
        tracing::debug!(xref_position, entries = entries.len(), "cross-reference written");
        Ok(())
    }

    fn information(&mut self) -> Result<Option<Dictionary>> {
        let Some(info) = self.trailer.get("Info").cloned() else {
            return Ok(None);
        };
        Ok(self.objects.resolve_dictionary(&info)?.cloned())
    }
}

/// Copy of `trailer` without keys tied to the section it came from.
fn section_trailer(trailer: &Dictionary) -> Dictionary {
    trailer
        .iter()
        .filter(|(key, _)| !SECTION_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Cross-reference and object streams are rebuilt, never copied.
fn is_section_stream(data: &Object) -> bool {
    data.as_stream()
        .and_then(|stream| stream.dictionary().get_type())
        .is_some_and(|kind| kind == "XRef" || kind == "ObjStm")
}

/// Chains free entries in ascending order; the last one points back to 0.
/// `entries[i]` must describe object `i`.
fn link_free_list(entries: &mut [XRefEntry]) {
    let free: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.is_free())
        .map(|(index, _)| index)
        .collect();
    for (i, &index) in free.iter().enumerate() {
        entries[index].offset = free.get(i + 1).copied().unwrap_or(0) as u64;
    }
}
