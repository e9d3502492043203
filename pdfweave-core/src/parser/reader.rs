//! PDF File Reader
//!
//! Reads the header, follows the xref chain from `startxref` and loads
//! individual objects by their cross-reference entry.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::header::PdfVersion;
use super::object_stream::ObjectStream;
use super::objects::ObjectParser;
use super::xref::{find_startxref, is_classic_section, parse_xref_table, XRefSection};
use super::xref_stream::parse_xref_stream;
use super::{ParseError, ParseOptions, ParseResult};
use crate::objects::{Dictionary, Object, ObjectId};
use crate::xref::{Usage, XRefEntry, GENERATION_UNREUSABLE};

/// Everything learned from the file structure before any object is woken.
#[derive(Debug, Clone)]
pub struct ReaderInfo {
    pub version: PdfVersion,
    /// Trailer of the most recent section.
    pub trailer: Dictionary,
    pub xref_entries: BTreeMap<u32, XRefEntry>,
    /// Offset of the most recent xref section.
    pub startxref: usize,
}

/// Random-access reader over the complete file bytes.
#[derive(Debug)]
pub struct FileReader {
    data: Vec<u8>,
    options: ParseOptions,
    entries: BTreeMap<u32, XRefEntry>,
    object_streams: HashMap<u32, ObjectStream>,
}

impl FileReader {
    pub fn new(data: Vec<u8>, options: ParseOptions) -> Self {
        Self {
            data,
            options,
            entries: BTreeMap::new(),
            object_streams: HashMap::new(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parses header, trailer and the whole xref chain.
    pub fn read_info(&mut self) -> ParseResult<ReaderInfo> {
        let version = PdfVersion::from_header(&self.data)?;
        let startxref = find_startxref(&self.data)?;

        let mut entries: BTreeMap<u32, XRefEntry> = BTreeMap::new();
        let mut trailer: Option<Dictionary> = None;
        let mut visited = HashSet::new();
        let mut next = Some(startxref);

        while let Some(offset) = next.take() {
            if !visited.insert(offset) {
                return Err(ParseError::corrupt(offset, "xref chain loops back on itself"));
            }
            if visited.len() > self.options.max_xref_chain {
                return Err(ParseError::corrupt(offset, "xref chain too long"));
            }

            let section = self.read_section(offset)?;

            // Hybrid file: the XRefStm entries belong to this revision and
            // take precedence over the table's own rows.
            if let Some(stm_offset) = section.trailer.get_integer("XRefStm") {
                let stm_offset = stm_offset.max(0) as usize;
                if visited.insert(stm_offset) {
                    match self.read_section(stm_offset) {
                        Ok(stm) => merge_entries(&mut entries, stm.entries.into_iter().filter(XRefEntry::is_in_use)),
                        Err(err) => tracing::warn!(offset = stm_offset, %err, "unreadable XRefStm ignored"),
                    }
                }
            }
            merge_entries(&mut entries, section.entries);

            next = section
                .trailer
                .get_integer("Prev")
                .filter(|&prev| prev >= 0)
                .map(|prev| prev as usize);
            if trailer.is_none() {
                trailer = Some(section.trailer);
            }
        }

        let trailer = trailer.ok_or(ParseError::MissingStartXRef)?;
        if trailer.contains_key("Encrypt") {
            return Err(ParseError::EncryptionNotSupported);
        }

        let end = entries.keys().next_back().map_or(0, |&n| u64::from(n) + 1);
        if let Some(size) = trailer.get_integer("Size").filter(|&size| size > end as i64) {
            tracing::warn!(size, entries = end, "trailer Size exceeds the entries read");
        }
        // Gaps are only filled eagerly while their count is bounded by the
        // file length; the registry synthesizes the rest on access.
        if end <= self.data.len() as u64 {
            for number in 0..end as u32 {
                entries.entry(number).or_insert_with(|| {
                    if number != 0 {
                        tracing::warn!(number, "missing xref entry synthesized as free");
                    }
                    XRefEntry::free(number, if number == 0 { GENERATION_UNREUSABLE } else { 0 }, 0)
                });
            }
        } else {
            tracing::warn!(entries = end, "xref numbering sparser than the file, gaps left to the registry");
            entries
                .entry(0)
                .or_insert_with(|| XRefEntry::free(0, GENERATION_UNREUSABLE, 0));
        }

        tracing::debug!(
            %version,
            startxref,
            sections = visited.len(),
            entries = entries.len(),
            "file structure read"
        );
        self.entries = entries.clone();
        Ok(ReaderInfo {
            version,
            trailer,
            xref_entries: entries,
            startxref,
        })
    }

    fn read_section(&self, offset: usize) -> ParseResult<XRefSection> {
        if offset >= self.data.len() {
            return Err(ParseError::xref(offset, "xref offset beyond end of file"));
        }
        if is_classic_section(&self.data, offset) {
            return parse_xref_table(&self.data, offset, &self.options);
        }
        let (_, object) = self.parse_at(offset)?;
        match object {
            Object::Stream(stream) => parse_xref_stream(&stream, offset),
            other => Err(ParseError::xref(
                offset,
                format!("expected xref table or stream, found {}", other.type_name()),
            )),
        }
    }

    /// Parses the indirect object starting at `offset`.
    fn parse_at(&self, offset: usize) -> ParseResult<(ObjectId, Object)> {
        let mut parser = ObjectParser::new(&self.data, offset, &self.options);
        parser.parse_indirect_object(&mut |id| self.resolve_length(id))
    }

    /// Indirect `Length` values; only uncompressed integers are followed.
    fn resolve_length(&self, id: ObjectId) -> Option<i64> {
        let entry = self.entries.get(&id.number())?;
        if entry.usage != Usage::InUse {
            return None;
        }
        let mut parser = ObjectParser::new(&self.data, entry.offset as usize, &self.options);
        match parser.parse_indirect_object(&mut |_| None) {
            Ok((_, Object::Integer(len))) => Some(len),
            _ => None,
        }
    }

    /// Loads the object an entry points at. Free entries yield `Null`.
    pub fn load_object(&mut self, entry: &XRefEntry) -> ParseResult<Object> {
        match entry.usage {
            Usage::Free => Ok(Object::Null),
            Usage::InUse => {
                let offset = entry.offset as usize;
                if offset >= self.data.len() {
                    return Err(ParseError::corrupt(offset, "object offset beyond end of file"));
                }
                let (id, object) = self.parse_at(offset)?;
                if id.number() != entry.number {
                    tracing::warn!(
                        expected = entry.number,
                        found = id.number(),
                        offset,
                        "xref entry points at a different object"
                    );
                }
                tracing::debug!(number = entry.number, offset, "object loaded");
                Ok(object)
            }
            Usage::InUseCompressed => self.load_compressed(entry),
        }
    }

    fn load_compressed(&mut self, entry: &XRefEntry) -> ParseResult<Object> {
        let mut stream_number = entry
            .stream_number
            .ok_or_else(|| ParseError::corrupt(0, "compressed entry without stream number"))?;
        let mut seen = HashSet::new();

        loop {
            if !seen.insert(stream_number) {
                return Err(ParseError::corrupt(0, "object stream /Extends cycle"));
            }
            self.ensure_object_stream(stream_number)?;
            let Some(objstm) = self.object_streams.get(&stream_number) else {
                return Ok(Object::Null);
            };
            if let Some(object) = objstm.get(entry.number, entry.offset as usize, &self.options)? {
                tracing::debug!(number = entry.number, stream = stream_number, "compressed object loaded");
                return Ok(object);
            }
            match objstm.extends() {
                Some(base) => stream_number = base.number(),
                None => {
                    tracing::warn!(number = entry.number, stream = stream_number, "object missing from its object stream");
                    return Ok(Object::Null);
                }
            }
        }
    }

    fn ensure_object_stream(&mut self, number: u32) -> ParseResult<()> {
        if self.object_streams.contains_key(&number) {
            return Ok(());
        }
        let entry = match self.entries.get(&number) {
            Some(entry) if entry.usage == Usage::InUse => *entry,
            _ => {
                tracing::warn!(number, "object stream is not an in-use object");
                return Ok(());
            }
        };
        let (_, object) = self.parse_at(entry.offset as usize)?;
        let stream = object.as_stream().ok_or_else(|| {
            ParseError::corrupt(entry.offset as usize, "object stream entry is not a stream")
        })?;
        let objstm = ObjectStream::parse(stream)?;
        self.object_streams.insert(number, objstm);
        Ok(())
    }
}

/// Earlier-processed (newer) sections win.
fn merge_entries(target: &mut BTreeMap<u32, XRefEntry>, entries: impl IntoIterator<Item = XRefEntry>) {
    for entry in entries {
        target.entry(entry.number).or_insert(entry);
    }
}
