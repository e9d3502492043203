//! A PDF file: object registry, trailer and header version.

use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::document::Document;
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object};
use crate::parser::{FileReader, ParseOptions, PdfVersion};
use crate::writer::{FileWriter, WriterConfig};
use crate::xref::{Cloner, IndirectObjects};

/// One PDF file.
///
/// A file owns its indirect objects and trailer; [`File::document`] is a
/// view over them. Files loaded from bytes keep the original data for lazy
/// object loading and incremental saves.
///
/// # Example
///
/// ```rust
/// use pdfweave::{File, WriterConfig};
/// use pdfweave::document::Page;
/// use pdfweave::geometry::PageFormat;
///
/// # fn main() -> pdfweave::Result<()> {
/// let mut file = File::new();
/// file.document().pages()?.add(Page::create(PageFormat::A4.to_rectangle()))?;
/// let bytes = file.to_bytes(&WriterConfig::default())?;
///
/// let mut reloaded = File::from_bytes(bytes)?;
/// assert_eq!(reloaded.document().pages()?.count()?, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct File {
    objects: IndirectObjects,
    trailer: Dictionary,
    version: PdfVersion,
    path: Option<PathBuf>,
}

impl Default for File {
    fn default() -> Self {
        Self::new()
    }
}

impl File {
    pub const DEFAULT_VERSION: PdfVersion = PdfVersion::new(1, 4);

    /// New file with a catalog and an empty page tree.
    pub fn new() -> Self {
        let mut objects = IndirectObjects::new();

        let mut pages = Dictionary::new();
        pages.set("Type", Object::name("Pages"));
        pages.set("Kids", Object::Array(Vec::new()));
        pages.set("Count", 0);
        let pages = objects.add(pages);

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::name("Catalog"));
        catalog.set("Pages", pages);
        let root = objects.add(catalog);

        let mut trailer = Dictionary::new();
        trailer.set("Root", root);

        Self {
            objects,
            trailer,
            version: Self::DEFAULT_VERSION,
            path: None,
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => PdfError::FileNotFound(path.to_path_buf()),
            _ => PdfError::Io(err),
        })?;
        let mut file = Self::from_bytes(data)?;
        file.path = Some(path.to_path_buf());
        Ok(file)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_bytes_with_options(data, ParseOptions::default())
    }

    pub fn from_bytes_with_options(data: Vec<u8>, options: ParseOptions) -> Result<Self> {
        let mut reader = FileReader::new(data, options);
        let info = reader.read_info()?;
        tracing::debug!(
            version = %info.version,
            entries = info.xref_entries.len(),
            "file loaded"
        );
        Ok(Self {
            objects: IndirectObjects::from_reader(reader, info.xref_entries),
            trailer: info.trailer,
            version: info.version,
            path: None,
        })
    }

    /// Path the file was opened from.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Header version. See [`Document::version`] for the effective one.
    pub fn version(&self) -> PdfVersion {
        self.version
    }

    pub fn set_version(&mut self, version: PdfVersion) {
        self.version = version;
    }

    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    pub fn trailer_mut(&mut self) -> &mut Dictionary {
        &mut self.trailer
    }

    pub fn objects(&self) -> &IndirectObjects {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut IndirectObjects {
        &mut self.objects
    }

    pub fn document(&mut self) -> Document<'_> {
        Document::new(&mut self.objects, &mut self.trailer, self.version)
    }

    /// Cloner for importing objects from other files into this one.
    pub fn cloner(&self) -> Cloner {
        self.objects.cloner()
    }

    /// Writes the file to `out`.
    pub fn write_to<W: Write>(&mut self, out: W, config: &WriterConfig) -> Result<()> {
        FileWriter::new(&mut self.objects, &mut self.trailer, self.version, config).write(out)
    }

    pub fn to_bytes(&mut self, config: &WriterConfig) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out, config)?;
        Ok(out)
    }

    /// Saves to `path` through a temporary file in the same directory that
    /// replaces the target only once it is completely written.
    pub fn save(&mut self, path: impl AsRef<Path>, config: &WriterConfig) -> Result<()> {
        let path = path.as_ref();
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        if !directory.is_dir() {
            return Err(PdfError::FileNotFound(path.to_path_buf()));
        }

        let mut temp = NamedTempFile::new_in(directory)?;
        {
            let out = BufWriter::new(temp.as_file_mut());
            FileWriter::new(&mut self.objects, &mut self.trailer, self.version, config)
                .with_path(path)
                .write(out)?;
        }
        temp.persist(path).map_err(|err| PdfError::Io(err.error))?;
        tracing::debug!(path = %path.display(), "file saved");
        Ok(())
    }

    /// Saves over the path the file was opened from.
    pub fn save_in_place(&mut self, config: &WriterConfig) -> Result<()> {
        let path = self
            .path
            .clone()
            .ok_or_else(|| PdfError::InvalidStructure("file was not opened from a path".to_string()))?;
        self.save(path, config)
    }
}
