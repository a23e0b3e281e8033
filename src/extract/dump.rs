//! Stack Exchange XML dump reader
//!
//! Streams `<row .../>` elements out of a dump file (optionally compressed with bzip2)
//! without ever holding more than one row in memory.

use super::source::{ExtractError, RowSource, XmlRow};
use bzip2::read::MultiBzDecoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};

/// Element name of a record in every Stack Exchange dump file
const ROW_ELEMENT: &[u8] = b"row";

/// Streaming source of rows from a Stack Exchange dump
pub struct XmlRowSource {
    /// Path (or label) of the dump
    path: PathBuf,
    /// XML reader (wrapped in various decompression layers)
    reader: DumpReader,
    /// Attributes to keep (None = all)
    wanted: Option<HashSet<String>>,
    /// Rows read so far
    rows_read: u64,
    /// Set once the end of the document is reached
    finished: bool,
}

/// Reader abstraction for different compression formats
enum DumpReader {
    /// Bzip2 compressed
    Bzip2(Reader<BufReader<MultiBzDecoder<File>>>),
    /// Uncompressed XML
    Plain(Reader<BufReader<File>>),
    /// XML held in memory
    Memory(Reader<Cursor<Vec<u8>>>),
}

impl DumpReader {
    fn read_event<'a>(&mut self, buf: &'a mut Vec<u8>) -> Result<Event<'a>, quick_xml::Error> {
        buf.clear();
        match self {
            DumpReader::Bzip2(reader) => reader.read_event_into(buf),
            DumpReader::Plain(reader) => reader.read_event_into(buf),
            DumpReader::Memory(reader) => reader.read_event_into(buf),
        }
    }
}

impl XmlRowSource {
    /// Open a dump file; `.bz2` files are decompressed on the fly
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ExtractError> {
        let path = path.as_ref().to_path_buf();

        let file = File::open(&path)?;
        let is_bz2 = path.extension().map(|e| e == "bz2").unwrap_or(false);

        let reader = if is_bz2 {
            let decoder = MultiBzDecoder::new(file);
            let buf_reader = BufReader::with_capacity(1024 * 1024, decoder); // 1MB buffer
            DumpReader::Bzip2(Reader::from_reader(buf_reader))
        } else {
            let buf_reader = BufReader::with_capacity(1024 * 1024, file); // 1MB buffer
            DumpReader::Plain(Reader::from_reader(buf_reader))
        };

        Ok(Self::with_reader(path, reader))
    }

    /// Create a source over an XML string (used by tests and small inputs)
    pub fn from_xml_string(name: impl Into<PathBuf>, xml: &str) -> Self {
        let reader = Reader::from_reader(Cursor::new(xml.as_bytes().to_vec()));
        Self::with_reader(name.into(), DumpReader::Memory(reader))
    }

    fn with_reader(path: PathBuf, reader: DumpReader) -> Self {
        Self {
            path,
            reader,
            wanted: None,
            rows_read: 0,
            finished: false,
        }
    }

    /// Only decode the named attributes; everything else on a row is skipped
    pub fn with_attributes(mut self, names: &[&str]) -> Self {
        self.wanted = Some(names.iter().map(|n| n.to_string()).collect());
        self
    }

    /// Rows read so far
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Read the next row element, or None at end of document
    fn next_row(&mut self) -> Result<Option<XmlRow>, ExtractError> {
        if self.finished {
            return Ok(None);
        }

        let mut buf = Vec::with_capacity(8192);

        loop {
            match self.reader.read_event(&mut buf)? {
                Event::Empty(ref e) | Event::Start(ref e) if e.name().as_ref() == ROW_ELEMENT => {
                    self.rows_read += 1;
                    let row = self.decode_row(e)?;
                    return Ok(Some(row));
                }
                Event::Eof => {
                    self.finished = true;
                    return Ok(None);
                }
                _ => {}
            }
        }
    }

    /// Build an owned row from the element's attributes
    fn decode_row(&self, element: &BytesStart<'_>) -> Result<XmlRow, ExtractError> {
        let mut row = XmlRow::new(self.rows_read, self.source_name());

        for attr in element.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref());

            if let Some(ref wanted) = self.wanted {
                if !wanted.contains(&*key) {
                    continue;
                }
            }

            let value = attr.unescape_value()?;
            row.insert(key.into_owned(), value.into_owned());
        }

        Ok(row)
    }
}

impl RowSource for XmlRowSource {
    fn rows(&mut self) -> Box<dyn Iterator<Item = Result<XmlRow, ExtractError>> + '_> {
        Box::new(RowIterator { source: self })
    }

    fn source_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("dump")
    }
}

/// Iterator over rows in a dump; stops after the first error
struct RowIterator<'a> {
    source: &'a mut XmlRowSource,
}

impl<'a> Iterator for RowIterator<'a> {
    type Item = Result<XmlRow, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.source.next_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => None,
            Err(e) => {
                self.source.finished = true;
                Some(Err(e))
            }
        }
    }
}
