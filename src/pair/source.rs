//! Streaming reader for Posts dump files.
//!
//! Dumps are a single `<posts>` element containing millions of `<row/>`
//! children, plain or bzip2-compressed. The stream never materializes the
//! document; it advances a buffered event reader and yields one [`RawPost`]
//! per row in document order.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use bzip2::read::BzDecoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::posts::RawPost;

/// Errors from reading a dump stream.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("malformed row attribute: {0}")]
    Attr(String),
}

impl From<quick_xml::Error> for SourceError {
    fn from(e: quick_xml::Error) -> Self {
        SourceError::Xml(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for SourceError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        SourceError::Attr(e.to_string())
    }
}

/// Reader over either a plain or a bzip2-compressed dump file.
enum DumpReader {
    Bzip2(Reader<BufReader<BzDecoder<File>>>),
    Plain(Reader<BufReader<File>>),
}

impl DumpReader {
    fn read_event<'b>(&mut self, buf: &'b mut Vec<u8>) -> Result<Event<'b>, quick_xml::Error> {
        buf.clear();
        match self {
            DumpReader::Bzip2(reader) => reader.read_event_into(buf),
            DumpReader::Plain(reader) => reader.read_event_into(buf),
        }
    }
}

/// Outcome of reading one XML event.
enum ParseResult {
    /// A `<row>` element was parsed into a post.
    Post(RawPost),
    /// Some other event (container tags, whitespace, comments).
    Skipped,
    /// End of the document.
    Eof,
}

/// Iterator of posts from a dump file.
pub struct PostStream {
    reader: DumpReader,
    buf: Vec<u8>,
    path: PathBuf,
}

impl PostStream {
    /// Open a dump file, transparently decompressing `.bz2` input.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        let reader = if path.extension().and_then(|ext| ext.to_str()) == Some("bz2") {
            let decoder = BzDecoder::new(file);
            DumpReader::Bzip2(Reader::from_reader(BufReader::with_capacity(
                1024 * 1024,
                decoder,
            )))
        } else {
            DumpReader::Plain(Reader::from_reader(BufReader::with_capacity(
                1024 * 1024,
                file,
            )))
        };
        Ok(Self {
            reader,
            buf: Vec::new(),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn next_post(&mut self) -> Result<ParseResult, SourceError> {
        match self.reader.read_event(&mut self.buf)? {
            // Rows are normally self-closing, but tolerate the paired form.
            Event::Empty(e) | Event::Start(e) if e.name().as_ref() == b"row" => {
                Ok(ParseResult::Post(row_to_post(&e)?))
            }
            Event::Eof => Ok(ParseResult::Eof),
            _ => Ok(ParseResult::Skipped),
        }
    }
}

fn row_to_post(row: &BytesStart) -> Result<RawPost, SourceError> {
    let mut post = RawPost::new();
    for attr in row.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        // Ill-formed entity references fall back to the raw bytes rather
        // than losing the whole row.
        let value = match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        post.insert(key, value);
    }
    Ok(post)
}

impl Iterator for PostStream {
    type Item = Result<RawPost, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.next_post() {
                Ok(ParseResult::Post(post)) => return Some(Ok(post)),
                Ok(ParseResult::Skipped) => continue,
                Ok(ParseResult::Eof) => return None,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
