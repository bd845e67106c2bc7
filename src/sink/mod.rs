//! Output sinks for rendered question-answer records.
//!
//! A sink stores one named text blob plus its structured metadata per
//! completed question, and is finalized exactly once after the stream is
//! exhausted. Three destinations are supported: a plain directory of text
//! files, a zip archive, and a zstd-compressed JSON lines file.

mod dir;
mod jsonl_zst;
mod zip;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::OutputFormat;
use crate::pair::render::OutputRecord;

pub use dir::DirSink;
pub use jsonl_zst::JsonlZstSink;
pub use zip::ZipSink;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("sink is already finalized")]
    Finalized,
}

impl From<::zip::result::ZipError> for SinkError {
    fn from(e: ::zip::result::ZipError) -> Self {
        SinkError::Archive(e.to_string())
    }
}

/// Destination for rendered records.
pub trait CorpusSink {
    /// Store one record under its canonical name.
    fn write(&mut self, record: &OutputRecord, text: &str) -> Result<(), SinkError>;

    /// Flush and persist the corpus. Called once, after the last write.
    fn finalize(&mut self, corpus_name: &str) -> Result<(), SinkError>;
}

/// Open the configured sink for one source below `out_dir`.
pub fn open_sink(
    format: OutputFormat,
    out_dir: &Path,
    source: &str,
) -> Result<Box<dyn CorpusSink>, SinkError> {
    std::fs::create_dir_all(out_dir)?;
    match format {
        OutputFormat::Dir => Ok(Box::new(DirSink::create(out_dir.join(source))?)),
        OutputFormat::Zip => Ok(Box::new(ZipSink::create(
            out_dir.join(format!("{source}.zip")),
        )?)),
        OutputFormat::JsonlZst => Ok(Box::new(JsonlZstSink::create(
            out_dir.join(format!("{source}.jsonl.zst")),
        )?)),
    }
}

/// Sibling path the archive sinks stream into before the final rename.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".partial");
    PathBuf::from(name)
}
