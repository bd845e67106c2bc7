//! Zip sink: records as deflate-compressed archive entries.

use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{partial_path, CorpusSink, SinkError};
use crate::pair::render::OutputRecord;

/// Streams entries into a `.partial` sibling and renames it into place on
/// finalize, so an interrupted run never leaves a truncated archive at the
/// final path.
pub struct ZipSink {
    writer: Option<ZipWriter<File>>,
    partial: PathBuf,
    path: PathBuf,
}

impl ZipSink {
    pub fn create(path: PathBuf) -> Result<Self, SinkError> {
        let partial = partial_path(&path);
        let file = File::create(&partial)?;
        Ok(Self {
            writer: Some(ZipWriter::new(file)),
            partial,
            path,
        })
    }
}

impl CorpusSink for ZipSink {
    fn write(&mut self, record: &OutputRecord, text: &str) -> Result<(), SinkError> {
        let writer = self.writer.as_mut().ok_or(SinkError::Finalized)?;
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        writer.start_file(record.name.as_str(), options)?;
        writer.write_all(text.as_bytes())?;
        Ok(())
    }

    fn finalize(&mut self, corpus_name: &str) -> Result<(), SinkError> {
        let writer = self.writer.take().ok_or(SinkError::Finalized)?;
        writer.finish()?;
        fs::rename(&self.partial, &self.path)?;
        debug!("corpus '{}' archived at {}", corpus_name, self.path.display());
        Ok(())
    }
}
