//! Packed sink: records as zstd-compressed JSON lines.
//!
//! Each line is one JSON object holding the record's structured fields plus
//! the flat text rendering, so the corpus can be consumed without knowing
//! the naming convention.

use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;
use zstd::stream::write::Encoder;

use super::{partial_path, CorpusSink, SinkError};
use crate::pair::render::OutputRecord;

const COMPRESSION_LEVEL: i32 = 3;

pub struct JsonlZstSink {
    encoder: Option<Encoder<'static, File>>,
    partial: PathBuf,
    path: PathBuf,
}

#[derive(Serialize)]
struct Line<'a> {
    #[serde(flatten)]
    record: &'a OutputRecord,
    text: &'a str,
}

impl JsonlZstSink {
    pub fn create(path: PathBuf) -> Result<Self, SinkError> {
        let partial = partial_path(&path);
        let file = File::create(&partial)?;
        let encoder = Encoder::new(file, COMPRESSION_LEVEL)?;
        Ok(Self {
            encoder: Some(encoder),
            partial,
            path,
        })
    }
}

impl CorpusSink for JsonlZstSink {
    fn write(&mut self, record: &OutputRecord, text: &str) -> Result<(), SinkError> {
        let encoder = self.encoder.as_mut().ok_or(SinkError::Finalized)?;
        serde_json::to_writer(&mut *encoder, &Line { record, text })?;
        encoder.write_all(b"\n")?;
        Ok(())
    }

    fn finalize(&mut self, corpus_name: &str) -> Result<(), SinkError> {
        let encoder = self.encoder.take().ok_or(SinkError::Finalized)?;
        encoder.finish()?;
        fs::rename(&self.partial, &self.path)?;
        debug!("corpus '{}' packed at {}", corpus_name, self.path.display());
        Ok(())
    }
}
