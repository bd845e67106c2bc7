//! Directory sink: one text file per record.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use super::{CorpusSink, SinkError};
use crate::pair::render::OutputRecord;

pub struct DirSink {
    dir: PathBuf,
}

impl DirSink {
    pub fn create(dir: PathBuf) -> Result<Self, SinkError> {
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }
}

impl CorpusSink for DirSink {
    fn write(&mut self, record: &OutputRecord, text: &str) -> Result<(), SinkError> {
        fs::write(self.dir.join(&record.name), text)?;
        Ok(())
    }

    fn finalize(&mut self, corpus_name: &str) -> Result<(), SinkError> {
        debug!("corpus '{}' written to {}", corpus_name, self.dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> OutputRecord {
        OutputRecord {
            name: name.to_string(),
            tags: vec!["rust".to_string()],
            title_text: "t".to_string(),
            question_text: "q".to_string(),
            answers_text: vec!["a".to_string()],
            answer_scores: vec![5],
            non_answer_text: Vec::new(),
            non_answer_scores: Vec::new(),
        }
    }

    #[test]
    fn test_writes_named_files() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut sink = DirSink::create(tmp.path().join("corpus")).expect("create sink");

        sink.write(&record("site_0000000001.txt"), "Q:\n\nbody\n\n")
            .expect("write");
        sink.finalize("site").expect("finalize");

        let written = std::fs::read_to_string(tmp.path().join("corpus/site_0000000001.txt"))
            .expect("read back");
        assert_eq!(written, "Q:\n\nbody\n\n");
    }
}
