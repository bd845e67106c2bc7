//! Drives a post stream through the pairing engine into a sink.

use thiserror::Error;
use tracing::{info, warn};

use super::engine::{PairStats, Pairer};
use super::progress::{BuildCounts, BuildProgress};
use super::render;
use super::source::{PostStream, SourceError};
use crate::posts::OpenQuestion;
use crate::sink::{CorpusSink, SinkError};
use crate::text;

#[derive(Debug, Error)]
pub enum PairError {
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
}

/// What one dump pass did.
#[derive(Debug, Clone)]
pub struct PairReport {
    pub stats: PairStats,
    pub counts: BuildCounts,
    /// Questions still resident when the stream ended.
    pub open_at_eof: usize,
}

/// One configured corpus build: a single pass over a single dump file.
pub struct PairCoordinator {
    source_name: String,
    min_score: i64,
    max_responses: usize,
    retain_below_threshold: bool,
    flush_incomplete_at_eof: bool,
    quiet: bool,
}

/// Builder for [`PairCoordinator`]. Defaults match the common corpus
/// settings: answers need a score of 3, at most 3 are rendered, and
/// incomplete questions are abandoned at end of stream.
pub struct PairCoordinatorBuilder {
    source_name: String,
    min_score: i64,
    max_responses: usize,
    retain_below_threshold: bool,
    flush_incomplete_at_eof: bool,
    quiet: bool,
}

impl PairCoordinatorBuilder {
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            min_score: 3,
            max_responses: 3,
            retain_below_threshold: true,
            flush_incomplete_at_eof: false,
            quiet: false,
        }
    }

    pub fn with_min_score(mut self, min_score: i64) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn with_max_responses(mut self, max_responses: usize) -> Self {
        self.max_responses = max_responses;
        self
    }

    pub fn with_retain_below_threshold(mut self, retain: bool) -> Self {
        self.retain_below_threshold = retain;
        self
    }

    pub fn with_flush_incomplete_at_eof(mut self, flush: bool) -> Self {
        self.flush_incomplete_at_eof = flush;
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn build(self) -> PairCoordinator {
        PairCoordinator {
            source_name: self.source_name,
            min_score: self.min_score,
            max_responses: self.max_responses,
            retain_below_threshold: self.retain_below_threshold,
            flush_incomplete_at_eof: self.flush_incomplete_at_eof,
            quiet: self.quiet,
        }
    }
}

impl PairCoordinator {
    /// Consume the stream to exhaustion, writing completed questions as they
    /// flush. Per-record failures are logged and skipped; only finalizing
    /// the sink can fail the whole run.
    pub fn run(
        &self,
        stream: PostStream,
        sink: &mut dyn CorpusSink,
    ) -> Result<PairReport, PairError> {
        let mut pairer = Pairer::new(self.min_score, self.retain_below_threshold);
        let progress = BuildProgress::new(self.quiet);

        for result in stream {
            match result {
                Ok(post) => {
                    progress.post_seen();
                    if let Some(question) = pairer.process(&post) {
                        self.write_pair(question, sink, &progress);
                    }
                }
                Err(SourceError::Attr(e)) => {
                    // One bad row; the reader is still in sync.
                    progress.parse_error();
                    warn!("skipping malformed row: {}", e);
                }
                Err(e) => {
                    // Reader state is unreliable past a document-level
                    // error; treat the rest of the file as truncated.
                    progress.parse_error();
                    warn!("dump unreadable past this point: {}", e);
                    break;
                }
            }
        }

        if self.flush_incomplete_at_eof {
            let stranded = pairer.drain_incomplete();
            if !stranded.is_empty() {
                info!(
                    "flushing {} incomplete questions at end of stream",
                    stranded.len()
                );
            }
            for question in stranded {
                self.write_pair(question, sink, &progress);
            }
        }

        sink.finalize(&self.source_name)?;
        progress.finish();

        let open_at_eof = pairer.open_count();
        let report = PairReport {
            stats: pairer.stats().clone(),
            counts: progress.counts(),
            open_at_eof,
        };
        if !self.quiet {
            progress.print_summary(&report.stats, open_at_eof);
        }
        Ok(report)
    }

    /// Render and store one completed question. A failed write gets one
    /// retry with scrubbed text; a second failure drops the record and the
    /// run moves on.
    fn write_pair(
        &self,
        question: OpenQuestion,
        sink: &mut dyn CorpusSink,
        progress: &BuildProgress,
    ) {
        // Questions whose answers all fell below threshold produce no pair.
        if question.answers.is_empty() {
            progress.empty_skipped();
            return;
        }

        let rendered = render::render_question(question, &self.source_name, self.max_responses);
        if rendered.truncated > 0 {
            progress.answers_truncated(rendered.truncated);
        }

        match sink.write(&rendered.record, &rendered.text) {
            Ok(()) => progress.pair_written(),
            Err(first) => {
                let record = rendered.record.sanitized();
                let clean_text = text::sanitize(&rendered.text);
                match sink.write(&record, &clean_text) {
                    Ok(()) => {
                        warn!(
                            "record '{}' written after scrubbing: {}",
                            record.name, first
                        );
                        progress.pair_written();
                    }
                    Err(retry) => {
                        warn!(
                            "dropping record '{}': {} (retry failed: {})",
                            rendered.record.name, first, retry
                        );
                        progress.write_failed();
                    }
                }
            }
        }
    }
}
