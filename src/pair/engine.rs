//! The incremental question-answer join.
//!
//! One [`Pairer`] owns the table of open questions for a single dump pass.
//! Questions are inserted as their rows arrive; answers are matched to their
//! parent by `ParentId` and either admitted or retained; the moment a
//! question has seen as many answer arrivals as its row declared, it is
//! removed from the table and handed back to the caller for rendering. Each
//! question is flushed exactly once, and the table is the only per-pass
//! state, so memory stays bounded by the number of still-open questions.

use std::collections::HashMap;

use serde::Serialize;

use crate::posts::{self, AnswerRecord, OpenQuestion, PostKind, RawPost};

/// How an answer arrival was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The question's declared accepted answer; admitted regardless of score.
    Accepted,
    /// Score met the minimum; admitted.
    AboveThreshold,
    /// Score below the minimum; counted, and retained as a non-answer when
    /// the engine is configured to keep them.
    BelowThreshold,
    /// No open question matched the `ParentId`; dropped.
    Orphan,
    /// Unusable row (missing id, body or score); skipped without counting
    /// toward any question's completion.
    Malformed,
}

/// Counters for one dump pass. Zeroed at construction, read at end of run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PairStats {
    /// Every row seen, regardless of kind.
    pub posts: usize,
    /// Question rows seen.
    pub questions: usize,
    /// Answer rows seen.
    pub answers: usize,
    /// Questions dropped at ingestion (zero or unusable answer count).
    pub questions_discarded: usize,
    /// Answers dropped as orphans plus answers that scored below threshold.
    pub answers_discarded: usize,
    /// Answers skipped as unusable before admission.
    pub answers_malformed: usize,
    /// Below-threshold answers kept in the non-answer set.
    pub answers_retained: usize,
    /// Questions flushed after reaching their declared count.
    pub questions_completed: usize,
}

/// The streaming join engine.
pub struct Pairer {
    open: HashMap<String, OpenQuestion>,
    min_score: i64,
    retain_below_threshold: bool,
    stats: PairStats,
}

impl Pairer {
    pub fn new(min_score: i64, retain_below_threshold: bool) -> Self {
        Self {
            open: HashMap::new(),
            min_score,
            retain_below_threshold,
            stats: PairStats::default(),
        }
    }

    /// Route one row through the join.
    ///
    /// Returns the completed question when this row was the answer that
    /// fulfilled its parent's declared count.
    pub fn process(&mut self, post: &RawPost) -> Option<OpenQuestion> {
        self.stats.posts += 1;
        match PostKind::of(post) {
            PostKind::Question => {
                self.stats.questions += 1;
                self.ingest_question(post);
                None
            }
            PostKind::Answer => {
                self.stats.answers += 1;
                let parent_id = post.get("ParentId").map(str::to_string);
                match self.add_answer(post) {
                    Admission::Accepted
                    | Admission::AboveThreshold
                    | Admission::BelowThreshold => {
                        parent_id.and_then(|id| self.check_complete(&id))
                    }
                    Admission::Orphan | Admission::Malformed => None,
                }
            }
            PostKind::Other => None,
        }
    }

    /// Insert a question into the open table, or discard it when its row
    /// declares nothing to pair with. Ids are assumed unique in the stream;
    /// a duplicate id simply replaces the stale entry.
    pub fn ingest_question(&mut self, post: &RawPost) {
        match OpenQuestion::from_raw(post) {
            Some(question) => {
                self.open.insert(question.id.clone(), question);
            }
            None => {
                tracing::debug!(
                    "discarding question '{}' with nothing to pair",
                    post.get("Id").unwrap_or("?")
                );
                self.stats.questions_discarded += 1;
            }
        }
    }

    /// Attach an answer to its open parent question.
    ///
    /// Every admission outcome except [`Admission::Malformed`] and
    /// [`Admission::Orphan`] bumps the parent's `parsed_answers` by exactly
    /// one; the caller must follow up with [`Pairer::check_complete`].
    pub fn add_answer(&mut self, post: &RawPost) -> Admission {
        let parent_id = match post.get("ParentId") {
            Some(id) => id,
            None => {
                self.stats.answers_discarded += 1;
                return Admission::Orphan;
            }
        };
        let question = match self.open.get_mut(parent_id) {
            Some(question) => question,
            None => {
                tracing::debug!("dropping answer to question '{}' not in the table", parent_id);
                self.stats.answers_discarded += 1;
                return Admission::Orphan;
            }
        };

        let accepted = posts::is_accepted_answer(post, question);
        let answer = match AnswerRecord::from_raw(post) {
            Some(answer) => answer,
            None => {
                tracing::debug!(
                    "skipping unusable answer '{}' to question '{}'",
                    post.get("Id").unwrap_or("?"),
                    parent_id
                );
                self.stats.answers_malformed += 1;
                return Admission::Malformed;
            }
        };

        question.parsed_answers += 1;
        if accepted {
            question.answers.push(answer);
            Admission::Accepted
        } else if answer.score >= self.min_score {
            question.answers.push(answer);
            Admission::AboveThreshold
        } else {
            // Counted as discarded for reporting even when retained.
            self.stats.answers_discarded += 1;
            if self.retain_below_threshold {
                question.non_answers.push(answer);
                self.stats.answers_retained += 1;
            }
            Admission::BelowThreshold
        }
    }

    /// Remove and return the question iff it has reached its declared answer
    /// count. Safe to call for ids that are absent or already flushed.
    pub fn check_complete(&mut self, parent_id: &str) -> Option<OpenQuestion> {
        let complete = self
            .open
            .get(parent_id)
            .is_some_and(|q| q.declared_answer_count == Some(q.parsed_answers));
        if complete {
            self.stats.questions_completed += 1;
            self.open.remove(parent_id)
        } else {
            None
        }
    }

    /// Remove every still-open question, ordered by id for deterministic
    /// output. Used by the optional end-of-stream flush.
    pub fn drain_incomplete(&mut self) -> Vec<OpenQuestion> {
        let mut stranded: Vec<OpenQuestion> = self.open.drain().map(|(_, q)| q).collect();
        stranded.sort_by(|a, b| a.id.cmp(&b.id));
        stranded
    }

    /// Number of questions still waiting for answers.
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    pub fn stats(&self) -> &PairStats {
        &self.stats
    }
}
