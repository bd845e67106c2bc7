//! Post records and the classifiers that route them.
//!
//! A dump row arrives as a flat attribute map ([`RawPost`]). The predicates
//! here decide whether a row is a question or an answer and whether a
//! question is worth tracking at all; the `from_raw` constructors project a
//! raw row down to the few fields the pairing engine keeps in memory.

use std::collections::HashMap;

/// `PostTypeId` value marking a question row.
const QUESTION_TYPE_ID: &str = "1";
/// `PostTypeId` value marking an answer row.
const ANSWER_TYPE_ID: &str = "2";

/// One row of a Posts dump: an immutable flat mapping of attribute name to
/// string value. Lookups of absent attributes return `None` rather than
/// erroring; absence is an ordinary state for dump data.
#[derive(Debug, Clone, Default)]
pub struct RawPost {
    fields: HashMap<String, String>,
}

impl RawPost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// The two row kinds the pipeline cares about. Everything else in a dump
/// (wiki excerpts, tag wikis, moderator nominations) is `Other` and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    Question,
    Answer,
    Other,
}

impl PostKind {
    pub fn of(post: &RawPost) -> Self {
        if is_question(post) {
            PostKind::Question
        } else if is_answer(post) {
            PostKind::Answer
        } else {
            PostKind::Other
        }
    }
}

pub fn is_question(post: &RawPost) -> bool {
    post.get("PostTypeId") == Some(QUESTION_TYPE_ID)
}

pub fn is_answer(post: &RawPost) -> bool {
    post.get("PostTypeId") == Some(ANSWER_TYPE_ID)
}

/// True iff the question declares a nonzero answer count.
///
/// Questions with a declared count of zero have nothing to pair with and are
/// dropped at ingestion. A question with no `AnswerCount` attribute at all is
/// a different case: see [`OpenQuestion::from_raw`].
pub fn has_answers(post: &RawPost) -> bool {
    post.get("AnswerCount")
        .and_then(|raw| raw.parse::<i64>().ok())
        .is_some_and(|count| count != 0)
}

/// True iff the question declares an accepted answer and it is this one.
pub fn is_accepted_answer(answer: &RawPost, question: &OpenQuestion) -> bool {
    match (question.accepted_answer_id.as_deref(), answer.get("Id")) {
        (Some(accepted), Some(id)) => accepted == id,
        _ => false,
    }
}

/// Split a raw `Tags` attribute into individual tags.
///
/// Older dumps write `&lt;python&gt;&lt;django&gt;` (angle brackets after
/// unescaping), newer ones write `|python|django|`.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let separators: &[char] = if raw.contains('<') { &['<', '>'] } else { &['|'] };
    raw.split(separators)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// The minimal projection of an answer row: identity, body, score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    pub id: String,
    pub body: String,
    pub score: i64,
}

impl AnswerRecord {
    /// Trim an answer row down to the retained fields.
    ///
    /// Returns `None` when the row is unusable: no id, no body, or a score
    /// that does not parse. Such rows are skipped before they can count
    /// toward their question's completion.
    pub fn from_raw(post: &RawPost) -> Option<Self> {
        let id = post.get("Id")?.to_string();
        let body = post.get("Body")?.to_string();
        let score = post.get("Score")?.parse::<i64>().ok()?;
        Some(Self { id, body, score })
    }
}

/// A question resident in the pairing engine's open table.
///
/// Created when its row is ingested, mutated only by answer arrivals, and
/// removed exactly once when `parsed_answers` reaches the declared count.
#[derive(Debug, Clone)]
pub struct OpenQuestion {
    pub id: String,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub accepted_answer_id: Option<String>,
    /// Expected number of answer arrivals before this question is complete.
    /// `None` when the row had no `AnswerCount` attribute; such a question
    /// collects answers forever and is only ever flushed by an explicit
    /// end-of-stream drain.
    pub declared_answer_count: Option<i64>,
    /// Answer arrivals observed so far, admitted or not.
    pub parsed_answers: i64,
    /// Admitted answers in arrival order.
    pub answers: Vec<AnswerRecord>,
    /// Below-threshold answers retained for the alternate output fields.
    pub non_answers: Vec<AnswerRecord>,
}

impl OpenQuestion {
    /// Trim a question row down to the retained fields.
    ///
    /// Returns `None` when the row should not be tracked: no id, or an
    /// `AnswerCount` that is present but zero or unparseable. A missing
    /// `AnswerCount` is kept as `declared_answer_count = None`.
    pub fn from_raw(post: &RawPost) -> Option<Self> {
        let id = post.get("Id")?.to_string();
        let declared_answer_count = match post.get("AnswerCount") {
            Some(_) if !has_answers(post) => return None,
            Some(raw) => raw.parse::<i64>().ok(),
            None => None,
        };
        Some(Self {
            id,
            title: post.get("Title").unwrap_or_default().to_string(),
            body: post.get("Body").unwrap_or_default().to_string(),
            tags: post.get("Tags").map(parse_tags).unwrap_or_default(),
            accepted_answer_id: post.get("AcceptedAnswerId").map(str::to_string),
            declared_answer_count,
            parsed_answers: 0,
            answers: Vec::new(),
            non_answers: Vec::new(),
        })
    }
}
