//! Ranking, naming and rendering of completed questions.

use serde::Serialize;

use crate::posts::{AnswerRecord, OpenQuestion};
use crate::text;

/// A rendered question with its ranked answers, ready for a sink.
///
/// `answers_text`/`answer_scores` are parallel vectors ordered by score
/// descending, as are the non-answer fields. The non-answer fields carry
/// below-threshold answers plus any admitted answers cut by the response
/// cap; they are never mixed back into the primary set.
#[derive(Debug, Clone, Serialize)]
pub struct OutputRecord {
    pub name: String,
    pub tags: Vec<String>,
    pub title_text: String,
    pub question_text: String,
    pub answers_text: Vec<String>,
    pub answer_scores: Vec<i64>,
    pub non_answer_text: Vec<String>,
    pub non_answer_scores: Vec<i64>,
}

impl OutputRecord {
    /// Linear text form: question first, answers in rank order.
    pub fn flat_text(&self) -> String {
        let mut out = String::from("Q:\n\n");
        if !self.title_text.is_empty() {
            out.push_str(&self.title_text);
            out.push_str("\n\n");
        }
        if !self.question_text.is_empty() {
            out.push_str(&self.question_text);
            out.push_str("\n\n");
        }
        for answer in &self.answers_text {
            out.push_str("A:\n\n");
            out.push_str(answer);
            out.push_str("\n\n");
        }
        text::collapse_newlines(&out)
    }

    /// Copy of the record with control characters scrubbed from every text
    /// field, for the one-shot retry after a sink rejects a write.
    pub fn sanitized(&self) -> OutputRecord {
        OutputRecord {
            name: scrub_name(&self.name),
            tags: self.tags.clone(),
            title_text: text::sanitize(&self.title_text),
            question_text: text::sanitize(&self.question_text),
            answers_text: self.answers_text.iter().map(|t| text::sanitize(t)).collect(),
            answer_scores: self.answer_scores.clone(),
            non_answer_text: self
                .non_answer_text
                .iter()
                .map(|t| text::sanitize(t))
                .collect(),
            non_answer_scores: self.non_answer_scores.clone(),
        }
    }
}

/// Result of rendering one completed question.
pub struct Rendered {
    pub record: OutputRecord,
    /// The flat text form, precomputed once for sinks that store it.
    pub text: String,
    /// Admitted answers cut by the response cap.
    pub truncated: usize,
}

/// Rank, truncate and render a completed question.
///
/// Admitted answers are sorted by score descending with a stable sort, so
/// equal scores keep their arrival order and the output is deterministic
/// for a fixed input stream. The top `max_responses` stay in the primary
/// set; the rest join the non-answers.
pub fn render_question(question: OpenQuestion, source: &str, max_responses: usize) -> Rendered {
    let OpenQuestion {
        id,
        title,
        body,
        tags,
        mut answers,
        non_answers,
        ..
    } = question;

    answers.sort_by(|a, b| b.score.cmp(&a.score));
    let overflow = if answers.len() > max_responses {
        answers.split_off(max_responses)
    } else {
        Vec::new()
    };
    let truncated = overflow.len();

    let mut spares = overflow;
    spares.extend(non_answers);
    spares.sort_by(|a, b| b.score.cmp(&a.score));

    let name = output_name(source, &id, &tags);
    let title_text = text::strip_markup(&title);
    let question_text = text::strip_markup(&body);
    let (answers_text, answer_scores) = rendered_bodies(&answers);
    let (non_answer_text, non_answer_scores) = rendered_bodies(&spares);

    let record = OutputRecord {
        name,
        tags,
        title_text,
        question_text,
        answers_text,
        answer_scores,
        non_answer_text,
        non_answer_scores,
    };
    let text = record.flat_text();

    Rendered {
        record,
        text,
        truncated,
    }
}

fn rendered_bodies(answers: &[AnswerRecord]) -> (Vec<String>, Vec<i64>) {
    let mut texts = Vec::with_capacity(answers.len());
    let mut scores = Vec::with_capacity(answers.len());
    for answer in answers {
        texts.push(text::strip_markup(&answer.body));
        scores.push(answer.score);
    }
    (texts, scores)
}

/// Canonical output name: source, zero-padded question id, then the sorted
/// normalized tags. A pure function of its inputs, independent of the order
/// tags arrived in.
pub fn output_name(source: &str, question_id: &str, tags: &[String]) -> String {
    let tags = normalized_tags(tags);
    if tags.is_empty() {
        format!("{}_{:0>10}.txt", source, question_id)
    } else {
        format!("{}_{:0>10}_{}.txt", source, question_id, tags.join("_"))
    }
}

/// Lowercase, hyphens to underscores, alphabetical.
fn normalized_tags(tags: &[String]) -> Vec<String> {
    let mut tags: Vec<String> = tags
        .iter()
        .map(|tag| tag.to_lowercase().replace('-', "_"))
        .collect();
    tags.sort();
    tags
}

fn scrub_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_control() || c == '/' || c == '\\' {
                '_'
            } else {
                c
            }
        })
        .collect()
}
