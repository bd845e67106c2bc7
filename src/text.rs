//! Plain-text extraction and cleanup for post bodies.
//!
//! Post bodies in the dumps are HTML fragments. [`strip_markup`] walks the
//! parsed fragment and emits readable plain text, keeping the contents of
//! `<pre>` blocks verbatim so code samples survive with their indentation
//! intact.

use std::sync::OnceLock;

use ego_tree::NodeRef;
use regex_lite::Regex;
use scraper::{Html, Node};

static RE_NEWLINE_RUNS: OnceLock<Regex> = OnceLock::new();

/// Check if a node has a `<pre>` ancestor.
///
/// Only `<pre>` marks a verbatim subtree. Inline `<code>` flows with the
/// surrounding sentence; code blocks arrive as `<pre><code>` anyway.
fn has_pre_ancestor(node: &NodeRef<Node>) -> bool {
    let mut current = node.parent();
    while let Some(parent) = current {
        if let Some(elem) = parent.value().as_element() {
            if elem.name() == "pre" {
                return true;
            }
        }
        current = parent.parent();
    }
    false
}

/// Extract plain text from an HTML fragment.
///
/// Block-level elements become paragraph breaks, list items become `- `
/// bullets and preformatted content is copied through untouched. Malformed
/// markup never fails; the parser recovers and we emit whatever text is
/// there.
pub fn strip_markup(html: &str) -> String {
    let fragment = Html::parse_fragment(html);

    let mut text = String::new();
    let mut last_was_block = false;

    for node in fragment.root_element().descendants() {
        if let Some(text_node) = node.value().as_text() {
            let in_pre = has_pre_ancestor(&node);
            let t = if in_pre {
                text_node.to_string()
            } else {
                text_node.trim().to_string()
            };
            if !t.is_empty() {
                if last_was_block && !text.is_empty() {
                    text.push('\n');
                } else if !text.is_empty()
                    && !in_pre
                    && !text.ends_with('\n')
                    && !text.ends_with(' ')
                {
                    text.push(' ');
                }
                text.push_str(&t);
                last_was_block = false;
            }
        } else if let Some(elem) = node.value().as_element() {
            match elem.name() {
                // Paragraph-like blocks get a blank line before them
                "p" | "blockquote" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "pre" => {
                    if !text.is_empty() {
                        text.push_str("\n\n");
                    }
                    last_was_block = false;
                }
                "li" => {
                    text.push('\n');
                    text.push_str("- ");
                    last_was_block = false;
                }
                "div" | "br" | "tr" | "ul" | "ol" | "table" | "hr" => {
                    last_was_block = true;
                }
                _ => {}
            }
        }
    }

    collapse_newlines(text.trim())
}

/// Collapse runs of three or more newlines down to exactly two.
///
/// Idempotent: applying it twice gives the same string as applying it once.
pub fn collapse_newlines(text: &str) -> String {
    let re = RE_NEWLINE_RUNS.get_or_init(|| Regex::new(r"\n{3,}").unwrap());
    re.replace_all(text, "\n\n").into_owned()
}

/// Scrub control characters out of a string, keeping newlines and tabs.
///
/// Used as the one-shot retry when a sink rejects a rendered record; dump
/// attributes occasionally smuggle in stray control bytes.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| matches!(c, '\n' | '\t') || !c.is_control())
        .collect()
}
