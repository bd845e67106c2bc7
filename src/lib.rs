//! stackpair: StackExchange Dump to Question-Answer Corpus Builder
//!
//! Turns archived Posts.xml dumps into plain-text corpora of ranked
//! question-answer pairs in a single bounded-memory pass, featuring:
//! - Streaming XML parsing of plain or bzip2-compressed dumps
//! - Incremental question-answer join keyed on declared answer counts
//! - Score-ranked answer selection with an acceptance override
//! - HTML to text conversion tuned for code-heavy posts
//! - Directory, zip archive, and zstd JSON lines corpus containers
//! - Site catalog lookup and dump download from archive.org

pub mod catalog;
pub mod config;
pub mod fetch;
pub mod pair;
pub mod posts;
pub mod sink;
pub mod text;

pub use config::Config;
pub use pair::{PairCoordinator, PairCoordinatorBuilder, PairReport};
