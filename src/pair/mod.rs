//! Streaming question-answer pairing.
//!
//! This is the core of the crate: a single forward pass over a Posts dump
//! that joins answers to their questions in bounded memory and emits each
//! completed question exactly once.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      PairCoordinator                       │
//! │            (per-record error policy, progress)             │
//! └────────────────────────────────────────────────────────────┘
//!        │                    │                        │
//!        ▼                    ▼                        ▼
//! ┌─────────────┐    ┌─────────────────┐    ┌──────────────────┐
//! │ PostStream  │    │     Pairer      │    │ render + sinks   │
//! │ xml / bz2   │ ─▶ │ open-question   │ ─▶ │ rank, truncate,  │
//! │ row events  │    │ table, admission│    │ name, store      │
//! └─────────────┘    └─────────────────┘    └──────────────────┘
//! ```
//!
//! Answers may arrive before their question is known or for questions that
//! were never kept; both are counted and dropped. A question flushes the
//! instant its observed answer arrivals equal the count its row declared.

pub mod coordinator;
pub mod engine;
pub mod progress;
pub mod render;
pub mod source;

pub use coordinator::{PairCoordinator, PairCoordinatorBuilder, PairError, PairReport};
pub use engine::{Admission, PairStats, Pairer};
pub use progress::{BuildCounts, BuildProgress};
pub use render::{output_name, render_question, OutputRecord, Rendered};
pub use source::{PostStream, SourceError};
