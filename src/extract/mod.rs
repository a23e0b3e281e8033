//! Extraction of one user's answers from a Stack Exchange data dump
//!
//! Reads `Posts.xml` and `PostHistory.xml` (plain or `.bz2`) and produces a CSV of
//! (question, answer) pairs with both bodies as they stood when the user last touched
//! the answer.
//!
//! # Example Usage
//!
//! ```no_run
//! use stackslice::extract::PipelineBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = PipelineBuilder::new("input")
//!     .with_user_id("263693")
//!     .with_quiet(true)
//!     .build()?;
//!
//! let stats = pipeline.run()?;
//! println!("Wrote {} records", stats.records_written);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//!   Posts.xml ──► answers (pass 1) ──► titles (pass 2) ──┐
//!                                                       ▼
//!                                        posts-of-interest.csv (cache)
//!                                                       │
//!   PostHistory.xml ──► bodies (pass 3) ◄───────────────┘
//!                          │
//!                          ▼
//!               stack-overflow-posts.csv
//! ```
//!
//! When the cache file exists, passes 1 and 2 are skipped entirely.

pub mod answers;
pub mod bodies;
pub mod cache;
pub mod dump;
pub mod pipeline;
pub mod progress;
pub mod source;
pub mod tabular;
pub mod titles;

// Re-export main types
pub use bodies::{BodyRevision, PostBodyHistory};
pub use cache::{Materialized, PostCache};
pub use dump::XmlRowSource;
pub use pipeline::{Pipeline, PipelineBuilder};
pub use progress::ScanProgress;
pub use source::{
    AnswerRecord, ExtractError, ExtractStats, PostOfInterest, RowSource, StackOverflowRecord,
    XmlRow,
};
