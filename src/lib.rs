//! stackslice: pull one user's answers out of a Stack Exchange data dump
//!
//! - Streaming reads of `Posts.xml` / `PostHistory.xml` (optionally bzip2-compressed)
//! - Question titles joined to every answer and cached as CSV
//! - Question and answer bodies resolved as of the user's last touch

pub mod config;
pub mod extract;

pub use config::Config;
pub use extract::{ExtractError, ExtractStats, Pipeline, PipelineBuilder};
