//! Core types and traits for the extraction pipeline

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Post type id of a question in the posts dump
pub const POST_TYPE_QUESTION: &str = "1";
/// Post type id of an answer in the posts dump
pub const POST_TYPE_ANSWER: &str = "2";

/// History type ids that carry a full post body: initial body, edit body, rollback body
pub const BODY_HISTORY_TYPES: [&str; 3] = ["2", "5", "8"];

/// An answer written by the target user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    /// Id of the answer post
    pub answer_post_id: String,
    /// Id of the question the answer belongs to
    pub question_post_id: String,
    /// Timestamp of the content state last touched by the target user
    pub as_of_time: String,
}

/// A cached (question, answer) pair; one row of the cache artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PostOfInterest {
    pub question_post_id: String,
    pub question_title: String,
    pub answer_post_id: String,
    pub post_as_of_time: String,
}

impl PostOfInterest {
    /// Column order of the cache artifact
    pub const HEADERS: [&'static str; 4] =
        ["QuestionPostId", "QuestionTitle", "AnswerPostId", "PostAsOfTime"];
}

/// One row of the final output artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StackOverflowRecord {
    pub question_post_id: String,
    pub question_title: String,
    pub answer_post_id: String,
    pub question_body: String,
    pub answer_body: String,
}

impl StackOverflowRecord {
    /// Column order of the output artifact
    pub const HEADERS: [&'static str; 5] = [
        "QuestionPostId",
        "QuestionTitle",
        "AnswerPostId",
        "QuestionBody",
        "AnswerBody",
    ];
}

/// A single `<row .../>` element read from a dump, with unescaped attribute values
#[derive(Debug, Clone, Default)]
pub struct XmlRow {
    /// 1-based position of the row within its dump
    pub ordinal: u64,
    /// Name of the dump the row came from (for diagnostics)
    pub source_name: String,
    attributes: HashMap<String, String>,
}

impl XmlRow {
    /// Create an empty row
    pub fn new(ordinal: u64, source_name: impl Into<String>) -> Self {
        Self {
            ordinal,
            source_name: source_name.into(),
            attributes: HashMap::new(),
        }
    }

    /// Set an attribute value
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert an attribute value, replacing any earlier one
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Look up an optional attribute
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Look up an attribute the record cannot be processed without
    pub fn require(&self, name: &str) -> Result<&str, ExtractError> {
        self.get(name).ok_or_else(|| ExtractError::MissingAttribute {
            source_name: self.source_name.clone(),
            row: self.ordinal,
            attribute: name.to_string(),
        })
    }

    /// Take ownership of a required attribute
    pub fn take(&mut self, name: &str) -> Result<String, ExtractError> {
        self.attributes
            .remove(name)
            .ok_or_else(|| ExtractError::MissingAttribute {
                source_name: self.source_name.clone(),
                row: self.ordinal,
                attribute: name.to_string(),
            })
    }
}

/// A forward-only sequence of dump rows
pub trait RowSource {
    /// Iterate over the remaining rows
    fn rows(&mut self) -> Box<dyn Iterator<Item = Result<XmlRow, ExtractError>> + '_>;

    /// Get the source name for display
    fn source_name(&self) -> &str;
}

/// Summary of one pipeline run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractStats {
    /// Answers by the target user (from the dump or the cache)
    pub answers_found: usize,
    /// Distinct questions those answers belong to
    pub questions_resolved: usize,
    /// Whether stages 1 and 2 were skipped because the cache existed
    pub cache_hit: bool,
    /// Rows read from the posts dump across both passes
    pub post_rows_scanned: u64,
    /// Rows read from the post history dump
    pub history_rows_scanned: u64,
    /// Body revisions recorded for posts of interest
    pub bodies_recorded: usize,
    /// Body revisions that overwrote an earlier one with the same timestamp
    pub duplicate_bodies: usize,
    /// Lookups that fell back to the earliest revision
    pub as_of_fallbacks: usize,
    /// Rows written to the output artifact
    pub records_written: usize,
    /// Wall time of the run in seconds
    pub elapsed_seconds: f64,
}

/// Errors that can occur during extraction
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    XmlParse(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid table: {0}")]
    InvalidTable(String),

    #[error("{source_name} row {row} is missing required attribute {attribute}")]
    MissingAttribute {
        source_name: String,
        row: u64,
        attribute: String,
    },

    #[error("No title found for question {question_id}")]
    MissingTitle { question_id: String },

    #[error("Post {post_id} does not have a body as of {as_of}")]
    MissingBody { post_id: String, as_of: String },

    #[error("Post {post_id} was never registered for body lookup")]
    UnknownPost { post_id: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<quick_xml::Error> for ExtractError {
    fn from(e: quick_xml::Error) -> Self {
        ExtractError::XmlParse(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for ExtractError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        ExtractError::XmlParse(e.to_string())
    }
}
