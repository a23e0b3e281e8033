//! Extraction target configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which user to extract and where the dump lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Id of the user whose answers are extracted
    pub user_id: String,
    /// Directory holding the dumps, the cache and the output
    pub data_dir: PathBuf,
    /// Posts dump (`.bz2` is decompressed on the fly)
    pub posts_file: String,
    /// Post history dump
    pub history_file: String,
    /// Posts-of-interest cache; delete it when the dumps change
    pub cache_file: String,
    /// Final output
    pub output_file: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            user_id: "263693".to_string(),
            data_dir: PathBuf::from("input"),
            posts_file: "Posts.xml".to_string(),
            history_file: "PostHistory.xml".to_string(),
            cache_file: "posts-of-interest.csv".to_string(),
            output_file: "stack-overflow-posts.csv".to_string(),
        }
    }
}
