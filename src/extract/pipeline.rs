//! Pipeline that runs the four extraction stages in order

use super::answers::{find_answers, POST_ATTRIBUTES};
use super::bodies::{resolve_records, scan_history, PostBodyHistory, HISTORY_ATTRIBUTES};
use super::cache::PostCache;
use super::dump::XmlRowSource;
use super::progress::ScanProgress;
use super::source::{ExtractError, ExtractStats, PostOfInterest, StackOverflowRecord};
use super::tabular::write_table;
use super::titles::{join_posts_of_interest, resolve_titles};
use crate::config::ExtractConfig;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Extraction pipeline for one user over one dump directory
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Id of the user whose answers are extracted
    user_id: String,
    /// Posts dump
    posts_path: PathBuf,
    /// Post history dump
    history_path: PathBuf,
    /// Posts-of-interest cache
    cache: PostCache,
    /// Final output
    output_path: PathBuf,
    /// Delete the cache before running
    refresh: bool,
    /// Quiet mode
    quiet: bool,
}

impl Pipeline {
    /// Build a pipeline from the `[extract]` configuration section
    pub fn from_config(config: &ExtractConfig) -> Result<Self, ExtractError> {
        PipelineBuilder::new(&config.data_dir)
            .with_user_id(&config.user_id)
            .with_posts_file(&config.posts_file)
            .with_history_file(&config.history_file)
            .with_cache_file(&config.cache_file)
            .with_output_file(&config.output_file)
            .build()
    }

    /// Set quiet mode (no progress output)
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Delete the cache before running so stages 1 and 2 run again
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// Target user id
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The posts-of-interest cache
    pub fn cache(&self) -> &PostCache {
        &self.cache
    }

    /// Path of the final output
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Input files the next run will open. The posts dump is only needed without a cache.
    pub fn required_inputs(&self) -> Vec<&Path> {
        let mut inputs = Vec::with_capacity(2);
        if self.refresh || !self.cache.exists() {
            inputs.push(self.posts_path.as_path());
        }
        inputs.push(self.history_path.as_path());
        inputs
    }

    /// Run every stage and write the output file
    pub fn run(&self) -> Result<ExtractStats, ExtractError> {
        let start = Instant::now();
        let mut stats = ExtractStats::default();

        info!(
            "Extracting answers of user {} from {}",
            self.user_id,
            self.posts_path.display()
        );

        if self.refresh {
            self.cache.invalidate()?;
        }

        let materialized = self
            .cache
            .load_or_build(|| self.collect_posts_of_interest(&mut stats))?;
        let rows = materialized.rows;

        stats.cache_hit = materialized.cache_hit;
        stats.answers_found = rows.len();
        stats.questions_resolved = rows
            .iter()
            .map(|row| row.question_post_id.as_str())
            .collect::<HashSet<_>>()
            .len();

        let records = self.resolve_bodies(&rows, &mut stats)?;

        if let Some(parent) = self.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        write_table(&self.output_path, &StackOverflowRecord::HEADERS, &records)?;
        stats.records_written = records.len();
        stats.elapsed_seconds = start.elapsed().as_secs_f64();

        info!(
            "Wrote {} records to {}",
            stats.records_written,
            self.output_path.display()
        );
        info!("Done!");

        Ok(stats)
    }

    /// Stages 1 and 2: two passes over the posts dump, joined into cache rows
    fn collect_posts_of_interest(
        &self,
        stats: &mut ExtractStats,
    ) -> Result<Vec<PostOfInterest>, ExtractError> {
        let answers = {
            let mut source = self.open_posts()?;
            let progress = ScanProgress::new("answers", self.quiet);
            let answers = find_answers(&mut source, &self.user_id, &progress)?;
            stats.post_rows_scanned += progress.rows_scanned();
            answers
        };

        let titles = {
            let mut source = self.open_posts()?;
            let progress = ScanProgress::new("titles", self.quiet);
            let titles = resolve_titles(&mut source, &answers, &progress)?;
            stats.post_rows_scanned += progress.rows_scanned();
            titles
        };

        join_posts_of_interest(&answers, &titles)
    }

    /// Stage 4: collect body revisions and resolve each row at its as-of time
    fn resolve_bodies(
        &self,
        rows: &[PostOfInterest],
        stats: &mut ExtractStats,
    ) -> Result<Vec<StackOverflowRecord>, ExtractError> {
        let mut history = PostBodyHistory::for_posts(rows);

        let mut source = XmlRowSource::open(&self.history_path)?.with_attributes(&HISTORY_ATTRIBUTES);
        let progress = ScanProgress::new("bodies", self.quiet);
        scan_history(&mut source, &mut history, &progress)?;

        stats.history_rows_scanned = progress.rows_scanned();
        stats.bodies_recorded = history.recorded();
        stats.duplicate_bodies = history.duplicates();

        let resolution = resolve_records(rows, &history)?;
        stats.as_of_fallbacks = resolution.as_of_fallbacks;

        Ok(resolution.records)
    }

    fn open_posts(&self) -> Result<XmlRowSource, ExtractError> {
        Ok(XmlRowSource::open(&self.posts_path)?.with_attributes(&POST_ATTRIBUTES))
    }
}

/// Builder for [`Pipeline`] with the dump's conventional file names
pub struct PipelineBuilder {
    data_dir: PathBuf,
    user_id: Option<String>,
    posts_file: String,
    history_file: String,
    cache_file: String,
    output_file: String,
    quiet: bool,
}

impl PipelineBuilder {
    /// Create a new builder rooted at `data_dir`
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            user_id: None,
            posts_file: "Posts.xml".to_string(),
            history_file: "PostHistory.xml".to_string(),
            cache_file: "posts-of-interest.csv".to_string(),
            output_file: "stack-overflow-posts.csv".to_string(),
            quiet: false,
        }
    }

    /// Set the target user id
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the posts dump file name
    pub fn with_posts_file(mut self, name: impl Into<String>) -> Self {
        self.posts_file = name.into();
        self
    }

    /// Set the post history dump file name
    pub fn with_history_file(mut self, name: impl Into<String>) -> Self {
        self.history_file = name.into();
        self
    }

    /// Set the cache file name
    pub fn with_cache_file(mut self, name: impl Into<String>) -> Self {
        self.cache_file = name.into();
        self
    }

    /// Set the output file name
    pub fn with_output_file(mut self, name: impl Into<String>) -> Self {
        self.output_file = name.into();
        self
    }

    /// Set quiet mode
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Result<Pipeline, ExtractError> {
        let user_id = self
            .user_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                ExtractError::Config("A target user id is required. Call with_user_id() first.".into())
            })?;

        let cache_path = self.data_dir.join(&self.cache_file);
        let output_path = self.data_dir.join(&self.output_file);
        if cache_path == output_path {
            return Err(ExtractError::Config(format!(
                "cache and output must be different files, both are {}",
                cache_path.display()
            )));
        }

        Ok(Pipeline {
            user_id,
            posts_path: self.data_dir.join(&self.posts_file),
            history_path: self.data_dir.join(&self.history_file),
            cache: PostCache::new(cache_path),
            output_path,
            refresh: false,
            quiet: self.quiet,
        })
    }
}
