//! Stage 4: resolve post bodies as of a point in time
//!
//! Every body revision of a post of interest is collected from the post history dump,
//! keyed by its creation timestamp. Timestamps are compared as strings; the dump's
//! `yyyy-MM-ddTHH:mm:ss.fff` format sorts chronologically.

use super::progress::ScanProgress;
use super::source::{
    ExtractError, PostOfInterest, RowSource, StackOverflowRecord, BODY_HISTORY_TYPES,
};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use tracing::{debug, info, warn};

/// Attributes of the post history dump read by the body scan
pub const HISTORY_ATTRIBUTES: [&str; 4] = ["PostId", "PostHistoryTypeId", "CreationDate", "Text"];

/// Body revisions of a fixed set of posts, ordered by timestamp
#[derive(Debug, Default)]
pub struct PostBodyHistory {
    bodies: HashMap<String, BTreeMap<String, String>>,
    recorded: usize,
    duplicates: usize,
}

/// A body picked for a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyRevision<'a> {
    /// Timestamp of the revision
    pub timestamp: &'a str,
    /// Full body text of the revision
    pub text: &'a str,
    /// True if no revision existed at the requested time and the earliest was used
    pub fell_back: bool,
}

impl PostBodyHistory {
    /// Track the given post ids; revisions of any other post are ignored
    pub fn with_post_ids<I, S>(post_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let bodies = post_ids
            .into_iter()
            .map(|id| (id.into(), BTreeMap::new()))
            .collect();

        Self {
            bodies,
            recorded: 0,
            duplicates: 0,
        }
    }

    /// Track both the question and the answer of every row
    pub fn for_posts(rows: &[PostOfInterest]) -> Self {
        Self::with_post_ids(rows.iter().flat_map(|row| {
            [row.question_post_id.as_str(), row.answer_post_id.as_str()]
        }))
    }

    /// Whether revisions of `post_id` are collected
    pub fn is_tracked(&self, post_id: &str) -> bool {
        self.bodies.contains_key(post_id)
    }

    /// Number of tracked posts
    pub fn post_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of distinct revisions held for `post_id`
    pub fn revision_count(&self, post_id: &str) -> usize {
        self.bodies.get(post_id).map(BTreeMap::len).unwrap_or(0)
    }

    /// Revisions recorded, including overwrites
    pub fn recorded(&self) -> usize {
        self.recorded
    }

    /// Revisions that replaced an earlier one with the same timestamp
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Record a body revision. Returns false if the post is not tracked.
    ///
    /// A second revision with the same timestamp replaces the first.
    pub fn record(&mut self, post_id: &str, timestamp: String, text: String) -> bool {
        let Some(revisions) = self.bodies.get_mut(post_id) else {
            return false;
        };

        if revisions.contains_key(&timestamp) {
            warn!(
                "Post {} has multiple bodies for {} - last in wins!",
                post_id, timestamp
            );
            self.duplicates += 1;
        }

        debug!("Found post body for {} at {}", post_id, timestamp);
        revisions.insert(timestamp, text);
        self.recorded += 1;
        true
    }

    /// The body of `post_id` as of `as_of`: the latest revision at or before `as_of`.
    ///
    /// If every revision is later than `as_of`, the earliest revision is returned and a
    /// warning is logged. A tracked post without any revision is an error.
    pub fn body_as_of(&self, post_id: &str, as_of: &str) -> Result<BodyRevision<'_>, ExtractError> {
        let revisions = self
            .bodies
            .get(post_id)
            .ok_or_else(|| ExtractError::UnknownPost {
                post_id: post_id.to_string(),
            })?;

        if let Some((timestamp, text)) = revisions
            .range::<str, _>((Bound::Unbounded, Bound::Included(as_of)))
            .next_back()
        {
            return Ok(BodyRevision {
                timestamp,
                text,
                fell_back: false,
            });
        }

        let Some((earliest, text)) = revisions.iter().next() else {
            return Err(ExtractError::MissingBody {
                post_id: post_id.to_string(),
                as_of: as_of.to_string(),
            });
        };

        warn!(
            "Post {} does not have a body as of {}; taking body from {}",
            post_id, as_of, earliest
        );
        Ok(BodyRevision {
            timestamp: earliest,
            text,
            fell_back: true,
        })
    }
}

/// Collect body revisions of every tracked post from the post history dump
pub fn scan_history<S: RowSource + ?Sized>(
    source: &mut S,
    history: &mut PostBodyHistory,
    progress: &ScanProgress,
) -> Result<(), ExtractError> {
    for row in source.rows() {
        let mut row = row?;
        progress.row_scanned();

        let post_id = row.take("PostId")?;
        if !history.is_tracked(&post_id) {
            continue;
        }

        let history_type = row.require("PostHistoryTypeId")?;
        if !BODY_HISTORY_TYPES.contains(&history_type) {
            continue;
        }

        let timestamp = row.take("CreationDate")?;
        let text = row.take("Text")?;

        progress.row_matched(&post_id);
        history.record(&post_id, timestamp, text);
    }

    progress.finish();
    info!(
        "Retrieved {} body revisions for {} posts.",
        history.recorded(),
        history.post_count()
    );

    Ok(())
}

/// Output rows plus how many lookups needed the earliest-revision fallback
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub records: Vec<StackOverflowRecord>,
    pub as_of_fallbacks: usize,
}

/// Resolve question and answer bodies for every row at the row's as-of time
pub fn resolve_records(
    rows: &[PostOfInterest],
    history: &PostBodyHistory,
) -> Result<Resolution, ExtractError> {
    let mut resolution = Resolution {
        records: Vec::with_capacity(rows.len()),
        as_of_fallbacks: 0,
    };

    for row in rows {
        let answer = history.body_as_of(&row.answer_post_id, &row.post_as_of_time)?;
        let question = history.body_as_of(&row.question_post_id, &row.post_as_of_time)?;

        resolution.as_of_fallbacks += usize::from(answer.fell_back) + usize::from(question.fell_back);
        resolution.records.push(StackOverflowRecord {
            question_post_id: row.question_post_id.clone(),
            question_title: row.question_title.clone(),
            answer_post_id: row.answer_post_id.clone(),
            question_body: question.text.to_string(),
            answer_body: answer.text.to_string(),
        });
    }

    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::dump::XmlRowSource;

    fn history_with(revisions: &[(&str, &str, &str)]) -> PostBodyHistory {
        let mut history = PostBodyHistory::with_post_ids(revisions.iter().map(|(id, _, _)| *id));
        for (id, ts, text) in revisions {
            history.record(id, ts.to_string(), text.to_string());
        }
        history
    }

    #[test]
    fn test_picks_latest_revision_at_or_before() {
        let history = history_with(&[
            ("20", "2020-01-01T00:00:00.000", "v1"),
            ("20", "2020-02-01T00:00:00.000", "v2"),
            ("20", "2020-03-01T00:00:00.000", "v3"),
        ]);

        let body = history.body_as_of("20", "2020-02-15T00:00:00.000").unwrap();
        assert_eq!(body.text, "v2");
        assert_eq!(body.timestamp, "2020-02-01T00:00:00.000");
        assert!(!body.fell_back);

        // Exact match is inclusive
        let body = history.body_as_of("20", "2020-03-01T00:00:00.000").unwrap();
        assert_eq!(body.text, "v3");

        let body = history.body_as_of("20", "2021-01-01T00:00:00.000").unwrap();
        assert_eq!(body.text, "v3");
    }

    #[test]
    fn test_falls_back_to_earliest_revision() {
        let history = history_with(&[
            ("20", "2020-03-01T00:00:00.000", "late"),
            ("20", "2020-02-01T00:00:00.000", "early"),
        ]);

        let body = history.body_as_of("20", "2019-01-01T00:00:00.000").unwrap();
        assert_eq!(body.text, "early");
        assert!(body.fell_back);
    }

    #[test]
    fn test_post_without_revisions_fails() {
        let history = PostBodyHistory::with_post_ids(["20"]);

        match history.body_as_of("20", "2020-01-01") {
            Err(ExtractError::MissingBody { post_id, as_of }) => {
                assert_eq!(post_id, "20");
                assert_eq!(as_of, "2020-01-01");
            }
            other => panic!("Expected MissingBody, got {:?}", other),
        }
    }

    #[test]
    fn test_untracked_post() {
        let mut history = PostBodyHistory::with_post_ids(["20"]);

        assert!(!history.record("99", "2020-01-01".to_string(), "x".to_string()));
        assert_eq!(history.recorded(), 0);
        assert!(matches!(
            history.body_as_of("99", "2020-01-01"),
            Err(ExtractError::UnknownPost { .. })
        ));
    }

    #[test]
    fn test_duplicate_timestamp_last_in_wins() {
        let history = history_with(&[
            ("20", "2020-01-01T00:00:00.000", "first"),
            ("20", "2020-01-01T00:00:00.000", "second"),
        ]);

        assert_eq!(history.revision_count("20"), 1);
        assert_eq!(history.duplicates(), 1);
        assert_eq!(history.recorded(), 2);
        assert_eq!(
            history.body_as_of("20", "2020-06-01").unwrap().text,
            "second"
        );
    }

    #[test]
    fn test_for_posts_tracks_questions_and_answers() {
        let rows = vec![
            PostOfInterest {
                question_post_id: "10".to_string(),
                question_title: "Why?".to_string(),
                answer_post_id: "20".to_string(),
                post_as_of_time: "2020-01-01".to_string(),
            },
            PostOfInterest {
                question_post_id: "10".to_string(),
                question_title: "Why?".to_string(),
                answer_post_id: "21".to_string(),
                post_as_of_time: "2020-01-02".to_string(),
            },
        ];

        let history = PostBodyHistory::for_posts(&rows);

        assert_eq!(history.post_count(), 3);
        assert!(history.is_tracked("10"));
        assert!(history.is_tracked("21"));
    }

    const HISTORY_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<posthistory>
  <row Id="1" PostHistoryTypeId="2" PostId="10" CreationDate="2019-12-31T00:00:00.000" Text="Q-body" />
  <row Id="2" PostHistoryTypeId="1" PostId="10" CreationDate="2019-12-31T00:00:00.000" Text="Why?" />
  <row Id="3" PostHistoryTypeId="2" PostId="20" CreationDate="2020-01-01T00:00:00.000" Text="A-body" />
  <row Id="4" PostHistoryTypeId="5" PostId="20" CreationDate="2020-02-01T00:00:00.000" Text="A-body edited" />
  <row Id="5" PostHistoryTypeId="8" PostId="20" CreationDate="2020-03-01T00:00:00.000" Text="A-body rolled back" />
  <row Id="6" PostHistoryTypeId="2" PostId="30" CreationDate="2020-01-01T00:00:00.000" Text="someone else" />
  <row Id="7" PostHistoryTypeId="10" PostId="20" CreationDate="2020-04-01T00:00:00.000" />
</posthistory>
"#;

    #[test]
    fn test_scan_collects_body_revisions_only() {
        let mut source = XmlRowSource::from_xml_string("PostHistory.xml", HISTORY_XML);
        let mut history = PostBodyHistory::with_post_ids(["10", "20"]);

        scan_history(&mut source, &mut history, &ScanProgress::hidden("bodies")).unwrap();

        assert_eq!(history.revision_count("10"), 1);
        assert_eq!(history.revision_count("20"), 3);
        assert!(!history.is_tracked("30"));
        assert_eq!(
            history.body_as_of("10", "2020-06-01").unwrap().text,
            "Q-body"
        );
        assert_eq!(
            history.body_as_of("20", "2020-02-15").unwrap().text,
            "A-body edited"
        );
    }

    #[test]
    fn test_scan_requires_text_on_body_revisions() {
        let xml = r#"<posthistory>
  <row PostHistoryTypeId="5" PostId="20" CreationDate="2020-01-01T00:00:00.000" />
</posthistory>"#;
        let mut source = XmlRowSource::from_xml_string("PostHistory.xml", xml);
        let mut history = PostBodyHistory::with_post_ids(["20"]);

        let result = scan_history(&mut source, &mut history, &ScanProgress::hidden("bodies"));
        assert!(matches!(
            result,
            Err(ExtractError::MissingAttribute { ref attribute, .. }) if attribute == "Text"
        ));
    }

    #[test]
    fn test_scan_requires_post_id_on_every_row() {
        let xml = r#"<posthistory><row PostHistoryTypeId="2" /></posthistory>"#;
        let mut source = XmlRowSource::from_xml_string("PostHistory.xml", xml);
        let mut history = PostBodyHistory::with_post_ids(["20"]);

        let result = scan_history(&mut source, &mut history, &ScanProgress::hidden("bodies"));
        assert!(matches!(
            result,
            Err(ExtractError::MissingAttribute { ref attribute, .. }) if attribute == "PostId"
        ));
    }

    #[test]
    fn test_resolve_uses_shared_as_of_time() {
        let history = history_with(&[
            ("10", "2019-12-31T00:00:00.000", "Q1"),
            ("10", "2020-01-15T00:00:00.000", "Q2"),
            ("20", "2020-01-01T00:00:00.000", "A1"),
            ("20", "2020-02-01T00:00:00.000", "A2"),
        ]);
        let rows = vec![PostOfInterest {
            question_post_id: "10".to_string(),
            question_title: "Why?".to_string(),
            answer_post_id: "20".to_string(),
            post_as_of_time: "2020-01-10T00:00:00.000".to_string(),
        }];

        let resolution = resolve_records(&rows, &history).unwrap();

        assert_eq!(resolution.as_of_fallbacks, 0);
        assert_eq!(
            resolution.records,
            vec![StackOverflowRecord {
                question_post_id: "10".to_string(),
                question_title: "Why?".to_string(),
                answer_post_id: "20".to_string(),
                question_body: "Q1".to_string(),
                answer_body: "A1".to_string(),
            }]
        );
    }

    #[test]
    fn test_resolve_counts_fallbacks() {
        let history = history_with(&[
            ("10", "2020-05-01T00:00:00.000", "Q"),
            ("20", "2020-01-01T00:00:00.000", "A"),
        ]);
        let rows = vec![PostOfInterest {
            question_post_id: "10".to_string(),
            question_title: "Why?".to_string(),
            answer_post_id: "20".to_string(),
            post_as_of_time: "2020-01-10T00:00:00.000".to_string(),
        }];

        let resolution = resolve_records(&rows, &history).unwrap();

        assert_eq!(resolution.as_of_fallbacks, 1);
        assert_eq!(resolution.records[0].question_body, "Q");
    }
}
