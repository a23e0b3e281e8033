//! Stage 1: find the answers written by the target user

use super::progress::ScanProgress;
use super::source::{AnswerRecord, ExtractError, RowSource, XmlRow, POST_TYPE_ANSWER};
use tracing::info;

/// Attributes of the posts dump read by stages 1 and 2
pub const POST_ATTRIBUTES: [&str; 8] = [
    "PostTypeId",
    "OwnerUserId",
    "Id",
    "ParentId",
    "LastEditorUserId",
    "LastEditDate",
    "CreationDate",
    "Title",
];

/// Scan the posts dump for answers owned by `user_id`.
///
/// The as-of time of each answer is its last edit date when the target user made
/// that edit, otherwise its creation date.
pub fn find_answers<S: RowSource + ?Sized>(
    source: &mut S,
    user_id: &str,
    progress: &ScanProgress,
) -> Result<Vec<AnswerRecord>, ExtractError> {
    let mut answers = Vec::new();

    for row in source.rows() {
        let row = row?;
        progress.row_scanned();

        if let Some(answer) = answer_by_user(&row, user_id)? {
            info!(
                "Found answer {} for question {} at {}.",
                answer.answer_post_id, answer.question_post_id, answer.as_of_time
            );
            progress.row_matched(&answer.answer_post_id);
            answers.push(answer);
        }
    }

    progress.finish();
    info!("Retrieved {} answers.", answers.len());

    Ok(answers)
}

/// Turn a post row into an answer record if it is an answer owned by `user_id`
fn answer_by_user(row: &XmlRow, user_id: &str) -> Result<Option<AnswerRecord>, ExtractError> {
    if row.require("PostTypeId")? != POST_TYPE_ANSWER {
        return Ok(None);
    }

    // Community-owned posts carry no owner
    if row.get("OwnerUserId") != Some(user_id) {
        return Ok(None);
    }

    let answer_post_id = row.require("Id")?.to_string();
    let question_post_id = row.require("ParentId")?.to_string();

    let as_of_time = if row.get("LastEditorUserId") == Some(user_id) {
        row.require("LastEditDate")?
    } else {
        row.require("CreationDate")?
    };

    Ok(Some(AnswerRecord {
        answer_post_id,
        question_post_id,
        as_of_time: as_of_time.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::dump::XmlRowSource;

    const USER: &str = "263693";

    const POSTS_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<posts>
  <row Id="10" PostTypeId="1" OwnerUserId="1" CreationDate="2019-12-30T00:00:00.000" Title="Why?" />
  <row Id="20" PostTypeId="2" ParentId="10" OwnerUserId="263693" CreationDate="2020-01-01T00:00:00.000" />
  <row Id="21" PostTypeId="2" ParentId="10" OwnerUserId="263693" CreationDate="2020-01-02T00:00:00.000" LastEditorUserId="263693" LastEditDate="2020-03-01T00:00:00.000" />
  <row Id="22" PostTypeId="2" ParentId="11" OwnerUserId="263693" CreationDate="2020-01-03T00:00:00.000" LastEditorUserId="5" LastEditDate="2020-04-01T00:00:00.000" />
  <row Id="23" PostTypeId="2" ParentId="10" OwnerUserId="5" CreationDate="2020-01-04T00:00:00.000" />
  <row Id="24" PostTypeId="2" ParentId="10" CreationDate="2020-01-05T00:00:00.000" />
</posts>
"#;

    fn run(xml: &str) -> Result<Vec<AnswerRecord>, ExtractError> {
        let mut source = XmlRowSource::from_xml_string("Posts.xml", xml);
        find_answers(&mut source, USER, &ScanProgress::hidden("answers"))
    }

    #[test]
    fn test_finds_only_answers_by_user() {
        let answers = run(POSTS_XML).unwrap();

        let ids: Vec<_> = answers.iter().map(|a| a.answer_post_id.as_str()).collect();
        assert_eq!(ids, vec!["20", "21", "22"]);
        assert_eq!(answers[0].question_post_id, "10");
        assert_eq!(answers[2].question_post_id, "11");
    }

    #[test]
    fn test_as_of_time_follows_last_editor() {
        let answers = run(POSTS_XML).unwrap();

        // Never edited: creation date
        assert_eq!(answers[0].as_of_time, "2020-01-01T00:00:00.000");
        // Last edited by the user: last edit date
        assert_eq!(answers[1].as_of_time, "2020-03-01T00:00:00.000");
        // Last edited by someone else: creation date
        assert_eq!(answers[2].as_of_time, "2020-01-03T00:00:00.000");
    }

    #[test]
    fn test_missing_post_type_is_fatal() {
        let xml = r#"<posts><row Id="1" OwnerUserId="263693" /></posts>"#;

        match run(xml) {
            Err(ExtractError::MissingAttribute { attribute, row, .. }) => {
                assert_eq!(attribute, "PostTypeId");
                assert_eq!(row, 1);
            }
            other => panic!("Expected MissingAttribute, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_parent_is_fatal_for_matching_answer() {
        let xml = r#"<posts>
  <row Id="1" PostTypeId="2" OwnerUserId="5" />
  <row Id="2" PostTypeId="2" OwnerUserId="263693" CreationDate="2020-01-01" />
</posts>"#;

        match run(xml) {
            Err(ExtractError::MissingAttribute { attribute, row, .. }) => {
                assert_eq!(attribute, "ParentId");
                assert_eq!(row, 2);
            }
            other => panic!("Expected MissingAttribute, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_last_edit_date_is_fatal_when_user_edited() {
        let xml = r#"<posts>
  <row Id="2" PostTypeId="2" ParentId="1" OwnerUserId="263693" LastEditorUserId="263693" CreationDate="2020-01-01" />
</posts>"#;

        assert!(matches!(
            run(xml),
            Err(ExtractError::MissingAttribute { ref attribute, .. }) if attribute == "LastEditDate"
        ));
    }
}
