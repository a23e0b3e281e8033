//! Stage 2: resolve the titles of the questions the answers belong to

use super::progress::ScanProgress;
use super::source::{
    AnswerRecord, ExtractError, PostOfInterest, RowSource, POST_TYPE_QUESTION,
};
use std::collections::HashMap;
use tracing::info;

/// Scan the posts dump for the titles of every question referenced by `answers`.
///
/// Fails with [`ExtractError::MissingTitle`] if any referenced question is never
/// seen among the question rows.
pub fn resolve_titles<S: RowSource + ?Sized>(
    source: &mut S,
    answers: &[AnswerRecord],
    progress: &ScanProgress,
) -> Result<HashMap<String, String>, ExtractError> {
    let mut titles: HashMap<String, Option<String>> = HashMap::with_capacity(answers.len());
    for answer in answers {
        titles.insert(answer.question_post_id.clone(), None);
    }

    for row in source.rows() {
        let row = row?;
        progress.row_scanned();

        if row.require("PostTypeId")? != POST_TYPE_QUESTION {
            continue;
        }

        let post_id = row.require("Id")?;
        let Some(slot) = titles.get_mut(post_id) else {
            continue;
        };

        let title = row.require("Title")?;
        info!("Found question title {} for question {}.", title, post_id);
        progress.row_matched(post_id);
        *slot = Some(title.to_string());
    }

    progress.finish();

    // Report the first gap in answer order so failures are reproducible
    let mut resolved = HashMap::with_capacity(titles.len());
    for answer in answers {
        let question_id = &answer.question_post_id;
        if resolved.contains_key(question_id) {
            continue;
        }
        match titles.remove(question_id).flatten() {
            Some(title) => {
                resolved.insert(question_id.clone(), title);
            }
            None => {
                return Err(ExtractError::MissingTitle {
                    question_id: question_id.clone(),
                })
            }
        }
    }

    info!("Retrieved {} questions.", resolved.len());
    Ok(resolved)
}

/// Join answers with their question titles, one row per answer
pub fn join_posts_of_interest(
    answers: &[AnswerRecord],
    titles: &HashMap<String, String>,
) -> Result<Vec<PostOfInterest>, ExtractError> {
    answers
        .iter()
        .map(|answer| {
            let title = titles.get(&answer.question_post_id).ok_or_else(|| {
                ExtractError::MissingTitle {
                    question_id: answer.question_post_id.clone(),
                }
            })?;
            Ok(PostOfInterest {
                question_post_id: answer.question_post_id.clone(),
                question_title: title.clone(),
                answer_post_id: answer.answer_post_id.clone(),
                post_as_of_time: answer.as_of_time.clone(),
            })
        })
        .collect()
}
