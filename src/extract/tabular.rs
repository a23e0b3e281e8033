//! CSV artifacts with a fixed header row

use super::source::ExtractError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};
use std::path::Path;

/// Write `rows` to a CSV file, header first. The header is written even when there are no rows.
pub fn write_table<T: Serialize>(
    path: &Path,
    headers: &[&str],
    rows: &[T],
) -> Result<(), ExtractError> {
    let file = std::fs::File::create(path)?;
    write_table_to(file, headers, rows)
}

/// Write `rows` as CSV to any writer
pub fn write_table_to<W: Write, T: Serialize>(
    writer: W,
    headers: &[&str],
    rows: &[T],
) -> Result<(), ExtractError> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv.write_record(headers)?;
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush()?;

    Ok(())
}

/// Read every row of a CSV file whose header must equal `headers`
pub fn read_table<T: DeserializeOwned>(
    path: &Path,
    headers: &[&str],
) -> Result<Vec<T>, ExtractError> {
    let file = std::fs::File::open(path)?;
    read_table_from(file, headers).map_err(|e| match e {
        ExtractError::InvalidTable(msg) => {
            ExtractError::InvalidTable(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })
}

/// Read every row of CSV from any reader
pub fn read_table_from<R: Read, T: DeserializeOwned>(
    reader: R,
    headers: &[&str],
) -> Result<Vec<T>, ExtractError> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let found = csv.headers()?;
    if found.iter().ne(headers.iter().copied()) {
        return Err(ExtractError::InvalidTable(format!(
            "expected header {:?}, found {:?}",
            headers.join(","),
            found.iter().collect::<Vec<_>>().join(",")
        )));
    }

    let mut rows = Vec::new();
    for row in csv.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::source::PostOfInterest;

    fn sample_rows() -> Vec<PostOfInterest> {
        vec![
            PostOfInterest {
                question_post_id: "10".to_string(),
                question_title: "Why, \"exactly\"?".to_string(),
                answer_post_id: "20".to_string(),
                post_as_of_time: "2020-01-01T00:00:00.000".to_string(),
            },
            PostOfInterest {
                question_post_id: "11".to_string(),
                question_title: "Multi\nline".to_string(),
                answer_post_id: "21".to_string(),
                post_as_of_time: "2020-02-01T00:00:00.000".to_string(),
            },
        ]
    }

    #[test]
    fn test_header_written_first() {
        let mut out = Vec::new();
        write_table_to(&mut out, &PostOfInterest::HEADERS, &sample_rows()).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("QuestionPostId,QuestionTitle,AnswerPostId,PostAsOfTime\n"));
        assert!(text.contains("\"Why, \"\"exactly\"\"?\""));
    }

    #[test]
    fn test_empty_table_keeps_header() {
        let mut out = Vec::new();
        write_table_to::<_, PostOfInterest>(&mut out, &PostOfInterest::HEADERS, &[]).unwrap();

        let text = String::from_utf8(out.clone()).unwrap();
        assert_eq!(text, "QuestionPostId,QuestionTitle,AnswerPostId,PostAsOfTime\n");

        let rows: Vec<PostOfInterest> =
            read_table_from(out.as_slice(), &PostOfInterest::HEADERS).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_quoted_fields_survive_reload() {
        let mut out = Vec::new();
        write_table_to(&mut out, &PostOfInterest::HEADERS, &sample_rows()).unwrap();

        let rows: Vec<PostOfInterest> =
            read_table_from(out.as_slice(), &PostOfInterest::HEADERS).unwrap();
        assert_eq!(rows, sample_rows());
    }

    #[test]
    fn test_wrong_header_is_rejected() {
        let data = "Id,Title\n10,Why?\n";

        let result: Result<Vec<PostOfInterest>, _> =
            read_table_from(data.as_bytes(), &PostOfInterest::HEADERS);
        assert!(matches!(result, Err(ExtractError::InvalidTable(_))));
    }
}
