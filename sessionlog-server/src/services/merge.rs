//! Aggregate content merging
//!
//! Pure text operations. An aggregate's metadata block is written once, at
//! creation; every later merge only appends event lines after the lines
//! already present.

use sessionlog_common::format::{self, Metadata};
use sessionlog_common::{AggregateKind, Error, Result};

/// Append new event lines to an existing aggregate's content
///
/// The existing metadata block is kept byte-for-byte, blank lines between
/// existing events are dropped, and nothing is reordered.
pub fn append_events<S: AsRef<str>>(existing_content: &str, new_lines: &[S]) -> Result<String> {
    let existing = format::split(existing_content);
    if !existing.has_complete_metadata() {
        return Err(Error::Internal(format!(
            "Stored aggregate has a {}-line metadata block, expected {}",
            existing.metadata_lines.len(),
            format::METADATA_LINE_COUNT
        )));
    }

    let mut lines: Vec<&str> = Vec::with_capacity(
        existing.metadata_lines.len() + existing.event_lines.len() + new_lines.len(),
    );
    lines.extend(existing.metadata_lines.iter().copied());
    lines.extend(existing.event_lines.iter().copied());
    lines.extend(new_lines.iter().map(AsRef::as_ref));

    Ok(format::join_lines(&lines))
}

/// Build the content of a new aggregate
///
/// The triggering upload's metadata is copied with `SessionName` replaced
/// by the kind's discriminator, rendered as a full metadata block, and
/// followed by the (already filtered) event lines.
pub fn create_aggregate_content<S: AsRef<str>>(
    upload_metadata: &Metadata,
    kind: AggregateKind,
    new_lines: &[S],
) -> Result<String> {
    let mut lines = upload_metadata
        .with_session_name(kind.discriminator())
        .render()?;
    lines.extend(new_lines.iter().map(|line| line.as_ref().to_string()));

    Ok(format::join_lines(&lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessionlog_common::format::{parse_metadata, split, METADATA_LINE_COUNT};

    fn upload_metadata() -> Metadata {
        let mut lines = vec![
            "#SESSION {".to_string(),
            "  \"SessionName\": \"S1\",".to_string(),
            "  \"SceneName\": \"Forest\",".to_string(),
            "  \"Participant\": \"P7\"".to_string(),
            "}".to_string(),
        ];
        lines.resize(METADATA_LINE_COUNT, String::new());
        parse_metadata(&lines).unwrap()
    }

    #[test]
    fn test_create_overwrites_session_name_only() {
        let content = create_aggregate_content(
            &upload_metadata(),
            AggregateKind::StimulusType,
            &[r#"{"StimulusType":1}"#],
        )
        .unwrap();

        let parsed = split(&content);
        assert_eq!(parsed.metadata_lines.len(), METADATA_LINE_COUNT);
        assert_eq!(parsed.event_lines, vec![r#"{"StimulusType":1}"#]);

        let metadata = parse_metadata(&parsed.metadata_lines).unwrap();
        assert_eq!(metadata.session_name(), "#STIMULUSTYPESESSION");
        assert_eq!(metadata.scene_name(), Some("Forest"));
        assert_eq!(metadata.fields()["Participant"], "P7");
    }

    #[test]
    fn test_create_with_no_events() {
        let content = create_aggregate_content::<&str>(&upload_metadata(), AggregateKind::Scene, &[]).unwrap();
        let parsed = split(&content);
        assert!(parsed.has_complete_metadata());
        assert!(parsed.event_lines.is_empty());
    }

    #[test]
    fn test_append_keeps_header_and_order() {
        let created = create_aggregate_content(
            &upload_metadata(),
            AggregateKind::Scene,
            &["{\"a\":1}", "{\"a\":2}"],
        )
        .unwrap();

        let appended = append_events(&created, &["{\"a\":3}"]).unwrap();

        let before = split(&created);
        let after = split(&appended);
        assert_eq!(before.metadata_lines, after.metadata_lines);
        assert_eq!(after.event_lines, vec!["{\"a\":1}", "{\"a\":2}", "{\"a\":3}"]);
    }

    #[test]
    fn test_append_drops_blank_lines_between_events() {
        let created = create_aggregate_content(&upload_metadata(), AggregateKind::Scene, &["{\"a\":1}"]).unwrap();
        let with_gaps = format!("{}\n\n   \n{{\"a\":2}}\n\n", created);

        let appended = append_events(&with_gaps, &["{\"a\":3}"]).unwrap();
        assert_eq!(
            split(&appended).event_lines,
            vec!["{\"a\":1}", "{\"a\":2}", "{\"a\":3}"]
        );
        assert!(appended.ends_with("{\"a\":3}"));
    }

    #[test]
    fn test_append_nothing_is_identity_for_clean_content() {
        let created = create_aggregate_content(&upload_metadata(), AggregateKind::Scene, &["{\"a\":1}"]).unwrap();
        assert_eq!(append_events::<&str>(&created, &[]).unwrap(), created);
    }

    #[test]
    fn test_append_rejects_truncated_header() {
        let err = append_events("#SESSION {}\n{\"a\":1}", &["{\"a\":2}"]).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }
}
