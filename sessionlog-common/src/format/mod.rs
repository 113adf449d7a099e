//! Session log wire format
//!
//! A session log is a fixed metadata block followed by newline-delimited
//! JSON event records:
//!
//! ```text
//! #SESSION {                      <- line 1, starts with the marker
//!   "SessionName": "S1",
//!   "SceneName": "Forest"
//! }
//!                                 <- padded to exactly 11 lines
//! {"StimulusType":1}              <- line 12+, one event per line
//! {"FeatureName":"gaze"}
//! ```
//!
//! The split is positional: the first [`METADATA_LINE_COUNT`] lines are the
//! metadata block regardless of what they contain.

mod event;
mod metadata;

pub use event::{parse_event, EventParseError, EventRecord};
pub use metadata::{parse_metadata, Metadata};

/// Marker token that starts every session log
pub const SESSION_MARKER: &str = "#SESSION";

/// Number of lines in the metadata block
pub const METADATA_LINE_COUNT: usize = 11;

/// Wire format revision for the marker + 11-line header layout
pub const FORMAT_VERSION: u32 = 1;

/// Line terminator used when content is reassembled
pub const LINE_TERMINATOR: &str = "\n";

/// Raw content split into its metadata block and event lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitContent<'a> {
    /// Up to [`METADATA_LINE_COUNT`] lines, verbatim
    pub metadata_lines: Vec<&'a str>,
    /// Remaining lines with blank lines removed
    pub event_lines: Vec<&'a str>,
}

impl SplitContent<'_> {
    /// True when the content carried a full metadata block
    pub fn has_complete_metadata(&self) -> bool {
        self.metadata_lines.len() == METADATA_LINE_COUNT
    }
}

/// Check that the upload starts with the session marker
///
/// Leading whitespace is ignored.
pub fn has_marker(raw: &str) -> bool {
    raw.trim_start().starts_with(SESSION_MARKER)
}

/// Split raw content by line terminator into metadata and event lines
///
/// A trailing `\r` is removed from every line so CRLF uploads split the
/// same way as LF uploads.
pub fn split(raw: &str) -> SplitContent<'_> {
    let mut lines = raw
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line));

    let metadata_lines: Vec<&str> = lines.by_ref().take(METADATA_LINE_COUNT).collect();
    let event_lines: Vec<&str> = lines.filter(|line| !line.trim().is_empty()).collect();

    SplitContent {
        metadata_lines,
        event_lines,
    }
}

/// Join lines back into content
pub fn join_lines<S: AsRef<str>>(lines: &[S]) -> String {
    lines
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join(LINE_TERMINATOR)
}
