//! Metadata block parsing and rendering

use serde_json::{Map, Value};

use super::{METADATA_LINE_COUNT, SESSION_MARKER};
use crate::{Error, Result};

const SESSION_NAME_FIELD: &str = "SessionName";
const SCENE_NAME_FIELD: &str = "SceneName";

/// Parsed metadata header
///
/// Holds the full JSON object so fields other than `SessionName` and
/// `SceneName` survive a parse/render cycle in their original order.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    fields: Map<String, Value>,
}

impl Metadata {
    /// Build metadata from a JSON object, requiring a string `SessionName`
    pub fn from_fields(fields: Map<String, Value>) -> Result<Self> {
        match fields.get(SESSION_NAME_FIELD) {
            Some(Value::String(_)) => Ok(Self { fields }),
            Some(other) => Err(Error::Format(format!(
                "metadata {} must be a string, found {}",
                SESSION_NAME_FIELD, other
            ))),
            None => Err(Error::Format(format!(
                "metadata is missing {}",
                SESSION_NAME_FIELD
            ))),
        }
    }

    /// Value of `SessionName`
    pub fn session_name(&self) -> &str {
        self.fields
            .get(SESSION_NAME_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Value of `SceneName`, if it is a non-empty string
    pub fn scene_name(&self) -> Option<&str> {
        self.fields
            .get(SCENE_NAME_FIELD)
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
    }

    /// Copy of this metadata with `SessionName` replaced
    pub fn with_session_name(&self, session_name: &str) -> Self {
        let mut fields = self.fields.clone();
        fields.insert(
            SESSION_NAME_FIELD.to_string(),
            Value::String(session_name.to_string()),
        );
        Self { fields }
    }

    /// Underlying JSON object
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Render as a metadata block of exactly [`METADATA_LINE_COUNT`] lines
    ///
    /// Pretty-printed with the marker on line 1 and blank padding lines.
    /// Objects too large for the block fall back to a single compact line.
    pub fn render(&self) -> Result<Vec<String>> {
        let pretty = serde_json::to_string_pretty(&self.fields)
            .map_err(|e| Error::Internal(format!("Failed to serialize metadata: {}", e)))?;

        let mut lines: Vec<String> = format!("{} {}", SESSION_MARKER, pretty)
            .lines()
            .map(String::from)
            .collect();

        if lines.len() > METADATA_LINE_COUNT {
            let compact = serde_json::to_string(&self.fields)
                .map_err(|e| Error::Internal(format!("Failed to serialize metadata: {}", e)))?;
            lines = vec![format!("{} {}", SESSION_MARKER, compact)];
        }

        lines.resize(METADATA_LINE_COUNT, String::new());
        Ok(lines)
    }
}

/// Parse the metadata block
///
/// The marker is stripped from each line, the lines are joined and the
/// result must be a JSON object with a string `SessionName`.
pub fn parse_metadata<S: AsRef<str>>(metadata_lines: &[S]) -> Result<Metadata> {
    if metadata_lines.len() < METADATA_LINE_COUNT {
        return Err(Error::Format(format!(
            "metadata block has {} lines, expected {}",
            metadata_lines.len(),
            METADATA_LINE_COUNT
        )));
    }

    let json = metadata_lines
        .iter()
        .take(METADATA_LINE_COUNT)
        .map(|line| strip_marker(line.as_ref()))
        .collect::<Vec<&str>>()
        .join("\n");

    let value: Value = serde_json::from_str(&json)
        .map_err(|e| Error::Format(format!("metadata is not valid JSON: {}", e)))?;

    match value {
        Value::Object(fields) => Metadata::from_fields(fields),
        other => Err(Error::Format(format!(
            "metadata must be a JSON object, found {}",
            json_type_name(&other)
        ))),
    }
}

fn strip_marker(line: &str) -> &str {
    let trimmed = line.trim();
    trimmed
        .strip_prefix(SESSION_MARKER)
        .map(str::trim)
        .unwrap_or(trimmed)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
