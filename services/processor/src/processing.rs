use crate::classifier::ProcessingMode;
use serde::de::IgnoredAny;
use serde::ser::{Error as _, SerializeMap};
use serde::{Deserialize, Serialize, Serializer};
use std::str::Utf8Error;
use tracing::debug;

/// Summary produced for image objects
///
/// No transformation happens here; the bytes are only measured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSummary {
    pub original_size: usize,
    pub format: String,
}

/// Statistics produced for text and JSON objects
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSummary {
    pub line_count: usize,
    pub word_count: usize,
    /// Length in UTF-16 code units
    pub char_count: usize,
    pub is_json: bool,
}

/// Result of content-specific processing for one object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    Image(ImageSummary),
    Text(TextSummary),
    Unsupported,
}

impl Serialize for ProcessingOutcome {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ProcessingOutcome::Image(summary) => summary.serialize(serializer),
            ProcessingOutcome::Text(summary) => summary.serialize(serializer),
            ProcessingOutcome::Unsupported => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("type", "unsupported")?;
                map.end()
            }
        }
    }
}

impl ProcessingOutcome {
    /// Outcome fields as a JSON object, for merging into persisted metadata
    pub fn to_fields(&self) -> Result<serde_json::Map<String, serde_json::Value>, serde_json::Error> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(serde_json::Error::custom(format!(
                "outcome serialized to a non-object: {other}"
            ))),
        }
    }
}

/// Run the processing branch selected by the classifier
pub fn process(
    mode: ProcessingMode,
    bytes: &[u8],
    content_type: Option<&str>,
) -> Result<ProcessingOutcome, Utf8Error> {
    match mode {
        ProcessingMode::Image => Ok(ProcessingOutcome::Image(process_image(
            bytes,
            content_type.unwrap_or_default(),
        ))),
        ProcessingMode::Text => process_text(bytes).map(ProcessingOutcome::Text),
        ProcessingMode::Unsupported => {
            debug!(content_type = ?content_type, "Unsupported content type, storing metadata only");
            Ok(ProcessingOutcome::Unsupported)
        }
    }
}

/// Measure an image; the format label is the MIME subtype
pub fn process_image(bytes: &[u8], content_type: &str) -> ImageSummary {
    let format = content_type.split('/').nth(1).unwrap_or_default();

    ImageSummary {
        original_size: bytes.len(),
        format: format.to_string(),
    }
}

/// Compute line, word and character statistics for UTF-8 text
pub fn process_text(bytes: &[u8]) -> Result<TextSummary, Utf8Error> {
    let content = std::str::from_utf8(bytes)?;

    Ok(TextSummary {
        line_count: content.split('\n').count(),
        word_count: content
            .split(is_word_separator)
            .filter(|word| !word.is_empty())
            .count(),
        char_count: content.encode_utf16().count(),
        is_json: is_json_document(content),
    })
}

fn is_word_separator(c: char) -> bool {
    // BOM is a separator, NEL is not
    (c.is_whitespace() && c != '\u{85}') || c == '\u{feff}'
}

/// Whether the whole string is one JSON document, at any nesting depth
fn is_json_document(content: &str) -> bool {
    let mut de = serde_json::Deserializer::from_str(content);
    de.disable_recursion_limit();
    let parsed = IgnoredAny::deserialize(serde_stacker::Deserializer::new(&mut de)).is_ok();
    parsed && de.end().is_ok()
}
