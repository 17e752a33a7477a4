//! JSON format implementation
//!
//! The document tree in the shape rich-text editors exchange:
//! `{"type": "heading", "attrs": {"level": 2}, "content": [...]}`.
//! Parsing goes through the schema's validating constructors, so a JSON tree that
//! breaks a content rule is rejected instead of producing an invalid document.
//!
//! Parameters: `pretty` (`true` by default).

use crate::error::FormatError;
use crate::format::Format;
use crate::schema::Document;
use std::collections::HashMap;

/// Format implementation for the JSON tree
pub struct JsonFormat;

pub fn serialize_to_json(doc: &Document, pretty: bool) -> Result<String, FormatError> {
    let result = if pretty {
        serde_json::to_string_pretty(doc)
    } else {
        serde_json::to_string(doc)
    };
    result.map_err(|err| FormatError::SerializationError(err.to_string()))
}

pub fn parse_from_json(source: &str) -> Result<Document, FormatError> {
    serde_json::from_str(source).map_err(|err| FormatError::ParseError(err.to_string()))
}

impl Format for JsonFormat {
    fn name(&self) -> &str {
        "json"
    }

    fn description(&self) -> &str {
        "Document tree as JSON"
    }

    fn file_extensions(&self) -> &[&str] {
        &["json"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str) -> Result<Document, FormatError> {
        parse_from_json(source)
    }

    fn serialize(&self, doc: &Document) -> Result<String, FormatError> {
        serialize_to_json(doc, true)
    }

    fn serialize_with_options(
        &self,
        doc: &Document,
        options: &HashMap<String, String>,
    ) -> Result<String, FormatError> {
        let mut pretty = true;
        for (key, value) in options {
            match key.as_str() {
                "pretty" => pretty = value != "false",
                other => {
                    return Err(FormatError::NotSupported(format!(
                        "Format 'json' does not support parameter '{other}'"
                    )))
                }
            }
        }
        serialize_to_json(doc, pretty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::markdown::parse_markdown;

    #[test]
    fn test_compact_output() {
        let doc = parse_markdown("- [x] done\n");
        let mut options = HashMap::new();
        options.insert("pretty".to_string(), "false".to_string());
        let json = JsonFormat.serialize_with_options(&doc, &options).unwrap();
        assert_eq!(
            json,
            r#"{"type":"doc","content":[{"type":"task_list","content":[{"type":"task_item","attrs":{"checked":true},"content":[{"type":"paragraph","content":[{"type":"text","text":"done"}]}]}]}]}"#
        );
    }

    #[test]
    fn test_parse_round_trip() {
        let doc = parse_markdown("# Title\n\n> quote with `code`\n");
        let json = JsonFormat.serialize(&doc).unwrap();
        assert_eq!(JsonFormat.parse(&json).unwrap(), doc);
    }

    #[test]
    fn test_invalid_tree_is_rejected() {
        let source = r#"{"type":"doc","content":[{"type":"task_list","content":[{"type":"paragraph"}]}]}"#;
        let err = JsonFormat.parse(source).unwrap_err();
        assert!(matches!(err, FormatError::ParseError(message) if message.contains("task_list")));
    }
}
