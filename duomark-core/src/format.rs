//! Format trait definition
//!
//! Every text representation the engine speaks (Markdown, HTML, JSON, tree views)
//! implements [`Format`]. The trait gives the registry and the CLI a uniform way to
//! parse text into a [`Document`] and to serialize a [`Document`] back out.

use crate::error::FormatError;
use crate::schema::Document;
use std::collections::HashMap;

/// Trait for document formats
///
/// Implementors provide conversion between a string representation and the
/// [`Document`] tree. Formats can support parsing, serialization, or both.
///
/// # Examples
///
/// ```ignore
/// struct Shout;
///
/// impl Format for Shout {
///     fn name(&self) -> &str {
///         "shout"
///     }
///
///     fn supports_serialization(&self) -> bool {
///         true
///     }
///
///     fn serialize(&self, doc: &Document) -> Result<String, FormatError> {
///         Ok(doc.root().text_content().to_uppercase())
///     }
/// }
/// ```
pub trait Format: Send + Sync {
    /// The name of this format (e.g., "markdown", "html")
    fn name(&self) -> &str;

    /// Optional description of this format
    fn description(&self) -> &str {
        ""
    }

    /// File extensions associated with this format, without the leading dot
    fn file_extensions(&self) -> &[&str] {
        &[]
    }

    /// Whether this format supports parsing (source → Document)
    fn supports_parsing(&self) -> bool {
        false
    }

    /// Whether this format supports serialization (Document → source)
    fn supports_serialization(&self) -> bool {
        false
    }

    /// Parse source text into a Document
    fn parse(&self, _source: &str) -> Result<Document, FormatError> {
        Err(FormatError::NotSupported(format!(
            "Format '{}' does not support parsing",
            self.name()
        )))
    }

    /// Serialize a Document into source text
    fn serialize(&self, _doc: &Document) -> Result<String, FormatError> {
        Err(FormatError::NotSupported(format!(
            "Format '{}' does not support serialization",
            self.name()
        )))
    }

    /// Serialize a Document with extra parameters.
    ///
    /// The default implementation only accepts an empty parameter map and delegates
    /// to [`Format::serialize`]. Formats with tunable output override it.
    fn serialize_with_options(
        &self,
        doc: &Document,
        options: &HashMap<String, String>,
    ) -> Result<String, FormatError> {
        if options.is_empty() {
            self.serialize(doc)
        } else {
            Err(FormatError::NotSupported(format!(
                "Format '{}' does not support extra parameters",
                self.name()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ReadOnly;

    impl Format for ReadOnly {
        fn name(&self) -> &str {
            "read-only"
        }
    }

    #[test]
    fn test_defaults_reject_everything() {
        let format = ReadOnly;
        assert!(!format.supports_parsing());
        assert!(!format.supports_serialization());
        assert_eq!(
            format.parse("x").unwrap_err(),
            FormatError::NotSupported("Format 'read-only' does not support parsing".into())
        );
        assert!(format.serialize(&Document::empty()).is_err());
    }

    #[test]
    fn test_options_require_override() {
        let mut options = HashMap::new();
        options.insert("anything".to_string(), "1".to_string());
        let err = ReadOnly
            .serialize_with_options(&Document::empty(), &options)
            .unwrap_err();
        assert!(err.to_string().contains("extra parameters"));
    }
}
