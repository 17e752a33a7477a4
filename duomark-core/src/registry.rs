//! Format registry
//!
//! Knows every format the engine can read or write, so the CLI and hosts can pick one
//! by name or by file extension. Formats are kept in name order, which is also the
//! order `list_formats` reports and the tie-break when two formats claim an extension.

use crate::capability::HtmlConversionOptions;
use crate::error::FormatError;
use crate::format::Format;
use crate::formats::{HtmlFormat, JsonFormat, MarkdownFormat, MarkdownRules, TreevizFormat};
use crate::schema::Document;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Named collection of [`Format`]s
///
/// ```ignore
/// let registry = FormatRegistry::default();
/// let doc = registry.parse("# Title\n", "markdown")?;
/// let html = registry.convert("# Title\n", "markdown", "html", &HashMap::new())?;
/// ```
pub struct FormatRegistry {
    formats: BTreeMap<String, Box<dyn Format>>,
}

impl FormatRegistry {
    /// A registry with nothing in it
    pub fn new() -> Self {
        FormatRegistry {
            formats: BTreeMap::new(),
        }
    }

    /// Add `format` under its own name. A later format with the same name wins.
    pub fn register<F: Format + 'static>(&mut self, format: F) {
        self.formats
            .insert(format.name().to_string(), Box::new(format));
    }

    pub fn get(&self, name: &str) -> Result<&dyn Format, FormatError> {
        match self.formats.get(name) {
            Some(format) => Ok(format.as_ref()),
            None => Err(FormatError::FormatNotFound(name.to_string())),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    /// Registered format names in alphabetical order
    pub fn list_formats(&self) -> Vec<String> {
        self.formats.keys().cloned().collect()
    }

    /// Name of the first format claiming `filename`'s extension, compared without case.
    pub fn detect_format_from_filename(&self, filename: &str) -> Option<String> {
        let extension = Path::new(filename)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        self.formats
            .iter()
            .find(|(_, format)| format.file_extensions().contains(&extension.as_str()))
            .map(|(name, _)| name.clone())
    }

    pub fn parse(&self, source: &str, format: &str) -> Result<Document, FormatError> {
        let reader = self.get(format)?;
        if !reader.supports_parsing() {
            return Err(FormatError::NotSupported(format!(
                "Format '{format}' does not support parsing"
            )));
        }
        reader.parse(source)
    }

    pub fn serialize(&self, doc: &Document, format: &str) -> Result<String, FormatError> {
        self.serialize_with_options(doc, format, &HashMap::new())
    }

    /// Write `doc` as `format`, passing `options` through to the format.
    pub fn serialize_with_options(
        &self,
        doc: &Document,
        format: &str,
        options: &HashMap<String, String>,
    ) -> Result<String, FormatError> {
        let writer = self.get(format)?;
        if !writer.supports_serialization() {
            return Err(FormatError::NotSupported(format!(
                "Format '{format}' does not support serialization"
            )));
        }
        writer.serialize_with_options(doc, options)
    }

    /// Read `source` as `from` and write it back out as `to`.
    ///
    /// Both formats are looked up before any parsing happens.
    pub fn convert(
        &self,
        source: &str,
        from: &str,
        to: &str,
        options: &HashMap<String, String>,
    ) -> Result<String, FormatError> {
        self.get(to)?;
        let doc = self.parse(source, from)?;
        self.serialize_with_options(&doc, to, options)
    }

    /// The built-in formats, Markdown written with `rules` and HTML imported with
    /// `import`.
    pub fn with_rules(rules: MarkdownRules, import: HtmlConversionOptions) -> Self {
        let mut registry = Self::new();
        registry.register(MarkdownFormat::new(rules.clone()));
        registry.register(HtmlFormat::new(rules, import));
        registry.register(JsonFormat);
        registry.register(TreevizFormat);
        registry
    }

    pub fn with_defaults() -> Self {
        Self::with_rules(MarkdownRules::default(), HtmlConversionOptions::default())
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Node;

    struct TestFormat;

    impl Format for TestFormat {
        fn name(&self) -> &str {
            "test"
        }
        fn supports_parsing(&self) -> bool {
            true
        }
        fn supports_serialization(&self) -> bool {
            true
        }
        fn parse(&self, _source: &str) -> Result<Document, FormatError> {
            let text = Node::plain_text("test").unwrap();
            Ok(Document::new(vec![Node::paragraph(vec![text]).unwrap()]).unwrap())
        }
        fn serialize(&self, _doc: &Document) -> Result<String, FormatError> {
            Ok("test output".to_string())
        }
    }

    #[test]
    fn test_registry_register() {
        let mut registry = FormatRegistry::new();
        registry.register(TestFormat);
        registry.register(TestFormat);

        assert!(registry.has("test"));
        assert_eq!(registry.list_formats(), vec!["test"]);
    }

    #[test]
    fn test_registry_get_nonexistent() {
        let registry = FormatRegistry::new();
        match registry.get("nonexistent") {
            Err(FormatError::FormatNotFound(name)) => assert_eq!(name, "nonexistent"),
            _ => panic!("Expected FormatNotFound error"),
        }
    }

    #[test]
    fn test_registry_parse_and_serialize() {
        let mut registry = FormatRegistry::new();
        registry.register(TestFormat);

        let doc = registry.parse("input", "test").unwrap();
        assert_eq!(doc.root().text_content(), "test");
        assert_eq!(registry.serialize(&doc, "test").unwrap(), "test output");
    }

    #[test]
    fn test_registry_options_need_support() {
        let mut registry = FormatRegistry::new();
        registry.register(TestFormat);

        let mut options = HashMap::new();
        options.insert("unused".to_string(), "true".to_string());
        let result = registry.serialize_with_options(&Document::empty(), "test", &options);
        assert!(result.is_err());
    }

    #[test]
    fn test_registry_with_defaults() {
        let registry = FormatRegistry::default();
        assert_eq!(
            registry.list_formats(),
            vec!["html", "json", "markdown", "treeviz"]
        );
    }

    #[test]
    fn test_convert_markdown_to_html() {
        let registry = FormatRegistry::default();
        let html = registry
            .convert("# Hi\n", "markdown", "html", &HashMap::new())
            .unwrap();
        assert_eq!(html, "<h1>Hi</h1>\n");
        assert_eq!(
            registry.convert("# Hi\n", "markdown", "docx", &HashMap::new()),
            Err(FormatError::FormatNotFound("docx".to_string()))
        );
    }

    #[test]
    fn test_treeviz_cannot_parse() {
        let registry = FormatRegistry::default();
        assert!(matches!(
            registry.parse("x", "treeviz"),
            Err(FormatError::NotSupported(_))
        ));
    }

    #[test]
    fn test_detect_format_from_filename() {
        let registry = FormatRegistry::with_defaults();

        assert_eq!(
            registry.detect_format_from_filename("notes.md"),
            Some("markdown".to_string())
        );
        assert_eq!(
            registry.detect_format_from_filename("/path/to/README.Markdown"),
            Some("markdown".to_string())
        );
        assert_eq!(
            registry.detect_format_from_filename("page.htm"),
            Some("html".to_string())
        );
        assert_eq!(
            registry.detect_format_from_filename("doc.tree"),
            Some("treeviz".to_string())
        );
        assert_eq!(registry.detect_format_from_filename("doc.unknown"), None);
        assert_eq!(registry.detect_format_from_filename("doc"), None);
    }
}
