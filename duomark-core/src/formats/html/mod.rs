//! HTML format implementation
//!
//! HTML plays two different roles, so the two directions use different machinery.
//!
//! # Export: live preview
//!
//! The preview pane shows what the Markdown source renders to, not what the tree looks
//! like. Export therefore serializes the document to Markdown first and renders that
//! text with `comrak` (tables, strikethrough and task lists enabled, raw HTML escaped).
//! The preview of a tree and the preview of its Markdown are always identical.
//!
//! # Import: paste and drop
//!
//! Parsing uses `html5ever` + `markup5ever_rcdom` (see [`import`]). The importer builds
//! IR events from the DOM and runs them through the shared flat-to-nested converter.
//! It also backs the default [`crate::capability::HtmlToMarkdown`] implementation.
//!
//! # Options
//!
//! - `standalone`: `true` wraps the fragment in a complete HTML5 page with the preview
//!   stylesheet (default `false`)
//! - `title`: page title for standalone output

pub mod import;

pub use import::{html_to_document, html_to_markdown, HtmlImporter};

use crate::capability::HtmlConversionOptions;
use crate::error::FormatError;
use crate::format::Format;
use crate::formats::markdown::{serialize_to_markdown, MarkdownRules};
use crate::schema::Document;
use comrak::{markdown_to_html, ComrakOptions};
use std::collections::HashMap;

/// Options for HTML preview rendering
#[derive(Debug, Clone, Default)]
pub struct HtmlOptions {
    /// Emit a complete page instead of a fragment
    pub standalone: bool,
    pub title: Option<String>,
}

/// Format implementation for HTML
#[derive(Debug, Clone, Default)]
pub struct HtmlFormat {
    rules: MarkdownRules,
    import: HtmlConversionOptions,
}

impl HtmlFormat {
    pub fn new(rules: MarkdownRules, import: HtmlConversionOptions) -> Self {
        Self { rules, import }
    }
}

/// Render Markdown text to an HTML fragment.
pub fn render_preview(markdown: &str) -> String {
    markdown_to_html(markdown, &preview_options())
}

/// Render a document as it would appear in the preview pane.
pub fn serialize_to_html(doc: &Document, rules: &MarkdownRules, options: &HtmlOptions) -> String {
    let body = render_preview(&serialize_to_markdown(doc, rules));
    if options.standalone {
        let title = options.title.as_deref().unwrap_or("Document");
        wrap_in_document(&body, title)
    } else {
        body
    }
}

fn preview_options() -> ComrakOptions<'static> {
    let mut options = ComrakOptions::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.tasklist = true;
    options
}

fn wrap_in_document(body_html: &str, title: &str) -> String {
    let css = include_str!("../../../css/preview.css");
    let escaped_title = html_escape(title);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <meta name="generator" content="duomark">
  <title>{escaped_title}</title>
  <style>
{css}
  </style>
</head>
<body>
{body_html}
</body>
</html>
"#
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl Format for HtmlFormat {
    fn name(&self) -> &str {
        "html"
    }

    fn description(&self) -> &str {
        "HTML preview export and HTML import"
    }

    fn file_extensions(&self) -> &[&str] {
        &["html", "htm"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str) -> Result<Document, FormatError> {
        html_to_document(source, &self.import).map_err(|err| FormatError::ParseError(err.message))
    }

    fn serialize(&self, doc: &Document) -> Result<String, FormatError> {
        Ok(serialize_to_html(doc, &self.rules, &HtmlOptions::default()))
    }

    fn serialize_with_options(
        &self,
        doc: &Document,
        options: &HashMap<String, String>,
    ) -> Result<String, FormatError> {
        let mut html_options = HtmlOptions::default();
        for (key, value) in options {
            match key.as_str() {
                "standalone" => {
                    html_options.standalone = value.parse().map_err(|_| {
                        FormatError::SerializationError(format!(
                            "Expected true or false for 'standalone', got '{value}'"
                        ))
                    })?;
                }
                "title" => html_options.title = Some(value.clone()),
                other => {
                    return Err(FormatError::NotSupported(format!(
                        "Format 'html' does not support parameter '{other}'"
                    )))
                }
            }
        }
        Ok(serialize_to_html(doc, &self.rules, &html_options))
    }
}
