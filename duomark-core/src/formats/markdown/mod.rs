//! Markdown format implementation
//!
//! This module implements the conversion between Markdown text and the structured
//! [`Document`] tree edited by the rich surface. The Markdown text is the
//! source of truth: the tree is built from it on session start, and every local edit
//! is serialized back to it.
//!
//! # Parser Design
//!
//! The parser is hand-written rather than built on a CommonMark library. It is a
//! line-oriented state machine whose block matchers are pure functions tried in a fixed
//! priority order (fence, table row, rule, task item, list item, heading, quote, blank,
//! paragraph). A second pass resolves inline syntax with a delimiter stack. Both passes
//! are total: anything they do not understand becomes literal text.
//!
//! The parser emits IR events (see [`crate::ir`]); the tree is built by the shared
//! flat-to-nested converter, which also applies the schema's normalizations.
//!
//! # Element Mapping Table
//!
//! | Node             | Markdown                 | Export Notes                          | Import Notes                           |
//! |------------------|--------------------------|---------------------------------------|----------------------------------------|
//! | heading          | `#` .. `######`          | Level → hash count                    | Closing hashes stripped                |
//! | paragraph        | Text lines               | Empty paragraphs omitted              | Soft breaks become spaces              |
//! | blockquote       | `> ` prefix              | Blank lines become `>`                | Content parsed recursively             |
//! | code_block       | ```` ``` ```` / `~~~`    | `original_source` wins; fence widened | Unterminated fence swallows the rest   |
//! | bullet_list      | `- item`                 | Marker configurable                   | `-`, `*`, `+`                          |
//! | ordered_list     | `1. item`                | Numbered from `order`                 | `N.` and `N)`; `order` = first number  |
//! | task_list        | `- [ ] item`             | `[x]` when checked                    | Check mark case-insensitive            |
//! | table            | Pipe rows                | `\| :--- \|` separator                | Separator rows consumed                |
//! | horizontal_rule  | `---`                    | Direct                                | `***`, `___`, spaced variants          |
//! | image            | `![alt](src "title")`    | Direct                                | Empty `src` stays literal              |
//! | hard_break       | `\` + newline            | Dropped at paragraph end              | `\` or two trailing spaces             |
//! | Marks:           |                          |                                       |                                        |
//! |   strong         | `**t**`                  | Use `**`                              | Parse `**` and `__`                    |
//! |   em             | `*t*`                    | Use `*`                               | Parse `*` and `_`                      |
//! |   strike         | `~~t~~`                  | Direct                                | Exactly two tildes                     |
//! |   code           | `` `t` ``                | Backtick run widened when needed      | Matching run length                    |
//! |   link           | `[t](href "title")`      | Direct                                | Link text parsed recursively           |
//!
//! # Lossy Conversions
//!
//! - Whitespace at mark boundaries moves outside the delimiters
//! - Soft line breaks inside paragraphs become single spaces
//! - Rendered diagram blocks serialize their `original_source`, not the display text
//! - Numbering gaps in ordered lists are renumbered from the first item
//!
//! # Options
//!
//! [`MarkdownFormat::serialize_with_options`] accepts:
//! - `ordered-list-numbering`: `sequential` (default) or `repeat-one`
//! - `bullet-marker`: `-` (default), `*` or `+`

pub mod inline;
pub mod parser;
pub mod rules;
pub mod serializer;

pub use parser::{markdown_to_events, parse_markdown};
pub use rules::{ListNumbering, MarkdownRules};
pub use serializer::serialize_to_markdown;

use crate::error::FormatError;
use crate::format::Format;
use crate::schema::Document;
use std::collections::HashMap;

/// Format implementation for Markdown
#[derive(Debug, Clone, Default)]
pub struct MarkdownFormat {
    rules: MarkdownRules,
}

impl MarkdownFormat {
    pub fn new(rules: MarkdownRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &MarkdownRules {
        &self.rules
    }

    /// Apply `--extra-*` style parameters on top of the configured rules.
    fn rules_with_options(
        &self,
        options: &HashMap<String, String>,
    ) -> Result<MarkdownRules, FormatError> {
        let mut rules = self.rules.clone();
        for (key, value) in options {
            match key.as_str() {
                "ordered-list-numbering" => {
                    rules.ordered_list_numbering =
                        ListNumbering::from_name(value).ok_or_else(|| {
                            FormatError::SerializationError(format!(
                                "Unknown ordered list numbering '{value}'"
                            ))
                        })?;
                }
                "bullet-marker" => {
                    let mut chars = value.chars();
                    rules.bullet_marker = match (chars.next(), chars.next()) {
                        (Some(marker @ ('-' | '*' | '+')), None) => marker,
                        _ => {
                            return Err(FormatError::SerializationError(format!(
                                "Invalid bullet marker '{value}'"
                            )))
                        }
                    };
                }
                other => {
                    return Err(FormatError::NotSupported(format!(
                        "Format 'markdown' does not support parameter '{other}'"
                    )))
                }
            }
        }
        Ok(rules)
    }
}

impl Format for MarkdownFormat {
    fn name(&self) -> &str {
        "markdown"
    }

    fn description(&self) -> &str {
        "Markdown with tables, task lists and strikethrough"
    }

    fn file_extensions(&self) -> &[&str] {
        &["md", "markdown"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str) -> Result<Document, FormatError> {
        Ok(parse_markdown(source))
    }

    fn serialize(&self, doc: &Document) -> Result<String, FormatError> {
        Ok(serialize_to_markdown(doc, &self.rules))
    }

    fn serialize_with_options(
        &self,
        doc: &Document,
        options: &HashMap<String, String>,
    ) -> Result<String, FormatError> {
        let rules = self.rules_with_options(options)?;
        Ok(serialize_to_markdown(doc, &rules))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_format_round_trip() {
        let format = MarkdownFormat::default();
        let doc = format.parse("# Title\n\nSome *text*.\n").unwrap();
        assert_eq!(
            format.serialize(&doc).unwrap(),
            "# Title\n\nSome *text*.\n"
        );
    }

    #[test]
    fn test_options_override_rules() {
        let format = MarkdownFormat::default();
        let doc = format.parse("3. a\n4. b\n\n- c\n").unwrap();
        let output = format
            .serialize_with_options(
                &doc,
                &options(&[("ordered-list-numbering", "repeat-one"), ("bullet-marker", "*")]),
            )
            .unwrap();
        assert_eq!(output, "1. a\n1. b\n\n* c\n");
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let format = MarkdownFormat::default();
        let doc = Document::empty();
        assert!(format
            .serialize_with_options(&doc, &options(&[("bullet-marker", "#")]))
            .is_err());
        assert!(matches!(
            format.serialize_with_options(&doc, &options(&[("wrap", "80")])),
            Err(FormatError::NotSupported(_))
        ));
    }
}
