//! Inspection transforms
//!
//! Each transform is a stage + format combination (e.g. "events-json", "tree-treeviz").
//!
//! ## Stages
//!
//! 1. **Events** - Markdown text → flat event stream, before nesting
//!    - `events-simple`: one event per line, indented by nesting depth
//!    - `events-json`: events as JSON objects
//!
//! 2. **Tree** - Event stream → validated document tree
//!    - `tree-treeviz`: tree visualization with Unicode icons
//!    - `tree-json`: the serde form of the tree
//!
//! 3. **Markdown** - Tree → canonical Markdown
//!    - `markdown-canonical`: what the serializer writes back
//!
//! ## Extra Parameters
//!
//! - `inline`: "true" lists inline nodes under their textblocks (`tree-treeviz`)
//! - `pretty`: "false" prints `tree-json` on a single line

use duomark_core::formats::json::serialize_to_json;
use duomark_core::formats::markdown::{markdown_to_events, parse_markdown, MarkdownRules};
use duomark_core::formats::treeviz::to_treeviz_str_with_params;
use duomark_core::ir::events::{Event, ListKind};
use duomark_core::serialize_to_markdown;
use serde_json::json;
use std::collections::HashMap;

/// All available inspect transforms (stage + format combinations)
pub const AVAILABLE_TRANSFORMS: &[&str] = &[
    "events-simple",
    "events-json",
    "tree-treeviz",
    "tree-json",
    "markdown-canonical",
];

pub const DEFAULT_TRANSFORM: &str = "tree-treeviz";

/// Execute a named transform on Markdown source.
pub fn execute_transform(
    source: &str,
    transform_name: &str,
    rules: &MarkdownRules,
    extra_params: &HashMap<String, String>,
) -> Result<String, String> {
    match transform_name {
        "events-simple" => Ok(events_to_simple(&markdown_to_events(source))),
        "events-json" => serde_json::to_string_pretty(&events_to_json(&markdown_to_events(source)))
            .map(|json| json + "\n")
            .map_err(|e| format!("JSON serialization failed: {e}")),
        "tree-treeviz" => Ok(to_treeviz_str_with_params(
            &parse_markdown(source),
            extra_params,
        )),
        "tree-json" => {
            let pretty = extra_params.get("pretty").map_or(true, |v| v != "false");
            serialize_to_json(&parse_markdown(source), pretty)
                .map(|json| json + "\n")
                .map_err(|e| e.to_string())
        }
        "markdown-canonical" => Ok(serialize_to_markdown(&parse_markdown(source), rules)),
        _ => Err(format!("Unknown transform: {transform_name}")),
    }
}

fn event_detail(event: &Event) -> Option<String> {
    match event {
        Event::StartHeading(level) => Some(format!("level={level}")),
        Event::StartList(ListKind::Ordered { order }) => Some(format!("ordered start={order}")),
        Event::StartList(ListKind::Bullet) => Some("bullet".to_string()),
        Event::StartList(ListKind::Task) => Some("task".to_string()),
        Event::StartListItem {
            checked: Some(checked),
        } => Some(format!("checked={checked}")),
        Event::StartTableCell { header: true } => Some("header".to_string()),
        Event::CodeBlock { attrs, text } => Some(format!(
            "{}{:?}",
            attrs
                .language
                .as_deref()
                .map(|language| format!("lang={language} "))
                .unwrap_or_default(),
            text
        )),
        Event::Text { text, marks } if marks.is_empty() => Some(format!("{text:?}")),
        Event::Text { text, marks } => {
            let names: Vec<&str> = marks.iter().map(|mark| mark.mark_type().name()).collect();
            Some(format!("{text:?} [{}]", names.join(",")))
        }
        Event::Image(attrs) => Some(format!("src={}", attrs.src)),
        _ => None,
    }
}

fn events_to_simple(events: &[Event]) -> String {
    let mut output = String::new();
    let mut depth = 0usize;
    for event in events {
        let label = event.label();
        if label.starts_with("End") {
            depth = depth.saturating_sub(1);
        }
        output.push_str(&"  ".repeat(depth));
        output.push_str(label);
        if let Some(detail) = event_detail(event) {
            output.push(' ');
            output.push_str(&detail);
        }
        output.push('\n');
        if label.starts_with("Start") {
            depth += 1;
        }
    }
    output
}

fn events_to_json(events: &[Event]) -> serde_json::Value {
    json!(events
        .iter()
        .map(|event| match event_detail(event) {
            Some(detail) => json!({ "event": event.label(), "detail": detail }),
            None => json!({ "event": event.label() }),
        })
        .collect::<Vec<_>>())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str, transform: &str) -> String {
        execute_transform(source, transform, &MarkdownRules::default(), &HashMap::new()).unwrap()
    }

    #[test]
    fn test_events_simple_indents_by_depth() {
        let output = run("# Hi\n\n- **a**\n", "events-simple");
        assert_eq!(
            output,
            "StartDocument\n  StartHeading level=1\n    Text \"Hi\"\n  EndHeading\n  \
             StartList bullet\n    StartListItem\n      StartParagraph\n        \
             Text \"a\" [strong]\n      EndParagraph\n    EndListItem\n  EndList\nEndDocument\n"
        );
    }

    #[test]
    fn test_events_json_is_an_array() {
        let output = run("text\n", "events-json");
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value[0]["event"], "StartDocument");
        assert_eq!(value[2]["detail"], "\"text\"");
    }

    #[test]
    fn test_canonical_markdown() {
        assert_eq!(run("* a\n* b\n", "markdown-canonical"), "- a\n- b\n");
    }

    #[test]
    fn test_unknown_transform() {
        let err = execute_transform("", "ast-tag", &MarkdownRules::default(), &HashMap::new())
            .unwrap_err();
        assert_eq!(err, "Unknown transform: ast-tag");
    }
}
