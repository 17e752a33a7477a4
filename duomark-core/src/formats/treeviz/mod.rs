//! Treeviz formatter for document trees
//!
//! Treeviz is a visual representation of the document tree, meant for inspecting what
//! the parser built from a piece of Markdown. Each node gets one line:
//!
//! <prefix><connector> <icon> <label> (label truncated to 30 characters)
//!
//! Example:
//!
//! ⧉ Document (3 blocks)
//! ├─ § h1 Shopping
//! ├─ ☑ 2 items
//! │ ├─ ☐ [x] Milk
//! │ │ └─ ¶ Milk
//! │ └─ ☐ [ ] Bread
//! │   └─ ¶ Bread
//! └─ 𝒱 ```mermaid (rendered)
//!
//! Inline nodes (text runs, images, hard breaks) are hidden unless the `inline`
//! parameter is `true`; text runs then show their marks.

use super::icons::get_icon;
use crate::error::FormatError;
use crate::format::Format;
use crate::schema::{Document, Node, NodeType};
use std::collections::HashMap;

const LABEL_WIDTH: usize = 30;

fn truncate(text: &str) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= LABEL_WIDTH {
        single_line
    } else {
        let cut: String = single_line.chars().take(LABEL_WIDTH - 1).collect();
        format!("{cut}…")
    }
}

fn items_label(node: &Node) -> String {
    match node.child_count() {
        1 => "1 item".to_string(),
        count => format!("{count} items"),
    }
}

fn label(node: &Node) -> String {
    match node.node_type() {
        NodeType::Heading => {
            let level = node.attrs().heading().map_or(1, |h| h.level);
            format!("h{level} {}", truncate(&node.text_content()))
        }
        NodeType::Paragraph | NodeType::ListItem | NodeType::TableCell | NodeType::TableHeader => {
            truncate(&node.text_content())
        }
        NodeType::TaskItem => {
            let checked = node.attrs().task_item().is_some_and(|t| t.checked);
            let mark = if checked { "[x]" } else { "[ ]" };
            format!("{mark} {}", truncate(&node.text_content()))
        }
        NodeType::CodeBlock => {
            let attrs = node.attrs().code_block();
            let language = attrs.and_then(|a| a.language.as_deref()).unwrap_or("");
            if attrs.is_some_and(|a| a.is_rendered()) {
                format!("```{language} (rendered)")
            } else {
                let lines = node.text_content().lines().count();
                format!("```{language} ({lines} lines)")
            }
        }
        NodeType::OrderedList => {
            let order = node.attrs().ordered_list().map_or(1, |o| o.order);
            format!("{} from {order}", items_label(node))
        }
        NodeType::BulletList | NodeType::TaskList => items_label(node),
        NodeType::Blockquote => match node.child_count() {
            1 => "1 block".to_string(),
            count => format!("{count} blocks"),
        },
        NodeType::Table => {
            let columns = node
                .content()
                .iter()
                .map(Node::child_count)
                .max()
                .unwrap_or(0);
            format!("{} × {columns}", node.child_count())
        }
        NodeType::TableRow => format!("{} cells", node.child_count()),
        NodeType::Image => node
            .attrs()
            .image()
            .map(|image| truncate(&image.src))
            .unwrap_or_default(),
        NodeType::Text => {
            let text = truncate(node.text_str().unwrap_or(""));
            if node.marks().is_empty() {
                format!("\"{text}\"")
            } else {
                let marks: Vec<&str> = node.marks().iter().map(|m| m.mark_type().name()).collect();
                format!("\"{text}\" [{}]", marks.join(", "))
            }
        }
        NodeType::HorizontalRule | NodeType::HardBreak | NodeType::Doc => {
            node.node_type().name().to_string()
        }
    }
}

fn format_node(
    node: &Node,
    prefix: &str,
    child_index: usize,
    child_count: usize,
    include_inline: bool,
    output: &mut String,
) {
    let is_last = child_index + 1 == child_count;
    let connector = if is_last { "└─" } else { "├─" };
    output.push_str(&format!(
        "{prefix}{connector} {} {}\n",
        get_icon(node.node_type()),
        label(node)
    ));

    let child_prefix = format!("{prefix}{}", if is_last { "  " } else { "│ " });
    format_children(node, &child_prefix, include_inline, output);
}

fn format_children(node: &Node, prefix: &str, include_inline: bool, output: &mut String) {
    if node.node_type().is_textblock() && !include_inline {
        return;
    }
    let children = node.content();
    for (index, child) in children.iter().enumerate() {
        format_node(child, prefix, index, children.len(), include_inline, output);
    }
}

pub fn to_treeviz_str(doc: &Document) -> String {
    to_treeviz_str_with_params(doc, &HashMap::new())
}

/// Convert a document to a treeviz string.
///
/// # Parameters
///
/// - `"inline"`: when `"true"`, text runs, images and hard breaks are listed under
///   their textblocks.
pub fn to_treeviz_str_with_params(doc: &Document, params: &HashMap<String, String>) -> String {
    let include_inline = params
        .get("inline")
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));

    let blocks = doc.blocks().len();
    let mut output = format!(
        "{} Document ({blocks} {})\n",
        get_icon(NodeType::Doc),
        if blocks == 1 { "block" } else { "blocks" }
    );
    format_children(doc.root(), "", include_inline, &mut output);
    output
}

/// Format implementation for treeviz format
pub struct TreevizFormat;

impl Format for TreevizFormat {
    fn name(&self) -> &str {
        "treeviz"
    }

    fn description(&self) -> &str {
        "Visual tree representation with indentation and Unicode icons"
    }

    fn file_extensions(&self) -> &[&str] {
        &["tree", "treeviz"]
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn serialize(&self, doc: &Document) -> Result<String, FormatError> {
        Ok(to_treeviz_str(doc))
    }

    fn serialize_with_options(
        &self,
        doc: &Document,
        options: &HashMap<String, String>,
    ) -> Result<String, FormatError> {
        Ok(to_treeviz_str_with_params(doc, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::markdown::parse_markdown;

    #[test]
    fn test_block_tree() {
        let doc = parse_markdown("# Shopping\n\n- [x] Milk\n- [ ] Bread\n\n```mermaid\ngraph TD\n```\n");
        insta::assert_snapshot!(to_treeviz_str(&doc), @r"
        ⧉ Document (3 blocks)
        ├─ § h1 Shopping
        ├─ ☑ 2 items
        │ ├─ ☐ [x] Milk
        │ │ └─ ¶ Milk
        │ └─ ☐ [ ] Bread
        │   └─ ¶ Bread
        └─ 𝒱 ```mermaid (1 lines)
        ");
    }

    #[test]
    fn test_blockquote_counts_its_blocks() {
        let doc = parse_markdown("> quoted\n>\n> - a\n");
        insta::assert_snapshot!(to_treeviz_str(&doc), @r"
        ⧉ Document (1 block)
        └─ ❝ 2 blocks
          ├─ ¶ quoted
          └─ ☰ 1 item
            └─ • a
              └─ ¶ a
        ");
    }

    #[test]
    fn test_inline_parameter_lists_marks() {
        let doc = parse_markdown("Hello **world**\n");
        let mut params = HashMap::new();
        params.insert("inline".to_string(), "true".to_string());
        insta::assert_snapshot!(to_treeviz_str_with_params(&doc, &params), @r#"
        ⧉ Document (1 block)
        └─ ¶ Hello world
          ├─ ◦ "Hello "
          └─ ◦ "world" [strong]
        "#);
    }

    #[test]
    fn test_long_labels_are_truncated() {
        assert_eq!(truncate("short"), "short");
        let long = "a".repeat(40);
        let truncated = truncate(&long);
        assert_eq!(truncated.chars().count(), LABEL_WIDTH);
        assert!(truncated.ends_with('…'));
    }
}
