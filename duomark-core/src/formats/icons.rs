//! Icon mapping for the tree visualization format
//!
//! Keyed by schema node names so every node kind has a stable glyph.

use crate::schema::NodeType;

/// Get the Unicode icon for a node type
pub fn get_icon(node_type: NodeType) -> &'static str {
    match node_type {
        NodeType::Doc => "⧉",
        NodeType::Paragraph => "¶",
        NodeType::Heading => "§",
        NodeType::Blockquote => "❝",
        NodeType::CodeBlock => "𝒱",
        NodeType::HorizontalRule => "⎯",
        NodeType::BulletList | NodeType::OrderedList => "☰",
        NodeType::ListItem => "•",
        NodeType::TaskList => "☑",
        NodeType::TaskItem => "☐",
        NodeType::Table => "▦",
        NodeType::TableRow => "═",
        NodeType::TableHeader => "⊤",
        NodeType::TableCell => "▢",
        NodeType::Text => "◦",
        NodeType::Image => "▣",
        NodeType::HardBreak => "↵",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::content::ALL_NODE_TYPES;

    #[test]
    fn test_icon_mappings() {
        assert_eq!(get_icon(NodeType::Doc), "⧉");
        assert_eq!(get_icon(NodeType::Paragraph), "¶");
        assert_eq!(get_icon(NodeType::CodeBlock), "𝒱");
        assert_eq!(get_icon(NodeType::BulletList), get_icon(NodeType::OrderedList));
    }

    #[test]
    fn test_every_node_type_has_an_icon() {
        for node_type in ALL_NODE_TYPES {
            assert!(!get_icon(node_type).is_empty());
        }
    }
}
