//! Node types and their content models.
//!
//! Each node type declares a [`ContentRule`]. Rules are checked whenever a node is
//! constructed, so a tree that exists at all satisfies them:
//!
//! | Node type                     | Content                          |
//! |-------------------------------|----------------------------------|
//! | doc, blockquote               | block+                           |
//! | paragraph, heading            | inline*                          |
//! | code_block                    | unmarked text*                   |
//! | ordered_list, bullet_list     | list_item+                       |
//! | task_list                     | task_item+                       |
//! | list_item, task_item, cells   | paragraph block*                 |
//! | table                         | table_row+                       |
//! | table_row                     | (table_cell \| table_header)*    |
//! | horizontal_rule, image, hard_break, text | leaf                  |

use super::nodes::Node;
use crate::error::SchemaViolation;
use serde::{Deserialize, Serialize};

/// The type of a node in the document schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Doc,
    Paragraph,
    Heading,
    Blockquote,
    CodeBlock,
    HorizontalRule,
    OrderedList,
    BulletList,
    ListItem,
    TaskList,
    TaskItem,
    Table,
    TableRow,
    TableCell,
    TableHeader,
    Image,
    HardBreak,
    Text,
}

/// Declared content model of a node type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRule {
    /// No children (leaf)
    Empty,
    /// Zero or more inline nodes
    Inline,
    /// Zero or more unmarked text nodes
    PlainText,
    /// One or more block nodes
    Blocks,
    /// One or more nodes of a single item type
    Items(NodeType),
    /// Zero or more table cells or headers
    Cells,
    /// A paragraph followed by zero or more blocks
    ItemBody,
}

impl NodeType {
    /// Snake-case schema name
    pub fn name(&self) -> &'static str {
        match self {
            NodeType::Doc => "doc",
            NodeType::Paragraph => "paragraph",
            NodeType::Heading => "heading",
            NodeType::Blockquote => "blockquote",
            NodeType::CodeBlock => "code_block",
            NodeType::HorizontalRule => "horizontal_rule",
            NodeType::OrderedList => "ordered_list",
            NodeType::BulletList => "bullet_list",
            NodeType::ListItem => "list_item",
            NodeType::TaskList => "task_list",
            NodeType::TaskItem => "task_item",
            NodeType::Table => "table",
            NodeType::TableRow => "table_row",
            NodeType::TableCell => "table_cell",
            NodeType::TableHeader => "table_header",
            NodeType::Image => "image",
            NodeType::HardBreak => "hard_break",
            NodeType::Text => "text",
        }
    }

    pub fn content_rule(&self) -> ContentRule {
        match self {
            NodeType::Doc | NodeType::Blockquote => ContentRule::Blocks,
            NodeType::Paragraph | NodeType::Heading => ContentRule::Inline,
            NodeType::CodeBlock => ContentRule::PlainText,
            NodeType::OrderedList | NodeType::BulletList => ContentRule::Items(NodeType::ListItem),
            NodeType::TaskList => ContentRule::Items(NodeType::TaskItem),
            NodeType::Table => ContentRule::Items(NodeType::TableRow),
            NodeType::TableRow => ContentRule::Cells,
            NodeType::ListItem
            | NodeType::TaskItem
            | NodeType::TableCell
            | NodeType::TableHeader => ContentRule::ItemBody,
            NodeType::HorizontalRule | NodeType::Image | NodeType::HardBreak | NodeType::Text => {
                ContentRule::Empty
            }
        }
    }

    /// Members of the `block` group (what `doc`, quotes and item bodies hold)
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            NodeType::Paragraph
                | NodeType::Heading
                | NodeType::Blockquote
                | NodeType::CodeBlock
                | NodeType::HorizontalRule
                | NodeType::OrderedList
                | NodeType::BulletList
                | NodeType::TaskList
                | NodeType::Table
        )
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, NodeType::Text | NodeType::Image | NodeType::HardBreak)
    }

    /// Blocks whose content is inline (or text) rather than blocks
    pub fn is_textblock(&self) -> bool {
        matches!(
            self.content_rule(),
            ContentRule::Inline | ContentRule::PlainText
        )
    }

    pub fn is_leaf(&self) -> bool {
        self.content_rule() == ContentRule::Empty
    }

    pub fn is_list(&self) -> bool {
        matches!(
            self,
            NodeType::OrderedList | NodeType::BulletList | NodeType::TaskList
        )
    }

    pub fn is_list_item(&self) -> bool {
        matches!(self, NodeType::ListItem | NodeType::TaskItem)
    }

    /// Whether text inside this node may carry marks
    pub fn allows_marks(&self) -> bool {
        self.content_rule() == ContentRule::Inline
    }

    pub fn from_name(name: &str) -> Option<NodeType> {
        ALL_NODE_TYPES.iter().copied().find(|t| t.name() == name)
    }
}

/// Every node type of the schema
pub const ALL_NODE_TYPES: [NodeType; 18] = [
    NodeType::Doc,
    NodeType::Paragraph,
    NodeType::Heading,
    NodeType::Blockquote,
    NodeType::CodeBlock,
    NodeType::HorizontalRule,
    NodeType::OrderedList,
    NodeType::BulletList,
    NodeType::ListItem,
    NodeType::TaskList,
    NodeType::TaskItem,
    NodeType::Table,
    NodeType::TableRow,
    NodeType::TableCell,
    NodeType::TableHeader,
    NodeType::Image,
    NodeType::HardBreak,
    NodeType::Text,
];

impl ContentRule {
    /// Check `content` against this rule for a node of type `parent`.
    pub fn validate(&self, parent: NodeType, content: &[Node]) -> Result<(), SchemaViolation> {
        let invalid = |index: usize, child: &Node| SchemaViolation::InvalidContent {
            parent,
            child: child.node_type(),
            index,
        };

        match self {
            ContentRule::Empty => match content.first() {
                Some(child) => Err(invalid(0, child)),
                None => Ok(()),
            },
            ContentRule::Inline => {
                for (index, child) in content.iter().enumerate() {
                    if !child.node_type().is_inline() {
                        return Err(invalid(index, child));
                    }
                }
                Ok(())
            }
            ContentRule::PlainText => {
                for (index, child) in content.iter().enumerate() {
                    if child.node_type() != NodeType::Text {
                        return Err(invalid(index, child));
                    }
                    if let Some(mark) = child.marks().iter().next() {
                        return Err(SchemaViolation::MarkNotAllowed {
                            parent,
                            mark: mark.mark_type(),
                        });
                    }
                }
                Ok(())
            }
            ContentRule::Blocks => {
                if content.is_empty() {
                    return Err(SchemaViolation::MissingContent { parent });
                }
                for (index, child) in content.iter().enumerate() {
                    if !child.node_type().is_block() {
                        return Err(invalid(index, child));
                    }
                }
                Ok(())
            }
            ContentRule::Items(item_type) => {
                if content.is_empty() {
                    return Err(SchemaViolation::MissingContent { parent });
                }
                for (index, child) in content.iter().enumerate() {
                    if child.node_type() != *item_type {
                        return Err(invalid(index, child));
                    }
                }
                Ok(())
            }
            ContentRule::Cells => {
                for (index, child) in content.iter().enumerate() {
                    if !matches!(
                        child.node_type(),
                        NodeType::TableCell | NodeType::TableHeader
                    ) {
                        return Err(invalid(index, child));
                    }
                }
                Ok(())
            }
            ContentRule::ItemBody => {
                let Some(first) = content.first() else {
                    return Err(SchemaViolation::MissingContent { parent });
                };
                if first.node_type() != NodeType::Paragraph {
                    return Err(invalid(0, first));
                }
                for (index, child) in content.iter().enumerate().skip(1) {
                    if !child.node_type().is_block() {
                        return Err(invalid(index, child));
                    }
                }
                Ok(())
            }
        }
    }
}
